//! Persistence boundary between collection and preprocessing
//!
//! Each collection run is written as one new JSON Lines file; nothing is
//! ever merged into or appended to a prior file.

use crate::error::StoreError;
use chrono::Local;
use log::info;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Write one batch of raw records to `<dir>/<kind>_<YYYYMMDD_HHMMSS>.jsonl`,
/// one JSON object per line in input order, creating the directory if
/// needed. Returns the path written.
///
/// The filename embeds the current local wall-clock time at second
/// granularity, so successive runs land in distinct, lexically ordered files.
pub fn save_records<T: Serialize>(
    records: &[T],
    dir: &Path,
    kind: &str,
) -> Result<PathBuf, StoreError> {
    fs::create_dir_all(dir)?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("{kind}_{stamp}.jsonl"));

    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    info!("Saved {} records to {}", records.len(), path.display());
    Ok(path)
}
