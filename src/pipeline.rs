//! Preprocessing pass: raw JSONL files in, one combined event file out
//!
//! Reads whatever raw files exist under the ingested-data root, applies the
//! normalizer matching each source subdirectory, and streams every surviving
//! event straight into the combined output file.

use crate::error::PipelineError;
use crate::events::{RawRecord, Source};
use crate::normalize::normalize_record;
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const OUTPUT_FILENAME: &str = "combined_events.jsonl";

/// Sources in the order their raw files are processed
const SOURCE_ORDER: [Source; 3] = [Source::Systemd, Source::Docker, Source::Gpu];

/// Counts surfaced by one preprocessing pass
#[derive(Debug, PartialEq, Eq)]
pub struct PipelineSummary {
    pub output_path: PathBuf,
    pub events_written: usize,
    /// Lines dropped for bad JSON or a timestamp that failed to normalize
    pub records_skipped: usize,
}

/// One-pass preprocessor over the ingested-data root
pub struct Preprocessor {
    ingested_root: PathBuf,
    processed_root: PathBuf,
}

impl Preprocessor {
    pub fn new(ingested_root: impl Into<PathBuf>, processed_root: impl Into<PathBuf>) -> Self {
        Self {
            ingested_root: ingested_root.into(),
            processed_root: processed_root.into(),
        }
    }

    /// Run the pass. Source subdirectories are visited in fixed order and
    /// their files in filename order, so the combined output is
    /// deterministic for a given set of raw files. A missing subdirectory
    /// is nothing to do, not an error.
    pub fn run(&self) -> Result<PipelineSummary, PipelineError> {
        fs::create_dir_all(&self.processed_root)?;
        let output_path = self.processed_root.join(OUTPUT_FILENAME);
        info!("Starting preprocessing. Output -> {}", output_path.display());

        let mut writer = BufWriter::new(File::create(&output_path)?);
        let mut events_written = 0;
        let mut records_skipped = 0;

        for source in SOURCE_ORDER {
            let dir = self.ingested_root.join(source.as_str());
            if !dir.is_dir() {
                debug!("No {} directory at {}, skipping", source.as_str(), dir.display());
                continue;
            }
            for path in jsonl_files_sorted(&dir)? {
                info!("Processing {} file: {}", source.as_str(), path.display());
                let reader = BufReader::new(File::open(&path)?);
                for line in reader.lines() {
                    let line = line?;
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let record: RawRecord = match serde_json::from_str(line) {
                        Ok(record) => record,
                        Err(_) => {
                            warn!("Skipping invalid JSON line in {}", path.display());
                            records_skipped += 1;
                            continue;
                        }
                    };
                    match normalize_record(source, &record) {
                        Some(event) => {
                            serde_json::to_writer(&mut writer, &event)?;
                            writer.write_all(b"\n")?;
                            events_written += 1;
                        }
                        None => {
                            debug!("Skipping {} record without valid timestamp", source.as_str());
                            records_skipped += 1;
                        }
                    }
                }
            }
        }
        writer.flush()?;

        info!(
            "Preprocessing completed. Wrote {events_written} events to {} ({records_skipped} records skipped)",
            output_path.display()
        );
        Ok(PipelineSummary {
            output_path,
            events_written,
            records_skipped,
        })
    }
}

/// All `*.jsonl` files in `dir`, sorted lexicographically by filename
fn jsonl_files_sorted(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "jsonl") {
            files.push(path);
        }
    }
    files.sort_by_key(|path| path.file_name().map(|n| n.to_owned()));
    Ok(files)
}
