use crate::collectors::Harvest;
use crate::error::RemoteError;
use crate::events::{GpuSampleRecord, Source};
use crate::remote::CommandRunner;
use chrono::Utc;
use log::{info, warn};

/// CSV, no header, no units: one line per GPU with exactly six fields.
const GPU_QUERY: &str = "nvidia-smi --query-gpu=index,name,temperature.gpu,utilization.gpu,\
memory.used,memory.total --format=csv,noheader,nounits";

const FIELD_COUNT: usize = 6;

/// Samples GPU metrics on a remote host via nvidia-smi.
///
/// All records from one invocation share a single `collected_at` timestamp,
/// captured once before parsing: the samples describe one instant.
pub struct GpuMetricCollector<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    host: String,
}

impl<'a, R: CommandRunner + ?Sized> GpuMetricCollector<'a, R> {
    pub fn new(runner: &'a R, host: impl Into<String>) -> Self {
        Self {
            runner,
            host: host.into(),
        }
    }

    /// Collect one sample per GPU. Lines with the wrong field count or an
    /// unparseable number are dropped and counted; yielding no parseable
    /// lines is an empty harvest, not an error.
    pub fn collect(&self) -> Result<Harvest<GpuSampleRecord>, RemoteError> {
        info!("Collecting GPU metrics from {}: {GPU_QUERY}", self.host);
        let output = self.runner.run(GPU_QUERY)?;
        let collected_at = Utc::now().to_rfc3339();

        let mut harvest = Harvest::default();
        for line in output.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match self.parse_line(line, &collected_at) {
                Some(record) => harvest.records.push(record),
                None => {
                    warn!("Skipping malformed nvidia-smi line: {line}");
                    harvest.skipped += 1;
                }
            }
        }

        info!(
            "Collected {} GPU samples from {} ({} lines skipped)",
            harvest.records.len(),
            self.host,
            harvest.skipped
        );
        Ok(harvest)
    }

    fn parse_line(&self, line: &str, collected_at: &str) -> Option<GpuSampleRecord> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != FIELD_COUNT {
            return None;
        }

        Some(GpuSampleRecord {
            source: Source::Gpu,
            host: self.host.clone(),
            collected_at: collected_at.to_string(),
            gpu_index: fields[0].parse().ok()?,
            gpu_name: fields[1].to_string(),
            temperature_gpu_c: fields[2].parse().ok()?,
            utilization_gpu_pct: fields[3].parse().ok()?,
            memory_used_mb: fields[4].parse().ok()?,
            memory_total_mb: fields[5].parse().ok()?,
        })
    }
}
