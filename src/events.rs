//! Core record and event types for the telemetry pipeline
//!
//! This module defines the raw records produced by the collectors and the
//! canonical `NormalizedEvent` shape that the preprocessing pass emits.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A raw observation as collected, prior to schema unification.
///
/// Journal entries are open-ended JSON objects, and the preprocessing pass
/// reads every persisted record back in this shape regardless of source.
pub type RawRecord = serde_json::Map<String, Value>;

/// Telemetry source a record was collected from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Systemd,
    Docker,
    Gpu,
}

impl Source {
    /// Wire/directory name of this source
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Systemd => "systemd",
            Source::Docker => "docker",
            Source::Gpu => "gpu",
        }
    }

    /// Parse a `source` tag as written into raw records
    pub fn from_tag(tag: &str) -> Option<Source> {
        match tag {
            "systemd" => Some(Source::Systemd),
            "docker" => Some(Source::Docker),
            "gpu" => Some(Source::Gpu),
            _ => None,
        }
    }

    /// Coarse classification of events from this source
    pub fn category(&self) -> Category {
        match self {
            Source::Systemd | Source::Docker => Category::Log,
            Source::Gpu => Category::Metric,
        }
    }
}

/// Coarse event classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Log,
    Metric,
}

/// One log line fetched from a Docker container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DockerLogRecord {
    pub source: Source,
    pub host: String,
    pub container_id: String,
    pub container_name: String,
    /// Timestamp prefix from `docker logs --timestamps`, if the line had one
    pub timestamp: Option<String>,
    pub message: String,
}

/// One GPU sample parsed from an nvidia-smi CSV line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpuSampleRecord {
    pub source: Source,
    pub host: String,
    /// Shared sampling instant for all GPUs in one invocation (RFC 3339)
    pub collected_at: String,
    pub gpu_index: u32,
    pub gpu_name: String,
    pub temperature_gpu_c: f64,
    pub utilization_gpu_pct: f64,
    pub memory_used_mb: f64,
    pub memory_total_mb: f64,
}

/// One observation expressed in the canonical cross-source schema.
///
/// Every event that reaches the combined output carries a successfully
/// parsed UTC timestamp; records failing timestamp parsing are dropped at
/// normalization time and never appear here.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NormalizedEvent {
    /// Event time as an RFC 3339 UTC string (`+00:00` offset form)
    pub timestamp: String,
    pub source: Source,
    pub host: Option<String>,
    pub category: Category,
    /// Fine-grained source label, equal to `source` today
    pub subtype: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Source-specific payload fields, copied verbatim from the raw record
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum EventPayload {
    Systemd {
        severity: Option<Value>,
        unit: Option<Value>,
        message: Option<Value>,
    },
    Docker {
        container_id: Option<Value>,
        container_name: Option<Value>,
        message: Option<Value>,
    },
    Gpu {
        gpu_index: Option<Value>,
        gpu_name: Option<Value>,
        temperature_gpu_c: Option<Value>,
        utilization_gpu_pct: Option<Value>,
        memory_used_mb: Option<Value>,
        memory_total_mb: Option<Value>,
    },
}
