/// Error types for the telemetry pipeline
pub mod error;

/// Raw record and normalized event types
pub mod events;

/// Remote command execution over SSH
pub mod remote;

/// Source collectors for systemd, Docker, and GPU telemetry
pub mod collectors;

/// Raw record persistence (JSON Lines files per collection run)
pub mod store;

/// Timestamp and schema normalization
pub mod normalize;

/// Preprocessing pass producing the combined event file
pub mod pipeline;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use config::Config;
pub use error::{ConfigError, PipelineError, RemoteError, StoreError};
pub use events::{Category, NormalizedEvent, RawRecord, Source};
pub use pipeline::{PipelineSummary, Preprocessor};
