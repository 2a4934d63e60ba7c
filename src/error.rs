use thiserror::Error;

/// Errors from executing a command on the remote host
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("SSH connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Remote command exited with status {exit_code}: {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    #[error("Remote command did not finish within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur while persisting raw record batches
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to serialize record: {0}")]
    SerializeError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur during the preprocessing pass
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to serialize event: {0}")]
    SerializeError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}
