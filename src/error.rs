//! Error types for the registration progress engine.

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Progress source error: {0}")]
    Source(#[from] SourceError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Progress error: {0}")]
    Progress(#[from] ProgressError),
}

impl Error {
    /// Whether the caller has to send the user back through login.
    pub fn is_auth_required(&self) -> bool {
        matches!(self, Self::Source(SourceError::AuthRequired))
    }
}

/// Configuration-related errors. Fatal; these indicate a programmer error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown user type: {0}")]
    UnknownUserType(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the remote progress source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Progress fetch failed: {0}")]
    Network(String),

    #[error("Invalid progress response: {0}")]
    InvalidResponse(String),
}

/// Local cache errors. Logged and swallowed by the engine.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage quota exceeded writing {key}: {used} + {requested} > {quota} bytes")]
    QuotaExceeded {
        key: String,
        used: usize,
        requested: usize,
        quota: usize,
    },

    #[error("Write failed for {key}: {reason}")]
    WriteFailed { key: String, reason: String },

    #[error("Read failed for {key}: {reason}")]
    ReadFailed { key: String, reason: String },

    #[error("Storage backend unavailable: {0}")]
    Backend(String),

    #[error("Local cache schema error: {0}")]
    Schema(String),
}

/// Rejected operations on the progress snapshot.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("Registration progress has not been initialized")]
    NotInitialized,

    #[error("Stage {stage} does not exist (valid stages are 1..={total})")]
    InvalidStage { stage: u32, total: u32 },

    #[error("Stage {stage} is locked until stage {frontier} is completed")]
    StageLocked { stage: u32, frontier: u32 },
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
