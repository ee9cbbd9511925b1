use thiserror::Error;

/// Main error type for the data-prep and training orchestrator
#[derive(Error, Debug)]
pub enum PipelineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {dataset}: {reason}")]
    Download { dataset: String, reason: String },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // Dispatch errors
    #[error(
        "The run method you tried to call is not implemented: '{0}'. Use one of: data, tl, rl, both, rl_s2, board"
    )]
    UnknownRunMode(String),

    #[error("Unknown data type '{0}'. Use one of: tack, synthetic")]
    UnknownDataType(String),

    // External process errors
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Training stage {stage} failed (exit code {code:?})")]
    TrainerFailed { stage: String, code: Option<i32> },

    #[error("Standardizer failed: {0}")]
    Standardizer(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn download(dataset: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Download {
            dataset: dataset.into(),
            reason: reason.into(),
        }
    }
}
