//! Error types for stenogram.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StenogramError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio capture errors (fatal, pre-start)
    #[error("Audio input device unavailable: {device}")]
    DeviceUnavailable { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Recognition errors
    #[error("Recognition model not found at {path}")]
    ModelNotFound { path: String },

    #[error("Recognition unavailable: {message}")]
    RecognitionUnavailable { message: String },

    // Summarization errors (recoverable, skip the cycle)
    #[error("Insufficient input for summarization: {message}")]
    InsufficientInput { message: String },

    #[error("Summarization failed: {message}")]
    Summarization { message: String },

    // Output sink errors (recoverable while streaming, fatal at finalize)
    #[error("Failed to write {sink} output: {message}")]
    SinkWrite { sink: &'static str, message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl StenogramError {
    /// True for errors that must end the session (or prevent it starting).
    ///
    /// Recoverable errors are recorded in the session log and otherwise
    /// swallowed at the component boundary where they occur.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StenogramError::ConfigFileNotFound { .. }
                | StenogramError::ConfigParse { .. }
                | StenogramError::ConfigInvalidValue { .. }
                | StenogramError::Config(_)
                | StenogramError::DeviceUnavailable { .. }
                | StenogramError::ModelNotFound { .. }
                | StenogramError::RecognitionUnavailable { .. }
        )
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, StenogramError>;
