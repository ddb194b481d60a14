//! # Error Handling
//!
//! Custom error types for the transcription run and their conversion into the
//! single-line JSON error object that is the only failure output of the process.
//!
//! ## Error Categories:
//! - **Input**: the audio file is missing or unreadable
//! - **Dependency**: the media decoder (ffmpeg) is missing or fails its health check
//! - **Engine**: the transcription engine failed (model load, inference, audio decode)
//! - **Config**: configuration could not be loaded or failed validation

use serde_json::json;
use std::fmt;

/// Failure taxonomy for a transcription run.
///
/// Every variant carries the human-readable message that ends up in the
/// `{"error": ...}` object. None of these are retried; a failed run is terminal
/// and retry is the caller's responsibility.
#[derive(Debug)]
pub enum AppError {
    /// Input audio file missing or unreadable. Reported before any engine work.
    Input(String),

    /// Media decoder missing or failed its version check. Reported before the
    /// transcription engine is invoked.
    Dependency(String),

    /// Any failure raised by the transcription engine collaborator.
    Engine(String),

    /// Configuration file or environment variable problems.
    Config(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Input(msg) => write!(f, "Input error: {}", msg),
            AppError::Dependency(msg) => write!(f, "Dependency error: {}", msg),
            AppError::Engine(msg) => write!(f, "Transcription engine failed: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Machine-readable tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Input(_) => "input_error",
            AppError::Dependency(_) => "dependency_error",
            AppError::Engine(_) => "engine_error",
            AppError::Config(_) => "config_error",
        }
    }

    /// Build the error object emitted on stdout.
    ///
    /// The contract with callers is exactly one JSON object per run, success or
    /// failure, so every error funnels through this representation.
    pub fn to_report(&self) -> serde_json::Value {
        json!({ "error": self.to_string() })
    }
}

/// Engine failures are caught at the run boundary and converted with their
/// underlying message; nothing from the engine propagates as an unhandled fault.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Engine(format!("{:#}", err))
    }
}

/// Shorthand for Results using our error type.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_report_shape() {
        let err = AppError::Input("audio file not found at /tmp/missing.wav".to_string());
        let report = err.to_report();
        let message = report["error"].as_str().unwrap();
        assert!(message.contains("/tmp/missing.wav"));
        // The error object carries exactly one field
        assert_eq!(report.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(AppError::Engine("x".into()).kind(), "engine_error");
        assert_eq!(AppError::Dependency("x".into()).kind(), "dependency_error");
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: AppError = anyhow::anyhow!("model weights corrupt").into();
        assert!(matches!(err, AppError::Engine(_)));
        assert!(err.to_string().contains("model weights corrupt"));
    }
}
