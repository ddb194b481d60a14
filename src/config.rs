//! # Configuration Management
//!
//! Loads and validates the run configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Command-line flags (applied by the caller after loading)
//! 2. Environment variables (APP_SELECTION__LOAD_THRESHOLD_PCT, etc. —
//!    double underscore between section and field so multi-word field
//!    names survive the key split)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for a transcription run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub models: ModelsConfig,
    pub selection: SelectionConfig,
    pub media: MediaConfig,
    pub engine: EngineConfig,
}

/// Model variant configuration.
///
/// ## Fields:
/// - `fast_model`: cheap/low-latency Whisper variant used under load ("tiny", "base", ...)
/// - `accurate_model`: heavier variant used when the system is idle enough
/// - `fine_tuned_dir`: directory holding a locally cached fine-tuned model; when the
///   directory exists it is preferred over both hub variants
///
/// ## Model size trade-offs:
/// - Smaller models: faster processing, less memory, lower accuracy
/// - Larger models: slower processing, more memory, higher accuracy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub fast_model: String,
    pub accurate_model: String,
    pub fine_tuned_dir: PathBuf,
}

/// Model selection policy tuning.
///
/// ## Fields:
/// - `load_threshold_pct`: CPU load above which the fast variant is chosen (0-100)
/// - `sample_window_ms`: settle window for the CPU load measurement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub load_threshold_pct: f32,
    pub sample_window_ms: u64,
}

/// Media decoder configuration.
///
/// When `ffmpeg_path` is unset the executable is discovered on PATH. The path is
/// passed explicitly to the probe; the process environment is never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub ffmpeg_path: Option<PathBuf>,
}

/// Transcription engine configuration.
///
/// ## Fields:
/// - `device`: compute device preference ("auto", "cpu", "cuda", "metal"), resolved
///   once per run before the model is loaded
/// - `language`: ISO 639-1 language hint passed to the decoder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub device: String,
    pub language: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models: ModelsConfig {
                fast_model: "base".to_string(),      // Fastest variant worth shipping
                accurate_model: "medium".to_string(), // Good accuracy, technical vocabulary
                fine_tuned_dir: PathBuf::from("models/fine-tuned"),
            },
            selection: SelectionConfig {
                load_threshold_pct: 60.0,
                sample_window_ms: 250,
            },
            media: MediaConfig { ffmpeg_path: None },
            engine: EngineConfig {
                device: "auto".to_string(),
                language: Some("en".to_string()),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional TOML file, and APP_-prefixed
    /// environment variables.
    ///
    /// `file` overrides the default `config.toml` lookup; a missing default file is
    /// not an error, a missing explicit file is.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder()
            // 1. Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?);

        // 2. Layer the configuration file
        settings = match file {
            Some(path) => settings.add_source(config::File::from(path)),
            None => settings.add_source(config::File::with_name("config").required(false)),
        };

        // 3. Environment variables: APP_SELECTION__SAMPLE_WINDOW_MS etc.
        // "__" separates section from field; a single "_" would split
        // multi-word field names like load_threshold_pct into bogus nesting
        settings = settings.add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        );

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// Catching bad values here keeps the failure on the config path instead of
    /// surfacing mid-run as a confusing engine error.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.selection.load_threshold_pct) {
            return Err(anyhow::anyhow!(
                "Load threshold must be within 0-100, got {}",
                self.selection.load_threshold_pct
            ));
        }

        if self.selection.sample_window_ms == 0 || self.selection.sample_window_ms > 2000 {
            return Err(anyhow::anyhow!(
                "Load sample window must be between 1 and 2000 ms, got {}",
                self.selection.sample_window_ms
            ));
        }

        if self.models.fast_model.trim().is_empty() || self.models.accurate_model.trim().is_empty()
        {
            return Err(anyhow::anyhow!("Model variant names cannot be empty"));
        }

        Ok(())
    }
}
