//! # Engine Boundary
//!
//! The narrow contract the pipeline depends on: load a model variant, transcribe
//! one audio file. The pipeline treats everything behind these traits as a black
//! box; tests substitute mock engines, production uses [`WhisperEngine`].

use crate::audio;
use crate::config::AppConfig;
use crate::device;
use crate::selector::ModelChoice;
use crate::transcription::model::{ModelSize, ModelSource, WhisperModel};
use crate::transcription::Transcription;
use anyhow::{Context, Result};
use candle_core::Device;
use std::path::{Path, PathBuf};

/// A loaded model ready for inference.
#[allow(async_fn_in_trait)]
pub trait SpeechModel {
    async fn transcribe(&mut self, audio_path: &Path) -> Result<Transcription>;
}

/// Loads transcription models by variant.
#[allow(async_fn_in_trait)]
pub trait SpeechEngine {
    type Model: SpeechModel;

    async fn load(&self, choice: ModelChoice) -> Result<Self::Model>;
}

/// Candle-backed Whisper engine.
///
/// Owns the per-run inference settings: the compute device (resolved once from
/// configuration, never re-decided mid-run) and the mapping from model choice to
/// model source.
pub struct WhisperEngine {
    device: Device,
    fast_model: String,
    accurate_model: String,
    fine_tuned_dir: PathBuf,
    language: Option<String>,
}

impl WhisperEngine {
    pub fn new(config: &AppConfig) -> Self {
        let device = device::resolve_device(&config.engine.device);
        tracing::info!(device = device::device_name(&device), "initialized whisper engine");

        Self {
            device,
            fast_model: config.models.fast_model.clone(),
            accurate_model: config.models.accurate_model.clone(),
            fine_tuned_dir: config.models.fine_tuned_dir.clone(),
            language: config.engine.language.clone(),
        }
    }

    /// Map the selected variant to a concrete model source.
    fn source_for(&self, choice: ModelChoice) -> Result<ModelSource> {
        let hub_source = |name: &str| -> Result<ModelSource> {
            let size: ModelSize = name.parse()?;
            tracing::debug!(model = %size, repo = size.repo_name(), size_mb = size.size_mb(), "resolved hub model");
            Ok(ModelSource::HubRepo(size.repo_name().to_string()))
        };

        match choice {
            ModelChoice::Fast => hub_source(&self.fast_model),
            ModelChoice::Accurate => hub_source(&self.accurate_model),
            ModelChoice::FineTuned => Ok(ModelSource::LocalDir(self.fine_tuned_dir.clone())),
        }
    }
}

impl SpeechEngine for WhisperEngine {
    type Model = LoadedWhisper;

    async fn load(&self, choice: ModelChoice) -> Result<LoadedWhisper> {
        let source = self.source_for(choice)?;
        let model = WhisperModel::load(source, self.device.clone())
            .await
            .with_context(|| format!("failed to load {} model", choice))?;

        Ok(LoadedWhisper {
            model,
            language: self.language.clone(),
        })
    }
}

/// A Whisper model bound to the run's language setting.
pub struct LoadedWhisper {
    model: WhisperModel,
    language: Option<String>,
}

impl SpeechModel for LoadedWhisper {
    async fn transcribe(&mut self, audio_path: &Path) -> Result<Transcription> {
        let samples = audio::load_wav(audio_path)?;
        let segments = self.model.transcribe(&samples, self.language.as_deref())?;

        let text = segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Transcription { text, segments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_defaults() -> WhisperEngine {
        WhisperEngine::new(&AppConfig::default())
    }

    #[test]
    fn test_fast_and_accurate_resolve_to_hub_repos() {
        let engine = engine_with_defaults();

        let fast = engine.source_for(ModelChoice::Fast).unwrap();
        assert_eq!(fast, ModelSource::HubRepo("openai/whisper-base".to_string()));

        let accurate = engine.source_for(ModelChoice::Accurate).unwrap();
        assert_eq!(
            accurate,
            ModelSource::HubRepo("openai/whisper-medium".to_string())
        );
    }

    #[test]
    fn test_fine_tuned_resolves_to_local_dir() {
        let engine = engine_with_defaults();
        let source = engine.source_for(ModelChoice::FineTuned).unwrap();
        assert_eq!(
            source,
            ModelSource::LocalDir(PathBuf::from("models/fine-tuned"))
        );
    }

    #[test]
    fn test_unknown_variant_name_is_an_error() {
        let mut config = AppConfig::default();
        config.models.fast_model = "gigantic".to_string();
        let engine = WhisperEngine::new(&config);
        assert!(engine.source_for(ModelChoice::Fast).is_err());
    }
}
