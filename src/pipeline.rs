//! # Run Orchestration
//!
//! Drives one transcription run end to end: validate the input, check the media
//! decoder, select a model variant, transcribe, aggregate confidence and build
//! the single result object.
//!
//! Each invocation is independent: load is sampled and the model selected fresh,
//! and no state survives the run. All collaborators are injected so the flow can
//! be tested without ffmpeg, telemetry or model weights.

use crate::config::AppConfig;
use crate::confidence;
use crate::error::{AppError, AppResult};
use crate::load::LoadSampler;
use crate::media::MediaProbe;
use crate::selector::select_model;
use crate::transcription::{SpeechEngine, SpeechModel};
use serde::Serialize;
use std::path::Path;

/// The sole externally visible artifact of a successful run.
///
/// Invariant: `confidence_percent == round(confidence * 100)` for the reported
/// (4-digit) confidence value.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub text: String,
    pub model: String,
    pub confidence: f64,
    pub confidence_percent: u8,
}

/// Execute one transcription run.
///
/// ## Order of operations:
/// 1. input file must exist (the engine is never touched otherwise)
/// 2. decoder health check
/// 3. model selection from artifact presence and system load
/// 4. engine load + transcribe
/// 5. confidence aggregation and report assembly
pub async fn run<E: SpeechEngine>(
    audio_path: &Path,
    config: &AppConfig,
    engine: &E,
    sampler: &dyn LoadSampler,
    probe: &dyn MediaProbe,
) -> AppResult<RunReport> {
    if !audio_path.exists() {
        return Err(AppError::Input(format!(
            "audio file not found at {}",
            audio_path.display()
        )));
    }

    probe.verify()?;

    let choice = select_model(
        Some(&config.models.fine_tuned_dir),
        sampler,
        config.selection.load_threshold_pct,
    );

    let mut model = engine.load(choice).await.map_err(AppError::from)?;
    let transcription = model.transcribe(audio_path).await.map_err(AppError::from)?;

    let confidence = confidence::round_score(confidence::aggregate(&transcription.segments));
    let report = RunReport {
        text: transcription.text,
        model: choice.identifier().to_string(),
        confidence,
        confidence_percent: confidence::as_percent(confidence),
    };

    tracing::info!(
        model = %choice,
        segments = transcription.segments.len(),
        confidence = report.confidence,
        chars = report.text.len(),
        "transcription completed"
    );

    Ok(report)
}
