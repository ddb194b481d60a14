//! # Transcription Module
//!
//! Speech-to-text transcription using Whisper models via the Candle-rs framework.
//! Pure Rust implementation, no FFI bindings to whisper.cpp.
//!
//! ## Key Components:
//! - **Engine boundary**: the [`engine::SpeechEngine`] / [`engine::SpeechModel`]
//!   traits the pipeline depends on; everything behind them is a black box to the
//!   selection and confidence logic
//! - **Model management**: loading Whisper variants from the HuggingFace hub or a
//!   local fine-tuned directory
//! - **Segmented output**: each 30-second decode window yields a timed segment
//!   carrying the mean log-probability of its tokens, which feeds the confidence
//!   aggregator

pub mod engine;
pub mod model;

use serde::Serialize;

/// A timed span of transcribed speech.
///
/// Produced in order by the engine; gaps in the timeline are permitted. The
/// log-probability is the natural log of the model's estimated probability that
/// the segment transcription is correct (always ≤ 0), and is absent when the
/// decoder emitted no scoreable tokens for the window.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    /// Segment start in seconds from the beginning of the audio (≥ 0).
    pub start: f64,

    /// Segment end in seconds (≥ start).
    pub end: f64,

    /// Mean log-probability of the decoded tokens, when available.
    pub avg_logprob: Option<f64>,

    /// Text decoded for this span.
    pub text: String,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Complete engine output for one audio file.
#[derive(Debug, Clone, Serialize)]
pub struct Transcription {
    /// Full transcript, segments joined in timeline order.
    pub text: String,

    /// Ordered timed segments covering the audio (gaps permitted).
    pub segments: Vec<Segment>,
}

pub use engine::{SpeechEngine, SpeechModel, WhisperEngine};
