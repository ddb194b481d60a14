//! # Audio Input
//!
//! Decoding and preprocessing of the input audio file for the transcription
//! pipeline. Whisper expects mono 32-bit float samples at 16 kHz in `[-1.0, 1.0]`;
//! the reader converts whatever the WAV container holds into that shape.

pub mod reader;

pub use reader::{load_wav, SAMPLE_RATE};
