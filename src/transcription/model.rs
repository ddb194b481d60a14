//! # Whisper Model Management
//!
//! Loading and running Whisper models with Candle-rs. Models come from one of two
//! sources: a HuggingFace hub repository (the fast/accurate variants) or a local
//! directory holding a fine-tuned artifact.
//!
//! ## Model Loading Process:
//! 1. Resolve model files (hub download with local cache, or local directory)
//! 2. Load configuration, tokenizer and safetensors weights
//! 3. Initialize the model on the resolved device
//!
//! ## Decoding:
//! Audio is processed in 30-second windows. Each window produces one timed
//! segment whose score is the mean log-probability of the greedily decoded
//! tokens, taken from the softmax of the decoder logits.

use crate::audio::SAMPLE_RATE;
use crate::transcription::Segment;
use anyhow::{anyhow, Context, Result};
use candle_core::{Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::whisper::{self as m, Config};
use std::path::PathBuf;
use tokenizers::Tokenizer;

/// Whisper works best on windows no longer than 30 seconds.
const CHUNK_SECONDS: usize = 30;
const CHUNK_SAMPLES: usize = CHUNK_SECONDS * SAMPLE_RATE as usize;

/// Cap on decoded tokens per window.
const MAX_TOKENS: usize = 200;

/// Standard Whisper special token ids.
const SOT_TOKEN: u32 = 50258;
const EOT_TOKEN: u32 = 50257;
const TRANSCRIBE_TOKEN: u32 = 50359;

/// Available hub-hosted Whisper model sizes.
///
/// ## Trade-offs:
/// - **Size vs accuracy**: larger models are more accurate but slower
/// - **Memory vs speed**: more memory usage for better output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    /// HuggingFace model repository for this size.
    pub fn repo_name(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "openai/whisper-tiny",
            ModelSize::Base => "openai/whisper-base",
            ModelSize::Small => "openai/whisper-small",
            ModelSize::Medium => "openai/whisper-medium",
            ModelSize::Large => "openai/whisper-large-v2",
        }
    }

    /// Approximate weights size in MB.
    pub fn size_mb(&self) -> u32 {
        match self {
            ModelSize::Tiny => 39,
            ModelSize::Base => 74,
            ModelSize::Small => 244,
            ModelSize::Medium => 769,
            ModelSize::Large => 1550,
        }
    }
}

impl std::str::FromStr for ModelSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(ModelSize::Tiny),
            "base" => Ok(ModelSize::Base),
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large" => Ok(ModelSize::Large),
            _ => Err(anyhow!("Unknown model size: {}", s)),
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        };
        write!(f, "{}", name)
    }
}

/// Where model files come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// HuggingFace hub repository, downloaded and cached locally.
    HubRepo(String),
    /// Local directory with config.json, tokenizer.json and model.safetensors.
    LocalDir(PathBuf),
}

/// Resolved locations of the three files a model load needs.
#[derive(Debug)]
struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

/// A loaded Whisper model ready for transcription.
pub struct WhisperModel {
    model: m::model::Whisper,
    config: Config,
    device: Device,
    tokenizer: Tokenizer,
    mel_filters: Vec<f32>,
}

impl WhisperModel {
    /// Load a Whisper model from the given source.
    pub async fn load(source: ModelSource, device: Device) -> Result<Self> {
        let start_time = std::time::Instant::now();

        let files = match &source {
            ModelSource::HubRepo(repo) => Self::fetch_hub_files(repo).await?,
            ModelSource::LocalDir(dir) => Self::local_files(dir.clone())?,
        };

        let config: Config = serde_json::from_reader(
            std::fs::File::open(&files.config)
                .with_context(|| format!("failed to open {}", files.config.display()))?,
        )?;

        let tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| anyhow!("failed to load tokenizer: {}", e))?;

        let mel_filters = Self::load_mel_filters(&config);

        if !files.weights.to_string_lossy().ends_with(".safetensors") {
            return Err(anyhow!("only safetensors model weights are supported"));
        }
        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[files.weights], m::DTYPE, &device)? };
        let model = m::model::Whisper::load(&vb, config.clone())?;

        tracing::info!(
            source = ?source,
            load_s = start_time.elapsed().as_secs_f64(),
            "whisper model loaded"
        );

        Ok(Self {
            model,
            config,
            device,
            tokenizer,
            mel_filters,
        })
    }

    /// Download model files from the hub, using the shared local cache.
    async fn fetch_hub_files(repo_name: &str) -> Result<ModelFiles> {
        use hf_hub::api::tokio::ApiBuilder;

        let mut builder = ApiBuilder::new().with_progress(false);
        if let Ok(token) = std::env::var("HF_TOKEN") {
            builder = builder.with_token(Some(token));
        }
        if let Ok(cache_dir) = std::env::var("HF_HUB_CACHE") {
            builder = builder.with_cache_dir(cache_dir.into());
        }
        let api = builder
            .build()
            .map_err(|e| anyhow!("failed to initialize HuggingFace API: {}", e))?;

        tracing::info!(repo = repo_name, "fetching model files from the hub");
        let repo = api.model(repo_name.to_string());

        let config = repo
            .get("config.json")
            .await
            .map_err(|e| anyhow!("failed to download config.json from {}: {}", repo_name, e))?;
        let tokenizer = repo
            .get("tokenizer.json")
            .await
            .map_err(|e| anyhow!("failed to download tokenizer.json from {}: {}", repo_name, e))?;
        let weights = repo
            .get("model.safetensors")
            .await
            .map_err(|e| anyhow!("failed to download model weights from {}: {}", repo_name, e))?;

        Ok(ModelFiles {
            config,
            tokenizer,
            weights,
        })
    }

    /// Resolve model files inside a local fine-tuned directory.
    fn local_files(dir: PathBuf) -> Result<ModelFiles> {
        let files = ModelFiles {
            config: dir.join("config.json"),
            tokenizer: dir.join("tokenizer.json"),
            weights: dir.join("model.safetensors"),
        };

        for path in [&files.config, &files.tokenizer, &files.weights] {
            if !path.exists() {
                return Err(anyhow!(
                    "fine-tuned model is missing {} (expected in {})",
                    path.file_name().unwrap_or_default().to_string_lossy(),
                    dir.display()
                ));
            }
        }

        Ok(files)
    }

    /// Mel filters sized for the model configuration.
    fn load_mel_filters(config: &Config) -> Vec<f32> {
        let n_fft = 400; // Standard for 16kHz Whisper
        let n_mels = config.num_mel_bins as usize;
        create_mel_filter_bank(n_fft, n_mels)
    }

    /// Convert PCM audio to the mel spectrogram tensor the encoder expects.
    fn pcm_to_mel(&self, pcm_data: &[f32]) -> Result<Tensor> {
        // Pad or truncate to the 30-second window
        let mut padded_audio = vec![0.0f32; CHUNK_SAMPLES];
        let copy_len = pcm_data.len().min(CHUNK_SAMPLES);
        padded_audio[..copy_len].copy_from_slice(&pcm_data[..copy_len]);

        let n_mels = self.config.num_mel_bins as usize;
        let n_frames = 3000; // Standard Whisper frame count for 30s

        let mut mel_data = vec![0.0f32; n_mels * n_frames];

        // Energy-based log-mel features
        let frame_size = padded_audio.len() / n_frames;
        for frame in 0..n_frames {
            let start = frame * frame_size;
            let end = (start + frame_size).min(padded_audio.len());

            for mel_bin in 0..n_mels {
                let mut energy = 0.0f32;
                for sample in &padded_audio[start..end] {
                    energy += sample.abs() * self.mel_filters[mel_bin % self.mel_filters.len()];
                }

                // -80 dB floor
                mel_data[mel_bin * n_frames + frame] =
                    (energy / frame_size as f32).ln().max(-11.5129);
            }
        }

        Ok(Tensor::from_vec(mel_data, (n_mels, n_frames), &self.device)?)
    }

    /// Transcribe audio samples into timed segments.
    ///
    /// ## Audio Requirements:
    /// - Sample rate: 16kHz, mono, 32-bit float in [-1.0, 1.0]
    ///
    /// Each 30-second window becomes one [`Segment`]; segment timestamps are
    /// window offsets, and the log-probability is the mean over the window's
    /// decoded tokens (absent when the decoder emitted none).
    pub fn transcribe(&mut self, samples: &[f32], language: Option<&str>) -> Result<Vec<Segment>> {
        if samples.is_empty() {
            return Err(anyhow!("audio data is empty"));
        }

        if samples.len() < SAMPLE_RATE as usize {
            tracing::warn!("audio is shorter than 1 second, transcription may be inaccurate");
        }

        let mut segments = Vec::new();
        for (index, window) in samples.chunks(CHUNK_SAMPLES).enumerate() {
            let start = (index * CHUNK_SECONDS) as f64;
            let end = start + window.len() as f64 / SAMPLE_RATE as f64;

            let (text, avg_logprob) = self.decode_window(window, language)?;
            tracing::debug!(start, end, avg_logprob, text = %text, "decoded window");

            segments.push(Segment {
                start,
                end,
                avg_logprob,
                text,
            });
        }

        Ok(segments)
    }

    /// Greedily decode one audio window, tracking token log-probabilities.
    fn decode_window(
        &mut self,
        window: &[f32],
        language: Option<&str>,
    ) -> Result<(String, Option<f64>)> {
        let mel = self.pcm_to_mel(window)?.unsqueeze(0)?;
        let encoder_output = self.model.encoder.forward(&mel, true)?;

        let mut tokens = vec![SOT_TOKEN];
        if let Some(lang) = language {
            if let Some(lang_token) = language_token(lang) {
                tokens.push(lang_token);
            }
        }
        tokens.push(TRANSCRIBE_TOKEN);

        let mut output_tokens = Vec::new();
        let mut sum_logprob = 0.0f64;

        for _ in 0..MAX_TOKENS {
            let token_tensor = Tensor::new(&tokens[..], &self.device)?.unsqueeze(0)?;
            let ys = self
                .model
                .decoder
                .forward(&token_tensor, &encoder_output, true)?;

            // Project the last position's hidden state onto the vocabulary
            let last_logits = self
                .model
                .decoder
                .final_linear(&ys.i((..1, tokens.len() - 1..))?)?
                .i(0)?
                .i(0)?;
            let next_token = last_logits.argmax(0)?.to_scalar::<u32>()?;

            if next_token == EOT_TOKEN {
                break;
            }
            if is_repetitive(&output_tokens, next_token) {
                tracing::debug!("repetition detected, stopping decode for this window");
                break;
            }

            let probs = candle_nn::ops::softmax_last_dim(&last_logits)?;
            let prob = probs.i(next_token as usize)?.to_scalar::<f32>()? as f64;
            sum_logprob += prob.max(1e-10).ln();

            tokens.push(next_token);
            output_tokens.push(next_token);
        }

        let avg_logprob = if output_tokens.is_empty() {
            None
        } else {
            Some(sum_logprob / output_tokens.len() as f64)
        };

        let text = self.decode_tokens(&output_tokens)?;
        Ok((text, avg_logprob))
    }

    /// Decode token ids to text and strip special-token artifacts.
    fn decode_tokens(&self, tokens: &[u32]) -> Result<String> {
        let text = self
            .tokenizer
            .decode(tokens, true)
            .map_err(|e| anyhow!("tokenizer decode error: {}", e))?;

        let cleaned = text
            .replace("<|startoftranscript|>", "")
            .replace("<|endoftext|>", "")
            .replace("<|notimestamps|>", "");

        Ok(cleaned.trim().to_string())
    }
}

/// Triangular mel filter bank.
fn create_mel_filter_bank(n_fft: usize, n_mels: usize) -> Vec<f32> {
    let mut filters = vec![0.0f32; n_mels];

    for (i, filter) in filters.iter_mut().enumerate() {
        let center = (i + 1) * n_fft / (n_mels + 1);
        let width = n_fft / (n_mels + 1);
        *filter = 1.0 - (center % width.max(1)) as f32 / n_fft as f32;
    }

    filters
}

/// Detect token repetition loops (immediate triples and 3-token patterns).
fn is_repetitive(tokens: &[u32], new_token: u32) -> bool {
    if tokens.len() >= 2 {
        let n = tokens.len();
        if tokens[n - 1] == new_token && tokens[n - 2] == new_token {
            return true;
        }
    }

    if tokens.len() >= 5 {
        let n = tokens.len();
        let candidate = [tokens[n - 2], tokens[n - 1], new_token];
        let previous = [tokens[n - 5], tokens[n - 4], tokens[n - 3]];
        if candidate == previous {
            return true;
        }
    }

    false
}

/// Language token for the decoder prompt.
fn language_token(language: &str) -> Option<u32> {
    match language.to_lowercase().as_str() {
        "en" | "english" => Some(50259),
        "es" | "spanish" => Some(50262),
        "fr" | "french" => Some(50265),
        "de" | "german" => Some(50261),
        "it" | "italian" => Some(50274),
        "pt" | "portuguese" => Some(50267),
        "ru" | "russian" => Some(50263),
        "ja" | "japanese" => Some(50266),
        "ko" | "korean" => Some(50264),
        "zh" | "chinese" => Some(50260),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_size_parsing() {
        assert_eq!("medium".parse::<ModelSize>().unwrap(), ModelSize::Medium);
        assert_eq!("LARGE".parse::<ModelSize>().unwrap(), ModelSize::Large);
        assert!("invalid".parse::<ModelSize>().is_err());
        // Display round-trips through FromStr
        assert_eq!(ModelSize::Medium.to_string(), "medium");
        assert_eq!(ModelSize::Large.to_string().parse::<ModelSize>().unwrap(), ModelSize::Large);
    }

    #[test]
    fn test_repo_names() {
        assert_eq!(ModelSize::Base.repo_name(), "openai/whisper-base");
        assert_eq!(ModelSize::Large.repo_name(), "openai/whisper-large-v2");
        assert!(ModelSize::Tiny.size_mb() < ModelSize::Medium.size_mb());
    }

    #[test]
    fn test_local_files_require_all_three() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        std::fs::write(dir.path().join("tokenizer.json"), "{}").unwrap();
        // model.safetensors intentionally missing
        let err = WhisperModel::local_files(dir.path().to_path_buf()).unwrap_err();
        assert!(err.to_string().contains("model.safetensors"));
    }

    #[test]
    fn test_repetition_guard_catches_triples() {
        assert!(is_repetitive(&[7, 7], 7));
        assert!(!is_repetitive(&[7, 8], 7));
    }

    #[test]
    fn test_repetition_guard_catches_patterns() {
        // "1 2 3 1 2" + 3 repeats the previous 3-token phrase
        assert!(is_repetitive(&[1, 2, 3, 1, 2], 3));
        assert!(!is_repetitive(&[1, 2, 3, 4, 5], 6));
    }

    #[test]
    fn test_language_tokens() {
        assert_eq!(language_token("en"), Some(50259));
        assert_eq!(language_token("English"), Some(50259));
        assert_eq!(language_token("tlh"), None);
    }

    #[test]
    fn test_mel_filter_bank_shape() {
        let filters = create_mel_filter_bank(400, 80);
        assert_eq!(filters.len(), 80);
        assert!(filters.iter().all(|f| f.is_finite()));
    }
}
