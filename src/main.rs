//! # whisper-scribe
//!
//! Command-line adapter that feeds one audio file to a Whisper transcription
//! engine and emits a single JSON result line on stdout.
//!
//! ## Application Architecture:
//! - **config**: layered run configuration (TOML file + APP_ environment variables)
//! - **selector**: adaptive model-variant choice from system load and cached artifacts
//! - **confidence**: duration-weighted reduction of segment log-probabilities
//! - **media**: ffmpeg availability probe
//! - **transcription**: candle-based Whisper engine behind a narrow trait boundary
//! - **pipeline**: run orchestration and the outermost error boundary
//!
//! Stdout carries exactly one JSON object per run — success or failure — so all
//! logging goes to stderr. Only a missing command-line argument exits non-zero;
//! every failure after argument parsing is reported through the error object.

mod audio;
mod config;
mod confidence;
mod device;
mod error;
mod load;
mod media;
mod pipeline;
mod selector;
mod transcription;

use clap::Parser;
use config::AppConfig;
use error::{AppError, AppResult};
use load::CpuLoadSampler;
use media::FfmpegProbe;
use pipeline::RunReport;
use std::path::PathBuf;
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transcription::WhisperEngine;
use uuid::Uuid;

/// Transcribe one audio file and print a single JSON result.
#[derive(Debug, Parser)]
#[command(name = "whisper-scribe", version, about)]
struct Cli {
    /// Path to the audio file to transcribe
    audio: PathBuf,

    /// Configuration file (defaults to config.toml in the working directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Compute device preference: auto, cpu, cuda or metal
    #[arg(long)]
    device: Option<String>,

    /// Explicit path to the ffmpeg executable
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Directory holding a locally cached fine-tuned model
    #[arg(long = "fine-tuned")]
    fine_tuned: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // A missing required argument is the one failure that exits non-zero,
    // before any processing begins
    let cli = Cli::parse();

    init_tracing();

    let result = execute(cli).await;

    // Exactly one JSON line on stdout, success or failure; callers parse the
    // body rather than the exit code
    match result {
        Ok(report) => match serde_json::to_string(&report) {
            Ok(line) => println!("{}", line),
            Err(e) => {
                let err = AppError::Engine(format!("failed to serialize result: {}", e));
                println!("{}", err.to_report());
            }
        },
        Err(err) => {
            tracing::error!(kind = err.kind(), error = %err, "run failed");
            println!("{}", err.to_report());
        }
    }
}

/// Build the collaborators from configuration and drive one run.
async fn execute(cli: Cli) -> AppResult<RunReport> {
    let mut config =
        AppConfig::load(cli.config.as_deref()).map_err(|e| AppError::Config(format!("{:#}", e)))?;

    // Command-line flags take priority over file and environment values
    if let Some(device) = cli.device {
        config.engine.device = device;
    }
    if let Some(ffmpeg) = cli.ffmpeg {
        config.media.ffmpeg_path = Some(ffmpeg);
    }
    if let Some(dir) = cli.fine_tuned {
        config.models.fine_tuned_dir = dir;
    }

    config
        .validate()
        .map_err(|e| AppError::Config(format!("{:#}", e)))?;

    let probe = FfmpegProbe::new(config.media.ffmpeg_path.clone());
    let sampler = CpuLoadSampler::new(config.selection.sample_window_ms);
    let engine = WhisperEngine::new(&config);

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("run", %run_id, audio = %cli.audio.display());
    pipeline::run(&cli.audio, &config, &engine, &sampler, &probe)
        .instrument(span)
        .await
}

/// Initialize tracing on stderr so stdout stays a pure result channel.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whisper_scribe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_the_audio_argument() {
        assert!(Cli::try_parse_from(["whisper-scribe"]).is_err());
    }

    #[test]
    fn test_cli_parses_audio_path_and_flags() {
        let cli = Cli::try_parse_from([
            "whisper-scribe",
            "meeting.wav",
            "--device",
            "cpu",
            "--fine-tuned",
            "/models/custom",
        ])
        .unwrap();

        assert_eq!(cli.audio, PathBuf::from("meeting.wav"));
        assert_eq!(cli.device.as_deref(), Some("cpu"));
        assert_eq!(cli.fine_tuned, Some(PathBuf::from("/models/custom")));
        assert!(cli.ffmpeg.is_none());
    }
}
