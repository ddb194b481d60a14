//! # Media Decoder Probe
//!
//! Availability check for the external media-processing executable (ffmpeg). The
//! engine relies on ffmpeg being present for anything beyond plain WAV input, so
//! the probe runs a version health check before any transcription work starts.
//!
//! The executable location is an explicit configuration value, falling back to a
//! PATH lookup via `which`. The process environment is never mutated to make the
//! decoder discoverable.

use crate::error::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Decoder availability check, injectable so the pipeline can be tested without
/// ffmpeg installed.
pub trait MediaProbe {
    fn verify(&self) -> AppResult<()>;
}

/// Probe backed by a concrete ffmpeg executable.
///
/// Resolution is deferred to [`MediaProbe::verify`] so constructing the probe
/// never fails; the pipeline decides when dependency errors may surface.
pub struct FfmpegProbe {
    configured: Option<PathBuf>,
}

impl FfmpegProbe {
    /// Probe using the configured executable path, or PATH discovery when unset.
    pub fn new(configured: Option<PathBuf>) -> Self {
        Self { configured }
    }

    /// Resolve the ffmpeg executable from configuration or PATH.
    ///
    /// An explicitly configured path must exist; without one, `which` searches
    /// PATH. Either way the result is carried as an explicit value from here on.
    fn resolve(&self) -> AppResult<PathBuf> {
        match &self.configured {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Dependency(format!(
                        "FFmpeg not found at {}",
                        path.display()
                    )));
                }
                Ok(path.clone())
            }
            None => which::which("ffmpeg").map_err(|_| {
                AppError::Dependency(
                    "FFmpeg not found on PATH; set media.ffmpeg_path or install ffmpeg"
                        .to_string(),
                )
            }),
        }
    }

    fn health_check(executable: &Path) -> AppResult<()> {
        let status = Command::new(executable)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| AppError::Dependency(format!("FFmpeg execution failed: {}", e)))?;

        if !status.success() {
            return Err(AppError::Dependency(format!(
                "FFmpeg health check exited with {}",
                status
            )));
        }

        Ok(())
    }
}

impl MediaProbe for FfmpegProbe {
    /// Resolve the executable and run `ffmpeg -version` with suppressed output.
    fn verify(&self) -> AppResult<()> {
        let executable = self.resolve()?;
        tracing::debug!(ffmpeg = %executable.display(), "verifying media decoder");
        Self::health_check(&executable)
    }
}

#[cfg(test)]
pub mod testing {
    //! Probe stubs for pipeline tests.

    use super::*;

    /// Always reports the decoder as healthy.
    pub struct HealthyProbe;

    impl MediaProbe for HealthyProbe {
        fn verify(&self) -> AppResult<()> {
            Ok(())
        }
    }

    /// Always reports the decoder as missing.
    pub struct MissingProbe;

    impl MediaProbe for MissingProbe {
        fn verify(&self) -> AppResult<()> {
            Err(AppError::Dependency("FFmpeg not found".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_path_must_exist() {
        let probe = FfmpegProbe::new(Some(PathBuf::from("/nonexistent/ffmpeg")));
        let err = probe.verify().unwrap_err();
        assert!(matches!(err, AppError::Dependency(_)));
        assert!(err.to_string().contains("/nonexistent/ffmpeg"));
    }

    #[cfg(unix)]
    #[test]
    fn test_verify_accepts_working_executable() {
        // `true` ignores its arguments and exits 0, standing in for ffmpeg
        let probe = FfmpegProbe::new(Some(PathBuf::from("/bin/true")));
        assert!(probe.verify().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_verify_rejects_failing_executable() {
        let probe = FfmpegProbe::new(Some(PathBuf::from("/bin/false")));
        let err = probe.verify().unwrap_err();
        assert!(matches!(err, AppError::Dependency(_)));
        assert!(err.to_string().contains("health check"));
    }
}
