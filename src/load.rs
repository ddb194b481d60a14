//! # System Load Sampling
//!
//! Injectable load-sampling capability used by the model selector. The production
//! sampler reads instantaneous CPU utilization via sysinfo; tests substitute fixed
//! or failing samplers. Keeping this behind a one-method trait lets the
//! fixed-threshold policy be replaced later with queue-depth or GPU telemetry
//! without touching the selector contract.

use std::fmt;
use std::time::Duration;

/// Load sampling failed or produced unusable data.
///
/// The selector never propagates this; it fails closed to the lightweight model
/// variant and logs the reason.
#[derive(Debug, Clone)]
pub struct SamplerError {
    message: String,
}

impl SamplerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for SamplerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load sampling failed: {}", self.message)
    }
}

impl std::error::Error for SamplerError {}

/// A point-in-time system load measurement in percent (0-100).
///
/// Sampled fresh on every run and never persisted; load can change between
/// invocations, so the selection it feeds must be re-evaluated each time.
pub trait LoadSampler {
    fn sample(&self) -> Result<f32, SamplerError>;
}

/// CPU utilization sampler backed by sysinfo.
///
/// CPU usage is a delta measurement, so a single refresh reads as zero. The
/// sampler refreshes, blocks for the configured settle window, refreshes again and
/// reads the global CPU figure. The window is the only deliberate blocking point
/// in the core and is bounded by configuration (default 250 ms, capped at 2 s by
/// config validation).
pub struct CpuLoadSampler {
    settle_window: Duration,
}

impl CpuLoadSampler {
    pub fn new(settle_window_ms: u64) -> Self {
        Self {
            settle_window: Duration::from_millis(settle_window_ms),
        }
    }
}

impl LoadSampler for CpuLoadSampler {
    fn sample(&self) -> Result<f32, SamplerError> {
        use sysinfo::System;

        let mut sys = System::new_all();
        sys.refresh_cpu();
        // Let the CPU counters move between the two refreshes
        std::thread::sleep(self.settle_window);
        sys.refresh_cpu();

        let usage = sys.global_cpu_info().cpu_usage();
        if !usage.is_finite() {
            return Err(SamplerError::new(format!(
                "non-finite CPU usage reading: {}",
                usage
            )));
        }

        tracing::debug!(cpu_usage_pct = usage, "sampled system load");
        Ok(usage)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_sampler_returns_in_range_value() {
        // Short window to keep the test fast; the reading itself is best-effort
        let sampler = CpuLoadSampler::new(50);
        let load = sampler.sample().unwrap();
        assert!(load.is_finite());
        assert!(load >= 0.0);
    }

    #[test]
    fn test_sampler_error_display() {
        let err = SamplerError::new("no /proc");
        assert!(err.to_string().contains("no /proc"));
    }
}
