//! # Model Selection
//!
//! Decides which transcription-model variant to run for a given invocation.
//! The policy is evaluated in strict order, first match wins:
//!
//! 1. A locally cached fine-tuned artifact exists → use it. A pre-validated local
//!    artifact is both faster to load and already fit for purpose, so it beats any
//!    load-based choice.
//! 2. System load above the threshold → the fast variant, trading accuracy for
//!    latency under contention.
//! 3. Otherwise → the accurate variant.
//!
//! Apart from the filesystem existence check and the load sample this is a pure
//! decision function. It is re-evaluated on every run; both load and artifact
//! availability can change between invocations.

use crate::load::LoadSampler;
use std::fmt;
use std::path::Path;

/// The closed set of model variants a run can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelChoice {
    /// Cheap, low-latency variant used under system contention.
    Fast,

    /// Heavier, higher-accuracy variant used when the system is idle enough.
    Accurate,

    /// Locally cached fine-tuned model, preferred whenever its artifact exists.
    FineTuned,
}

impl ModelChoice {
    /// Identifier reported in the result object and logs.
    pub fn identifier(&self) -> &'static str {
        match self {
            ModelChoice::Fast => "fast",
            ModelChoice::Accurate => "accurate",
            ModelChoice::FineTuned => "fine-tuned",
        }
    }

}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Choose the model variant for this run.
///
/// ## Parameters:
/// - **fine_tuned_dir**: configured location of the cached fine-tuned artifact
/// - **sampler**: load-sampling capability; sampled only when no artifact exists
/// - **threshold_pct**: load above which the fast variant wins (strictly greater;
///   a sample of exactly the threshold selects the accurate variant)
///
/// A failed sampler or an out-of-range sample fails closed to [`ModelChoice::Fast`]:
/// when load telemetry is untrustworthy, availability beats accuracy. The decision
/// is never cached across runs.
pub fn select_model(
    fine_tuned_dir: Option<&Path>,
    sampler: &dyn LoadSampler,
    threshold_pct: f32,
) -> ModelChoice {
    if let Some(dir) = fine_tuned_dir {
        if dir.exists() {
            tracing::info!(path = %dir.display(), "fine-tuned model artifact found, selecting it");
            return ModelChoice::FineTuned;
        }
    }

    let load = match sampler.sample() {
        Ok(load) if (0.0..=100.0).contains(&load) => load,
        Ok(load) => {
            tracing::warn!(
                load_pct = load,
                "load sample out of range, failing closed to the fast model"
            );
            return ModelChoice::Fast;
        }
        Err(err) => {
            tracing::warn!(error = %err, "load sampling failed, failing closed to the fast model");
            return ModelChoice::Fast;
        }
    };

    let choice = if load > threshold_pct {
        ModelChoice::Fast
    } else {
        ModelChoice::Accurate
    };

    tracing::info!(
        load_pct = load,
        threshold_pct,
        model = %choice,
        "selected model variant from system load"
    );
    choice
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::testing::{FailingSampler, FixedSampler};

    #[test]
    fn test_low_load_selects_accurate() {
        for load in [0.0, 12.5, 59.9] {
            let choice = select_model(None, &FixedSampler(load), 60.0);
            assert_eq!(choice, ModelChoice::Accurate, "load {}", load);
        }
    }

    #[test]
    fn test_high_load_selects_fast() {
        for load in [60.1, 75.0, 100.0] {
            let choice = select_model(None, &FixedSampler(load), 60.0);
            assert_eq!(choice, ModelChoice::Fast, "load {}", load);
        }
    }

    #[test]
    fn test_threshold_boundary_is_pinned_to_accurate() {
        // "Exceeds the threshold" is strict: exactly 60 stays on the accurate side
        let choice = select_model(None, &FixedSampler(60.0), 60.0);
        assert_eq!(choice, ModelChoice::Accurate);
    }

    #[test]
    fn test_artifact_beats_any_load() {
        let dir = tempfile::tempdir().unwrap();
        let choice = select_model(Some(dir.path()), &FixedSampler(99.0), 60.0);
        assert_eq!(choice, ModelChoice::FineTuned);
    }

    #[test]
    fn test_missing_artifact_falls_through_to_load_policy() {
        let choice = select_model(
            Some(Path::new("/nonexistent/fine-tuned")),
            &FixedSampler(10.0),
            60.0,
        );
        assert_eq!(choice, ModelChoice::Accurate);
    }

    #[test]
    fn test_sampler_failure_fails_closed() {
        let choice = select_model(None, &FailingSampler, 60.0);
        assert_eq!(choice, ModelChoice::Fast);
    }

    #[test]
    fn test_out_of_range_sample_fails_closed() {
        for load in [-5.0, 150.0] {
            let choice = select_model(None, &FixedSampler(load), 60.0);
            assert_eq!(choice, ModelChoice::Fast, "load {}", load);
        }
    }

    #[test]
    fn test_identifiers_are_stable() {
        assert_eq!(ModelChoice::Fast.to_string(), "fast");
        assert_eq!(ModelChoice::Accurate.to_string(), "accurate");
        assert_eq!(ModelChoice::FineTuned.to_string(), "fine-tuned");
    }
}
