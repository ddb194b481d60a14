//! # Confidence Aggregation
//!
//! Reduces the engine's per-segment log-probabilities to one calibrated scalar in
//! `[0, 1]` plus an integer percentage.
//!
//! Each segment contributes `exp(avg_logprob)` weighted by its duration. Duration
//! weighting keeps many short filler segments from dominating a few long
//! substantive ones; speech duration approximates information content. The
//! exponential is the natural inverse of the log-probability and maps values ≤ 0
//! monotonically into `(0, 1]`.

use crate::transcription::Segment;

/// Confidence reported when no segment carried a log-probability.
///
/// Unknown confidence is represented as indifference rather than an error, so an
/// empty or unscored transcription still yields a well-formed result object.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Floor applied to segment durations to keep zero-length or malformed segments
/// from dividing by zero.
const MIN_SEGMENT_DURATION: f64 = 1e-3;

/// Duration-weighted mean confidence over the segment sequence.
///
/// Segments without a log-probability are skipped entirely (they update neither
/// the numerator nor the denominator). Returns [`NEUTRAL_CONFIDENCE`] when nothing
/// contributed; otherwise the weighted mean, clamped into `[0, 1]` to guard
/// against numerical edge cases.
pub fn aggregate(segments: &[Segment]) -> f64 {
    let mut numerator = 0.0f64;
    let mut denominator = 0.0f64;

    for segment in segments {
        let Some(avg_logprob) = segment.avg_logprob else {
            continue;
        };

        let duration = segment.duration().max(MIN_SEGMENT_DURATION);
        let segment_confidence = avg_logprob.exp().clamp(0.0, 1.0);

        numerator += segment_confidence * duration;
        denominator += duration;
    }

    if denominator == 0.0 {
        return NEUTRAL_CONFIDENCE;
    }

    (numerator / denominator).clamp(0.0, 1.0)
}

/// Round the scalar form to 4 decimal digits for reporting.
pub fn round_score(confidence: f64) -> f64 {
    (confidence * 10_000.0).round() / 10_000.0
}

/// Nearest-integer percentage of a confidence value.
///
/// Uses `f64::round` (half away from zero), which for values in `[0, 1]` behaves
/// as round-half-up: 0.375 → 38.
pub fn as_percent(confidence: f64) -> u8 {
    (confidence * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, avg_logprob: Option<f64>) -> Segment {
        Segment {
            start,
            end,
            avg_logprob,
            text: String::new(),
        }
    }

    #[test]
    fn test_empty_sequence_is_neutral() {
        assert_eq!(aggregate(&[]), 0.5);
    }

    #[test]
    fn test_unscored_segments_are_neutral() {
        let segments = vec![seg(0.0, 2.0, None), seg(2.0, 5.0, None)];
        assert_eq!(aggregate(&segments), 0.5);
    }

    #[test]
    fn test_zero_logprob_is_full_confidence() {
        let segments = vec![seg(0.0, 1.0, Some(0.0))];
        assert_eq!(aggregate(&segments), 1.0);
    }

    #[test]
    fn test_very_negative_logprob_approaches_zero() {
        let segments = vec![seg(0.0, 3.0, Some(-10.0))];
        let confidence = aggregate(&segments);
        assert!(confidence < 1e-4, "got {}", confidence);
    }

    #[test]
    fn test_equal_durations_give_simple_mean() {
        // exp maps these logprobs to confidences 0.2 and 0.8
        let segments = vec![
            seg(0.0, 1.0, Some(0.2f64.ln())),
            seg(1.0, 2.0, Some(0.8f64.ln())),
        ];
        let confidence = aggregate(&segments);
        assert!((confidence - 0.5).abs() < 1e-9, "got {}", confidence);
    }

    #[test]
    fn test_duration_weighting_is_not_a_simple_mean() {
        // 1s at confidence 1.0, 9s at ~0.0: weighted mean is 0.1, simple mean 0.5
        let segments = vec![
            seg(0.0, 1.0, Some(0.0)),
            seg(1.0, 10.0, Some(-700.0)), // exp underflows to 0.0
        ];
        let confidence = aggregate(&segments);
        assert!((confidence - 0.1).abs() < 1e-9, "got {}", confidence);
    }

    #[test]
    fn test_zero_length_segment_uses_duration_floor() {
        let segments = vec![seg(4.0, 4.0, Some(0.0))];
        assert_eq!(aggregate(&segments), 1.0);
    }

    #[test]
    fn test_gaps_in_timeline_are_fine() {
        let segments = vec![
            seg(0.0, 1.0, Some(0.0)),
            seg(5.0, 6.0, Some(0.0)), // gap between 1s and 5s
        ];
        assert_eq!(aggregate(&segments), 1.0);
    }

    #[test]
    fn test_round_score_is_four_digits() {
        assert_eq!(round_score(0.123456), 0.1235);
        assert_eq!(round_score(1.0), 1.0);
        assert_eq!(round_score(0.0), 0.0);
    }

    #[test]
    fn test_percent_rounds_half_up() {
        assert_eq!(as_percent(0.375), 38);
        assert_eq!(as_percent(0.5), 50);
        assert_eq!(as_percent(0.994), 99);
        assert_eq!(as_percent(0.995), 100);
    }

    #[test]
    fn test_percent_matches_scalar_across_range() {
        // The reported invariant: confidence_percent == round(confidence * 100)
        for i in 0..=1000 {
            let confidence = i as f64 / 1000.0;
            let percent = as_percent(confidence);
            assert_eq!(percent as f64, (confidence * 100.0).round());
            assert!(percent <= 100);
        }
    }
}
