//! Score derived from per-measurement average frame times

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;

/// Fewest successful measurements that produce a score
pub const MIN_SCORE_SAMPLES: usize = 5;

/// Result of scoring a run
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub score: u32,
    pub fps: f32,
    /// Trimmed mean frame time in milliseconds
    pub avg_frame_ms: f32,
    /// Measurements that went into the mean before trimming
    pub samples: usize,
}

/// Mean after dropping the `floor(n / 10)` lowest and highest values
///
/// Returns `None` for an empty slice.
pub fn trimmed_mean(samples: &[f32]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
    sorted.sort_by(f64::total_cmp);

    let trim = sorted.len() / 10;
    let kept = &sorted[trim..sorted.len() - trim];
    Some(kept.iter().sum::<f64>() / kept.len() as f64)
}

/// `round(500 + fps^0.75 * 20)` with `fps = 1000 / avg_ms`
pub fn score_for_frame_time(avg_ms: f64) -> u32 {
    let fps = 1000.0 / avg_ms;
    (500.0 + fps.powf(0.75) * 20.0).round() as u32
}

/// Score a run from its per-measurement average frame times (ms)
///
/// Non-finite and non-positive measurements are ignored.
pub fn compute_score(measurements: &[f32]) -> Result<Score> {
    let valid: Vec<f32> = measurements
        .iter()
        .copied()
        .filter(|m| m.is_finite() && *m > 0.0)
        .collect();
    if valid.len() < MIN_SCORE_SAMPLES {
        return Err(Error::InsufficientSamples {
            got: valid.len(),
            need: MIN_SCORE_SAMPLES,
        });
    }

    let avg_ms = trimmed_mean(&valid).ok_or(Error::InsufficientSamples {
        got: 0,
        need: MIN_SCORE_SAMPLES,
    })?;

    Ok(Score {
        score: score_for_frame_time(avg_ms),
        fps: (1000.0 / avg_ms) as f32,
        avg_frame_ms: avg_ms as f32,
        samples: valid.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_score() {
        let mut samples = vec![10.0; 9];
        samples.push(100.0);
        let score = compute_score(&samples).unwrap();
        assert_eq!(score.score, 1132);
        assert_eq!(score.avg_frame_ms, 10.0);
        assert_eq!(score.fps, 100.0);
        assert_eq!(score.samples, 10);
    }

    #[test]
    fn test_order_does_not_matter() {
        let mut samples = vec![100.0];
        samples.extend(std::iter::repeat_n(10.0, 9));
        assert_eq!(compute_score(&samples).unwrap().score, 1132);
    }

    #[test]
    fn test_trim_drops_tenth_from_each_end() {
        // n = 20 drops two from each end
        let samples: Vec<f32> = (1..=20).map(|i| i as f32).collect();
        assert_eq!(trimmed_mean(&samples), Some(10.5));
        // n < 10 trims nothing
        assert_eq!(trimmed_mean(&[1.0, 2.0, 6.0]), Some(3.0));
        assert_eq!(trimmed_mean(&[]), None);
    }

    #[test]
    fn test_score_formula() {
        // 60 fps: 500 + 60^0.75 * 20 = 500 + 21.56 * 20
        assert_eq!(score_for_frame_time(1000.0 / 60.0), 931);
        // 1 fps
        assert_eq!(score_for_frame_time(1000.0), 520);
    }

    #[test]
    fn test_too_few_samples() {
        let err = compute_score(&[16.0; 4]).unwrap_err();
        assert!(matches!(err, Error::InsufficientSamples { got: 4, need: 5 }));

        let err = compute_score(&[16.0, 16.0, 16.0, 16.0, f32::NAN, 0.0]).unwrap_err();
        assert!(matches!(err, Error::InsufficientSamples { got: 4, .. }));

        assert!(compute_score(&[16.0; 5]).is_ok());
    }
}
