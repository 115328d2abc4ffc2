use std::fmt;

use crate::error::{HstError, Result};

use super::{Threshold, ThresholdState};

/// Threshold following an exponential moving average of the scores.
///
/// # Parameters
///
/// - `window_size`: Length of the warm-up period.
/// - `weight_most_recent`: Weight of the newest score in the average, in `[0, 1]`.
/// - `percentage`: The threshold is `floor(percentage * average)`.
/// - `normals_only`: Only average scores that were classified normal, so that
///   anomalies do not drag the baseline down.
///
/// # Example
///
/// ```
/// use halfspace_stream::threshold::exponential_moving_average::ExponentialMovingAverage;
/// use halfspace_stream::threshold::Threshold;
///
/// let mut ema = ExponentialMovingAverage::new(0, 0.5, 1.0, false).unwrap();
/// ema.update_model(10, true);
/// assert_eq!(ema.current_threshold(), 5);
/// assert!(!ema.insert_new_sample(4));
/// ```
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    state: ThresholdState,
    weight_most_recent: f64,
    percentage: f64,
    normals_only: bool,
    weighted_average_normal: f64,
}

impl ExponentialMovingAverage {
    pub fn new(
        window_size: u64,
        weight_most_recent: f64,
        percentage: f64,
        normals_only: bool,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&weight_most_recent) {
            return Err(HstError::config(
                "weight_most_recent",
                "must be in range [0, 1]",
            ));
        }
        if !percentage.is_finite() || percentage <= 0.0 {
            return Err(HstError::config("percentage", "must be positive"));
        }
        Ok(ExponentialMovingAverage {
            state: ThresholdState::new(window_size),
            weight_most_recent,
            percentage,
            normals_only,
            weighted_average_normal: 0.0,
        })
    }

    pub fn weighted_average_normal(&self) -> f64 {
        self.weighted_average_normal
    }

    pub fn normals_only(&self) -> bool {
        self.normals_only
    }
}

impl Threshold for ExponentialMovingAverage {
    fn state(&self) -> &ThresholdState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ThresholdState {
        &mut self.state
    }

    fn update_model(&mut self, score: u64, is_normal: bool) {
        if self.normals_only && !is_normal {
            return;
        }
        let w = self.weight_most_recent;
        self.weighted_average_normal = (1.0 - w) * self.weighted_average_normal + w * score as f64;
        self.state
            .set_current_threshold((self.percentage * self.weighted_average_normal).floor() as u64);
    }
}

impl fmt::Display for ExponentialMovingAverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "exponentialMovingAverage(windowsize={}, weightMostRecent={}, percentage={}, normalsOnly={})",
            self.state.window_size(),
            self.weight_most_recent,
            self.percentage,
            self.normals_only
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_and_threshold() {
        let mut ema = ExponentialMovingAverage::new(0, 0.5, 1.0, false).unwrap();
        ema.insert_new_sample(10);
        assert_eq!(ema.weighted_average_normal(), 5.0);
        assert_eq!(ema.current_threshold(), 5);
        ema.insert_new_sample(20);
        assert_eq!(ema.weighted_average_normal(), 12.5);
        assert_eq!(ema.current_threshold(), 12);
    }

    #[test]
    fn test_everything_normal_during_warm_up() {
        let mut ema = ExponentialMovingAverage::new(4, 0.5, 1.0, true).unwrap();
        ema.state_mut().set_current_threshold(1_000);
        for _ in 0..4 {
            assert!(ema.predict_sample(0));
        }
        assert!(!ema.predict_sample(0));
        assert!(ema.predict_sample(1_001));
    }

    #[test]
    fn test_verdict_uses_threshold_before_update() {
        let mut ema = ExponentialMovingAverage::new(0, 1.0, 1.0, false).unwrap();
        assert!(ema.insert_new_sample(10));
        assert_eq!(ema.current_threshold(), 10);
        // 10 is not above the threshold of 10, even though the update keeps it at 10.
        assert!(!ema.insert_new_sample(10));
        // 11 is judged against 10, then the threshold moves to 11.
        assert!(ema.insert_new_sample(11));
        assert_eq!(ema.current_threshold(), 11);
    }

    #[test]
    fn test_normals_only_ignores_anomalies() {
        let mut ema = ExponentialMovingAverage::new(0, 0.5, 0.5, true).unwrap();
        ema.insert_new_sample(100);
        ema.insert_new_sample(100);
        let average = ema.weighted_average_normal();
        let threshold = ema.current_threshold();
        assert!(!ema.insert_new_sample(0));
        assert_eq!(ema.weighted_average_normal(), average);
        assert_eq!(ema.current_threshold(), threshold);
    }

    #[test]
    fn test_all_scores_averaged_without_filter() {
        let mut ema = ExponentialMovingAverage::new(0, 0.5, 0.5, false).unwrap();
        ema.insert_new_sample(100);
        assert!(!ema.insert_new_sample(0));
        assert_eq!(ema.weighted_average_normal(), 25.0);
        assert_eq!(ema.current_threshold(), 12);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(ExponentialMovingAverage::new(10, -0.1, 1.0, true).is_err());
        assert!(ExponentialMovingAverage::new(10, 1.1, 1.0, true).is_err());
        assert!(ExponentialMovingAverage::new(10, f64::NAN, 1.0, true).is_err());
        assert!(ExponentialMovingAverage::new(10, 0.5, 0.0, true).is_err());
        assert!(ExponentialMovingAverage::new(10, 0.5, f64::INFINITY, true).is_err());
        assert!(ExponentialMovingAverage::new(10, 0.0, 2.0, true).is_ok());
    }

    #[test]
    fn test_display() {
        let ema = ExponentialMovingAverage::new(50, 0.1, 0.5, true).unwrap();
        assert_eq!(
            ema.to_string(),
            "exponentialMovingAverage(windowsize=50, weightMostRecent=0.1, percentage=0.5, normalsOnly=true)"
        );
    }
}
