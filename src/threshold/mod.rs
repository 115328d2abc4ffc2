//! Adaptive thresholds turning an ensemble score into a normal/anomalous verdict.
//!
//! Scores follow the mass convention of the trees: a sample is normal when its
//! score is strictly above the current threshold. Every strategy starts with
//! a warm-up period during which it calls everything normal.

use std::fmt;
use tracing::debug;

pub mod exponential_moving_average;
pub mod fixed;

/// Warm-up counter and decision boundary shared by every strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdState {
    window_size: u64,
    counter: u64,
    current_threshold: u64,
}

impl ThresholdState {
    pub fn new(window_size: u64) -> Self {
        ThresholdState {
            window_size,
            counter: 0,
            current_threshold: 0,
        }
    }

    /// Warm-up check. Returns `false` for the first `window_size` calls and
    /// `true` for every call after that.
    pub fn reference_created(&mut self) -> bool {
        if self.counter < self.window_size {
            self.counter += 1;
            if self.counter == self.window_size {
                debug!(window_size = self.window_size, "threshold warm-up complete");
            }
            false
        } else {
            true
        }
    }

    /// Whether the next check will report the reference as created.
    pub fn is_warmed_up(&self) -> bool {
        self.counter >= self.window_size
    }

    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    pub fn current_threshold(&self) -> u64 {
        self.current_threshold
    }

    pub fn set_current_threshold(&mut self, threshold: u64) {
        self.current_threshold = threshold;
    }
}

/// Threshold strategy.
///
/// Implementors only hold a `ThresholdState` and say how a score moves their
/// model. The verdict logic lives in the provided methods.
pub trait Threshold: fmt::Display + Send {
    fn state(&self) -> &ThresholdState;
    fn state_mut(&mut self) -> &mut ThresholdState;

    /// Fold `score` into the strategy. `is_normal` is the verdict already
    /// reached for this score with the threshold in force before the update.
    fn update_model(&mut self, score: u64, is_normal: bool);

    fn window_size(&self) -> u64 {
        self.state().window_size()
    }

    fn current_threshold(&self) -> u64 {
        self.state().current_threshold()
    }

    fn reference_created(&mut self) -> bool {
        self.state_mut().reference_created()
    }

    /// `true` (normal) during warm-up, then `score > current_threshold`.
    ///
    /// Each call consumes one step of the warm-up.
    fn predict_sample(&mut self, score: u64) -> bool {
        if !self.reference_created() {
            return true;
        }
        score > self.current_threshold()
    }

    /// Verdict for `score` with the current threshold, then the model update.
    fn insert_new_sample(&mut self, score: u64) -> bool {
        let is_normal = self.predict_sample(score);
        self.update_model(score, is_normal);
        is_normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_created_latches_after_window() {
        let mut state = ThresholdState::new(3);
        let checks: Vec<bool> = (0..6).map(|_| state.reference_created()).collect();
        assert_eq!(checks, vec![false, false, false, true, true, true]);
        assert!(state.is_warmed_up());
    }

    #[test]
    fn test_zero_window_is_active_immediately() {
        let mut state = ThresholdState::new(0);
        assert!(state.is_warmed_up());
        assert!(state.reference_created());
    }

    #[test]
    fn test_threshold_setter() {
        let mut state = ThresholdState::new(1);
        assert_eq!(state.current_threshold(), 0);
        state.set_current_threshold(42);
        assert_eq!(state.current_threshold(), 42);
    }
}
