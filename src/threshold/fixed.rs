use std::fmt;

use super::{Threshold, ThresholdState};

/// Constant decision boundary, applied once the warm-up is over.
///
/// Useful when the score level of normal traffic is known in advance, and as a
/// baseline to compare adaptive strategies against.
#[derive(Debug, Clone)]
pub struct FixedThreshold {
    state: ThresholdState,
}

impl FixedThreshold {
    pub fn new(window_size: u64, threshold: u64) -> Self {
        let mut state = ThresholdState::new(window_size);
        state.set_current_threshold(threshold);
        FixedThreshold { state }
    }
}

impl Threshold for FixedThreshold {
    fn state(&self) -> &ThresholdState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ThresholdState {
        &mut self.state
    }

    fn update_model(&mut self, _score: u64, _is_normal: bool) {}
}

impl fmt::Display for FixedThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fixed(windowsize={}, threshold={})",
            self.state.window_size(),
            self.state.current_threshold()
        )
    }
}
