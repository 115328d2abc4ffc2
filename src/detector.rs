//! One monitored stream: a tree ensemble plus the threshold deciding on its scores.

use crate::anomaly::half_space_tree::HalfSpaceTrees;
use crate::common::{FType, Sample};
use crate::config::DetectorConfig;
use crate::error::Result;
use crate::threshold::Threshold;

/// Outcome for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub score: u64,
    /// Threshold in force when the verdict was made.
    pub threshold: u64,
    pub is_normal: bool,
}

/// Owns all the mutable state of a single stream. Samples must be fed in
/// arrival order, one at a time; streams never share a detector.
pub struct StreamDetector<F: FType> {
    trees: HalfSpaceTrees<F>,
    threshold: Box<dyn Threshold>,
}

impl<F: FType> StreamDetector<F> {
    pub fn new(trees: HalfSpaceTrees<F>, threshold: Box<dyn Threshold>) -> Self {
        StreamDetector { trees, threshold }
    }

    pub fn from_config(config: &DetectorConfig) -> Result<Self> {
        config.validate()?;
        let trees = HalfSpaceTrees::from_config(&config.trees)?;
        let threshold = config.threshold.build(config.trees.window_size)?;
        Ok(Self::new(trees, threshold))
    }

    /// Score the sample, learn it, and decide whether it is normal.
    pub fn process<S: Sample<F> + ?Sized>(&mut self, sample: &S) -> Result<Verdict> {
        let score = self.trees.insert_sample(sample)?;
        let threshold = self.threshold.current_threshold();
        let is_normal = self.threshold.insert_new_sample(score);
        Ok(Verdict {
            score,
            threshold,
            is_normal,
        })
    }

    pub fn trees(&self) -> &HalfSpaceTrees<F> {
        &self.trees
    }

    pub fn threshold(&self) -> &dyn Threshold {
        self.threshold.as_ref()
    }
}
