use crate::common::{FType, Sample};
use crate::error::Result;

pub mod half_space_tree;
pub mod node;

/// Trait for implementing a streaming anomaly detector.
///
/// Scores follow the mass convention: higher means more normal.
pub trait AnomalyDetector<F: FType> {
    /// Learn and/or score a sample, returning the score only when `do_score` is set.
    fn update<S: Sample<F> + ?Sized>(
        &mut self,
        sample: &S,
        do_score: bool,
        do_update: bool,
    ) -> Result<Option<u64>>;
    fn learn_one<S: Sample<F> + ?Sized>(&mut self, sample: &S) -> Result<()>;
    fn score_one<S: Sample<F> + ?Sized>(&self, sample: &S) -> Result<u64>;
}
