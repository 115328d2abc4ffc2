use ndarray::Array1;
use rand::prelude::*;
use tracing::{debug, trace, warn};

use std::fmt;

use crate::common::{FType, Sample};
use crate::config::HalfSpaceTreesConfig;
use crate::error::{HstError, Result};

use super::node::Tree;
use super::AnomalyDetector;

/// Deepest tree we agree to grow.
///
/// Every tree is fully grown to `2^(max_depth + 1) - 1` nodes and each node
/// owns two bound vectors of `n_dimensions` values, so memory grows as
/// `n_trees * 2^(max_depth + 1) * n_dimensions`. At this depth a tree already
/// holds about 131k nodes.
pub const MAX_TREE_DEPTH: u32 = 16;

/// Streaming Half-Space Trees ensemble.
///
/// Half-space trees are an online variant of isolation forests. Each tree
/// partitions a randomly perturbed copy of the input domain and keeps, for
/// every node, how many samples fell into it during the previous window
/// (reference mass) and the running one (latest mass). A sample that lands in
/// a region that was dense in the previous window gets a high score, one that
/// lands in a sparse or unseen region gets a low score.
///
/// # Parameters
///
/// - `n_trees`: The number of trees to use.
/// - `max_depth`: Depth of the leaves. A tree of depth `n` has `n + 1` levels.
/// - `window_size`: The number of samples per window. When a window fills up
///   the latest mass of every node becomes its reference mass.
/// - `min_bounds`, `max_bounds`: The nominal domain of every dimension.
/// - `size_limit`: The minimum reference mass below which a walk stops descending.
///
/// # Example
///
/// ```
/// use halfspace_stream::anomaly::half_space_tree::HalfSpaceTrees;
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let mut hst: HalfSpaceTrees<f64> =
///     HalfSpaceTrees::with_rng(10, 6, 20, 2, &[0.0, 0.0], &[1.0, 1.0], 3, &mut rng).unwrap();
///
/// for _ in 0..40 {
///     hst.insert_sample(&vec![0.5, 0.5]).unwrap();
/// }
/// assert!(hst.insert_sample(&vec![0.5, 0.5]).unwrap() > 0);
/// ```
#[derive(Clone)]
pub struct HalfSpaceTrees<F: FType> {
    trees: Vec<Tree<F>>,
    max_depth: u32,
    window_size: u64,
    window_counter: u64,
    epoch: u64,
    min_list: Array1<F>,
    max_list: Array1<F>,
    size_limit: u64,
}

impl<F: FType> HalfSpaceTrees<F> {
    /// Build the ensemble with randomness drawn from `rand::thread_rng()`.
    pub fn new(
        n_trees: usize,
        max_depth: u32,
        window_size: u64,
        n_dimensions: usize,
        min_bounds: &[F],
        max_bounds: &[F],
        size_limit: u64,
    ) -> Result<Self> {
        let mut rng = rand::thread_rng();
        Self::with_rng(
            n_trees,
            max_depth,
            window_size,
            n_dimensions,
            min_bounds,
            max_bounds,
            size_limit,
            &mut rng,
        )
    }

    /// Build the ensemble drawing every random choice from `rng`.
    #[allow(clippy::too_many_arguments)]
    pub fn with_rng<R: Rng + ?Sized>(
        n_trees: usize,
        max_depth: u32,
        window_size: u64,
        n_dimensions: usize,
        min_bounds: &[F],
        max_bounds: &[F],
        size_limit: u64,
        rng: &mut R,
    ) -> Result<Self> {
        validate(
            n_trees,
            max_depth,
            window_size,
            n_dimensions,
            min_bounds,
            max_bounds,
            size_limit,
        )?;
        let min_list = Array1::from(min_bounds.to_vec());
        let max_list = Array1::from(max_bounds.to_vec());

        let mut trees = Vec::with_capacity(n_trees);
        for _ in 0..n_trees {
            let (tree_min, tree_max) = perturb_bounds(&min_list, &max_list, rng);
            trees.push(Tree::build(max_depth, tree_min, tree_max, size_limit, rng));
        }
        debug!(n_trees, max_depth, window_size, n_dimensions, "built half-space trees");

        Ok(HalfSpaceTrees {
            trees,
            max_depth,
            window_size,
            window_counter: 0,
            epoch: 0,
            min_list,
            max_list,
            size_limit,
        })
    }

    /// Build the ensemble from a configuration, seeding the generator when a seed is set.
    pub fn from_config(config: &HalfSpaceTreesConfig) -> Result<Self> {
        let min_bounds = cast_bounds(&config.min_bounds)?;
        let max_bounds = cast_bounds(&config.max_bounds)?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(rand::thread_rng()).map_err(|e| {
                HstError::config("seed", format!("cannot seed generator: {}", e))
            })?,
        };
        Self::with_rng(
            config.n_trees,
            config.max_depth,
            config.window_size,
            config.dimensions(),
            &min_bounds,
            &max_bounds,
            config.size_limit,
            &mut rng,
        )
    }

    fn check_sample<S: Sample<F> + ?Sized>(&self, sample: &S) -> Result<()> {
        let expected = self.dimensions();
        if sample.dimensions() != expected {
            warn!(expected, got = sample.dimensions(), "rejected sample");
            return Err(HstError::Input {
                expected,
                got: sample.dimensions(),
            });
        }
        if let Some(index) = sample.first_non_finite() {
            warn!(index, "rejected sample with non-finite coordinate");
            return Err(HstError::NonFiniteCoordinate { index });
        }
        Ok(())
    }

    /// Insert a sample into every tree and return the ensemble score.
    ///
    /// The window counter is advanced first. If this sample fills the window,
    /// all trees roll their reference mass over before any of them scores it.
    /// A malformed sample is rejected before any counter moves.
    pub fn insert_sample<S: Sample<F> + ?Sized>(&mut self, sample: &S) -> Result<u64> {
        self.check_sample(sample)?;

        // Pivot if the window is full
        self.window_counter += 1;
        if self.window_counter >= self.window_size {
            for tree in self.trees.iter_mut() {
                tree.update_reference();
            }
            self.window_counter = 0;
            self.epoch += 1;
            trace!(epoch = self.epoch, "rolled reference mass over");
        }

        let mut score: u64 = 0;
        for tree in self.trees.iter_mut() {
            score = score.saturating_add(tree.insert_and_score(sample)?);
        }
        Ok(score)
    }

    /// Ensemble score of a sample without learning from it.
    pub fn score<S: Sample<F> + ?Sized>(&self, sample: &S) -> Result<u64> {
        self.check_sample(sample)?;
        self.trees
            .iter()
            .try_fold(0u64, |acc, tree| Ok(acc.saturating_add(tree.score(sample)?)))
    }

    pub fn trees(&self) -> &[Tree<F>] {
        &self.trees
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    pub fn window_counter(&self) -> u64 {
        self.window_counter
    }

    /// Number of completed windows.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn dimensions(&self) -> usize {
        self.min_list.len()
    }

    pub fn min_bounds(&self) -> &Array1<F> {
        &self.min_list
    }

    pub fn max_bounds(&self) -> &Array1<F> {
        &self.max_list
    }

    pub fn size_limit(&self) -> u64 {
        self.size_limit
    }
}

impl<F: FType> AnomalyDetector<F> for HalfSpaceTrees<F> {
    /// Score and/or learn a sample in one call.
    ///
    /// With `do_update` the sample is inserted and the score computed during
    /// insertion is returned when `do_score` is also set. With only
    /// `do_score` the read-only score is returned.
    fn update<S: Sample<F> + ?Sized>(
        &mut self,
        sample: &S,
        do_score: bool,
        do_update: bool,
    ) -> Result<Option<u64>> {
        match (do_score, do_update) {
            (_, true) => {
                let score = self.insert_sample(sample)?;
                Ok(do_score.then_some(score))
            }
            (true, false) => self.score(sample).map(Some),
            (false, false) => Ok(None),
        }
    }

    fn learn_one<S: Sample<F> + ?Sized>(&mut self, sample: &S) -> Result<()> {
        self.update(sample, false, true).map(|_| ())
    }
    fn score_one<S: Sample<F> + ?Sized>(&self, sample: &S) -> Result<u64> {
        self.score(sample)
    }
}

impl<F: FType + fmt::Display> fmt::Display for HalfSpaceTrees<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tree) in self.trees.iter().enumerate() {
            write!(f, "\n\nTree Nr. {}\n{}", i, tree)?;
        }
        Ok(())
    }
}

fn cast_bounds<F: FType>(bounds: &[f64]) -> Result<Vec<F>> {
    bounds
        .iter()
        .map(|&v| F::from_f64(v))
        .collect::<Option<Vec<F>>>()
        .ok_or_else(|| HstError::config("bounds", "not representable in the sample type"))
}

pub(crate) fn validate<F: FType>(
    n_trees: usize,
    max_depth: u32,
    window_size: u64,
    n_dimensions: usize,
    min_bounds: &[F],
    max_bounds: &[F],
    size_limit: u64,
) -> Result<()> {
    if n_trees == 0 {
        return Err(HstError::config("n_trees", "must be positive"));
    }
    if max_depth > MAX_TREE_DEPTH {
        return Err(HstError::config(
            "max_depth",
            format!("must be at most {}", MAX_TREE_DEPTH),
        ));
    }
    if window_size == 0 {
        return Err(HstError::config("window_size", "must be positive"));
    }
    if n_dimensions == 0 {
        return Err(HstError::config("n_dimensions", "must be positive"));
    }
    if min_bounds.len() != n_dimensions || max_bounds.len() != n_dimensions {
        return Err(HstError::config(
            "bounds",
            format!(
                "expected {} lower and upper bounds, got {} and {}",
                n_dimensions,
                min_bounds.len(),
                max_bounds.len()
            ),
        ));
    }
    for (j, (lo, hi)) in min_bounds.iter().zip(max_bounds).enumerate() {
        if !lo.is_finite() || !hi.is_finite() {
            return Err(HstError::config(
                "bounds",
                format!("dimension {} has a non-finite bound", j),
            ));
        }
        if lo > hi {
            return Err(HstError::config(
                "bounds",
                format!("dimension {} has lower bound above upper bound", j),
            ));
        }
    }
    if size_limit == 0 {
        return Err(HstError::config("size_limit", "must be positive"));
    }
    Ok(())
}

/// Shift and widen the domain of every dimension at random so that each tree
/// works on a different, larger universe than the nominal bounds.
///
/// With `r` uniform in `[0, 1)` and `d = max - min`, the new domain is centred
/// on `min + r * d` with a half-width of `2 * max(r, 1 - r) * d`, so it always
/// covers the nominal domain.
fn perturb_bounds<F: FType, R: Rng + ?Sized>(
    min_list: &Array1<F>,
    max_list: &Array1<F>,
    rng: &mut R,
) -> (Array1<F>, Array1<F>) {
    let two = F::one() + F::one();
    let mut new_min = min_list.clone();
    let mut new_max = max_list.clone();
    for j in 0..min_list.len() {
        let distance = max_list[j] - min_list[j];
        let r = rng.gen::<f64>();
        let random_point = F::from_f64(r).unwrap_or_else(F::zero);
        let center = min_list[j] + random_point * distance;
        let spread = if r < 0.5 {
            F::one() - random_point
        } else {
            random_point
        };
        new_max[j] = center + two * spread * distance;
        new_min[j] = center - two * spread * distance;
    }
    (new_min, new_max)
}
