use crate::common::{FType, Sample};
use crate::error::{HstError, Result};

use ndarray::Array1;
use rand::Rng;

use std::fmt;
use std::mem;

/// Index of the root in a tree's node arena.
pub const ROOT: usize = 0;

/// Split of an internal node: `x[feature] < threshold` goes left, everything else right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split<F> {
    pub feature: usize,
    pub threshold: F,
    pub left: usize,
    pub right: usize,
}

impl<F: FType> Split<F> {
    #[inline]
    fn child_for<S: Sample<F> + ?Sized>(&self, sample: &S) -> usize {
        if sample.coordinate(self.feature) < self.threshold {
            self.left
        } else {
            self.right
        }
    }
}

/// Node struct
#[derive(Debug, Clone)]
pub struct Node<F> {
    pub parent: Option<usize>, // Back-reference into the arena, never owns anything
    pub depth: u32,
    pub min_list: Array1<F>, // Lower and upper corner of the region covered by the node
    pub max_list: Array1<F>,
    pub split: Option<Split<F>>, // None on leaves
    pub latest_mass: u64,        // Samples routed through the node in the running window
    pub reference_mass: u64,     // Mass of the last completed window
}

impl<F: FType> Node<F> {
    fn new(depth: u32, parent: Option<usize>, min_list: Array1<F>, max_list: Array1<F>) -> Self {
        Node {
            parent,
            depth,
            min_list,
            max_list,
            split: None,
            latest_mass: 0,
            reference_mass: 0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.split.is_none()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Freeze the running mass as the reference and start counting again.
    pub fn update_reference(&mut self) {
        self.reference_mass = mem::take(&mut self.latest_mass);
    }

    /// `reference_mass * 2^depth`, the contribution of a node where the walk stops.
    fn contribution(&self) -> u64 {
        self.reference_mass.saturating_mul(1u64 << self.depth)
    }
}

impl<F: FType + fmt::Display> fmt::Display for Node<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.split {
            Some(split) => write!(
                f,
                "Node<depth={}, x[{}] < {:.3}, reference={}, latest={}>",
                self.depth, split.feature, split.threshold, self.reference_mass, self.latest_mass
            ),
            None => write!(
                f,
                "Leaf<depth={}, reference={}, latest={}>",
                self.depth, self.reference_mass, self.latest_mass
            ),
        }
    }
}

/// One half-space tree: a complete binary partition of a bounding box, stored as an arena.
///
/// The tree is fully grown at construction. Nodes are never added or removed
/// afterwards, only their two mass counters change.
#[derive(Debug, Clone)]
pub struct Tree<F> {
    nodes: Vec<Node<F>>,
    max_depth: u32,
    size_limit: u64,
}

impl<F: FType> Tree<F> {
    /// Grow a tree of height `max_depth` over the box `[min_list, max_list]`.
    ///
    /// Every internal node splits a dimension chosen uniformly at random, at a
    /// value drawn uniformly within the node's extent on that dimension.
    pub(crate) fn build<R: Rng + ?Sized>(
        max_depth: u32,
        min_list: Array1<F>,
        max_list: Array1<F>,
        size_limit: u64,
        rng: &mut R,
    ) -> Self {
        debug_assert_eq!(min_list.len(), max_list.len());
        // #nodes = 2 ^ (max_depth + 1) - 1
        let n_nodes = (1usize << (max_depth + 1)) - 1;
        let mut tree = Tree {
            nodes: Vec::with_capacity(n_nodes),
            max_depth,
            size_limit,
        };
        tree.build_node(0, None, min_list, max_list, rng);
        tree
    }

    fn build_node<R: Rng + ?Sized>(
        &mut self,
        depth: u32,
        parent: Option<usize>,
        min_list: Array1<F>,
        max_list: Array1<F>,
        rng: &mut R,
    ) -> usize {
        let node_idx = self.nodes.len();
        if depth == self.max_depth {
            self.nodes.push(Node::new(depth, parent, min_list, max_list));
            return node_idx;
        }

        let feature = rng.gen_range(0..min_list.len());
        let (lo, hi) = (min_list[feature], max_list[feature]);
        let u = F::from_f64(rng.gen::<f64>()).unwrap_or_else(F::zero);
        let threshold = lo + u * (hi - lo);

        let mut left_max = max_list.clone();
        left_max[feature] = threshold;
        let mut right_min = min_list.clone();
        right_min[feature] = threshold;

        self.nodes
            .push(Node::new(depth, parent, min_list.clone(), max_list.clone()));
        let left = self.build_node(depth + 1, Some(node_idx), min_list, left_max, rng);
        let right = self.build_node(depth + 1, Some(node_idx), right_min, max_list, rng);
        self.nodes[node_idx].split = Some(Split {
            feature,
            threshold,
            left,
            right,
        });
        node_idx
    }

    pub fn nodes(&self) -> &[Node<F>] {
        &self.nodes
    }

    pub fn root(&self) -> &Node<F> {
        &self.nodes[ROOT]
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn size_limit(&self) -> u64 {
        self.size_limit
    }

    pub fn dimensions(&self) -> usize {
        self.root().min_list.len()
    }

    fn check_dimensions<S: Sample<F> + ?Sized>(&self, sample: &S) -> Result<()> {
        if sample.dimensions() != self.dimensions() {
            return Err(HstError::Input {
                expected: self.dimensions(),
                got: sample.dimensions(),
            });
        }
        Ok(())
    }

    /// True when a walk stops at `node`: it is a leaf, or its reference mass is
    /// too small to trust the statistics below it.
    #[inline]
    fn stops_at(&self, node: &Node<F>) -> bool {
        node.is_leaf() || node.reference_mass < self.size_limit
    }

    /// Count the sample in the running window of every node on its path down to
    /// the leaf, and return the tree's score for it.
    ///
    /// The score is taken at the first node where the walk stops (see
    /// `stops_at`) and is that node's `reference_mass * 2^depth`, so samples
    /// from dense regions score high. Counting goes on below that node so the
    /// next window has a full mass profile.
    pub fn insert_and_score<S: Sample<F> + ?Sized>(&mut self, sample: &S) -> Result<u64> {
        self.check_dimensions(sample)?;
        let mut score = None;
        let mut node_idx = ROOT;
        loop {
            self.nodes[node_idx].latest_mass += 1;
            let node = &self.nodes[node_idx];
            if score.is_none() && self.stops_at(node) {
                score = Some(node.contribution());
            }
            match &node.split {
                Some(split) => node_idx = split.child_for(sample),
                None => return Ok(score.unwrap_or_default()),
            }
        }
    }

    /// Score without counting the sample.
    pub fn score<S: Sample<F> + ?Sized>(&self, sample: &S) -> Result<u64> {
        self.check_dimensions(sample)?;
        let mut node = self.root();
        loop {
            match &node.split {
                Some(split) if !self.stops_at(node) => node = &self.nodes[split.child_for(sample)],
                _ => return Ok(node.contribution()),
            }
        }
    }

    /// Roll the window over: every node's latest mass becomes its reference mass.
    pub fn update_reference(&mut self) {
        for node in self.nodes.iter_mut() {
            node.update_reference();
        }
    }
}

impl<F: FType + fmt::Display> fmt::Display for Tree<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "┌ Tree<max_depth={}, size_limit={}>",
            self.max_depth, self.size_limit
        )?;
        self.recursive_repr(ROOT, f, "│ ")
    }
}

impl<F: FType + fmt::Display> Tree<F> {
    fn recursive_repr(&self, node_idx: usize, f: &mut fmt::Formatter<'_>, prefix: &str) -> fmt::Result {
        let node = &self.nodes[node_idx];
        writeln!(f, "{}├─{} {}", prefix, node_idx, node)?;
        if let Some(split) = &node.split {
            let prefix = prefix.to_owned() + "│ ";
            self.recursive_repr(split.left, f, &prefix)?;
            self.recursive_repr(split.right, f, &prefix)?;
        }
        Ok(())
    }
}
