//! Configuration for the tree ensemble and the threshold strategy.
//!
//! Loaded from TOML, e.g.
//!
//! ```toml
//! [trees]
//! n_trees = 25
//! max_depth = 8
//! window_size = 50
//! min_bounds = [0.0, 0.0]
//! max_bounds = [10.0, 10.0]
//! size_limit = 5
//! seed = 42
//!
//! [threshold]
//! strategy = "exponential_moving_average"
//! weight_most_recent = 0.1
//! percentage = 0.5
//! normals_only = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::anomaly::half_space_tree;
use crate::error::{HstError, Result};
use crate::threshold::exponential_moving_average::ExponentialMovingAverage;
use crate::threshold::fixed::FixedThreshold;
use crate::threshold::Threshold;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HalfSpaceTreesConfig {
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    #[serde(default = "default_window_size")]
    pub window_size: u64,

    #[serde(default)]
    pub min_bounds: Vec<f64>,

    #[serde(default)]
    pub max_bounds: Vec<f64>,

    #[serde(default = "default_size_limit")]
    pub size_limit: u64,

    /// Seed for tree construction. Unset means a fresh seed per run.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_n_trees() -> usize {
    25
}

fn default_max_depth() -> u32 {
    8
}

fn default_window_size() -> u64 {
    250
}

fn default_size_limit() -> u64 {
    5
}

impl Default for HalfSpaceTreesConfig {
    fn default() -> Self {
        Self {
            n_trees: default_n_trees(),
            max_depth: default_max_depth(),
            window_size: default_window_size(),
            min_bounds: Vec::new(),
            max_bounds: Vec::new(),
            size_limit: default_size_limit(),
            seed: None,
        }
    }
}

impl HalfSpaceTreesConfig {
    pub fn dimensions(&self) -> usize {
        self.min_bounds.len()
    }

    /// Apply the ensemble construction rules to the configured values.
    pub fn validate(&self) -> Result<()> {
        if self.min_bounds.is_empty() {
            return Err(HstError::config("min_bounds", "at least one dimension is required"));
        }
        if self.min_bounds.len() != self.max_bounds.len() {
            return Err(HstError::config(
                "max_bounds",
                format!(
                    "expected {} values, got {}",
                    self.min_bounds.len(),
                    self.max_bounds.len()
                ),
            ));
        }
        half_space_tree::validate(
            self.n_trees,
            self.max_depth,
            self.window_size,
            self.dimensions(),
            &self.min_bounds,
            &self.max_bounds,
            self.size_limit,
        )
    }
}

/// Threshold strategy and its parameters.
///
/// A missing `window_size` means "same warm-up as the trees' window".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ThresholdConfig {
    ExponentialMovingAverage {
        #[serde(default)]
        window_size: Option<u64>,
        #[serde(default = "default_weight_most_recent")]
        weight_most_recent: f64,
        #[serde(default = "default_percentage")]
        percentage: f64,
        #[serde(default = "default_normals_only")]
        normals_only: bool,
    },
    Fixed {
        #[serde(default)]
        window_size: Option<u64>,
        threshold: u64,
    },
}

fn default_weight_most_recent() -> f64 {
    0.1
}

fn default_percentage() -> f64 {
    0.5
}

fn default_normals_only() -> bool {
    true
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        ThresholdConfig::ExponentialMovingAverage {
            window_size: None,
            weight_most_recent: default_weight_most_recent(),
            percentage: default_percentage(),
            normals_only: default_normals_only(),
        }
    }
}

impl ThresholdConfig {
    /// Build the strategy, falling back to `default_window_size` for the warm-up length.
    pub fn build(&self, default_window_size: u64) -> Result<Box<dyn Threshold>> {
        Ok(match *self {
            ThresholdConfig::ExponentialMovingAverage {
                window_size,
                weight_most_recent,
                percentage,
                normals_only,
            } => Box::new(ExponentialMovingAverage::new(
                window_size.unwrap_or(default_window_size),
                weight_most_recent,
                percentage,
                normals_only,
            )?),
            ThresholdConfig::Fixed {
                window_size,
                threshold,
            } => Box::new(FixedThreshold::new(
                window_size.unwrap_or(default_window_size),
                threshold,
            )),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub trees: HalfSpaceTreesConfig,

    #[serde(default)]
    pub threshold: ThresholdConfig,
}

impl DetectorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check everything that would make building the detector fail.
    pub fn validate(&self) -> Result<()> {
        self.trees.validate()?;
        // Strategy parameters are checked by the constructors.
        self.threshold.build(self.trees.window_size).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let config = DetectorConfig::from_toml_str(
            r#"
            [trees]
            n_trees = 10
            max_depth = 4
            window_size = 20
            min_bounds = [0.0, -1.0]
            max_bounds = [1.0, 1.0]
            size_limit = 2
            seed = 7

            [threshold]
            strategy = "exponential_moving_average"
            window_size = 30
            weight_most_recent = 0.25
            percentage = 0.8
            normals_only = false
            "#,
        )
        .unwrap();
        assert_eq!(config.trees.n_trees, 10);
        assert_eq!(config.trees.dimensions(), 2);
        assert_eq!(config.trees.seed, Some(7));
        assert_eq!(
            config.threshold,
            ThresholdConfig::ExponentialMovingAverage {
                window_size: Some(30),
                weight_most_recent: 0.25,
                percentage: 0.8,
                normals_only: false,
            }
        );
        assert_eq!(config.threshold.build(20).unwrap().window_size(), 30);
    }

    #[test]
    fn test_defaults() {
        let config = DetectorConfig::from_toml_str(
            r#"
            [trees]
            min_bounds = [0.0]
            max_bounds = [1.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.trees.n_trees, 25);
        assert_eq!(config.trees.max_depth, 8);
        assert_eq!(config.trees.window_size, 250);
        assert_eq!(config.trees.size_limit, 5);
        assert_eq!(config.trees.seed, None);
        assert_eq!(config.threshold, ThresholdConfig::default());
        // The warm-up follows the trees' window.
        assert_eq!(config.threshold.build(250).unwrap().window_size(), 250);
    }

    #[test]
    fn test_fixed_strategy() {
        let config = DetectorConfig::from_toml_str(
            r#"
            [trees]
            min_bounds = [0.0]
            max_bounds = [1.0]

            [threshold]
            strategy = "fixed"
            threshold = 1000
            "#,
        )
        .unwrap();
        let threshold = config.threshold.build(config.trees.window_size).unwrap();
        assert_eq!(threshold.current_threshold(), 1000);
    }

    #[test]
    fn test_missing_bounds_rejected() {
        let err = DetectorConfig::from_toml_str("[trees]\nn_trees = 3\n").unwrap_err();
        assert!(matches!(err, HstError::Configuration { ref name, .. } if name == "min_bounds"));
    }

    #[test]
    fn test_mismatched_bounds_rejected() {
        let err = DetectorConfig::from_toml_str(
            "[trees]\nmin_bounds = [0.0, 0.0]\nmax_bounds = [1.0]\n",
        )
        .unwrap_err();
        assert!(matches!(err, HstError::Configuration { ref name, .. } if name == "max_bounds"));
    }

    #[test]
    fn test_invalid_tree_parameters_rejected_on_load() {
        let cases = [
            ("n_trees = 0\nmin_bounds = [0.0]\nmax_bounds = [1.0]", "n_trees"),
            ("window_size = 0\nmin_bounds = [0.0]\nmax_bounds = [1.0]", "window_size"),
            ("size_limit = 0\nmin_bounds = [0.0]\nmax_bounds = [1.0]", "size_limit"),
            ("max_depth = 40\nmin_bounds = [0.0]\nmax_bounds = [1.0]", "max_depth"),
            ("min_bounds = [0.0, 3.0]\nmax_bounds = [1.0, 2.0]", "bounds"),
            ("min_bounds = [0.0]\nmax_bounds = [inf]", "bounds"),
        ];
        for (trees, field) in cases {
            let err = DetectorConfig::from_toml_str(&format!("[trees]\n{}\n", trees)).unwrap_err();
            match err {
                HstError::Configuration { name, .. } => assert_eq!(name, field),
                other => panic!("unexpected error {:?}", other),
            }
        }
    }

    #[test]
    fn test_bad_weight_rejected() {
        let err = DetectorConfig::from_toml_str(
            r#"
            [trees]
            min_bounds = [0.0]
            max_bounds = [1.0]

            [threshold]
            strategy = "exponential_moving_average"
            weight_most_recent = 1.5
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, HstError::Configuration { .. }));
    }

    #[test]
    fn test_unknown_strategy_is_parse_error() {
        let err = DetectorConfig::from_toml_str(
            "[trees]\nmin_bounds = [0.0]\nmax_bounds = [1.0]\n[threshold]\nstrategy = \"median\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, HstError::ConfigParse(_)));
    }
}
