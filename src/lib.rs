//! Unsupervised anomaly scoring for continuous multi-dimensional streams.
//!
//! A [`HalfSpaceTrees`](anomaly::half_space_tree::HalfSpaceTrees) ensemble
//! keeps a sliding mass profile of the stream and scores every sample, a
//! [`Threshold`](threshold::Threshold) strategy turns the scores into
//! normal/anomalous verdicts. [`StreamDetector`](detector::StreamDetector)
//! wires the two together for one stream.

pub mod anomaly;
pub mod common;
pub mod config;
pub mod detector;
pub mod error;
pub mod stream;
pub mod threshold;

pub use anomaly::half_space_tree::HalfSpaceTrees;
pub use detector::{StreamDetector, Verdict};
pub use error::{HstError, Result};
