#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! The engine ([`Ransac`]) knows nothing about geometry. An estimation task plugs in
//! by implementing [`RansacProblem`]: it exposes its data, fits a model to a sample
//! and measures the error of a single element. The engine draws minimal samples
//! with a [`UniformSampler`], keeps the model with the largest consensus set and
//! returns it together with the inlier mask as a [`RansacResult`].

/// Point correspondences between two images.
pub mod correspondence;

/// Error types for the RANSAC engine and its problems.
pub mod error;

/// RANSAC configuration.
pub mod params;

/// The estimation-problem abstraction.
pub mod problem;

/// The RANSAC driver loop.
pub mod ransac;

/// Random minimal-sample selection.
pub mod sampler;

pub use correspondence::{Correspondence, CorrespondenceSet, ImagePairMatches};
pub use error::{CorrespondenceError, FitError, RansacError};
pub use params::RansacParams;
pub use problem::RansacProblem;
pub use ransac::{adaptive_iterations, Ransac, RansacResult};
pub use sampler::UniformSampler;
