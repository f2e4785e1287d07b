use thiserror::Error;

/// Errors raised while building a correspondence set.
#[derive(Debug, Error, PartialEq)]
pub enum CorrespondenceError {
    /// The two point lists do not have the same length.
    #[error("Mismatched point list lengths: image 1 ({left}) != image 2 ({right})")]
    MismatchedLengths {
        /// Number of points in the first image.
        left: usize,
        /// Number of points in the second image.
        right: usize,
    },
}

/// Reasons a problem could not fit a model to a sample.
#[derive(Debug, Error, PartialEq)]
pub enum FitError {
    /// The sample is smaller than what the solver needs.
    #[error("Need at least {required} data elements to fit a model, got {actual}")]
    InsufficientData {
        /// Minimum number of elements.
        required: usize,
        /// Number of elements supplied.
        actual: usize,
    },

    /// The sample yields a rank-deficient or ill-conditioned system.
    #[error("Degenerate sample: the linear system is rank deficient")]
    DegenerateSample,

    /// The solver produced non-finite values.
    #[error("Model fit produced non-finite values")]
    NonFinite,
}

/// Errors returned by the RANSAC engine.
#[derive(Debug, Error, PartialEq)]
pub enum RansacError {
    /// A configuration value is out of its valid range.
    #[error("Invalid RANSAC configuration: {0}")]
    InvalidConfig(String),

    /// The minimal sample is larger than the data set.
    #[error("Need at least {required} data elements for a minimal sample, got {actual}")]
    InsufficientData {
        /// Minimal sample size.
        required: usize,
        /// Number of data elements available.
        actual: usize,
    },

    /// No candidate model reached the minimum consensus size.
    #[error(
        "No consensus found after {iterations} iterations: best consensus {best}, required {required}"
    )]
    NoConsensus {
        /// Largest consensus set observed.
        best: usize,
        /// Minimum consensus size configured.
        required: usize,
        /// Number of iterations run.
        iterations: usize,
    },

    /// Every drawn sample was degenerate.
    #[error("All {iterations} sampled subsets were degenerate")]
    AllSamplesDegenerate {
        /// Number of iterations run.
        iterations: usize,
    },
}
