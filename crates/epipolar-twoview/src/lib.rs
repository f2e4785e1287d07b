#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Geometric models plugged into the [`epipolar_ransac`] engine:
//!
//! * [`FundamentalProblem`]: normalized 8-point fit scored with the symmetric
//!   epipolar distance.
//! * [`HomographyProblem`]: normalized DLT scored with the transfer error.
//! * [`PnpProblem`]: camera pose from 2D-3D observations, scored with the squared
//!   reprojection error.
//!
//! [`FundamentalMatrixSolver`] runs the fundamental-matrix problem over a batch of
//! image pairs, and the essential-matrix helpers turn a fundamental matrix into
//! a relative camera [`Pose`](epipolar_pose::Pose).

/// Essential matrix construction and decomposition.
pub mod essential;

/// Fundamental matrix estimation.
pub mod fundamental;

/// Homography estimation.
pub mod homography;

/// Camera pose from 2D-3D observations.
pub mod pnp;

/// Batch fundamental matrix estimation over image pairs.
pub mod solver;

#[cfg(test)]
mod scene;

pub use essential::{
    decompose_essential, enforce_essential_constraints, essential_from_fundamental,
    select_pose_by_cheirality, triangulate_point_linear,
};
pub use fundamental::{
    enforce_rank2, epipolar_residual, fundamental_8point, normalize_fundamental,
    normalize_points, point_spread_ratio, symmetric_epipolar_distance, EightPointParams, FundamentalProblem,
    FUNDAMENTAL_SAMPLE_SIZE,
};
pub use homography::{homography_dlt, transfer_error, HomographyProblem, HOMOGRAPHY_SAMPLE_SIZE};
pub use pnp::{pnp_dlt, reprojection_error, PnpProblem, PointObservation, PNP_SAMPLE_SIZE};
pub use solver::{FundamentalMatrixSolver, FundamentalSolverConfig, SolverError};
