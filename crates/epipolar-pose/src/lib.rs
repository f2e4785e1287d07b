#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Epipolar Pose
//!
//! A [`Pose`] is a rigid-body transform stored as a single 4x4 homogeneous
//! matrix. The axis-angle view of its rotation is computed on demand, so the two
//! representations can never drift apart.
//!
//! ```rust
//! use epipolar_pose::{Pose, glam::{DMat3, DVec3}};
//!
//! let pose = Pose::new(DMat3::from_rotation_z(0.5), DVec3::new(0.1, 0.0, 2.0));
//! let aa = pose.to_axis_angle();
//! let back = Pose::from_axis_angle(aa, pose.translation());
//! assert!(pose.is_approx(&back));
//! ```

/// Rigid-body pose type.
pub mod pose;

/// Rotation helpers: Rodrigues conversions, Euler angles and skew matrices.
pub mod rotation;

pub use pose::{Pose, POSE_APPROX_TOLERANCE};
pub use rotation::{
    axis_angle_to_rotation, euler_angles_to_rotation, rotation_to_axis_angle, skew, vee,
};

pub use glam;
