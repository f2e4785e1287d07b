#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use epipolar_pose as pose;

#[doc(inline)]
pub use epipolar_ransac as ransac;

#[doc(inline)]
pub use epipolar_twoview as twoview;

pub use epipolar_pose::glam;
