//! Internal image-processing helpers.
//!
//! - imgproc: RGB to HSV conversion into floating-point planes

pub mod imgproc;
