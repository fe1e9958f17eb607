//! Colour conversion into `DMatrix<f64>` planes.
//!
//! Planes are stored as (rows = image height, cols = image width).

mod color;

pub use color::{rgb_to_hsv, HsvPlanes};
