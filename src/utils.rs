//! Utility functions for imcmc_track.

use std::path::Path;

/// File extensions recognised as still images.
const IMAGE_EXTENSIONS: [&str; 9] = ["png", "jpg", "jpeg", "pbm", "pgm", "ppm", "bmp", "tif", "tiff"];

/// Clamp a value to a range.
///
/// Unlike `f64::clamp` this never panics when `min > max`; the lower bound
/// wins, which keeps degenerate windows (object larger than the frame) usable.
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    let upper = if value > max { max } else { value };
    if upper < min {
        min
    } else {
        upper
    }
}

/// Round a coordinate to the nearest pixel (half away from zero for positives).
#[inline]
pub fn to_pixel(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Check whether a path has one of the supported image extensions.
pub fn is_image_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}
