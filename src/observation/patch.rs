//! Object windows and fixed-size patch sampling.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};
use nalgebra::DMatrix;

/// Single-channel floating-point image used for resampling.
pub type FloatPlane = ImageBuffer<Luma<f32>, Vec<f32>>;

/// A pixel window `(col, row, width, height)`; may extend past the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col: i64,
    pub row: i64,
    pub width: i64,
    pub height: i64,
}

impl PixelWindow {
    /// Window of size `w × h` centred on pixel `(row, col)`.
    pub fn centered(row: i64, col: i64, w: i64, h: i64) -> Self {
        Self {
            col: col - w / 2,
            row: row - h / 2,
            width: w,
            height: h,
        }
    }

    /// Intersect with an image of `rows × cols`.
    ///
    /// Returns `(row0, col0, rows, cols)` or `None` when nothing overlaps.
    pub fn clip(&self, rows: usize, cols: usize) -> Option<(usize, usize, usize, usize)> {
        let r0 = self.row.max(0);
        let c0 = self.col.max(0);
        let r1 = (self.row + self.height).min(rows as i64);
        let c1 = (self.col + self.width).min(cols as i64);
        if r1 <= r0 || c1 <= c0 {
            return None;
        }
        Some((r0 as usize, c0 as usize, (r1 - r0) as usize, (c1 - c0) as usize))
    }
}

/// Copy a `rows × cols` plane into an `f32` luma image.
pub fn to_float_plane(plane: &DMatrix<f64>) -> FloatPlane {
    let (rows, cols) = plane.shape();
    ImageBuffer::from_fn(cols as u32, rows as u32, |x, y| {
        Luma([plane[(y as usize, x as usize)] as f32])
    })
}

/// Copy an `f32` luma image back into a `height × width` plane.
pub fn from_float_plane(img: &FloatPlane) -> DMatrix<f64> {
    let (width, height) = img.dimensions();
    DMatrix::from_fn(height as usize, width as usize, |r, c| {
        img.get_pixel(c as u32, r as u32)[0] as f64
    })
}

/// Crop `window` from `plane` and resample it to `out_w × out_h` with a
/// triangle (bilinear) filter.
///
/// Planes hold values in `[0, 1]`; resampled values are clamped to that range.
/// Windows are clipped to the image. A window that misses the image entirely
/// collapses onto the nearest border pixel.
pub fn crop_resize(plane: &FloatPlane, window: PixelWindow, out_w: usize, out_h: usize) -> DMatrix<f64> {
    let (width, height) = plane.dimensions();
    if width == 0 || height == 0 {
        return DMatrix::zeros(out_h, out_w);
    }

    let (r0, c0, h, w) = window.clip(height as usize, width as usize).unwrap_or_else(|| {
        let r = window.row.clamp(0, height as i64 - 1) as usize;
        let c = window.col.clamp(0, width as i64 - 1) as usize;
        (r, c, 1, 1)
    });

    let crop = imageops::crop_imm(plane, c0 as u32, r0 as u32, w as u32, h as u32).to_image();
    let resized = imageops::resize(&crop, out_w as u32, out_h as u32, FilterType::Triangle);
    from_float_plane(&resized)
}
