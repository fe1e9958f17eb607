//! RGB to HSV conversion.

use image::RgbImage;
use nalgebra::DMatrix;

/// Hue, saturation and value planes of a frame.
///
/// Hue is in degrees `[0, 360)`, saturation and value in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct HsvPlanes {
    pub hue: DMatrix<f64>,
    pub saturation: DMatrix<f64>,
    pub value: DMatrix<f64>,
}

impl HsvPlanes {
    pub fn nrows(&self) -> usize {
        self.value.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.value.ncols()
    }
}

/// Convert one RGB pixel (components in `[0, 1]`) to HSV.
pub fn pixel_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = v - min;

    let s = if v > 0.0 { delta / v } else { 0.0 };

    let mut h = if delta <= 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / delta
    } else if v == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    (h, s, v)
}

/// Convert an 8-bit RGB frame into floating-point HSV planes.
pub fn rgb_to_hsv(img: &RgbImage) -> HsvPlanes {
    let (width, height) = img.dimensions();
    let (rows, cols) = (height as usize, width as usize);

    let mut hue = DMatrix::zeros(rows, cols);
    let mut saturation = DMatrix::zeros(rows, cols);
    let mut value = DMatrix::zeros(rows, cols);

    for (x, y, px) in img.enumerate_pixels() {
        let [r, g, b] = px.0;
        let (h, s, v) = pixel_to_hsv(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
        let idx = (y as usize, x as usize);
        hue[idx] = h;
        saturation[idx] = s;
        value[idx] = v;
    }

    HsvPlanes { hue, saturation, value }
}
