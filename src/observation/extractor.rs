//! Default feature extractor: HSV planes plus an edge-strength plane.

use image::{GrayImage, Luma, RgbImage};
use imageproc::gradients::sobel_gradients;
use imageproc::morphology::{grayscale_dilate, Mask};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::FeatureExtractor;
use crate::internal::imgproc::rgb_to_hsv;
use crate::{Error, Result};

/// Which planes the extractor produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    /// `[value, edge]`
    ValueEdge,
    /// `[hue / 360, saturation, value, edge]`
    #[default]
    HsvEdge,
}

impl FeatureSet {
    pub fn num_features(self) -> usize {
        match self {
            FeatureSet::ValueEdge => 2,
            FeatureSet::HsvEdge => 4,
        }
    }

    /// Feature set selected by the `nChannel` field of a parameter file.
    pub fn from_channel_flag(n_channel: i64) -> Self {
        if n_channel == 0 {
            FeatureSet::ValueEdge
        } else {
            FeatureSet::HsvEdge
        }
    }
}

/// Extracts hue, saturation, value and edge planes from an RGB frame.
///
/// The edge plane is the Sobel gradient magnitude of the value plane scaled
/// to `[0, 1]`. Value is dilated once and edge twice with a 3×3 max filter.
/// Value and edge are processed as 8-bit grey images; value is exactly
/// `max(r, g, b) / 255`, so only the edge plane is quantised.
#[derive(Debug, Clone, Copy, Default)]
pub struct HsvEdgeExtractor {
    feature_set: FeatureSet,
}

impl HsvEdgeExtractor {
    pub fn new(feature_set: FeatureSet) -> Self {
        Self { feature_set }
    }

    pub fn feature_set(&self) -> FeatureSet {
        self.feature_set
    }
}

impl FeatureExtractor for HsvEdgeExtractor {
    fn num_features(&self) -> usize {
        self.feature_set.num_features()
    }

    fn extract(&self, frame: &RgbImage) -> Result<Vec<DMatrix<f64>>> {
        let (width, height) = frame.dimensions();
        if width < 3 || height < 3 {
            return Err(Error::FeatureExtraction(format!(
                "frame of {}x{} is too small for edge extraction",
                width, height
            )));
        }

        let gray = value_image(frame);
        let square = Mask::square(1);

        let edge = scale_to_u8(&sobel_gradients(&gray));
        let edge = grayscale_dilate(&grayscale_dilate(&edge, &square), &square);
        let value = grayscale_dilate(&gray, &square);
        let (edge, value) = (unit_plane(&edge), unit_plane(&value));

        Ok(match self.feature_set {
            FeatureSet::ValueEdge => vec![value, edge],
            FeatureSet::HsvEdge => {
                let hsv = rgb_to_hsv(frame);
                let hue = hsv.hue / 360.0;
                vec![hue, hsv.saturation, value, edge]
            }
        })
    }
}

/// HSV value channel as an 8-bit grey image.
fn value_image(frame: &RgbImage) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let [r, g, b] = frame.get_pixel(x, y).0;
        Luma([r.max(g).max(b)])
    })
}

/// Rescale gradient magnitudes so the strongest maps to 255.
///
/// A flat gradient image maps to all zeros.
fn scale_to_u8(gradients: &image::ImageBuffer<Luma<u16>, Vec<u16>>) -> GrayImage {
    let max = gradients.pixels().map(|p| p[0]).max().unwrap_or(0);
    if max == 0 {
        return GrayImage::new(gradients.width(), gradients.height());
    }
    let scale = 255.0 / max as f64;
    GrayImage::from_fn(gradients.width(), gradients.height(), |x, y| {
        Luma([(gradients.get_pixel(x, y)[0] as f64 * scale).round() as u8])
    })
}

/// `rows × cols` plane with grey levels mapped to `[0, 1]`.
fn unit_plane(img: &GrayImage) -> DMatrix<f64> {
    DMatrix::from_fn(img.height() as usize, img.width() as usize, |r, c| {
        img.get_pixel(c as u32, r as u32)[0] as f64 / 255.0
    })
}
