//! Observation likelihoods.
//!
//! Two scoring modes are available:
//! - decomposed: diffusion distance between chain-averaged templates and the
//!   candidate's feature patches
//! - holistic: Bhattacharyya distance between HSV histograms of the two
//!   halves of the candidate window and the object's colour reference

use image::RgbImage;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::patch::{crop_resize, to_float_plane, FloatPlane, PixelWindow};
use super::{ColorReference, FeatureExtractor, ObservationModel};
use crate::distances::{ColorHistogram, DiffusionDistance};
use crate::internal::imgproc::{rgb_to_hsv, HsvPlanes};
use crate::particle::ObjectState;
use crate::utils::to_pixel;
use crate::{Error, Result};

/// Likelihood used to score candidate states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikelihoodMode {
    #[default]
    Decomposed,
    Holistic,
}

/// Everything the likelihoods need from one frame.
///
/// Feature planes are kept as `f32` luma images so candidate patches can be
/// cropped and resampled without converting the frame again.
#[derive(Debug, Clone)]
pub struct FrameObservation {
    pub hsv: HsvPlanes,
    pub features: Vec<FloatPlane>,
}

impl FrameObservation {
    /// Convert `frame` to HSV and run the feature extractor on it.
    pub fn new(frame: &RgbImage, extractor: &dyn FeatureExtractor) -> Result<Self> {
        let features = extractor.extract(frame)?;
        if features.len() != extractor.num_features() {
            return Err(Error::FeatureExtraction(format!(
                "extractor promised {} planes but returned {}",
                extractor.num_features(),
                features.len()
            )));
        }
        Self::from_parts(rgb_to_hsv(frame), features)
    }

    /// Assemble an observation from precomputed planes.
    pub fn from_parts(hsv: HsvPlanes, features: Vec<DMatrix<f64>>) -> Result<Self> {
        let shape = (hsv.nrows(), hsv.ncols());
        if let Some((i, p)) = features.iter().enumerate().find(|(_, p)| p.shape() != shape) {
            return Err(Error::FeatureExtraction(format!(
                "feature plane {} has shape {:?}, frame is {:?}",
                i,
                p.shape(),
                shape
            )));
        }
        let features = features.iter().map(to_float_plane).collect();
        Ok(Self { hsv, features })
    }

    pub fn width(&self) -> usize {
        self.hsv.ncols()
    }

    pub fn height(&self) -> usize {
        self.hsv.nrows()
    }
}

/// Pixel window covered by an object state.
pub fn object_window(state: &ObjectState) -> PixelWindow {
    PixelWindow::centered(
        to_pixel(state.y),
        to_pixel(state.x),
        to_pixel(state.scaled_width()),
        to_pixel(state.scaled_height()),
    )
}

/// Holistic colour likelihood of a `w × h` window centred on `(row, col)`.
///
/// Returns `exp(−λ · 4 · d² / 2)` where `d²` sums the squared Bhattacharyya
/// distances of both halves.
pub fn likelihood_color(
    planes: &HsvPlanes,
    row: i64,
    col: i64,
    w: i64,
    h: i64,
    reference: &[ColorHistogram; 2],
    lambda: f64,
) -> f64 {
    let d_sq: f64 = ColorReference::half_windows(row, col, w, h)
        .into_iter()
        .zip(reference)
        .map(|(win, r)| ColorHistogram::from_windows([(planes, win)]).bhattacharyya_dist_sq(r))
        .sum();

    (-lambda * 4.0 * d_sq / 2.0).exp()
}

/// Decomposed likelihood of `window` under chain `chain_index` of `model`.
///
/// For each feature the chain references, the diffusion distance between
/// the chain's averaged template and the resized candidate patch is divided
/// by the patch area. The mean over referenced features gives
/// `exp(−λ · mean)`.
pub fn likelihood_decomposed(
    features: &[FloatPlane],
    window: PixelWindow,
    model: &ObservationModel,
    chain_index: usize,
    lambda: f64,
    dd: &mut DiffusionDistance,
) -> Result<f64> {
    let chain = model.chain(chain_index).ok_or_else(|| {
        Error::LikelihoodError(format!(
            "chain {} requested but the model holds {}",
            chain_index,
            model.chains().len()
        ))
    })?;
    if chain.is_empty() {
        return Err(Error::LikelihoodError(format!("chain {} is empty", chain_index)));
    }

    let (pw, ph) = model.patch_size();
    let area = (pw * ph) as f64;
    let mut total = 0.0;
    let mut active = 0usize;

    for (feature, plane) in features.iter().enumerate().take(model.num_features()) {
        let Some(template) = model.averaged_template(chain_index, feature) else {
            continue;
        };

        // The candidate patch is the same for every referenced slot, so its
        // average is the patch itself.
        let patch = crop_resize(plane, window, pw, ph);
        let dims = [template.ncols(), template.nrows()];
        total += dd.distance(template.as_slice(), patch.as_slice(), &dims)? / area;
        active += 1;
    }

    if active == 0 {
        return Err(Error::LikelihoodError(format!(
            "chain {} references no available feature",
            chain_index
        )));
    }

    Ok((-lambda * total / active as f64).exp())
}

/// Scores object states of one frame against the per-object models.
///
/// Shared across threads; each worker brings its own [`DiffusionDistance`].
#[derive(Debug, Clone, Copy)]
pub struct AppearanceScorer<'a> {
    mode: LikelihoodMode,
    lambda: f64,
    frame: &'a FrameObservation,
    models: &'a [ObservationModel],
}

impl<'a> AppearanceScorer<'a> {
    pub fn new(mode: LikelihoodMode, lambda: f64, frame: &'a FrameObservation, models: &'a [ObservationModel]) -> Self {
        Self { mode, lambda, frame, models }
    }

    pub fn num_objects(&self) -> usize {
        self.models.len()
    }

    /// Likelihood of `state` as object `object`, using feature chain `chain_index`.
    pub fn score(
        &self,
        object: usize,
        state: &ObjectState,
        chain_index: usize,
        dd: &mut DiffusionDistance,
    ) -> Result<f64> {
        let model = self.models.get(object).ok_or_else(|| {
            Error::LikelihoodError(format!("no observation model for object {}", object))
        })?;
        let window = object_window(state);

        match self.mode {
            LikelihoodMode::Decomposed => {
                likelihood_decomposed(&self.frame.features, window, model, chain_index, self.lambda, dd)
            }
            LikelihoodMode::Holistic => Ok(likelihood_color(
                &self.frame.hsv,
                to_pixel(state.y),
                to_pixel(state.x),
                window.width,
                window.height,
                model.color().histograms(),
                self.lambda,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{ChainEntry, FeatureChain, HsvEdgeExtractor};
    use crate::observation::{ChainDecomposer, TemplateHistory};
    use crate::sampler::SamplerConfig;
    use approx::assert_relative_eq;
    use image::Rgb;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Unused;

    impl ChainDecomposer for Unused {
        fn decompose(&self, _: &TemplateHistory<'_>, _: usize) -> Result<Vec<FeatureChain>> {
            Err(Error::Decomposition("not expected".to_string()))
        }
    }

    fn square_frame(offset: u32) -> RgbImage {
        RgbImage::from_fn(100, 100, |x, y| {
            if (40 + offset..60 + offset).contains(&x) && (30..70).contains(&y) {
                Rgb([230, 40, 40])
            } else {
                Rgb([20, 20, 20])
            }
        })
    }

    fn model_for(frame: &FrameObservation, state: &ObjectState) -> ObservationModel {
        let config = SamplerConfig::default();
        let color = ColorReference::from_window(
            &frame.hsv,
            to_pixel(state.y),
            to_pixel(state.x),
            to_pixel(state.width),
            to_pixel(state.height),
        );
        let mut model = ObservationModel::new(frame.features.len(), &config, color).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        model
            .refresh(&frame.features, object_window(state), &Unused, &mut rng)
            .unwrap();

        // Use every feature at slot 0 in every chain.
        let chain = FeatureChain::new((0..frame.features.len()).map(|f| ChainEntry::new(f, 0, 1.0)).collect());
        model.set_chains(vec![chain; config.num_feature_chains]).unwrap();
        model
    }

    #[test]
    fn test_decomposed_peaks_on_the_template() {
        let obs = FrameObservation::new(&square_frame(0), &HsvEdgeExtractor::default()).unwrap();
        let state = ObjectState::at_rest(50.0, 50.0, 20.0, 40.0);
        let model = model_for(&obs, &state);
        let mut dd = DiffusionDistance::new();

        let exact = likelihood_decomposed(&obs.features, object_window(&state), &model, 0, 5.0, &mut dd).unwrap();
        assert_relative_eq!(exact, 1.0, epsilon = 1e-12);

        let shifted = ObjectState::at_rest(58.0, 50.0, 20.0, 40.0);
        let off = likelihood_decomposed(&obs.features, object_window(&shifted), &model, 0, 5.0, &mut dd).unwrap();
        assert!(off < exact);
        assert!(off > 0.0);
    }

    #[test]
    fn test_holistic_prefers_matching_colours() {
        let obs = FrameObservation::new(&square_frame(0), &HsvEdgeExtractor::default()).unwrap();
        let state = ObjectState::at_rest(50.0, 50.0, 20.0, 40.0);
        let model = model_for(&obs, &state);
        let scorer = AppearanceScorer::new(LikelihoodMode::Holistic, 5.0, &obs, std::slice::from_ref(&model));
        let mut dd = DiffusionDistance::new();

        let on = scorer.score(0, &state, 0, &mut dd).unwrap();
        assert_relative_eq!(on, 1.0, epsilon = 1e-9);

        let background = ObjectState::at_rest(15.0, 80.0, 20.0, 40.0);
        let off = scorer.score(0, &background, 0, &mut dd).unwrap();
        assert!(off < 0.01);
    }

    #[test]
    fn test_scorer_dispatches_decomposed() {
        let obs = FrameObservation::new(&square_frame(0), &HsvEdgeExtractor::default()).unwrap();
        let state = ObjectState::at_rest(50.0, 50.0, 20.0, 40.0);
        let model = model_for(&obs, &state);
        let models = [model];
        let scorer = AppearanceScorer::new(LikelihoodMode::Decomposed, 5.0, &obs, &models);
        let mut dd = DiffusionDistance::new();

        assert_relative_eq!(scorer.score(0, &state, 3, &mut dd).unwrap(), 1.0, epsilon = 1e-12);
        assert!(matches!(scorer.score(1, &state, 0, &mut dd), Err(Error::LikelihoodError(_))));
        assert!(matches!(scorer.score(0, &state, 4, &mut dd), Err(Error::LikelihoodError(_))));
    }

    #[test]
    fn test_color_likelihood_formula() {
        let planes = HsvPlanes {
            hue: DMatrix::zeros(10, 10),
            saturation: DMatrix::from_element(10, 10, 1.0),
            value: DMatrix::from_element(10, 10, 1.0),
        };
        // Reference sits in a different bin: d² = 1 per half.
        let grey = HsvPlanes {
            hue: DMatrix::zeros(10, 10),
            saturation: DMatrix::zeros(10, 10),
            value: DMatrix::from_element(10, 10, 0.5),
        };
        let reference = ColorReference::from_window(&grey, 5, 5, 4, 4);
        let l = likelihood_color(&planes, 5, 5, 4, 4, reference.histograms(), 5.0);
        assert_relative_eq!(l, (-5.0f64 * 4.0 * 2.0 / 2.0).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_frame_observation_rejects_mismatched_planes() {
        let frame = square_frame(0);
        let hsv = rgb_to_hsv(&frame);
        let bad = vec![DMatrix::zeros(10, 10)];
        assert!(matches!(
            FrameObservation::from_parts(hsv, bad),
            Err(Error::FeatureExtraction(_))
        ));
    }

    #[test]
    fn test_object_window_rounds_scaled_size() {
        let mut state = ObjectState::at_rest(50.4, 30.6, 20.0, 40.0);
        state.s = 1.1;
        let w = object_window(&state);
        assert_eq!((w.width, w.height), (22, 44));
        assert_eq!((w.col, w.row), (50 - 11, 31 - 22));
    }
}
