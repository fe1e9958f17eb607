//! Frame-by-frame tracking loop.

use image::RgbImage;
use log::{debug, info, warn};

use crate::io::{FrameSource, Region, RegionSchedule, ResultLog};
use crate::motion::MotionBounds;
use crate::observation::{
    object_window, ChainDecomposer, ColorReference, EigenChainDecomposer, FeatureExtractor,
    FloatPlane, FrameObservation, HsvEdgeExtractor, ObservationModel,
};
use crate::particle::{BoundingBox, ObjectState, Particle};
use crate::sampler::{FrameEstimate, ImcmcSampler, SamplerConfig};
use crate::utils::to_pixel;
use crate::{Error, Result};

/// Lifecycle of a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// No object has been introduced yet.
    Uninitialized,
    /// At least one object is being tracked.
    Tracking,
}

/// Result of processing one frame.
#[derive(Debug, Clone)]
pub struct FrameResult {
    /// Zero-based index of the processed frame.
    pub frame_index: usize,
    /// Best joint state after this frame (empty while nothing is tracked).
    pub particle: Particle,
    /// Sampling statistics.
    pub estimate: FrameEstimate,
    /// Objects introduced in this frame.
    pub introduced: usize,
}

impl FrameResult {
    pub fn num_objects(&self) -> usize {
        self.particle.num_objects()
    }

    /// Bounding boxes of every object, in image coordinates.
    pub fn bounding_boxes(&self) -> Vec<BoundingBox> {
        self.particle.bounding_boxes()
    }
}

/// Multi-object tracker.
///
/// Introduces objects as their regions come due, keeps one observation model
/// per object and carries the best joint state from frame to frame.
pub struct Tracker {
    config: SamplerConfig,
    sampler: ImcmcSampler,
    extractor: Box<dyn FeatureExtractor>,
    decomposer: Box<dyn ChainDecomposer>,
    schedule: RegionSchedule,
    models: Vec<ObservationModel>,
    /// Best joint state of the last frame; seeds the next frame's sampling.
    current: Particle,
    /// Feature planes the next template refresh reads from.
    previous_features: Option<Vec<FloatPlane>>,
    frame_index: usize,
    state: TrackerState,
}

impl Tracker {
    /// Create a tracker with the default feature extractor and decomposer.
    pub fn new(config: SamplerConfig, schedule: RegionSchedule) -> Result<Self> {
        let extractor = Box::new(HsvEdgeExtractor::new(config.feature_set));
        let decomposer = Box::new(EigenChainDecomposer::default());
        Self::with_backends(config, schedule, extractor, decomposer)
    }

    /// Create a tracker with custom numerical backends.
    pub fn with_backends(
        config: SamplerConfig,
        schedule: RegionSchedule,
        extractor: Box<dyn FeatureExtractor>,
        decomposer: Box<dyn ChainDecomposer>,
    ) -> Result<Self> {
        if extractor.num_features() == 0 {
            return Err(Error::InvalidConfig(
                "feature extractor must produce at least one plane".to_string(),
            ));
        }
        let requested = schedule.iter().filter(|r| r.is_valid()).count();
        if requested > config.max_objects {
            return Err(Error::CapacityExceeded {
                requested,
                max: config.max_objects,
            });
        }
        let sampler = ImcmcSampler::new(config.clone())?;

        Ok(Self {
            config,
            sampler,
            extractor,
            decomposer,
            schedule,
            models: Vec::new(),
            current: Particle::default(),
            previous_features: None,
            frame_index: 0,
            state: TrackerState::Uninitialized,
        })
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Index of the next frame to be processed.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn num_objects(&self) -> usize {
        self.models.len()
    }

    /// Best joint state after the last processed frame.
    pub fn current(&self) -> &Particle {
        &self.current
    }

    pub fn models(&self) -> &[ObservationModel] {
        &self.models
    }

    /// Regions not yet introduced.
    pub fn pending_regions(&self) -> usize {
        self.schedule.remaining()
    }

    /// Process the next frame.
    ///
    /// Feature extraction and decomposition failures are returned as errors
    /// and leave the frame counter unchanged. Regions with a non-positive size
    /// are skipped with a warning.
    pub fn process_frame(&mut self, frame: &RgbImage) -> Result<FrameResult> {
        let (width, height) = frame.dimensions();
        let observation = FrameObservation::new(frame, self.extractor.as_ref())?;

        // Build every new object before touching the schedule so a failure
        // leaves the tracker unchanged.
        let mut arrivals = Vec::new();
        for region in self.schedule.due(self.frame_index) {
            if !region.is_valid() {
                warn!(
                    "Skipping region for frame {} with size {}x{}",
                    region.frame_index, region.width, region.height
                );
                continue;
            }
            arrivals.push(self.prepare_object(region, &observation, height)?);
        }

        let requested = self.models.len() + arrivals.len();
        if requested > self.config.max_objects {
            return Err(Error::CapacityExceeded {
                requested,
                max: self.config.max_objects,
            });
        }

        self.schedule.take_due(self.frame_index);
        let introduced = arrivals.len();
        if introduced > 0 {
            for (state, model) in arrivals {
                info!(
                    "Object {} introduced at frame {}: centre ({:.1}, {:.1}), size {}x{}",
                    self.models.len(),
                    self.frame_index,
                    state.x,
                    state.y,
                    state.width,
                    state.height
                );
                self.current.objects.push(state);
                self.models.push(model);
            }
            self.previous_features = Some(observation.features.clone());
            self.state = TrackerState::Tracking;
        }

        let mut estimate = FrameEstimate::default();
        if !self.models.is_empty() {
            let previous = self
                .previous_features
                .as_deref()
                .unwrap_or(observation.features.as_slice());
            for (model, object) in self.models.iter_mut().zip(&self.current.objects) {
                model.refresh(
                    previous,
                    object_window(object),
                    self.decomposer.as_ref(),
                    self.sampler.rng_mut(),
                )?;
            }

            let bounds = MotionBounds::new(width, height, self.config.scale_min, self.config.scale_max);
            estimate = self
                .sampler
                .sample_frame(&self.current, &observation, &self.models, &bounds)?;
            if let Some(map) = &estimate.map {
                self.current = map.clone();
            }

            for (model, object) in self.models.iter_mut().zip(&self.current.objects) {
                model.advance();
                model.color_mut().blend(
                    &observation.hsv,
                    to_pixel(object.y),
                    to_pixel(object.x),
                    to_pixel(object.scaled_width()),
                    to_pixel(object.scaled_height()),
                );
            }

            debug!(
                "Frame {}: {} objects, acceptance {:.1}%, MAP weight {:.4}",
                self.frame_index,
                self.models.len(),
                100.0 * estimate.acceptance_rate,
                estimate.map_weight
            );
        }

        self.previous_features = Some(observation.features);

        let result = FrameResult {
            frame_index: self.frame_index,
            particle: self.current.clone(),
            estimate,
            introduced,
        };
        self.frame_index += 1;
        Ok(result)
    }

    /// Process every frame of `source`, optionally logging each result.
    ///
    /// Returns the number of frames processed.
    pub fn run<S: FrameSource + ?Sized>(
        &mut self,
        source: &mut S,
        mut log: Option<&mut ResultLog>,
    ) -> Result<usize> {
        let mut processed = 0;
        while let Some(frame) = source.next_frame()? {
            let result = self.process_frame(&frame)?;
            if let Some(log) = log.as_deref_mut() {
                log.write_frame(&result.particle, frame.height())?;
            }
            processed += 1;
        }

        if let Some(log) = log {
            log.flush()?;
        }
        info!(
            "Processed {} frames, tracking {} objects ({} regions never reached)",
            processed,
            self.num_objects(),
            self.schedule.remaining()
        );
        Ok(processed)
    }

    fn prepare_object(
        &self,
        region: &Region,
        observation: &FrameObservation,
        frame_height: u32,
    ) -> Result<(ObjectState, ObservationModel)> {
        let state = ObjectState::from_region(region, frame_height);
        let color = ColorReference::from_window(
            &observation.hsv,
            to_pixel(state.y),
            to_pixel(state.x),
            to_pixel(state.width),
            to_pixel(state.height),
        );
        let model = ObservationModel::new(self.extractor.num_features(), &self.config, color)?;
        Ok((state, model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::VecFrameSource;
    use crate::observation::{FeatureChain, TemplateHistory};
    use image::Rgb;
    use nalgebra::DMatrix;

    struct FailingExtractor;

    impl FeatureExtractor for FailingExtractor {
        fn num_features(&self) -> usize {
            2
        }

        fn extract(&self, _frame: &RgbImage) -> Result<Vec<DMatrix<f64>>> {
            Err(Error::FeatureExtraction("phase congruency failed".to_string()))
        }
    }

    struct FailingDecomposer;

    impl ChainDecomposer for FailingDecomposer {
        fn decompose(&self, _: &TemplateHistory<'_>, _: usize) -> Result<Vec<FeatureChain>> {
            Err(Error::Decomposition("solver did not converge".to_string()))
        }
    }

    fn config() -> SamplerConfig {
        SamplerConfig {
            iterations: 8,
            seed: 5,
            ..SamplerConfig::default()
        }
    }

    fn frame() -> RgbImage {
        RgbImage::from_fn(80, 80, |x, y| {
            if (30..50).contains(&x) && (20..60).contains(&y) {
                Rgb([250, 250, 250])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    fn region(frame_index: usize) -> Region {
        Region {
            center_x: 40.0,
            center_y: 40.0,
            width: 20.0,
            height: 40.0,
            angle_degrees: 0.0,
            frame_index,
        }
    }

    #[test]
    fn test_state_transitions() {
        let schedule = RegionSchedule::new(vec![region(1)]);
        let mut tracker = Tracker::new(config(), schedule).unwrap();
        assert_eq!(tracker.state(), TrackerState::Uninitialized);

        let first = tracker.process_frame(&frame()).unwrap();
        assert_eq!(first.num_objects(), 0);
        assert!(first.estimate.map.is_none());
        assert_eq!(tracker.state(), TrackerState::Uninitialized);

        let second = tracker.process_frame(&frame()).unwrap();
        assert_eq!(second.introduced, 1);
        assert_eq!(second.num_objects(), 1);
        assert_eq!(tracker.state(), TrackerState::Tracking);
        assert_eq!(tracker.frame_index(), 2);
        assert_eq!(tracker.pending_regions(), 0);
    }

    #[test]
    fn test_capacity_exceeded_at_construction() {
        let cfg = SamplerConfig {
            max_objects: 1,
            ..config()
        };
        let schedule = RegionSchedule::new(vec![region(0), region(1)]);
        assert!(matches!(
            Tracker::new(cfg.clone(), schedule),
            Err(Error::CapacityExceeded { requested: 2, max: 1 })
        ));

        // Skipped regions do not count against the limit.
        let mut bad = region(1);
        bad.height = -3.0;
        let schedule = RegionSchedule::new(vec![region(0), bad]);
        assert!(Tracker::new(cfg, schedule).is_ok());
    }

    #[test]
    fn test_extractor_failure_is_surfaced() {
        let schedule = RegionSchedule::new(vec![region(0)]);
        let mut tracker = Tracker::with_backends(
            config(),
            schedule,
            Box::new(FailingExtractor),
            Box::new(EigenChainDecomposer::default()),
        )
        .unwrap();
        assert!(matches!(
            tracker.process_frame(&frame()),
            Err(Error::FeatureExtraction(_))
        ));
        assert_eq!(tracker.frame_index(), 0);
        assert_eq!(tracker.pending_regions(), 1);
        assert_eq!(tracker.num_objects(), 0);
        assert_eq!(tracker.state(), TrackerState::Uninitialized);
    }

    #[test]
    fn test_decomposer_failure_is_surfaced() {
        let schedule = RegionSchedule::new(vec![region(0)]);
        let mut tracker = Tracker::with_backends(
            config(),
            schedule,
            Box::new(HsvEdgeExtractor::default()),
            Box::new(FailingDecomposer),
        )
        .unwrap();

        // First update seeds chains without the decomposer.
        tracker.process_frame(&frame()).unwrap();
        assert!(matches!(
            tracker.process_frame(&frame()),
            Err(Error::Decomposition(_))
        ));
    }

    #[test]
    fn test_run_without_regions_is_idle() {
        let mut tracker = Tracker::new(config(), RegionSchedule::default()).unwrap();
        let mut source = VecFrameSource::new(vec![frame(), frame(), frame()]);
        assert_eq!(tracker.run(&mut source, None).unwrap(), 3);
        assert_eq!(tracker.num_objects(), 0);
        assert!(tracker.current().is_empty());
    }

    #[test]
    fn test_models_advance_each_frame() {
        let schedule = RegionSchedule::new(vec![region(0)]);
        let mut tracker = Tracker::new(config(), schedule).unwrap();
        for _ in 0..3 {
            tracker.process_frame(&frame()).unwrap();
        }
        let model = &tracker.models()[0];
        assert_eq!(model.update_count(), 4);
        assert_eq!(model.queue_index(), 3);
        assert!(model.template(0, 2).is_some());
        assert!(model.template(0, 3).is_none());
    }

    #[test]
    fn test_invalid_region_skipped() {
        let mut bad = region(0);
        bad.width = 0.0;
        let mut tracker = Tracker::new(config(), RegionSchedule::new(vec![bad])).unwrap();

        let result = tracker.process_frame(&frame()).unwrap();
        assert_eq!(result.introduced, 0);
        assert_eq!(result.num_objects(), 0);
        assert!(result.estimate.map.is_none());
        assert_eq!(tracker.state(), TrackerState::Uninitialized);
        assert_eq!(tracker.pending_regions(), 0);

        tracker.process_frame(&frame()).unwrap();
        assert_eq!(tracker.frame_index(), 2);
    }

    #[test]
    fn test_invalid_region_does_not_block_valid_ones() {
        let mut bad = region(0);
        bad.width = 0.0;
        let schedule = RegionSchedule::new(vec![bad, region(0)]);
        let mut tracker = Tracker::new(config(), schedule).unwrap();

        let result = tracker.process_frame(&frame()).unwrap();
        assert_eq!(result.introduced, 1);
        assert_eq!(tracker.num_objects(), 1);
        assert_eq!(tracker.state(), TrackerState::Tracking);
    }
}
