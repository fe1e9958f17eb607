//! # imcmc_track - Interacting MCMC Visual Tracking
//!
//! Model-based tracking of multiple objects across a video sequence. A joint
//! posterior over every object's position and scale is carried from frame to
//! frame by a bank of interacting Markov chains, scored against decomposed
//! appearance templates with a multi-resolution diffusion distance.
//!
//! ## Features
//!
//! - Second-order autoregressive transition model and single-object
//!   Metropolis-Hastings proposals
//! - Interacting chains with annealed resampling across the chain bank
//! - Decomposed appearance likelihood (feature chains over a template queue)
//!   and a holistic HSV colour likelihood
//! - Pluggable feature extraction and chain decomposition backends
//! - Explicitly seeded randomness and optional data-parallel scoring
//!
//! ## Example
//!
//! ```rust,ignore
//! use imcmc_track::{SamplerConfig, Tracker};
//! use imcmc_track::io::{ImageSequence, RegionFile, ResultLog};
//!
//! let config = SamplerConfig::from_param_file("param.txt")?;
//! let regions = RegionFile::new("regions.txt")?;
//! let mut tracker = Tracker::new(config, regions.into_schedule())?;
//!
//! let mut source = ImageSequence::new("frames/")?;
//! let mut log = ResultLog::create("best_configuration.txt")?;
//! tracker.run(&mut source, Some(&mut log))?;
//! ```

// Internal modules (colour conversion)
pub(crate) mod internal;

// Public modules
pub mod particle;
pub mod motion;
pub mod distances;
pub mod observation;
pub mod sampler;
pub mod tracker;
pub mod io;
pub mod utils;

// Re-exports for convenience
pub use particle::{BoundingBox, ObjectState, Particle};
pub use internal::imgproc::HsvPlanes;
pub use distances::{ColorHistogram, DiffusionDistance};
pub use observation::{
    ChainDecomposer, EigenChainDecomposer, FeatureChain, FeatureExtractor, HsvEdgeExtractor,
    ObservationModel, PixelWindow,
};
pub use sampler::{ChainBank, FrameEstimate, ImcmcSampler, SamplerConfig};
pub use tracker::{FrameResult, Tracker, TrackerState};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur while tracking.
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Too many objects: requested {requested}, maximum is {max}")]
        CapacityExceeded { requested: usize, max: usize },

        #[error("Invalid region: {0}")]
        InvalidRegion(String),

        #[error("Feature extraction failed: {0}")]
        FeatureExtraction(String),

        #[error("Chain decomposition failed: {0}")]
        Decomposition(String),

        #[error("Distance error: {0}")]
        DistanceError(String),

        #[error("Likelihood error: {0}")]
        LikelihoodError(String),

        #[error("Frame source error: {0}")]
        FrameSource(String),

        #[error("IO error: {0}")]
        IoError(#[from] std::io::Error),

        #[error("Image error: {0}")]
        ImageError(#[from] image::ImageError),

        #[error("Config parse error: {0}")]
        ConfigParse(#[from] serde_json::Error),
    }

    /// Result type for tracking operations
    pub type Result<T> = std::result::Result<T, Error>;
}
