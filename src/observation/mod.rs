//! Appearance models and observation likelihoods.
//!
//! This module provides:
//! - `FeatureChain` - weighted references into an object's template queue
//! - `ObservationModel` - per-object template queue, chains and colour reference
//! - `FeatureExtractor` / `ChainDecomposer` - pluggable numerical backends
//! - `HsvEdgeExtractor` / `EigenChainDecomposer` - default backends
//! - `AppearanceScorer` - decomposed and holistic likelihoods
//! - `PixelWindow` / `crop_resize` - object windows and canonical-size patches

mod chain;
mod patch;
mod traits;
mod extractor;
mod decomposer;
mod model;
mod likelihood;

pub use chain::{ChainEntry, FeatureChain};
pub use patch::{crop_resize, from_float_plane, to_float_plane, FloatPlane, PixelWindow};
pub use traits::{ChainDecomposer, FeatureExtractor, TemplateHistory};
pub use extractor::{FeatureSet, HsvEdgeExtractor};
pub use decomposer::{EigenChainDecomposer, DEFAULT_LOADING_THRESHOLD};
pub use model::{ColorReference, ObservationModel};
pub use likelihood::{
    likelihood_color, likelihood_decomposed, object_window, AppearanceScorer, FrameObservation,
    LikelihoodMode,
};
