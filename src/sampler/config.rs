//! Sampler configuration.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::motion::MotionNoise;
use crate::observation::{FeatureSet, LikelihoodMode};
use crate::{Error, Result};

/// What to do when the particle pool fills up during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolPolicy {
    /// End the whole frame's sweep as soon as a particle cannot be recorded.
    #[default]
    StopSweep,
    /// Keep running the Metropolis sweep without recording further particles.
    KeepSweeping,
}

/// How chain slots are scored.
///
/// Random draws are always made on the calling thread in chain order, so both
/// strategies produce identical results for the same seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    #[default]
    Sequential,
    /// Score chain slots on the rayon thread pool.
    Parallel,
}

/// Immutable sampler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Feature planes produced by the default extractor.
    pub feature_set: FeatureSet,

    /// Local MCMC iterations per frame.
    pub iterations: usize,

    /// Base noise multiplier; odd motion indices use twice this value.
    pub variance: f64,

    /// Lower scale bound.
    pub scale_min: f64,

    /// Upper scale bound.
    pub scale_max: f64,

    /// Maximum number of simultaneously tracked objects.
    pub max_objects: usize,

    /// Number of motion noise levels.
    pub num_motions: usize,

    /// Number of feature chains per object.
    pub num_feature_chains: usize,

    /// Template queue length, including the permanent slot 0.
    pub queue_len: usize,

    /// Chains are rebuilt every `refresh_interval` template updates.
    pub refresh_interval: usize,

    /// Canonical template width in pixels.
    pub patch_width: usize,

    /// Canonical template height in pixels.
    pub patch_height: usize,

    /// Likelihood sharpness.
    pub lambda: f64,

    /// Enable the interaction (resampling) step.
    pub interaction: bool,

    /// Weights are floored at this value before taking logarithms.
    pub weight_floor: f64,

    /// Particle pool size; `None` means `iterations × num_chains()`.
    pub pool_capacity: Option<usize>,

    pub pool_policy: PoolPolicy,

    pub likelihood_mode: LikelihoodMode,

    pub execution: ExecutionStrategy,

    /// Seed of the sampler's random stream.
    pub seed: u64,

    pub motion_noise: MotionNoise,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            feature_set: FeatureSet::HsvEdge,
            iterations: 100,
            variance: 1.0,
            scale_min: 0.9,
            scale_max: 1.1,
            max_objects: 10,
            num_motions: 2,
            num_feature_chains: 4,
            queue_len: 5,
            refresh_interval: 2,
            patch_width: 20,
            patch_height: 60,
            lambda: 5.0,
            interaction: true,
            weight_floor: 1e-30,
            pool_capacity: None,
            pool_policy: PoolPolicy::StopSweep,
            likelihood_mode: LikelihoodMode::Decomposed,
            execution: ExecutionStrategy::Sequential,
            seed: 0,
            motion_noise: MotionNoise::default(),
        }
    }
}

impl SamplerConfig {
    /// Default configuration with the given iteration count and variance.
    pub fn new(iterations: usize, variance: f64) -> Self {
        Self {
            iterations,
            variance,
            ..Self::default()
        }
    }

    /// Total number of chain slots: one per (motion, feature chain) pair.
    pub fn num_chains(&self) -> usize {
        self.num_motions * self.num_feature_chains
    }

    /// Number of particles recorded per frame.
    pub fn pool_capacity(&self) -> usize {
        self.pool_capacity
            .unwrap_or(self.iterations.saturating_mul(self.num_chains()))
    }

    /// Number of feature planes used by each observation model.
    pub fn num_features(&self) -> usize {
        self.feature_set.num_features()
    }

    /// Check the configuration for values the sampler cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(Error::InvalidConfig(msg.to_string()));

        if self.iterations == 0 {
            return invalid("iterations must be positive");
        }
        if self.num_motions == 0 || self.num_feature_chains == 0 {
            return invalid("num_motions and num_feature_chains must be positive");
        }
        let pool = self
            .num_motions
            .checked_mul(self.num_feature_chains)
            .and_then(|chains| chains.checked_mul(self.iterations));
        if pool.is_none() {
            return invalid("iterations x chain count overflows the particle pool size");
        }
        if self.max_objects == 0 {
            return invalid("max_objects must be positive");
        }
        if !self.variance.is_finite() || self.variance < 0.0 {
            return invalid("variance must be a non-negative number");
        }
        if !(self.scale_min.is_finite() && self.scale_max.is_finite()) || self.scale_min <= 0.0 {
            return invalid("scale bounds must be positive numbers");
        }
        if self.scale_min > self.scale_max {
            return Err(Error::InvalidConfig(format!(
                "scale_min ({}) must not exceed scale_max ({})",
                self.scale_min, self.scale_max
            )));
        }
        if self.patch_width == 0 || self.patch_height == 0 {
            return invalid("patch size must be positive");
        }
        if self.queue_len < 2 {
            return invalid("queue_len must be at least 2");
        }
        if self.refresh_interval == 0 {
            return invalid("refresh_interval must be positive");
        }
        if !(self.lambda.is_finite() && self.lambda > 0.0) {
            return invalid("lambda must be positive");
        }
        if !(self.weight_floor.is_finite() && self.weight_floor > 0.0) {
            return invalid("weight_floor must be positive");
        }
        if self.pool_capacity == Some(0) {
            return invalid("pool_capacity must be positive");
        }
        Ok(())
    }

    /// Load a configuration from a JSON file; missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = open(path.as_ref(), "config")?;
        let config: SamplerConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the whitespace-separated legacy parameter file
    /// `nChannel nIter nVar sMin sMax`.
    ///
    /// `nChannel == 0` selects the value/edge feature set, anything else the
    /// full HSV/edge set. All other fields take their defaults.
    pub fn from_param_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut contents = String::new();
        open(path.as_ref(), "parameter")?.read_to_string(&mut contents)?;
        Self::from_param_str(&contents)
    }

    /// Parse the contents of a legacy parameter file.
    pub fn from_param_str(contents: &str) -> Result<Self> {
        let mut tokens = contents.split_whitespace();
        let mut next = |name: &str| {
            tokens
                .next()
                .ok_or_else(|| Error::InvalidConfig(format!("parameter file is missing '{}'", name)))
        };

        let n_channel: i64 = parse_token(next("nChannel")?, "nChannel")?;
        let iterations: usize = parse_token(next("nIter")?, "nIter")?;
        let variance: f64 = parse_token(next("nVar")?, "nVar")?;
        let scale_min: f64 = parse_token(next("sMin")?, "sMin")?;
        let scale_max: f64 = parse_token(next("sMax")?, "sMax")?;

        let config = Self {
            feature_set: FeatureSet::from_channel_flag(n_channel),
            iterations,
            variance,
            scale_min,
            scale_max,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }
}

fn open(path: &Path, what: &str) -> Result<File> {
    File::open(path).map_err(|e| {
        Error::IoError(std::io::Error::new(
            e.kind(),
            format!("failed to open {} file '{}': {}", what, path.display(), e),
        ))
    })
}

fn parse_token<T: std::str::FromStr>(token: &str, name: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    token
        .parse()
        .map_err(|e| Error::InvalidConfig(format!("invalid value '{}' for '{}': {}", token, name, e)))
}
