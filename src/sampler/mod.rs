//! Interacting MCMC sampling.
//!
//! This module provides:
//! - `SamplerConfig` - immutable run configuration and its loaders
//! - `ChainBank` - current/proposed chain hypotheses and the particle pool
//! - `ImcmcSampler` - the per-frame transition, sweep and interaction loop

mod config;
mod chain_bank;
mod imcmc;

pub use config::{ExecutionStrategy, PoolPolicy, SamplerConfig};
pub use chain_bank::ChainBank;
pub use imcmc::{FrameEstimate, ImcmcSampler};

// Re-exported so configuration can be written against this module alone.
pub use crate::observation::{FeatureSet, LikelihoodMode};
