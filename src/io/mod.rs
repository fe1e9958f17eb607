//! File formats and frame input.
//!
//! This module provides:
//! - `RegionFile` / `RegionSchedule` - detection regions keyed by frame
//! - `ResultLog` - per-frame best-configuration writer
//! - `FrameSource` - sequential frame producers (`ImageSequence`, `VecFrameSource`)

mod region;
mod result_log;
mod frame_source;

pub use region::{Region, RegionFile, RegionSchedule};
pub use result_log::{format_frame, ResultLog};
pub use frame_source::{FrameSource, ImageSequence, VecFrameSource};
