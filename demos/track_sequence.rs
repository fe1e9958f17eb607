//! Track the objects of a region file through a directory of frames.
//!
//! Usage:
//!     cargo run --release --example track_sequence <frames_dir> <regions.txt> [param.txt] [out.txt]
//!
//! Example:
//!     cargo run --release --example track_sequence data/frames data/regions.txt param.txt

use std::env;
use std::process;
use std::time::Instant;

use log::{error, info};

use imcmc_track::io::{ImageSequence, RegionFile, ResultLog};
use imcmc_track::{Result, SamplerConfig, Tracker};

const DEFAULT_OUTPUT: &str = "best_configuration.txt";

fn run(args: &[String]) -> Result<()> {
    let frames_dir = &args[1];
    let regions_path = &args[2];

    let config = match args.get(3) {
        Some(path) => SamplerConfig::from_param_file(path)?,
        None => SamplerConfig::default(),
    };
    let output = args.get(4).map(String::as_str).unwrap_or(DEFAULT_OUTPUT);

    let regions = RegionFile::new(regions_path)?;
    info!("Loaded {} regions from {}", regions.len(), regions.path());

    let mut tracker = Tracker::new(config, regions.into_schedule())?;
    let mut source = ImageSequence::new(frames_dir)?;
    let mut log = ResultLog::create(output)?;

    let start = Instant::now();
    let frames = tracker.run(&mut source, Some(&mut log))?;
    let elapsed = start.elapsed().as_secs_f64();

    let fps = if elapsed > 0.0 { frames as f64 / elapsed } else { 0.0 };
    info!("{} frames in {:.2}s ({:.1} fps), results in {}", frames, elapsed, fps, output);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <frames_dir> <regions.txt> [param.txt] [out.txt]", args[0]);
        process::exit(2);
    }

    if let Err(e) = run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}
