//! Sequential frame producers.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::utils::is_image_file;
use crate::{Error, Result};

/// A source of frames consumed one at a time.
pub trait FrameSource {
    /// Next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Frames read from the image files of a directory, in file-name order.
#[derive(Debug, Clone)]
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageSequence {
    /// Collect the image files of `dir`.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| {
            Error::IoError(std::io::Error::new(
                e.kind(),
                format!("failed to read frame directory '{}': {}", dir.display(), e),
            ))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_image_file(&path) {
                paths.push(path);
            }
        }

        if paths.is_empty() {
            return Err(Error::FrameSource(format!("no image files in '{}'", dir.display())));
        }
        Ok(Self::from_paths(paths))
    }

    /// Sequence over explicit paths, sorted by file name.
    pub fn from_paths(mut paths: Vec<PathBuf>) -> Self {
        paths.sort();
        Self { paths, next: 0 }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        Ok(Some(image::open(path)?.to_rgb8()))
    }
}

/// Frames held in memory.
#[derive(Debug, Clone, Default)]
pub struct VecFrameSource {
    frames: VecDeque<RgbImage>,
}

impl VecFrameSource {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self { frames: frames.into() }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for VecFrameSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }
}
