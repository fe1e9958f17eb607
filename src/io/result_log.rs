//! Per-frame tracking result writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::particle::Particle;
use crate::{Error, Result};

/// Writer for the per-frame best configuration.
///
/// One line per object and frame: `x1 y1 x2 y2` (integer pixels) of the
/// window's top-left and bottom-right corners, with y measured from the
/// bottom of the frame.
pub struct ResultLog {
    writer: BufWriter<File>,
    frames_written: usize,
}

impl ResultLog {
    /// Create (or truncate) the log file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(&path).map_err(|e| {
            Error::IoError(std::io::Error::new(
                e.kind(),
                format!("failed to create result log '{}': {}", path.as_ref().display(), e),
            ))
        })?;

        Ok(Self {
            writer: BufWriter::new(file),
            frames_written: 0,
        })
    }

    /// Append one frame's estimate.
    pub fn write_frame(&mut self, particle: &Particle, frame_height: u32) -> Result<()> {
        for line in format_frame(particle, frame_height) {
            writeln!(self.writer, "{}", line)?;
        }
        self.frames_written += 1;
        Ok(())
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Flush the writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::IoError)
    }
}

impl Drop for ResultLog {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Log lines for every object of `particle`.
pub fn format_frame(particle: &Particle, frame_height: u32) -> Vec<String> {
    let h = frame_height as i64;
    particle
        .bounding_boxes()
        .iter()
        .map(|b| {
            format!(
                "{} {} {} {}",
                b.x1 as i64,
                h - b.y1 as i64,
                b.x2 as i64,
                h - b.y2 as i64
            )
        })
        .collect()
}
