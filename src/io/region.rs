//! Detection region input.
//!
//! A region file is a whitespace-separated sequence of 6-tuples
//! `centerX centerY width height angleDegrees frameIndex`, with the vertical
//! axis pointing up from the bottom of the frame.

use std::collections::VecDeque;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::warn;

use crate::{Error, Result};

/// One object introduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub center_x: f64,
    /// Centre y measured from the bottom edge of the frame.
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
    /// Stored for completeness; tracking windows are axis-aligned.
    pub angle_degrees: f64,
    /// Frame in which the object is introduced.
    pub frame_index: usize,
}

impl Region {
    /// Centre row in image coordinates (origin at the top-left corner).
    pub fn image_row(&self, frame_height: u32) -> f64 {
        frame_height as f64 - self.center_y
    }

    /// Whether the region describes a usable window: finite fields and a
    /// positive size.
    pub fn is_valid(&self) -> bool {
        [self.center_x, self.center_y, self.width, self.height, self.angle_degrees]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Build a region from the six numeric fields of one tuple.
    pub fn from_fields(fields: [f64; 6]) -> Result<Self> {
        let [center_x, center_y, width, height, angle_degrees, frame] = fields;

        if fields.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidRegion(format!("non-finite field in {:?}", fields)));
        }
        if width <= 0.0 || height <= 0.0 {
            return Err(Error::InvalidRegion(format!(
                "region size must be positive, got {}x{}",
                width, height
            )));
        }
        if frame < 0.0 || frame.fract() != 0.0 {
            return Err(Error::InvalidRegion(format!("invalid frame index {}", frame)));
        }

        Ok(Self {
            center_x,
            center_y,
            width,
            height,
            angle_degrees,
            frame_index: frame as usize,
        })
    }
}

/// Parsed region file.
#[derive(Debug, Clone)]
pub struct RegionFile {
    path: String,
    regions: Vec<Region>,
}

impl RegionFile {
    /// Read and parse a region file.
    pub fn new<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let path = file_path.as_ref().to_string_lossy().to_string();
        let mut file = File::open(&file_path).map_err(|e| {
            Error::IoError(std::io::Error::new(
                e.kind(),
                format!("failed to open region file '{}': {}", path, e),
            ))
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let regions = Self::parse_str(&contents);

        Ok(Self { path, regions })
    }

    /// Parse region tuples from text.
    ///
    /// Parsing stops at the first incomplete or malformed tuple; everything
    /// before it is kept.
    pub fn parse_str(contents: &str) -> Vec<Region> {
        let tokens: Vec<&str> = contents.split_whitespace().collect();
        let mut regions = Vec::with_capacity(tokens.len() / 6);

        for (i, tuple) in tokens.chunks(6).enumerate() {
            if tuple.len() < 6 {
                warn!("Region tuple {} is incomplete; ignoring the rest of the input", i);
                break;
            }

            let mut fields = [0.0; 6];
            let parsed = tuple
                .iter()
                .zip(fields.iter_mut())
                .all(|(token, field)| match token.parse::<f64>() {
                    Ok(v) => {
                        *field = v;
                        true
                    }
                    Err(_) => false,
                });
            if !parsed {
                warn!("Region tuple {} is not numeric; ignoring the rest of the input", i);
                break;
            }

            match Region::from_fields(fields) {
                Ok(region) => regions.push(region),
                Err(e) => {
                    warn!("Region tuple {} rejected ({}); ignoring the rest of the input", i, e);
                    break;
                }
            }
        }

        regions
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn into_schedule(self) -> RegionSchedule {
        RegionSchedule::new(self.regions)
    }
}

/// Regions waiting to be introduced, ordered by frame.
#[derive(Debug, Clone, Default)]
pub struct RegionSchedule {
    pending: VecDeque<Region>,
}

impl RegionSchedule {
    /// Schedule regions; entries sharing a frame keep their input order.
    pub fn new(mut regions: Vec<Region>) -> Self {
        regions.sort_by_key(|r| r.frame_index);
        Self {
            pending: regions.into(),
        }
    }

    /// Regions due at or before `frame_index`, without removing them.
    pub fn due(&self, frame_index: usize) -> impl Iterator<Item = &Region> {
        self.pending.iter().take_while(move |r| r.frame_index <= frame_index)
    }

    /// Every pending region in introduction order.
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.pending.iter()
    }

    /// Remove and return every region due at or before `frame_index`.
    ///
    /// Regions for frames already passed are still returned, with a warning.
    pub fn take_due(&mut self, frame_index: usize) -> Vec<Region> {
        let mut due = Vec::new();
        while self.pending.front().is_some_and(|r| r.frame_index <= frame_index) {
            if let Some(region) = self.pending.pop_front() {
                if region.frame_index < frame_index {
                    warn!(
                        "Region for frame {} introduced late at frame {}",
                        region.frame_index, frame_index
                    );
                }
                due.push(region);
            }
        }
        due
    }

    /// Regions not yet introduced.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_integer_and_decimal_tuples() {
        let regions = RegionFile::parse_str("50 50 20 40 0 0\n120.5 80 16 32 90 3\n");
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].center_x, 50.0);
        assert_eq!(regions[0].frame_index, 0);
        assert_eq!(regions[1].center_x, 120.5);
        assert_eq!(regions[1].angle_degrees, 90.0);
        assert_eq!(regions[1].frame_index, 3);
    }

    #[test]
    fn test_parse_stops_at_first_malformed_tuple() {
        let regions = RegionFile::parse_str("1 2 3 4 0 0\n5 6 x 8 0 1\n9 10 11 12 0 2");
        assert_eq!(regions.len(), 1);

        let regions = RegionFile::parse_str("1 2 3 4 0 0\n5 6 7 8 0");
        assert_eq!(regions.len(), 1);

        let regions = RegionFile::parse_str("1 2 0 4 0 0");
        assert!(regions.is_empty());

        let regions = RegionFile::parse_str("1 2 3 4 0 -1");
        assert!(regions.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(RegionFile::parse_str("").is_empty());
        assert!(RegionFile::parse_str("  \n\t ").is_empty());
    }

    #[test]
    fn test_image_row() {
        let region = Region::from_fields([10.0, 30.0, 4.0, 4.0, 0.0, 0.0]).unwrap();
        assert_eq!(region.image_row(100), 70.0);
    }

    #[test]
    fn test_schedule_take_due() {
        let regions = RegionFile::parse_str("1 1 2 2 0 3\n2 2 2 2 0 0\n3 3 2 2 0 3\n4 4 2 2 0 1");
        let mut schedule = RegionSchedule::new(regions);

        let due: Vec<f64> = schedule.take_due(0).iter().map(|r| r.center_x).collect();
        assert_eq!(due, vec![2.0]);
        assert!(schedule.take_due(0).is_empty());

        // Frame 1 was skipped; its region arrives late at frame 3 along with
        // both frame-3 entries in input order.
        let due: Vec<f64> = schedule.take_due(3).iter().map(|r| r.center_x).collect();
        assert_eq!(due, vec![4.0, 1.0, 3.0]);
        assert!(schedule.is_empty());
    }

    #[test]
    fn test_schedule_due_does_not_consume() {
        let regions = RegionFile::parse_str("1 1 2 2 0 0\n2 2 2 2 0 2");
        let mut schedule = RegionSchedule::new(regions);

        assert_eq!(schedule.due(1).count(), 1);
        assert_eq!(schedule.due(2).count(), 2);
        assert_eq!(schedule.remaining(), 2);
        assert_eq!(schedule.iter().count(), 2);

        assert_eq!(schedule.take_due(1).len(), 1);
        assert_eq!(schedule.due(1).count(), 0);
    }

    #[test]
    fn test_region_validity() {
        let mut region = Region::from_fields([10.0, 30.0, 4.0, 4.0, 0.0, 0.0]).unwrap();
        assert!(region.is_valid());
        region.height = 0.0;
        assert!(!region.is_valid());
        region.height = 4.0;
        region.center_x = f64::NAN;
        assert!(!region.is_valid());
    }

    #[test]
    fn test_region_file_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "50 50 20 40 0 0").unwrap();
        writeln!(file, "70 20 10 10 0 2").unwrap();
        file.flush().unwrap();

        let regions = RegionFile::new(file.path()).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions.into_schedule().remaining(), 2);
    }

    #[test]
    fn test_missing_region_file() {
        assert!(matches!(
            RegionFile::new("/nonexistent/regions.txt"),
            Err(Error::IoError(_))
        ));
    }
}
