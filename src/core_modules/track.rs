use crate::config::TrackingConfig;
use crate::core_modules::annotator;
use crate::core_modules::position::Position;
use crate::error::TrackError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::ops::Index;
use std::path::Path;

/// The tracked marker positions, one per processed frame, in frame order.
///
/// Append-only: `positions[i]` exists once frame `i` has been processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    positions: Vec<Position>,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(frames: usize) -> Self {
        Self {
            positions: Vec::with_capacity(frames),
        }
    }

    pub fn push(&mut self, position: Position) {
        self.positions.push(position);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn last(&self) -> Option<Position> {
        self.positions.last().copied()
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Per-frame speed in track widths per second; the first entry is 0.
    pub fn speeds(&self, config: &TrackingConfig) -> Vec<f64> {
        (0..self.len())
            .map(|i| annotator::speed(&self.positions, i, config))
            .collect()
    }

    /// Writes the track as JSON for downstream analysis.
    pub fn write_json(&self, path: &Path) -> Result<(), TrackError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| TrackError::Io(std::io::Error::other(e)))?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self, TrackError> {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(|e| TrackError::Io(std::io::Error::other(e)))
    }
}

impl Index<usize> for Track {
    type Output = Position;

    fn index(&self, index: usize) -> &Self::Output {
        &self.positions[index]
    }
}

impl From<Vec<Position>> for Track {
    fn from(positions: Vec<Position>) -> Self {
        Self { positions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color::Color;
    use approx::assert_relative_eq;

    #[test]
    fn json_side_artifact_lists_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.json");
        let track = Track::from(vec![Position::new(1, 2), Position::new(3, 4)]);

        track.write_json(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"positions\""));
        assert_eq!(Track::read_json(&path).unwrap(), track);
    }

    #[test]
    fn speeds_start_at_zero() {
        let config = TrackingConfig {
            target_color: Color::new(255, 0, 0),
            scale_ratio: 1.0,
            track_width: 1.0,
            fps: 10.0,
        };
        let track = Track::from(vec![Position::new(0, 0), Position::new(3, 4), Position::new(3, 4)]);
        let speeds = track.speeds(&config);
        assert_eq!(speeds.len(), 3);
        assert_eq!(speeds[0], 0.0);
        assert_relative_eq!(speeds[1], 50.0, epsilon = 1e-9);
        assert_eq!(speeds[2], 0.0);
    }
}
