use crate::core_modules::position::Position;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a tracking run.
#[derive(Debug, Error)]
pub enum TrackError {
    /// The expanding window hit its cap without the centroid settling.
    #[error(
        "point not found in frame {frame_index} after {iterations} search windows \
         (last known position: {}, largest window centroid: {})",
        describe(.last_known),
        describe(.last_centroid)
    )]
    SearchExhausted {
        frame_index: usize,
        iterations: u32,
        /// Position tracked in the previous frame.
        last_known: Option<Position>,
        /// Centroid of the largest window scanned in the failing frame, if any pixel matched.
        last_centroid: Option<Position>,
    },

    #[error("invalid tracking config: {0}")]
    InvalidConfig(String),

    #[error("failed to read or write frame {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("annotation worker failed: {0}")]
    Worker(String),
}

fn describe(position: &Option<Position>) -> String {
    match position {
        Some(p) => format!("({}, {})", p.x, p.y),
        None => "none".to_string(),
    }
}

impl TrackError {
    /// Index of the frame the run stopped at, when the failure belongs to one frame.
    pub fn frame_index(&self) -> Option<usize> {
        match self {
            TrackError::SearchExhausted { frame_index, .. } => Some(*frame_index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_exhausted_names_frame_and_last_position() {
        let err = TrackError::SearchExhausted {
            frame_index: 7,
            iterations: 20,
            last_known: Some(Position::new(3, 4)),
            last_centroid: None,
        };
        let text = err.to_string();
        assert!(text.contains("frame 7"));
        assert!(text.contains("20 search windows"));
        assert!(text.contains("last known position: (3, 4)"));
        assert!(text.contains("largest window centroid: none"));
        assert_eq!(err.frame_index(), Some(7));
    }

    #[test]
    fn config_errors_have_no_frame() {
        assert_eq!(TrackError::InvalidConfig("x".into()).frame_index(), None);
    }
}
