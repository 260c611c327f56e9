// THEORY:
// The `pipeline` module is the top-level, sequential driving loop. It ties the
// layers together for one run over one sequence of frames:
//
//   prediction (`motion`) -> expanding search (`tracker`) -> record (`Track`)
//   -> mark the frame (`annotator`) -> next frame
//
// Frames are processed strictly in order because each search is centred on a
// prediction from the two previous positions. The first failure aborts the run
// and is reported with the frame index and the last known position. Frames that
// were already annotated (and, for a directory, already saved) stay that way;
// nothing is rolled back.

use crate::config::TrackingConfig;
use crate::core_modules::annotator;
use crate::core_modules::frame::Frame;
use crate::core_modules::position::Position;
use crate::core_modules::track::Track;
use crate::core_modules::tracker::{Located, PointTracker};
use crate::error::TrackError;
use crate::frame_store::FrameDirectory;
use tracing::{debug, info};

/// Sequential track-and-annotate driver for a single run.
pub struct TrackingPipeline {
    config: TrackingConfig,
    tracker: PointTracker,
}

impl TrackingPipeline {
    pub fn new(config: TrackingConfig) -> Result<Self, TrackError> {
        config.validate()?;
        Ok(Self {
            tracker: PointTracker::new(config.target_color),
            config,
        })
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Positions recorded so far.
    pub fn track(&self) -> &Track {
        self.tracker.track()
    }

    pub fn into_track(self) -> Track {
        self.tracker.into_track()
    }

    /// Tracks the marker in the next frame of the sequence and annotates it in place.
    pub fn process_frame(&mut self, frame: &mut Frame) -> Result<Located, TrackError> {
        let frame_index = self.tracker.track().len();
        let predicted = self.tracker.predicted_next();

        let located = self.tracker.observe(frame).map_err(|e| TrackError::SearchExhausted {
            frame_index,
            iterations: e.iterations,
            last_known: self.tracker.track().last(),
            last_centroid: e.last_centroid,
        })?;

        debug!(
            frame_index,
            x = located.position.x,
            y = located.position.y,
            predicted = ?predicted,
            iterations = located.iterations,
            "tracked frame"
        );

        annotator::annotate(frame, self.tracker.track().positions(), frame_index, &self.config);
        Ok(located)
    }

    /// Runs the whole in-memory sequence, annotating each frame in place.
    pub fn track_sequence(mut self, frames: &mut [Frame]) -> Result<Track, TrackError> {
        if frames.is_empty() {
            return Err(TrackError::InvalidConfig("frame sequence is empty".to_string()));
        }
        info!(frames = frames.len(), target_color = %self.config.target_color, "tracking sequence");

        for frame in frames.iter_mut() {
            self.process_frame(frame)?;
        }
        Ok(self.into_track())
    }

    /// Loads, tracks, annotates and saves every frame of `frames` in order.
    ///
    /// `on_frame` is called after each frame is written back.
    pub fn run_directory<F>(mut self, frames: &FrameDirectory, mut on_frame: F) -> Result<Track, TrackError>
    where
        F: FnMut(usize, Position),
    {
        if frames.is_empty() {
            return Err(TrackError::InvalidConfig("frame sequence is empty".to_string()));
        }
        info!(
            frames = frames.len(),
            root = %frames.root().display(),
            target_color = %self.config.target_color,
            "tracking frame directory"
        );

        for index in 0..frames.len() {
            let mut frame = frames.load(index)?;
            let located = self.process_frame(&mut frame)?;
            frames.save(index, &frame)?;
            on_frame(index, located.position);
        }
        Ok(self.into_track())
    }
}

/// Convenience wrapper: tracks and annotates `frames` with `config`.
pub fn track_sequence(config: &TrackingConfig, frames: &mut [Frame]) -> Result<Track, TrackError> {
    TrackingPipeline::new(*config)?.track_sequence(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color::Color;
    use crate::core_modules::frame::filled;
    use image::Rgb;

    const BACKGROUND: Color = Color::new(10, 10, 10);
    const MARKER: Color = Color::new(0, 255, 0);

    fn moving_marker(frames: usize) -> Vec<Frame> {
        (0..frames)
            .map(|i| {
                let mut frame = filled(200, 200, BACKGROUND);
                frame.put_pixel(100 + 3 * i as u32, 120 - 2 * i as u32, Rgb::from(MARKER));
                frame
            })
            .collect()
    }

    #[test]
    fn rejects_empty_sequence() {
        let err = track_sequence(&TrackingConfig::new(MARKER), &mut []).unwrap_err();
        assert!(matches!(err, TrackError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_invalid_config_before_running() {
        let mut config = TrackingConfig::new(MARKER);
        config.fps = -1.0;
        assert!(TrackingPipeline::new(config).is_err());
    }

    #[test]
    fn records_one_position_per_frame() {
        let mut frames = moving_marker(6);
        let track = track_sequence(&TrackingConfig::new(MARKER), &mut frames).unwrap();
        let expected: Vec<Position> = (0..6).map(|i| Position::new(100 + 3 * i, 120 - 2 * i)).collect();
        assert_eq!(track.positions(), expected.as_slice());
    }

    #[test]
    fn annotates_frames_in_place() {
        let mut frames = moving_marker(3);
        let pristine = frames.clone();
        track_sequence(&TrackingConfig::new(MARKER), &mut frames).unwrap();
        for (annotated, original) in frames.iter().zip(&pristine) {
            assert_ne!(annotated, original);
        }
    }

    #[test]
    fn failure_reports_frame_and_keeps_earlier_annotations() {
        let mut frames = moving_marker(4);
        frames[2] = filled(200, 200, BACKGROUND);
        let pristine = frames.clone();

        let err = track_sequence(&TrackingConfig::new(MARKER), &mut frames).unwrap_err();
        match err {
            TrackError::SearchExhausted {
                frame_index,
                iterations,
                last_known,
                last_centroid,
            } => {
                assert_eq!(frame_index, 2);
                assert_eq!(iterations, 20);
                assert_eq!(last_known, Some(Position::new(103, 118)));
                assert_eq!(last_centroid, None);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_ne!(frames[0], pristine[0]);
        assert_ne!(frames[1], pristine[1]);
        assert_eq!(frames[2], pristine[2]);
        assert_eq!(frames[3], pristine[3]);
    }

    #[test]
    fn failure_carries_partial_match_of_largest_window() {
        // (100,100) then (40,100) predicts (-20,100); the last window spans x in [0, 180).
        let mut frames: Vec<Frame> = [(100, 100), (40, 100), (175, 100)]
            .into_iter()
            .map(|(x, y)| {
                let mut frame = filled(200, 200, BACKGROUND);
                frame.put_pixel(x, y, Rgb::from(MARKER));
                frame
            })
            .collect();

        let err = track_sequence(&TrackingConfig::new(MARKER), &mut frames).unwrap_err();
        match err {
            TrackError::SearchExhausted {
                frame_index,
                last_known,
                last_centroid,
                ..
            } => {
                assert_eq!(frame_index, 2);
                assert_eq!(last_known, Some(Position::new(40, 100)));
                assert_eq!(last_centroid, Some(Position::new(175, 100)));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn pipeline_exposes_partial_track() {
        let mut frames = moving_marker(2);
        let mut pipeline = TrackingPipeline::new(TrackingConfig::new(MARKER)).unwrap();
        pipeline.process_frame(&mut frames[0]).unwrap();
        assert_eq!(pipeline.track().len(), 1);
        pipeline.process_frame(&mut frames[1]).unwrap();
        assert_eq!(pipeline.track().last(), Some(Position::new(103, 118)));
    }
}
