// THEORY:
// The `parallel_pipeline` restructures a run into two passes so the expensive
// part that CAN run concurrently does:
//
// 1.  **Forward pass** (sequential): every frame's search depends on the two previous
//     positions, so tracking runs in frame order on a single blocking task and
//     produces the complete `Track`. Frames are only read.
// 2.  **Annotation pass** (parallel): annotating frame `i` only reads `track[..=i]`,
//     which is final after pass 1. Frames are fanned out to a pool of blocking tasks
//     (one per CPU by default) and collected back in frame order.
//
// Unlike the sequential pipeline, a tracking failure here aborts before a single
// frame has been annotated or written.

use crate::config::TrackingConfig;
use crate::core_modules::annotator;
use crate::core_modules::color::Color;
use crate::core_modules::frame::Frame;
use crate::core_modules::track::Track;
use crate::core_modules::tracker::PointTracker;
use crate::error::TrackError;
use crate::frame_store::FrameDirectory;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::borrow::Borrow;
use std::sync::Arc;
use tokio::task::{self, JoinError};
use tracing::info;

/// Two-pass driver: sequential tracking, then concurrent annotation.
pub struct ParallelPipeline {
    config: TrackingConfig,
    workers: usize,
}

impl ParallelPipeline {
    pub fn new(config: TrackingConfig) -> Result<Self, TrackError> {
        config.validate()?;
        Ok(Self {
            config,
            workers: num_cpus::get().max(1),
        })
    }

    /// Caps the number of frames annotated at once.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Tracks `frames`, then annotates them concurrently. Output keeps input order.
    pub async fn process_frames(&self, frames: Vec<Frame>) -> Result<(Vec<Frame>, Track), TrackError> {
        if frames.is_empty() {
            return Err(TrackError::InvalidConfig("frame sequence is empty".to_string()));
        }
        info!(frames = frames.len(), workers = self.workers, "tracking sequence in two passes");

        let target = self.config.target_color;
        let (frames, track) = task::spawn_blocking(move || {
            let track = forward_pass(target, frames.len(), |i| Ok(&frames[i]));
            (frames, track)
        })
        .await
        .map_err(worker_error)?;
        let track = Arc::new(track?);

        let config = self.config;
        let annotated = stream::iter(frames.into_iter().enumerate())
            .map(|(index, mut frame)| {
                let track = Arc::clone(&track);
                task::spawn_blocking(move || {
                    annotator::annotate(&mut frame, track.positions(), index, &config);
                    frame
                })
            })
            .buffered(self.workers)
            .map(|joined| joined.map_err(worker_error))
            .try_collect::<Vec<Frame>>()
            .await?;

        let track = Arc::try_unwrap(track).unwrap_or_else(|shared| (*shared).clone());
        Ok((annotated, track))
    }

    /// Tracks every frame in `frames`, then loads, annotates and saves them concurrently.
    pub async fn run_directory(&self, frames: &FrameDirectory) -> Result<Track, TrackError> {
        if frames.is_empty() {
            return Err(TrackError::InvalidConfig("frame sequence is empty".to_string()));
        }
        info!(
            frames = frames.len(),
            root = %frames.root().display(),
            workers = self.workers,
            "tracking frame directory in two passes"
        );

        let target = self.config.target_color;
        let directory = Arc::new(frames.clone());
        let forward = Arc::clone(&directory);
        let track = task::spawn_blocking(move || forward_pass(target, forward.len(), |i| forward.load(i)))
            .await
            .map_err(worker_error)??;
        let track = Arc::new(track);

        let config = self.config;
        stream::iter(0..directory.len())
            .map(|index| {
                let track = Arc::clone(&track);
                let directory = Arc::clone(&directory);
                task::spawn_blocking(move || -> Result<(), TrackError> {
                    let mut frame = directory.load(index)?;
                    annotator::annotate(&mut frame, track.positions(), index, &config);
                    directory.save(index, &frame)
                })
            })
            .buffer_unordered(self.workers)
            .map(|joined| joined.map_err(worker_error).and_then(|saved| saved))
            .try_collect::<()>()
            .await?;

        Ok(Arc::try_unwrap(track).unwrap_or_else(|shared| (*shared).clone()))
    }
}

/// Tracks `len` frames supplied by `frame_at`, in order.
fn forward_pass<F, R>(target: Color, len: usize, mut frame_at: F) -> Result<Track, TrackError>
where
    F: FnMut(usize) -> Result<R, TrackError>,
    R: Borrow<Frame>,
{
    let mut tracker = PointTracker::with_capacity(target, len);
    for frame_index in 0..len {
        let frame = frame_at(frame_index)?;
        tracker.observe(frame.borrow()).map_err(|e| TrackError::SearchExhausted {
            frame_index,
            iterations: e.iterations,
            last_known: tracker.track().last(),
            last_centroid: e.last_centroid,
        })?;
    }
    Ok(tracker.into_track())
}

fn worker_error(err: JoinError) -> TrackError {
    TrackError::Worker(err.to_string())
}
