// THEORY:
// The `tracker` module is the heart of the system. It turns a stateless window
// scan (`point_search`) and a stateless extrapolation (`motion`) into an object
// that follows one marker through time.
//
// Key architectural principles:
// 1.  **Expanding Window**: `locate` starts with a small window around the predicted
//     position and grows it linearly, one twentieth of the frame per side per
//     iteration, until the answer stops changing. A good prediction finishes in two
//     small scans; a bad one degrades gracefully towards a full-frame scan.
// 2.  **Fixed-Point Exit**: The search stops when two consecutive windows produce the
//     same centroid from a non-empty match set. Growing the window further no longer
//     changes the answer, so the match set has saturated. A window that already
//     covers the whole frame is saturated by construction and is accepted as soon as
//     it matches. An empty window never counts as an answer.
// 3.  **Bounded Cost**: After `MAX_ITERATIONS` windows without a fixed point the search
//     gives up with `SearchExhausted`. Nothing is retried automatically.
// 4.  **Memory**: `PointTracker` owns the append-only track. It consults only the
//     last two positions for its prediction and never looks ahead.

use crate::core_modules::color::Color;
use crate::core_modules::frame::Frame;
use crate::core_modules::motion;
use crate::core_modules::point_search::{self, SearchWindow, WindowResult};
use crate::core_modules::position::Position;
use crate::core_modules::track::Track;
use thiserror::Error;
use tracing::{debug, trace};

/// Upper bound on the number of windows tried for one frame.
pub const MAX_ITERATIONS: u32 = 20;
/// Each iteration grows the half extents by `dimension / WINDOW_DIVISIONS` pixels,
/// rounded up so the last window always reaches every edge from inside the frame.
pub const WINDOW_DIVISIONS: u32 = 20;

/// A successful search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub position: Position,
    /// Number of windows scanned, including the confirming one.
    pub iterations: u32,
    /// Number of matching pixels in the accepted window.
    pub match_count: u64,
}

/// The window reached its size cap without the centroid settling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("point not found in frame after {iterations} search windows")]
pub struct SearchExhausted {
    pub iterations: u32,
    /// Centroid of the largest window, if it matched anything.
    pub last_centroid: Option<Position>,
}

/// Finds `target` in `frame`, searching outwards from `predicted`.
///
/// Without a prediction the search is centred on the image origin.
pub fn locate(target: Color, frame: &Frame, predicted: Option<Position>) -> Result<Located, SearchExhausted> {
    let center = predicted.unwrap_or(Position::ORIGIN);
    let (width, height) = frame.dimensions();
    let step_x = width.div_ceil(WINDOW_DIVISIONS).max(1);
    let step_y = height.div_ceil(WINDOW_DIVISIONS).max(1);
    let full = SearchWindow::full(frame);

    let mut previous: Option<Position> = None;
    for k in 1..=MAX_ITERATIONS {
        let window = SearchWindow::around(
            center,
            step_x.saturating_mul(k),
            step_y.saturating_mul(k),
            width,
            height,
        );
        let result = point_search::search(frame, &window, target);
        trace!(iteration = k, ?window, ?result, "search window");

        match result {
            WindowResult::Matched { centroid, match_count }
                if previous == Some(centroid) || window == full =>
            {
                debug!(iteration = k, x = centroid.x, y = centroid.y, match_count, "point located");
                return Ok(Located {
                    position: centroid,
                    iterations: k,
                    match_count,
                });
            }
            _ => previous = result.centroid(),
        }
    }

    Err(SearchExhausted {
        iterations: MAX_ITERATIONS,
        last_centroid: previous,
    })
}

/// Follows one marker across consecutive frames.
#[derive(Debug, Clone)]
pub struct PointTracker {
    target: Color,
    track: Track,
}

impl PointTracker {
    pub fn new(target: Color) -> Self {
        Self {
            target,
            track: Track::new(),
        }
    }

    pub fn with_capacity(target: Color, frames: usize) -> Self {
        Self {
            target,
            track: Track::with_capacity(frames),
        }
    }

    /// Where the marker is expected in the next frame.
    pub fn predicted_next(&self) -> Option<Position> {
        motion::predict_next(self.track.positions())
    }

    /// Locates the marker in the next frame and appends it to the track.
    ///
    /// On failure the track is left unchanged.
    pub fn observe(&mut self, frame: &Frame) -> Result<Located, SearchExhausted> {
        let located = locate(self.target, frame, self.predicted_next())?;
        self.track.push(located.position);
        Ok(located)
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn into_track(self) -> Track {
        self.track
    }
}
