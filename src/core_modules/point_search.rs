// THEORY:
// The `point_search` module answers one question: "inside this rectangle, where
// is the marker?" It is a stateless scan, the spatial counterpart of the
// `tracker`'s temporal loop.
//
// Key architectural principles:
// 1.  **Bounded Work**: The scan only visits pixels inside a `SearchWindow`, a
//     half-open rectangle that is always clamped to the frame. Its cost is the
//     window's area, which is why the tracker shrinks the window around a
//     predicted position instead of scanning whole frames.
// 2.  **Centroid Aggregation**: Every pixel that matches the target color votes
//     with its coordinates; the answer is the integer-truncated mean of all votes.
//     This is the same center-of-mass reduction a blob detector performs, without
//     needing the blob's shape.
// 3.  **Explicit Emptiness**: A window with zero matches is `WindowResult::Degenerate`,
//     never a fake (0,0) centroid, so a marker that really sits at the image origin
//     stays distinguishable from "nothing found".

use crate::core_modules::color::{self, Color};
use crate::core_modules::frame::Frame;
use crate::core_modules::position::Position;
use std::ops::Range;

/// A half-open pixel rectangle `[x.start, x.end) x [y.start, y.end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchWindow {
    pub x: Range<u32>,
    pub y: Range<u32>,
}

impl SearchWindow {
    pub fn new(x: Range<u32>, y: Range<u32>) -> Self {
        Self { x, y }
    }

    /// The whole frame.
    pub fn full(frame: &Frame) -> Self {
        Self {
            x: 0..frame.width(),
            y: 0..frame.height(),
        }
    }

    /// A window of the given half extents around `center`, with every edge
    /// clamped to `[0, width]` x `[0, height]`.
    pub fn around(center: Position, half_width: u32, half_height: u32, width: u32, height: u32) -> Self {
        Self {
            x: clamped_span(center.x, half_width, width),
            y: clamped_span(center.y, half_height, height),
        }
    }

    /// Number of pixels covered by the window.
    pub fn area(&self) -> u64 {
        let w = self.x.end.saturating_sub(self.x.start) as u64;
        let h = self.y.end.saturating_sub(self.y.start) as u64;
        w * h
    }

    /// Restricts the window to the frame bounds.
    fn clipped_to(&self, frame: &Frame) -> Self {
        let x_end = self.x.end.min(frame.width());
        let y_end = self.y.end.min(frame.height());
        Self {
            x: self.x.start.min(x_end)..x_end,
            y: self.y.start.min(y_end)..y_end,
        }
    }
}

fn clamped_span(center: i32, half: u32, limit: u32) -> Range<u32> {
    let center = center as i64;
    let half = half as i64;
    let limit = limit as i64;
    let lo = (center - half).clamp(0, limit);
    let hi = (center + half).clamp(0, limit);
    lo as u32..hi as u32
}

/// The outcome of scanning one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowResult {
    /// At least one pixel matched; `centroid` is their truncated mean.
    Matched { centroid: Position, match_count: u64 },
    /// No pixel in the window matched the target.
    Degenerate,
}

impl WindowResult {
    pub fn centroid(&self) -> Option<Position> {
        match self {
            WindowResult::Matched { centroid, .. } => Some(*centroid),
            WindowResult::Degenerate => None,
        }
    }

    /// The centroid, or (0,0) for an empty window.
    pub fn centroid_or_origin(&self) -> Position {
        self.centroid().unwrap_or(Position::ORIGIN)
    }

    pub fn match_count(&self) -> u64 {
        match self {
            WindowResult::Matched { match_count, .. } => *match_count,
            WindowResult::Degenerate => 0,
        }
    }
}

/// Scans `window` for pixels matching `target` and returns their centroid.
pub fn search(frame: &Frame, window: &SearchWindow, target: Color) -> WindowResult {
    let window = window.clipped_to(frame);
    let mut sum_x = 0u64;
    let mut sum_y = 0u64;
    let mut count = 0u64;

    for y in window.y.clone() {
        for x in window.x.clone() {
            if color::matches(Color::from(frame.get_pixel(x, y)), target) {
                sum_x += x as u64;
                sum_y += y as u64;
                count += 1;
            }
        }
    }

    if count == 0 {
        return WindowResult::Degenerate;
    }

    WindowResult::Matched {
        centroid: Position::new((sum_x / count) as i32, (sum_y / count) as i32),
        match_count: count,
    }
}
