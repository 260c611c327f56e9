// THEORY:
// The `annotator` is the output stage. Once a frame's position is known it marks
// the frame in place: a small circle on the marker, a square around it, and the
// marker's instantaneous speed as text above the square.
//
// Key architectural principles:
// 1.  **Pure Frame Mutation**: Annotation reads the track and the config and writes
//     only into the frame's pixel buffer. It keeps no state between calls, so frames
//     can be annotated in any order once the track is complete.
// 2.  **Blended Overlay**: Marks are blended into the frame at `OVERLAY_OPACITY`
//     rather than painted opaquely. Annotating the same frame twice therefore darkens
//     the marks a second time: annotation is NOT idempotent, and callers must not
//     re-run it on frames that were already written.
// 3.  **Clipping**: Marks near the border are cut at the frame edge; nothing is drawn
//     outside the buffer.
//
// Speed is measured in track widths per second:
// `pixels moved / (1 / fps) / scale_ratio / track_width`, and 0 for the first frame.

use crate::config::TrackingConfig;
use crate::core_modules::color::Color;
use crate::core_modules::frame::Frame;
use crate::core_modules::glyphs::{self, GLYPH_HEIGHT};
use crate::core_modules::position::Position;
use image::Rgb;
use std::collections::BTreeSet;
use tracing::warn;

pub const OVERLAY_COLOR: Color = Color::new(255, 0, 0);
pub const OVERLAY_OPACITY: f32 = 0.6;
pub const MARKER_RADIUS: i32 = 5;
pub const BOX_SIDE: i32 = 50;
/// Offset from the marker to the label's baseline-left corner.
pub const LABEL_OFFSET: (i32, i32) = (-25, -40);

/// Instantaneous speed at `index` in track widths per second.
pub fn speed(track: &[Position], index: usize, config: &TrackingConfig) -> f64 {
    if index == 0 || index >= track.len() {
        return 0.0;
    }
    let distance = track[index].distance_to(&track[index - 1]);
    let time = 1.0 / config.fps;
    distance / time / config.scale_ratio / config.track_width
}

/// The text drawn next to the marker.
pub fn speed_label(speed: f64) -> String {
    format!("Speed: {}tw/s", speed.round() as i64)
}

/// Marks `frame` with the position and speed recorded at `track[index]`.
pub fn annotate(frame: &mut Frame, track: &[Position], index: usize, config: &TrackingConfig) {
    let Some(&at) = track.get(index) else {
        warn!(index, track_len = track.len(), "no tracked position to annotate");
        return;
    };

    let mut marks = BTreeSet::new();
    marks.extend(circle_points(at, MARKER_RADIUS));
    marks.extend(square_points(at, BOX_SIDE / 2));

    let label = speed_label(speed(track, index, config));
    let label_origin = Position::new(at.x + LABEL_OFFSET.0, at.y + LABEL_OFFSET.1 - GLYPH_HEIGHT);
    marks.extend(glyphs::text_points(&label, label_origin));

    let (width, height) = frame.dimensions();
    for (x, y) in marks {
        if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
            continue;
        }
        let pixel = frame.get_pixel_mut(x as u32, y as u32);
        *pixel = blend(*pixel, OVERLAY_COLOR, OVERLAY_OPACITY);
    }
}

fn blend(under: Rgb<u8>, over: Color, opacity: f32) -> Rgb<u8> {
    let mix = |u: u8, o: u8| (u as f32 * (1.0 - opacity) + o as f32 * opacity).round() as u8;
    Rgb([
        mix(under.0[0], over.red),
        mix(under.0[1], over.green),
        mix(under.0[2], over.blue),
    ])
}

/// Outline of a circle, sampled every degree.
fn circle_points(center: Position, radius: i32) -> Vec<(i32, i32)> {
    let r = radius as f64;
    (0..360)
        .map(|angle_deg| {
            let theta = (angle_deg as f64).to_radians();
            (
                center.x + (r * theta.cos()).round() as i32,
                center.y + (r * theta.sin()).round() as i32,
            )
        })
        .collect()
}

/// Outline of the square `[center - half, center + half]` on both axes.
fn square_points(center: Position, half: i32) -> Vec<(i32, i32)> {
    let (left, right) = (center.x - half, center.x + half);
    let (top, bottom) = (center.y - half, center.y + half);
    let mut points = Vec::with_capacity((8 * half) as usize);
    for x in left..=right {
        points.push((x, top));
        points.push((x, bottom));
    }
    for y in top + 1..bottom {
        points.push((left, y));
        points.push((right, y));
    }
    points
}
