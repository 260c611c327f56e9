// THEORY:
// A `Frame` is a decoded video frame held as an `image::RgbImage`. The tracker
// reads it through `color_at` and the annotator writes into its pixel buffer;
// keeping the `image` crate's buffer as the frame type means decoding, encoding
// and drawing never need an intermediate copy.

use crate::core_modules::color::Color;
use image::RgbImage;

/// A single decoded frame of the sequence.
pub type Frame = RgbImage;

/// Returns the color at (x, y), or `None` outside the frame.
pub fn color_at(frame: &Frame, x: u32, y: u32) -> Option<Color> {
    frame.get_pixel_checked(x, y).map(Color::from)
}

/// Builds a frame filled with a single color.
pub fn filled(width: u32, height: u32, color: Color) -> Frame {
    RgbImage::from_pixel(width, height, color.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_at_is_bounds_checked() {
        let frame = filled(4, 3, Color::new(1, 2, 3));
        assert_eq!(color_at(&frame, 3, 2), Some(Color::new(1, 2, 3)));
        assert_eq!(color_at(&frame, 4, 0), None);
        assert_eq!(color_at(&frame, 0, 3), None);
    }
}
