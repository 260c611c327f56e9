// THEORY:
// The `color` module is the lowest layer of the tracker. A `Color` is a "dumb"
// immutable RGB triple, and the only question the rest of the system ever asks
// about two colors is "how far apart are they?"
//
// Key architectural principles:
// 1.  **Single Metric**: Similarity is the Euclidean distance between the two
//     colors in RGB channel space, normalized by the largest possible distance
//     (black to white) and scaled to 0..100. Every other module goes through
//     `distance` / `matches`; nobody compares channels by hand.
// 2.  **Fixed Acceptance**: A pixel is "the marker" when its distance to the target
//     is at most `MATCH_THRESHOLD` (15 on the 0..100 scale).
// 3.  **Interop**: `Color` converts to and from `image::Rgb<u8>` and from the packed
//     0xRRGGBB integer and the textual forms accepted on the command line.

use crate::error::TrackError;
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Acceptance threshold on the 0..100 distance scale.
pub const MATCH_THRESHOLD: f64 = 15.0;

/// Distance between black and white: sqrt(3 * 255^2).
pub const MAX_DISTANCE: f64 = 441.672_955_930_063_7;

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Unpacks a 0xRRGGBB integer. Bits above the low 24 are ignored.
    pub const fn from_packed(packed: u32) -> Self {
        Self {
            red: ((packed >> 16) & 0xff) as u8,
            green: ((packed >> 8) & 0xff) as u8,
            blue: (packed & 0xff) as u8,
        }
    }

    pub const fn packed(&self) -> u32 {
        ((self.red as u32) << 16) | ((self.green as u32) << 8) | self.blue as u32
    }
}

/// Normalized Euclidean distance between two colors, in [0, 100].
pub fn distance(a: Color, b: Color) -> f64 {
    let dr = a.red as f64 - b.red as f64;
    let dg = a.green as f64 - b.green as f64;
    let db = a.blue as f64 - b.blue as f64;
    (dr * dr + dg * dg + db * db).sqrt() / MAX_DISTANCE * 100.0
}

/// True when `a` is within `threshold` of `b` on the 0..100 scale.
pub fn matches_within(a: Color, b: Color, threshold: f64) -> bool {
    distance(a, b) <= threshold
}

/// True when `a` is within `MATCH_THRESHOLD` of `b`.
pub fn matches(a: Color, b: Color) -> bool {
    matches_within(a, b, MATCH_THRESHOLD)
}

impl From<Rgb<u8>> for Color {
    fn from(pixel: Rgb<u8>) -> Self {
        let [red, green, blue] = pixel.0;
        Self { red, green, blue }
    }
}

impl From<&Rgb<u8>> for Color {
    fn from(pixel: &Rgb<u8>) -> Self {
        Color::from(*pixel)
    }
}

impl From<Color> for Rgb<u8> {
    fn from(color: Color) -> Self {
        Rgb([color.red, color.green, color.blue])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

impl FromStr for Color {
    type Err = TrackError;

    /// Accepts `#rrggbb`, `rrggbb` or `r,g,b`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || TrackError::InvalidConfig(format!("cannot parse color `{s}`"));

        if s.contains(',') {
            let channels = s
                .split(',')
                .map(|part| part.trim().parse::<u8>().map_err(|_| invalid()))
                .collect::<Result<Vec<u8>, _>>()?;
            return match channels.as_slice() {
                [red, green, blue] => Ok(Color::new(*red, *green, *blue)),
                _ => Err(invalid()),
            };
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let packed = u32::from_str_radix(hex, 16).map_err(|_| invalid())?;
        Ok(Color::from_packed(packed))
    }
}

impl TryFrom<String> for Color {
    type Error = TrackError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn distance_to_self_is_zero() {
        for c in [Color::new(0, 0, 0), Color::new(12, 200, 7), Color::new(255, 255, 255)] {
            assert_eq!(distance(c, c), 0.0);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Color::new(10, 20, 30);
        let b = Color::new(200, 100, 0);
        assert_eq!(distance(a, b), distance(b, a));
    }

    #[test]
    fn black_to_white_is_one_hundred() {
        let d = distance(Color::new(0, 0, 0), Color::new(255, 255, 255));
        assert_relative_eq!(d, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn distance_stays_in_range() {
        let samples = [0u8, 1, 64, 128, 200, 255];
        for &r in &samples {
            for &g in &samples {
                let d = distance(Color::new(r, g, 0), Color::new(255 - r, 0, g));
                assert!((0.0..=100.0 + 1e-9).contains(&d), "distance {d} out of range");
            }
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        // 15% of the full range along a single channel is ~66.25 steps.
        let target = Color::new(100, 100, 100);
        assert!(matches(target, Color::new(166, 100, 100)));
        assert!(!matches(target, Color::new(167, 100, 100)));
    }

    #[test]
    fn packed_round_trip_keeps_channels() {
        let c = Color::from_packed(0x12ab34);
        assert_eq!(c, Color::new(0x12, 0xab, 0x34));
        assert_eq!(c.packed(), 0x12ab34);
        assert_eq!(Color::from_packed(0xff00_0000).packed(), 0);
    }

    #[test]
    fn parses_hex_and_triplets() {
        assert_eq!("#ff8000".parse::<Color>().unwrap(), Color::new(255, 128, 0));
        assert_eq!("00FF00".parse::<Color>().unwrap(), Color::new(0, 255, 0));
        assert_eq!(" 1, 2 ,3 ".parse::<Color>().unwrap(), Color::new(1, 2, 3));
        assert!("#ff80".parse::<Color>().is_err());
        assert!("256,0,0".parse::<Color>().is_err());
        assert!("1,2".parse::<Color>().is_err());
        assert!("zzzzzz".parse::<Color>().is_err());
    }

    #[test]
    fn displays_as_hex() {
        assert_eq!(Color::new(255, 0, 10).to_string(), "#ff000a");
    }
}
