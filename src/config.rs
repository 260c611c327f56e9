//! Run configuration for a tracking pass.
//!
//! A `TrackingConfig` is built once, validated, and then passed by reference into
//! the pipelines; nothing in the crate keeps process-wide tracking state.

use crate::core_modules::color::Color;
use crate::core_modules::position::Position;
use crate::error::TrackError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_SCALE_RATIO: f64 = 1.0;
pub const DEFAULT_TRACK_WIDTH: f64 = 1.0;
pub const DEFAULT_FPS: f64 = 30.0;

/// Everything a tracking run needs besides the frames themselves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Color of the marker being tracked.
    pub target_color: Color,
    /// Pixels per track-width unit.
    pub scale_ratio: f64,
    /// Number of track widths one reference length represents.
    pub track_width: f64,
    /// Frame rate of the source video.
    pub fps: f64,
}

impl TrackingConfig {
    pub fn new(target_color: Color) -> Self {
        Self {
            target_color,
            scale_ratio: DEFAULT_SCALE_RATIO,
            track_width: DEFAULT_TRACK_WIDTH,
            fps: DEFAULT_FPS,
        }
    }

    /// Rejects values that would make the speed computation meaningless.
    pub fn validate(&self) -> Result<(), TrackError> {
        for (name, value) in [
            ("scale_ratio", self.scale_ratio),
            ("track_width", self.track_width),
            ("fps", self.fps),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(TrackError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// On-disk layout: a single `[tracking]` table where every key is optional.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub tracking: PartialConfig,
}

/// A config under construction, as read from a file or the command line.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    pub target_color: Option<Color>,
    pub scale_ratio: Option<f64>,
    pub track_width: Option<f64>,
    pub fps: Option<f64>,
}

impl PartialConfig {
    /// Fields set in `overrides` win.
    pub fn merge(self, overrides: PartialConfig) -> PartialConfig {
        PartialConfig {
            target_color: overrides.target_color.or(self.target_color),
            scale_ratio: overrides.scale_ratio.or(self.scale_ratio),
            track_width: overrides.track_width.or(self.track_width),
            fps: overrides.fps.or(self.fps),
        }
    }

    /// Fills defaults and validates. The target color has no default.
    pub fn into_config(self) -> Result<TrackingConfig, TrackError> {
        let target_color = self
            .target_color
            .ok_or_else(|| TrackError::InvalidConfig("target color is not set".to_string()))?;
        let config = TrackingConfig {
            target_color,
            scale_ratio: self.scale_ratio.unwrap_or(DEFAULT_SCALE_RATIO),
            track_width: self.track_width.unwrap_or(DEFAULT_TRACK_WIDTH),
            fps: self.fps.unwrap_or(DEFAULT_FPS),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads the `[tracking]` table of a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TrackError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, TrackError> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| TrackError::InvalidConfig(e.to_string()))?;
        Ok(file.tracking)
    }
}

/// Pixel length of a reference segment whose ends are `a` and `b`.
pub fn scale_ratio_from_reference(a: Position, b: Position) -> f64 {
    a.distance_to(&b)
}

/// Parses a frame rate given as `num/den` (as ffprobe reports it) or as a decimal.
pub fn parse_frame_rate(text: &str) -> Result<f64, TrackError> {
    let invalid = || TrackError::InvalidConfig(format!("cannot parse frame rate `{text}`"));
    let text = text.trim();

    let fps = match text.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().map_err(|_| invalid())?;
            let den: f64 = den.trim().parse().map_err(|_| invalid())?;
            if den == 0.0 {
                return Err(invalid());
            }
            num / den
        }
        None => text.parse().map_err(|_| invalid())?,
    };

    if !fps.is_finite() || fps <= 0.0 {
        return Err(invalid());
    }
    Ok(fps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_follow_unit_scale() {
        let config = TrackingConfig::new(Color::new(1, 2, 3));
        assert_eq!(config.scale_ratio, 1.0);
        assert_eq!(config.track_width, 1.0);
        assert_eq!(config.fps, 30.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_values() {
        let mut config = TrackingConfig::new(Color::new(1, 2, 3));
        config.fps = 0.0;
        assert!(matches!(config.validate(), Err(TrackError::InvalidConfig(_))));
        config.fps = 30.0;
        config.scale_ratio = f64::NAN;
        assert!(config.validate().is_err());
        config.scale_ratio = 1.0;
        config.track_width = -2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_toml_with_defaults() {
        let config = PartialConfig::from_toml(
            r##"
            [tracking]
            target_color = "#ff0000"
            fps = 25.0
            "##,
        )
        .and_then(PartialConfig::into_config)
        .unwrap();
        assert_eq!(config.target_color, Color::new(255, 0, 0));
        assert_eq!(config.fps, 25.0);
        assert_eq!(config.scale_ratio, DEFAULT_SCALE_RATIO);
    }

    #[test]
    fn missing_target_color_is_invalid() {
        let err = PartialConfig::from_toml("[tracking]\nfps = 25.0\n")
            .and_then(PartialConfig::into_config)
            .unwrap_err();
        assert!(err.to_string().contains("target color is not set"));
    }

    #[test]
    fn bad_color_in_file_is_invalid() {
        assert!(PartialConfig::from_toml("[tracking]\ntarget_color = \"red\"\n").is_err());
    }

    #[test]
    fn reads_partial_table_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.toml");
        std::fs::write(&path, "[tracking]\nscale_ratio = 400.0\n").unwrap();

        let partial = PartialConfig::from_file(&path).unwrap();
        assert_eq!(partial.scale_ratio, Some(400.0));
        assert_eq!(partial.target_color, None);
    }

    #[test]
    fn overrides_win_over_file_values() {
        let file = PartialConfig {
            target_color: Some(Color::new(1, 1, 1)),
            fps: Some(24.0),
            ..Default::default()
        };
        let cli = PartialConfig {
            fps: Some(60.0),
            ..Default::default()
        };
        let config = file.merge(cli).into_config().unwrap();
        assert_eq!(config.target_color, Color::new(1, 1, 1));
        assert_eq!(config.fps, 60.0);
    }

    #[test]
    fn reference_segment_gives_pixel_length() {
        assert_eq!(scale_ratio_from_reference(Position::new(10, 10), Position::new(13, 14)), 5.0);
    }

    #[test]
    fn parses_rational_and_decimal_frame_rates() {
        assert_relative_eq!(parse_frame_rate("30000/1001").unwrap(), 29.970_029_97, epsilon = 1e-6);
        assert_eq!(parse_frame_rate("25/1").unwrap(), 25.0);
        assert_eq!(parse_frame_rate(" 60 ").unwrap(), 60.0);
        assert!(parse_frame_rate("30/0").is_err());
        assert!(parse_frame_rate("abc").is_err());
        assert!(parse_frame_rate("-5").is_err());
    }
}
