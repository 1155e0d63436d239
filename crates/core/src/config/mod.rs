use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Direction, LoopOptions, MotionError, Result};

/// Top-level configuration structure for a motion-enabled surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub scroll: ScrollConfig,
    pub marquee: MarqueeConfig,
}

impl MotionConfig {
    /// The values the site ships with.
    pub fn site_defaults() -> Self {
        Self::default()
    }

    /// Parses a JSON document and validates the result.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        self.scroll.validate()?;
        self.marquee.validate()
    }
}

/// Options for the smooth-scroll interpolation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrollConfig {
    /// Fraction of the remaining distance closed per tick, in `(0, 1]`.
    pub lerp: f64,
    /// Ease wheel input instead of applying it instantly.
    pub smooth_wheel: bool,
    pub wheel_multiplier: f64,
    pub touch_multiplier: f64,
    /// Wrap the offset around the content extent instead of clamping.
    pub infinite: bool,
    /// Distance under which the virtual offset snaps onto the target.
    pub snap_epsilon: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            lerp: 0.05,
            smooth_wheel: true,
            wheel_multiplier: 1.0,
            touch_multiplier: 2.0,
            infinite: false,
            snap_epsilon: 0.01,
        }
    }
}

impl ScrollConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.lerp.is_finite() || self.lerp <= 0.0 || self.lerp > 1.0 {
            return Err(MotionError::configuration(format!(
                "lerp must be in (0, 1], got {}",
                self.lerp
            )));
        }
        non_negative("wheelMultiplier", self.wheel_multiplier)?;
        non_negative("touchMultiplier", self.touch_multiplier)?;
        non_negative("snapEpsilon", self.snap_epsilon)
    }
}

/// Options for the looping marquee strips started on a surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarqueeConfig {
    pub duration_seconds: f64,
    pub direction: Direction,
    /// Translation, in percent of the strip width, covered by one cycle.
    pub shift_percent: f64,
}

impl Default for MarqueeConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 20.0,
            direction: Direction::Forward,
            shift_percent: 50.0,
        }
    }
}

impl MarqueeConfig {
    pub fn validate(&self) -> Result<()> {
        self.loop_options().validate()
    }

    pub fn loop_options(&self) -> LoopOptions {
        LoopOptions {
            duration_seconds: self.duration_seconds,
            direction: self.direction,
            shift_percent: self.shift_percent,
        }
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(MotionError::configuration(format!(
            "{name} must be a finite value >= 0, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_site_behaviour() {
        let config = MotionConfig::site_defaults();
        assert_eq!(config.scroll.lerp, 0.05);
        assert!(config.scroll.smooth_wheel);
        assert_eq!(config.scroll.wheel_multiplier, 1.0);
        assert_eq!(config.scroll.touch_multiplier, 2.0);
        assert!(!config.scroll.infinite);
        assert_eq!(config.marquee.duration_seconds, 20.0);
        assert_eq!(config.marquee.direction, Direction::Forward);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_camel_case_json_with_partial_fields() {
        let config = MotionConfig::from_json_str(
            r#"{
                "scroll": { "lerp": 0.1, "smoothWheel": false, "touchMultiplier": 1.5 },
                "marquee": { "durationSeconds": 8, "direction": "right" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.scroll.lerp, 0.1);
        assert!(!config.scroll.smooth_wheel);
        assert_eq!(config.scroll.touch_multiplier, 1.5);
        assert_eq!(config.scroll.wheel_multiplier, 1.0);
        assert_eq!(config.marquee.duration_seconds, 8.0);
        assert_eq!(config.marquee.direction, Direction::Reverse);
        assert_eq!(config.marquee.shift_percent, 50.0);
    }

    #[test]
    fn rejects_lerp_outside_unit_interval() {
        for lerp in [0.0, -0.2, 1.5, f64::NAN] {
            let mut config = MotionConfig::default();
            config.scroll.lerp = lerp;
            let err = config.validate().unwrap_err();
            assert!(matches!(err, MotionError::Configuration(_)), "lerp {lerp}");
        }

        let mut config = MotionConfig::default();
        config.scroll.lerp = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_negative_multipliers_and_durations() {
        let mut config = MotionConfig::default();
        config.scroll.touch_multiplier = -1.0;
        assert!(config.validate().is_err());

        let mut config = MotionConfig::default();
        config.marquee.duration_seconds = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_configuration_from_file() {
        let path = std::env::temp_dir().join(format!(
            "portfolio-motion-config-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"{ "scroll": { "lerp": 0.2, "infinite": true }, "marquee": { "durationSeconds": 5 } }"#,
        )
        .unwrap();

        let loaded = MotionConfig::load(&path);
        std::fs::remove_file(&path).unwrap();

        let config = loaded.unwrap();
        assert_eq!(config.scroll.lerp, 0.2);
        assert!(config.scroll.infinite);
        assert_eq!(config.marquee.duration_seconds, 5.0);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("portfolio-motion-config-does-not-exist.json");
        let err = MotionConfig::load(path).unwrap_err();
        assert!(matches!(err, MotionError::Io(_)));
    }

    #[test]
    fn invalid_documents_surface_json_errors() {
        let err = MotionConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, MotionError::Json(_)));

        let err = MotionConfig::from_json_str(r#"{ "scroll": { "lerp": 2 } }"#).unwrap_err();
        assert!(matches!(err, MotionError::Configuration(_)));
    }
}
