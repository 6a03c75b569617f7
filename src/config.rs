use crate::types::{Config, ControllerConfig, DetectorConfig};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive and finite, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must lie in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f32 },
    #[error("controller.timer_period {value} s is not a representable duration")]
    PeriodOutOfRange { value: f64 },
    #[error("goal.frame_id must not be empty")]
    EmptyFrameId,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.controller.validate()?;
        self.detector.validate()?;
        if self.goal.frame_id.trim().is_empty() {
            return Err(ConfigError::EmptyFrameId);
        }
        Ok(())
    }
}

impl ControllerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        positive("controller.timer_period", self.timer_period)?;
        positive("controller.width_side", self.width_side)?;
        positive("controller.width_front", self.width_front)?;
        positive("controller.focal_length", self.focal_length)?;
        self.period()?;
        Ok(())
    }

    /// Tick period as a `Duration`, never shorter than 1 ms.
    pub fn period(&self) -> Result<Duration, ConfigError> {
        positive("controller.timer_period", self.timer_period)?;
        let period = Duration::try_from_secs_f64(self.timer_period).map_err(|_| {
            ConfigError::PeriodOutOfRange {
                value: self.timer_period,
            }
        })?;
        Ok(period.max(Duration::from_millis(1)))
    }
}

impl DetectorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        unit_range("detector.prob_threshold", self.prob_threshold)?;
        unit_range("detector.nms_threshold", self.nms_threshold)?;
        positive("detector.target_size", self.target_size as f64)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn unit_range(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_original_parameters() {
        let config = Config::default();
        assert_eq!(config.controller.timer_period, 0.05);
        assert_eq!(config.controller.width_side, 68.0);
        assert_eq!(config.controller.width_front, 95.0);
        assert_eq!(config.controller.focal_length, 3.15);
        assert_eq!(config.detector.prob_threshold, 0.25);
        assert_eq!(config.detector.nms_threshold, 0.45);
        assert_eq!(config.goal.frame_id, "map");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "controller:\n  timer_period: 0.1\ngoal:\n  frame_id: odom").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.controller.timer_period, 0.1);
        assert_eq!(config.controller.width_front, 95.0);
        assert_eq!(config.goal.frame_id, "odom");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_rejects_non_positive_focal_length() {
        let mut config = Config::default();
        config.controller.focal_length = 0.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "controller.focal_length",
                value: 0.0
            })
        );
    }

    #[test]
    fn test_huge_period_is_rejected_not_a_panic() {
        let mut config = Config::default();
        config.controller.timer_period = 1e300;
        assert_eq!(
            config.validate(),
            Err(ConfigError::PeriodOutOfRange { value: 1e300 })
        );
    }

    #[test]
    fn test_period_is_clamped_to_one_millisecond() {
        let mut config = Config::default();
        assert_eq!(config.controller.period(), Ok(Duration::from_millis(50)));
        config.controller.timer_period = 1e-6;
        assert_eq!(config.controller.period(), Ok(Duration::from_millis(1)));
    }

    #[test]
    fn test_rejects_threshold_outside_unit_range() {
        let mut config = Config::default();
        config.detector.nms_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfUnitRange { .. })
        ));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = Config::load("/nonexistent/approach.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
