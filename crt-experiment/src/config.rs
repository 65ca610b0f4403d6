use crate::error::ConfigError;
use crt_core::{Point, TargetLayout};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Session parameters. Fixed once the session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub field_width: u32,
    pub field_height: u32,
    pub home_radius: f32,
    pub target_radius: f32,
    /// Distance from home to each target center.
    pub ring_radius: f32,
    pub n_targets: usize,
    pub n_trials: usize,
    pub delay_min_s: f64,
    pub delay_max_s: f64,
    pub feedback_ms: u64,
    pub abort_ms: u64,
    pub coarse_tick_hz: f64,
    pub fine_tick_hz: f64,
    pub output: PathBuf,
    pub summary_path: Option<PathBuf>,
    pub seed: Option<u64>,
    pub font_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            field_width: 1280,
            field_height: 1280,
            home_radius: 50.0,
            target_radius: 50.0,
            ring_radius: 500.0,
            n_targets: 16,
            n_trials: 20,
            delay_min_s: 1.0,
            delay_max_s: 4.0,
            feedback_ms: 1000,
            abort_ms: 1000,
            coarse_tick_hz: 60.0,
            fine_tick_hz: 1000.0,
            output: PathBuf::from("results.csv"),
            summary_path: None,
            seed: None,
            font_path: None,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field_width == 0 || self.field_height == 0 {
            return Err(ConfigError::invalid("field_width", "field must be non-empty"));
        }
        for (field, value) in [
            ("home_radius", self.home_radius),
            ("target_radius", self.target_radius),
            ("ring_radius", self.ring_radius),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::invalid(field, format!("must be positive, got {value}")));
            }
        }
        if self.n_targets == 0 {
            return Err(ConfigError::invalid("n_targets", "need at least one target"));
        }
        if self.n_trials == 0 {
            return Err(ConfigError::invalid("n_trials", "need at least one trial"));
        }
        if !(self.delay_min_s.is_finite() && self.delay_min_s >= 0.0) {
            return Err(ConfigError::invalid(
                "delay_min_s",
                format!("must be non-negative, got {}", self.delay_min_s),
            ));
        }
        if !(self.delay_max_s.is_finite() && self.delay_max_s >= self.delay_min_s) {
            return Err(ConfigError::invalid(
                "delay_max_s",
                format!(
                    "must be at least delay_min_s ({}), got {}",
                    self.delay_min_s, self.delay_max_s
                ),
            ));
        }
        for (field, value) in [
            ("coarse_tick_hz", self.coarse_tick_hz),
            ("fine_tick_hz", self.fine_tick_hz),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::invalid(field, format!("must be positive, got {value}")));
            }
        }
        let half_field = self.field_width.min(self.field_height) as f32 / 2.0;
        if self.ring_radius + self.target_radius > half_field {
            return Err(ConfigError::invalid(
                "ring_radius",
                format!(
                    "targets extend past the field edge ({} + {} > {half_field})",
                    self.ring_radius, self.target_radius
                ),
            ));
        }
        Ok(())
    }

    pub fn home(&self) -> Point {
        Point::new(
            (self.field_width / 2) as f32,
            (self.field_height / 2) as f32,
        )
    }

    pub fn layout(&self) -> TargetLayout {
        TargetLayout::new(
            self.home(),
            self.home_radius,
            self.target_radius,
            self.ring_radius,
            self.n_targets,
        )
    }

    pub fn delay_range_s(&self) -> RangeInclusive<f64> {
        self.delay_min_s..=self.delay_max_s
    }

    pub fn feedback_dwell(&self) -> Duration {
        Duration::from_millis(self.feedback_ms)
    }

    pub fn abort_dwell(&self) -> Duration {
        Duration::from_millis(self.abort_ms)
    }
}
