// Cockpit configuration: embedded defaults plus an optional data-source override from localStorage.
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::error::ConfigError;
use crate::geometry::Vec3;
use crate::model::{DataBinding, GaugeConfig, Smoothing};

const EMBEDDED: &str = include_str!("../assets/cockpit.json");
pub const SOURCE_OVERRIDE_KEY: &str = "cockpit_source";
/// Fastest allowed backend poll.
pub const MIN_POLL_INTERVAL_MS: u32 = 250;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CockpitConfig {
    pub log_level: String,
    pub source: SourceSettings,
    pub controls: ControlTuning,
    pub gauges: Vec<GaugeConfig>,
}

impl Default for CockpitConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            source: SourceSettings::default(),
            controls: ControlTuning::default(),
            gauges: demo_gauges(),
        }
    }
}

/// REST backend settings. Without a url and key every gauge runs on its demo value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub poll_interval_ms: u32,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self { url: None, anon_key: None, poll_interval_ms: 5000 }
    }
}

impl SourceSettings {
    pub fn is_configured(&self) -> bool {
        let filled = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());
        filled(&self.url) && filled(&self.anon_key)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS || i32::try_from(self.poll_interval_ms).is_err() {
            return Err(ConfigError::PollInterval(self.poll_interval_ms));
        }
        Ok(())
    }
}

/// Gesture and animation tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlTuning {
    /// Radians of yaw/pitch per NDC unit of orbit.
    pub rotation_speed: f64,
    /// World units per NDC unit of gauge drag.
    pub drag_speed: f64,
    /// Distance change per wheel delta unit.
    pub zoom_speed: f64,
    /// Distance multiplier for the zoom buttons.
    pub zoom_step: f64,
    pub tap_window_ms: f64,
    pub drag_threshold: f64,
    pub overlay_offset_x: f64,
    pub overlay_offset_y: f64,
    pub smoothing: f64,
    pub needle_smoothing: f64,
    pub frame_independent_smoothing: bool,
    pub intro_animation: bool,
}

impl Default for ControlTuning {
    fn default() -> Self {
        Self {
            rotation_speed: 0.5,
            drag_speed: 5.0,
            zoom_speed: 0.01,
            zoom_step: 1.25,
            tap_window_ms: 300.0,
            drag_threshold: 0.005,
            overlay_offset_x: 60.0,
            overlay_offset_y: -30.0,
            smoothing: 0.1,
            needle_smoothing: 0.1,
            frame_independent_smoothing: false,
            intro_animation: true,
        }
    }
}

impl ControlTuning {
    pub fn smoothing(&self) -> Smoothing {
        Smoothing { value: self.smoothing, needle: self.needle_smoothing }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        let factor = |v: f64| v.is_finite() && v > 0.0 && v <= 1.0;
        if !positive(self.rotation_speed) {
            return Err(ConfigError::Tuning("rotation_speed"));
        }
        if !positive(self.drag_speed) {
            return Err(ConfigError::Tuning("drag_speed"));
        }
        if !positive(self.zoom_speed) {
            return Err(ConfigError::Tuning("zoom_speed"));
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 1.0) {
            return Err(ConfigError::Tuning("zoom_step"));
        }
        if !(self.tap_window_ms.is_finite() && self.tap_window_ms >= 0.0) {
            return Err(ConfigError::Tuning("tap_window_ms"));
        }
        if !(self.drag_threshold.is_finite() && self.drag_threshold >= 0.0) {
            return Err(ConfigError::Tuning("drag_threshold"));
        }
        if !factor(self.smoothing) {
            return Err(ConfigError::Tuning("smoothing"));
        }
        if !factor(self.needle_smoothing) {
            return Err(ConfigError::Tuning("needle_smoothing"));
        }
        Ok(())
    }
}

/// Partial source settings stored under [`SOURCE_OVERRIDE_KEY`].
#[derive(Debug, Default, Deserialize)]
struct SourceOverride {
    url: Option<String>,
    anon_key: Option<String>,
    poll_interval_ms: Option<u32>,
}

impl CockpitConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let cfg: CockpitConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// The configuration compiled into the binary, or the built-in defaults if it is unusable.
    pub fn embedded() -> Self {
        Self::from_json(EMBEDDED).unwrap_or_else(|err| {
            tracing::warn!("embedded configuration rejected ({err}); using defaults");
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.level_filter()?;
        self.source.validate()?;
        self.controls.validate()?;
        for gauge in &self.gauges {
            gauge.validate()?;
        }
        Ok(())
    }

    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level
            .parse::<LevelFilter>()
            .map_err(|_| ConfigError::LogLevel(self.log_level.clone()))
    }

    /// Replaces the source fields present in `raw`; the rest of the configuration is untouched.
    pub fn apply_source_override(&mut self, raw: &str) -> Result<(), ConfigError> {
        let o: SourceOverride = serde_json::from_str(raw)?;
        let mut source = self.source.clone();
        if let Some(url) = o.url {
            source.url = Some(url);
        }
        if let Some(key) = o.anon_key {
            source.anon_key = Some(key);
        }
        if let Some(ms) = o.poll_interval_ms {
            source.poll_interval_ms = ms;
        }
        source.validate()?;
        self.source = source;
        Ok(())
    }

    /// Embedded configuration with the browser's stored source override applied.
    pub fn load() -> Self {
        let mut cfg = Self::embedded();
        let stored = web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .and_then(|s| s.get_item(SOURCE_OVERRIDE_KEY).ok().flatten());
        if let Some(raw) = stored {
            if let Err(err) = cfg.apply_source_override(&raw) {
                tracing::warn!("ignoring stored {SOURCE_OVERRIDE_KEY}: {err}");
            }
        }
        cfg
    }
}

fn demo_gauge(label: &str, color: &str, max: f64, x: f64, y: f64, table: &str, field: &str, demo: f64) -> GaugeConfig {
    GaugeConfig {
        label: label.into(),
        color: color.into(),
        min: 0.0,
        max,
        binding: Some(DataBinding { table: table.into(), field: field.into() }),
        position: Vec3::new(x, y, 0.0),
        demo_value: Some(demo),
    }
}

/// The four-gauge dashboard shipped with the app.
pub fn demo_gauges() -> Vec<GaugeConfig> {
    vec![
        demo_gauge("Revenue", "#4cc9ff", 100_000.0, -1.5, 0.8, "metrics", "revenue", 42_000.0),
        demo_gauge("Active Users", "#7fff7f", 5_000.0, 1.5, 0.8, "metrics", "active_users", 1_234.0),
        demo_gauge("Conversion", "#ff7b54", 100.0, -1.5, -0.8, "metrics", "conversion_rate", 68.5),
        demo_gauge("Performance", "#ffd700", 100.0, 1.5, -0.8, "metrics", "performance_score", 92.3),
    ]
}
