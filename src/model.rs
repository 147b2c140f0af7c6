//! Core data models for the gauge cockpit.
//! A gauge owns its displayed value, the target the data source asked for,
//! and the derived needle angle that the renderer draws.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::animation::{GLOW_REST, INTRO_STAGGER_MS, IntroAnimation};
use crate::error::ConfigError;
use crate::geometry::Vec3;

/// Needle angle at the bottom of the range.
pub const NEEDLE_START: f64 = -1.25 * PI;
/// Angular sweep of the dial (270°).
pub const NEEDLE_SWEEP: f64 = 1.5 * PI;
/// Frame length the per-tick smoothing factors were tuned for.
pub const REFERENCE_FRAME_MS: f64 = 1000.0 / 60.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GaugeId(pub usize);

/// Table/field a gauge reads its value from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBinding {
    pub table: String,
    pub field: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaugeConfig {
    pub label: String,
    /// CSS colour used for ticks, needle tip and glow.
    pub color: String,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub binding: Option<DataBinding>,
    #[serde(default)]
    pub position: Vec3,
    /// Value shown when no data source is bound.
    #[serde(default)]
    pub demo_value: Option<f64>,
}

impl GaugeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(ConfigError::InvalidRange {
                label: self.label.clone(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    pub fn clamp(&self, v: f64) -> f64 {
        v.max(self.min).min(self.max)
    }

    /// Position of `v` within the range, 0 at `min` and 1 at `max`.
    pub fn normalize(&self, v: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 { 0.0 } else { ((v - self.min) / span).clamp(0.0, 1.0) }
    }
}

/// Per-tick smoothing factors for the value and the needle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Smoothing {
    pub value: f64,
    pub needle: f64,
}

impl Smoothing {
    /// Rescales both factors so `elapsed_ms` of wall clock decays as much as
    /// the equivalent number of reference frames would.
    pub fn for_elapsed(self, elapsed_ms: f64) -> Smoothing {
        let frames = (elapsed_ms / REFERENCE_FRAME_MS).max(0.0);
        let rescale = |f: f64| 1.0 - (1.0 - f.clamp(0.0, 1.0)).powf(frames);
        Smoothing { value: rescale(self.value), needle: rescale(self.needle) }
    }
}

impl Default for Smoothing {
    fn default() -> Self {
        Self { value: 0.1, needle: 0.1 }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Gauge {
    pub id: GaugeId,
    pub config: GaugeConfig,
    /// World-space anchor; the drag gesture moves it in x/y.
    pub position: Vec3,
    pub selected: bool,
    value: f64,
    target: f64,
    previous_target: Option<f64>,
    needle_angle: f64,
    intro: Option<IntroAnimation>,
}

impl Gauge {
    pub fn new(id: GaugeId, config: GaugeConfig) -> Self {
        let start = config.clamp(0.0);
        Self {
            id,
            position: config.position,
            selected: false,
            value: start,
            target: start,
            previous_target: None,
            needle_angle: NEEDLE_START,
            intro: None,
            config,
        }
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    #[cfg(test)]
    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn needle_angle(&self) -> f64 {
        self.needle_angle
    }

    pub fn glow(&self) -> f64 {
        self.intro.as_ref().map(IntroAnimation::glow).unwrap_or(GLOW_REST)
    }

    /// Stores `v`, clamped to the gauge range, as the new target. Non-finite
    /// input is dropped and the previous target kept.
    pub fn set_value(&mut self, v: f64) {
        if !v.is_finite() {
            tracing::warn!("gauge {}: ignoring non-finite value {}", self.config.label, v);
            return;
        }
        let clamped = self.config.clamp(v);
        if clamped != self.target {
            self.previous_target = Some(self.target);
        }
        self.target = clamped;
    }

    /// Angle the needle should point at for the current value.
    pub fn value_angle(&self) -> f64 {
        NEEDLE_START + self.config.normalize(self.value) * NEEDLE_SWEEP
    }

    /// One rendered frame of smoothing. The factors are applied per call, so
    /// the settle speed follows the display refresh rate.
    pub fn advance(&mut self, smoothing: Smoothing) {
        self.value = self.config.clamp(approach(self.value, self.target, smoothing.value));
        if self.intro_angle().is_some() {
            return;
        }
        self.needle_angle = approach(self.needle_angle, self.value_angle(), smoothing.needle);
    }

    /// Wall-clock variant of [`Gauge::advance`].
    pub fn advance_for(&mut self, smoothing: Smoothing, elapsed_ms: f64) {
        self.advance(smoothing.for_elapsed(elapsed_ms));
    }

    pub fn start_intro(&mut self, index: usize) {
        self.intro = Some(IntroAnimation::spin_up(NEEDLE_START, index as f64 * INTRO_STAGGER_MS));
    }

    /// Steps the intro timeline; the needle follows it until it finishes.
    pub fn animate(&mut self, dt_ms: f64) {
        let Some(intro) = self.intro.as_mut() else {
            return;
        };
        intro.update(dt_ms, self.needle_angle);
        if let Some(angle) = intro.needle_angle() {
            self.needle_angle = angle;
        }
        if intro.is_finished() {
            self.intro = None;
        }
    }

    fn intro_angle(&self) -> Option<f64> {
        self.intro.as_ref().and_then(IntroAnimation::needle_angle)
    }

    /// Percent change between the previous and current target.
    pub fn trend_percent(&self) -> Option<f64> {
        let prev = self.previous_target?;
        if prev == 0.0 {
            return None;
        }
        Some((self.target - prev) / prev.abs() * 100.0)
    }

    pub fn snapshot(&self) -> GaugeSnapshot {
        GaugeSnapshot {
            id: self.id,
            label: self.config.label.clone(),
            color: self.config.color.clone(),
            min: self.config.min,
            max: self.config.max,
            value: self.value,
            target: self.target,
            trend_percent: self.trend_percent(),
        }
    }
}

/// Moves `current` a fraction `factor` of the way to `goal`, never past it.
fn approach(current: f64, goal: f64, factor: f64) -> f64 {
    let next = current + (goal - current) * factor.clamp(0.0, 1.0);
    if (goal - next) * (goal - current) < 0.0 { goal } else { next }
}

/// Read-only copy of a gauge for UI panels.
#[derive(Clone, Debug, PartialEq)]
pub struct GaugeSnapshot {
    pub id: GaugeId,
    pub label: String,
    pub color: String,
    pub min: f64,
    pub max: f64,
    pub value: f64,
    pub target: f64,
    pub trend_percent: Option<f64>,
}

/// Static cockpit decoration: a copper pipe drawn behind the gauges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fixture {
    pub start: Vec3,
    pub end: Vec3,
    pub radius: f64,
}

/// Six radial pipes around the dashboard, one unit behind the gauge plane.
pub fn cockpit_pipes() -> Vec<Fixture> {
    (0..6)
        .map(|i| {
            let angle = i as f64 / 6.0 * 2.0 * PI;
            let (s, c) = angle.sin_cos();
            Fixture {
                start: Vec3::new(c * 1.0, s * 1.0, -1.0),
                end: Vec3::new(c * 5.0, s * 5.0, -1.0),
                radius: 0.05,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min: f64, max: f64) -> GaugeConfig {
        GaugeConfig {
            label: "Conversion".into(),
            color: "#ff7b54".into(),
            min,
            max,
            binding: None,
            position: Vec3::ZERO,
            demo_value: None,
        }
    }

    #[test]
    fn test_set_value_clamps_into_range() {
        let mut g = Gauge::new(GaugeId(0), config(0.0, 100.0));
        for v in [-50.0, 0.0, 42.5, 100.0, 1e9, f64::MAX, -f64::MAX] {
            g.set_value(v);
            assert!(g.target() >= 0.0 && g.target() <= 100.0, "v={}", v);
        }
        g.set_value(250.0);
        assert_eq!(g.target(), 100.0);
    }

    #[test]
    fn test_non_finite_value_keeps_previous_target() {
        let mut g = Gauge::new(GaugeId(0), config(0.0, 100.0));
        g.set_value(30.0);
        g.set_value(f64::NAN);
        g.set_value(f64::INFINITY);
        assert_eq!(g.target(), 30.0);
    }

    #[test]
    fn test_initial_value_respects_range() {
        let g = Gauge::new(GaugeId(0), config(20.0, 80.0));
        assert_eq!(g.value(), 20.0);
        assert_eq!(g.target(), 20.0);
    }

    #[test]
    fn test_advance_converges_without_overshoot() {
        let mut g = Gauge::new(GaugeId(0), config(0.0, 100.0));
        g.set_value(68.5);
        let mut remaining = (g.target() - g.value()).abs();
        for _ in 0..400 {
            g.advance(Smoothing::default());
            let now = (g.target() - g.value()).abs();
            assert!(g.value() >= 0.0 && g.value() <= 68.5);
            if remaining > 1e-9 {
                assert!(now < remaining);
            }
            remaining = now;
        }
        assert!(remaining < 1e-9);
    }

    #[test]
    fn test_advance_downward_stays_within_segment() {
        let mut g = Gauge::new(GaugeId(0), config(0.0, 100.0));
        g.set_value(90.0);
        for _ in 0..300 {
            g.advance(Smoothing::default());
        }
        g.set_value(10.0);
        let start = g.value();
        for _ in 0..300 {
            g.advance(Smoothing::default());
            assert!(g.value() <= start && g.value() >= 10.0);
        }
    }

    #[test]
    fn test_needle_settles_on_value_angle() {
        let mut g = Gauge::new(GaugeId(0), config(0.0, 100.0));
        g.set_value(100.0);
        for _ in 0..600 {
            g.advance(Smoothing::default());
        }
        assert!((g.needle_angle() - (NEEDLE_START + NEEDLE_SWEEP)).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_range_points_needle_at_start() {
        let mut g = Gauge::new(GaugeId(0), config(5.0, 5.0));
        g.set_value(9.0);
        g.advance(Smoothing::default());
        assert_eq!(g.value(), 5.0);
        assert_eq!(g.value_angle(), NEEDLE_START);
    }

    #[test]
    fn test_time_corrected_matches_per_frame_at_reference_rate() {
        let mut per_frame = Gauge::new(GaugeId(0), config(0.0, 100.0));
        let mut timed = per_frame.clone();
        per_frame.set_value(50.0);
        timed.set_value(50.0);
        per_frame.advance(Smoothing::default());
        per_frame.advance(Smoothing::default());
        timed.advance_for(Smoothing::default(), 2.0 * REFERENCE_FRAME_MS);
        assert!((per_frame.value() - timed.value()).abs() < 1e-9);
    }

    #[test]
    fn test_intro_drives_needle_then_releases() {
        let mut g = Gauge::new(GaugeId(0), config(0.0, 100.0));
        g.start_intro(0);
        g.animate(400.0);
        assert!(g.needle_angle() > NEEDLE_START);
        g.advance(Smoothing::default());
        g.animate(5_000.0);
        assert!(g.glow() == GLOW_REST);
        g.set_value(50.0);
        for _ in 0..600 {
            g.advance(Smoothing::default());
        }
        assert!((g.needle_angle() - g.value_angle()).abs() < 1e-6);
    }

    #[test]
    fn test_staggered_intro_spins_from_where_the_needle_is() {
        let mut g = Gauge::new(GaugeId(0), config(0.0, 100.0));
        g.start_intro(3);
        g.set_value(100.0);
        for _ in 0..30 {
            g.animate(16.0);
            g.advance(Smoothing::default());
        }
        let before = g.needle_angle();
        assert!(before > NEEDLE_START + 0.1);
        g.animate(130.0);
        let after = g.needle_angle();
        assert!(after >= before && after - before < 0.01, "{} -> {}", before, after);
    }

    #[test]
    fn test_trend_percent() {
        let mut g = Gauge::new(GaugeId(0), config(0.0, 100.0));
        assert_eq!(g.trend_percent(), None);
        g.set_value(50.0);
        assert_eq!(g.trend_percent(), None);
        g.set_value(55.0);
        let trend = g.trend_percent().unwrap();
        assert!((trend - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_range_rejected() {
        assert!(config(10.0, 0.0).validate().is_err());
        assert!(config(f64::NAN, 1.0).validate().is_err());
        assert!(config(0.0, 1.0).validate().is_ok());
    }

    #[test]
    fn test_cockpit_pipes_are_radial() {
        let pipes = cockpit_pipes();
        assert_eq!(pipes.len(), 6);
        for p in pipes {
            assert!((p.start.x.hypot(p.start.y) - 1.0).abs() < 1e-9);
            assert!((p.end.x.hypot(p.end.y) - 5.0).abs() < 1e-9);
        }
    }
}
