//! Easing curves and sequenced tweens for the cockpit intro.

use std::f64::consts::{PI, TAU};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Easing {
    /// Cubic ease-in ("power2.in").
    Power2In,
    /// Cubic ease-out ("power2.out").
    Power2Out,
    Power2InOut,
    ElasticOut { amplitude: f64, period: f64 },
}

impl Easing {
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Easing::Power2In => t * t * t,
            Easing::Power2Out => {
                let u = 1.0 - t;
                1.0 - u * u * u
            }
            Easing::Power2InOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * u / 2.0
                }
            }
            Easing::ElasticOut { amplitude, period } => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                let a = amplitude.max(1.0);
                let p = period.max(1e-3);
                let shift = p / TAU * (1.0 / a).asin();
                a * 2f64.powf(-10.0 * t) * ((t - shift) * TAU / p).sin() + 1.0
            }
        }
    }
}

/// One eased segment from `from` to `to` over `duration_ms`.
#[derive(Clone, Debug, PartialEq)]
pub struct Tween {
    pub from: f64,
    pub to: f64,
    pub duration_ms: f64,
    pub easing: Easing,
}

impl Tween {
    pub fn new(from: f64, to: f64, duration_ms: f64, easing: Easing) -> Self {
        Self { from, to, duration_ms, easing }
    }

    pub fn value_at(&self, elapsed_ms: f64) -> f64 {
        let progress = if self.duration_ms > 0.0 { elapsed_ms / self.duration_ms } else { 1.0 };
        self.from + (self.to - self.from) * self.easing.apply(progress)
    }
}

/// Tweens played back to back; each segment starts where the previous one ended.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    segments: Vec<Tween>,
}

impl Timeline {
    pub fn starting_at(value: f64) -> TimelineBuilder {
        TimelineBuilder { current: value, segments: Vec::new() }
    }

    pub fn duration_ms(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_ms).sum()
    }

    pub fn value_at(&self, elapsed_ms: f64) -> Option<f64> {
        let mut offset = 0.0;
        for segment in &self.segments {
            if elapsed_ms < offset + segment.duration_ms {
                return Some(segment.value_at((elapsed_ms - offset).max(0.0)));
            }
            offset += segment.duration_ms;
        }
        self.segments.last().map(|s| s.to)
    }
}

pub struct TimelineBuilder {
    current: f64,
    segments: Vec<Tween>,
}

impl TimelineBuilder {
    pub fn to(mut self, value: f64, duration_ms: f64, easing: Easing) -> Self {
        self.segments.push(Tween::new(self.current, value, duration_ms, easing));
        self.current = value;
        self
    }

    pub fn build(self) -> Timeline {
        Timeline { segments: self.segments }
    }
}

pub const GLOW_REST: f64 = 0.5;
pub const GLOW_PEAK: f64 = 2.0;
pub const INTRO_STAGGER_MS: f64 = 200.0;

const NEEDLE_SPIN_MS: f64 = 800.0;
const NEEDLE_SETTLE_MS: f64 = 1200.0;

/// Needle spin-up and glow flash played once per gauge when the cockpit opens.
///
/// The needle timeline is built when the delay runs out, starting from
/// wherever the needle points at that moment.
#[derive(Clone, Debug, PartialEq)]
pub struct IntroAnimation {
    delay_ms: f64,
    elapsed_ms: f64,
    rest_angle: f64,
    needle: Option<Timeline>,
    glow: Timeline,
}

impl IntroAnimation {
    /// `rest_angle` is the needle angle the spin settles back to.
    pub fn spin_up(rest_angle: f64, delay_ms: f64) -> Self {
        let glow = Timeline::starting_at(GLOW_REST)
            .to(GLOW_PEAK, 500.0, Easing::Power2Out)
            .to(GLOW_REST, 1000.0, Easing::Power2InOut)
            .build();
        Self { delay_ms, elapsed_ms: 0.0, rest_angle, needle: None, glow }
    }

    /// Advances the clock. `current_angle` seeds the spin on the frame the delay expires.
    pub fn update(&mut self, dt_ms: f64, current_angle: f64) {
        self.elapsed_ms += dt_ms.max(0.0);
        if self.needle.is_none() && self.local_ms().is_some() {
            self.needle = Some(
                Timeline::starting_at(current_angle)
                    .to(2.0 * PI, NEEDLE_SPIN_MS, Easing::Power2In)
                    .to(self.rest_angle, NEEDLE_SETTLE_MS, Easing::ElasticOut { amplitude: 1.0, period: 0.3 })
                    .build(),
            );
        }
    }

    fn local_ms(&self) -> Option<f64> {
        let local = self.elapsed_ms - self.delay_ms;
        (local >= 0.0).then_some(local)
    }

    /// Needle angle driven by the spin, `None` before the delay has passed.
    pub fn needle_angle(&self) -> Option<f64> {
        let t = self.local_ms()?;
        self.needle.as_ref()?.value_at(t)
    }

    pub fn glow(&self) -> f64 {
        self.local_ms().and_then(|t| self.glow.value_at(t)).unwrap_or(GLOW_REST)
    }

    pub fn is_finished(&self) -> bool {
        let total = (NEEDLE_SPIN_MS + NEEDLE_SETTLE_MS).max(self.glow.duration_ms());
        self.local_ms().is_some_and(|t| t >= total)
    }
}
