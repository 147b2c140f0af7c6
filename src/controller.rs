//! Applies classified gestures to the cockpit.
//!
//! The controller owns the gauges, the camera and the pointer classifier. The
//! web layer keeps it behind an `Rc<RefCell<_>>` and borrows it per event.

use std::collections::HashMap;

use crate::config::ControlTuning;
use crate::geometry::{NdcPoint, ScreenPoint, Viewport};
use crate::model::{Fixture, Gauge, GaugeConfig, GaugeId, GaugeSnapshot};
use crate::overlay::{OverlayContent, OverlayPresenter, SelectionOverlay};
use crate::render::CockpitScene;
use crate::state::{
    CameraState, ClassifierUpdate, Gesture, GestureMode, HitTester, PartRegistry, PointerClassifier,
    PointerInput,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionEvent {
    Tap(GaugeId),
    /// Second tap on the same gauge inside the tap window.
    Expand(GaugeId),
}

/// Last tap time per gauge.
#[derive(Debug, Default)]
pub struct TapTracker {
    last: HashMap<GaugeId, f64>,
}

impl TapTracker {
    /// Records a tap and reports whether it completes a double tap.
    pub fn register(&mut self, id: GaugeId, now_ms: f64, window_ms: f64) -> bool {
        let previous = self.last.insert(id, now_ms);
        previous.is_some_and(|t| now_ms - t < window_ms)
    }
}

/// Borrowed view used by the classifier to hit test at session start.
struct SceneView<'a> {
    camera: &'a CameraState,
    gauges: &'a [Gauge],
    parts: &'a PartRegistry,
    aspect: f64,
}

impl HitTester for SceneView<'_> {
    fn hit_test(&self, p: NdcPoint) -> Option<GaugeId> {
        let ray = self.camera.ray_from_ndc(p, self.aspect);
        self.parts.pick(&ray, |id| self.gauges.get(id.0).map(|g| g.position))
    }
}

pub struct InteractionController {
    gauges: Vec<Gauge>,
    fixtures: Vec<Fixture>,
    parts: PartRegistry,
    camera: CameraState,
    classifier: PointerClassifier,
    taps: TapTracker,
    overlay: SelectionOverlay,
    presenter: Box<dyn OverlayPresenter>,
    tuning: ControlTuning,
    viewport: Viewport,
    mode: GestureMode,
    expanded: Option<GaugeId>,
}

impl InteractionController {
    pub fn new(tuning: ControlTuning, presenter: Box<dyn OverlayPresenter>) -> Self {
        Self {
            gauges: Vec::new(),
            fixtures: Vec::new(),
            parts: PartRegistry::default(),
            camera: CameraState::default(),
            classifier: PointerClassifier::new(tuning.drag_threshold),
            taps: TapTracker::default(),
            overlay: SelectionOverlay::default(),
            presenter,
            tuning,
            viewport: Viewport::default(),
            mode: GestureMode::None,
            expanded: None,
        }
    }

    pub fn register_gauge(&mut self, config: GaugeConfig) -> GaugeId {
        let id = GaugeId(self.gauges.len());
        tracing::debug!("registering gauge {} as {:?}", config.label, id);
        self.gauges.push(Gauge::new(id, config));
        self.parts.add_gauge(id);
        id
    }

    /// Adds a pickable decoration. Hits on it resolve to no gauge.
    pub fn register_fixture(&mut self, fixture: Fixture) {
        self.parts.add_fixture(&fixture);
        self.fixtures.push(fixture);
    }

    #[cfg(test)]
    pub fn gauges(&self) -> &[Gauge] {
        &self.gauges
    }

    pub fn gauge(&self, id: GaugeId) -> Option<&Gauge> {
        self.gauges.get(id.0)
    }

    pub fn snapshot(&self, id: GaugeId) -> Option<GaugeSnapshot> {
        self.gauge(id).map(Gauge::snapshot)
    }

    #[cfg(test)]
    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    /// Gesture of the live pointer session, as last reported by the classifier.
    pub fn mode(&self) -> GestureMode {
        self.mode
    }

    pub fn selected(&self) -> Option<GaugeId> {
        self.overlay.gauge()
    }

    pub fn expanded(&self) -> Option<GaugeId> {
        self.expanded
    }

    pub fn scene(&self) -> CockpitScene<'_> {
        CockpitScene {
            camera: &self.camera,
            gauges: &self.gauges,
            fixtures: &self.fixtures,
            selected: self.selected(),
        }
    }

    pub fn pointer_down(&mut self, input: &PointerInput) -> Vec<InteractionEvent> {
        let view = SceneView {
            camera: &self.camera,
            gauges: &self.gauges,
            parts: &self.parts,
            aspect: self.viewport.aspect(),
        };
        let update = self.classifier.pointer_down(input, &view);
        self.apply(update, input.timestamp_ms)
    }

    pub fn pointer_move(&mut self, input: &PointerInput) -> Vec<InteractionEvent> {
        let update = self.classifier.pointer_move(input);
        self.apply(update, input.timestamp_ms)
    }

    pub fn pointer_up(&mut self, input: &PointerInput) -> Vec<InteractionEvent> {
        let update = self.classifier.pointer_up(input);
        self.apply(update, input.timestamp_ms)
    }

    /// Wheel zoom. Independent of any pointer session.
    pub fn wheel(&mut self, delta_y: f64) {
        self.camera.zoom_by(delta_y, self.tuning.zoom_speed);
    }

    /// Button zoom: one step closer or further.
    pub fn zoom_step(&mut self, zoom_in: bool) {
        let step = self.tuning.zoom_step;
        self.camera.scale_distance(if zoom_in { 1.0 / step } else { step });
    }

    pub fn reset_camera(&mut self) {
        self.camera = CameraState { fov_y: self.camera.fov_y, ..CameraState::default() };
    }

    pub fn collapse(&mut self) {
        self.expanded = None;
    }

    /// Forwards a data-source reading to a gauge.
    pub fn set_value(&mut self, id: GaugeId, v: f64) {
        match self.gauges.get_mut(id.0) {
            Some(g) => g.set_value(v),
            None => tracing::warn!("set_value for unknown gauge {:?}", id),
        }
    }

    pub fn start_intro(&mut self) {
        if !self.tuning.intro_animation {
            return;
        }
        for (i, g) in self.gauges.iter_mut().enumerate() {
            g.start_intro(i);
        }
    }

    /// One frame of gauge animation and smoothing.
    pub fn advance_gauges(&mut self, elapsed_ms: f64) {
        let smoothing = self.tuning.smoothing();
        let timed = self.tuning.frame_independent_smoothing;
        for g in &mut self.gauges {
            g.animate(elapsed_ms);
            if timed {
                g.advance_for(smoothing, elapsed_ms);
            } else {
                g.advance(smoothing);
            }
        }
    }

    /// Per-frame bookkeeping: remembers the viewport and keeps the overlay on
    /// its gauge. A gauge behind the camera leaves the overlay where it was.
    pub fn on_frame(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        let Some(id) = self.overlay.gauge() else {
            return;
        };
        let (Some(pos), Some(snapshot)) = (self.overlay_anchor(id), self.snapshot(id)) else {
            return;
        };
        self.overlay.follow(OverlayContent::from_snapshot(&snapshot), pos, self.presenter.as_mut());
    }

    fn overlay_anchor(&self, id: GaugeId) -> Option<ScreenPoint> {
        let g = self.gauge(id)?;
        let p = self.camera.project_to_screen(g.position, self.viewport)?;
        Some(ScreenPoint {
            x: p.x + self.tuning.overlay_offset_x,
            y: p.y + self.tuning.overlay_offset_y,
        })
    }

    fn apply(&mut self, update: ClassifierUpdate, timestamp_ms: f64) -> Vec<InteractionEvent> {
        self.mode = update.mode;
        let delta = update.delta;
        let mut events = Vec::new();
        for gesture in update.gestures {
            match gesture {
                Gesture::Select(id) => self.select(id),
                Gesture::Orbit => {
                    if let Some(d) = delta {
                        self.camera.orbit(d.dx, d.dy, self.tuning.rotation_speed);
                    }
                }
                Gesture::Drag { target } => {
                    if let (Some(g), Some(d)) = (self.gauges.get_mut(target.0), delta) {
                        g.position.x += d.dx * self.tuning.drag_speed;
                        g.position.y += d.dy * self.tuning.drag_speed;
                    }
                }
                Gesture::PinchStart => tracing::debug!("pinch zoom started"),
                Gesture::Pinch { ratio } => self.camera.scale_distance(ratio),
                Gesture::Tap(id) => {
                    events.push(InteractionEvent::Tap(id));
                    if self.taps.register(id, timestamp_ms, self.tuning.tap_window_ms) {
                        self.expand(id);
                        events.push(InteractionEvent::Expand(id));
                    }
                }
                Gesture::Release { target } => self.release(target),
            }
        }
        events
    }

    fn select(&mut self, id: GaugeId) {
        let Some(g) = self.gauges.get_mut(id.0) else {
            return;
        };
        g.selected = true;
        let content = OverlayContent::from_snapshot(&g.snapshot());
        let pos = self.overlay_anchor(id).unwrap_or_default();
        self.overlay.show(id, content, pos, self.presenter.as_mut());
    }

    fn release(&mut self, target: Option<GaugeId>) {
        if let Some(g) = target.and_then(|id| self.gauges.get_mut(id.0)) {
            g.selected = false;
        }
        self.overlay.hide(self.presenter.as_mut());
    }

    fn expand(&mut self, id: GaugeId) {
        if self.expanded != Some(id) {
            tracing::info!("expanding gauge {:?}", id);
            self.expanded = Some(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::geometry::Vec3;
    use crate::model::cockpit_pipes;
    use crate::state::camera::{MAX_DISTANCE, MIN_DISTANCE, PITCH_LIMIT};

    /// Presenter whose call log stays readable after the controller takes ownership.
    #[derive(Clone, Default)]
    struct SharedPresenter(Rc<RefCell<Vec<String>>>);

    impl OverlayPresenter for SharedPresenter {
        fn show_overlay(&mut self, content: &OverlayContent, pos: ScreenPoint) {
            self.0.borrow_mut().push(format!("show {} {:.0},{:.0}", content.label, pos.x, pos.y));
        }
        fn update_overlay_position(&mut self, pos: ScreenPoint) {
            self.0.borrow_mut().push(format!("move {:.0},{:.0}", pos.x, pos.y));
        }
        fn hide_overlay(&mut self) {
            self.0.borrow_mut().push("hide".into());
        }
    }

    fn gauge_at(label: &str, x: f64, y: f64, z: f64) -> GaugeConfig {
        GaugeConfig {
            label: label.into(),
            color: "#4cc9ff".into(),
            min: 0.0,
            max: 100.0,
            binding: None,
            position: Vec3::new(x, y, z),
            demo_value: None,
        }
    }

    fn controller() -> (InteractionController, Rc<RefCell<Vec<String>>>) {
        let presenter = SharedPresenter::default();
        let log = presenter.0.clone();
        let mut c = InteractionController::new(ControlTuning::default(), Box::new(presenter));
        c.on_frame(Viewport::new(800.0, 800.0));
        (c, log)
    }

    fn at(x: f64, y: f64, t: f64) -> PointerInput {
        PointerInput::single(NdcPoint::new(x, y), t)
    }

    fn tap(c: &mut InteractionController, t: f64) -> Vec<InteractionEvent> {
        let mut events = c.pointer_down(&at(0.0, 0.0, t));
        events.extend(c.pointer_up(&PointerInput::released(t + 50.0)));
        events
    }

    #[test]
    fn test_tap_then_double_tap_expands() {
        let (mut c, _) = controller();
        let id = c.register_gauge(gauge_at("Revenue", 0.0, 0.0, 0.0));
        assert_eq!(tap(&mut c, 0.0), vec![InteractionEvent::Tap(id)]);
        assert_eq!(
            tap(&mut c, 200.0),
            vec![InteractionEvent::Tap(id), InteractionEvent::Expand(id)]
        );
        assert_eq!(c.expanded(), Some(id));
        c.collapse();
        assert_eq!(c.expanded(), None);
    }

    #[test]
    fn test_double_tap_while_expanded_still_reports_expand() {
        let (mut c, _) = controller();
        let id = c.register_gauge(gauge_at("Revenue", 0.0, 0.0, 0.0));
        let expand = vec![InteractionEvent::Tap(id), InteractionEvent::Expand(id)];
        tap(&mut c, 0.0);
        assert_eq!(tap(&mut c, 200.0), expand);
        assert_eq!(tap(&mut c, 2000.0), vec![InteractionEvent::Tap(id)]);
        assert_eq!(tap(&mut c, 2200.0), expand);
        assert_eq!(c.expanded(), Some(id));
    }

    #[test]
    fn test_slow_taps_do_not_expand() {
        let (mut c, _) = controller();
        let id = c.register_gauge(gauge_at("Revenue", 0.0, 0.0, 0.0));
        tap(&mut c, 0.0);
        assert_eq!(tap(&mut c, 1000.0), vec![InteractionEvent::Tap(id)]);
        assert_eq!(c.expanded(), None);
    }

    #[test]
    fn test_tap_tracker_is_per_gauge() {
        let mut t = TapTracker::default();
        assert!(!t.register(GaugeId(0), 0.0, 300.0));
        assert!(!t.register(GaugeId(1), 100.0, 300.0));
        assert!(t.register(GaugeId(0), 250.0, 300.0));
        assert!(!t.register(GaugeId(0), 550.0, 300.0));
    }

    #[test]
    fn test_drag_moves_gauge_and_suppresses_tap() {
        let (mut c, log) = controller();
        let id = c.register_gauge(gauge_at("Revenue", 0.0, 0.0, 0.0));
        c.pointer_down(&at(0.0, 0.0, 0.0));
        assert_eq!(c.selected(), Some(id));
        assert!(c.gauge(id).unwrap().selected);
        assert_eq!(c.mode(), GestureMode::DragGauge);
        c.pointer_move(&at(0.1, 0.0, 16.0));
        let events = c.pointer_up(&PointerInput::released(32.0));
        assert!(events.is_empty());
        let g = c.gauge(id).unwrap();
        assert!((g.position.x - 0.5).abs() < 1e-9);
        assert_eq!(g.position.y, 0.0);
        assert!(!g.selected);
        assert_eq!(c.selected(), None);
        assert_eq!(c.camera(), &CameraState::default());
        let log = log.borrow();
        assert!(log[0].starts_with("show Revenue 460,370"));
        assert_eq!(log.last().map(String::as_str), Some("hide"));
    }

    #[test]
    fn test_orbit_on_empty_space() {
        let (mut c, log) = controller();
        c.register_gauge(gauge_at("Revenue", 0.0, 0.0, 0.0));
        c.pointer_down(&at(0.8, 0.8, 0.0));
        assert_eq!(c.mode(), GestureMode::CameraOrbit);
        for i in 0..100 {
            c.pointer_move(&at(0.8, 0.8 + (i as f64) * 0.1, i as f64));
        }
        assert_eq!(c.camera().pitch, -PITCH_LIMIT);
        c.pointer_up(&PointerInput::released(200.0));
        assert!(!log.borrow().iter().any(|l| l.starts_with("show")));
    }

    #[test]
    fn test_pinch_clears_target_and_zooms_within_limits() {
        let (mut c, _) = controller();
        let id = c.register_gauge(gauge_at("Revenue", 0.0, 0.0, 0.0));
        c.pointer_down(&at(0.0, 0.0, 0.0));
        let two = |d: f64| PointerInput::new(vec![NdcPoint::new(-d, 0.0), NdcPoint::new(d, 0.0)], 0.0);
        c.pointer_down(&two(0.1));
        assert_eq!(c.mode(), GestureMode::PinchZoom);
        assert_eq!(c.selected(), None);
        assert!(!c.gauge(id).unwrap().selected);
        c.pointer_move(&two(0.2));
        assert!((c.camera().distance - 2.5).abs() < 1e-9);
        for i in 1..50 {
            c.pointer_move(&two(0.2 + i as f64 * 0.1));
        }
        assert_eq!(c.camera().distance, MIN_DISTANCE);
        for i in (1..50).rev() {
            c.pointer_move(&two(i as f64 * 0.01));
        }
        assert_eq!(c.camera().distance, MAX_DISTANCE);
        let events = c.pointer_up(&PointerInput::released(10.0));
        assert!(events.is_empty());
    }

    #[test]
    fn test_wheel_and_buttons_stay_clamped() {
        let (mut c, _) = controller();
        c.wheel(100.0);
        assert!((c.camera().distance - 6.0).abs() < 1e-9);
        c.wheel(10_000.0);
        assert_eq!(c.camera().distance, MAX_DISTANCE);
        for _ in 0..20 {
            c.zoom_step(true);
        }
        assert_eq!(c.camera().distance, MIN_DISTANCE);
        c.reset_camera();
        assert_eq!(c.camera(), &CameraState::default());
    }

    #[test]
    fn test_nearest_gauge_is_selected() {
        let (mut c, _) = controller();
        let near = c.register_gauge(gauge_at("Near", 0.0, 0.0, 1.0));
        c.register_gauge(gauge_at("Far", 0.0, 0.0, -1.0));
        c.pointer_down(&at(0.0, 0.0, 0.0));
        assert_eq!(c.selected(), Some(near));
    }

    #[test]
    fn test_fixture_hit_resolves_to_no_gauge() {
        let (mut c, _) = controller();
        for pipe in cockpit_pipes() {
            c.register_fixture(pipe);
        }
        c.register_gauge(gauge_at("Behind", 2.0, 0.0, -2.0));
        // the ray crosses the first pipe before reaching the gauge
        let (x, y, _) = c.camera().project_to_ndc(Vec3::new(1.5, 0.0, -1.0), 1.0).unwrap();
        c.pointer_down(&at(x, y, 0.0));
        assert_eq!(c.selected(), None);
        assert_eq!(c.mode(), GestureMode::CameraOrbit);
    }

    #[test]
    fn test_overlay_follows_selected_gauge() {
        let (mut c, log) = controller();
        c.register_gauge(gauge_at("Revenue", 0.0, 0.0, 0.0));
        c.pointer_down(&at(0.0, 0.0, 0.0));
        c.on_frame(Viewport::new(800.0, 800.0));
        c.reset_camera();
        c.wheel(500.0);
        c.on_frame(Viewport::new(400.0, 400.0));
        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1], "move 260,170");
    }

    #[test]
    fn test_set_value_ignores_unknown_gauge() {
        let (mut c, _) = controller();
        let id = c.register_gauge(gauge_at("Revenue", 0.0, 0.0, 0.0));
        c.set_value(GaugeId(7), 50.0);
        c.set_value(id, 150.0);
        assert_eq!(c.gauge(id).unwrap().target(), 100.0);
        for _ in 0..300 {
            c.advance_gauges(16.0);
        }
        assert!((c.gauge(id).unwrap().value() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_intro_respects_tuning() {
        let presenter = SharedPresenter::default();
        let tuning = ControlTuning { intro_animation: false, ..ControlTuning::default() };
        let mut c = InteractionController::new(tuning, Box::new(presenter));
        let id = c.register_gauge(gauge_at("Revenue", 0.0, 0.0, 0.0));
        let rest = c.gauge(id).unwrap().needle_angle();
        c.start_intro();
        c.advance_gauges(400.0);
        assert!((c.gauge(id).unwrap().needle_angle() - rest).abs() < 1e-9);
    }
}
