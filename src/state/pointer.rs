//! Pointer session state machine.
//!
//! Touch and mouse input arrive as down/move/up events carrying the contacts
//! that are currently active. The classifier keeps a single session and turns
//! the stream into gestures:
//!
//! | state            | down (1)            | down (2)         | move (1)          | move (2)        | up (0 left)       |
//! |------------------|---------------------|------------------|-------------------|-----------------|-------------------|
//! | `Idle`           | hit test, track     | start pinch      | ignored           | ignored         | ignored           |
//! | `TrackingSingle` | release stale, track| release, pinch   | drag or orbit     | release, pinch  | tap?, release     |
//! | `TrackingPinch`  | ignored             | reset distance   | ignored           | zoom            | end pinch         |

use crate::geometry::NdcPoint;
use crate::model::GaugeId;

/// Contacts beyond this count are ignored.
pub const MAX_CONTACTS: usize = 2;

/// One raw input sample: the active contacts after the event, and when it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerInput {
    pub contacts: Vec<NdcPoint>,
    pub timestamp_ms: f64,
}

impl PointerInput {
    pub fn new(contacts: Vec<NdcPoint>, timestamp_ms: f64) -> Self {
        let mut contacts = contacts;
        contacts.truncate(MAX_CONTACTS);
        Self { contacts, timestamp_ms }
    }

    pub fn single(p: NdcPoint, timestamp_ms: f64) -> Self {
        Self::new(vec![p], timestamp_ms)
    }

    pub fn released(timestamp_ms: f64) -> Self {
        Self::new(Vec::new(), timestamp_ms)
    }

    fn count(&self) -> usize {
        self.contacts.len().min(MAX_CONTACTS)
    }
}

/// Resolves which gauge, if any, lies under a pointer position.
pub trait HitTester {
    fn hit_test(&self, p: NdcPoint) -> Option<GaugeId>;
}

impl<F> HitTester for F
where
    F: Fn(NdcPoint) -> Option<GaugeId>,
{
    fn hit_test(&self, p: NdcPoint) -> Option<GaugeId> {
        self(p)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerSession {
    Idle,
    TrackingSingle {
        start: NdcPoint,
        last: NdcPoint,
        target: Option<GaugeId>,
        dragged: bool,
    },
    TrackingPinch {
        previous_distance: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureMode {
    None,
    CameraOrbit,
    DragGauge,
    PinchZoom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delta {
    pub dx: f64,
    pub dy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    /// Session start hit a gauge.
    Select(GaugeId),
    /// Rotate the camera by the update's delta.
    Orbit,
    /// Move `target` by the update's delta.
    Drag { target: GaugeId },
    PinchStart,
    /// Camera distance multiplier (`previous / current` contact distance).
    Pinch { ratio: f64 },
    Tap(GaugeId),
    /// Session over; clear selection and overlay.
    Release { target: Option<GaugeId> },
}

/// Result of one input event: the session's mode afterwards, the movement
/// since the previous sample, and what happened.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierUpdate {
    pub mode: GestureMode,
    /// Set on single-contact moves.
    pub delta: Option<Delta>,
    pub gestures: Vec<Gesture>,
}

pub struct PointerClassifier {
    session: PointerSession,
    drag_threshold: f64,
}

impl PointerClassifier {
    pub fn new(drag_threshold: f64) -> Self {
        Self { session: PointerSession::Idle, drag_threshold: drag_threshold.max(0.0) }
    }

    #[cfg(test)]
    pub fn session(&self) -> &PointerSession {
        &self.session
    }

    pub fn mode(&self) -> GestureMode {
        match &self.session {
            PointerSession::Idle => GestureMode::None,
            PointerSession::TrackingSingle { target: Some(_), .. } => GestureMode::DragGauge,
            PointerSession::TrackingSingle { target: None, .. } => GestureMode::CameraOrbit,
            PointerSession::TrackingPinch { .. } => GestureMode::PinchZoom,
        }
    }

    pub fn pointer_down(&mut self, input: &PointerInput, hits: &dyn HitTester) -> ClassifierUpdate {
        let mut gestures = Vec::new();
        match input.count() {
            0 => {}
            1 => match self.session {
                PointerSession::TrackingPinch { .. } => {}
                _ => {
                    if let PointerSession::TrackingSingle { target, .. } = self.session {
                        // missed up event: drop the stale session without a tap
                        gestures.push(Gesture::Release { target });
                    }
                    let p = input.contacts[0];
                    let target = hits.hit_test(p);
                    if let Some(id) = target {
                        gestures.push(Gesture::Select(id));
                    }
                    self.session = PointerSession::TrackingSingle { start: p, last: p, target, dragged: false };
                }
            },
            _ => self.begin_pinch(input, &mut gestures),
        }
        self.update(None, gestures)
    }

    pub fn pointer_move(&mut self, input: &PointerInput) -> ClassifierUpdate {
        let mut gestures = Vec::new();
        let mut delta = None;
        match input.count() {
            0 => {}
            1 => {
                let threshold = self.drag_threshold;
                if let PointerSession::TrackingSingle { start, last, target, dragged } = &mut self.session {
                    let p = input.contacts[0];
                    let d = Delta { dx: p.x - last.x, dy: p.y - last.y };
                    *last = p;
                    delta = Some(d);
                    match *target {
                        Some(id) => {
                            if start.distance(p) > threshold {
                                *dragged = true;
                            }
                            gestures.push(Gesture::Drag { target: id });
                        }
                        None => gestures.push(Gesture::Orbit),
                    }
                }
            }
            _ => match &mut self.session {
                PointerSession::TrackingPinch { previous_distance } => {
                    let current = input.contacts[0].distance(input.contacts[1]);
                    if current > f64::EPSILON {
                        if *previous_distance > f64::EPSILON {
                            gestures.push(Gesture::Pinch { ratio: *previous_distance / current });
                        }
                        *previous_distance = current;
                    }
                }
                PointerSession::TrackingSingle { .. } => self.begin_pinch(input, &mut gestures),
                PointerSession::Idle => {}
            },
        }
        self.update(delta, gestures)
    }

    pub fn pointer_up(&mut self, input: &PointerInput) -> ClassifierUpdate {
        let mut gestures = Vec::new();
        if input.count() == 0 {
            match std::mem::replace(&mut self.session, PointerSession::Idle) {
                PointerSession::Idle => {}
                PointerSession::TrackingSingle { target, dragged, .. } => {
                    if let (Some(id), false) = (target, dragged) {
                        gestures.push(Gesture::Tap(id));
                    }
                    gestures.push(Gesture::Release { target });
                }
                PointerSession::TrackingPinch { .. } => gestures.push(Gesture::Release { target: None }),
            }
        }
        self.update(None, gestures)
    }

    fn begin_pinch(&mut self, input: &PointerInput, gestures: &mut Vec<Gesture>) {
        if let PointerSession::TrackingSingle { target, .. } = self.session {
            gestures.push(Gesture::Release { target });
        }
        let previous_distance = input.contacts[0].distance(input.contacts[1]);
        self.session = PointerSession::TrackingPinch { previous_distance };
        gestures.push(Gesture::PinchStart);
    }

    fn update(&self, delta: Option<Delta>, gestures: Vec<Gesture>) -> ClassifierUpdate {
        ClassifierUpdate { mode: self.mode(), delta, gestures }
    }
}
