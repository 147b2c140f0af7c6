use crate::controller::InteractionController;
use crate::model::REFERENCE_FRAME_MS;
use crate::render::Renderer;

/// Longest gap fed to the animations; a backgrounded tab resumes from here.
const MAX_FRAME_GAP_MS: f64 = 250.0;

/// Drives one cockpit frame per animation callback: overlay tracking, gauge
/// smoothing, then drawing.
pub struct FrameLoop<R: Renderer> {
    renderer: R,
    frames: u64,
    last_tick_ms: Option<f64>,
}

impl<R: Renderer> FrameLoop<R> {
    pub fn new(renderer: R) -> Self {
        Self { renderer, frames: 0, last_tick_ms: None }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[cfg(test)]
    pub fn last_tick_ms(&self) -> Option<f64> {
        self.last_tick_ms
    }

    #[cfg(test)]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn tick(&mut self, controller: &mut InteractionController, now_ms: f64) {
        let elapsed = match self.last_tick_ms {
            Some(last) => (now_ms - last).clamp(0.0, MAX_FRAME_GAP_MS),
            None => REFERENCE_FRAME_MS,
        };
        self.last_tick_ms = Some(now_ms);
        let viewport = self.renderer.viewport();
        controller.on_frame(viewport);
        controller.advance_gauges(elapsed);
        if viewport.is_empty() {
            tracing::trace!("zero-sized viewport; frame {} not drawn", self.frames);
        } else {
            self.renderer.render(&controller.scene());
        }
        self.frames += 1;
    }
}
