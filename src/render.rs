use std::f64::consts::PI;

use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::geometry::{ScreenPoint, Viewport};
use crate::model::{Fixture, Gauge, GaugeId, NEEDLE_START, NEEDLE_SWEEP};
use crate::state::CameraState;
use crate::util::format_value;

/// Gauge face radius in world units.
pub const GAUGE_RADIUS: f64 = 0.5;
const MAJOR_TICKS: usize = 10;
const PIPE_COLOR: &str = "#b87333";
const BACKGROUND: &str = "#0a0a0a";

/// Everything a renderer needs for one frame.
pub struct CockpitScene<'a> {
    pub camera: &'a CameraState,
    pub gauges: &'a [Gauge],
    pub fixtures: &'a [Fixture],
    pub selected: Option<GaugeId>,
}

pub trait Renderer {
    /// Current drawing surface size in pixels.
    fn viewport(&self) -> Viewport;
    fn render(&mut self, scene: &CockpitScene<'_>);
}

/// Screen placement of a gauge for this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaugeSprite {
    pub index: usize,
    pub center: ScreenPoint,
    pub radius_px: f64,
    pub depth: f64,
}

/// Projects every visible gauge and orders them far to near.
pub fn layout_gauges(scene: &CockpitScene<'_>, viewport: Viewport) -> Vec<GaugeSprite> {
    let aspect = viewport.aspect();
    let mut sprites: Vec<GaugeSprite> = scene
        .gauges
        .iter()
        .enumerate()
        .filter_map(|(index, g)| {
            let (x, y, depth) = scene.camera.project_to_ndc(g.position, aspect)?;
            Some(GaugeSprite {
                index,
                center: viewport.ndc_to_screen(x, y),
                radius_px: GAUGE_RADIUS * scene.camera.pixels_per_unit(depth, viewport),
                depth,
            })
        })
        .collect();
    sprites.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    sprites
}

/// Point at `radius` from `center` along a dial angle. Angle 0 points up and
/// positive angles turn counter-clockwise, as on the gauge face.
pub fn dial_point(center: ScreenPoint, radius: f64, angle: f64) -> ScreenPoint {
    ScreenPoint { x: center.x - radius * angle.sin(), y: center.y - radius * angle.cos() }
}

/// Values printed at the major ticks.
pub fn tick_values(min: f64, max: f64) -> Vec<f64> {
    (0..=MAJOR_TICKS).map(|i| min + (max - min) * i as f64 / MAJOR_TICKS as f64).collect()
}

fn tick_angle(i: usize, count: usize) -> f64 {
    NEEDLE_START + NEEDLE_SWEEP * i as f64 / count as f64
}

/// Draws the cockpit onto a 2D canvas as camera-facing dials.
pub struct CanvasRenderer {
    canvas: HtmlCanvasElement,
}

impl CanvasRenderer {
    pub fn new(canvas: HtmlCanvasElement) -> Self {
        Self { canvas }
    }

    fn context(&self) -> Option<CanvasRenderingContext2d> {
        self.canvas.get_context("2d").ok().flatten()?.dyn_into::<CanvasRenderingContext2d>().ok()
    }

    fn draw_fixture(ctx: &CanvasRenderingContext2d, camera: &CameraState, f: &Fixture, vp: Viewport) {
        let aspect = vp.aspect();
        let (Some(a), Some(b)) = (camera.project_to_ndc(f.start, aspect), camera.project_to_ndc(f.end, aspect)) else {
            return;
        };
        let depth = (a.2 + b.2) * 0.5;
        let sa = vp.ndc_to_screen(a.0, a.1);
        let sb = vp.ndc_to_screen(b.0, b.1);
        ctx.set_stroke_style_str(PIPE_COLOR);
        ctx.set_line_width((f.radius * 2.0 * camera.pixels_per_unit(depth, vp)).max(1.0));
        ctx.set_line_cap("round");
        ctx.begin_path();
        ctx.move_to(sa.x, sa.y);
        ctx.line_to(sb.x, sb.y);
        ctx.stroke();
    }

    fn draw_gauge(ctx: &CanvasRenderingContext2d, g: &Gauge, s: &GaugeSprite, selected: bool) {
        let c = s.center;
        let r = s.radius_px;
        if r < 2.0 {
            return;
        }
        let color = g.config.color.as_str();

        // bezel with glow
        ctx.save();
        ctx.set_shadow_color(color);
        ctx.set_shadow_blur(g.glow() * 12.0);
        ctx.set_fill_style_str(if selected { "#5a5a5a" } else { "#3a3a3a" });
        ctx.begin_path();
        ctx.arc(c.x, c.y, r * 1.12, 0.0, 2.0 * PI).ok();
        ctx.fill();
        ctx.restore();

        // face
        ctx.set_fill_style_str("#111111");
        ctx.begin_path();
        ctx.arc(c.x, c.y, r, 0.0, 2.0 * PI).ok();
        ctx.fill();

        // ticks
        ctx.set_stroke_style_str(color);
        for i in 0..=MAJOR_TICKS * 5 {
            let angle = tick_angle(i, MAJOR_TICKS * 5);
            let major = i % 5 == 0;
            let inner = dial_point(c, r * if major { 0.78 } else { 0.85 }, angle);
            let outer = dial_point(c, r * 0.92, angle);
            ctx.set_line_width(if major { (r * 0.03).max(1.0) } else { (r * 0.012).max(0.5) });
            ctx.begin_path();
            ctx.move_to(inner.x, inner.y);
            ctx.line_to(outer.x, outer.y);
            ctx.stroke();
        }

        // numbers
        ctx.set_fill_style_str("#ffffff");
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        ctx.set_font(&format!("{:.0}px Arial", (r * 0.1).max(6.0)));
        for (i, v) in tick_values(g.config.min, g.config.max).iter().enumerate().step_by(2) {
            let p = dial_point(c, r * 0.64, tick_angle(i, MAJOR_TICKS));
            ctx.fill_text(&format!("{:.0}", v), p.x, p.y).ok();
        }

        // needle
        let tip = dial_point(c, r * 0.7, g.needle_angle());
        let tail = dial_point(c, r * 0.1, g.needle_angle() + PI);
        ctx.set_stroke_style_str("#ffffff");
        ctx.set_line_width((r * 0.03).max(1.0));
        ctx.begin_path();
        ctx.move_to(tail.x, tail.y);
        ctx.line_to(tip.x, tip.y);
        ctx.stroke();
        ctx.set_fill_style_str(color);
        ctx.begin_path();
        ctx.arc(tip.x, tip.y, (r * 0.03).max(1.0), 0.0, 2.0 * PI).ok();
        ctx.fill();
        ctx.set_fill_style_str("#888888");
        ctx.begin_path();
        ctx.arc(c.x, c.y, r * 0.06, 0.0, 2.0 * PI).ok();
        ctx.fill();

        // digital readout and label
        ctx.set_fill_style_str("#00ff00");
        ctx.set_font(&format!("bold {:.0}px monospace", (r * 0.16).max(8.0)));
        ctx.fill_text(&format_value(g.value()), c.x, c.y + r * 0.4).ok();
        ctx.set_fill_style_str(color);
        ctx.set_font(&format!("{:.0}px Arial", (r * 0.13).max(7.0)));
        ctx.fill_text(g.label(), c.x, c.y + r * 1.3).ok();
    }
}

impl Renderer for CanvasRenderer {
    fn viewport(&self) -> Viewport {
        Viewport::new(self.canvas.width() as f64, self.canvas.height() as f64)
    }

    fn render(&mut self, scene: &CockpitScene<'_>) {
        let vp = self.viewport();
        if vp.is_empty() || !self.canvas.is_connected() {
            return;
        }
        let Some(ctx) = self.context() else {
            tracing::warn!("2d context unavailable; skipping frame");
            return;
        };
        ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0).ok();
        ctx.set_fill_style_str(BACKGROUND);
        ctx.fill_rect(0.0, 0.0, vp.width, vp.height);
        for f in scene.fixtures {
            Self::draw_fixture(&ctx, scene.camera, f, vp);
        }
        for sprite in layout_gauges(scene, vp) {
            let g = &scene.gauges[sprite.index];
            Self::draw_gauge(&ctx, g, &sprite, scene.selected == Some(g.id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::demo_gauges;
    use crate::geometry::Vec3;

    #[test]
    fn test_dial_point_sweep_ends() {
        let c = ScreenPoint { x: 100.0, y: 100.0 };
        let top = dial_point(c, 10.0, 0.0);
        assert!((top.x - 100.0).abs() < 1e-9 && (top.y - 90.0).abs() < 1e-9);
        let start = dial_point(c, 10.0, NEEDLE_START);
        let end = dial_point(c, 10.0, NEEDLE_START + NEEDLE_SWEEP);
        assert!(start.y > 100.0 && end.y < 100.0);
        assert!(start.x < 100.0 && end.x < 100.0);
    }

    #[test]
    fn test_tick_values_span_range() {
        let v = tick_values(0.0, 5000.0);
        assert_eq!(v.len(), MAJOR_TICKS + 1);
        assert_eq!(v[0], 0.0);
        assert_eq!(v[MAJOR_TICKS], 5000.0);
    }

    #[test]
    fn test_layout_orders_far_to_near_and_culls_behind() {
        let camera = CameraState::default();
        let mut gauges: Vec<Gauge> = demo_gauges()
            .into_iter()
            .enumerate()
            .map(|(i, cfg)| Gauge::new(GaugeId(i), cfg))
            .collect();
        gauges[0].position = Vec3::new(0.0, 0.0, 2.0);
        gauges[1].position = Vec3::new(0.0, 0.0, -3.0);
        gauges[2].position = Vec3::new(0.0, 0.0, 8.0);
        let scene = CockpitScene { camera: &camera, gauges: &gauges, fixtures: &[], selected: None };
        let sprites = layout_gauges(&scene, Viewport::new(800.0, 600.0));
        let order: Vec<usize> = sprites.iter().map(|s| s.index).collect();
        assert_eq!(order, vec![1, 3, 0]);
        assert!(sprites[0].radius_px < sprites[2].radius_px);
    }
}
