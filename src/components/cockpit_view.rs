use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{DomRect, HtmlCanvasElement, TouchEvent, TouchList};
use yew::prelude::*;

use crate::config::CockpitConfig;
use crate::controller::{InteractionController, InteractionEvent};
use crate::data_source::{DataSource, DemoSource, OnChange, RestSource, Subscription};
use crate::frame_loop::FrameLoop;
use crate::geometry::NdcPoint;
use crate::model::{GaugeId, GaugeSnapshot, cockpit_pipes};
use crate::overlay::DomOverlay;
use crate::render::CanvasRenderer;
use crate::state::{GestureMode, PointerInput};
use crate::state::pointer::MAX_CONTACTS;

use super::{camera_controls::CameraControls, expanded_gauge::ExpandedGauge};

/// Frames between refreshes of the expanded gauge card.
const EXPANDED_REFRESH_FRAMES: u64 = 30;

type ControllerSlot = Rc<RefCell<Option<InteractionController>>>;

fn with_controller<T>(slot: &ControllerSlot, f: impl FnOnce(&mut InteractionController) -> T) -> Option<T> {
    slot.borrow_mut().as_mut().map(f)
}

fn client_rect(r: &DomRect) -> (f64, f64, f64, f64) {
    (r.left(), r.top(), r.width(), r.height())
}

fn touch_contacts(canvas: &HtmlCanvasElement, touches: &TouchList) -> Vec<NdcPoint> {
    let rect = client_rect(&canvas.get_bounding_client_rect());
    (0..touches.length())
        .filter_map(|i| touches.item(i))
        .take(MAX_CONTACTS)
        .map(|t| NdcPoint::from_client(t.client_x() as f64, t.client_y() as f64, rect))
        .collect()
}

fn mouse_input(canvas: &HtmlCanvasElement, e: &web_sys::MouseEvent) -> PointerInput {
    let rect = client_rect(&canvas.get_bounding_client_rect());
    let p = NdcPoint::from_client(e.client_x() as f64, e.client_y() as f64, rect);
    PointerInput::single(p, e.time_stamp())
}

fn cursor_for(mode: GestureMode) -> &'static str {
    match mode {
        GestureMode::None => "grab",
        GestureMode::CameraOrbit => "move",
        GestureMode::DragGauge => "grabbing",
        GestureMode::PinchZoom => "zoom-in",
    }
}

fn sync_mode(slot: &ControllerSlot, mode: &UseStateHandle<GestureMode>) {
    mode.set(with_controller(slot, |c| c.mode()).unwrap_or(GestureMode::None));
}

fn handle_events(
    slot: &ControllerSlot,
    events: Vec<InteractionEvent>,
    expanded: &UseStateHandle<Option<GaugeSnapshot>>,
) {
    for ev in events {
        match ev {
            InteractionEvent::Tap(id) => tracing::debug!("tap on {:?}", id),
            InteractionEvent::Expand(id) => {
                expanded.set(with_controller(slot, |c| c.snapshot(id)).flatten());
            }
        }
    }
}

/// Subscribes every bound gauge to the REST backend, or to the demo values when
/// no backend is configured.
fn connect_sources(config: &CockpitConfig, ids: &[GaugeId], slot: &ControllerSlot) -> Vec<Subscription> {
    let rest = match RestSource::from_settings(&config.source) {
        Ok(src) => Some(src),
        Err(err) => {
            tracing::info!("{}; showing demo values", err);
            None
        }
    };
    let demo = DemoSource::from_gauges(&config.gauges);
    let source: &dyn DataSource = match &rest {
        Some(r) => r,
        None => &demo,
    };
    ids.iter()
        .zip(&config.gauges)
        .filter_map(|(&id, g)| {
            let binding = g.binding.as_ref()?;
            let slot = slot.clone();
            let on_change: OnChange = Rc::new(move |v| {
                with_controller(&slot, |c| c.set_value(id, v));
            });
            Some(source.subscribe(binding, on_change))
        })
        .collect()
}

#[derive(Properties, PartialEq, Clone)]
pub struct CockpitViewProps {
    pub config: CockpitConfig,
}

#[function_component(CockpitView)]
pub fn cockpit_view(props: &CockpitViewProps) -> Html {
    let canvas_ref = use_node_ref();
    let controller: ControllerSlot = use_mut_ref(|| None::<InteractionController>);
    let expanded = use_state(|| None::<GaugeSnapshot>);
    let mode = use_state(|| GestureMode::None);

    {
        let canvas_ref = canvas_ref.clone();
        let controller = controller.clone();
        let expanded = expanded.clone();
        let mode = mode.clone();
        let config = props.config.clone();
        use_effect_with((), move |_| {
            let window = web_sys::window().expect("window");
            let document = window.document().expect("document");
            let body = document.body().expect("body");
            let canvas: HtmlCanvasElement = canvas_ref.cast::<HtmlCanvasElement>().expect("canvas");
            let fit_canvas = {
                let canvas = canvas.clone();
                let window = window.clone();
                move || {
                    let width = window
                        .inner_width()
                        .ok()
                        .and_then(|v| v.as_f64())
                        .unwrap_or(800.0);
                    let height = window
                        .inner_height()
                        .ok()
                        .and_then(|v| v.as_f64())
                        .unwrap_or(600.0);
                    canvas.set_width(width.max(0.0) as u32);
                    canvas.set_height(height.max(0.0) as u32);
                }
            };
            fit_canvas();

            // Cockpit setup
            let overlay = DomOverlay::new(&document, &body).expect("overlay element");
            let mut cockpit = InteractionController::new(config.controls.clone(), Box::new(overlay));
            let ids: Vec<GaugeId> = config.gauges.iter().map(|g| cockpit.register_gauge(g.clone())).collect();
            for pipe in cockpit_pipes() {
                cockpit.register_fixture(pipe);
            }
            for (&id, g) in ids.iter().zip(&config.gauges) {
                if let (None, Some(v)) = (&g.binding, g.demo_value) {
                    cockpit.set_value(id, v);
                }
            }
            cockpit.start_intro();
            *controller.borrow_mut() = Some(cockpit);
            let subscriptions = connect_sources(&config, &ids, &controller);
            tracing::info!("cockpit ready with {} gauges", ids.len());

            // RAF loop
            let raf_id = Rc::new(RefCell::new(None));
            let closure_cell: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
            {
                let raf_id_clone = raf_id.clone();
                let closure_cell_clone = closure_cell.clone();
                let window_loop = window.clone();
                let controller = controller.clone();
                let expanded = expanded.clone();
                let mut frame_loop = FrameLoop::new(CanvasRenderer::new(canvas.clone()));
                *closure_cell.borrow_mut() = Some(Closure::wrap(Box::new(move |now: f64| {
                    if let Some(c) = controller.borrow_mut().as_mut() {
                        frame_loop.tick(c, now);
                        if frame_loop.frames() % EXPANDED_REFRESH_FRAMES == 0 {
                            if let Some(id) = c.expanded() {
                                expanded.set(c.snapshot(id));
                            }
                        }
                    }
                    if let Some(cb) = closure_cell_clone.borrow().as_ref() {
                        if let Ok(id) = window_loop.request_animation_frame(cb.as_ref().unchecked_ref()) {
                            *raf_id_clone.borrow_mut() = Some(id);
                        }
                    }
                }) as Box<dyn FnMut(f64)>));
                if let Some(cb) = closure_cell.borrow().as_ref() {
                    if let Ok(id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                        *raf_id.borrow_mut() = Some(id);
                    }
                }
            }
            // Wheel zoom
            let wheel_cb = {
                let controller = controller.clone();
                Closure::wrap(Box::new(move |e: web_sys::WheelEvent| {
                    e.prevent_default();
                    with_controller(&controller, |c| c.wheel(e.delta_y()));
                }) as Box<dyn FnMut(_)>)
            };
            canvas
                .add_event_listener_with_callback("wheel", wheel_cb.as_ref().unchecked_ref())
                .ok();
            // Mouse
            let mousedown_cb = {
                let canvas_mc = canvas.clone();
                let controller = controller.clone();
                let expanded = expanded.clone();
                let mode = mode.clone();
                Closure::wrap(Box::new(move |e: web_sys::MouseEvent| {
                    if e.button() != 0 {
                        return;
                    }
                    let input = mouse_input(&canvas_mc, &e);
                    let events = with_controller(&controller, |c| c.pointer_down(&input)).unwrap_or_default();
                    sync_mode(&controller, &mode);
                    handle_events(&controller, events, &expanded);
                }) as Box<dyn FnMut(_)>)
            };
            canvas
                .add_event_listener_with_callback("mousedown", mousedown_cb.as_ref().unchecked_ref())
                .ok();
            let mousemove_cb = {
                let canvas_mc = canvas.clone();
                let controller = controller.clone();
                Closure::wrap(Box::new(move |e: web_sys::MouseEvent| {
                    if e.buttons() & 1 == 0 {
                        return;
                    }
                    let input = mouse_input(&canvas_mc, &e);
                    with_controller(&controller, |c| c.pointer_move(&input));
                }) as Box<dyn FnMut(_)>)
            };
            canvas
                .add_event_listener_with_callback("mousemove", mousemove_cb.as_ref().unchecked_ref())
                .ok();
            // on the window so a release outside the canvas still ends the session
            let mouseup_cb = {
                let controller = controller.clone();
                let expanded = expanded.clone();
                let mode = mode.clone();
                Closure::wrap(Box::new(move |e: web_sys::MouseEvent| {
                    if e.button() != 0 {
                        return;
                    }
                    let input = PointerInput::released(e.time_stamp());
                    let events = with_controller(&controller, |c| c.pointer_up(&input)).unwrap_or_default();
                    sync_mode(&controller, &mode);
                    handle_events(&controller, events, &expanded);
                }) as Box<dyn FnMut(_)>)
            };
            window
                .add_event_listener_with_callback("mouseup", mouseup_cb.as_ref().unchecked_ref())
                .ok();
            let contextmenu_cb = {
                Closure::wrap(Box::new(move |e: web_sys::Event| {
                    e.prevent_default();
                }) as Box<dyn FnMut(_)>)
            };
            canvas
                .add_event_listener_with_callback("contextmenu", contextmenu_cb.as_ref().unchecked_ref())
                .ok();
            let resize_cb = {
                let fit_canvas = fit_canvas.clone();
                Closure::wrap(Box::new(move |_e: web_sys::Event| {
                    fit_canvas();
                }) as Box<dyn FnMut(_)>)
            };
            window
                .add_event_listener_with_callback("resize", resize_cb.as_ref().unchecked_ref())
                .ok();
            // Touch
            let touch_start_cb = {
                let canvas_tc = canvas.clone();
                let controller = controller.clone();
                let expanded = expanded.clone();
                Closure::wrap(Box::new(move |e: TouchEvent| {
                    e.prevent_default();
                    let input = PointerInput::new(touch_contacts(&canvas_tc, &e.touches()), e.time_stamp());
                    let events = with_controller(&controller, |c| c.pointer_down(&input)).unwrap_or_default();
                    handle_events(&controller, events, &expanded);
                }) as Box<dyn FnMut(_)>)
            };
            canvas
                .add_event_listener_with_callback("touchstart", touch_start_cb.as_ref().unchecked_ref())
                .ok();
            let touch_move_cb = {
                let canvas_tc = canvas.clone();
                let controller = controller.clone();
                Closure::wrap(Box::new(move |e: TouchEvent| {
                    e.prevent_default();
                    let input = PointerInput::new(touch_contacts(&canvas_tc, &e.touches()), e.time_stamp());
                    with_controller(&controller, |c| c.pointer_move(&input));
                }) as Box<dyn FnMut(_)>)
            };
            canvas
                .add_event_listener_with_callback("touchmove", touch_move_cb.as_ref().unchecked_ref())
                .ok();
            let touch_end_cb = {
                let canvas_tc = canvas.clone();
                let controller = controller.clone();
                let expanded = expanded.clone();
                Closure::wrap(Box::new(move |e: TouchEvent| {
                    e.prevent_default();
                    let input = PointerInput::new(touch_contacts(&canvas_tc, &e.touches()), e.time_stamp());
                    let events = with_controller(&controller, |c| c.pointer_up(&input)).unwrap_or_default();
                    handle_events(&controller, events, &expanded);
                }) as Box<dyn FnMut(_)>)
            };
            canvas
                .add_event_listener_with_callback("touchend", touch_end_cb.as_ref().unchecked_ref())
                .ok();
            // a cancelled touch ends the whole session
            let touch_cancel_cb = {
                let controller = controller.clone();
                Closure::wrap(Box::new(move |e: TouchEvent| {
                    let input = PointerInput::released(e.time_stamp());
                    with_controller(&controller, |c| c.pointer_up(&input));
                }) as Box<dyn FnMut(_)>)
            };
            canvas
                .add_event_listener_with_callback("touchcancel", touch_cancel_cb.as_ref().unchecked_ref())
                .ok();
            // Cleanup
            let window_clone = window.clone();
            move || {
                let _ = canvas.remove_event_listener_with_callback(
                    "wheel",
                    wheel_cb.as_ref().unchecked_ref(),
                );
                let _ = canvas.remove_event_listener_with_callback(
                    "mousedown",
                    mousedown_cb.as_ref().unchecked_ref(),
                );
                let _ = canvas.remove_event_listener_with_callback(
                    "mousemove",
                    mousemove_cb.as_ref().unchecked_ref(),
                );
                let _ = canvas.remove_event_listener_with_callback(
                    "contextmenu",
                    contextmenu_cb.as_ref().unchecked_ref(),
                );
                let _ = window_clone.remove_event_listener_with_callback(
                    "mouseup",
                    mouseup_cb.as_ref().unchecked_ref(),
                );
                let _ = window_clone.remove_event_listener_with_callback(
                    "resize",
                    resize_cb.as_ref().unchecked_ref(),
                );
                let _ = canvas.remove_event_listener_with_callback(
                    "touchstart",
                    touch_start_cb.as_ref().unchecked_ref(),
                );
                let _ = canvas.remove_event_listener_with_callback(
                    "touchmove",
                    touch_move_cb.as_ref().unchecked_ref(),
                );
                let _ = canvas.remove_event_listener_with_callback(
                    "touchend",
                    touch_end_cb.as_ref().unchecked_ref(),
                );
                let _ = canvas.remove_event_listener_with_callback(
                    "touchcancel",
                    touch_cancel_cb.as_ref().unchecked_ref(),
                );
                if let Some(id) = *raf_id.borrow() {
                    let _ = window_clone.cancel_animation_frame(id);
                }
                closure_cell.borrow_mut().take();
                drop(subscriptions);
                controller.borrow_mut().take();
            }
        });
    }

    let zoom_in_cb = {
        let controller = controller.clone();
        Callback::from(move |()| {
            with_controller(&controller, |c| c.zoom_step(true));
        })
    };
    let zoom_out_cb = {
        let controller = controller.clone();
        Callback::from(move |()| {
            with_controller(&controller, |c| c.zoom_step(false));
        })
    };
    let reset_cb = {
        let controller = controller.clone();
        Callback::from(move |()| {
            with_controller(&controller, |c| c.reset_camera());
        })
    };
    let close_cb = {
        let controller = controller.clone();
        let expanded = expanded.clone();
        Callback::from(move |()| {
            with_controller(&controller, |c| c.collapse());
            expanded.set(None);
        })
    };

    html! {<div style="position:relative; width:100vw; height:100vh; overflow:hidden; touch-action:none;">
        <canvas ref={canvas_ref.clone()} id="cockpit-canvas" style={format!("display:block; width:100%; height:100%; cursor:{};", cursor_for(*mode))}></canvas>
        <CameraControls on_zoom_in={zoom_in_cb} on_zoom_out={zoom_out_cb} on_reset={reset_cb} />
        <ExpandedGauge gauge={(*expanded).clone()} on_close={close_cb} />
    </div> }
}
