//! Floating readout that follows the selected gauge.

use wasm_bindgen::JsValue;
use web_sys::{Document, Element};

use crate::geometry::ScreenPoint;
use crate::model::{GaugeId, GaugeSnapshot};
use crate::util::{format_trend, format_value};

/// Text shown in the overlay for one gauge.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayContent {
    pub label: String,
    pub value: String,
    pub trend: Option<String>,
    pub color: String,
}

impl OverlayContent {
    pub fn from_snapshot(s: &GaugeSnapshot) -> Self {
        Self {
            label: s.label.clone(),
            value: format_value(s.target),
            trend: s.trend_percent.map(format_trend),
            color: s.color.clone(),
        }
    }
}

pub trait OverlayPresenter {
    fn show_overlay(&mut self, content: &OverlayContent, pos: ScreenPoint);
    fn update_overlay_position(&mut self, pos: ScreenPoint);
    fn hide_overlay(&mut self);
    /// Refreshes the text of a visible overlay. Defaults to re-showing it.
    fn update_overlay_content(&mut self, content: &OverlayContent, pos: ScreenPoint) {
        self.show_overlay(content, pos);
    }
}

/// Which gauge the overlay belongs to, and what it last displayed.
#[derive(Debug, Default)]
pub struct SelectionOverlay {
    gauge: Option<GaugeId>,
    content: Option<OverlayContent>,
    position: Option<ScreenPoint>,
}

impl SelectionOverlay {
    pub fn gauge(&self) -> Option<GaugeId> {
        self.gauge
    }

    #[cfg(test)]
    pub fn position(&self) -> Option<ScreenPoint> {
        self.position
    }

    pub fn show(&mut self, id: GaugeId, content: OverlayContent, pos: ScreenPoint, presenter: &mut dyn OverlayPresenter) {
        presenter.show_overlay(&content, pos);
        self.gauge = Some(id);
        self.content = Some(content);
        self.position = Some(pos);
    }

    /// Moves the overlay, refreshing its text when the gauge's readout changed.
    pub fn follow(&mut self, content: OverlayContent, pos: ScreenPoint, presenter: &mut dyn OverlayPresenter) {
        if self.gauge.is_none() {
            return;
        }
        if self.content.as_ref() != Some(&content) {
            presenter.update_overlay_content(&content, pos);
            self.content = Some(content);
        } else if self.position != Some(pos) {
            presenter.update_overlay_position(pos);
        }
        self.position = Some(pos);
    }

    pub fn hide(&mut self, presenter: &mut dyn OverlayPresenter) {
        if self.gauge.take().is_some() {
            presenter.hide_overlay();
        }
        self.content = None;
        self.position = None;
    }
}

const BASE_STYLE: &str = "position:absolute; pointer-events:none; padding:6px 10px; \
    background:rgba(13,17,23,0.85); border-radius:6px; font:12px monospace; color:#e6edf3; \
    transform:translate(0,-50%); white-space:nowrap;";

/// Overlay backed by an absolutely positioned `div.gauge-overlay`.
pub struct DomOverlay {
    root: Element,
    label: Element,
    value: Element,
    trend: Element,
    color: String,
}

impl DomOverlay {
    pub fn new(document: &Document, parent: &Element) -> Result<Self, JsValue> {
        let root = document.create_element("div")?;
        root.set_class_name("gauge-overlay");
        let label = document.create_element("div")?;
        let value = document.create_element("div")?;
        let trend = document.create_element("div")?;
        root.append_child(&label)?;
        root.append_child(&value)?;
        root.append_child(&trend)?;
        parent.append_child(&root)?;
        let overlay = Self { root, label, value, trend, color: String::new() };
        overlay.set_style(None)?;
        Ok(overlay)
    }

    fn set_style(&self, pos: Option<ScreenPoint>) -> Result<(), JsValue> {
        let style = match pos {
            Some(p) => format!(
                "{BASE_STYLE} display:block; left:{:.1}px; top:{:.1}px; border:1px solid {};",
                p.x, p.y, self.color
            ),
            None => format!("{BASE_STYLE} display:none;"),
        };
        self.root.set_attribute("style", &style)
    }

    fn log_err(result: Result<(), JsValue>) {
        if let Err(err) = result {
            tracing::error!("overlay update failed: {:?}", err);
        }
    }
}

impl OverlayPresenter for DomOverlay {
    fn show_overlay(&mut self, content: &OverlayContent, pos: ScreenPoint) {
        self.label.set_text_content(Some(&content.label));
        self.value.set_text_content(Some(&content.value));
        self.trend.set_text_content(content.trend.as_deref());
        self.color = content.color.clone();
        Self::log_err(self.set_style(Some(pos)));
    }

    fn update_overlay_position(&mut self, pos: ScreenPoint) {
        Self::log_err(self.set_style(Some(pos)));
    }

    fn hide_overlay(&mut self) {
        Self::log_err(self.set_style(None));
    }
}

impl Drop for DomOverlay {
    fn drop(&mut self) {
        self.root.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Presenter that records every call.
    #[derive(Default)]
    struct RecordingPresenter {
        calls: Vec<String>,
    }

    impl OverlayPresenter for RecordingPresenter {
        fn show_overlay(&mut self, content: &OverlayContent, pos: ScreenPoint) {
            self.calls.push(format!("show {} {:.0},{:.0}", content.label, pos.x, pos.y));
        }
        fn update_overlay_position(&mut self, pos: ScreenPoint) {
            self.calls.push(format!("move {:.0},{:.0}", pos.x, pos.y));
        }
        fn hide_overlay(&mut self) {
            self.calls.push("hide".into());
        }
    }

    fn content(value: &str) -> OverlayContent {
        OverlayContent { label: "Revenue".into(), value: value.into(), trend: None, color: "#4cc9ff".into() }
    }

    #[test]
    fn test_lifecycle() {
        let mut p = RecordingPresenter::default();
        let mut o = SelectionOverlay::default();
        o.follow(content("1"), ScreenPoint { x: 1.0, y: 1.0 }, &mut p);
        assert!(p.calls.is_empty());
        o.show(GaugeId(0), content("1"), ScreenPoint { x: 10.0, y: 20.0 }, &mut p);
        o.follow(content("1"), ScreenPoint { x: 10.0, y: 20.0 }, &mut p);
        o.follow(content("1"), ScreenPoint { x: 12.0, y: 20.0 }, &mut p);
        o.follow(content("2"), ScreenPoint { x: 12.0, y: 20.0 }, &mut p);
        o.hide(&mut p);
        o.hide(&mut p);
        assert_eq!(p.calls, vec!["show Revenue 10,20", "move 12,20", "show Revenue 12,20", "hide"]);
        assert_eq!(o.gauge(), None);
    }
}
