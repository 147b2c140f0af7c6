//! Live values for the gauges.
//!
//! `RestSource` polls a PostgREST-style endpoint for the first row of a table
//! and reads one numeric field; `DemoSource` serves fixed readings.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use serde_json::Value;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, RequestMode, Response};

use crate::config::SourceSettings;
use crate::error::DataSourceError;
use crate::model::{DataBinding, GaugeConfig};

pub type SourceFuture = Pin<Box<dyn Future<Output = Result<f64, DataSourceError>>>>;

/// Callback receiving each new reading.
pub type OnChange = Rc<dyn Fn(f64)>;

pub trait DataSource {
    fn fetch_once(&self, binding: &DataBinding) -> SourceFuture;
    /// Starts delivering readings to `on_change` until the subscription is dropped.
    fn subscribe(&self, binding: &DataBinding, on_change: OnChange) -> Subscription;
}

/// Keeps a polling timer alive; dropping it stops the timer.
#[derive(Default)]
pub struct Subscription {
    interval: Option<(i32, Closure<dyn FnMut()>)>,
}

impl Subscription {
    pub fn none() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.interval.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some((id, _closure)) = self.interval.take() {
            if let Some(window) = web_sys::window() {
                window.clear_interval_with_handle(id);
            }
        }
    }
}

/// Reads `field` from the first row of a PostgREST array response.
pub fn parse_first_row(body: &str, field: &str) -> Result<f64, DataSourceError> {
    let json: Value = serde_json::from_str(body).map_err(|e| DataSourceError::Decode(e.to_string()))?;
    let row = match &json {
        Value::Array(rows) => rows.first(),
        Value::Object(_) => Some(&json),
        _ => None,
    }
    .ok_or_else(|| DataSourceError::MissingField(field.to_string()))?;
    let value = row.get(field).ok_or_else(|| DataSourceError::MissingField(field.to_string()))?;
    value.as_f64().ok_or_else(|| DataSourceError::NotNumeric(field.to_string()))
}

#[derive(Clone)]
pub struct RestSource {
    base_url: String,
    anon_key: String,
    poll_interval_ms: u32,
}

impl RestSource {
    pub fn from_settings(settings: &SourceSettings) -> Result<Self, DataSourceError> {
        if !settings.is_configured() {
            return Err(DataSourceError::NotConfigured);
        }
        if settings.validate().is_err() {
            return Err(DataSourceError::InvalidInterval(settings.poll_interval_ms));
        }
        let url = settings.url.clone().unwrap_or_default();
        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            anon_key: settings.anon_key.clone().unwrap_or_default(),
            poll_interval_ms: settings.poll_interval_ms,
        })
    }

    pub fn endpoint(&self, binding: &DataBinding) -> String {
        format!("{}/rest/v1/{}?select={}&limit=1", self.base_url, binding.table, binding.field)
    }

    async fn fetch(url: String, key: String, field: String) -> Result<f64, DataSourceError> {
        let js = |e: JsValue| DataSourceError::Network(format!("{:?}", e));
        let headers = Headers::new().map_err(js)?;
        headers.set("apikey", &key).map_err(js)?;
        headers.set("Authorization", &format!("Bearer {}", key)).map_err(js)?;
        headers.set("Accept", "application/json").map_err(js)?;

        let opts = RequestInit::new();
        opts.set_method("GET");
        opts.set_mode(RequestMode::Cors);
        opts.set_headers(&headers);
        let request = Request::new_with_str_and_init(&url, &opts).map_err(js)?;

        let window = web_sys::window().ok_or_else(|| DataSourceError::Network("no window".into()))?;
        let resp: Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js)?
            .dyn_into()
            .map_err(|_| DataSourceError::Decode("not a Response".into()))?;
        if !resp.ok() {
            return Err(DataSourceError::Status(resp.status()));
        }
        let text = JsFuture::from(resp.text().map_err(js)?).await.map_err(js)?;
        let body = text.as_string().ok_or_else(|| DataSourceError::Decode("body is not text".into()))?;
        parse_first_row(&body, &field)
    }

    fn poll(&self, binding: &DataBinding, on_change: &OnChange) {
        let fut = self.fetch_once(binding);
        let on_change = on_change.clone();
        let label = format!("{}.{}", binding.table, binding.field);
        wasm_bindgen_futures::spawn_local(async move {
            match fut.await {
                Ok(v) => on_change(v),
                Err(err) => tracing::warn!("{}: {}", label, err),
            }
        });
    }
}

impl DataSource for RestSource {
    fn fetch_once(&self, binding: &DataBinding) -> SourceFuture {
        Box::pin(Self::fetch(self.endpoint(binding), self.anon_key.clone(), binding.field.clone()))
    }

    fn subscribe(&self, binding: &DataBinding, on_change: OnChange) -> Subscription {
        self.poll(binding, &on_change);
        let Ok(timeout) = i32::try_from(self.poll_interval_ms) else {
            tracing::error!("poll interval {} ms does not fit a timer; polling once", self.poll_interval_ms);
            return Subscription::none();
        };
        let Some(window) = web_sys::window() else {
            return Subscription::none();
        };
        let me = self.clone();
        let binding = binding.clone();
        let tick = Closure::wrap(Box::new(move || {
            me.poll(&binding, &on_change);
        }) as Box<dyn FnMut()>);
        match window.set_interval_with_callback_and_timeout_and_arguments_0(
            tick.as_ref().unchecked_ref(),
            timeout,
        ) {
            Ok(id) => Subscription { interval: Some((id, tick)) },
            Err(err) => {
                tracing::error!("could not start polling: {:?}", err);
                Subscription::none()
            }
        }
    }
}

/// Fixed readings keyed by table and field.
#[derive(Debug, Default)]
pub struct DemoSource {
    values: HashMap<(String, String), f64>,
}

impl DemoSource {
    pub fn from_gauges(gauges: &[GaugeConfig]) -> Self {
        let values = gauges
            .iter()
            .filter_map(|g| {
                let b = g.binding.as_ref()?;
                Some(((b.table.clone(), b.field.clone()), g.demo_value?))
            })
            .collect();
        Self { values }
    }

    fn lookup(&self, binding: &DataBinding) -> Result<f64, DataSourceError> {
        self.values
            .get(&(binding.table.clone(), binding.field.clone()))
            .copied()
            .ok_or_else(|| DataSourceError::MissingField(binding.field.clone()))
    }
}

impl DataSource for DemoSource {
    fn fetch_once(&self, binding: &DataBinding) -> SourceFuture {
        Box::pin(std::future::ready(self.lookup(binding)))
    }

    fn subscribe(&self, binding: &DataBinding, on_change: OnChange) -> Subscription {
        match self.lookup(binding) {
            Ok(v) => on_change(v),
            Err(err) => tracing::warn!("demo source: {}", err),
        }
        Subscription::none()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::task::{Context, Poll, Waker};

    use super::*;
    use crate::config::demo_gauges;

    fn binding(table: &str, field: &str) -> DataBinding {
        DataBinding { table: table.into(), field: field.into() }
    }

    fn settings(url: &str) -> SourceSettings {
        SourceSettings { url: Some(url.into()), anon_key: Some("anon".into()), poll_interval_ms: 5000 }
    }

    #[test]
    fn test_parse_first_row() {
        assert_eq!(parse_first_row(r#"[{"revenue": 42000}]"#, "revenue"), Ok(42000.0));
        assert_eq!(parse_first_row(r#"{"revenue": 1.5}"#, "revenue"), Ok(1.5));
        assert_eq!(
            parse_first_row("[]", "revenue"),
            Err(DataSourceError::MissingField("revenue".into()))
        );
        assert_eq!(
            parse_first_row(r#"[{"other": 1}]"#, "revenue"),
            Err(DataSourceError::MissingField("revenue".into()))
        );
        assert_eq!(
            parse_first_row(r#"[{"revenue": "lots"}]"#, "revenue"),
            Err(DataSourceError::NotNumeric("revenue".into()))
        );
        assert!(matches!(parse_first_row("<html>", "revenue"), Err(DataSourceError::Decode(_))));
    }

    #[test]
    fn test_rest_endpoint() {
        let src = RestSource::from_settings(&settings("https://db.example.co/")).unwrap();
        assert_eq!(
            src.endpoint(&binding("metrics", "revenue")),
            "https://db.example.co/rest/v1/metrics?select=revenue&limit=1"
        );
        assert!(matches!(
            RestSource::from_settings(&SourceSettings::default()),
            Err(DataSourceError::NotConfigured)
        ));
        let busy = SourceSettings { poll_interval_ms: 0, ..settings("https://db.example.co") };
        assert_eq!(RestSource::from_settings(&busy).err(), Some(DataSourceError::InvalidInterval(0)));
    }

    #[test]
    fn test_demo_source_serves_configured_values() {
        let src = DemoSource::from_gauges(&demo_gauges());
        let mut fut = src.fetch_once(&binding("metrics", "conversion_rate"));
        let mut cx = Context::from_waker(Waker::noop());
        assert_eq!(fut.as_mut().poll(&mut cx), Poll::Ready(Ok(68.5)));

        let seen = Rc::new(Cell::new(0.0));
        let sink = seen.clone();
        let sub = src.subscribe(&binding("metrics", "active_users"), Rc::new(move |v| sink.set(v)));
        assert_eq!(seen.get(), 1234.0);
        assert!(!sub.is_active());

        let mut missing = src.fetch_once(&binding("metrics", "nope"));
        assert!(matches!(missing.as_mut().poll(&mut cx), Poll::Ready(Err(DataSourceError::MissingField(_)))));
    }
}
