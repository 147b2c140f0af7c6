// Logging setup and readout formatting.
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Registry, reload};
use tracing_wasm::{WASMLayer, WASMLayerConfigBuilder};

/// Adjusts the console level after the subscriber is installed.
pub type LevelHandle = reload::Handle<LevelFilter, Registry>;

/// Routes `tracing` events to the browser console at `level`.
///
/// Returns `None` when a global subscriber is already set.
pub fn init_logging(level: LevelFilter) -> Option<LevelHandle> {
    let (filter, handle) = reload::Layer::new(level);
    let console = WASMLayer::new(WASMLayerConfigBuilder::new().set_report_logs_in_timings(false).build());
    match tracing_subscriber::registry().with(filter).with(console).try_init() {
        Ok(()) => Some(handle),
        Err(err) => {
            tracing::debug!("subscriber already installed: {}", err);
            None
        }
    }
}

/// Applies the configured level to an installed subscriber.
pub fn set_log_level(handle: &LevelHandle, level: LevelFilter) {
    if let Err(err) = handle.reload(level) {
        tracing::warn!("could not change log level: {}", err);
    }
}

/// Dial readout: whole numbers with thousands separators, one decimal below 100.
pub fn format_value(v: f64) -> String {
    if !v.is_finite() {
        return "--".into();
    }
    if v.abs() < 100.0 && v.fract() != 0.0 {
        return format!("{:.1}", v);
    }
    let rounded = v.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn format_trend(percent: f64) -> String {
    let arrow = if percent >= 0.0 { '▲' } else { '▼' };
    format!("{} {:+.1}%", arrow, percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(42_000.0), "42,000");
        assert_eq!(format_value(1_234.4), "1,234");
        assert_eq!(format_value(68.5), "68.5");
        assert_eq!(format_value(100.0), "100");
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(-1_500_000.0), "-1,500,000");
        assert_eq!(format_value(f64::NAN), "--");
    }

    #[test]
    fn test_format_trend() {
        assert_eq!(format_trend(5.2), "▲ +5.2%");
        assert_eq!(format_trend(-10.0), "▼ -10.0%");
    }
}
