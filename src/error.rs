use thiserror::Error;

/// Failures talking to a gauge's backing data source. None of these touch gauge state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataSourceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("backend returned HTTP {0}")]
    Status(u16),
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("field `{0}` missing from response")]
    MissingField(String),
    #[error("field `{0}` is not numeric")]
    NotNumeric(String),
    #[error("poll interval of {0} ms is out of range")]
    InvalidInterval(u32),
    #[error("data source is not configured")]
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid configuration json: {0}")]
    Parse(String),
    #[error("gauge `{label}` has an invalid range [{min}, {max}]")]
    InvalidRange { label: String, min: f64, max: f64 },
    #[error("unknown log level `{0}`")]
    LogLevel(String),
    #[error("poll interval of {0} ms is out of range")]
    PollInterval(u32),
    #[error("control setting `{0}` is out of range")]
    Tuning(&'static str),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
