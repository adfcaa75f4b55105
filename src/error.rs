use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StreamwatchError {
    #[error("Authorization failed: {0}")]
    AuthError(String),

    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("Transport error: {0}")]
    TransportError(Box<dyn std::error::Error + Send + Sync>),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("{}", format_range(.value_ms, .min_ms, .max_ms))]
    RangeError { value_ms: u64, min_ms: u64, max_ms: u64 },

    #[error("Invalid value: {0}")]
    ValidationError(String),

    #[error("'{0}' not found")]
    NotFound(String),

    #[error("Error in config {}: {detail}", path.display())]
    ConfigError { path: PathBuf, detail: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

fn format_range(value_ms: &u64, min_ms: &u64, max_ms: &u64) -> String {
    if value_ms < min_ms {
        format!("Interval {value_ms}ms is below the minimum of {min_ms}ms")
    } else {
        format!("Interval {value_ms}ms is above the maximum of {max_ms}ms")
    }
}

impl StreamwatchError {
    /// Error code string for structured JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            StreamwatchError::AuthError(_) => "auth_error",
            StreamwatchError::HttpError { .. } => "http_error",
            StreamwatchError::TransportError(_) => "transport_error",
            StreamwatchError::ProtocolError(_) => "parse_error",
            StreamwatchError::RangeError { .. } => "range_error",
            StreamwatchError::ValidationError(_) => "validation_error",
            StreamwatchError::NotFound(_) => "not_found",
            StreamwatchError::ConfigError { .. } => "config_error",
            StreamwatchError::IoError(_) => "io_error",
        }
    }

    /// True for a 401 from the resource endpoint.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, StreamwatchError::HttpError { status: 401, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            StreamwatchError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        if let Some(status) = self.status() {
            obj.insert("status".into(), serde_json::Value::from(status));
        }
        obj.insert("message".into(), serde_json::Value::String(self.to_string()));
        obj.insert("code".into(), serde_json::Value::String(self.code().to_string()));
        serde_json::json!({ "error": obj })
    }
}
