//! Error types for the modelaudit core library.
//!
//! Uses `thiserror` for public API error types. Errors are grouped by origin:
//! resource fetching, metric computation, net score aggregation, and
//! configuration.

use std::path::PathBuf;

/// Top-level error type for the modelaudit core library.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Metric error: {0}")]
    Metric(#[from] MetricError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures talking to a model hub or git forge.
///
/// The variants mirror how callers need to react: transient failures are
/// retried, everything else is reported back as a degraded metric.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Rate limited by {url}, retry after {retry_after_secs}s")]
    RateLimited { url: String, retry_after_secs: u64 },

    #[error("Unauthorized or forbidden (HTTP {status}) for {url}")]
    Auth { url: String, status: u16 },

    #[error("Resource not found: {url}")]
    NotFound { url: String },

    #[error("Server error (HTTP {status}) from {url}")]
    Server { url: String, status: u16 },

    #[error("Unexpected HTTP {status} from {url}: {body}")]
    Http {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected response shape from {url}: {message}")]
    Schema { url: String, message: String },

    #[error("Unsupported URL: {url}")]
    UnsupportedUrl { url: String },

    #[error("Git error for {url}: {message}")]
    Git { url: String, message: String },

    #[error("File not found in repository view: {path}")]
    MissingFile { path: PathBuf },

    #[error("Invalid file pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FetchError {
    /// Whether the failure is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Network { .. } | FetchError::RateLimited { .. } | FetchError::Server { .. }
        )
    }

    /// Classify a non-success HTTP status into a fetch error.
    pub fn from_status(
        url: impl Into<String>,
        status: u16,
        body: &str,
        retry_after: Option<u64>,
    ) -> Self {
        let url = url.into();
        match status {
            429 => FetchError::RateLimited {
                url,
                retry_after_secs: retry_after.unwrap_or(0),
            },
            401 | 403 => FetchError::Auth { url, status },
            404 => FetchError::NotFound { url },
            500..=599 => FetchError::Server { url, status },
            _ => FetchError::Http {
                url,
                status,
                body: snippet(body),
            },
        }
    }

    pub fn schema(url: impl Into<String>, message: impl Into<String>) -> Self {
        FetchError::Schema {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(url: impl Into<String>) -> Self {
        FetchError::UnsupportedUrl { url: url.into() }
    }
}

/// Trim noisy response bodies before they end up in error messages.
fn snippet(body: &str) -> String {
    let flat = body.trim().replace('\n', " ");
    if flat.chars().count() > 300 {
        let cut: String = flat.chars().take(300).collect();
        format!("{cut}…")
    } else {
        flat
    }
}

/// Errors raised by a metric's `compute`.
///
/// Returning one of these (or panicking) is the "unexpected failure" path; the
/// engine turns it into a placeholder result instead of propagating it.
#[derive(Debug, thiserror::Error)]
pub enum MetricError {
    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("Metric '{metric}' failed: {message}")]
    Computation { metric: String, message: String },

    #[error("Rater request failed: {message}")]
    Rater { message: String },

    #[error("Metric '{metric}' panicked: {message}")]
    Panicked { metric: String, message: String },

    #[error("Metric task for '{metric}' did not complete: {message}")]
    Join { metric: String, message: String },
}

impl MetricError {
    pub fn computation(metric: impl Into<String>, message: impl Into<String>) -> Self {
        MetricError::Computation {
            metric: metric.into(),
            message: message.into(),
        }
    }

    pub fn rater(message: impl Into<String>) -> Self {
        MetricError::Rater {
            message: message.into(),
        }
    }
}

/// Errors from metric registration.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Metric already registered: {name}")]
    AlreadyRegistered { name: String },

    #[error("Metric name '{name}' is reserved")]
    ReservedName { name: String },
}

/// Failures inside net score aggregation. Never surfaced to callers; the
/// aggregator resets the composite to 0.0 when one occurs.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("Mean of device scores for '{metric}' is not finite")]
    NonFiniteMean { metric: String },

    #[error("Composite score is not finite")]
    NonFiniteTotal,

    #[error("Aggregation panicked: {message}")]
    Panicked { message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}
