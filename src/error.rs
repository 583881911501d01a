//! Error types for the Thames Water importer.
//!
//! Each stage of a run has its own error enum so callers can tell a retryable
//! login failure apart from the fatal ones that end the run.

use thiserror::Error;

/// Result type alias using our custom error types.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type that encompasses all application errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("configuration error")]
    Config(#[from] ConfigError),

    /// Login kept failing until the run was cancelled
    #[error("session could not be established")]
    SessionExhausted(#[from] SessionError),

    /// Meter discovery or consumption download failed
    #[error("discovery failed")]
    Discovery(#[from] ReadingsError),

    /// Remote data could not be interpreted
    #[error("parse error")]
    Parse(#[from] ParseError),

    /// Local time-series store errors
    #[error("storage error")]
    Storage(#[from] StorageError),

    /// Remote archive errors
    #[error("shipment error")]
    Shipment(#[from] ShipmentError),

    /// The run was interrupted by a signal
    #[error("run cancelled")]
    Cancelled,
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required configuration value is missing
    #[error("missing required configuration: {0}")]
    Missing(String),

    /// Configuration value is invalid
    #[error("invalid configuration value for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Errors raised while driving the browser through the login flow.
///
/// Every variant is retryable by the session bootstrap.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The WebDriver endpoint could not be reached
    #[error("WebDriver request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// WebDriver answered with a protocol error
    #[error("WebDriver error '{error}': {message}")]
    WebDriver { error: String, message: String },

    /// An element never reached the awaited state
    #[error("timed out after {seconds}s waiting for '{selector}' to become {state}")]
    SelectorTimeout {
        selector: String,
        state: &'static str,
        seconds: u64,
    },

    /// A login step failed for a reason other than a timeout
    #[error("login step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },

    /// The whole attempt exceeded the login timeout
    #[error("login attempt timed out after {0} seconds")]
    AttemptTimeout(u64),

    /// The run was cancelled mid-attempt; the browser context is already closed
    #[error("login attempt cancelled")]
    Cancelled,
}

/// Returned once the session bootstrap gives up.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The run was cancelled; carries the most recent attempt's error
    #[error("login retries exhausted after {attempts} attempts")]
    Exhausted {
        attempts: u32,
        #[source]
        last: AuthError,
    },

    /// Cancelled before any attempt completed
    #[error("login cancelled")]
    Cancelled,
}

/// Errors from the account's AJAX endpoints.
#[derive(Error, Debug)]
pub enum ReadingsError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned a non-2xx status
    #[error("unexpected status code {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Discovery returned an empty meter list
    #[error("no meters found")]
    NoMeters,

    /// The base URL or a derived URL was invalid
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

/// Errors interpreting dates, labels and values from remote data.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Failed to parse a daily period value
    #[error("failed to parse date from '{text}': {message}")]
    DateParse { text: String, message: String },

    /// A reading label did not split into hours and minutes
    #[error("unexpected label split count: {count} in '{label}'")]
    LabelSplit { label: String, count: usize },

    /// Hour or minute was not a number or out of range
    #[error("failed to parse time from '{label}': {message}")]
    TimeParse { label: String, message: String },

    /// Reading value cannot be stored
    #[error("invalid reading value {value} at '{label}'")]
    InvalidValue { label: String, value: f64 },
}

/// Local time-series store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Block metadata or head log could not be (de)serialized
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Sample is older than the appendable minimum time
    #[error("sample at {timestamp} is out of bounds (minimum {min_valid_time})")]
    OutOfBounds { timestamp: i64, min_valid_time: i64 },

    /// Sample is older than the series' latest sample
    #[error("sample at {timestamp} is out of order for series {series} (latest {latest})")]
    OutOfOrder {
        series: String,
        timestamp: i64,
        latest: i64,
    },

    /// Same timestamp was appended twice with different values
    #[error("duplicate sample at {timestamp} for series {series} with a different value")]
    DuplicateSample { series: String, timestamp: i64 },

    /// Compaction could not finish
    #[error("error during compaction: {0}")]
    Compaction(String),
}

/// Remote archive errors.
#[derive(Error, Debug)]
pub enum ShipmentError {
    /// HTTP bucket request failed
    #[error("bucket request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem error while reading blocks or writing to a directory bucket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata could not be (de)serialized
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Local blocks could not be listed
    #[error("failed to read local blocks: {0}")]
    Block(#[from] StorageError),

    /// Bucket answered with an unexpected status
    #[error("bucket returned status {status} for '{key}'")]
    UnexpectedStatus { key: String, status: u16 },

    /// The run was cancelled while blocks were being shipped
    #[error("shipment cancelled")]
    Cancelled,
}

impl ConfigError {
    /// Creates a new missing configuration error.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing(field.into())
    }

    /// Creates a new invalid configuration error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl AuthError {
    /// Creates a step failure error.
    pub fn step_failed(step: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::StepFailed {
            step: step.into(),
            message: err.to_string(),
        }
    }

    /// Creates a selector timeout error.
    pub fn selector_timeout(selector: impl Into<String>, state: &'static str, seconds: u64) -> Self {
        Self::SelectorTimeout {
            selector: selector.into(),
            state,
            seconds,
        }
    }
}

impl ReadingsError {
    /// Creates a server error from HTTP status and response body.
    pub fn server_error(status: reqwest::StatusCode, body: String) -> Self {
        Self::ServerError {
            status: status.as_u16(),
            message: body,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: err.to_string(),
        }
    }
}

impl ParseError {
    /// Creates a date parse error.
    pub fn date_parse(text: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::DateParse {
            text: text.into(),
            message: err.to_string(),
        }
    }

    /// Creates a time parse error.
    pub fn time_parse(label: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::TimeParse {
            label: label.into(),
            message: err.to_string(),
        }
    }
}
