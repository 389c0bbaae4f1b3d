use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[cfg(feature = "native")]
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(String),

    #[error("Initialization error: {0}")]
    Init(String),

    /// Transport-level failure: DNS, connect, TLS, timeout.
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Upstream returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The circuit breaker refused the call.
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    /// Whether the failure came from talking to a third-party service rather
    /// than from local state or caller input.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            CoreError::Http(_)
                | CoreError::UpstreamStatus { .. }
                | CoreError::InvalidResponse(_)
                | CoreError::Unavailable(_)
        )
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}

#[cfg(feature = "native")]
impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}

#[cfg(feature = "native")]
impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CoreError::InvalidResponse(err.to_string())
        } else {
            CoreError::Http(err.to_string())
        }
    }
}

impl From<toml::ser::Error> for CoreError {
    fn from(err: toml::ser::Error) -> Self {
        CoreError::TomlSerialization(err.to_string())
    }
}
