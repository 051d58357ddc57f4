use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaperError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Identity error: {message}")]
    Identity { message: String },

    #[error("Status query failed: {0}")]
    Status(#[from] StatusError),

    #[error("Proxy shutdown failed: {0}")]
    Actuator(#[from] ActuatorError),
}

/// Errors raised while reading the unit's status from the cluster API
#[derive(Error, Debug)]
pub enum StatusError {
    #[error("pod {name} not found in namespace {namespace}")]
    NotFound { namespace: String, name: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode pod status: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Credentials {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cluster client misconfigured: {message}")]
    Configuration { message: String },
}

/// Errors raised while asking the proxy to shut down
#[derive(Error, Debug)]
pub enum ActuatorError {
    #[error("invalid shutdown endpoint {url}: {details}")]
    InvalidEndpoint { url: String, details: String },

    #[error("shutdown request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ReaperError {
    pub fn identity<S: Into<String>>(message: S) -> Self {
        Self::Identity {
            message: message.into(),
        }
    }
}

impl StatusError {
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether a failed poll may be attempted again.
    ///
    /// A missing pod mid-watch is usually a stale read from the API server, so it
    /// is treated like a transport hiccup. Throttling and server-side failures are
    /// retryable; anything that points at bad credentials or a bad payload is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            StatusError::NotFound { .. } | StatusError::Transport(_) => true,
            StatusError::Api { status, .. } => *status == 429 || *status >= 500,
            StatusError::Decode(_)
            | StatusError::Credentials { .. }
            | StatusError::Configuration { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReaperError>;
