use thiserror::Error;

/// Top-level error type for GoalBuddy.
#[derive(Debug, Error)]
pub enum GoalError {
    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Spreadsheet/storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The storage backend throttled the request. Retried by the store.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Credential or token exchange failure.
    #[error("auth error: {0}")]
    Auth(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GoalError {
    /// Whether this error is a transient rate-limit rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}
