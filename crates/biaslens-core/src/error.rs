//! Error types for BiasLens

/// Result type alias using BiasLens' Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for BiasLens operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The entailment model could not be constructed. Cached by the lazy
    /// provider and returned unchanged on every later call.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// A single inference call failed
    #[error("inference error: {0}")]
    Inference(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Phrase dictionary construction errors
    #[error("dictionary error: {0}")]
    Dictionary(String),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Inference exceeded its budget, in milliseconds
    #[error("inference timed out after {0} ms")]
    Timeout(u64),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new model-unavailable error
    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new dictionary error
    pub fn dictionary(msg: impl Into<String>) -> Self {
        Self::Dictionary(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
