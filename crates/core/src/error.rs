/// Result alias that carries the custom [`MotionError`] type.
pub type Result<T> = std::result::Result<T, MotionError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    /// A numeric option was outside its accepted range.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// An engine or controller was used outside its live window, e.g. ticked
    /// after disposal. Production paths swallow this and degrade to a no-op.
    #[error("lifecycle violation: {0}")]
    LifecycleViolation(String),
    /// Free-form error surfaced by the application layer.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration documents that failed to parse.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl MotionError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn lifecycle<T: Into<String>>(msg: T) -> Self {
        Self::LifecycleViolation(msg.into())
    }

    /// Returns `true` for [`MotionError::LifecycleViolation`].
    pub fn is_lifecycle_violation(&self) -> bool {
        matches!(self, Self::LifecycleViolation(_))
    }
}

impl From<&str> for MotionError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for MotionError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
