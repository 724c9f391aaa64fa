//! Error values delivered on the error channel.

/// Result type alias for load operations.
pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// A failure reported by an asynchronous load.
///
/// Load failures are ordinary values, not panics: they travel on a source's
/// error channel and leave the already-loaded content untouched. A source
/// that failed stays dirty, so the next refresh retries the load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The load failed with a description and no underlying cause.
    #[error("load failed: {message}")]
    Message { message: String },

    /// The load failed because of an underlying error.
    #[error("load failed: {message}")]
    Source {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl LoadError {
    /// Create a load error from a description.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    /// Create a load error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Source {
            message: message.into(),
            source: source.into(),
        }
    }

    /// The human-readable description of the failure.
    pub fn description(&self) -> &str {
        match self {
            Self::Message { message } | Self::Source { message, .. } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_display() {
        let err = LoadError::message("connection reset");
        assert_eq!(err.to_string(), "load failed: connection reset");
        assert_eq!(err.description(), "connection reset");
    }

    #[test]
    fn test_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timed out");
        let err = LoadError::with_source("fetching page 3", io);

        assert_eq!(err.to_string(), "load failed: fetching page 3");
        let source = std::error::Error::source(&err).expect("source should be attached");
        assert_eq!(source.to_string(), "socket timed out");
    }
}
