use thiserror::Error;

/// Errors produced by the reading pipeline and its startup plumbing
#[derive(Error, Debug)]
pub enum TarotError {
    /// Caller-supplied input is malformed. The message is shown to the client as-is.
    #[error("{0}")]
    Validation(String),

    /// The completion provider failed or returned nothing usable.
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Reading timed out after {0} seconds")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TarotError {
    /// True when the caller can fix the problem by correcting the request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Gateway(_) => "gateway",
            Self::Timeout(_) => "timeout",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Yaml(_) => "yaml",
        }
    }
}

impl From<async_openai::error::OpenAIError> for TarotError {
    fn from(e: async_openai::error::OpenAIError) -> Self {
        Self::Gateway(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TarotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_validation_is_client_error() {
        assert!(TarotError::Validation("bad".into()).is_client_error());
        assert!(!TarotError::Gateway("down".into()).is_client_error());
        assert!(!TarotError::Timeout(60).is_client_error());
        assert!(!TarotError::Config("missing".into()).is_client_error());
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = TarotError::Validation("Exactly 3 cards must be selected".into());
        assert_eq!(err.to_string(), "Exactly 3 cards must be selected");
        assert_eq!(err.kind(), "validation");
    }
}
