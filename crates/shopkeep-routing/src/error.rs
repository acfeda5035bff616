use regex::Error as RegexError;
use shopkeep_core::Error as CoreError;
use std::io;
use std::result::Result as StdResult;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Result type for routing operations.
pub type Result<T> = StdResult<T, RoutingError>;

/// Errors that terminate a request.
///
/// Backend failures are not represented here: they are recorded on the
/// stage that hit them and the rest of the plan keeps running.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Backend layer error outside a stage
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Reading a file failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration file is not valid TOML
    #[error("TOML error: {0}")]
    Toml(#[from] TomlError),

    /// A cue or auxiliary pattern failed to compile
    #[error("Invalid cue pattern: {0}")]
    Pattern(#[from] RegexError),

    /// A plan stage is inconsistent with its plan
    #[error("Malformed plan stage: {0}")]
    MalformedStage(String),

    /// An intent name that is not recognized
    #[error("Unknown intent: {0}")]
    UnknownIntent(String),

    /// The caller cancelled the request
    #[error("Plan execution cancelled")]
    Cancelled,

    /// Configuration values failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl RoutingError {
    /// Internal inconsistencies that no retry can fix.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MalformedStage(_) | Self::UnknownIntent(_) | Self::Pattern(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_violations_are_fatal() {
        assert!(RoutingError::MalformedStage("stage 2 depends on stage 3".to_owned()).is_fatal());
        assert!(RoutingError::UnknownIntent("browse".to_owned()).is_fatal());
        assert!(!RoutingError::Cancelled.is_fatal());
        assert!(!RoutingError::Config("bad".to_owned()).is_fatal());
    }

    #[test]
    fn test_core_error_conversion() {
        let error: RoutingError = CoreError::Unavailable("neo4j".to_owned()).into();
        assert_eq!(error.to_string(), "Core error: backend unavailable: neo4j");
    }
}
