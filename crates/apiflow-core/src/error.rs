//! Error handling for the apiflow core model.
//!
//! This module defines the main error type `Error` used throughout the library,
//! along with a convenient `Result` type alias. It uses `thiserror` for easy
//! error handling and implements conversions from common error types.
//!
//! Generation prefers degrading to an empty value over failing, so most
//! variants here surface either caller bugs (merging unrelated parameters)
//! or malformed input (unparsable URLs, invalid patterns).
//!
//! # Examples
//!
//! ```
//! use apiflow_core::error::{Error, Result};
//!
//! fn might_fail() -> Result<()> {
//!     Err(Error::invalid_url("   "))
//! }
//!
//! assert!(might_fail().is_err());
//! ```

use thiserror::Error;

/// Result type for apiflow model operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for apiflow model operations
#[derive(Debug, Error)]
pub enum Error {
    /// Two parameters with different keys were merged
    #[error("cannot merge parameter {left:?} with parameter {right:?}: keys differ")]
    KeyMismatch {
        left: Option<String>,
        right: Option<String>,
    },

    /// A constraint cannot synthesize an example value
    #[error("constraint cannot generate a value: {0}")]
    UngenerableConstraint(String),

    /// A URL string could not be split into components
    #[error("invalid URL string: {0}")]
    InvalidUrl(String),

    /// A pattern constraint holds an invalid regular expression
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A generated URL was rejected by the standard URL parser
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON conversion error
    #[error("JSON conversion error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new invalid URL error
    pub fn invalid_url<S: Into<String>>(msg: S) -> Self {
        Self::InvalidUrl(msg.into())
    }

    /// Create a new ungenerable constraint error
    pub fn ungenerable<S: Into<String>>(msg: S) -> Self {
        Self::UngenerableConstraint(msg.into())
    }

    /// Create a key mismatch error from the two offending keys
    pub fn key_mismatch(left: Option<&str>, right: Option<&str>) -> Self {
        Self::KeyMismatch {
            left: left.map(String::from),
            right: right.map(String::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mismatch_message() {
        let err = Error::key_mismatch(Some("port"), None);
        assert_eq!(
            err.to_string(),
            "cannot merge parameter Some(\"port\") with parameter None: keys differ"
        );
    }

    #[test]
    fn test_invalid_pattern_keeps_source() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = Error::InvalidPattern {
            pattern: "(".to_string(),
            source,
        };
        assert!(std::error::Error::source(&err).is_some());
    }
}
