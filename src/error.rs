//! Error types for loading runtime configuration
//!
//! The detection engine itself has no error path. These errors only surface
//! from the strict loaders used by the CLI; the runtime logs and skips them.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A `key=value` pair in `RTSAN_OPTIONS` that could not be applied
    #[error("invalid option `{key}`: {reason}")]
    Option { key: String, reason: String },

    /// A malformed line in a suppression file (1-based line number)
    #[error("line {line}: {reason}")]
    SuppressionParse { line: usize, reason: String },

    /// A suppression pattern that does not compile
    #[error("invalid pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A classification manifest entry that cannot be resolved
    #[error("manifest entry {index}: {reason}")]
    ManifestEntry { index: usize, reason: String },

    #[error("failed to parse manifest: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_error_display() {
        let err = Error::Option {
            key: "halt_on_error".to_string(),
            reason: "expected a boolean".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid option `halt_on_error`: expected a boolean"
        );
    }

    #[test]
    fn test_suppression_error_display() {
        let err = Error::SuppressionParse {
            line: 3,
            reason: "missing ':'".to_string(),
        };
        assert_eq!(err.to_string(), "line 3: missing ':'");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
