//! Runtime options from the `RTSAN_OPTIONS` environment variable
//!
//! Follows the sanitizer convention: `key=value` pairs separated by `:` or
//! whitespace, e.g. `RTSAN_OPTIONS=halt_on_error=0:suppressions=rt.supp`.
//! A value starting with `"` or `'` runs to the matching quote and may contain
//! separators: `suppressions="/opt/my rules/rt.supp"`.
//! Options are read once when the runtime initializes. Unknown keys and bad
//! values are logged and ignored so a typo never breaks the monitored program.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Environment variable holding the options string
pub const OPTIONS_ENV: &str = "RTSAN_OPTIONS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Process-wide switch; when false nothing is ever reported
    pub enabled: bool,
    /// Abort the process on the first unsuppressed violation
    pub halt_on_error: bool,
    /// Report each distinct stack only once
    pub suppress_equal_stacks: bool,
    /// Print violation counters when the process exits
    pub print_stats_on_exit: bool,
    /// Suppression file
    pub suppressions: Option<PathBuf>,
    /// TOML classification manifest
    pub manifest: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            enabled: true,
            halt_on_error: true,
            suppress_equal_stacks: true,
            print_stats_on_exit: false,
            suppressions: None,
            manifest: None,
        }
    }
}

impl Options {
    /// Read options from `RTSAN_OPTIONS`, falling back to defaults
    pub fn from_env() -> Self {
        match std::env::var(OPTIONS_ENV) {
            Ok(text) => Self::parse(&text),
            Err(_) => Self::default(),
        }
    }

    /// Parse an options string, skipping (and logging) invalid pairs
    pub fn parse(text: &str) -> Self {
        let mut options = Self::default();
        for pair in pairs(text) {
            if let Err(err) = pair.and_then(|(key, value)| options.apply(key, value)) {
                tracing::warn!(error = %err, "ignoring {} entry", OPTIONS_ENV);
            }
        }
        options
    }

    /// Parse an options string, failing on the first invalid pair
    pub fn parse_strict(text: &str) -> Result<Self> {
        let mut options = Self::default();
        for pair in pairs(text) {
            let (key, value) = pair?;
            options.apply(key, value)?;
        }
        Ok(options)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let flag = |value: &str| {
            parse_bool(value).ok_or_else(|| Error::Option {
                key: key.to_string(),
                reason: format!("expected a boolean, got `{}`", value),
            })
        };

        match key {
            "enabled" => self.enabled = flag(value)?,
            "halt_on_error" => self.halt_on_error = flag(value)?,
            "suppress_equal_stacks" => self.suppress_equal_stacks = flag(value)?,
            "print_stats_on_exit" => self.print_stats_on_exit = flag(value)?,
            "suppressions" => self.suppressions = non_empty_path(value),
            "manifest" => self.manifest = non_empty_path(value),
            _ => {
                return Err(Error::Option {
                    key: key.to_string(),
                    reason: "unknown option".to_string(),
                })
            }
        }
        Ok(())
    }

    /// Render back into `RTSAN_OPTIONS` syntax
    pub fn to_env_string(&self) -> String {
        let mut parts = vec![
            format!("enabled={}", self.enabled as u8),
            format!("halt_on_error={}", self.halt_on_error as u8),
            format!("suppress_equal_stacks={}", self.suppress_equal_stacks as u8),
            format!("print_stats_on_exit={}", self.print_stats_on_exit as u8),
        ];
        if let Some(path) = &self.suppressions {
            parts.push(format!("suppressions={}", quote(&path.display().to_string())));
        }
        if let Some(path) = &self.manifest {
            parts.push(format!("manifest={}", quote(&path.display().to_string())));
        }
        parts.join(":")
    }
}

fn is_separator(c: char) -> bool {
    c == ':' || c.is_whitespace()
}

/// Split an options string into `(key, value)` pairs, unquoting values
fn pairs(text: &str) -> Vec<Result<(&str, &str)>> {
    let mut pairs = Vec::new();
    let mut rest = text.trim_start_matches(is_separator);

    while !rest.is_empty() {
        let key_end = rest
            .find(|c: char| c == '=' || is_separator(c))
            .unwrap_or(rest.len());
        let key = &rest[..key_end];

        let Some(after) = rest[key_end..].strip_prefix('=') else {
            pairs.push(Err(Error::Option {
                key: key.to_string(),
                reason: "expected key=value".to_string(),
            }));
            rest = rest[key_end..].trim_start_matches(is_separator);
            continue;
        };

        let (value, remainder) = match after.chars().next() {
            Some(quote @ ('"' | '\'')) => match after[1..].find(quote) {
                Some(end) => (&after[1..end + 1], &after[end + 2..]),
                None => {
                    pairs.push(Err(Error::Option {
                        key: key.to_string(),
                        reason: format!("unterminated {} quote", quote),
                    }));
                    break;
                }
            },
            _ => {
                let end = after.find(is_separator).unwrap_or(after.len());
                (&after[..end], &after[end..])
            }
        };

        pairs.push(Ok((key, value)));
        rest = remainder.trim_start_matches(is_separator);
    }
    pairs
}

/// Quote a value when it would not survive [`pairs`] unquoted
fn quote(value: &str) -> String {
    if !value.starts_with(['"', '\'']) && !value.contains(is_separator) {
        value.to_string()
    } else if value.contains('"') {
        format!("'{}'", value)
    } else {
        format!("\"{}\"", value)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}
