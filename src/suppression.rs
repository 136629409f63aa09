//! Suppression rules for known or accepted violations
//!
//! A suppression file holds one rule per line, `<rule-kind>:<pattern>`:
//!
//! ```text
//! # third-party logger allocates once on first use
//! call-stack-contains:*logger::init*
//! function-name-matches:malloc
//! file-path-matches:*/vendor/*
//! ```
//!
//! Rule kinds are case-insensitive and accept both hyphenated and CamelCase
//! spellings (`CallStackContains`, `SymbolEquals`, `FilePath`). Patterns
//! containing `*` or `?` are anchored globs; plain patterns are exact for
//! symbol rules and substring matches for stack and file rules.
//!
//! Rules are evaluated in file order and the first match wins. Frames that
//! could not be symbolized never match.

use crate::error::{Error, Result};
use crate::violation::ViolationRecord;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// What a rule is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    /// Any resolved frame's function name
    CallStackContains,
    /// The violating symbol itself
    FunctionNameMatches,
    /// Any resolved frame's source file path
    FilePathMatches,
}

impl RuleKind {
    /// Parse a rule kind, ignoring case, `-` and `_`
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "callstackcontains" => Some(RuleKind::CallStackContains),
            "functionnamematches" | "symbolequals" => Some(RuleKind::FunctionNameMatches),
            "filepathmatches" | "filepath" => Some(RuleKind::FilePathMatches),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::CallStackContains => "call-stack-contains",
            RuleKind::FunctionNameMatches => "function-name-matches",
            RuleKind::FilePathMatches => "file-path-matches",
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Literal,
    Glob(Regex),
}

/// A compiled rule pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    matcher: Matcher,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self> {
        let matcher = if source.contains(|c: char| c == '*' || c == '?') {
            let regex = Regex::new(&glob_to_regex(source)).map_err(|e| Error::Pattern {
                pattern: source.to_string(),
                source: e,
            })?;
            Matcher::Glob(regex)
        } else {
            Matcher::Literal
        };

        Ok(Self {
            source: source.to_string(),
            matcher,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whole-string match
    pub fn matches_exact(&self, text: &str) -> bool {
        match &self.matcher {
            Matcher::Literal => text == self.source,
            Matcher::Glob(regex) => regex.is_match(text),
        }
    }

    /// Substring match for literals, whole-string for globs
    pub fn matches_within(&self, text: &str) -> bool {
        match &self.matcher {
            Matcher::Literal => text.contains(self.source.as_str()),
            Matcher::Glob(regex) => regex.is_match(text),
        }
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    let mut buf = [0u8; 4];
    for c in glob.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    out.push('$');
    out
}

/// A single `<rule-kind>:<pattern>` rule
#[derive(Debug, Clone, Serialize)]
pub struct SuppressionRule {
    pub kind: RuleKind,
    pub pattern: Pattern,
}

impl SuppressionRule {
    /// Parse one non-comment line
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let (kind, pattern) = line
            .split_once(':')
            .ok_or_else(|| format!("expected `<rule-kind>:<pattern>`, got `{}`", line))?;

        let kind = RuleKind::parse(kind.trim())
            .ok_or_else(|| format!("unknown rule kind `{}`", kind.trim()))?;

        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err("empty pattern".to_string());
        }
        let pattern = Pattern::new(pattern).map_err(|e| e.to_string())?;

        Ok(Self { kind, pattern })
    }

    /// Whether this rule covers the violation
    pub fn matches(&self, record: &ViolationRecord<'_>) -> bool {
        match self.kind {
            RuleKind::FunctionNameMatches => self.pattern.matches_exact(record.symbol),
            RuleKind::CallStackContains => record
                .stack
                .frames()
                .iter()
                .filter_map(|frame| frame.function.as_deref())
                .any(|name| self.pattern.matches_within(name)),
            RuleKind::FilePathMatches => record
                .stack
                .frames()
                .iter()
                .filter_map(|frame| frame.file.as_deref())
                .any(|file| self.pattern.matches_within(file)),
        }
    }
}

impl fmt::Display for SuppressionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.pattern.as_str())
    }
}

/// Ordered, immutable rule list
#[derive(Debug, Clone, Default)]
pub struct SuppressionList {
    rules: Vec<SuppressionRule>,
}

impl SuppressionList {
    /// A list that suppresses nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse rules, skipping (and logging) malformed lines
    pub fn parse(text: &str) -> Self {
        let mut rules = Vec::new();
        for (line_no, line) in rule_lines(text) {
            match SuppressionRule::parse(line) {
                Ok(rule) => rules.push(rule),
                Err(reason) => {
                    tracing::warn!(line = line_no, %reason, "ignoring malformed suppression rule");
                }
            }
        }
        Self { rules }
    }

    /// Parse rules, returning every malformed line as an error
    pub fn parse_strict(text: &str) -> std::result::Result<Self, Vec<Error>> {
        let mut rules = Vec::new();
        let mut errors = Vec::new();
        for (line_no, line) in rule_lines(text) {
            match SuppressionRule::parse(line) {
                Ok(rule) => rules.push(rule),
                Err(reason) => errors.push(Error::SuppressionParse {
                    line: line_no,
                    reason,
                }),
            }
        }

        if errors.is_empty() {
            Ok(Self { rules })
        } else {
            Err(errors)
        }
    }

    /// Load a suppression file. A missing or unreadable file is an empty list.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let list = Self::parse(&text);
                tracing::debug!(path = %path.display(), rules = list.len(), "loaded suppressions");
                list
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "suppression file unreadable, using no rules");
                Self::empty()
            }
        }
    }

    /// First rule covering the violation, if any
    pub fn should_suppress(&self, record: &ViolationRecord<'_>) -> Option<&SuppressionRule> {
        self.rules.iter().find(|rule| rule.matches(record))
    }

    pub fn rules(&self) -> &[SuppressionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Non-blank, non-comment lines with their 1-based line numbers
fn rule_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}
