use super::Classification;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// One resolved manifest entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub symbol: String,
    pub kind: Classification,
}

/// Load-time classification manifest
///
/// # Example TOML
/// ```toml
/// [[function]]
/// symbol = "audio::engine::render"
/// kind = "constrained"
///
/// [[function]]
/// symbol = "audio::engine::wait_for_buffer"
/// kind = "forbidden"
/// ```
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(default)]
    function: Vec<RawEntry>,
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    kind: String,
}

impl Manifest {
    /// Parse manifest text
    ///
    /// Invalid TOML fails the whole manifest. Individual entries that cannot be
    /// resolved (empty symbol, unknown kind) are returned as rejections and
    /// left out of the manifest.
    pub fn parse(text: &str) -> Result<(Self, Vec<Error>)> {
        let raw: RawManifest = toml::from_str(text)?;

        let mut entries = Vec::with_capacity(raw.function.len());
        let mut rejected = Vec::new();
        for (index, entry) in raw.function.into_iter().enumerate() {
            let symbol = entry.symbol.trim();
            if symbol.is_empty() {
                rejected.push(Error::ManifestEntry {
                    index,
                    reason: "missing symbol".to_string(),
                });
                continue;
            }
            match Classification::parse(&entry.kind) {
                Some(kind) => entries.push(ManifestEntry {
                    symbol: symbol.to_string(),
                    kind,
                }),
                None => rejected.push(Error::ManifestEntry {
                    index,
                    reason: format!("unknown kind `{}` for `{}`", entry.kind, symbol),
                }),
            }
        }

        Ok((Self { entries }, rejected))
    }

    /// Load a manifest file, ignoring anything that cannot be used
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "manifest unreadable, ignoring");
                return Self::default();
            }
        };

        match Self::parse(&text) {
            Ok((manifest, rejected)) => {
                for err in rejected {
                    tracing::warn!(path = %path.display(), error = %err, "ignoring manifest entry");
                }
                tracing::debug!(path = %path.display(), entries = manifest.len(), "loaded manifest");
                manifest
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "manifest invalid, ignoring");
                Self::default()
            }
        }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
