use super::{compiled_entries, Classification, Manifest};
use std::collections::HashMap;

/// Immutable symbol → classification table
///
/// Built once during runtime initialization and only read afterwards, so
/// lookups from any thread need no synchronization. Symbols without an entry
/// are [`Classification::Unclassified`].
#[derive(Debug, Default)]
pub struct ClassificationRegistry {
    table: HashMap<String, Classification>,
}

impl ClassificationRegistry {
    /// Build a registry from `(symbol, classification)` pairs
    ///
    /// A symbol classified twice keeps the stricter classification
    /// (`Forbidden` over `Constrained` over `Unclassified`).
    pub fn from_entries<S, I>(entries: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Classification)>,
    {
        let mut table: HashMap<String, Classification> = HashMap::new();
        for (symbol, kind) in entries {
            let symbol = symbol.into();
            match table.get_mut(&symbol) {
                Some(existing) => {
                    if *existing != kind
                        && *existing != Classification::Unclassified
                        && kind != Classification::Unclassified
                    {
                        tracing::warn!(
                            symbol = %symbol,
                            first = %existing,
                            second = %kind,
                            "conflicting classifications, keeping the stricter one"
                        );
                    }
                    *existing = existing.merge(kind);
                }
                None => {
                    table.insert(symbol, kind);
                }
            }
        }
        Self { table }
    }

    /// Registry of the compiled-in annotations plus an optional manifest
    pub fn load(manifest: Option<&Manifest>) -> Self {
        let compiled = compiled_entries().map(|entry| (entry.symbol.to_string(), entry.kind));
        let loaded = manifest
            .into_iter()
            .flat_map(|m| m.entries())
            .map(|entry| (entry.symbol.clone(), entry.kind));
        Self::from_entries(compiled.chain(loaded))
    }

    /// Classification of `symbol`
    #[inline]
    pub fn classify(&self, symbol: &str) -> Classification {
        self.table.get(symbol).copied().unwrap_or_default()
    }

    /// Entries sorted by symbol
    pub fn entries(&self) -> Vec<(&str, Classification)> {
        let mut entries: Vec<_> = self
            .table
            .iter()
            .map(|(symbol, kind)| (symbol.as_str(), *kind))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
