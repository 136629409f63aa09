// Tests for the classification registry and manifest loading

use super::*;
use std::io::Write;
use tempfile::NamedTempFile;

crate::nonblocking! {
    fn annotated_entry_point() -> u32 {
        crate::context::realtime_depth()
    }
}

crate::blocking! {
    fn annotated_spin_wait() {}
}

#[test]
fn test_compiled_entries_collected() {
    let constrained = concat!(module_path!(), "::annotated_entry_point");
    let forbidden = concat!(module_path!(), "::annotated_spin_wait");

    let entries: Vec<_> = compiled_entries().collect();
    assert!(entries
        .iter()
        .any(|e| e.symbol == constrained && e.kind == Classification::Constrained));
    assert!(entries
        .iter()
        .any(|e| e.symbol == forbidden && e.kind == Classification::Forbidden));
}

#[test]
#[cfg(feature = "enabled")]
fn test_annotated_function_runs_in_region() {
    assert_eq!(annotated_entry_point(), 1);
    assert_eq!(crate::context::realtime_depth(), 0);
}

#[test]
fn test_forbidden_outside_region_is_silent() {
    // No region is active, so the prologue must simply fall through
    annotated_spin_wait();
}

#[test]
fn test_registry_includes_compiled_entries() {
    let registry = ClassificationRegistry::load(None);
    assert_eq!(
        registry.classify(concat!(module_path!(), "::annotated_entry_point")),
        Classification::Constrained
    );
    assert_eq!(
        registry.classify(concat!(module_path!(), "::annotated_spin_wait")),
        Classification::Forbidden
    );
}

#[test]
fn test_unknown_symbol_is_unclassified() {
    let registry = ClassificationRegistry::from_entries(vec![("a::b", Classification::Forbidden)]);
    assert_eq!(registry.classify("a::c"), Classification::Unclassified);
    assert_eq!(registry.classify(""), Classification::Unclassified);
}

#[test]
fn test_conflicts_keep_stricter() {
    let registry = ClassificationRegistry::from_entries(vec![
        ("dsp::mix", Classification::Constrained),
        ("dsp::mix", Classification::Forbidden),
        ("dsp::gain", Classification::Constrained),
        ("dsp::gain", Classification::Unclassified),
    ]);
    assert_eq!(registry.classify("dsp::mix"), Classification::Forbidden);
    assert_eq!(registry.classify("dsp::gain"), Classification::Constrained);
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_entries_sorted() {
    let registry = ClassificationRegistry::from_entries(vec![
        ("z::last", Classification::Forbidden),
        ("a::first", Classification::Constrained),
    ]);
    let symbols: Vec<_> = registry.entries().into_iter().map(|(s, _)| s).collect();
    assert_eq!(symbols, vec!["a::first", "z::last"]);
}

#[test]
fn test_classification_parse_spellings() {
    assert_eq!(Classification::parse("Constrained"), Some(Classification::Constrained));
    assert_eq!(Classification::parse("nonblocking"), Some(Classification::Constrained));
    assert_eq!(Classification::parse("blocking"), Some(Classification::Forbidden));
    assert_eq!(Classification::parse("none"), Some(Classification::Unclassified));
    assert_eq!(Classification::parse("sometimes"), None);
}

#[test]
fn test_manifest_parse() {
    let text = r#"
[[function]]
symbol = "audio::render"
kind = "constrained"

[[function]]
symbol = "audio::wait_for_buffer"
kind = "forbidden"
"#;
    let (manifest, rejected) = Manifest::parse(text).unwrap();
    assert!(rejected.is_empty());
    assert_eq!(manifest.len(), 2);
    assert_eq!(manifest.entries()[1].kind, Classification::Forbidden);
}

#[test]
fn test_manifest_rejects_unresolvable_entries() {
    let text = r#"
[[function]]
symbol = ""
kind = "forbidden"

[[function]]
symbol = "audio::mix"
kind = "sometimes"

[[function]]
symbol = "audio::render"
kind = "realtime"
"#;
    let (manifest, rejected) = Manifest::parse(text).unwrap();
    assert_eq!(manifest.len(), 1);
    assert_eq!(rejected.len(), 2);
    assert_eq!(manifest.entries()[0].symbol, "audio::render");
}

#[test]
fn test_manifest_invalid_toml() {
    assert!(Manifest::parse("[[function]\nsymbol =").is_err());
}

#[test]
fn test_manifest_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[[function]]\nsymbol = \"io::flush\"\nkind = \"forbidden\"").unwrap();

    let manifest = Manifest::load(file.path());
    let registry = ClassificationRegistry::load(Some(&manifest));
    assert_eq!(registry.classify("io::flush"), Classification::Forbidden);
}

#[test]
fn test_manifest_load_missing_file_is_empty() {
    let manifest = Manifest::load(std::path::Path::new("/nonexistent/rtsan/manifest.toml"));
    assert!(manifest.is_empty());
}

#[test]
fn test_manifest_load_garbage_is_empty() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "this is = = not toml").unwrap();
    assert!(Manifest::load(file.path()).is_empty());
}
