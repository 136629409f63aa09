//! Offline symbolization of raw report addresses
//!
//! A report from a stripped or symbol-less deployment prints frame addresses
//! with `<unknown>` names. `rtsan symbolize` maps those addresses back to
//! functions and source lines using the DWARF sections of an unstripped copy
//! of the binary.

use anyhow::{Context, Result};
use object::{Object, ObjectSection};
use std::fmt;
use std::fs::File;
use std::path::Path;

/// One function frame at an address (inlined callers produce several)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub function: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.function.as_deref().unwrap_or("<unknown>"))?;
        if let Some(file) = &self.file {
            write!(f, " {}", file)?;
            if let Some(line) = self.line {
                write!(f, ":{}", line)?;
                if let Some(column) = self.column {
                    write!(f, ":{}", column)?;
                }
            }
        }
        Ok(())
    }
}

/// DWARF context for one binary
pub struct Symbolizer {
    context: addr2line::Context<gimli::EndianRcSlice<gimli::RunTimeEndian>>,
}

impl Symbolizer {
    /// Load the DWARF sections of an ELF binary
    pub fn load(binary_path: &Path) -> Result<Self> {
        let file = File::open(binary_path)
            .with_context(|| format!("Failed to open binary: {}", binary_path.display()))?;

        // SAFETY: read-only mapping; the file is not modified while mapped
        let mmap = unsafe { memmap2::Mmap::map(&file) }.context("Failed to memory-map binary")?;

        let object = object::File::parse(&*mmap).context("Failed to parse object file")?;

        let endian = if object.is_little_endian() {
            gimli::RunTimeEndian::Little
        } else {
            gimli::RunTimeEndian::Big
        };

        let load_section =
            |id: gimli::SectionId| -> Result<gimli::EndianRcSlice<gimli::RunTimeEndian>> {
                let data = object
                    .section_by_name(id.name())
                    .and_then(|section| section.uncompressed_data().ok())
                    .unwrap_or(std::borrow::Cow::Borrowed(&[]));
                let bytes: std::rc::Rc<[u8]> = std::rc::Rc::from(data.into_owned());
                Ok(gimli::EndianRcSlice::new(bytes, endian))
            };

        let dwarf = gimli::Dwarf::load(&load_section)
            .context("Failed to load DWARF sections (is the binary stripped?)")?;

        let context =
            addr2line::Context::from_dwarf(dwarf).context("Failed to create DWARF context")?;

        tracing::debug!(binary = %binary_path.display(), "loaded DWARF context");
        Ok(Self { context })
    }

    /// All frames at `address`, innermost inlined function first
    ///
    /// `address` is relative to the binary's link-time base: subtract the load
    /// bias of position-independent executables before calling this.
    pub fn resolve(&self, address: u64) -> Result<Vec<SourceLocation>> {
        let mut frames = self
            .context
            .find_frames(address)
            .skip_all_loads()
            .with_context(|| format!("Failed to read frames at {:#x}", address))?;

        let mut resolved = Vec::new();
        while let Some(frame) = frames
            .next()
            .with_context(|| format!("Corrupt DWARF at {:#x}", address))?
        {
            let function = frame
                .function
                .as_ref()
                .and_then(|name| name.demangle().ok())
                .map(|name| name.into_owned());
            let (file, line, column) = match frame.location {
                Some(location) => (location.file.map(str::to_string), location.line, location.column),
                None => (None, None, None),
            };
            resolved.push(SourceLocation {
                function,
                file,
                line,
                column,
            });
        }

        if resolved.is_empty() {
            if let Some(location) = self.context.find_location(address).ok().flatten() {
                resolved.push(SourceLocation {
                    function: None,
                    file: location.file.map(str::to_string),
                    line: location.line,
                    column: location.column,
                });
            }
        }
        Ok(resolved)
    }
}

/// Parse an address as printed in reports (`0x` prefix optional)
pub fn parse_address(text: &str) -> Result<u64> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u64::from_str_radix(digits, 16).with_context(|| format!("Invalid address: {}", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_forms() {
        assert_eq!(parse_address("0x000055d0c3a1b2c4").unwrap(), 0x55d0c3a1b2c4);
        assert_eq!(parse_address("1f").unwrap(), 0x1f);
        assert_eq!(parse_address("0XFF").unwrap(), 0xff);
        assert!(parse_address("0xnothex").is_err());
        assert!(parse_address("").is_err());
    }

    #[test]
    fn test_load_missing_binary_fails() {
        let err = Symbolizer::load(Path::new("/nonexistent/binary")).err().unwrap();
        assert!(err.to_string().contains("Failed to open binary"));
    }

    #[test]
    fn test_load_non_object_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not an object file").unwrap();
        assert!(Symbolizer::load(file.path()).is_err());
    }

    #[test]
    fn test_resolve_on_test_binary() {
        let exe = std::env::current_exe().unwrap();
        let symbolizer = Symbolizer::load(&exe).unwrap();
        // Address zero lies outside every compilation unit
        assert!(symbolizer.resolve(0).unwrap().is_empty());
    }

    #[test]
    fn test_location_display() {
        let location = SourceLocation {
            function: Some("audio::render".into()),
            file: Some("src/audio.rs".into()),
            line: Some(12),
            column: Some(5),
        };
        assert_eq!(location.to_string(), "audio::render src/audio.rs:12:5");

        let unknown = SourceLocation {
            function: None,
            file: None,
            line: None,
            column: None,
        };
        assert_eq!(unknown.to_string(), "<unknown>");
    }
}
