//! Resolved archive configuration, threaded explicitly through every call.
//!
//! Replaces the "global INI cache" pattern flagged in the design notes: no
//! process-wide mutable state, no hidden defaults resolved at first use.
//! Shaped like the teacher's `ArchiveOptions`/`builder::Options` — an
//! immutable struct built via chained setters and consumed by value.

use crate::codec::unescape;
use crate::error::Result;

/// Resolved archive wire-format configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    magic: String,
    version_digits: String,
    delimiter: Vec<u8>,
    new_style: bool,
}

const DEFAULT_MAGIC: &str = "NeoFile";
const DEFAULT_VERSION_DIGITS: &str = "001";
const DEFAULT_DELIMITER: u8 = 0x00;

impl FormatSpec {
    /// The default configuration: `magic="NeoFile"`, `version_digits="001"`,
    /// `delimiter=0x00`, `new_style=true`.
    pub fn new() -> Self {
        Self {
            magic: DEFAULT_MAGIC.to_string(),
            version_digits: DEFAULT_VERSION_DIGITS.to_string(),
            delimiter: vec![DEFAULT_DELIMITER],
            new_style: true,
        }
    }

    pub fn magic(mut self, value: impl Into<String>) -> Self {
        self.magic = value.into();
        self
    }

    /// Override version digits; falls back to `"001"` if `value` yields no
    /// digits at all.
    pub fn version_digits(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
        self.version_digits = if digits.is_empty() {
            DEFAULT_VERSION_DIGITS.to_string()
        } else {
            digits
        };
        self
    }

    pub fn delimiter_bytes(mut self, value: Vec<u8>) -> Self {
        self.delimiter = value;
        self
    }

    /// Accept a delimiter expressed as escaped text (`"\\x00"`, `"\\n"`, ...).
    pub fn delimiter_escaped(mut self, value: &str) -> Result<Self> {
        self.delimiter = unescape(value)?;
        Ok(self)
    }

    pub fn new_style(mut self, value: bool) -> Self {
        self.new_style = value;
        self
    }

    pub fn magic_str(&self) -> &str {
        &self.magic
    }

    pub fn version_digits_str(&self) -> &str {
        &self.version_digits
    }

    pub fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }

    pub fn is_new_style(&self) -> bool {
        self.new_style
    }
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_configuration() {
        let spec = FormatSpec::default();
        assert_eq!(spec.magic_str(), "NeoFile");
        assert_eq!(spec.version_digits_str(), "001");
        assert_eq!(spec.delimiter(), &[0x00]);
        assert!(spec.is_new_style());
    }

    #[test]
    fn version_digits_falls_back_when_source_yields_none() {
        let spec = FormatSpec::new().version_digits("no-digits-here");
        assert_eq!(spec.version_digits_str(), "001");
    }

    #[test]
    fn version_digits_extracts_digits_from_mixed_input() {
        let spec = FormatSpec::new().version_digits("v1.2.3");
        assert_eq!(spec.version_digits_str(), "123");
    }

    #[test]
    fn delimiter_escaped_accepts_hex_escape() {
        let spec = FormatSpec::new().delimiter_escaped("\\x00").unwrap();
        assert_eq!(spec.delimiter(), &[0x00]);
    }

    #[test]
    fn legacy_magic_is_an_explicit_override() {
        let spec = FormatSpec::new().magic("ArchiveFile");
        assert_eq!(spec.magic_str(), "ArchiveFile");
    }
}
