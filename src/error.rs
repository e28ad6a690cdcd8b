//! Error taxonomy for the codec and driver layers.

use thiserror::Error;

/// Where a checksum mismatch was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumScope {
    Header,
    Json,
    Content,
}

impl std::fmt::Display for ChecksumScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header => write!(f, "header"),
            Self::Json => write!(f, "json"),
            Self::Content => write!(f, "content"),
        }
    }
}

/// Errors produced by the codec and driver.
#[derive(Debug, Error)]
pub enum NeoFileError {
    #[error("malformed global header: {0}")]
    MalformedHeader(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("{scope} checksum mismatch{}", entry.as_ref().map(|n| format!(" for {n}")).unwrap_or_default())]
    ChecksumMismatch {
        scope: ChecksumScope,
        entry: Option<String>,
    },

    #[error("unsupported checksum algorithm: {name}")]
    UnsupportedChecksum { name: String },

    #[error("unsupported compression algorithm: {name}")]
    UnsupportedCompression { name: String },

    #[error("failed to decompress entry {entry} with {algo}")]
    DecompressFailed { algo: String, entry: String },

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NeoFileError>;
