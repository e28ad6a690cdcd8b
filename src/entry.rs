//! Normalized in-memory representation of a single archived entry.
//!
//! Replaces the "associative array as entry" anti-pattern the design notes
//! flag: every field from `spec.md` §3 is a named struct field, and the
//! JSON sidecar is a closed, tagged enum (absent | object | decoded value)
//! instead of a loosely-typed map — the same move the teacher makes going
//! from XAR's untyped `<file>` XML element to its own `xml::File` struct.

use serde_json::{Map, Value};

use crate::checksum::ChecksumAlgo;
use crate::compression::Compression;
use crate::error::ChecksumScope;
use crate::file_type::FileType;

/// One checksum algorithm/value pair, used three times per entry (header,
/// content, JSON sidecar), per the checksum-triple invariant in `spec.md`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChecksumPair {
    pub algo: ChecksumAlgo,
    pub value: String,
}

impl ChecksumPair {
    pub fn new(algo: ChecksumAlgo, value: impl Into<String>) -> Self {
        Self {
            algo,
            value: value.into(),
        }
    }

    pub fn compute(algo: ChecksumAlgo, data: &[u8]) -> Self {
        Self {
            value: algo.digest(data),
            algo,
        }
    }

    pub fn matches(&self, data: &[u8]) -> bool {
        self.algo.verify(data, &self.value)
    }
}

/// The JSON sidecar attached to a record: either absent (serialized as an
/// empty object), a plain key/value object, or an arbitrary decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonSidecar {
    Absent,
    Object(Map<String, Value>),
    Value(Value),
}

impl Default for JsonSidecar {
    fn default() -> Self {
        Self::Absent
    }
}

impl JsonSidecar {
    /// Serialize to the raw JSON bytes stored on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Absent => b"{}".to_vec(),
            Self::Object(map) => serde_json::to_vec(map).unwrap_or_else(|_| b"{}".to_vec()),
            Self::Value(value) => serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec()),
        }
    }

    /// Decode raw JSON bytes back into a sidecar. Empty input and `{}`
    /// both decode to `Absent`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::Absent;
        }
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) if map.is_empty() => Self::Absent,
            Ok(Value::Object(map)) => Self::Object(map),
            Ok(value) => Self::Value(value),
            Err(_) => Self::Absent,
        }
    }

    /// Number of top-level keys, used for the new-style `json_len` field.
    /// Non-object sidecars report zero keys.
    pub fn key_count(&self) -> usize {
        match self {
            Self::Absent => 0,
            Self::Object(map) => map.len(),
            Self::Value(_) => 0,
        }
    }

    /// Coarse type tag written as `json_type`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Absent => "dict",
            Self::Object(_) => "dict",
            Self::Value(Value::Array(_)) => "list",
            Self::Value(Value::String(_)) => "str",
            Self::Value(Value::Number(n)) if n.is_i64() || n.is_u64() => "int",
            Self::Value(Value::Number(_)) => "float",
            Self::Value(Value::Bool(_)) => "bool",
            Self::Value(Value::Null) => "null",
            Self::Value(Value::Object(_)) => "dict",
        }
    }
}

/// Prepend `./` if `name` starts with neither `./` nor `/`, per the
/// `fname` normalization invariant.
pub fn normalize_fname(name: &str) -> String {
    if name.starts_with("./") || name.starts_with('/') {
        name.to_string()
    } else {
        format!("./{name}")
    }
}

/// One archived entry (file, directory, symlink, device node, ...).
#[derive(Debug, Clone)]
pub struct Entry {
    // Identity
    pub fid: u64,
    pub finode: u64,

    // Naming
    pub fname: String,
    pub flinkname: String,

    // Type
    pub ftype: FileType,

    // Sizes: logical and stored byte counts
    pub fsize: u64,
    pub fcsize: u64,

    // Times
    pub fatime: u64,
    pub fmtime: u64,
    pub fctime: u64,
    pub fbtime: u64,

    // Permissions
    pub fmode: u32,
    pub fwinattributes: u64,

    // Ownership
    pub fuid: u32,
    pub funame: String,
    pub fgid: u32,
    pub fgname: String,

    // Links
    pub flinkcount: u64,
    pub fdev: u64,
    pub fdev_minor: u64,
    pub fdev_major: u64,

    // Compression
    pub fcompression: Compression,

    // Encoding
    pub fencoding: String,
    pub fcencoding: String,

    /// Opaque seek hint, written as `"+" + delimiter_length` and ignored
    /// on read. Retained verbatim for wire compatibility; never used to
    /// derive seek offsets.
    pub fseeknext: String,

    pub fjson: JsonSidecar,

    /// Extra vendor strings carried alongside the fixed fields, mirroring
    /// the global header's own `extras` list.
    pub extras: Vec<String>,

    /// Logical content bytes after decompression, or `None` when listing
    /// only (payload not read) or for entries with no content region.
    pub fcontent: Option<Vec<u8>>,

    pub header_checksum: ChecksumPair,
    pub content_checksum: ChecksumPair,
    pub json_checksum: ChecksumPair,

    /// Set when a read with `uncompress` requested failed to decompress
    /// the stored bytes; `fcontent` then holds the still-compressed bytes.
    pub decompression_failed: bool,

    /// Checksum scopes that failed verification when the record was read
    /// with `RecordOptions::collect_errors` set, instead of aborting the
    /// read. Empty when every checked scope verified (or none were checked).
    pub checksum_errors: Vec<ChecksumScope>,
}

impl Entry {
    /// A new entry with the given name and type and every other field at
    /// its zero/default value.
    pub fn new(fname: impl Into<String>, ftype: FileType) -> Self {
        Self {
            fid: 0,
            finode: 0,
            fname: normalize_fname(&fname.into()),
            flinkname: String::new(),
            ftype,
            fsize: 0,
            fcsize: 0,
            fatime: 0,
            fmtime: 0,
            fctime: 0,
            fbtime: 0,
            fmode: 0o644,
            fwinattributes: 0,
            fuid: 0,
            funame: String::new(),
            fgid: 0,
            fgname: String::new(),
            flinkcount: 1,
            fdev: 0,
            fdev_minor: 0,
            fdev_major: 0,
            fcompression: Compression::None,
            fencoding: "UTF-8".to_string(),
            fcencoding: "UTF-8".to_string(),
            fseeknext: String::new(),
            fjson: JsonSidecar::Absent,
            extras: Vec::new(),
            fcontent: None,
            header_checksum: ChecksumPair::default(),
            content_checksum: ChecksumPair::default(),
            json_checksum: ChecksumPair::default(),
            decompression_failed: false,
            checksum_errors: Vec::new(),
        }
    }

    /// Number of stored-region bytes per the invariant:
    /// compressed + non-empty `fcsize` -> `fcsize`, else `fsize`.
    pub fn stored_len(&self) -> u64 {
        if self.fcompression != Compression::None && self.fcsize > 0 {
            self.fcsize
        } else {
            self.fsize
        }
    }
}
