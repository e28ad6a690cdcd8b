//! Heuristic resolution of the optional `json_len` field ("schema drift"):
//! the JSON-sidecar descriptor following the 25 fixed record fields is
//! either the 5-field new style (`json_len`, `json_size`, `json_cs_algo`)
//! or the 4-field legacy style (`json_size`, `json_cs_algo`, `json_cs_value`),
//! distinguished only by inspecting the shape of the following values.
//!
//! Grounded in the same "inspect the value, then decide" heuristic the
//! teacher uses in `header.rs::read` to tell apart the fixed
//! `checksum_algo` code from the variable-length `CHECKSUM_ALGO_OTHER` name
//! that follows it.

use crate::checksum::ChecksumAlgo;
use crate::codec::hex_decode;
use crate::error::{NeoFileError, Result};

/// Index of the first field after the 25 fixed prefix fields: `json_type`.
pub const JSON_TYPE_INDEX: usize = 25;

/// The JSON-sidecar descriptor, resolved from either field layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonDescriptor {
    pub json_type: String,
    pub json_len: Option<u64>,
    pub json_size: u64,
    pub json_checksum_algo: ChecksumAlgo,
    pub json_checksum_value: String,
    /// Index of the first field after this descriptor (`extras_size`).
    pub next_index: usize,
}

fn is_hex(s: &str) -> bool {
    let s = s.trim();
    s.is_empty() || s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Resolve the descriptor starting at `JSON_TYPE_INDEX` out of the full
/// field vector read for a record.
pub fn resolve(fields: &[String]) -> Result<JsonDescriptor> {
    if fields.len() < JSON_TYPE_INDEX + 1 {
        return Err(NeoFileError::MalformedRecord(
            "record has fewer than 25 fixed header fields".to_string(),
        ));
    }
    let json_type = fields[JSON_TYPE_INDEX].clone();

    let a = fields.get(JSON_TYPE_INDEX + 1);
    let b = fields.get(JSON_TYPE_INDEX + 2);
    let c = fields.get(JSON_TYPE_INDEX + 3);

    let looks_new_style = match (a, b, c) {
        (Some(a), Some(b), Some(c)) => {
            is_hex(a) && is_hex(b) && ChecksumAlgo::parse(c).is_ok()
        }
        _ => false,
    };

    if looks_new_style {
        let json_len = hex_decode(&fields[JSON_TYPE_INDEX + 1])?;
        let json_size = hex_decode(&fields[JSON_TYPE_INDEX + 2])?;
        let json_checksum_algo = ChecksumAlgo::parse(&fields[JSON_TYPE_INDEX + 3])?;
        let json_checksum_value = fields
            .get(JSON_TYPE_INDEX + 4)
            .cloned()
            .ok_or_else(|| NeoFileError::MalformedRecord("missing json_cs_value".to_string()))?;
        Ok(JsonDescriptor {
            json_type,
            json_len: Some(json_len),
            json_size,
            json_checksum_algo,
            json_checksum_value,
            next_index: JSON_TYPE_INDEX + 5,
        })
    } else {
        let json_size = hex_decode(
            fields
                .get(JSON_TYPE_INDEX + 1)
                .ok_or_else(|| NeoFileError::MalformedRecord("missing json_size".to_string()))?,
        )?;
        let json_checksum_algo = ChecksumAlgo::parse(fields.get(JSON_TYPE_INDEX + 2).ok_or_else(
            || NeoFileError::MalformedRecord("missing json_cs_algo".to_string()),
        )?)?;
        let json_checksum_value = fields
            .get(JSON_TYPE_INDEX + 3)
            .cloned()
            .ok_or_else(|| NeoFileError::MalformedRecord("missing json_cs_value".to_string()))?;
        Ok(JsonDescriptor {
            json_type,
            json_len: None,
            json_size,
            json_checksum_algo,
            json_checksum_value,
            next_index: JSON_TYPE_INDEX + 4,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields25() -> Vec<String> {
        (0..25).map(|i| i.to_string()).collect()
    }

    #[test]
    fn resolves_new_style_five_field_descriptor() {
        let mut fields = fields25();
        fields.push("dict".to_string()); // json_type
        fields.push("3".to_string()); // json_len
        fields.push("2a".to_string()); // json_size
        fields.push("sha256".to_string()); // json_cs_algo
        fields.push("deadbeef".to_string()); // json_cs_value
        let d = resolve(&fields).unwrap();
        assert_eq!(d.json_len, Some(3));
        assert_eq!(d.json_size, 0x2a);
        assert_eq!(d.json_checksum_algo, ChecksumAlgo::Sha256);
        assert_eq!(d.next_index, 30);
    }

    #[test]
    fn resolves_legacy_four_field_descriptor() {
        let mut fields = fields25();
        fields.push("dict".to_string()); // json_type
        fields.push("2a".to_string()); // json_size
        fields.push("sha256".to_string()); // json_cs_algo
        fields.push("deadbeef".to_string()); // json_cs_value
        let d = resolve(&fields).unwrap();
        assert_eq!(d.json_len, None);
        assert_eq!(d.json_size, 0x2a);
        assert_eq!(d.json_checksum_algo, ChecksumAlgo::Sha256);
        assert_eq!(d.next_index, 29);
    }

    #[test]
    fn fewer_than_25_fields_is_malformed() {
        let fields: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        let err = resolve(&fields).unwrap_err();
        assert!(matches!(err, NeoFileError::MalformedRecord(_)));
    }

    #[test]
    fn legacy_json_size_that_happens_to_parse_as_non_hex_is_still_legacy() {
        // position 28 (checksum algo slot) is not a known algorithm name,
        // so position 26 must be json_size even though it looks like hex.
        let mut fields = fields25();
        fields.push("dict".to_string());
        fields.push("ff".to_string());
        fields.push("notanalgo".to_string());
        fields.push("cafebabe".to_string());
        let d = resolve(&fields).unwrap();
        assert_eq!(d.json_len, None);
        assert_eq!(d.json_size, 0xff);
    }
}
