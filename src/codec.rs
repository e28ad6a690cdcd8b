//! Hex integers, null-delimited field framing, escape decoding, and
//! field-list assembly. The free-function style mirrors the teacher's
//! `header.rs` (`u16_read`/`u32_read`/`u64_read`), but these operate on the
//! text-first wire format instead of raw big-endian integers.

use crate::error::{NeoFileError, Result};
use crate::stream::ByteStream;

/// Encode a non-negative integer as lowercase hex, unpadded, no prefix.
pub fn hex_encode(n: u64) -> String {
    format!("{n:x}")
}

/// Parse hex text (any case) into an integer. An empty string parses to 0.
pub fn hex_decode(s: &str) -> Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(s, 16)
        .map_err(|_| NeoFileError::MalformedRecord(format!("not a hex integer: {s:?}")))
}

/// Decode `\xNN` and the common C escapes in a delimiter expressed as
/// external configuration text, e.g. `"\\x00"` -> `[0x00]`.
pub fn unescape(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let next = bytes.get(i + 1).copied().ok_or_else(|| {
            NeoFileError::MalformedRecord("dangling escape in delimiter spec".to_string())
        })?;
        match next {
            b'x' => {
                let hex = bytes
                    .get(i + 2..i + 4)
                    .and_then(|b| std::str::from_utf8(b).ok())
                    .ok_or_else(|| {
                        NeoFileError::MalformedRecord("incomplete \\xNN escape".to_string())
                    })?;
                let value = u8::from_str_radix(hex, 16).map_err(|_| {
                    NeoFileError::MalformedRecord(format!("invalid \\x escape: {hex:?}"))
                })?;
                out.push(value);
                i += 4;
            }
            b'0' => {
                out.push(0);
                i += 2;
            }
            b'n' => {
                out.push(b'\n');
                i += 2;
            }
            b'r' => {
                out.push(b'\r');
                i += 2;
            }
            b't' => {
                out.push(b'\t');
                i += 2;
            }
            b'\\' => {
                out.push(b'\\');
                i += 2;
            }
            b'"' => {
                out.push(b'"');
                i += 2;
            }
            b'\'' => {
                out.push(b'\'');
                i += 2;
            }
            other => {
                return Err(NeoFileError::MalformedRecord(format!(
                    "unknown escape sequence: \\{}",
                    other as char
                )))
            }
        }
    }
    Ok(out)
}

/// A single delimited field: payload bytes followed by the delimiter.
/// Payloads must not themselves contain the delimiter; delimiters are
/// never escaped on the wire.
pub fn write_field<W: std::io::Write>(
    writer: &mut W,
    payload: &[u8],
    delimiter: &[u8],
) -> Result<()> {
    writer.write_all(payload)?;
    writer.write_all(delimiter)?;
    Ok(())
}

pub fn write_hex_field<W: std::io::Write>(
    writer: &mut W,
    value: u64,
    delimiter: &[u8],
) -> Result<()> {
    write_field(writer, hex_encode(value).as_bytes(), delimiter)
}

pub fn write_str_field<W: std::io::Write>(
    writer: &mut W,
    value: &str,
    delimiter: &[u8],
) -> Result<()> {
    write_field(writer, value.as_bytes(), delimiter)
}

/// Read one delimited field as raw bytes.
pub fn read_field(stream: &mut ByteStream, delimiter: &[u8]) -> Result<Vec<u8>> {
    Ok(stream.read_until(delimiter)?)
}

/// Read one delimited field and interpret it as UTF-8 text.
pub fn read_str_field(stream: &mut ByteStream, delimiter: &[u8]) -> Result<String> {
    let bytes = read_field(stream, delimiter)?;
    String::from_utf8(bytes)
        .map_err(|e| NeoFileError::MalformedRecord(format!("field is not valid UTF-8: {e}")))
}

/// Read one delimited field and interpret it as a hex integer.
pub fn read_hex_field(stream: &mut ByteStream, delimiter: &[u8]) -> Result<u64> {
    let s = read_str_field(stream, delimiter)?;
    hex_decode(&s)
}

/// Encode an ordered list of strings as the concatenation of each payload
/// plus the delimiter.
pub fn write_null_list<W: std::io::Write>(
    writer: &mut W,
    items: &[String],
    delimiter: &[u8],
) -> Result<()> {
    for item in items {
        write_str_field(writer, item, delimiter)?;
    }
    Ok(())
}

/// Decode `count` delimited strings.
pub fn read_null_list(
    stream: &mut ByteStream,
    count: usize,
    delimiter: &[u8],
) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(read_str_field(stream, delimiter)?);
    }
    Ok(out)
}
