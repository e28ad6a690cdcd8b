//! The archive preamble: magic/version, sizes, encoding, OS tag, entry
//! count, extras, and a whole-header checksum.
//!
//! Read and write are free functions taking `&GlobalHeader`/`ByteStream`
//! directly, the same shape as the teacher's `Header::read`/`Header::write`
//! in `header.rs`, just operating on the text field framing instead of
//! fixed-width big-endian integers.

use crate::checksum::ChecksumAlgo;
use crate::codec::{hex_decode, hex_encode, read_null_list, write_null_list};
use crate::error::{NeoFileError, Result};
use crate::format::FormatSpec;
use crate::stream::ByteStream;

/// The archive preamble, preceding the first record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalHeader {
    pub encoding: String,
    pub os_tag: String,
    pub num_files: u64,
    pub extras: Vec<String>,
    pub checksum_algo: ChecksumAlgo,
    /// Populated by [`read`]; ignored (recomputed) by [`write`].
    pub checksum_value: String,
}

impl GlobalHeader {
    pub fn new(num_files: u64) -> Self {
        Self {
            encoding: "UTF-8".to_string(),
            os_tag: String::new(),
            num_files,
            extras: Vec::new(),
            checksum_algo: ChecksumAlgo::None,
            checksum_value: String::new(),
        }
    }
}

/// Write the preamble. Field order exactly follows `spec.md` §4.5.
pub fn write(header: &GlobalHeader, writer: &mut Vec<u8>, spec: &FormatSpec) -> Result<()> {
    let delim = spec.delimiter();

    let mut prefix = Vec::new();
    let magic_and_version = format!("{}{}", spec.magic_str(), spec.version_digits_str());
    crate::codec::write_str_field(&mut prefix, &magic_and_version, delim)?;

    // Fields 3..10: self-contained, computed without knowing the header
    // size field that precedes them.
    let mut body = Vec::new();
    let body_scratch = 3 + 5 + header.extras.len() as u64 + 1;
    crate::codec::write_hex_field(&mut body, body_scratch, delim)?;
    crate::codec::write_str_field(&mut body, &header.encoding, delim)?;
    crate::codec::write_str_field(&mut body, &header.os_tag, delim)?;
    crate::codec::write_hex_field(&mut body, header.num_files, delim)?;
    let extras_blob_size: usize = header.extras.iter().map(|e| e.len() + delim.len()).sum();
    crate::codec::write_hex_field(&mut body, extras_blob_size as u64, delim)?;
    crate::codec::write_hex_field(&mut body, header.extras.len() as u64, delim)?;
    write_null_list(&mut body, &header.extras, delim)?;
    crate::codec::write_str_field(&mut body, header.checksum_algo.name(), delim)?;

    let header_len = body.len() as u64;

    let mut checksummed_region = Vec::new();
    checksummed_region.extend_from_slice(&prefix);
    crate::codec::write_hex_field(&mut checksummed_region, header_len, delim)?;
    checksummed_region.extend_from_slice(&body);

    let checksum_value = header.checksum_algo.digest(&checksummed_region);

    writer.extend_from_slice(&checksummed_region);
    crate::codec::write_str_field(writer, &checksum_value, delim)?;
    Ok(())
}

/// Read the preamble. `num_files` is informational; the record stream's
/// own end-of-archive sentinel is authoritative. The trailing checksum is
/// always read but only verified when the caller asks (see
/// [`verify_checksum`]).
pub fn read(stream: &mut ByteStream, spec: &FormatSpec) -> Result<GlobalHeader> {
    let delim = spec.delimiter();
    let read_raw = |stream: &mut ByteStream| -> Result<Vec<u8>> { Ok(stream.read_until(delim)?) };

    let magic_and_version = String::from_utf8(read_raw(stream)?)
        .map_err(|_| NeoFileError::MalformedHeader("magic/version is not valid UTF-8".into()))?;
    if !magic_and_version.starts_with(spec.magic_str()) {
        return Err(NeoFileError::MalformedHeader(format!(
            "expected magic {:?}, got {:?}",
            spec.magic_str(),
            magic_and_version
        )));
    }

    let _header_len = hex_decode(&str_field(&read_raw(stream)?)?)?;
    let _body_scratch = hex_decode(&str_field(&read_raw(stream)?)?)?; // opaque, MUST accept any value

    let encoding = str_field(&read_raw(stream)?)?;
    let os_tag = str_field(&read_raw(stream)?)?;
    let num_files = hex_decode(&str_field(&read_raw(stream)?)?)?;
    let _extras_size = hex_decode(&str_field(&read_raw(stream)?)?)?; // informational
    let extras_count = hex_decode(&str_field(&read_raw(stream)?)?)? as usize;

    let mut extras = Vec::with_capacity(extras_count);
    for _ in 0..extras_count {
        extras.push(str_field(&read_raw(stream)?)?);
    }

    let checksum_algo = ChecksumAlgo::parse(&str_field(&read_raw(stream)?)?)?;
    let checksum_value = str_field(&stream.read_until(delim)?)?;

    Ok(GlobalHeader {
        encoding,
        os_tag,
        num_files,
        extras,
        checksum_algo,
        checksum_value,
    })
}

fn str_field(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| NeoFileError::MalformedHeader(format!("field is not valid UTF-8: {e}")))
}

/// Recompute the header checksum over a freshly-encoded copy of `header`
/// and compare it against `header.checksum_value`. Header checksum
/// verification is optional; validators opt in explicitly.
pub fn verify_checksum(header: &GlobalHeader, spec: &FormatSpec) -> bool {
    let mut buf = Vec::new();
    if write(header, &mut buf, spec).is_err() {
        return false;
    }
    // `write` appends the checksum value as the last field; strip it and
    // recompute over the same prefix `read` would have accumulated.
    let delim = spec.delimiter();
    if let Some(pos) = find_last_field_start(&buf, delim) {
        let region = &buf[..pos];
        let expected = header.checksum_algo.digest(region);
        return expected.eq_ignore_ascii_case(&header.checksum_value);
    }
    false
}

/// Find the byte offset where the checksum_value field begins, i.e. just
/// past the second-to-last delimiter occurrence (the last delimiter ends
/// the checksum_value field itself).
fn find_last_field_start(buf: &[u8], delim: &[u8]) -> Option<usize> {
    if buf.len() < delim.len() * 2 {
        return None;
    }
    let mut delim_positions = Vec::new();
    let mut i = 0;
    while i + delim.len() <= buf.len() {
        if &buf[i..i + delim.len()] == delim {
            delim_positions.push(i);
            i += delim.len();
        } else {
            i += 1;
        }
    }
    if delim_positions.len() < 2 {
        return None;
    }
    let second_to_last = delim_positions[delim_positions.len() - 2];
    Some(second_to_last + delim.len())
}
