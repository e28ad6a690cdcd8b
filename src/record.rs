//! The per-entry record: the 25 fixed fields, the JSON-sidecar descriptor,
//! extras, the checksum-algorithm and checksum-value fields, a hex-length
//! prefix, and the raw JSON and stored-content regions that follow.
//!
//! This is the codec's busiest module, the direct analogue of the teacher's
//! `archive.rs` record read/write loop: `write_record`/`read_record` play
//! the role of the teacher's `Header::write`/`Header::read` pair, just one
//! level down, operating per-entry instead of once per archive.

use crate::checksum::ChecksumAlgo;
use crate::codec::{hex_decode, read_str_field, write_hex_field, write_str_field};
use crate::compression::Compression;
use crate::entry::{normalize_fname, ChecksumPair, Entry, JsonSidecar};
use crate::error::{ChecksumScope, NeoFileError, Result};
use crate::file_type::FileType;
use crate::format::FormatSpec;
use crate::schema::{self, JSON_TYPE_INDEX};
use crate::stream::ByteStream;

/// Number of fixed fields preceding the JSON-sidecar descriptor.
const FIXED_FIELD_COUNT: usize = JSON_TYPE_INDEX;

/// Per-read behavior, threaded down from the driver's archive-level
/// options (`spec.md` §5's `list_only`/`skip_checksum`/`uncompress`/
/// `skip_json`), plus a header-checksum opt-in only `validate` turns on.
#[derive(Debug, Clone, Copy)]
pub struct RecordOptions {
    /// Skip reading the stored-content region into memory; still advances
    /// the stream past it.
    pub list_only: bool,
    /// Skip content and JSON checksum verification.
    pub skip_checksum: bool,
    /// Decompress the stored region into `Entry::fcontent`.
    pub uncompress: bool,
    /// Skip reading the JSON region into memory; still advances the stream
    /// past it.
    pub skip_json: bool,
    /// Additionally verify the whole-record header checksum.
    pub verify_header: bool,
    /// Record checksum mismatches on `Entry::checksum_errors` instead of
    /// aborting the read. The full record is still consumed so the stream
    /// stays in sync for the next record — used by `validate` to report a
    /// per-entry pass/fail detail rather than stopping at the first failure.
    pub collect_errors: bool,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            list_only: false,
            skip_checksum: false,
            uncompress: true,
            skip_json: false,
            verify_header: false,
            collect_errors: false,
        }
    }
}

/// Write one entry's record, including its JSON sidecar and `stored_content`
/// (already compressed, if `entry.fcompression` is not `None`).
///
/// `entry.header_checksum.algo`/`content_checksum.algo`/`json_checksum.algo`
/// select the algorithms used; the three checksum *values* are computed
/// fresh from the bytes actually being written and do not need to be
/// pre-populated on `entry`.
pub fn write_record(
    writer: &mut Vec<u8>,
    entry: &Entry,
    stored_content: &[u8],
    spec: &FormatSpec,
) -> Result<()> {
    let delim = spec.delimiter();
    let fname = normalize_fname(&entry.fname);
    let json_bytes = entry.fjson.to_bytes();

    let mut fixed = Vec::new();
    write_hex_field(&mut fixed, entry.ftype.code(), delim)?;
    write_str_field(&mut fixed, &entry.fencoding, delim)?;
    write_str_field(&mut fixed, &entry.fcencoding, delim)?;
    write_str_field(&mut fixed, &fname, delim)?;
    write_str_field(&mut fixed, &entry.flinkname, delim)?;
    write_hex_field(&mut fixed, entry.fsize, delim)?;
    write_hex_field(&mut fixed, entry.fatime, delim)?;
    write_hex_field(&mut fixed, entry.fmtime, delim)?;
    write_hex_field(&mut fixed, entry.fctime, delim)?;
    write_hex_field(&mut fixed, entry.fbtime, delim)?;
    write_hex_field(&mut fixed, entry.fmode as u64, delim)?;
    write_hex_field(&mut fixed, entry.fwinattributes, delim)?;
    write_str_field(&mut fixed, entry.fcompression.name(), delim)?;
    write_hex_field(&mut fixed, entry.fcsize, delim)?;
    write_hex_field(&mut fixed, entry.fuid as u64, delim)?;
    write_str_field(&mut fixed, &entry.funame, delim)?;
    write_hex_field(&mut fixed, entry.fgid as u64, delim)?;
    write_str_field(&mut fixed, &entry.fgname, delim)?;
    write_hex_field(&mut fixed, entry.fid, delim)?;
    write_hex_field(&mut fixed, entry.finode, delim)?;
    write_hex_field(&mut fixed, entry.flinkcount, delim)?;
    write_hex_field(&mut fixed, entry.fdev, delim)?;
    write_hex_field(&mut fixed, entry.fdev_minor, delim)?;
    write_hex_field(&mut fixed, entry.fdev_major, delim)?;
    let fseeknext = format!("+{}", delim.len());
    write_str_field(&mut fixed, &fseeknext, delim)?;

    // JSON-sidecar descriptor, always written in 5-field new style.
    let json_checksum_value = entry.json_checksum.algo.digest(&json_bytes);
    write_str_field(&mut fixed, entry.fjson.type_name(), delim)?;
    write_hex_field(&mut fixed, entry.fjson.key_count() as u64, delim)?;
    write_hex_field(&mut fixed, json_bytes.len() as u64, delim)?;
    write_str_field(&mut fixed, entry.json_checksum.algo.name(), delim)?;
    write_str_field(&mut fixed, &json_checksum_value, delim)?;

    // extras
    let extras_blob_size: usize = entry.extras.iter().map(|e| e.len() + delim.len()).sum();
    write_hex_field(&mut fixed, extras_blob_size as u64, delim)?;
    write_hex_field(&mut fixed, entry.extras.len() as u64, delim)?;
    for extra in &entry.extras {
        write_str_field(&mut fixed, extra, delim)?;
    }

    // the two algorithm-name fields the header checksum region ends on
    write_str_field(&mut fixed, entry.header_checksum.algo.name(), delim)?;
    write_str_field(&mut fixed, entry.content_checksum.algo.name(), delim)?;

    let fields_count = FIXED_FIELD_COUNT + 5 + 2 + entry.extras.len() + 2 + 2;

    let mut fields_count_field = Vec::new();
    write_hex_field(&mut fields_count_field, fields_count as u64, delim)?;

    // Predict the two trailing checksum-value field lengths from the
    // algorithm alone, so `header_len` never has to measure itself.
    let header_value_len = entry.header_checksum.algo.hex_len() + delim.len();
    let content_value_len = entry.content_checksum.algo.hex_len() + delim.len();
    let bytes_after_headersize = fields_count_field.len() + fixed.len() + header_value_len + content_value_len;
    let header_len = (bytes_after_headersize - delim.len()) as u64;

    let mut headersize_field = Vec::new();
    write_hex_field(&mut headersize_field, header_len, delim)?;

    // Header-checksum region: headersize + fields_count + every field up
    // through content_checksum_algo, excluding the two value fields and
    // their delimiters.
    let mut checksum_region = Vec::with_capacity(headersize_field.len() + fields_count_field.len() + fixed.len());
    checksum_region.extend_from_slice(&headersize_field);
    checksum_region.extend_from_slice(&fields_count_field);
    checksum_region.extend_from_slice(&fixed);
    let header_checksum_value = entry.header_checksum.algo.digest(&checksum_region);
    let content_checksum_value = entry.content_checksum.algo.digest(stored_content);

    writer.extend_from_slice(&checksum_region);
    write_str_field(writer, &header_checksum_value, delim)?;
    write_str_field(writer, &content_checksum_value, delim)?;
    writer.extend_from_slice(&json_bytes);
    writer.extend_from_slice(delim);
    writer.extend_from_slice(stored_content);
    writer.extend_from_slice(delim);
    Ok(())
}

/// Write the end-of-archive sentinel: two literal `"0"` fields.
pub fn write_sentinel(writer: &mut Vec<u8>, spec: &FormatSpec) -> Result<()> {
    let delim = spec.delimiter();
    write_str_field(writer, "0", delim)?;
    write_str_field(writer, "0", delim)?;
    Ok(())
}

/// Read one record, or `None` at the end-of-archive sentinel.
///
/// `spec.md` §4.6: peek the first token; a literal `"0"` is ambiguous with
/// `headersize_hex == 0`, resolved by reading a second token — `"0"` again
/// means end-of-archive, anything else means the first `"0"` really was
/// `headersize_hex`.
pub fn read_record(
    stream: &mut ByteStream,
    spec: &FormatSpec,
    opts: &RecordOptions,
) -> Result<Option<Entry>> {
    let delim = spec.delimiter();
    let first = read_str_field(stream, delim)?;
    let second = read_str_field(stream, delim)?;
    if first == "0" && second == "0" {
        return Ok(None);
    }
    let headersize_raw = first;
    let fields_count_raw = second;
    let fields_count = hex_decode(&fields_count_raw)? as usize;
    read_record_body(stream, spec, opts, &headersize_raw, &fields_count_raw, fields_count)
}

fn read_record_body(
    stream: &mut ByteStream,
    spec: &FormatSpec,
    opts: &RecordOptions,
    headersize_raw: &str,
    fields_count_raw: &str,
    fields_count: usize,
) -> Result<Option<Entry>> {
    let delim = spec.delimiter();
    if fields_count < FIXED_FIELD_COUNT {
        return Err(NeoFileError::MalformedRecord(format!(
            "record declares {fields_count} fields, fewer than the {FIXED_FIELD_COUNT} fixed fields"
        )));
    }

    let mut fields = Vec::with_capacity(fields_count);
    for _ in 0..fields_count {
        fields.push(read_str_field(stream, delim)?);
    }

    let ftype = FileType::from_code(hex_decode(&fields[0])?)?;
    let fencoding = fields[1].clone();
    let fcencoding = fields[2].clone();
    let fname_raw = fields[3].clone();
    let flinkname = fields[4].clone();
    let fsize = hex_decode(&fields[5])?;
    let fatime = hex_decode(&fields[6])?;
    let fmtime = hex_decode(&fields[7])?;
    let fctime = hex_decode(&fields[8])?;
    let fbtime = hex_decode(&fields[9])?;
    let fmode = hex_decode(&fields[10])? as u32;
    let fwinattributes = hex_decode(&fields[11])?;
    let fcompression = Compression::parse(&fields[12]);
    let fcsize = hex_decode(&fields[13])?;
    let fuid = hex_decode(&fields[14])? as u32;
    let funame = fields[15].clone();
    let fgid = hex_decode(&fields[16])? as u32;
    let fgname = fields[17].clone();
    let fid = hex_decode(&fields[18])?;
    let finode = hex_decode(&fields[19])?;
    let flinkcount = hex_decode(&fields[20])?;
    let fdev = hex_decode(&fields[21])?;
    let fdev_minor = hex_decode(&fields[22])?;
    let fdev_major = hex_decode(&fields[23])?;
    let fseeknext = fields[24].clone();

    let desc = schema::resolve(&fields)?;
    let mut idx = desc.next_index;

    let _extras_size = hex_decode(fields.get(idx).ok_or_else(|| {
        NeoFileError::MalformedRecord("missing extras_size".to_string())
    })?)?;
    idx += 1;
    let extras_count = hex_decode(fields.get(idx).ok_or_else(|| {
        NeoFileError::MalformedRecord("missing extras_count".to_string())
    })?)? as usize;
    idx += 1;
    let mut extras = Vec::with_capacity(extras_count);
    for _ in 0..extras_count {
        extras.push(
            fields
                .get(idx)
                .cloned()
                .ok_or_else(|| NeoFileError::MalformedRecord("missing extras entry".to_string()))?,
        );
        idx += 1;
    }

    let header_checksum_algo = ChecksumAlgo::parse(fields.get(idx).ok_or_else(|| {
        NeoFileError::MalformedRecord("missing header_checksum_algo".to_string())
    })?)?;
    let content_checksum_algo_index = idx + 1;
    let content_checksum_algo = ChecksumAlgo::parse(fields.get(content_checksum_algo_index).ok_or_else(
        || NeoFileError::MalformedRecord("missing content_checksum_algo".to_string()),
    )?)?;
    idx = content_checksum_algo_index + 1;
    let header_checksum_value = fields
        .get(idx)
        .cloned()
        .ok_or_else(|| NeoFileError::MalformedRecord("missing header_checksum_value".to_string()))?;
    idx += 1;
    let content_checksum_value = fields
        .get(idx)
        .cloned()
        .ok_or_else(|| NeoFileError::MalformedRecord("missing content_checksum_value".to_string()))?;

    let fname = normalize_fname(&fname_raw);
    let mut checksum_errors = Vec::new();

    if opts.verify_header {
        let mut region = Vec::new();
        region.extend_from_slice(headersize_raw.as_bytes());
        region.extend_from_slice(delim);
        region.extend_from_slice(fields_count_raw.as_bytes());
        region.extend_from_slice(delim);
        for field in &fields[..=content_checksum_algo_index] {
            region.extend_from_slice(field.as_bytes());
            region.extend_from_slice(delim);
        }
        if !header_checksum_algo.verify(&region, &header_checksum_value) {
            if opts.collect_errors {
                checksum_errors.push(ChecksumScope::Header);
            } else {
                return Err(NeoFileError::ChecksumMismatch {
                    scope: ChecksumScope::Header,
                    entry: Some(fname),
                });
            }
        }
    }

    // JSON region
    let json_bytes = if opts.skip_json {
        stream.skip(desc.json_size)?;
        Vec::new()
    } else {
        let bytes = stream.read(desc.json_size as usize)?;
        if bytes.len() as u64 != desc.json_size {
            return Err(NeoFileError::MalformedRecord(
                "stream ended before json region was fully read".to_string(),
            ));
        }
        bytes
    };
    consume_delimiter(stream, delim)?;

    if !opts.skip_checksum && !opts.skip_json && !desc.json_checksum_algo.verify(&json_bytes, &desc.json_checksum_value)
    {
        if opts.collect_errors {
            checksum_errors.push(ChecksumScope::Json);
        } else {
            return Err(NeoFileError::ChecksumMismatch {
                scope: ChecksumScope::Json,
                entry: Some(fname),
            });
        }
    }

    let fjson = if opts.skip_json {
        JsonSidecar::Absent
    } else {
        JsonSidecar::from_bytes(&json_bytes)
    };

    // Stored content region
    let stored_len = if fcompression != Compression::None && fcsize > 0 {
        fcsize
    } else {
        fsize
    };
    let stored_bytes = if opts.list_only {
        stream.skip(stored_len)?;
        None
    } else {
        let bytes = stream.read(stored_len as usize)?;
        if bytes.len() as u64 != stored_len {
            return Err(NeoFileError::MalformedRecord(
                "stream ended before content region was fully read".to_string(),
            ));
        }
        Some(bytes)
    };
    consume_delimiter(stream, delim)?;

    if !opts.skip_checksum {
        if let Some(ref bytes) = stored_bytes {
            if !content_checksum_algo.verify(bytes, &content_checksum_value) {
                if opts.collect_errors {
                    checksum_errors.push(ChecksumScope::Content);
                } else {
                    return Err(NeoFileError::ChecksumMismatch {
                        scope: ChecksumScope::Content,
                        entry: Some(fname),
                    });
                }
            }
        }
    }

    let mut decompression_failed = false;
    let fcontent = match stored_bytes {
        None => None,
        Some(bytes) => {
            if opts.uncompress && fcompression != Compression::None {
                match fcompression.decompress(&bytes) {
                    Ok(decoded) => Some(decoded),
                    Err(_) => {
                        decompression_failed = true;
                        Some(bytes)
                    }
                }
            } else {
                Some(bytes)
            }
        }
    };

    Ok(Some(Entry {
        fid,
        finode,
        fname,
        flinkname,
        ftype,
        fsize,
        fcsize,
        fatime,
        fmtime,
        fctime,
        fbtime,
        fmode,
        fwinattributes,
        fuid,
        funame,
        fgid,
        fgname,
        flinkcount,
        fdev,
        fdev_minor,
        fdev_major,
        fcompression,
        fencoding,
        fcencoding,
        fseeknext,
        fjson,
        extras,
        fcontent,
        header_checksum: ChecksumPair::new(header_checksum_algo, header_checksum_value),
        content_checksum: ChecksumPair::new(content_checksum_algo, content_checksum_value),
        json_checksum: ChecksumPair::new(desc.json_checksum_algo, desc.json_checksum_value),
        decompression_failed,
        checksum_errors,
    }))
}

fn consume_delimiter(stream: &mut ByteStream, delim: &[u8]) -> Result<()> {
    let got = stream.read(delim.len())?;
    if got != delim {
        return Err(NeoFileError::MalformedRecord(
            "expected a delimiter after a fixed-length region".to_string(),
        ));
    }
    Ok(())
}
