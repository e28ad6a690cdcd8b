//! Whole-archive operations layered over the header and record codecs:
//! parse, list, validate, unpack, pack, and repack.
//!
//! Shaped like the teacher's `archive.rs`: a handful of free functions that
//! drive a `ByteStream` from end to end, each configured by a small
//! options struct instead of a grab-bag of booleans, mirroring the
//! teacher's `ArchiveOptions`.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::checksum::ChecksumAlgo;
use crate::compression::{Compression, Level};
use crate::entry::Entry;
use crate::error::{ChecksumScope, Result};
use crate::file_type::FileType;
use crate::format::FormatSpec;
use crate::header::{self, GlobalHeader};
use crate::record::{self, RecordOptions};
use crate::stream::ByteStream;

/// Options controlling how much of a record is materialized while reading.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveOptions {
    pub list_only: bool,
    pub skip_checksum: bool,
    pub uncompress: bool,
    pub skip_json: bool,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            list_only: false,
            skip_checksum: false,
            uncompress: true,
            skip_json: false,
        }
    }
}

impl ArchiveOptions {
    /// Fast-path options for `list`: no checksum work, no decompression,
    /// no JSON decoding, content region skipped entirely.
    pub fn list_fast() -> Self {
        Self {
            list_only: true,
            skip_checksum: true,
            uncompress: false,
            skip_json: true,
        }
    }

    fn to_record_options(self, verify_header: bool) -> RecordOptions {
        RecordOptions {
            list_only: self.list_only,
            skip_checksum: self.skip_checksum,
            uncompress: self.uncompress,
            skip_json: self.skip_json,
            verify_header,
            collect_errors: false,
        }
    }
}

/// Per-entry outcome of `validate`: whether every checked checksum scope
/// verified, and which scopes (if any) didn't.
#[derive(Debug, Clone)]
pub struct EntryValidation {
    pub fname: String,
    pub ok: bool,
    pub failed_scopes: Vec<ChecksumScope>,
}

/// One entry plus the logical (pre-compression) bytes to store for it.
/// Directories and other contentless entries pass an empty `content`.
#[derive(Debug, Clone)]
pub struct PackItem {
    pub entry: Entry,
    pub content: Vec<u8>,
}

/// Configuration for `pack`/`repack`.
#[derive(Debug, Clone)]
pub struct PackOptions {
    pub header_checksum_algo: ChecksumAlgo,
    pub content_checksum_algo: ChecksumAlgo,
    pub json_checksum_algo: ChecksumAlgo,
    /// `None` selects the size-based auto policy per entry.
    pub compression: Option<Compression>,
    pub compression_level: Option<Level>,
    pub os_tag: String,
    pub extras: Vec<String>,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            header_checksum_algo: ChecksumAlgo::Sha256,
            content_checksum_algo: ChecksumAlgo::Sha256,
            json_checksum_algo: ChecksumAlgo::Sha256,
            compression: None,
            compression_level: None,
            os_tag: String::new(),
            extras: Vec::new(),
        }
    }
}

/// Read the global header, then every record up to the end-of-archive
/// sentinel, fully materializing each entry.
pub fn parse(stream: &mut ByteStream, spec: &FormatSpec, opts: &ArchiveOptions) -> Result<Vec<Entry>> {
    let header = header::read(stream, spec)?;
    debug!(num_files = header.num_files, "parsed global header");
    read_records(stream, spec, opts.to_record_options(false))
}

/// `parse` with the fast-path options: skips checksums, decompression, and
/// JSON decoding, and never materializes content bytes.
pub fn list(stream: &mut ByteStream, spec: &FormatSpec) -> Result<Vec<Entry>> {
    header::read(stream, spec)?;
    read_records(stream, spec, ArchiveOptions::list_fast().to_record_options(false))
}

/// Verify the global header checksum and every record's header/JSON/content
/// checksums, without aborting at the first failure: returns whether the
/// whole archive verified, plus a per-entry detail for every record that was
/// read before any non-checksum (structural) error, if any, cut the read
/// short.
pub fn validate(stream: &mut ByteStream, spec: &FormatSpec) -> Result<(bool, Vec<EntryValidation>)> {
    let header = header::read(stream, spec)?;
    let mut ok = header::verify_checksum(&header, spec);
    if !ok {
        warn!("global header checksum did not verify");
    }
    let opts = RecordOptions {
        list_only: false,
        skip_checksum: false,
        uncompress: false,
        skip_json: false,
        verify_header: true,
        collect_errors: true,
    };
    let mut details = Vec::new();
    while let Some(entry) = record::read_record(stream, spec, &opts)? {
        let entry_ok = entry.checksum_errors.is_empty();
        if !entry_ok {
            ok = false;
            warn!(fname = %entry.fname, failed = ?entry.checksum_errors, "checksum mismatch during validate");
        }
        details.push(EntryValidation {
            fname: entry.fname,
            ok: entry_ok,
            failed_scopes: entry.checksum_errors,
        });
    }
    Ok((ok, details))
}

/// `parse` with decompression enabled. With `outdir: Some(dir)`, reconstructs
/// every entry on disk under `dir` through the filesystem collaborator and
/// returns `None`. With `outdir: None` (the `outdir == null | "-"` case),
/// skips the filesystem entirely and returns a name → bytes mapping instead
/// (`None` for directories and other contentless entries).
pub fn unpack(
    stream: &mut ByteStream,
    spec: &FormatSpec,
    outdir: Option<&Path>,
) -> Result<Option<BTreeMap<String, Option<Vec<u8>>>>> {
    let entries = parse(stream, spec, &ArchiveOptions::default())?;
    match outdir {
        Some(dir) => {
            let skipped = crate::fs::restore(&entries, dir, &crate::fs::OsFilesystem)?;
            for fname in skipped {
                warn!(fname = %fname, "skipped device/fifo entry during unpack");
            }
            Ok(None)
        }
        None => Ok(Some(
            entries
                .into_iter()
                .map(|entry| {
                    let bytes = match entry.ftype {
                        FileType::Directory => None,
                        _ => entry.fcontent,
                    };
                    (entry.fname, bytes)
                })
                .collect(),
        )),
    }
}

fn read_records(stream: &mut ByteStream, spec: &FormatSpec, opts: RecordOptions) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    while let Some(entry) = record::read_record(stream, spec, &opts)? {
        if entry.decompression_failed {
            warn!(fname = %entry.fname, "decompression failed, keeping stored bytes");
        }
        entries.push(entry);
    }
    Ok(entries)
}

/// Write a global header followed by every item's record and the
/// end-of-archive sentinel.
///
/// `num_files` in the written header is an advisory count, not a
/// termination signal — the sentinel is authoritative on read, so `pack`
/// is free to buffer its input to learn the count up front rather than
/// patch the header after the fact.
pub fn pack(items: Vec<PackItem>, spec: &FormatSpec, opts: &PackOptions) -> Result<Vec<u8>> {
    let mut writer = Vec::new();
    let mut global = GlobalHeader::new(items.len() as u64);
    global.os_tag = opts.os_tag.clone();
    global.extras = opts.extras.clone();
    global.checksum_algo = opts.header_checksum_algo;
    header::write(&global, &mut writer, spec)?;

    for (index, item) in items.into_iter().enumerate() {
        write_item(&mut writer, item.entry, StagedContent::Logical(item.content), spec, opts, index as u64)?;
    }
    record::write_sentinel(&mut writer, spec)?;
    Ok(writer)
}

/// Content staged for `write_item`: either still-logical bytes that need
/// compressing under `opts`'s policy, or already-stored bytes under a known
/// compression that should be written through verbatim.
enum StagedContent {
    Logical(Vec<u8>),
    Stored { bytes: Vec<u8>, compression: Compression },
}

fn write_item(
    writer: &mut Vec<u8>,
    mut entry: Entry,
    content: StagedContent,
    spec: &FormatSpec,
    opts: &PackOptions,
    index: u64,
) -> Result<()> {
    // `fid`/`finode` default to the 0-based pack-time sequence number; a
    // caller that already assigned a non-default value keeps it.
    if entry.fid == 0 {
        entry.fid = index;
    }
    if entry.finode == 0 {
        entry.finode = index;
    }

    let (stored, actual_compression) = match content {
        StagedContent::Logical(content) => {
            entry.fsize = content.len() as u64;
            let (compression, level) = match opts.compression {
                Some(algo) => (algo, opts.compression_level.unwrap_or_default()),
                None => Compression::auto_for_size(content.len()),
            };
            compression.compress(&content, level)?
        }
        StagedContent::Stored { bytes, compression } => (bytes, compression),
    };
    entry.fcompression = actual_compression;
    entry.fcsize = if actual_compression == Compression::None {
        0
    } else {
        stored.len() as u64
    };

    entry.header_checksum.algo = opts.header_checksum_algo;
    entry.content_checksum.algo = opts.content_checksum_algo;
    entry.json_checksum.algo = opts.json_checksum_algo;

    record::write_record(writer, &entry, &stored, spec)?;
    debug!(fname = %entry.fname, stored_len = stored.len(), compression = actual_compression.name(), "wrote record");
    Ok(())
}

/// Decode every entry from `stream` retaining its stored (not decompressed)
/// bytes, then re-encode under `opts`'s checksum algorithms and compression
/// policy. When an entry's destination compression algorithm (`opts.compression`,
/// or the auto-policy result for its logical size) matches the algorithm it
/// was already stored under, the stored bytes are copied through verbatim
/// instead of being decompressed and recompressed; otherwise they're
/// decompressed once and recompressed under the new algorithm. Mirrors the
/// teacher's `Builder::append_raw` path (stage already-known bytes, hand
/// them to the record codec) paired with `Compression`'s symmetric
/// compress/decompress pair for the cases that do need to change algorithm.
pub fn repack(stream: &mut ByteStream, read_spec: &FormatSpec, write_spec: &FormatSpec, opts: &PackOptions) -> Result<Vec<u8>> {
    let stored_opts = ArchiveOptions {
        list_only: false,
        skip_checksum: false,
        uncompress: false,
        skip_json: false,
    };
    let entries = parse(stream, read_spec, &stored_opts)?;

    let mut writer = Vec::new();
    let mut global = GlobalHeader::new(entries.len() as u64);
    global.os_tag = opts.os_tag.clone();
    global.extras = opts.extras.clone();
    global.checksum_algo = opts.header_checksum_algo;
    header::write(&global, &mut writer, write_spec)?;

    for (index, entry) in entries.into_iter().enumerate() {
        let stored_bytes = entry.fcontent.clone().unwrap_or_default();
        let target = opts
            .compression
            .unwrap_or_else(|| Compression::auto_for_size(entry.fsize as usize).0);
        let content = if target == entry.fcompression {
            StagedContent::Stored {
                bytes: stored_bytes,
                compression: entry.fcompression,
            }
        } else {
            let logical = entry.fcompression.decompress(&stored_bytes)?;
            StagedContent::Logical(logical)
        };
        write_item(&mut writer, entry, content, write_spec, opts, index as u64)?;
    }
    record::write_sentinel(&mut writer, write_spec)?;
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, content: &[u8]) -> PackItem {
        PackItem {
            entry: Entry::new(name, FileType::File),
            content: content.to_vec(),
        }
    }

    #[test]
    fn pack_then_parse_round_trips_entries() {
        let spec = FormatSpec::default();
        let opts = PackOptions::default();
        let bytes = pack(
            vec![item("a.txt", b"Hello\n"), item("b.txt", b"world")],
            &spec,
            &opts,
        )
        .unwrap();

        let mut stream = ByteStream::from_bytes(bytes);
        let entries = parse(&mut stream, &spec, &ArchiveOptions::default()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].fname, "./a.txt");
        assert_eq!(entries[0].fcontent, Some(b"Hello\n".to_vec()));
        assert_eq!(entries[1].fcontent, Some(b"world".to_vec()));
    }

    #[test]
    fn pack_assigns_0_based_fid_and_finode_sequence_numbers_by_default() {
        let spec = FormatSpec::default();
        let bytes = pack(
            vec![item("a.txt", b"a"), item("b.txt", b"b"), item("c.txt", b"c")],
            &spec,
            &PackOptions::default(),
        )
        .unwrap();
        let mut stream = ByteStream::from_bytes(bytes);
        let entries = parse(&mut stream, &spec, &ArchiveOptions::default()).unwrap();
        let fids: Vec<u64> = entries.iter().map(|e| e.fid).collect();
        let finodes: Vec<u64> = entries.iter().map(|e| e.finode).collect();
        assert_eq!(fids, vec![0, 1, 2]);
        assert_eq!(finodes, vec![0, 1, 2]);
    }

    #[test]
    fn pack_keeps_a_caller_assigned_fid() {
        let spec = FormatSpec::default();
        let mut first = item("a.txt", b"a");
        first.entry.fid = 42;
        let bytes = pack(vec![first, item("b.txt", b"b")], &spec, &PackOptions::default()).unwrap();
        let mut stream = ByteStream::from_bytes(bytes);
        let entries = parse(&mut stream, &spec, &ArchiveOptions::default()).unwrap();
        assert_eq!(entries[0].fid, 42);
        assert_eq!(entries[1].fid, 1);
    }

    #[test]
    fn empty_archive_round_trips_with_zero_entries() {
        let spec = FormatSpec::default();
        let bytes = pack(vec![], &spec, &PackOptions::default()).unwrap();
        let mut stream = ByteStream::from_bytes(bytes);
        let entries = parse(&mut stream, &spec, &ArchiveOptions::default()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn validate_verifies_header_and_every_record() {
        let spec = FormatSpec::default();
        let bytes = pack(vec![item("a.txt", b"content")], &spec, &PackOptions::default()).unwrap();
        let mut stream = ByteStream::from_bytes(bytes);
        let (ok, details) = validate(&mut stream, &spec).unwrap();
        assert!(ok);
        assert_eq!(details.len(), 1);
        assert!(details[0].ok);
        assert!(details[0].failed_scopes.is_empty());
    }

    #[test]
    fn validate_detects_a_tampered_record_without_aborting() {
        let spec = FormatSpec::default();
        let mut bytes = pack(
            vec![item("a.txt", b"content"), item("b.txt", b"more content")],
            &spec,
            &PackOptions::default(),
        )
        .unwrap();
        // Flip a byte inside the first entry's stored-content region.
        let tamper_at = bytes.windows(b"content".len()).position(|w| w == b"content").unwrap();
        bytes[tamper_at] ^= 0xff;

        let mut stream = ByteStream::from_bytes(bytes);
        let (ok, details) = validate(&mut stream, &spec).unwrap();
        assert!(!ok);
        assert_eq!(details.len(), 2);
        assert!(!details[0].ok);
        assert_eq!(details[0].failed_scopes, vec![ChecksumScope::Content]);
        assert!(details[1].ok);
    }

    #[test]
    fn list_skips_content_but_still_sees_every_entry() {
        let spec = FormatSpec::default();
        let bytes = pack(
            vec![item("a.txt", b"one"), item("b.txt", b"two")],
            &spec,
            &PackOptions::default(),
        )
        .unwrap();
        let mut stream = ByteStream::from_bytes(bytes);
        let entries = list(&mut stream, &spec).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].fcontent, None);
    }

    #[test]
    fn large_entry_is_auto_compressed_with_bz2() {
        let spec = FormatSpec::default();
        let big = b"x".repeat(300_000);
        let bytes = pack(vec![item("big.bin", &big)], &spec, &PackOptions::default()).unwrap();
        let mut stream = ByteStream::from_bytes(bytes);
        let entries = parse(&mut stream, &spec, &ArchiveOptions::default()).unwrap();
        assert_eq!(entries[0].fcompression, Compression::Bz2);
        assert_eq!(entries[0].fcontent, Some(big));
    }

    #[test]
    fn unpack_with_no_outdir_returns_a_name_to_bytes_map() {
        let spec = FormatSpec::default();
        let bytes = pack(
            vec![item("a.txt", b"Hello\n"), item("docs/", b"")],
            &spec,
            &PackOptions::default(),
        )
        .unwrap();
        let mut stream = ByteStream::from_bytes(bytes);
        let map = unpack(&mut stream, &spec, None).unwrap().expect("in-memory map");
        assert_eq!(map.get("./a.txt"), Some(&Some(b"Hello\n".to_vec())));
    }

    #[test]
    fn unpack_with_an_outdir_restores_through_the_filesystem() {
        let spec = FormatSpec::default();
        let bytes = pack(vec![item("a.txt", b"Hello\n")], &spec, &PackOptions::default()).unwrap();
        let mut stream = ByteStream::from_bytes(bytes);
        let dir = tempfile::tempdir().unwrap();
        let result = unpack(&mut stream, &spec, Some(dir.path())).unwrap();
        assert!(result.is_none());
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"Hello\n");
    }

    #[test]
    fn repack_with_matching_compression_algo_copies_stored_bytes_verbatim() {
        let spec = FormatSpec::default();
        let big = b"x".repeat(300_000); // auto-compresses to Bz2
        let original = pack(vec![item("big.bin", &big)], &spec, &PackOptions::default()).unwrap();

        let stored_opts = ArchiveOptions {
            list_only: false,
            skip_checksum: true,
            uncompress: false,
            skip_json: false,
        };
        let mut stream = ByteStream::from_bytes(original.clone());
        let original_stored = parse(&mut stream, &spec, &stored_opts).unwrap();
        assert_eq!(original_stored[0].fcompression, Compression::Bz2);

        let mut repack_opts = PackOptions::default();
        repack_opts.compression = Some(Compression::Bz2); // same as the source algorithm
        let mut stream = ByteStream::from_bytes(original);
        let repacked = repack(&mut stream, &spec, &spec, &repack_opts).unwrap();

        let mut stream = ByteStream::from_bytes(repacked);
        let repacked_stored = parse(&mut stream, &spec, &stored_opts).unwrap();
        assert_eq!(repacked_stored[0].fcompression, Compression::Bz2);
        assert_eq!(repacked_stored[0].fcontent, original_stored[0].fcontent);
    }

    #[test]
    fn repack_with_different_compression_algo_decompresses_and_recompresses() {
        let spec = FormatSpec::default();
        let bytes = pack(vec![item("a.txt", b"payload")], &spec, &PackOptions::default()).unwrap();
        let mut stream = ByteStream::from_bytes(bytes);
        let mut repack_opts = PackOptions::default();
        repack_opts.compression = Some(Compression::Zlib); // source was None
        let repacked = repack(&mut stream, &spec, &spec, &repack_opts).unwrap();

        let mut stream = ByteStream::from_bytes(repacked);
        let entries = parse(&mut stream, &spec, &ArchiveOptions::default()).unwrap();
        assert_eq!(entries[0].fcompression, Compression::Zlib);
        assert_eq!(entries[0].fcontent, Some(b"payload".to_vec()));
    }

    #[test]
    fn repack_with_different_checksum_algo_still_round_trips() {
        let spec = FormatSpec::default();
        let bytes = pack(vec![item("a.txt", b"payload")], &spec, &PackOptions::default()).unwrap();
        let mut stream = ByteStream::from_bytes(bytes);
        let mut repack_opts = PackOptions::default();
        repack_opts.content_checksum_algo = ChecksumAlgo::Md5;
        let repacked = repack(&mut stream, &spec, &spec, &repack_opts).unwrap();

        let mut stream2 = ByteStream::from_bytes(repacked);
        let entries = parse(&mut stream2, &spec, &ArchiveOptions::default()).unwrap();
        assert_eq!(entries[0].fcontent, Some(b"payload".to_vec()));
        assert_eq!(entries[0].content_checksum.algo, ChecksumAlgo::Md5);
    }
}
