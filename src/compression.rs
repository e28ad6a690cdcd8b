//! Symmetric compress/decompress for `{none, zlib, gzip, bz2}`, with `lzma`
//! recognized but permanently unsupported, and the size-based auto policy
//! writers use when no explicit algorithm is requested.
//!
//! Grounded in the teacher's `compression.rs`: same dependencies
//! (`flate2`, `bzip2`), same enum-with-`decoder`/`encoder`-methods shape,
//! and the same precedent of carrying a named-but-unimplemented variant
//! (the teacher's `// TODO lzfse` next to `Compression`) for `Lzma` here.

use std::io::{Read, Write};

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression as Flate2Level;

use crate::error::{NeoFileError, Result};

/// Compression algorithm applied to a record's stored content region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(test, derive(arbitrary::Arbitrary))]
pub enum Compression {
    #[default]
    None,
    Zlib,
    Gzip,
    Bz2,
    /// Recognized on the wire; compress/decompress always fail.
    Lzma,
}

/// Compression level, 0 (fastest) through 9 (smallest).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level(u32);

impl Level {
    pub fn new(value: u32) -> Self {
        Self(value.min(9))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Level {
    fn default() -> Self {
        Self(6)
    }
}

impl Compression {
    /// Normalize a wire/config name: `gz->gzip`, `bz|bzip|bzip2->bz2`,
    /// `z->zlib`, `xz->lzma`, empty -> `none`.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "" | "none" => Self::None,
            "z" | "zlib" => Self::Zlib,
            "gz" | "gzip" => Self::Gzip,
            "bz" | "bzip" | "bzip2" | "bz2" => Self::Bz2,
            "xz" | "lzma" => Self::Lzma,
            _ => Self::None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Zlib => "zlib",
            Self::Gzip => "gzip",
            Self::Bz2 => "bz2",
            Self::Lzma => "lzma",
        }
    }

    /// Size-based auto policy: `<16KiB -> none`, `<256KiB -> zlib@6`,
    /// `>=256KiB -> bz2@9`.
    pub fn auto_for_size(size: usize) -> (Self, Level) {
        const SIXTEEN_KIB: usize = 16 * 1024;
        const TWO_FIFTY_SIX_KIB: usize = 256 * 1024;
        if size < SIXTEEN_KIB {
            (Self::None, Level::default())
        } else if size < TWO_FIFTY_SIX_KIB {
            (Self::Zlib, Level::new(6))
        } else {
            (Self::Bz2, Level::new(9))
        }
    }

    /// Compress `data`, returning the stored bytes and the algorithm
    /// actually used. On failure of a requested algorithm, falls back to
    /// zlib level 6 and reports the algorithm actually used.
    pub fn compress(self, data: &[u8], level: Level) -> Result<(Vec<u8>, Self)> {
        match self.try_compress(data, level) {
            Ok(bytes) => Ok((bytes, self)),
            Err(_) if self != Self::Zlib => {
                let bytes = Self::Zlib.try_compress(data, Level::new(6))?;
                Ok((bytes, Self::Zlib))
            }
            Err(e) => Err(e),
        }
    }

    fn try_compress(self, data: &[u8], level: Level) -> Result<Vec<u8>> {
        match self {
            Self::None => Ok(data.to_vec()),
            Self::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Flate2Level::new(level.get()));
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Flate2Level::new(level.get()));
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            Self::Bz2 => {
                let mut encoder =
                    BzEncoder::new(Vec::new(), bzip2::Compression::new(level.get()));
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            Self::Lzma => Err(NeoFileError::UnsupportedCompression {
                name: self.name().to_string(),
            }),
        }
    }

    /// Decompress `data` stored under this algorithm.
    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Self::None => out.extend_from_slice(data),
            Self::Zlib => {
                ZlibDecoder::new(data).read_to_end(&mut out)?;
            }
            Self::Gzip => {
                GzDecoder::new(data).read_to_end(&mut out)?;
            }
            Self::Bz2 => {
                BzDecoder::new(data).read_to_end(&mut out)?;
            }
            Self::Lzma => {
                return Err(NeoFileError::UnsupportedCompression {
                    name: self.name().to_string(),
                })
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_each_supported_algorithm() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(100);
        for algo in [Compression::None, Compression::Zlib, Compression::Gzip, Compression::Bz2] {
            let (stored, actual) = algo.compress(&data, Level::default()).unwrap();
            assert_eq!(actual, algo);
            let restored = algo.decompress(&stored).unwrap();
            assert_eq!(restored, data);
        }
    }

    #[test]
    fn lzma_is_recognized_but_always_unsupported() {
        assert_eq!(Compression::parse("xz"), Compression::Lzma);
        let err = Compression::Lzma.compress(b"data", Level::default()).unwrap_err();
        assert!(matches!(err, NeoFileError::UnsupportedCompression { .. }));
        let err = Compression::Lzma.decompress(b"data").unwrap_err();
        assert!(matches!(err, NeoFileError::UnsupportedCompression { .. }));
    }

    #[test]
    fn failed_requested_algorithm_falls_back_to_zlib() {
        let (_, actual) = Compression::Lzma.compress(b"data", Level::default()).unwrap();
        assert_eq!(actual, Compression::Zlib);
    }

    #[test]
    fn name_aliases_normalize_correctly() {
        assert_eq!(Compression::parse("gz"), Compression::Gzip);
        assert_eq!(Compression::parse("bzip"), Compression::Bz2);
        assert_eq!(Compression::parse("bzip2"), Compression::Bz2);
        assert_eq!(Compression::parse("z"), Compression::Zlib);
        assert_eq!(Compression::parse(""), Compression::None);
    }

    #[test]
    fn auto_policy_matches_size_thresholds() {
        assert_eq!(Compression::auto_for_size(100).0, Compression::None);
        assert_eq!(Compression::auto_for_size(20_000).0, Compression::Zlib);
        assert_eq!(Compression::auto_for_size(300_000).0, Compression::Bz2);
    }
}
