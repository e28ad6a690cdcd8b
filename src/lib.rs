#![doc = include_str!("../README.md")]

mod checksum;
mod codec;
mod compression;
mod driver;
mod entry;
mod error;
mod file_type;
mod format;
pub mod fs;
mod header;
mod record;
mod schema;
mod stream;

pub use checksum::ChecksumAlgo;
pub use compression::{Compression, Level};
pub use driver::{
    list, pack, parse, repack, unpack, validate, ArchiveOptions, EntryValidation, PackItem, PackOptions,
};
pub use entry::{ChecksumPair, Entry, JsonSidecar};
pub use error::{ChecksumScope, NeoFileError, Result};
pub use file_type::FileType;
pub use format::FormatSpec;
pub use header::GlobalHeader;
pub use stream::{ByteStream, Whence};
