//! Entry type codes, closed into an enum per the teacher's own redesign
//! note ("string-typed enums... close them into enums, with string <-> enum
//! converters at the boundary"), mirroring the shape of the teacher's own
//! `file_type.rs`.

use serde::{Deserialize, Serialize};

use crate::error::{NeoFileError, Result};

/// `spec.md` §6.3: `0=file, 1=hardlink, 2=symlink, 3=char-device,
/// 4=block-device, 5=directory, 6=fifo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(test, derive(arbitrary::Arbitrary))]
pub enum FileType {
    #[default]
    File = 0,
    HardLink = 1,
    Symlink = 2,
    CharDevice = 3,
    BlockDevice = 4,
    Directory = 5,
    Fifo = 6,
}

impl FileType {
    pub fn code(self) -> u64 {
        self as u64
    }

    pub fn from_code(code: u64) -> Result<Self> {
        match code {
            0 => Ok(Self::File),
            1 => Ok(Self::HardLink),
            2 => Ok(Self::Symlink),
            3 => Ok(Self::CharDevice),
            4 => Ok(Self::BlockDevice),
            5 => Ok(Self::Directory),
            6 => Ok(Self::Fifo),
            other => Err(NeoFileError::MalformedRecord(format!(
                "unknown file type code: {other}"
            ))),
        }
    }

    pub fn is_directory(self) -> bool {
        matches!(self, Self::Directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trips_for_every_variant() {
        for ft in [
            FileType::File,
            FileType::HardLink,
            FileType::Symlink,
            FileType::CharDevice,
            FileType::BlockDevice,
            FileType::Directory,
            FileType::Fifo,
        ] {
            assert_eq!(FileType::from_code(ft.code()).unwrap(), ft);
        }
    }

    #[test]
    fn unknown_code_is_malformed_record() {
        let err = FileType::from_code(99).unwrap_err();
        assert!(matches!(err, NeoFileError::MalformedRecord(_)));
    }

    #[test]
    fn only_directory_reports_is_directory() {
        assert!(FileType::Directory.is_directory());
        assert!(!FileType::File.is_directory());
    }
}
