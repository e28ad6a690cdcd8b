//! Thin filesystem collaborator used to materialize an unpacked [`Entry`]
//! onto disk.
//!
//! Deliberately minimal: the codec and driver never touch `std::fs`
//! directly, so alternate restoration targets (an in-memory tree in tests,
//! a sandboxed root) only need to implement this trait. Mirrors the
//! teacher's own preference for a narrow trait at the filesystem seam
//! (`walk::Walk`) rather than threading `Path` through the codec itself.

use std::fs;
use std::io;
use std::path::Path;

use crate::entry::Entry;
use crate::file_type::FileType;

/// Operations needed to restore one entry onto a real or simulated
/// filesystem. Only covers what `spec.md`'s entry model can express:
/// regular files, directories, and symlinks. Device nodes and fifos are
/// recognized on the wire but have no portable `std::fs` equivalent and
/// are reported back to the caller instead of silently dropped.
pub trait Filesystem {
    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn create_symlink(&self, target: &str, link_path: &Path) -> io::Result<()>;
}

/// The default, real-disk implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    #[cfg(unix)]
    fn create_symlink(&self, target: &str, link_path: &Path) -> io::Result<()> {
        if let Some(parent) = link_path.parent() {
            fs::create_dir_all(parent)?;
        }
        std::os::unix::fs::symlink(target, link_path)
    }

    #[cfg(not(unix))]
    fn create_symlink(&self, _target: &str, _link_path: &Path) -> io::Result<()> {
        Err(io::Error::other("symlinks are only supported on unix"))
    }
}

/// Restore `entries` under `dest_dir` using `fs`. Device nodes and fifos
/// are skipped and their names returned, since creating them requires
/// privileges and platform-specific syscalls outside this crate's scope.
pub fn restore(entries: &[Entry], dest_dir: &Path, fs: &impl Filesystem) -> io::Result<Vec<String>> {
    let mut skipped = Vec::new();
    for entry in entries {
        let target = dest_dir.join(entry.fname.trim_start_matches("./"));
        match entry.ftype {
            FileType::Directory => fs.create_dir_all(&target)?,
            FileType::File | FileType::HardLink => {
                fs.write_file(&target, entry.fcontent.as_deref().unwrap_or(&[]))?
            }
            FileType::Symlink => fs.create_symlink(&entry.flinkname, &target)?,
            FileType::CharDevice | FileType::BlockDevice | FileType::Fifo => {
                skipped.push(entry.fname.clone());
            }
        }
    }
    Ok(skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct MemFs {
        files: RefCell<BTreeMap<String, Vec<u8>>>,
        dirs: RefCell<Vec<String>>,
        symlinks: RefCell<Vec<(String, String)>>,
    }

    impl Filesystem for MemFs {
        fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()> {
            self.files
                .borrow_mut()
                .insert(path.to_string_lossy().into_owned(), content.to_vec());
            Ok(())
        }

        fn create_dir_all(&self, path: &Path) -> io::Result<()> {
            self.dirs.borrow_mut().push(path.to_string_lossy().into_owned());
            Ok(())
        }

        fn create_symlink(&self, target: &str, link_path: &Path) -> io::Result<()> {
            self.symlinks
                .borrow_mut()
                .push((link_path.to_string_lossy().into_owned(), target.to_string()));
            Ok(())
        }
    }

    #[test]
    fn restore_writes_files_and_directories_and_symlinks() {
        let mut file_entry = Entry::new("a.txt", FileType::File);
        file_entry.fcontent = Some(b"hi".to_vec());
        let dir_entry = Entry::new("sub/", FileType::Directory);
        let mut link_entry = Entry::new("link", FileType::Symlink);
        link_entry.flinkname = "a.txt".to_string();

        let fs = MemFs::default();
        let skipped = restore(
            &[file_entry, dir_entry, link_entry],
            Path::new("/out"),
            &fs,
        )
        .unwrap();
        assert!(skipped.is_empty());
        assert_eq!(
            fs.files.borrow().get("/out/a.txt"),
            Some(&b"hi".to_vec())
        );
        assert_eq!(fs.dirs.borrow().len(), 1);
        assert_eq!(fs.symlinks.borrow().len(), 1);
    }

    #[test]
    fn restore_reports_device_nodes_as_skipped() {
        let entry = Entry::new("dev0", FileType::CharDevice);
        let fs = MemFs::default();
        let skipped = restore(&[entry], Path::new("/out"), &fs).unwrap();
        assert_eq!(skipped, vec!["./dev0".to_string()]);
    }
}
