//! Breadth-first directory walk feeding the `pack` subcommand.
//!
//! Same shape as the teacher's `walk::Walker`: a `VecDeque` of pending
//! `DirEntry`s, directories pushed back onto the queue as they're found.

use std::collections::VecDeque;
use std::fs::DirEntry;
use std::io;
use std::path::Path;

pub struct Walker {
    entries: VecDeque<io::Result<DirEntry>>,
}

impl Walker {
    pub fn new(root: &Path) -> io::Result<Self> {
        let mut walker = Walker {
            entries: VecDeque::new(),
        };
        walker.visit_dir(root)?;
        Ok(walker)
    }

    fn visit_dir(&mut self, path: &Path) -> io::Result<()> {
        self.entries.extend(path.read_dir()?);
        Ok(())
    }
}

impl Iterator for Walker {
    type Item = io::Result<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.pop_front()?;
        match entry {
            Ok(entry) => {
                let file_type = match entry.file_type() {
                    Ok(ft) => ft,
                    Err(e) => return Some(Err(e)),
                };
                if file_type.is_dir() {
                    if let Err(e) = self.visit_dir(&entry.path()) {
                        return Some(Err(e));
                    }
                }
                Some(Ok(entry))
            }
            other => Some(other),
        }
    }
}
