//! Uniform sequential reader over in-memory bytes, a file handle, or an
//! arbitrary [`Read`]er, with chunked buffering and bounded pushback.
//!
//! Mirrors the "multi-form I/O source" redesign note: rather than accepting
//! `path | handle | bytes` at every call site, the core only ever consumes
//! a [`ByteStream`], constructed once per variant.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};

/// Where a `seek` call is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

enum Inner {
    Bytes(Cursor<Vec<u8>>),
    File(BufReader<File>),
    Reader(BufReader<Box<dyn Read>>),
}

/// Sequential byte source used by every codec and driver routine.
///
/// Tracks its own logical position so `tell()` works even over a
/// non-seekable [`Inner::Reader`]. Holds a small pushback buffer, bounded in
/// practice to `delimiter.len() - 1` bytes by callers, for the case where a
/// delimiter scan straddles a chunk boundary and the caller needs to return
/// already-consumed bytes to the stream.
pub struct ByteStream {
    inner: Inner,
    pending: Vec<u8>,
    position: u64,
}

const CHUNK_SIZE: usize = 64 * 1024;

impl ByteStream {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            inner: Inner::Bytes(Cursor::new(data)),
            pending: Vec::new(),
            position: 0,
        }
    }

    pub fn from_file(file: File) -> Self {
        Self {
            inner: Inner::File(BufReader::with_capacity(CHUNK_SIZE, file)),
            pending: Vec::new(),
            position: 0,
        }
    }

    /// Wrap an arbitrary, possibly non-seekable, reader.
    pub fn from_reader<R: Read + 'static>(reader: R) -> Self {
        Self {
            inner: Inner::Reader(BufReader::with_capacity(
                CHUNK_SIZE,
                Box::new(reader) as Box<dyn Read>,
            )),
            pending: Vec::new(),
            position: 0,
        }
    }

    fn is_seekable(&self) -> bool {
        matches!(self.inner, Inner::Bytes(_) | Inner::File(_))
    }

    /// Current logical byte offset from the start of the stream.
    pub fn tell(&self) -> u64 {
        self.position
    }

    /// Read exactly `n` bytes, or fewer only if the stream reached EOF.
    pub fn read(&mut self, n: usize) -> std::io::Result<Vec<u8>> {
        let mut out = vec![0_u8; n];
        let mut filled = 0;
        while filled < n {
            let got = self.fill(&mut out[filled..])?;
            if got == 0 {
                break;
            }
            filled += got;
        }
        out.truncate(filled);
        Ok(out)
    }

    /// Read a single byte, or `None` at EOF.
    pub fn read_byte(&mut self) -> std::io::Result<Option<u8>> {
        let mut buf = [0_u8; 1];
        let got = self.fill(&mut buf)?;
        if got == 0 {
            Ok(None)
        } else {
            Ok(Some(buf[0]))
        }
    }

    fn fill(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if !self.pending.is_empty() {
            let n = buf.len().min(self.pending.len());
            let drained: Vec<u8> = self.pending.drain(0..n).collect();
            buf[..n].copy_from_slice(&drained);
            self.position += n as u64;
            return Ok(n);
        }
        let n = match &mut self.inner {
            Inner::Bytes(c) => c.read(buf)?,
            Inner::File(f) => f.read(buf)?,
            Inner::Reader(r) => r.read(buf)?,
        };
        self.position += n as u64;
        Ok(n)
    }

    /// Return previously-read bytes to the front of the stream. Callers are
    /// expected to keep `bytes.len() < delimiter.len()` so pushback stays
    /// bounded, per the component contract.
    pub fn unread(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut combined = Vec::with_capacity(bytes.len() + self.pending.len());
        combined.extend_from_slice(bytes);
        combined.extend_from_slice(&self.pending);
        self.pending = combined;
        self.position = self.position.saturating_sub(bytes.len() as u64);
    }

    /// Advance past `n` bytes without returning them. Falls back to
    /// read-and-discard when the underlying source cannot seek.
    pub fn skip(&mut self, n: u64) -> std::io::Result<()> {
        if n == 0 {
            return Ok(());
        }
        if self.pending.is_empty() && self.is_seekable() {
            self.seek(n as i64, Whence::Current)?;
            return Ok(());
        }
        let mut remaining = n;
        let mut buf = [0_u8; 8192];
        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            let got = self.fill(&mut buf[..want])?;
            if got == 0 {
                break;
            }
            remaining -= got as u64;
        }
        Ok(())
    }

    /// Reposition the stream. Only the seekable variants support this.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> std::io::Result<u64> {
        self.pending.clear();
        let seek_from = match whence {
            Whence::Start => SeekFrom::Start(offset.max(0) as u64),
            Whence::Current => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };
        let new_pos = match &mut self.inner {
            Inner::Bytes(c) => c.seek(seek_from)?,
            Inner::File(f) => f.seek(seek_from)?,
            Inner::Reader(_) => {
                return Err(std::io::Error::other(
                    "seek is not supported on a non-seekable byte stream",
                ))
            }
        };
        self.position = new_pos;
        Ok(new_pos)
    }

    /// Scan for the next occurrence of `delimiter`, returning the payload
    /// bytes before it and consuming the delimiter itself. `delimiter` must
    /// not be empty.
    pub fn read_until(&mut self, delimiter: &[u8]) -> std::io::Result<Vec<u8>> {
        debug_assert!(!delimiter.is_empty());
        let mut payload = Vec::new();
        let mut window: Vec<u8> = Vec::with_capacity(delimiter.len());
        loop {
            let byte = match self.read_byte()? {
                Some(b) => b,
                None => return Ok(payload),
            };
            window.push(byte);
            if window.len() > delimiter.len() {
                payload.push(window.remove(0));
            }
            if window.as_slice() == delimiter {
                return Ok(payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_until_single_byte_delimiter() {
        let mut s = ByteStream::from_bytes(b"hello\x00world\x00".to_vec());
        assert_eq!(s.read_until(&[0]).unwrap(), b"hello");
        assert_eq!(s.read_until(&[0]).unwrap(), b"world");
    }

    #[test]
    fn read_until_multi_byte_delimiter_straddling_window() {
        let mut s = ByteStream::from_bytes(b"abc--xyz--".to_vec());
        assert_eq!(s.read_until(b"--").unwrap(), b"abc");
        assert_eq!(s.read_until(b"--").unwrap(), b"xyz");
    }

    #[test]
    fn unread_then_reread_round_trips() {
        let mut s = ByteStream::from_bytes(b"0123456789".to_vec());
        let first = s.read(4).unwrap();
        assert_eq!(first, b"0123");
        s.unread(&first[2..]);
        assert_eq!(s.tell(), 2);
        let again = s.read(4).unwrap();
        assert_eq!(again, b"2345");
    }

    #[test]
    fn skip_on_non_seekable_reader_reads_and_discards() {
        let reader = Cursor::new(b"0123456789".to_vec());
        let mut s = ByteStream::from_reader(reader);
        s.skip(5).unwrap();
        assert_eq!(s.tell(), 5);
        assert_eq!(s.read(5).unwrap(), b"56789");
    }

    #[test]
    fn tell_tracks_position_across_reads_and_seeks() {
        let mut s = ByteStream::from_bytes(vec![0_u8; 100]);
        s.read(10).unwrap();
        assert_eq!(s.tell(), 10);
        s.seek(50, Whence::Start).unwrap();
        assert_eq!(s.tell(), 50);
    }

    #[test]
    fn short_read_permitted_only_at_eof() {
        let mut s = ByteStream::from_bytes(b"abc".to_vec());
        let got = s.read(10).unwrap();
        assert_eq!(got, b"abc");
    }
}
