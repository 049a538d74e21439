//! File-like views that present a fixed virtual size over a possibly absent
//! or short backing file, synthesising NUL padding for the difference.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::FileViewError;

/// A cursor-bearing view over bytes of a declared virtual length.
pub trait FileView {
    /// Reads up to `size` bytes starting at the current cursor, advancing it.
    /// May return fewer than `size` bytes only when the view is exhausted
    /// (`tell() == virt_size()`).
    fn read(&mut self, size: usize) -> std::io::Result<Vec<u8>>;

    /// Seeks to an absolute byte position.
    fn seek(&mut self, pos: u64);

    /// The current cursor position.
    fn tell(&self) -> u64;

    /// The declared virtual length of this view.
    fn virt_size(&self) -> u64;

    /// Writes `data` at the current cursor, advancing it. Only bytes that
    /// land strictly within the backing file's physical length are ever
    /// written; see [`FileViewError::WouldExtend`].
    fn write(&mut self, data: &[u8]) -> Result<(), FileViewError>;
}

/// A view backed by a real file, shorter than or equal to `virt_size`.
pub struct PaddedFile {
    file: File,
    real_size: u64,
    virt_size: u64,
    pos: u64,
}

impl PaddedFile {
    pub fn new(file: File, real_size: u64, virt_size: u64) -> Self {
        Self {
            file,
            real_size,
            virt_size,
            pos: 0,
        }
    }

    pub fn real_size(&self) -> u64 {
        self.real_size
    }
}

impl FileView for PaddedFile {
    fn read(&mut self, size: usize) -> std::io::Result<Vec<u8>> {
        let size = size.min(self.virt_size.saturating_sub(self.pos) as usize);
        if size == 0 {
            return Ok(Vec::new());
        }

        self.file.seek(SeekFrom::Start(self.pos))?;
        let mut buf = vec![0u8; size];
        let mut got = 0usize;
        // Short reads from the underlying file are legal (e.g. signal
        // interruption on some platforms); tolerate them here rather than
        // relying on read_exact.
        loop {
            match self.file.read(&mut buf[got..])? {
                0 => break,
                n => {
                    got += n;
                    if got == buf.len() {
                        break;
                    }
                }
            }
        }
        self.pos += got as u64;

        if got < size && self.pos >= self.real_size {
            let pad_len = ((size - got) as u64).min(self.virt_size - self.pos) as usize;
            buf.truncate(got);
            buf.extend(std::iter::repeat(0u8).take(pad_len));
            self.pos += pad_len as u64;
        } else {
            buf.truncate(got);
        }

        Ok(buf)
    }

    fn seek(&mut self, pos: u64) {
        self.pos = pos;
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn virt_size(&self) -> u64 {
        self.virt_size
    }

    fn write(&mut self, data: &[u8]) -> Result<(), FileViewError> {
        if self.pos + data.len() as u64 > self.real_size {
            return Err(FileViewError::WouldExtend);
        }
        self.file.seek(SeekFrom::Start(self.pos))?;
        self.file.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }
}

/// The degenerate view for an absent band: `real_size` is always 0.
pub struct ZeroFile {
    virt_size: u64,
    pos: u64,
}

impl ZeroFile {
    pub fn new(virt_size: u64) -> Self {
        Self { virt_size, pos: 0 }
    }
}

impl FileView for ZeroFile {
    fn read(&mut self, size: usize) -> std::io::Result<Vec<u8>> {
        let n = size.min(self.virt_size.saturating_sub(self.pos) as usize);
        self.pos += n as u64;
        Ok(vec![0u8; n])
    }

    fn seek(&mut self, pos: u64) {
        self.pos = pos;
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn virt_size(&self) -> u64 {
        self.virt_size
    }

    fn write(&mut self, _data: &[u8]) -> Result<(), FileViewError> {
        Err(FileViewError::NoBackingFile)
    }
}

/// Either view, returned by [`crate::band_factory::BandFileFactory`].
pub enum BandView {
    Padded(PaddedFile),
    Zero(ZeroFile),
}

impl FileView for BandView {
    fn read(&mut self, size: usize) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Padded(f) => f.read(size),
            Self::Zero(f) => f.read(size),
        }
    }

    fn seek(&mut self, pos: u64) {
        match self {
            Self::Padded(f) => f.seek(pos),
            Self::Zero(f) => f.seek(pos),
        }
    }

    fn tell(&self) -> u64 {
        match self {
            Self::Padded(f) => f.tell(),
            Self::Zero(f) => f.tell(),
        }
    }

    fn virt_size(&self) -> u64 {
        match self {
            Self::Padded(f) => f.virt_size(),
            Self::Zero(f) => f.virt_size(),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), FileViewError> {
        match self {
            Self::Padded(f) => f.write(data),
            Self::Zero(f) => f.write(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn padded(contents: &[u8], virt_size: u64) -> PaddedFile {
        let mut f = tempfile::tempfile().unwrap();
        f.write_all(contents).unwrap();
        f.seek(SeekFrom::Start(0)).unwrap();
        PaddedFile::new(f, contents.len() as u64, virt_size)
    }

    #[test]
    fn reads_full_real_content() {
        let mut f = padded(b"abcdefgh", 8);
        assert_eq!(f.read(8).unwrap(), b"abcdefgh");
    }

    #[test]
    fn pads_short_file_tail() {
        let mut f = padded(b"abcd", 8);
        assert_eq!(f.read(8).unwrap(), b"abcd\0\0\0\0");
    }

    #[test]
    fn pads_only_up_to_virt_size() {
        let mut f = padded(b"abcd", 6);
        assert_eq!(f.read(10).unwrap(), b"abcd\0\0");
    }

    #[test]
    fn seek_into_padding_region() {
        let mut f = padded(b"abcd", 8);
        f.seek(6);
        assert_eq!(f.read(4).unwrap(), b"\0\0");
    }

    #[test]
    fn seek_inside_real_region_then_read_across_boundary() {
        let mut f = padded(b"abcdefgh", 12);
        f.seek(6);
        assert_eq!(f.read(8).unwrap(), b"gh\0\0\0\0");
    }

    #[test]
    fn zero_file_reads_nul() {
        let mut f = ZeroFile::new(8);
        assert_eq!(f.read(8).unwrap(), vec![0u8; 8]);
    }

    #[test]
    fn zero_file_caps_at_virt_size() {
        let mut f = ZeroFile::new(4);
        assert_eq!(f.read(10).unwrap().len(), 4);
        assert_eq!(f.read(10).unwrap().len(), 0);
    }

    #[test]
    fn zero_file_rejects_write() {
        let mut f = ZeroFile::new(8);
        assert!(matches!(f.write(b"x"), Err(FileViewError::NoBackingFile)));
    }

    #[test]
    fn padded_write_within_real_size_succeeds() {
        let mut f = padded(b"abcdefgh", 8);
        f.seek(2);
        f.write(b"XY").unwrap();
        f.seek(0);
        assert_eq!(f.read(8).unwrap(), b"abXYefgh");
    }

    #[test]
    fn padded_write_crossing_real_size_is_rejected() {
        let mut f = padded(b"abcd", 8);
        f.seek(2);
        assert!(matches!(f.write(b"XYZ"), Err(FileViewError::WouldExtend)));
    }

    #[test]
    fn padded_write_at_real_size_boundary_is_rejected() {
        let mut f = padded(b"abcd", 8);
        f.seek(4);
        assert!(matches!(f.write(b"X"), Err(FileViewError::WouldExtend)));
    }
}
