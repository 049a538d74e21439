//! Resolves a band index to a seekable view over its backing file, or a
//! [`ZeroFile`] when the backing file is absent.

use std::fs::OpenOptions;
use std::path::PathBuf;

use crate::error::BandOpenError;
use crate::file_view::{BandView, PaddedFile, ZeroFile};

/// Whether bands are opened for reading only, or for reading and writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// Produces [`BandView`]s over files in a sparsebundle `bands/` directory.
///
/// This is the sole policy point for absent-band semantics and hex naming;
/// it never creates missing bands or extends short ones.
#[derive(Debug)]
pub struct BandFileFactory {
    bands_dir: PathBuf,
    mode: OpenMode,
}

impl BandFileFactory {
    pub fn new(bands_dir: PathBuf, mode: OpenMode) -> Self {
        Self { bands_dir, mode }
    }

    /// Filename for a band index: lowercase hex, no leading zeros.
    pub fn band_filename(index: u64) -> String {
        format!("{index:x}")
    }

    /// Opens (or synthesises) the view for band `index`, declared to be
    /// `virtual_size` bytes wide.
    pub fn get_band(&self, index: u64, virtual_size: u64) -> Result<BandView, BandOpenError> {
        let path = self.bands_dir.join(Self::band_filename(index));

        let mut opts = OpenOptions::new();
        opts.read(true);
        if self.mode == OpenMode::ReadWrite {
            opts.write(true);
        }

        match opts.open(&path) {
            Ok(file) => {
                let real_size = file.metadata()?.len();
                Ok(BandView::Padded(PaddedFile::new(file, real_size, virtual_size)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(BandView::Zero(ZeroFile::new(virtual_size)))
            }
            Err(e) => Err(BandOpenError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_view::FileView;
    use std::io::Write;

    #[test]
    fn filename_has_no_leading_zeros() {
        assert_eq!(BandFileFactory::band_filename(0), "0");
        assert_eq!(BandFileFactory::band_filename(10), "a");
        assert_eq!(BandFileFactory::band_filename(31), "1f");
    }

    #[test]
    fn absent_band_yields_zero_file() {
        let dir = tempfile::tempdir().unwrap();
        let factory = BandFileFactory::new(dir.path().to_path_buf(), OpenMode::ReadOnly);
        let mut view = factory.get_band(3, 16).unwrap();
        assert!(matches!(view, BandView::Zero(_)));
        assert_eq!(view.read(16).unwrap(), vec![0u8; 16]);
    }

    #[test]
    fn present_band_yields_padded_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2"), b"hello").unwrap();
        let factory = BandFileFactory::new(dir.path().to_path_buf(), OpenMode::ReadOnly);
        let mut view = factory.get_band(2, 8).unwrap();
        assert!(matches!(view, BandView::Padded(_)));
        assert_eq!(view.read(8).unwrap(), b"hello\0\0\0");
    }

    #[test]
    fn other_open_error_propagates() {
        // A directory in place of the band file triggers a non-NotFound I/O
        // error (EISDIR) on open.
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("0")).unwrap();
        let factory = BandFileFactory::new(dir.path().to_path_buf(), OpenMode::ReadOnly);
        assert!(factory.get_band(0, 8).is_err());
    }

    #[test]
    fn read_write_mode_allows_writes_within_real_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("0")).unwrap();
        f.write_all(b"abcdefgh").unwrap();
        drop(f);

        let factory = BandFileFactory::new(dir.path().to_path_buf(), OpenMode::ReadWrite);
        let mut view = factory.get_band(0, 8).unwrap();
        view.write(b"XY").unwrap();
        view.seek(0);
        assert_eq!(view.read(8).unwrap(), b"XYcdefgh");
    }
}
