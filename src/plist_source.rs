//! A read-only key/value source over an Apple `Info.plist`, exposing only
//! the `band-size` and `size` keys the core needs. Parsing itself is an
//! external collaborator's concern; this module just adapts the `plist`
//! crate's generic `Value` into the two integers we care about.

use std::path::{Path, PathBuf};

use crate::error::PlistError;

/// The two pieces of bundle geometry the core needs from `Info.plist`.
#[derive(Debug, Clone, Copy)]
pub struct BundleInfo {
    /// Width of a band in bytes.
    pub band_size: u64,
    /// Total volume size in bytes (`size` in the plist is in 1024-byte units).
    pub total_size: u64,
}

fn read_uint(dict: &plist::Dictionary, path: &Path, key: &'static str) -> Result<u64, PlistError> {
    let value = dict.get(key).ok_or_else(|| PlistError::MissingKey {
        path: path.to_path_buf(),
        key,
    })?;

    value
        .as_unsigned_integer()
        .ok_or_else(|| PlistError::NotAnInteger {
            path: path.to_path_buf(),
            key,
        })
}

/// Reads `band-size` and `size` from `bundle_dir/Info.plist`.
pub fn read_bundle_info(bundle_dir: &Path) -> Result<BundleInfo, PlistError> {
    let path: PathBuf = bundle_dir.join("Info.plist");
    let value = plist::Value::from_file(&path).map_err(|source| PlistError::Parse {
        path: path.clone(),
        source,
    })?;
    let dict = value.as_dictionary().ok_or_else(|| PlistError::NotAnInteger {
        path: path.clone(),
        key: "(root)",
    })?;

    let band_size = read_uint(dict, &path, "band-size")?;
    let size_kib = read_uint(dict, &path, "size")?;

    Ok(BundleInfo {
        band_size,
        total_size: size_kib * 1024,
    })
}
