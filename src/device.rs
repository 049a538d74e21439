//! The narrow interface the NBD protocol engine needs from a block device.
//!
//! [`BandBlockDevice`] is the only production implementor; tests use small
//! fakes to inject I/O failures at precise points without touching the
//! filesystem.

use crate::block_device::BandBlockDevice;
use crate::error::BlockDeviceError;

/// A single read or write surface addressed by volume-absolute byte offset.
pub trait Device {
    fn size_bytes(&self) -> u64;

    /// Returns a lazily-produced sequence of segments covering
    /// `[offset, offset+length)`. Validates eagerly, before any I/O.
    fn read<'a>(
        &'a self,
        offset: u64,
        length: u64,
    ) -> Result<Box<dyn Iterator<Item = Result<Vec<u8>, BlockDeviceError>> + 'a>, BlockDeviceError>;

    fn write(&self, offset: u64, data: &[u8]) -> Result<(), BlockDeviceError>;
}

impl Device for BandBlockDevice {
    fn size_bytes(&self) -> u64 {
        BandBlockDevice::size_bytes(self)
    }

    fn read<'a>(
        &'a self,
        offset: u64,
        length: u64,
    ) -> Result<Box<dyn Iterator<Item = Result<Vec<u8>, BlockDeviceError>> + 'a>, BlockDeviceError>
    {
        let segments = BandBlockDevice::read(self, offset, length)?;
        Ok(Box::new(segments))
    }

    fn write(&self, offset: u64, data: &[u8]) -> Result<(), BlockDeviceError> {
        BandBlockDevice::write(self, offset, data)
    }
}
