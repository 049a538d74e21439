//! Typed errors for each layer of the core, each able to report the numeric
//! code that belongs in the wire-visible error field of an NBD reply.

use std::io;

/// errno-shaped numeric codes the wire protocol understands verbatim.
pub mod codes {
    /// `EINVAL`: caller passed an offset/length outside the volume.
    pub const EINVAL: u32 = 22;
    /// `ENOSPC`: a write would have extended or materialised a band file.
    pub const ENOSPC: u32 = 28;
    /// `EIO`: fallback for I/O errors with no platform errno attached.
    pub const EIO: u32 = 5;
}

/// Errors raised by [`crate::file_view::PaddedFile`] and
/// [`crate::file_view::ZeroFile`].
#[derive(Debug, thiserror::Error)]
pub enum FileViewError {
    #[error("write would cross the real size of the band file")]
    WouldExtend,
    #[error("zero file has no backing storage to write into")]
    NoBackingFile,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl FileViewError {
    /// The numeric code this error should surface as on the wire.
    pub fn wire_code(&self) -> u32 {
        match self {
            Self::WouldExtend | Self::NoBackingFile => codes::ENOSPC,
            Self::Io(e) => e.raw_os_error().map_or(codes::EIO, |c| c as u32),
        }
    }
}

/// Errors raised opening a band via [`crate::band_factory::BandFileFactory`].
#[derive(Debug, thiserror::Error)]
pub enum BandOpenError {
    #[error("failed to open band file")]
    Io(#[from] io::Error),
}

impl From<BandOpenError> for io::Error {
    fn from(e: BandOpenError) -> Self {
        match e {
            BandOpenError::Io(e) => e,
        }
    }
}

/// Errors raised by [`crate::block_device::BandBlockDevice`].
#[derive(Debug, thiserror::Error)]
pub enum BlockDeviceError {
    #[error("invalid argument: offset={offset} length={length} total_size={total_size}")]
    InvalidArgument {
        offset: u64,
        length: u64,
        total_size: u64,
    },
    #[error("I/O error on band {index}")]
    Band {
        index: u64,
        #[source]
        source: FileViewError,
    },
}

impl BlockDeviceError {
    /// The numeric code this error should surface as on the wire.
    pub fn wire_code(&self) -> u32 {
        match self {
            Self::InvalidArgument { .. } => codes::EINVAL,
            Self::Band { source, .. } => source.wire_code(),
        }
    }
}

/// Fatal framing errors: bad request magic or an unrecognised command type.
/// These close the connection without a reply.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("bad request magic {0:#x}")]
    BadMagic(u32),
    #[error("unknown command type {0}")]
    UnknownCommand(u32),
}

/// Errors reading `Info.plist`.
#[derive(Debug, thiserror::Error)]
pub enum PlistError {
    #[error("failed to read or parse {path}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: plist::Error,
    },
    #[error("{path} is missing required key `{key}`")]
    MissingKey {
        path: std::path::PathBuf,
        key: &'static str,
    },
    #[error("{path} key `{key}` is not a non-negative integer")]
    NotAnInteger {
        path: std::path::PathBuf,
        key: &'static str,
    },
}

/// Top-level error returned by `serve`.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error(transparent)]
    Plist(#[from] PlistError),
    #[error("failed to bind {addr}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("accept loop failed")]
    Accept(#[source] io::Error),
}
