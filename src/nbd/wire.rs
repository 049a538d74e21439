//! Byte-exact encoding and decoding of the oldstyle NBD handshake, request
//! headers and reply headers. All multi-byte integers are big-endian.

use crate::error::ProtocolError;

pub const REQUEST_MAGIC: u32 = 0x2560_9513;
pub const REPLY_MAGIC: u32 = 0x6744_6698;
const CLISERV_MAGIC: [u8; 8] = [0x00, 0x00, 0x42, 0x02, 0x81, 0x86, 0x12, 0x53];

pub const REQUEST_HEADER_LEN: usize = 28;
pub const REPLY_HEADER_LEN: usize = 16;
pub const GREETING_LEN: usize = 152;

pub type Handle = [u8; 8];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Read,
    Write,
    Disconnect,
}

#[derive(Debug, Clone, Copy)]
pub struct RequestHeader {
    pub command: Command,
    pub handle: Handle,
    pub offset: u64,
    pub length: u32,
}

/// Builds the 152-byte oldstyle greeting sent once on connection accept.
pub fn encode_greeting(total_size: u64) -> [u8; GREETING_LEN] {
    let mut buf = [0u8; GREETING_LEN];
    buf[0..8].copy_from_slice(b"NBDMAGIC");
    buf[8..16].copy_from_slice(&CLISERV_MAGIC);
    buf[16..24].copy_from_slice(&total_size.to_be_bytes());
    // remaining 124 bytes already zeroed
    buf
}

/// Parses a 28-byte request header. The caller guarantees `buf.len() == 28`.
pub fn parse_request(buf: &[u8]) -> Result<RequestHeader, ProtocolError> {
    debug_assert_eq!(buf.len(), REQUEST_HEADER_LEN);

    let magic = u32::from_be_bytes(buf[0..4].try_into().unwrap());
    if magic != REQUEST_MAGIC {
        return Err(ProtocolError::BadMagic(magic));
    }

    let command_type = u32::from_be_bytes(buf[4..8].try_into().unwrap());
    let command = match command_type {
        0 => Command::Read,
        1 => Command::Write,
        2 => Command::Disconnect,
        other => return Err(ProtocolError::UnknownCommand(other)),
    };

    let mut handle = [0u8; 8];
    handle.copy_from_slice(&buf[8..16]);
    let offset = u64::from_be_bytes(buf[16..24].try_into().unwrap());
    let length = u32::from_be_bytes(buf[24..28].try_into().unwrap());

    Ok(RequestHeader {
        command,
        handle,
        offset,
        length,
    })
}

/// Encodes a 16-byte reply header. `error_code` is 0 on success.
pub fn encode_reply_header(error_code: u32, handle: Handle) -> [u8; REPLY_HEADER_LEN] {
    let mut buf = [0u8; REPLY_HEADER_LEN];
    buf[0..4].copy_from_slice(&REPLY_MAGIC.to_be_bytes());
    buf[4..8].copy_from_slice(&error_code.to_be_bytes());
    buf[8..16].copy_from_slice(&handle);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_matches_literal_scenario() {
        let g = encode_greeting(12);
        let mut expected = Vec::new();
        expected.extend_from_slice(b"NBDMAGIC");
        expected.extend_from_slice(&[0x00, 0x00, 0x42, 0x02, 0x81, 0x86, 0x12, 0x53]);
        expected.extend_from_slice(&12u64.to_be_bytes());
        expected.extend(std::iter::repeat(0u8).take(124));
        assert_eq!(g.to_vec(), expected);
    }

    #[test]
    fn parses_read_request() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&REQUEST_MAGIC.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(b"Duisburg");
        buf.extend_from_slice(&4u64.to_be_bytes());
        buf.extend_from_slice(&5u32.to_be_bytes());

        let req = parse_request(&buf).unwrap();
        assert_eq!(req.command, Command::Read);
        assert_eq!(&req.handle, b"Duisburg");
        assert_eq!(req.offset, 4);
        assert_eq!(req.length, 5);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = vec![0u8; REQUEST_HEADER_LEN];
        buf[0..4].copy_from_slice(&0xdead_beefu32.to_be_bytes());
        assert!(matches!(parse_request(&buf), Err(ProtocolError::BadMagic(_))));
    }

    #[test]
    fn rejects_unknown_command() {
        let mut buf = vec![0u8; REQUEST_HEADER_LEN];
        buf[0..4].copy_from_slice(&REQUEST_MAGIC.to_be_bytes());
        buf[4..8].copy_from_slice(&99u32.to_be_bytes());
        assert!(matches!(
            parse_request(&buf),
            Err(ProtocolError::UnknownCommand(99))
        ));
    }

    #[test]
    fn encodes_reply_header() {
        let buf = encode_reply_header(0, *b"Duisburg");
        let mut expected = Vec::new();
        expected.extend_from_slice(&REPLY_MAGIC.to_be_bytes());
        expected.extend_from_slice(&0u32.to_be_bytes());
        expected.extend_from_slice(b"Duisburg");
        assert_eq!(buf.to_vec(), expected);
    }
}
