//! Wire format encoding and decoding.
//!
//! Implements the 6-byte frame header:
//! ```text
//! ┌──────────┬─────────┬────────┬──────────┐
//! │ Magic    │ Version │ Type   │ Length   │
//! │ 2 bytes  │ 1 byte  │ 1 byte │ 2 bytes  │
//! │ 0xA55A BE│ 0x01    │        │ uint16 BE│
//! └──────────┴─────────┴────────┴──────────┘
//! ```
//!
//! The header is followed by `length` payload bytes and, on CRC-checked
//! links, a big-endian CRC-16 trailer. All multi-byte header fields are
//! Big Endian.

use crate::error::{LinkError, Result};

/// Header size in bytes (fixed, exactly 6).
pub const HEADER_SIZE: usize = 6;

/// CRC trailer size in bytes.
pub const CRC_SIZE: usize = 2;

/// Frame magic constant.
pub const MAGIC: u16 = 0xA55A;

/// Protocol version byte.
pub const VERSION: u8 = 0x01;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Packet type codes.
pub mod packet_types {
    /// Host asks for accelerator counters.
    pub const STATUS_REQ: u8 = 0x01;
    /// Accelerator answers with a 20-byte status payload.
    pub const STATUS_RSP: u8 = 0x81;
    /// Host submits fixed-point input values.
    pub const INFER_REQ: u8 = 0x02;
    /// Accelerator returns fixed-point output values.
    pub const INFER_RSP: u8 = 0x82;

    /// Responses set the high bit of the request code.
    pub const RESPONSE_BIT: u8 = 0x80;
}

/// Packet type, with reserved codes preserved as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    StatusReq,
    StatusRsp,
    InferReq,
    InferRsp,
    Other(u8),
}

impl PacketType {
    /// Wire code of this type.
    #[inline]
    pub fn code(self) -> u8 {
        self.into()
    }

    /// Check if this is a response type.
    #[inline]
    pub fn is_response(self) -> bool {
        self.code() & packet_types::RESPONSE_BIT != 0
    }

    /// The response type a peer answers this request with.
    ///
    /// Returns `None` for response and reserved types.
    pub fn response(self) -> Option<PacketType> {
        match self {
            PacketType::StatusReq => Some(PacketType::StatusRsp),
            PacketType::InferReq => Some(PacketType::InferRsp),
            _ => None,
        }
    }
}

impl From<u8> for PacketType {
    fn from(value: u8) -> Self {
        match value {
            packet_types::STATUS_REQ => PacketType::StatusReq,
            packet_types::STATUS_RSP => PacketType::StatusRsp,
            packet_types::INFER_REQ => PacketType::InferReq,
            packet_types::INFER_RSP => PacketType::InferRsp,
            other => PacketType::Other(other),
        }
    }
}

impl From<PacketType> for u8 {
    fn from(value: PacketType) -> Self {
        match value {
            PacketType::StatusReq => packet_types::STATUS_REQ,
            PacketType::StatusRsp => packet_types::STATUS_RSP,
            PacketType::InferReq => packet_types::INFER_REQ,
            PacketType::InferRsp => packet_types::INFER_RSP,
            PacketType::Other(raw) => raw,
        }
    }
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Packet type code.
    pub packet_type: PacketType,
    /// Payload length in bytes.
    pub payload_length: u16,
}

impl Header {
    /// Create a new header.
    pub fn new(packet_type: PacketType, payload_length: u16) -> Self {
        Self {
            packet_type,
            payload_length,
        }
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use nnfpga_link::protocol::{Header, PacketType};
    ///
    /// let header = Header::new(PacketType::InferReq, 3);
    /// assert_eq!(header.encode(), [0xA5, 0x5A, 0x01, 0x02, 0x00, 0x03]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (6 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0..2].copy_from_slice(&MAGIC.to_be_bytes());
        buf[2] = VERSION;
        buf[3] = self.packet_type.code();
        buf[4..6].copy_from_slice(&self.payload_length.to_be_bytes());
    }

    /// Decode and validate a header.
    ///
    /// Checks, in order: length, magic, version.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(LinkError::TooShort { len: buf.len() });
        }
        let magic = u16::from_be_bytes([buf[0], buf[1]]);
        if magic != MAGIC {
            return Err(LinkError::BadMagic { found: magic });
        }
        if buf[2] != VERSION {
            return Err(LinkError::BadVersion { found: buf[2] });
        }
        Ok(Self {
            packet_type: PacketType::from(buf[3]),
            payload_length: peek_payload_length(buf),
        })
    }

    /// Total frame size this header describes.
    #[inline]
    pub fn frame_len(&self, crc_enabled: bool) -> usize {
        frame_len(self.payload_length as usize, crc_enabled)
    }
}

/// Read the big-endian length field (bytes 4..6) without validating the header.
///
/// # Panics
///
/// Panics if `header` is shorter than `HEADER_SIZE`.
#[inline]
pub fn peek_payload_length(header: &[u8]) -> u16 {
    u16::from_be_bytes([header[4], header[5]])
}

/// Total frame length for a payload of `payload_len` bytes.
#[inline]
pub fn frame_len(payload_len: usize, crc_enabled: bool) -> usize {
    HEADER_SIZE + payload_len + if crc_enabled { CRC_SIZE } else { 0 }
}
