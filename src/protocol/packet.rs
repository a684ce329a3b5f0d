//! Packet struct and frame encode/decode.
//!
//! A [`Packet`] is the typed unit of exchange; its wire encoding is a
//! frame: header, payload, and an optional CRC trailer.
//!
//! # Example
//!
//! ```
//! use nnfpga_link::protocol::{decode_frame, encode_frame, PacketType};
//!
//! let bytes = encode_frame(PacketType::InferReq, &[1, 2, 3], true).unwrap();
//! let packet = decode_frame(&bytes, true).unwrap();
//!
//! assert_eq!(packet.packet_type, PacketType::InferReq);
//! assert_eq!(packet.payload(), &[1, 2, 3]);
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::crc::crc16_ccitt_false;
use super::wire_format::{frame_len, Header, PacketType, HEADER_SIZE, MAX_PAYLOAD_SIZE};
use crate::error::{LinkError, Result};

/// A decoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet type code.
    pub packet_type: PacketType,
    /// Payload bytes (zero-copy slice of the frame when decoded).
    pub payload: Bytes,
}

impl Packet {
    /// Create a new packet.
    pub fn new(packet_type: PacketType, payload: Bytes) -> Self {
        Self {
            packet_type,
            payload,
        }
    }

    /// Create a packet from a payload slice (copies data).
    pub fn from_parts(packet_type: PacketType, payload: &[u8]) -> Self {
        Self {
            packet_type,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Encode this packet as a frame.
    pub fn encode(&self, crc_enabled: bool) -> Result<Bytes> {
        encode_frame(self.packet_type, &self.payload, crc_enabled)
    }

    /// Fail unless this packet has the `expected` type.
    pub fn expect_type(&self, expected: PacketType) -> Result<&Self> {
        if self.packet_type != expected {
            return Err(LinkError::UnexpectedPacket {
                expected: expected.code(),
                found: self.packet_type.code(),
            });
        }
        Ok(self)
    }
}

/// Build a complete frame as a single contiguous buffer.
///
/// The CRC, when enabled, covers the version byte through the end of the
/// payload and is appended big-endian.
///
/// # Errors
///
/// Returns `PayloadTooLarge` if the payload exceeds 65535 bytes.
pub fn encode_frame(packet_type: PacketType, payload: &[u8], crc_enabled: bool) -> Result<Bytes> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(LinkError::PayloadTooLarge { len: payload.len() });
    }

    let header = Header::new(packet_type, payload.len() as u16);
    let mut buf = BytesMut::with_capacity(frame_len(payload.len(), crc_enabled));
    buf.put_slice(&header.encode());
    buf.put_slice(payload);
    if crc_enabled {
        let crc = crc16_ccitt_false(&buf[2..]);
        buf.put_u16(crc);
    }
    Ok(buf.freeze())
}

/// Decode a frame into a packet.
///
/// Checks run in a fixed order: `TooShort`, `BadMagic`, `BadVersion`,
/// `Truncated`, then `CrcMismatch`. Bytes past the end of the frame are
/// ignored.
pub fn decode_frame(data: &[u8], crc_enabled: bool) -> Result<Packet> {
    let header = Header::decode(data)?;
    let length = header.payload_length as usize;

    let expected = header.frame_len(crc_enabled);
    if data.len() < expected {
        return Err(LinkError::Truncated {
            expected,
            actual: data.len(),
        });
    }

    let payload_end = HEADER_SIZE + length;
    if crc_enabled {
        let received = u16::from_be_bytes([data[payload_end], data[payload_end + 1]]);
        let computed = crc16_ccitt_false(&data[2..payload_end]);
        if received != computed {
            return Err(LinkError::CrcMismatch { received, computed });
        }
    }

    Ok(Packet::from_parts(
        header.packet_type,
        &data[HEADER_SIZE..payload_end],
    ))
}

/// Decode a frame held in `Bytes` without copying the payload.
pub fn decode_frame_bytes(data: &Bytes, crc_enabled: bool) -> Result<Packet> {
    let packet = decode_frame(data, crc_enabled)?;
    let payload_end = HEADER_SIZE + packet.payload_len();
    Ok(Packet::new(
        packet.packet_type,
        data.slice(HEADER_SIZE..payload_end),
    ))
}
