//! Protocol module - wire format, CRC, and packet framing.
//!
//! This module implements the frame layout shared with the accelerator:
//! - 6-byte header encoding/decoding
//! - CRC-16/CCITT-FALSE trailer
//! - Packet struct and frame encode/decode

mod crc;
mod packet;
mod wire_format;

pub use crc::{crc16_ccitt_false, update as crc16_update};
pub use packet::{decode_frame, decode_frame_bytes, encode_frame, Packet};
pub use wire_format::{
    frame_len, packet_types, peek_payload_length, Header, PacketType, CRC_SIZE, HEADER_SIZE,
    MAGIC, MAX_PAYLOAD_SIZE, VERSION,
};
