//! Error types for nnfpga-link.

use std::fmt;

use thiserror::Error;

/// Which part of a frame an exact read was collecting when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStage {
    /// Fixed 6-byte header.
    Header,
    /// Payload of the length declared in the header.
    Payload,
    /// Optional 2-byte CRC trailer.
    Crc,
    /// A plain `read_exact` outside of frame assembly.
    Raw,
}

impl fmt::Display for ReadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadStage::Header => "header",
            ReadStage::Payload => "payload",
            ReadStage::Crc => "crc trailer",
            ReadStage::Raw => "raw",
        };
        f.write_str(name)
    }
}

/// Main error type for all link operations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// I/O error on the underlying byte stream or a fixture file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid fixed-point or session configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Fixed-point payload length is not a multiple of the element width.
    #[error("Malformed payload: {len} bytes is not a multiple of {width}-byte elements")]
    MalformedPayload { len: usize, width: usize },

    /// Payload does not fit the 16-bit length field.
    #[error("Payload of {len} bytes exceeds the 65535-byte frame limit")]
    PayloadTooLarge { len: usize },

    /// Fewer bytes than a frame header.
    #[error("Frame too short: {len} bytes, header needs 6")]
    TooShort { len: usize },

    /// Magic constant mismatch.
    #[error("Bad magic: 0x{found:04X}")]
    BadMagic { found: u16 },

    /// Version byte mismatch.
    #[error("Bad version: 0x{found:02X}")]
    BadVersion { found: u8 },

    /// Buffer shorter than the length the header declares.
    #[error("Truncated frame: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// CRC trailer does not match the computed checksum.
    #[error("CRC mismatch: received 0x{received:04X}, computed 0x{computed:04X}")]
    CrcMismatch { received: u16, computed: u16 },

    /// Exact-length read did not complete before its deadline.
    #[error("Read timeout in {stage}: expected {expected} bytes, got {received}")]
    ReadTimeout {
        stage: ReadStage,
        expected: usize,
        received: usize,
    },

    /// Response packet type does not answer the request that was sent.
    #[error("Unexpected packet type: expected 0x{expected:02X}, got 0x{found:02X}")]
    UnexpectedPacket { expected: u8, found: u8 },

    /// STATUS payload shorter than its fixed layout.
    #[error("STATUS payload too short: {len} bytes, need 20")]
    ShortStatus { len: usize },

    /// Unparsable line in a hex fixture.
    #[error("Hex fixture line {line}: {message}")]
    HexFixture { line: usize, message: String },
}

/// Result type alias using LinkError.
pub type Result<T> = std::result::Result<T, LinkError>;
