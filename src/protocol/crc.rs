//! CRC-16/CCITT-FALSE.
//!
//! Init 0xFFFF, polynomial 0x1021, MSB-first, no reflection, no final XOR.
//! Frames are checksummed from the version byte through the end of the
//! payload; the two magic bytes are not covered.

const POLY: u16 = 0x1021;
const INIT: u16 = 0xFFFF;

/// Compute CRC-16/CCITT-FALSE over `bytes`.
///
/// # Example
///
/// ```
/// use nnfpga_link::protocol::crc16_ccitt_false;
///
/// assert_eq!(crc16_ccitt_false(b"123456789"), 0x29B1);
/// ```
pub fn crc16_ccitt_false(bytes: &[u8]) -> u16 {
    update(INIT, bytes)
}

/// Continue a running CRC over more bytes.
pub fn update(mut crc: u16, bytes: &[u8]) -> u16 {
    for &b in bytes {
        crc ^= (b as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ POLY;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}
