//! Transport module - the byte stream and the frame reader on top of it.
//!
//! Provides:
//! - [`Link`]: async byte stream owned by one session (serial port, duplex)
//! - [`FrameReader`]: exact-length reads with deadlines and two-stage frame assembly

mod link;
mod reader;

pub use link::{open_serial, Link, DEFAULT_BAUD_RATE};
pub use reader::{FrameReader, DEFAULT_POLL_INTERVAL};
