//! Byte-stream link to the accelerator.
//!
//! The session only needs an async byte stream plus the ability to drop
//! stale bytes when it starts. Serial devices implement this through
//! `tokio-serial`; in-memory duplex streams implement it for tests and
//! simulators.
//!
//! # Example
//!
//! ```ignore
//! use nnfpga_link::transport::open_serial;
//!
//! let port = open_serial("/dev/ttyUSB0", 115_200)?;
//! ```

use std::io;

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};

use crate::error::Result;

/// Default UART baud rate of the accelerator bridge.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// A byte stream exclusively owned by one session.
pub trait Link: AsyncRead + AsyncWrite + Unpin + Send {
    /// Discard unread input and unsent output.
    fn discard_buffers(&mut self) -> io::Result<()>;
}

impl Link for SerialStream {
    fn discard_buffers(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::All).map_err(io::Error::from)
    }
}

impl Link for DuplexStream {
    fn discard_buffers(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Open a serial device at `baud`, 8N1.
pub fn open_serial(path: &str, baud: u32) -> Result<SerialStream> {
    let port = tokio_serial::new(path, baud)
        .open_native_async()
        .map_err(io::Error::from)?;
    tracing::debug!("Opened serial port {} at {} baud", path, baud);
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplex_discard_is_noop() {
        let (mut a, _b) = tokio::io::duplex(8);
        assert!(a.discard_buffers().is_ok());
    }

    #[test]
    fn test_open_missing_device_fails() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = rt.block_on(async { open_serial("/dev/nnfpga-link-missing-device", 9600) });
        assert!(result.is_err());
    }
}
