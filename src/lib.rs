//! # nnfpga-link
//!
//! Host-side link to the NN inference accelerator behind a UART.
//!
//! The accelerator speaks a small framed protocol over a byte-serial link
//! with no delimiters. This crate provides:
//!
//! - **Protocol**: 6-byte header, payload, optional CRC-16/CCITT-FALSE trailer
//! - **Codec**: float ↔ fixed-point tensors, STATUS counters
//! - **Transport**: deadline-bounded exact reads and frame assembly
//! - **Session**: half-duplex request/response driver and latency measurement
//!
//! ## Example
//!
//! ```ignore
//! use nnfpga_link::codec::FixedPointConfig;
//! use nnfpga_link::session::{SessionConfig, SessionDriver};
//! use nnfpga_link::transport::open_serial;
//!
//! #[tokio::main]
//! async fn main() -> nnfpga_link::Result<()> {
//!     let port = open_serial("/dev/ttyUSB0", 115_200)?;
//!     let mut session = SessionDriver::start(port, SessionConfig::default())?;
//!
//!     let fixed_point = session.reported_fixed_point(true).await?;
//!     let outputs = session.infer_values(&[0.25, -1.5, 3.0], fixed_point).await?;
//!     println!("{:?}", outputs);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod fixture;
pub mod protocol;
pub mod report;
pub mod session;
pub mod transport;

pub use error::{LinkError, ReadStage, Result};
pub use session::{SessionConfig, SessionDriver};
