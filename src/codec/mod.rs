//! Codec module - payload encodings carried inside frames.
//!
//! - [`FixedPointCodec`] - float tensors to/from scaled two's-complement integers
//! - [`Status`] - fixed 20-byte STATUS payload and counter deltas
//!
//! # Design
//!
//! Codecs are marker structs or plain value types with static methods and
//! no hidden state; the format travels with every call as a
//! [`FixedPointConfig`] value.
//!
//! # Example
//!
//! ```
//! use nnfpga_link::codec::{FixedPointCodec, FixedPointConfig, Status};
//!
//! let cfg = FixedPointConfig::default();
//! let payload = FixedPointCodec::encode(&[0.5, -0.25], cfg);
//! assert_eq!(FixedPointCodec::decode_values(&payload, cfg).unwrap(), vec![0.5, -0.25]);
//!
//! let status = Status::parse(&[0u8; 20]).unwrap();
//! assert_eq!(status.cycles, 0);
//! ```

mod fixed_point;
mod status;

pub use fixed_point::{
    FixedPointCodec, FixedPointConfig, DEFAULT_DATA_WIDTH, DEFAULT_FRAC_WIDTH, MAX_DATA_WIDTH,
};
pub use status::{Latency, Status, StatusDelta, STATUS_PAYLOAD_SIZE};
