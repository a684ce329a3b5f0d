//! Fixed-point codec for accelerator tensors.
//!
//! Values travel as `data_width / 8`-byte little-endian two's-complement
//! integers scaled by `2^frac_width`. Quantization rounds half away from
//! zero and saturates to the representable range; it never wraps.
//!
//! # Example
//!
//! ```
//! use nnfpga_link::codec::{FixedPointCodec, FixedPointConfig};
//!
//! let cfg = FixedPointConfig::new(16, 8, true).unwrap();
//! let payload = FixedPointCodec::encode(&[0.0, 1.0, -1.0, 1.5], cfg);
//! let ints = FixedPointCodec::decode_ints(&payload, cfg).unwrap();
//! assert_eq!(ints, vec![0, 256, -256, 384]);
//! ```

use serde::{Deserialize, Serialize};

use super::status::Status;
use crate::error::{LinkError, Result};

/// Default element width used by the accelerator RTL.
pub const DEFAULT_DATA_WIDTH: u32 = 16;

/// Default fractional bits used by the accelerator RTL.
pub const DEFAULT_FRAC_WIDTH: u32 = 10;

/// Widest element the codec supports.
pub const MAX_DATA_WIDTH: u32 = 32;

/// Fixed-point format description.
///
/// Immutable and validated at construction; pass it by value into every
/// codec call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFixedPointConfig", into = "RawFixedPointConfig")]
pub struct FixedPointConfig {
    data_width: u32,
    frac_width: u32,
    signed: bool,
}

/// Unvalidated serde mirror of [`FixedPointConfig`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawFixedPointConfig {
    #[serde(default = "default_data_width")]
    data_width: u32,
    #[serde(default = "default_frac_width")]
    frac_width: u32,
    #[serde(default = "default_signed")]
    signed: bool,
}

fn default_data_width() -> u32 {
    DEFAULT_DATA_WIDTH
}

fn default_frac_width() -> u32 {
    DEFAULT_FRAC_WIDTH
}

fn default_signed() -> bool {
    true
}

impl TryFrom<RawFixedPointConfig> for FixedPointConfig {
    type Error = LinkError;

    fn try_from(raw: RawFixedPointConfig) -> Result<Self> {
        FixedPointConfig::new(raw.data_width, raw.frac_width, raw.signed)
    }
}

impl From<FixedPointConfig> for RawFixedPointConfig {
    fn from(cfg: FixedPointConfig) -> Self {
        Self {
            data_width: cfg.data_width,
            frac_width: cfg.frac_width,
            signed: cfg.signed,
        }
    }
}

impl Default for FixedPointConfig {
    fn default() -> Self {
        Self {
            data_width: DEFAULT_DATA_WIDTH,
            frac_width: DEFAULT_FRAC_WIDTH,
            signed: true,
        }
    }
}

impl FixedPointConfig {
    /// Create a validated configuration.
    ///
    /// `data_width` must be one of 8, 16, 24 or 32 and `frac_width`
    /// below 32.
    pub fn new(data_width: u32, frac_width: u32, signed: bool) -> Result<Self> {
        if data_width == 0 || data_width % 8 != 0 || data_width > MAX_DATA_WIDTH {
            return Err(LinkError::Config(format!(
                "data_width {} must be a multiple of 8 in 8..={}",
                data_width, MAX_DATA_WIDTH
            )));
        }
        if frac_width >= 32 {
            return Err(LinkError::Config(format!(
                "frac_width {} must be below 32",
                frac_width
            )));
        }
        Ok(Self {
            data_width,
            frac_width,
            signed,
        })
    }

    /// Build the format an accelerator reports in its STATUS payload.
    pub fn from_status(status: &Status, signed: bool) -> Result<Self> {
        Self::new(
            u32::from(status.nn_data_w),
            u32::from(status.nn_frac_w),
            signed,
        )
    }

    /// Element width in bits.
    #[inline]
    pub fn data_width(&self) -> u32 {
        self.data_width
    }

    /// Fractional bits.
    #[inline]
    pub fn frac_width(&self) -> u32 {
        self.frac_width
    }

    /// Two's-complement (true) or unsigned (false) elements.
    #[inline]
    pub fn signed(&self) -> bool {
        self.signed
    }

    /// Bytes per encoded element.
    #[inline]
    pub fn element_size(&self) -> usize {
        (self.data_width / 8) as usize
    }

    /// Quantization scale, `2^frac_width`.
    #[inline]
    pub fn scale(&self) -> f64 {
        (1u64 << self.frac_width) as f64
    }

    /// Smallest and largest representable integer.
    pub fn limits(&self) -> (i64, i64) {
        if self.signed {
            let half = 1i64 << (self.data_width - 1);
            (-half, half - 1)
        } else {
            (0, (1i64 << self.data_width) - 1)
        }
    }

    #[inline]
    fn mask(&self) -> u64 {
        (1u64 << self.data_width) - 1
    }
}

/// Fixed-point codec.
///
/// Stateless; all methods take the format by value.
pub struct FixedPointCodec;

impl FixedPointCodec {
    /// Quantize one value: `round(value * 2^frac_width)`, then saturate.
    ///
    /// Ties round away from zero. NaN quantizes to 0 and infinities
    /// saturate to the nearest limit.
    pub fn quantize(value: f64, cfg: FixedPointConfig) -> i64 {
        let scaled = (value * cfg.scale()).round();
        if scaled.is_nan() {
            return 0;
        }
        let (lo, hi) = cfg.limits();
        // Clamp before any two's-complement handling so nothing wraps.
        scaled.clamp(lo as f64, hi as f64) as i64
    }

    /// Reconstruct the real value of a quantized integer.
    #[inline]
    pub fn dequantize(raw: i64, cfg: FixedPointConfig) -> f64 {
        raw as f64 / cfg.scale()
    }

    /// Quantize and pack values into little-endian elements, in input order.
    pub fn encode(values: &[f64], cfg: FixedPointConfig) -> Vec<u8> {
        let step = cfg.element_size();
        let mut out = Vec::with_capacity(values.len() * step);
        for &value in values {
            let q = Self::quantize(value, cfg);
            let raw = (q as u64) & cfg.mask();
            out.extend_from_slice(&raw.to_le_bytes()[..step]);
        }
        out
    }

    /// Split a payload into integers.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` if the length is not a multiple of the
    /// element size.
    pub fn decode_ints(payload: &[u8], cfg: FixedPointConfig) -> Result<Vec<i64>> {
        let step = cfg.element_size();
        if payload.len() % step != 0 {
            return Err(LinkError::MalformedPayload {
                len: payload.len(),
                width: step,
            });
        }

        let sign_bit = 1u64 << (cfg.data_width() - 1);
        let ints = payload
            .chunks_exact(step)
            .map(|chunk| {
                let raw = chunk
                    .iter()
                    .rev()
                    .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
                if cfg.signed() && raw & sign_bit != 0 {
                    raw as i64 - (1i64 << cfg.data_width())
                } else {
                    raw as i64
                }
            })
            .collect();
        Ok(ints)
    }

    /// Decode a payload into real values (`decode_ints / 2^frac_width`).
    pub fn decode_values(payload: &[u8], cfg: FixedPointConfig) -> Result<Vec<f64>> {
        Ok(Self::decode_ints(payload, cfg)?
            .into_iter()
            .map(|raw| Self::dequantize(raw, cfg))
            .collect())
    }
}
