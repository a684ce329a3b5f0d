//! STATUS payload codec and status-delta arithmetic.
//!
//! Layout (20 bytes, little-endian):
//! ```text
//! ┌──────────┬────────┬────────┬────────┬───────────┬───────────┐
//! │ build_id │ cycles │ stalls │ infers │ nn_data_w │ nn_frac_w │
//! │ u32      │ u32    │ u32    │ u32    │ u16       │ u16       │
//! └──────────┴────────┴────────┴────────┴───────────┴───────────┘
//! ```

use serde::Serialize;

use crate::error::{LinkError, Result};

/// STATUS payload size in bytes.
pub const STATUS_PAYLOAD_SIZE: usize = 20;

/// One snapshot of the accelerator counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    pub build_id: u32,
    pub cycles: u32,
    pub stalls: u32,
    pub infers: u32,
    pub nn_data_w: u16,
    pub nn_frac_w: u16,
}

impl Status {
    /// Parse a STATUS payload. Bytes past the fixed layout are ignored.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < STATUS_PAYLOAD_SIZE {
            return Err(LinkError::ShortStatus { len: payload.len() });
        }
        let u32_at = |off: usize| {
            u32::from_le_bytes([
                payload[off],
                payload[off + 1],
                payload[off + 2],
                payload[off + 3],
            ])
        };
        let u16_at = |off: usize| u16::from_le_bytes([payload[off], payload[off + 1]]);

        Ok(Self {
            build_id: u32_at(0),
            cycles: u32_at(4),
            stalls: u32_at(8),
            infers: u32_at(12),
            nn_data_w: u16_at(16),
            nn_frac_w: u16_at(18),
        })
    }

    /// Encode as a STATUS payload.
    pub fn to_bytes(&self) -> [u8; STATUS_PAYLOAD_SIZE] {
        let mut buf = [0u8; STATUS_PAYLOAD_SIZE];
        buf[0..4].copy_from_slice(&self.build_id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.cycles.to_le_bytes());
        buf[8..12].copy_from_slice(&self.stalls.to_le_bytes());
        buf[12..16].copy_from_slice(&self.infers.to_le_bytes());
        buf[16..18].copy_from_slice(&self.nn_data_w.to_le_bytes());
        buf[18..20].copy_from_slice(&self.nn_frac_w.to_le_bytes());
        buf
    }

    /// Field-wise difference `later - self`.
    pub fn delta(&self, later: &Status) -> StatusDelta {
        StatusDelta {
            cycles: i64::from(later.cycles) - i64::from(self.cycles),
            stalls: i64::from(later.stalls) - i64::from(self.stalls),
            infers: i64::from(later.infers) - i64::from(self.infers),
        }
    }
}

/// Counter differences between two snapshots.
///
/// Signed: a counter reset on the device shows up as a negative delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusDelta {
    pub cycles: i64,
    pub stalls: i64,
    pub infers: i64,
}

impl StatusDelta {
    /// Cycles per inference, floor-divided.
    pub fn latency(&self) -> Latency {
        if self.infers <= 0 {
            return Latency::NoNewInferences;
        }
        Latency::CyclesPerInfer(self.cycles.div_euclid(self.infers))
    }
}

/// Outcome of a latency measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Latency {
    /// Average cycles spent per inference.
    CyclesPerInfer(i64),
    /// The inference counter did not advance; the measurement is inconclusive.
    NoNewInferences,
}

impl Latency {
    /// Cycles per inference, if the measurement was conclusive.
    pub fn cycles(&self) -> Option<i64> {
        match self {
            Latency::CyclesPerInfer(c) => Some(*c),
            Latency::NoNewInferences => None,
        }
    }
}
