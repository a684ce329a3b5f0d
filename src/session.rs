//! Request/response session over one link.
//!
//! The protocol is half-duplex: every request is written in full and its
//! response frame read and decoded before anything else is sent. Any failure
//! returns the driver to [`SessionState::Idle`] and is handed to the caller;
//! nothing is retried here.
//!
//! # Example
//!
//! ```ignore
//! use nnfpga_link::session::{SessionConfig, SessionDriver};
//! use nnfpga_link::transport::open_serial;
//!
//! let port = open_serial("/dev/ttyUSB0", 115_200)?;
//! let mut session = SessionDriver::start(port, SessionConfig::default())?;
//! let report = session.measure_latency(&infer_request).await?;
//! println!("{:?}", report.latency);
//! ```

use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::codec::{FixedPointCodec, FixedPointConfig, Latency, Status, StatusDelta};
use crate::error::Result;
use crate::protocol::{decode_frame_bytes, encode_frame, packet_types, Packet, PacketType};
use crate::transport::{FrameReader, Link, DEFAULT_POLL_INTERVAL};

/// Default per-read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Frames carry a CRC-16 trailer.
    pub crc_enabled: bool,
    /// Deadline for each exact read (header, payload, trailer).
    pub read_timeout: Duration,
    /// Back-off after a read that returned no data.
    pub poll_interval: Duration,
    /// Discard stale link buffers when the session starts.
    pub clear_on_start: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            crc_enabled: false,
            read_timeout: DEFAULT_READ_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            clear_on_start: true,
        }
    }
}

impl SessionConfig {
    pub fn with_crc(mut self, crc_enabled: bool) -> Self {
        self.crc_enabled = crc_enabled;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_clear_on_start(mut self, clear_on_start: bool) -> Self {
        self.clear_on_start = clear_on_start;
        self
    }
}

/// Where the driver is in the request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No request outstanding.
    Idle,
    /// STATUS_REQ sent, response pending.
    AwaitingStatus,
    /// Work request sent, response pending.
    AwaitingInferResponse,
}

/// Result of a one-shot exchange.
#[derive(Debug, Clone)]
pub struct OneShotOutcome {
    /// Raw response frame as read from the link.
    pub response: Bytes,
    /// Decoded response, or `None` if it failed to decode.
    pub packet: Option<Packet>,
    /// Byte-exact comparison against the expected frame, if one was given.
    pub matches: Option<bool>,
}

impl OneShotOutcome {
    /// True when an expected frame was supplied and differs from the response.
    pub fn is_mismatch(&self) -> bool {
        self.matches == Some(false)
    }
}

/// Result of a status-delta latency measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LatencyReport {
    pub before: Status,
    pub after: Status,
    pub delta: StatusDelta,
    pub latency: Latency,
}

/// Drives request/response exchanges over an exclusively owned link.
pub struct SessionDriver<L> {
    reader: FrameReader<L>,
    config: SessionConfig,
    state: SessionState,
}

impl<L: Link> SessionDriver<L> {
    /// Wrap a link without touching its buffers.
    pub fn new(link: L, config: SessionConfig) -> Self {
        Self {
            reader: FrameReader::with_poll_interval(link, config.poll_interval),
            config,
            state: SessionState::Idle,
        }
    }

    /// Wrap a link and, if configured, discard stale bytes first.
    pub fn start(mut link: L, config: SessionConfig) -> Result<Self> {
        if config.clear_on_start {
            link.discard_buffers()?;
            tracing::debug!("Discarded stale link buffers");
        }
        Ok(Self::new(link, config))
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Release the link.
    pub fn into_inner(self) -> L {
        self.reader.into_inner()
    }

    /// Write a complete request frame and read one raw response frame.
    pub async fn exchange(&mut self, request: &[u8]) -> Result<Bytes> {
        let awaiting = if request.get(3) == Some(&packet_types::STATUS_REQ) {
            SessionState::AwaitingStatus
        } else {
            SessionState::AwaitingInferResponse
        };
        self.transact(request, awaiting).await
    }

    /// Encode a request packet, exchange it, and decode the response.
    ///
    /// Requests with a known response type fail with `UnexpectedPacket` if
    /// the peer answers with anything else.
    pub async fn request(&mut self, packet_type: PacketType, payload: &[u8]) -> Result<Packet> {
        let request = encode_frame(packet_type, payload, self.config.crc_enabled)?;
        let awaiting = match packet_type {
            PacketType::StatusReq => SessionState::AwaitingStatus,
            _ => SessionState::AwaitingInferResponse,
        };
        let response = self.transact(&request, awaiting).await?;
        let packet = decode_frame_bytes(&response, self.config.crc_enabled)?;
        if let Some(expected) = packet_type.response() {
            packet.expect_type(expected)?;
        }
        Ok(packet)
    }

    /// Poll the accelerator counters.
    pub async fn status(&mut self) -> Result<Status> {
        let packet = self.request(PacketType::StatusReq, &[]).await?;
        Status::parse(packet.payload())
    }

    /// Fixed-point format reported by the accelerator.
    ///
    /// Falls back to the default format when the device reports no widths.
    pub async fn reported_fixed_point(&mut self, signed: bool) -> Result<FixedPointConfig> {
        let status = self.status().await?;
        if status.nn_data_w == 0 {
            tracing::warn!("Device reports no fixed-point width, using defaults");
            return Ok(FixedPointConfig::default());
        }
        FixedPointConfig::from_status(&status, signed)
    }

    /// Send an opaque, already framed INFER_REQ and decode its INFER_RSP.
    pub async fn infer(&mut self, request: &[u8]) -> Result<Packet> {
        let response = self
            .transact(request, SessionState::AwaitingInferResponse)
            .await?;
        let packet = decode_frame_bytes(&response, self.config.crc_enabled)?;
        packet.expect_type(PacketType::InferRsp)?;
        Ok(packet)
    }

    /// Quantize `values`, run one inference, and dequantize the outputs.
    pub async fn infer_values(
        &mut self,
        values: &[f64],
        fixed_point: FixedPointConfig,
    ) -> Result<Vec<f64>> {
        let payload = FixedPointCodec::encode(values, fixed_point);
        let request = encode_frame(PacketType::InferReq, &payload, self.config.crc_enabled)?;
        let packet = self.infer(&request).await?;
        FixedPointCodec::decode_values(packet.payload(), fixed_point)
    }

    /// Send one request, read one response, optionally compare it byte for byte.
    ///
    /// A response that fails to decode is reported through
    /// `packet == None`; read failures are returned as errors.
    pub async fn one_shot(
        &mut self,
        request: &[u8],
        expected: Option<&[u8]>,
    ) -> Result<OneShotOutcome> {
        let response = self.exchange(request).await?;

        let packet = match decode_frame_bytes(&response, self.config.crc_enabled) {
            Ok(packet) => {
                tracing::debug!(
                    "Response type 0x{:02X}, payload {} bytes",
                    packet.packet_type.code(),
                    packet.payload_len()
                );
                Some(packet)
            }
            Err(e) => {
                tracing::warn!("Response frame failed to decode: {}", e);
                None
            }
        };

        let matches = expected.map(|expected| expected == &response[..]);
        if matches == Some(false) {
            tracing::warn!("Response does not match expected bytes");
        }

        Ok(OneShotOutcome {
            response,
            packet,
            matches,
        })
    }

    /// Status, inference, status; derive cycles per inference.
    ///
    /// `NoNewInferences` is a normal outcome, not an error.
    pub async fn measure_latency(&mut self, infer_request: &[u8]) -> Result<LatencyReport> {
        let before = self.status().await?;
        self.infer(infer_request).await?;
        let after = self.status().await?;

        let delta = before.delta(&after);
        let latency = delta.latency();
        match latency {
            Latency::CyclesPerInfer(cycles) => tracing::debug!(
                "{} inferences over {} cycles: {} cycles/inference",
                delta.infers,
                delta.cycles,
                cycles
            ),
            Latency::NoNewInferences => {
                tracing::warn!("No new inferences counted; cannot compute latency")
            }
        }

        Ok(LatencyReport {
            before,
            after,
            delta,
            latency,
        })
    }

    /// One full cycle: write, flush, read a frame. Always ends `Idle`.
    async fn transact(&mut self, request: &[u8], awaiting: SessionState) -> Result<Bytes> {
        self.state = awaiting;
        let result = self.write_then_read(request).await;
        self.state = SessionState::Idle;
        result
    }

    async fn write_then_read(&mut self, request: &[u8]) -> Result<Bytes> {
        let link = self.reader.get_mut();
        link.write_all(request).await?;
        link.flush().await?;
        tracing::debug!("Sent {} request bytes", request.len());

        self.reader
            .read_frame(self.config.crc_enabled, self.config.read_timeout)
            .await
    }
}
