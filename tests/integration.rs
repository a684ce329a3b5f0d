//! Integration tests for nnfpga-link.
//!
//! These tests run complete sessions against an in-process fake
//! accelerator that speaks the same framing over a duplex stream.

use std::time::Duration;

use nnfpga_link::codec::{FixedPointCodec, FixedPointConfig, Latency, Status};
use nnfpga_link::fixture::{format_hex_bytes, parse_hex_bytes};
use nnfpga_link::protocol::{decode_frame, encode_frame, PacketType};
use nnfpga_link::session::{SessionConfig, SessionDriver, SessionState};
use nnfpga_link::transport::FrameReader;
use nnfpga_link::LinkError;
use tokio::io::{duplex, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

/// Cycles the fake device charges per inference.
const CYCLES_PER_INFER: u32 = 1_234;

/// Fake accelerator: sums its inputs, counts cycles and inferences.
struct FakeAccelerator {
    crc: bool,
    fixed_point: FixedPointConfig,
    status: Status,
    /// Flip one payload bit in every response when set.
    corrupt_responses: bool,
}

impl FakeAccelerator {
    fn new(crc: bool) -> Self {
        let fixed_point = FixedPointConfig::default();
        Self {
            crc,
            fixed_point,
            status: Status {
                build_id: 0x2024_0601,
                cycles: 50_000,
                stalls: 3,
                infers: 11,
                nn_data_w: fixed_point.data_width() as u16,
                nn_frac_w: fixed_point.frac_width() as u16,
            },
            corrupt_responses: false,
        }
    }

    fn respond(&mut self, request: &[u8]) -> Vec<u8> {
        let packet = decode_frame(request, self.crc).expect("host sent a bad frame");
        let (rsp_type, payload) = match packet.packet_type {
            PacketType::StatusReq => (PacketType::StatusRsp, self.status.to_bytes().to_vec()),
            PacketType::InferReq => {
                let inputs =
                    FixedPointCodec::decode_values(packet.payload(), self.fixed_point).unwrap();
                let sum: f64 = inputs.iter().sum();
                self.status.cycles += CYCLES_PER_INFER;
                self.status.infers += 1;
                (
                    PacketType::InferRsp,
                    FixedPointCodec::encode(&[sum], self.fixed_point),
                )
            }
            other => panic!("unexpected request {:?}", other),
        };

        let mut frame = encode_frame(rsp_type, &payload, self.crc).unwrap().to_vec();
        if self.corrupt_responses && !payload.is_empty() {
            frame[6] ^= 0x01;
        }
        frame
    }

    fn spawn(mut self, link: DuplexStream) -> JoinHandle<Status> {
        tokio::spawn(async move {
            let mut reader = FrameReader::new(link);
            while let Ok(request) = reader.read_frame(self.crc, Duration::from_millis(300)).await {
                let response = self.respond(&request);
                // Dribble the response out to exercise partial reads.
                for chunk in response.chunks(5) {
                    if reader.get_mut().write_all(chunk).await.is_err() {
                        return self.status;
                    }
                    tokio::task::yield_now().await;
                }
            }
            self.status
        })
    }
}

fn session_config(crc: bool) -> SessionConfig {
    SessionConfig::default()
        .with_crc(crc)
        .with_read_timeout(Duration::from_millis(500))
}

/// Full status-delta measurement with and without CRC.
#[tokio::test]
async fn test_latency_measurement_against_fake_device() {
    for crc in [false, true] {
        let (host, device) = duplex(4096);
        let fake = FakeAccelerator::new(crc).spawn(device);

        let payload = FixedPointCodec::encode(&[0.5, 0.25, -1.0], FixedPointConfig::default());
        let infer_req = encode_frame(PacketType::InferReq, &payload, crc).unwrap();

        let mut session = SessionDriver::start(host, session_config(crc)).unwrap();
        let report = session.measure_latency(&infer_req).await.unwrap();

        assert_eq!(report.delta.infers, 1);
        assert_eq!(report.delta.cycles, CYCLES_PER_INFER as i64);
        assert_eq!(report.latency, Latency::CyclesPerInfer(CYCLES_PER_INFER as i64));
        assert_eq!(report.before.build_id, report.after.build_id);
        assert_eq!(session.state(), SessionState::Idle);

        drop(session);
        let final_status = fake.await.unwrap();
        assert_eq!(final_status.infers, 12);
    }
}

/// Floats in, floats out, using the widths the device reports.
#[tokio::test]
async fn test_infer_values_with_reported_fixed_point() {
    let (host, device) = duplex(4096);
    let _fake = FakeAccelerator::new(true).spawn(device);

    let mut session = SessionDriver::start(host, session_config(true)).unwrap();
    let fixed_point = session.reported_fixed_point(true).await.unwrap();
    assert_eq!(fixed_point, FixedPointConfig::default());

    let outputs = session
        .infer_values(&[1.5, 2.25, -0.75], fixed_point)
        .await
        .unwrap();
    assert_eq!(outputs.len(), 1);
    assert!((outputs[0] - 3.0).abs() <= 0.5 / fixed_point.scale());
}

/// Saturation on the device side shows up as the clamped maximum.
#[tokio::test]
async fn test_saturated_output() {
    let (host, device) = duplex(4096);
    let _fake = FakeAccelerator::new(false).spawn(device);

    let cfg = FixedPointConfig::default();
    let mut session = SessionDriver::start(host, session_config(false)).unwrap();
    let outputs = session.infer_values(&[30.0, 30.0], cfg).await.unwrap();

    let (_, hi) = cfg.limits();
    assert_eq!(outputs, vec![hi as f64 / cfg.scale()]);
}

/// A corrupted response payload is caught by the CRC check.
#[tokio::test]
async fn test_corrupted_response_detected() {
    let (host, device) = duplex(4096);
    let mut fake = FakeAccelerator::new(true);
    fake.corrupt_responses = true;
    let _fake = fake.spawn(device);

    let mut session = SessionDriver::start(host, session_config(true)).unwrap();
    let result = session.status().await;
    assert!(matches!(result, Err(LinkError::CrcMismatch { .. })));
    assert_eq!(session.state(), SessionState::Idle);
}

/// Golden fixtures: replay a request and compare the response byte for byte.
#[tokio::test]
async fn test_one_shot_against_golden_fixture() {
    let cfg = FixedPointConfig::default();
    let request = encode_frame(
        PacketType::InferReq,
        &FixedPointCodec::encode(&[1.0, 2.0], cfg),
        false,
    )
    .unwrap();
    let golden = encode_frame(
        PacketType::InferRsp,
        &FixedPointCodec::encode(&[3.0], cfg),
        false,
    )
    .unwrap();

    // Fixtures round-trip through their text form before use.
    let request_fixture = parse_hex_bytes(&format_hex_bytes(&request)).unwrap();
    let golden_fixture = parse_hex_bytes(&format_hex_bytes(&golden)).unwrap();

    let (host, device) = duplex(4096);
    let _fake = FakeAccelerator::new(false).spawn(device);

    let mut session = SessionDriver::start(host, session_config(false)).unwrap();
    let outcome = session
        .one_shot(&request_fixture, Some(&golden_fixture[..]))
        .await
        .unwrap();
    assert_eq!(outcome.matches, Some(true));
    assert_eq!(
        outcome.packet.map(|p| p.packet_type),
        Some(PacketType::InferRsp)
    );
}

/// A device that never answers produces a header-stage timeout.
#[tokio::test]
async fn test_silent_device_times_out() {
    let (host, _device) = duplex(4096);
    let mut session = SessionDriver::start(
        host,
        SessionConfig::default().with_read_timeout(Duration::from_millis(50)),
    )
    .unwrap();

    let request = encode_frame(PacketType::InferReq, &[0, 0], false).unwrap();
    let started = std::time::Instant::now();
    let result = session.infer(&request).await;
    assert!(matches!(
        result,
        Err(LinkError::ReadTimeout {
            expected: 6,
            received: 0,
            ..
        })
    ));
    assert!(started.elapsed() < Duration::from_secs(2));
}
