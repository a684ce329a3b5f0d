//! Exact-length, deadline-bounded frame reads.
//!
//! The link carries no delimiters, so a frame is assembled in two stages:
//! the fixed 6-byte header first, then exactly the payload length it
//! declares, then the optional CRC trailer.
//!
//! A read that returns zero bytes means "nothing arrived in this slice",
//! not end of stream: the reader backs off for `poll_interval` and tries
//! again until the requested count is reached or the deadline passes.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use nnfpga_link::protocol::{encode_frame, PacketType};
//! use nnfpga_link::transport::FrameReader;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> nnfpga_link::error::Result<()> {
//! let wire = encode_frame(PacketType::InferRsp, &[1, 2], false)?;
//! let mut reader = FrameReader::new(&wire[..]);
//! let frame = reader.read_frame(false, Duration::from_millis(100)).await?;
//! assert_eq!(frame, wire);
//! # Ok(())
//! # }
//! ```

use std::io::ErrorKind;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{sleep_until, timeout_at, Instant};

use crate::error::{LinkError, ReadStage, Result};
use crate::protocol::{frame_len, peek_payload_length, CRC_SIZE, HEADER_SIZE};

/// Default back-off after a read that returned no data.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Reads exact byte counts and whole frames from a byte source.
pub struct FrameReader<R> {
    inner: R,
    poll_interval: Duration,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Create a reader with the default poll interval.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Create a reader with a custom back-off after empty reads.
    pub fn with_poll_interval(inner: R, poll_interval: Duration) -> Self {
        Self {
            inner,
            poll_interval,
        }
    }

    /// Get a reference to the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Get a mutable reference to the underlying source.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwrap the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read exactly `n` bytes before `timeout` elapses.
    ///
    /// # Errors
    ///
    /// `ReadTimeout` with the number of bytes collected so far, or `Io`
    /// for hard transport failures.
    pub async fn read_exact(&mut self, n: usize, timeout: Duration) -> Result<Bytes> {
        self.read_exact_stage(n, ReadStage::Raw, timeout).await
    }

    /// Same as [`read_exact`](Self::read_exact), tagging failures with `stage`.
    pub async fn read_exact_stage(
        &mut self,
        n: usize,
        stage: ReadStage,
        timeout: Duration,
    ) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(n);
        self.fill(&mut buf, stage, timeout).await?;
        Ok(buf.freeze())
    }

    /// Read one complete frame: header, declared payload, optional CRC.
    ///
    /// Returns the raw frame bytes for [`decode_frame`](crate::protocol::decode_frame).
    /// Each stage gets its own `timeout`. The header is not validated here.
    pub async fn read_frame(&mut self, crc_enabled: bool, timeout: Duration) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(HEADER_SIZE);
        self.fill(&mut buf, ReadStage::Header, timeout).await?;

        let length = peek_payload_length(&buf) as usize;
        buf.resize(frame_len(length, crc_enabled), 0);

        let payload_end = HEADER_SIZE + length;
        self.fill(&mut buf[HEADER_SIZE..payload_end], ReadStage::Payload, timeout)
            .await?;
        if crc_enabled {
            self.fill(
                &mut buf[payload_end..payload_end + CRC_SIZE],
                ReadStage::Crc,
                timeout,
            )
            .await?;
        }

        tracing::debug!(
            "Read frame type=0x{:02X} payload={} bytes",
            buf[3],
            length
        );
        Ok(buf.freeze())
    }

    /// Fill `buf` completely or fail at the deadline.
    async fn fill(&mut self, buf: &mut [u8], stage: ReadStage, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let expected = buf.len();
        let timed_out = |received| LinkError::ReadTimeout {
            stage,
            expected,
            received,
        };
        let mut filled = 0;

        while filled < expected {
            match timeout_at(deadline, self.inner.read(&mut buf[filled..])).await {
                Err(_elapsed) => return Err(timed_out(filled)),
                Ok(Ok(0)) => {}
                Ok(Ok(n)) => {
                    filled += n;
                    tracing::trace!("{} read: {}/{} bytes", stage, filled, expected);
                    continue;
                }
                Ok(Err(e))
                    if matches!(
                        e.kind(),
                        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                    ) => {}
                Ok(Err(e)) => return Err(LinkError::Io(e)),
            }

            // Empty slice: back off, but never past the deadline.
            let now = Instant::now();
            if now >= deadline {
                return Err(timed_out(filled));
            }
            sleep_until((now + self.poll_interval).min(deadline)).await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_frame, PacketType};
    use std::collections::VecDeque;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{duplex, AsyncWriteExt, ReadBuf};

    /// Source that never has data.
    struct Silent;

    impl AsyncRead for Silent {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Source that hands out scripted slices; an empty slice is a zero-length read.
    struct Scripted {
        slices: VecDeque<Vec<u8>>,
        calls: usize,
    }

    impl Scripted {
        fn new(slices: Vec<Vec<u8>>) -> Self {
            Self {
                slices: slices.into(),
                calls: 0,
            }
        }
    }

    impl AsyncRead for Scripted {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            self.calls += 1;
            if let Some(mut slice) = self.slices.pop_front() {
                let n = slice.len().min(buf.remaining());
                buf.put_slice(&slice[..n]);
                if n < slice.len() {
                    self.slices.push_front(slice.split_off(n));
                }
            }
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_read_exact_silent_source_times_out() {
        let mut reader = FrameReader::new(Silent);
        let start = std::time::Instant::now();
        let result = reader.read_exact(10, Duration::from_millis(50)).await;
        let elapsed = start.elapsed();

        assert!(matches!(
            result,
            Err(LinkError::ReadTimeout {
                stage: ReadStage::Raw,
                expected: 10,
                received: 0
            })
        ));
        assert!(elapsed >= Duration::from_millis(45), "returned after {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(500), "returned after {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_read_exact_assembles_partial_reads() {
        let source = Scripted::new(vec![vec![1, 2], vec![], vec![3], vec![], vec![], vec![4, 5, 6]]);
        let mut reader = FrameReader::new(source);
        let bytes = reader.read_exact(5, Duration::from_millis(200)).await.unwrap();
        assert_eq!(&bytes[..], &[1, 2, 3, 4, 5]);

        // The sixth byte stays in the source for the next read.
        let rest = reader.read_exact(1, Duration::from_millis(200)).await.unwrap();
        assert_eq!(&rest[..], &[6]);
    }

    #[tokio::test]
    async fn test_read_exact_reports_partial_count_on_timeout() {
        let source = Scripted::new(vec![vec![0xAA, 0xBB, 0xCC]]);
        let mut reader = FrameReader::new(source);
        let result = reader.read_exact(8, Duration::from_millis(30)).await;
        assert!(matches!(
            result,
            Err(LinkError::ReadTimeout {
                expected: 8,
                received: 3,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_read_exact_zero_does_not_read() {
        let mut reader = FrameReader::new(Scripted::new(vec![vec![1]]));
        let bytes = reader.read_exact(0, Duration::from_millis(10)).await.unwrap();
        assert!(bytes.is_empty());
        assert_eq!(reader.get_ref().calls, 0);
    }

    #[tokio::test]
    async fn test_read_frame_without_crc() {
        let wire = encode_frame(PacketType::InferRsp, &[9, 8, 7], false).unwrap();
        let slices = wire.iter().map(|b| vec![*b]).collect();
        let mut reader = FrameReader::new(Scripted::new(slices));

        let frame = reader.read_frame(false, Duration::from_millis(100)).await.unwrap();
        assert_eq!(frame, wire);
    }

    #[tokio::test]
    async fn test_read_frame_with_crc_reads_trailer() {
        let wire = encode_frame(PacketType::StatusRsp, &[0u8; 20], true).unwrap();
        let mut followed = wire.to_vec();
        followed.extend_from_slice(&[0xEE; 4]);
        let mut reader = FrameReader::new(Scripted::new(vec![followed]));

        let frame = reader.read_frame(true, Duration::from_millis(100)).await.unwrap();
        assert_eq!(frame, wire);
        assert_eq!(frame.len(), 28);
    }

    #[tokio::test]
    async fn test_read_frame_empty_payload() {
        let wire = encode_frame(PacketType::StatusReq, &[], false).unwrap();
        let mut reader = FrameReader::new(&wire[..]);
        let frame = reader.read_frame(false, Duration::from_millis(50)).await.unwrap();
        assert_eq!(frame.len(), HEADER_SIZE);
    }

    #[tokio::test]
    async fn test_read_frame_timeout_in_payload_stage() {
        let wire = encode_frame(PacketType::InferRsp, &[1, 2, 3, 4], false).unwrap();
        let mut reader = FrameReader::new(Scripted::new(vec![wire[..8].to_vec()]));
        let result = reader.read_frame(false, Duration::from_millis(30)).await;
        assert!(matches!(
            result,
            Err(LinkError::ReadTimeout {
                stage: ReadStage::Payload,
                expected: 4,
                received: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_read_frame_timeout_in_crc_stage() {
        let wire = encode_frame(PacketType::InferRsp, &[1, 2], true).unwrap();
        let mut reader = FrameReader::new(Scripted::new(vec![wire[..8].to_vec()]));
        let result = reader.read_frame(true, Duration::from_millis(30)).await;
        assert!(matches!(
            result,
            Err(LinkError::ReadTimeout {
                stage: ReadStage::Crc,
                received: 0,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_read_frame_over_duplex_with_delayed_writer() {
        let (mut device, host) = duplex(64);
        let wire = encode_frame(PacketType::InferRsp, &[0x00, 0x01, 0x02, 0x03], true).unwrap();
        let to_send = wire.clone();

        let writer = tokio::spawn(async move {
            for chunk in to_send.chunks(3) {
                device.write_all(chunk).await.unwrap();
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            device
        });

        let mut reader = FrameReader::new(host);
        let frame = reader.read_frame(true, Duration::from_millis(500)).await.unwrap();
        assert_eq!(frame, wire);
        let _device = writer.await.unwrap();
    }
}
