//! Command/response exchange over a [`Transport`].
//!
//! One exchange writes a frame and then reads fixed-size chunks until a
//! status line appears. Labelled fields may trail the status line, so
//! reading goes on until the reply is complete or a read comes back empty.
//! The loop is bounded twice: the response must fit in
//! [`RESPONSE_CAPACITY`](crate::protocol::RESPONSE_CAPACITY) bytes, and no
//! more than [`IoConfig::max_idle_polls`] consecutive reads may come back
//! empty. There are no retries and no sleeps; the transport's read timeout
//! is the only pacing.

use std::time::Duration;

use tracing::{debug, trace, warn};

use mioty_core::error::{Error, Result};
use mioty_core::transport::Transport;

use crate::protocol::{self, ResponseBuffer};

/// Bytes requested from the transport per read.
pub const CHUNK_SIZE: usize = 30;

/// Default per-read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Default limit on consecutive empty reads (one minute at the default
/// read timeout).
pub const DEFAULT_MAX_IDLE_POLLS: u32 = 600;

/// Read pacing for the response collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoConfig {
    /// Timeout passed to every [`Transport::receive`] call.
    pub read_timeout: Duration,
    /// Consecutive empty reads tolerated before giving up.
    pub max_idle_polls: u32,
}

impl Default for IoConfig {
    fn default() -> Self {
        IoConfig {
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_idle_polls: DEFAULT_MAX_IDLE_POLLS,
        }
    }
}

/// Read from `transport` until the accumulated response carries a status
/// line and the field that goes with it.
///
/// Once a status line is present, the first empty read ends collection.
/// A [`Error::Timeout`] from the transport counts as an empty read. Any
/// other transport error ends collection at once with
/// [`Error::ReadFailed`].
pub async fn collect_response(
    transport: &mut dyn Transport,
    config: &IoConfig,
) -> Result<ResponseBuffer> {
    let mut response = ResponseBuffer::new();
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut idle_polls = 0u32;

    loop {
        let n = match transport.receive(&mut chunk, config.read_timeout).await {
            Ok(n) => n,
            Err(Error::Timeout) => 0,
            Err(e) => {
                warn!(error = %e, received = response.len(), "Read failed while collecting response");
                return Err(Error::ReadFailed(e.to_string()));
            }
        };

        if n == 0 {
            if response.status().is_some() {
                return Ok(response);
            }
            idle_polls += 1;
            if idle_polls > config.max_idle_polls {
                warn!(polls = config.max_idle_polls, received = response.len(), "No status line from modem");
                return Err(Error::NoResponse {
                    polls: config.max_idle_polls,
                });
            }
            continue;
        }
        idle_polls = 0;

        trace!(bytes = n, data = ?String::from_utf8_lossy(&chunk[..n]), "Response chunk");
        if let Err(e) = response.push_chunk(&chunk[..n]) {
            warn!(error = %e, "Response overflowed buffer");
            return Err(e);
        }

        if response.is_complete() {
            return Ok(response);
        }
    }
}

/// Send `frame`, collect the reply, and fail with the modem's error code
/// unless the status line reports success.
pub async fn exchange(
    transport: &mut dyn Transport,
    frame: &[u8],
    config: &IoConfig,
) -> Result<ResponseBuffer> {
    transport.send(frame).await?;
    let response = collect_response(transport, config).await?;

    // collect_response only returns once a status line is present.
    if let Some(status) = response.status() {
        debug!(?status, bytes = response.len(), "Response complete");
        protocol::classify(response.as_bytes(), status)?;
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mioty_core::ReturnCode;
    use mioty_test_harness::MockTransport;

    fn fast_config(max_idle_polls: u32) -> IoConfig {
        IoConfig {
            read_timeout: Duration::from_millis(1),
            max_idle_polls,
        }
    }

    #[tokio::test]
    async fn collects_across_chunks() {
        let mut mock = MockTransport::new();
        mock.expect_chunked(b"AT-UTPL?\r", b"-utpl:14\r\n0\r\n", 3);

        let response = exchange(&mut mock, b"AT-UTPL?\r", &IoConfig::default())
            .await
            .unwrap();
        assert_eq!(response.as_bytes(), b"-UTPL:14\r\n0\r\n");
        assert_eq!(mock.receive_calls(), 5);
    }

    #[tokio::test]
    async fn reads_in_chunk_sized_pieces() {
        let mut mock = MockTransport::new();
        let mut reply = vec![b'A'; 40];
        reply.extend_from_slice(b"\r\n0\r\n");
        mock.expect(b"AT-RST\r", &reply);

        let response = exchange(&mut mock, b"AT-RST\r", &IoConfig::default())
            .await
            .unwrap();
        assert_eq!(response.len(), 45);
        // Two data reads, then a quiet read shows nothing trails the status.
        assert_eq!(mock.receive_calls(), 3);
    }

    #[tokio::test]
    async fn mac_error_label_after_status_line() {
        let mut mock = MockTransport::new();
        mock.expect_chunked(b"AT-MALO\r", b"\r\n1\r\n-MERR:6\r\n", 5);

        let err = exchange(&mut mock, b"AT-MALO\r", &IoConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Modem(ReturnCode::MacNodeNotAttached)));
        assert_eq!(err.return_code().as_u8(), 6);
    }

    #[tokio::test]
    async fn payload_after_status_line() {
        let mut mock = MockTransport::new();
        mock.expect_chunked(
            b"AT-MEUI?\r",
            b"\r\n0\r\n-MEUI:0102030405060708\x1A\r",
            5,
        );

        let response = exchange(&mut mock, b"AT-MEUI?\r", &IoConfig::default())
            .await
            .unwrap();
        assert_eq!(response.as_bytes(), b"\r\n0\r\n-MEUI:0102030405060708\x1A\r");
        // 29 bytes in 5-byte reads; the last one ends the field.
        assert_eq!(mock.receive_calls(), 6);
    }

    #[tokio::test]
    async fn bare_status_ends_on_quiet_read() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT-RST\r", b"\r\n0\r\n");

        let response = exchange(&mut mock, b"AT-RST\r", &fast_config(3))
            .await
            .unwrap();
        assert_eq!(response.as_bytes(), b"\r\n0\r\n");
        assert_eq!(mock.receive_calls(), 2);
    }

    #[tokio::test]
    async fn read_failure_stops_immediately() {
        let mut mock = MockTransport::new();
        mock.expect_read_failure(b"AT-UM?\r", b"-UM:");

        let result = exchange(&mut mock, b"AT-UM?\r", &IoConfig::default()).await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::ReadFailed(_)));
        assert_eq!(err.return_code(), ReturnCode::ReadFailed);
        assert_eq!(err.return_code().as_u8(), 23);
        // One read delivered the partial reply, the second failed; nothing after.
        assert_eq!(mock.receive_calls(), 2);
    }

    #[tokio::test]
    async fn idle_polls_are_bounded() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT-UM?\r", b"-UM:1\r\n");

        let result = exchange(&mut mock, b"AT-UM?\r", &fast_config(3)).await;
        assert!(matches!(result, Err(Error::NoResponse { polls: 3 })));
        // One data read, then max_idle_polls + 1 empty reads.
        assert_eq!(mock.receive_calls(), 5);
    }

    #[tokio::test]
    async fn overflow_is_reported() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT-UM?\r", &[b'x'; protocol::RESPONSE_CAPACITY + 10]);

        let result = exchange(&mut mock, b"AT-UM?\r", &fast_config(3)).await;
        assert!(matches!(result, Err(Error::ResponseOverflow { .. })));
    }

    #[tokio::test]
    async fn mac_error_is_classified() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT-MALO\r", b"-MERR:8\r\n1\r\n");

        let err = exchange(&mut mock, b"AT-MALO\r", &IoConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Modem(ReturnCode::MacAlreadyAttached)));
    }

    #[tokio::test]
    async fn send_errors_propagate() {
        let mut mock = MockTransport::new();
        mock.set_connected(false);

        let result = exchange(&mut mock, b"AT-RST\r", &IoConfig::default()).await;
        assert!(matches!(result, Err(Error::NotConnected)));
        assert_eq!(mock.receive_calls(), 0);
    }

    #[test]
    fn default_config() {
        let config = IoConfig::default();
        assert_eq!(config.read_timeout, Duration::from_millis(100));
        assert_eq!(config.max_idle_polls, 600);
    }
}
