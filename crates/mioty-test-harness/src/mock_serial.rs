//! Scripted mock transport for deterministic testing of the AT engine.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. Responses can be delivered in small chunks to
//! exercise the response collector's reassembly, and a read failure can be
//! injected part way through a reply.
//!
//! # Example
//!
//! ```
//! use mioty_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // When the engine sends this query, answer with the transmit power.
//! mock.expect(b"AT-UTPL?\r", b"-UTPL:14\r\n0\r\n");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use mioty_core::error::{Error, Result};
use mioty_core::transport::Transport;

/// One scripted exchange.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// The bytes to hand back once the request has been seen.
    response: Vec<u8>,
    /// Upper bound on bytes returned per `receive()` call.
    chunk_limit: Option<usize>,
    /// Fail the read that follows the last response byte.
    fail_after_response: bool,
}

/// Reply currently being played back.
#[derive(Debug)]
struct Pending {
    response: Vec<u8>,
    cursor: usize,
    chunk_limit: Option<usize>,
    fail_after_response: bool,
}

/// A mock [`Transport`] for testing without a modem.
///
/// Expectations are consumed in order. `send()` records the data, checks it
/// against the next expectation, and arms that expectation's response for
/// subsequent `receive()` calls. With nothing armed, `receive()` returns
/// [`Error::Timeout`], which the collector treats as an empty read.
#[derive(Debug)]
pub struct MockTransport {
    expectations: VecDeque<Expectation>,
    pending: Option<Pending>,
    connected: bool,
    sent_log: Vec<Vec<u8>>,
    receive_calls: usize,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            pending: None,
            connected: true,
            sent_log: Vec::new(),
            receive_calls: 0,
        }
    }

    /// Add an expected request and the full response to return for it.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.push(request, response, None, false);
    }

    /// Like [`expect`](Self::expect), but return at most `chunk` bytes per read.
    pub fn expect_chunked(&mut self, request: &[u8], response: &[u8], chunk: usize) {
        self.push(request, response, Some(chunk.max(1)), false);
    }

    /// Return `partial` for `request`, then fail the next read with
    /// [`Error::ConnectionLost`].
    pub fn expect_read_failure(&mut self, request: &[u8], partial: &[u8]) {
        self.push(request, partial, None, true);
    }

    fn push(
        &mut self,
        request: &[u8],
        response: &[u8],
        chunk_limit: Option<usize>,
        fail_after_response: bool,
    ) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
            chunk_limit,
            fail_after_response,
        });
    }

    /// All data sent through this transport, one entry per `send()` call.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// Number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Number of `receive()` calls made so far, including failed ones.
    pub fn receive_calls(&self) -> usize {
        self.receive_calls
    }

    /// Set the connected state of the mock transport.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        self.sent_log.push(data.to_vec());

        let expectation = self
            .expectations
            .pop_front()
            .ok_or_else(|| Error::Transport("no more expectations in mock transport".into()))?;

        if data != expectation.request.as_slice() {
            return Err(Error::Transport(format!(
                "unexpected send data: expected {:?}, got {:?}",
                String::from_utf8_lossy(&expectation.request),
                String::from_utf8_lossy(data)
            )));
        }

        self.pending = Some(Pending {
            response: expectation.response,
            cursor: 0,
            chunk_limit: expectation.chunk_limit,
            fail_after_response: expectation.fail_after_response,
        });
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        self.receive_calls += 1;

        if !self.connected {
            return Err(Error::NotConnected);
        }

        let Some(pending) = self.pending.as_mut() else {
            return Err(Error::Timeout);
        };

        let remaining = &pending.response[pending.cursor..];
        if remaining.is_empty() {
            let fail = pending.fail_after_response;
            self.pending = None;
            return if fail {
                Err(Error::ConnectionLost)
            } else {
                Err(Error::Timeout)
            };
        }

        let limit = pending.chunk_limit.unwrap_or(usize::MAX);
        let n = remaining.len().min(buf.len()).min(limit);
        buf[..n].copy_from_slice(&remaining[..n]);
        pending.cursor += n;

        if pending.cursor >= pending.response.len() && !pending.fail_after_response {
            self.pending = None;
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.pending = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn basic_send_receive() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT-MPCT?\r", b"-MPCT:7\r\n0\r\n");

        mock.send(b"AT-MPCT?\r").await.unwrap();

        let mut buf = [0u8; 64];
        let n = mock.receive(&mut buf, TIMEOUT).await.unwrap();
        assert_eq!(&buf[..n], b"-MPCT:7\r\n0\r\n");
    }

    #[tokio::test]
    async fn tracks_sent_data() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT-RST\r", b"0\r\n");
        mock.expect(b"ATZ\r", b"0\r\n");

        mock.send(b"AT-RST\r").await.unwrap();
        mock.send(b"ATZ\r").await.unwrap();

        assert_eq!(mock.sent_data().len(), 2);
        assert_eq!(mock.sent_data()[1], b"ATZ\r");
        assert_eq!(mock.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn wrong_request_errors() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT-RST\r", b"0\r\n");

        let result = mock.send(b"ATZ\r").await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn no_expectations_errors() {
        let mut mock = MockTransport::new();
        let result = mock.send(b"AT-RST\r").await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn receive_without_send_times_out() {
        let mut mock = MockTransport::new();
        let mut buf = [0u8; 8];
        let result = mock.receive(&mut buf, TIMEOUT).await;
        assert!(matches!(result, Err(Error::Timeout)));
        assert_eq!(mock.receive_calls(), 1);
    }

    #[tokio::test]
    async fn chunked_delivery() {
        let mut mock = MockTransport::new();
        mock.expect_chunked(b"AT-UM?\r", b"-UM:2\r\n0\r\n", 4);
        mock.send(b"AT-UM?\r").await.unwrap();

        let mut buf = [0u8; 30];
        let mut collected = Vec::new();
        while let Ok(n) = mock.receive(&mut buf, TIMEOUT).await {
            assert!(n <= 4);
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"-UM:2\r\n0\r\n");
    }

    #[tokio::test]
    async fn read_failure_after_partial_response() {
        let mut mock = MockTransport::new();
        mock.expect_read_failure(b"AT-US?\r", b"-US:");
        mock.send(b"AT-US?\r").await.unwrap();

        let mut buf = [0u8; 30];
        assert_eq!(mock.receive(&mut buf, TIMEOUT).await.unwrap(), 4);
        let result = mock.receive(&mut buf, TIMEOUT).await;
        assert!(matches!(result, Err(Error::ConnectionLost)));
        assert_eq!(mock.receive_calls(), 2);
    }

    #[tokio::test]
    async fn disconnected_mock_refuses_io() {
        let mut mock = MockTransport::new();
        mock.close().await.unwrap();
        assert!(!mock.is_connected());

        let result = mock.send(b"AT-RST\r").await;
        assert!(matches!(result, Err(Error::NotConnected)));

        let mut buf = [0u8; 8];
        let result = mock.receive(&mut buf, TIMEOUT).await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }
}
