//! Transport trait for modem communication.
//!
//! The [`Transport`] trait abstracts over the byte-stream link to a mioty
//! modem. The AT protocol engine in `mioty-at` operates on a `Transport`
//! rather than directly on a serial port, so the same code drives real
//! hardware (`SerialTransport` from `mioty-transport`) and scripted fakes
//! (`MockTransport` from `mioty-test-harness`).

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a modem.
///
/// The AT protocol has no request identifiers, so a transport must carry at
/// most one command exchange at a time. Owners are expected to serialise
/// access (the modem driver holds it behind a mutex).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the modem.
    ///
    /// Implementations must not return until every byte has been handed to
    /// the underlying link; there is no partial-write contract.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive up to `buf.len()` bytes from the modem.
    ///
    /// Returns the number of bytes read, which may be zero. If nothing
    /// arrives within `timeout`, returns
    /// [`Error::Timeout`](crate::error::Error::Timeout); callers treat that
    /// as "no data yet". Any other error is a hard failure of the link.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    /// Echoes every sent frame back, one byte per read.
    struct Echo {
        pending: Vec<u8>,
        open: bool,
    }

    #[async_trait]
    impl Transport for Echo {
        async fn send(&mut self, data: &[u8]) -> Result<()> {
            if !self.open {
                return Err(Error::NotConnected);
            }
            self.pending.extend_from_slice(data);
            Ok(())
        }

        async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
            if !self.open {
                return Err(Error::NotConnected);
            }
            if self.pending.is_empty() || buf.is_empty() {
                return Err(Error::Timeout);
            }
            buf[0] = self.pending.remove(0);
            Ok(1)
        }

        async fn close(&mut self) -> Result<()> {
            self.open = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.open
        }
    }

    #[tokio::test]
    async fn usable_as_trait_object() {
        let mut transport: Box<dyn Transport> = Box::new(Echo {
            pending: Vec::new(),
            open: true,
        });

        transport.send(b"AT").await.unwrap();
        let mut buf = [0u8; 4];
        let timeout = Duration::from_millis(1);
        assert_eq!(transport.receive(&mut buf, timeout).await.unwrap(), 1);
        assert_eq!(transport.receive(&mut buf, timeout).await.unwrap(), 1);
        assert_eq!(buf[0], b'T');
        assert!(matches!(
            transport.receive(&mut buf, timeout).await,
            Err(Error::Timeout)
        ));

        transport.close().await.unwrap();
        assert!(!transport.is_connected());
        assert!(matches!(transport.send(b"AT").await, Err(Error::NotConnected)));
    }
}
