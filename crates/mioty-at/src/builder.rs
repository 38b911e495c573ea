//! MiotyModemBuilder -- fluent builder for constructing [`MiotyModem`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! serial port parameters and read pacing before the transport is opened.
//!
//! # Example
//!
//! ```no_run
//! use mioty_at::builder::MiotyModemBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> mioty_core::Result<()> {
//! let modem = MiotyModemBuilder::new()
//!     .serial_port("/dev/ttyUSB0")
//!     .baud_rate(115_200)
//!     .read_timeout(Duration::from_millis(50))
//!     .build()
//!     .await?;
//! let eui = modem.eui().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use mioty_core::error::{Error, Result};
use mioty_core::transport::Transport;
use mioty_transport::{SerialConfig, SerialTransport};

use crate::io::{DEFAULT_MAX_IDLE_POLLS, DEFAULT_READ_TIMEOUT, IoConfig};
use crate::modem::MiotyModem;

/// Fluent builder for [`MiotyModem`].
///
/// All settings have defaults, so the simplest usage is:
///
/// ```ignore
/// let modem = MiotyModemBuilder::new()
///     .serial_port("/dev/ttyUSB0")
///     .build()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct MiotyModemBuilder {
    serial_port: Option<String>,
    serial: SerialConfig,
    read_timeout: Duration,
    max_idle_polls: u32,
}

impl MiotyModemBuilder {
    pub fn new() -> Self {
        MiotyModemBuilder {
            serial_port: None,
            serial: SerialConfig::default(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_idle_polls: DEFAULT_MAX_IDLE_POLLS,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Baud rate the modem is currently configured for (default: 115200).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.serial.baud_rate = baud;
        self
    }

    /// Full serial line settings, replacing the baud rate as well (default:
    /// 115200 8N1, no flow control).
    pub fn serial_config(mut self, config: SerialConfig) -> Self {
        self.serial = config;
        self
    }

    /// Timeout for each individual read from the transport (default: 100ms).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Consecutive empty reads tolerated while waiting for a status line
    /// (default: 600).
    pub fn max_idle_polls(mut self, polls: u32) -> Self {
        self.max_idle_polls = polls;
        self
    }

    fn io_config(&self) -> Result<IoConfig> {
        if self.read_timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "read_timeout must be non-zero".into(),
            ));
        }
        if self.max_idle_polls == 0 {
            return Err(Error::InvalidParameter(
                "max_idle_polls must be at least 1".into(),
            ));
        }
        Ok(IoConfig {
            read_timeout: self.read_timeout,
            max_idle_polls: self.max_idle_polls,
        })
    }

    /// Build a [`MiotyModem`] with a caller-provided transport.
    ///
    /// This is the entry point for testing (pass a `MockTransport` from
    /// `mioty-test-harness`) and for callers that manage the transport
    /// lifecycle themselves.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<MiotyModem> {
        let io = self.io_config()?;
        Ok(MiotyModem::new(transport, io))
    }

    /// Open the configured serial port and build a [`MiotyModem`] on it.
    pub async fn build(self) -> Result<MiotyModem> {
        let io = self.io_config()?;
        let port = self
            .serial_port
            .as_deref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required".into()))?;
        let transport = SerialTransport::open_with_config(port, self.serial.clone()).await?;
        Ok(MiotyModem::new(Box::new(transport), io))
    }
}

impl Default for MiotyModemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mioty_test_harness::MockTransport;
    use mioty_transport::{DEFAULT_BAUD_RATE, FlowControl, Parity, StopBits};

    #[tokio::test]
    async fn defaults() {
        let modem = MiotyModemBuilder::new()
            .build_with_transport(Box::new(MockTransport::new()))
            .await
            .unwrap();
        assert_eq!(modem.io_config(), &IoConfig::default());
    }

    #[tokio::test]
    async fn custom_pacing() {
        let modem = MiotyModemBuilder::new()
            .read_timeout(Duration::from_millis(20))
            .max_idle_polls(5)
            .build_with_transport(Box::new(MockTransport::new()))
            .await
            .unwrap();
        assert_eq!(modem.io_config().read_timeout, Duration::from_millis(20));
        assert_eq!(modem.io_config().max_idle_polls, 5);
    }

    #[test]
    fn serial_settings() {
        let builder = MiotyModemBuilder::new();
        assert_eq!(builder.serial.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(builder.serial.parity, Parity::None);

        let builder = MiotyModemBuilder::new()
            .serial_config(SerialConfig {
                stop_bits: StopBits::Two,
                parity: Parity::Even,
                flow_control: FlowControl::Hardware,
                ..SerialConfig::default()
            })
            .baud_rate(9600);
        assert_eq!(builder.serial.baud_rate, 9600);
        assert_eq!(builder.serial.stop_bits, StopBits::Two);
        assert_eq!(builder.serial.parity, Parity::Even);
        assert_eq!(builder.serial.flow_control, FlowControl::Hardware);
    }

    #[tokio::test]
    async fn zero_idle_polls_rejected() {
        let result = MiotyModemBuilder::new()
            .max_idle_polls(0)
            .build_with_transport(Box::new(MockTransport::new()))
            .await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn zero_read_timeout_rejected() {
        let result = MiotyModemBuilder::new()
            .read_timeout(Duration::ZERO)
            .build_with_transport(Box::new(MockTransport::new()))
            .await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn build_without_port_rejected() {
        let result = MiotyModemBuilder::new().build().await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn build_with_missing_port_fails_to_open() {
        let result = MiotyModemBuilder::new()
            .serial_port("/dev/does-not-exist-mioty")
            .build()
            .await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
