//! Serial port transport for modem communication.
//!
//! This module provides [`SerialTransport`], which implements the [`Transport`]
//! trait for a mioty modem attached over a UART, a USB virtual COM port, or a
//! USB-serial bridge on an evaluation board.
//!
//! # Example
//!
//! ```no_run
//! use mioty_transport::SerialTransport;
//! use mioty_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> mioty_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 115_200).await?;
//!
//! // Query the EUI64
//! transport.send(b"AT-MEUI?\r").await?;
//!
//! let mut buf = [0u8; 64];
//! let n = transport.receive(&mut buf, Duration::from_millis(100)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use mioty_core::error::{Error, Result};
use mioty_core::transport::Transport;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Baud rate used when none is configured.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial port configuration.
///
/// Defaults match the modem's AT interface: 8 data bits, 1 stop bit,
/// no parity, no flow control, at [`DEFAULT_BAUD_RATE`].
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate (the modem can be switched with `AT+IPR`).
    pub baud_rate: u32,
    /// Number of data bits.
    pub data_bits: DataBits,
    /// Number of stop bits.
    pub stop_bits: StopBits,
    /// Parity checking.
    pub parity: Parity,
    /// Flow control.
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

impl SerialConfig {
    /// Default configuration at the given baud rate.
    pub fn with_baud_rate(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Default::default()
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Seven,
    Eight,
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Hardware,
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

/// Map an I/O error from the port onto the client error type.
fn link_error(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::BrokenPipe | ErrorKind::NotConnected | ErrorKind::UnexpectedEof => {
            Error::ConnectionLost
        }
        _ => Error::Io(e),
    }
}

/// Serial port transport to a mioty modem.
pub struct SerialTransport {
    port: Option<SerialStream>,
    port_name: String,
}

impl SerialTransport {
    /// Open a serial port at `baud_rate` with 8N1 framing and no flow control.
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g. "/dev/ttyUSB0" on Linux, "COM3" on Windows)
    /// * `baud_rate` - Baud rate the modem is currently configured for
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_config(port, SerialConfig::with_baud_rate(baud_rate)).await
    }

    /// Open a serial port with full configuration control.
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        tracing::debug!(
            port = %port,
            baud_rate = config.baud_rate,
            data_bits = ?config.data_bits,
            stop_bits = ?config.stop_bits,
            parity = ?config.parity,
            flow_control = ?config.flow_control,
            "Opening modem serial port"
        );

        let stream = tokio_serial::new(port, config.baud_rate)
            .data_bits(config.data_bits.into())
            .stop_bits(config.stop_bits.into())
            .parity(config.parity.into())
            .flow_control(config.flow_control.into())
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %port, error = %e, "Failed to open serial port");
                Error::Transport(format!("failed to open serial port {port}: {e}"))
            })?;

        tracing::info!(port = %port, baud_rate = config.baud_rate, "Modem serial port opened");

        Ok(Self {
            port: Some(stream),
            port_name: port.to_string(),
        })
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(port = %self.port_name, bytes = data.len(), data = ?data, "Sending frame");

        port.write_all(data).await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Failed to send frame");
            link_error(e)
        })?;
        port.flush().await.map_err(link_error)?;

        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        match tokio::time::timeout(timeout, port.read(buf)).await {
            // A zero-length read on a serial stream means the device went away.
            Ok(Ok(0)) if !buf.is_empty() => {
                tracing::warn!(port = %self.port_name, "Serial port reached end of stream");
                Err(Error::ConnectionLost)
            }
            Ok(Ok(n)) => {
                tracing::trace!(port = %self.port_name, bytes = n, data = ?&buf[..n], "Received data");
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(port = %self.port_name, error = %e, "Failed to receive data");
                Err(link_error(e))
            }
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.flush().await {
                tracing::warn!(port = %self.port_name, error = %e, "Failed to flush before closing");
            }
            tracing::info!(port = %self.port_name, "Modem serial port closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_config_default_is_8n1() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.flow_control, FlowControl::None);
    }

    #[test]
    fn serial_config_with_baud_rate_keeps_framing() {
        let config = SerialConfig::with_baud_rate(9600);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.parity, Parity::None);
    }

    #[test]
    fn io_errors_map_to_connection_lost() {
        let e = link_error(std::io::Error::new(ErrorKind::BrokenPipe, "gone"));
        assert!(matches!(e, Error::ConnectionLost));
        let e = link_error(std::io::Error::new(ErrorKind::UnexpectedEof, "eof"));
        assert!(matches!(e, Error::ConnectionLost));
        let e = link_error(std::io::Error::new(ErrorKind::InvalidData, "framing"));
        assert!(matches!(e, Error::Io(_)));
    }

    #[tokio::test]
    async fn open_missing_port_is_transport_error() {
        let result = SerialTransport::open("/dev/does-not-exist-mioty", 9600).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
