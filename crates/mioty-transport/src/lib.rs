//! Transport implementations for the mioty AT client.
//!
//! This crate provides concrete implementations of the
//! [`Transport`](mioty_core::Transport) trait from `mioty-core`:
//!
//! - [`SerialTransport`]: UART, USB virtual COM port, or USB-serial bridge

pub mod serial;

pub use serial::{
    DEFAULT_BAUD_RATE, DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits,
};
