//! mioty-test-harness: Test utilities for the mioty AT client.
//!
//! This crate provides [`MockTransport`] for deterministic testing of the AT
//! protocol engine and command API without a modem attached.

pub mod mock_serial;

pub use mock_serial::MockTransport;
