//! mioty-core: Core traits, types, and error definitions for the mioty AT client.
//!
//! This crate defines the pieces every other crate in the workspace shares.
//! Applications that only need to inspect results (return codes, MAC state)
//! can depend on it without pulling in a transport.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel to the modem
//! - [`ReturnCode`] -- closed enumeration of command outcomes
//! - [`Error`] / [`Result`] -- error handling
//! - [`codec`] -- decimal/hex text conversions used on the wire

pub mod code;
pub mod codec;
pub mod error;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use mioty_core::*`.
pub use code::{ReturnCode, Tier};
pub use error::{Error, Result};
pub use transport::Transport;
pub use types::{BidiReceipt, FACTORY_DEFAULTS_LEN, FactoryDefaults, MacState};
