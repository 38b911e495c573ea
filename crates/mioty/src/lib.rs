//! # mioty -- Host-side client for mioty radio modems
//!
//! `mioty` is an asynchronous Rust library for driving a mioty modem over its
//! serial AT interface: configure identity and keys, attach to the network,
//! and send uplinks with optional downlink.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! mioty = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! Attach and send one uplink:
//!
//! ```no_run
//! use mioty::MiotyModemBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let modem = MiotyModemBuilder::new()
//!         .serial_port("/dev/ttyACM0")
//!         .build()
//!         .await?;
//!
//!     let eui = modem.eui().await?;
//!     println!("EUI64: {eui:02X?}");
//!
//!     modem.mac_attach_local().await?;
//!     let mut downlink = [0u8; 64];
//!     let receipt = modem.send_bidi(b"ping", &mut downlink).await?;
//!     println!("downlink: {:02X?}", &downlink[..receipt.downlink_len]);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate               | Purpose                                          |
//! |---------------------|--------------------------------------------------|
//! | `mioty-core`        | [`Transport`] trait, [`ReturnCode`], errors, codec |
//! | `mioty-transport`   | Serial transport                                 |
//! | `mioty-at`          | AT framing, response collection, [`MiotyModem`]  |
//! | **`mioty`**         | This facade crate -- re-exports everything       |
//!
//! ## Errors
//!
//! Every operation returns [`Result`]. Each [`Error`] maps to exactly one
//! [`ReturnCode`] via [`Error::return_code`], which also tells which layer
//! produced it:
//!
//! ```
//! use mioty::{Error, ReturnCode, Tier};
//!
//! let err = Error::Modem(ReturnCode::from_at(3));
//! assert_eq!(err.return_code(), ReturnCode::AtParamOutOfBounds);
//! assert_eq!(err.return_code().tier(), Tier::At);
//! ```

pub use mioty_core::*;

pub use mioty_at::{Command, IoConfig, MiotyModem, MiotyModemBuilder};

/// AT protocol engine: command descriptors, framing, and response parsing.
pub mod at {
    pub use mioty_at::*;
}

/// Transport implementations.
pub mod transport {
    pub use mioty_transport::*;
}
