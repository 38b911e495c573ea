//! mioty-at: AT-command protocol engine and command API for mioty modems.
//!
//! A mioty modem exposes its MAC layer over a serial AT interface. This crate
//! frames commands, collects and classifies replies, and offers one typed
//! async method per modem operation on [`MiotyModem`].
//!
//! # Example
//!
//! ```no_run
//! use mioty_at::MiotyModemBuilder;
//!
//! # async fn example() -> mioty_core::Result<()> {
//! let modem = MiotyModemBuilder::new()
//!     .serial_port("/dev/ttyACM0")
//!     .build()
//!     .await?;
//!
//! modem.mac_attach_local().await?;
//! let counter = modem.send_uni(b"hello").await?;
//! println!("sent, packet counter {counter:?}");
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod commands;
pub mod io;
pub mod modem;
pub mod protocol;

pub use builder::MiotyModemBuilder;
pub use commands::Command;
pub use io::IoConfig;
pub use modem::MiotyModem;
