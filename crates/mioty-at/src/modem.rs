//! MiotyModem -- typed command API for a mioty modem.
//!
//! This module ties the AT protocol engine ([`protocol`], [`commands`]) to a
//! [`Transport`]. Every operation is one round trip: build the frame, write
//! it, collect the reply until its status line and fields have arrived, then
//! classify the status and pull out the data field the operation returns.
//!
//! The transport sits behind an async mutex that is held from the frame
//! write until the reply has been classified, so concurrent callers sharing
//! one modem are serialised and never interleave on the wire.

use tokio::sync::Mutex;
use tracing::debug;

use mioty_core::error::{Error, Result};
use mioty_core::transport::Transport;
use mioty_core::types::{BidiReceipt, FactoryDefaults, MacState};

use crate::commands::{self, ATTACH_NONCE_LEN, Command};
use crate::io::{self, IoConfig};
use crate::protocol::{self, Frame, MAX_PAYLOAD_LEN, ResponseBuffer};

/// A mioty modem controlled over its AT interface.
///
/// Constructed via [`MiotyModemBuilder`](crate::builder::MiotyModemBuilder).
pub struct MiotyModem {
    transport: Mutex<Box<dyn Transport>>,
    io: IoConfig,
}

impl MiotyModem {
    /// Wrap an already-open transport.
    ///
    /// Prefer [`MiotyModemBuilder`](crate::builder::MiotyModemBuilder), which
    /// validates `io` first.
    pub fn new(transport: Box<dyn Transport>, io: IoConfig) -> Self {
        MiotyModem {
            transport: Mutex::new(transport),
            io,
        }
    }

    /// Read pacing used for every response.
    pub fn io_config(&self) -> &IoConfig {
        &self.io
    }

    /// Whether the underlying transport is still open.
    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_connected()
    }

    /// Close the underlying transport.
    pub async fn close(&self) -> Result<()> {
        self.transport.lock().await.close().await
    }

    /// Give back the transport, e.g. to reopen it at a new baud rate.
    pub fn into_transport(self) -> Box<dyn Transport> {
        self.transport.into_inner()
    }

    // ---------------------------------------------------------------
    // Round trip helpers
    // ---------------------------------------------------------------

    async fn round_trip(&self, command: Command, frame: &[u8]) -> Result<ResponseBuffer> {
        let mut transport = self.transport.lock().await;
        debug!(command = command.mnemonic(), frame_len = frame.len(), "Sending AT command");

        let result = io::exchange(&mut **transport, frame, &self.io).await;
        match &result {
            Ok(response) => debug!(
                command = command.mnemonic(),
                response_len = response.len(),
                "AT command succeeded"
            ),
            Err(e) => debug!(
                command = command.mnemonic(),
                code = e.return_code().as_u8(),
                error = %e,
                "AT command failed"
            ),
        }
        result
    }

    async fn execute(&self, command: Command, frame: Frame) -> Result<()> {
        self.round_trip(command, &frame).await.map(|_| ())
    }

    async fn query_int(&self, command: Command) -> Result<u32> {
        let response = self.round_trip(command, &commands::cmd_read_int(command)).await?;
        protocol::extract_int(response.as_bytes(), command)
    }

    async fn set_int(&self, command: Command, value: u32) -> Result<()> {
        self.execute(command, commands::cmd_set_int(command, value))
            .await
    }

    async fn query_fixed<const N: usize>(&self, command: Command, frame: Frame) -> Result<[u8; N]> {
        let response = self.round_trip(command, &frame).await?;

        let mut scratch = [0u8; MAX_PAYLOAD_LEN];
        let n = protocol::extract_bytes(response.as_bytes(), command, &mut scratch)?;
        if n != N {
            return Err(Error::MalformedResponse(format!(
                "{} returned {n} bytes, expected {N}",
                command.tag()
            )));
        }

        let mut value = [0u8; N];
        value.copy_from_slice(&scratch[..N]);
        Ok(value)
    }

    async fn send_uplink(&self, command: Command, msg: &[u8]) -> Result<Option<u32>> {
        let frame = commands::cmd_send(command, msg)?;
        let response = self.round_trip(command, &frame).await?;
        Ok(protocol::extract_packet_counter(response.as_bytes()))
    }

    async fn send_bidirectional(
        &self,
        command: Command,
        msg: &[u8],
        downlink: &mut [u8],
    ) -> Result<BidiReceipt> {
        let frame = commands::cmd_send(command, msg)?;
        let response = self.round_trip(command, &frame).await?;
        // The uplink went out even when the modem reports no downlink field.
        let decoded =
            protocol::extract_optional_bytes(response.as_bytes(), command, downlink)?;
        let downlink_len = decoded.unwrap_or_else(|| {
            debug!(command = command.mnemonic(), "No downlink field in response");
            0
        });
        Ok(BidiReceipt {
            downlink_len,
            packet_counter: protocol::extract_packet_counter(response.as_bytes()),
        })
    }

    async fn mac_transition(&self, command: Command, frame: Frame) -> Result<Option<MacState>> {
        let response = self.round_trip(command, &frame).await?;
        Ok(protocol::extract_mac_state(response.as_bytes()).map(MacState))
    }

    // ---------------------------------------------------------------
    // Device control
    // ---------------------------------------------------------------

    /// Soft reset (`AT-RST`).
    pub async fn reset(&self) -> Result<()> {
        self.execute(commands::RESET, commands::cmd_reset()).await
    }

    /// Restore factory defaults (`ATZ`).
    pub async fn factory_reset(&self) -> Result<()> {
        self.execute(commands::FACTORY_RESET, commands::cmd_factory_reset())
            .await
    }

    /// Store the factory defaults record (`AT-DEF`).
    pub async fn set_defaults(&self, defaults: &FactoryDefaults) -> Result<()> {
        self.execute(commands::SET_DEFAULTS, commands::cmd_set_defaults(defaults)?)
            .await
    }

    // ---------------------------------------------------------------
    // Identity and keys
    // ---------------------------------------------------------------

    /// Set the network key (`AT-MNWK`).
    pub async fn set_network_key(&self, key: &[u8; 16]) -> Result<()> {
        self.execute(commands::NETWORK_KEY, commands::cmd_set_network_key(key)?)
            .await
    }

    /// Read the IPv6 subnet mask (`AT-MIP6`).
    pub async fn ipv6_subnet_mask(&self) -> Result<[u8; 8]> {
        self.query_fixed(
            commands::IPV6_SUBNET_MASK,
            commands::cmd_read_ipv6_subnet_mask(),
        )
        .await
    }

    pub async fn set_ipv6_subnet_mask(&self, mask: &[u8; 8]) -> Result<()> {
        self.execute(
            commands::IPV6_SUBNET_MASK,
            commands::cmd_set_ipv6_subnet_mask(mask)?,
        )
        .await
    }

    /// Read the EUI64 (`AT-MEUI`).
    pub async fn eui(&self) -> Result<[u8; 8]> {
        self.query_fixed(commands::EUI64, commands::cmd_read_eui())
            .await
    }

    pub async fn set_eui(&self, eui: &[u8; 8]) -> Result<()> {
        self.execute(commands::EUI64, commands::cmd_set_eui(eui)?)
            .await
    }

    /// Read the short address (`AT-MSAD`).
    pub async fn short_address(&self) -> Result<[u8; 2]> {
        self.query_fixed(commands::SHORT_ADDRESS, commands::cmd_read_short_address())
            .await
    }

    pub async fn set_short_address(&self, addr: &[u8; 2]) -> Result<()> {
        self.execute(
            commands::SHORT_ADDRESS,
            commands::cmd_set_short_address(addr)?,
        )
        .await
    }

    /// Set the application crypto key (`AT-ACK`).
    pub async fn set_app_crypto_key(&self, key: &[u8; 16]) -> Result<()> {
        self.execute(
            commands::APP_CRYPTO_KEY,
            commands::cmd_set_app_crypto_key(key)?,
        )
        .await
    }

    // ---------------------------------------------------------------
    // Integer settings
    // ---------------------------------------------------------------

    /// Transmit power level (`AT-UTPL`).
    pub async fn transmit_power(&self) -> Result<u32> {
        self.query_int(commands::TRANSMIT_POWER).await
    }

    pub async fn set_transmit_power(&self, level: u32) -> Result<()> {
        self.set_int(commands::TRANSMIT_POWER, level).await
    }

    /// Serial baud rate (`AT+IPR`).
    ///
    /// After a successful set the modem talks at the new rate; reopen the
    /// transport (see [`into_transport`](Self::into_transport)) to follow it.
    pub async fn baud_rate(&self) -> Result<u32> {
        self.query_int(commands::BAUD_RATE).await
    }

    pub async fn set_baud_rate(&self, baud: u32) -> Result<()> {
        self.set_int(commands::BAUD_RATE, baud).await
    }

    /// Uplink packet counter (`AT-MPCT`).
    pub async fn packet_counter(&self) -> Result<u32> {
        let response = self
            .round_trip(commands::PACKET_COUNTER, &commands::cmd_read_packet_counter())
            .await?;
        protocol::extract_int(response.as_bytes(), commands::PACKET_COUNTER)
    }

    /// Uplink mode (`AT-UM`).
    pub async fn uplink_mode(&self) -> Result<u32> {
        self.query_int(commands::UPLINK_MODE).await
    }

    pub async fn set_uplink_mode(&self, mode: u32) -> Result<()> {
        self.set_int(commands::UPLINK_MODE, mode).await
    }

    /// Uplink synchronisation burst (`AT-US`).
    pub async fn uplink_sync_burst(&self) -> Result<u32> {
        self.query_int(commands::UPLINK_SYNC_BURST).await
    }

    pub async fn set_uplink_sync_burst(&self, burst: u32) -> Result<()> {
        self.set_int(commands::UPLINK_SYNC_BURST, burst).await
    }

    /// Uplink profile (`AT-UP`).
    pub async fn uplink_profile(&self) -> Result<u32> {
        self.query_int(commands::UPLINK_PROFILE).await
    }

    pub async fn set_uplink_profile(&self, profile: u32) -> Result<()> {
        self.set_int(commands::UPLINK_PROFILE, profile).await
    }

    /// Application crypto mode (`AT-ACM`).
    pub async fn app_crypto_mode(&self) -> Result<u32> {
        self.query_int(commands::APP_CRYPTO_MODE).await
    }

    pub async fn set_app_crypto_mode(&self, mode: u32) -> Result<()> {
        self.set_int(commands::APP_CRYPTO_MODE, mode).await
    }

    // ---------------------------------------------------------------
    // Messaging
    // ---------------------------------------------------------------

    /// Unidirectional uplink (`AT-U`). Returns the packet counter if the
    /// modem reported one.
    pub async fn send_uni(&self, msg: &[u8]) -> Result<Option<u32>> {
        self.send_uplink(commands::SEND_UNI, msg).await
    }

    /// Unidirectional uplink with MPF field (`AT-UMPF`).
    pub async fn send_uni_mpf(&self, msg: &[u8]) -> Result<Option<u32>> {
        self.send_uplink(commands::SEND_UNI_MPF, msg).await
    }

    /// Transparent unidirectional uplink (`AT-TU`).
    pub async fn send_uni_transparent(&self, msg: &[u8]) -> Result<Option<u32>> {
        self.send_uplink(commands::SEND_UNI_TRANSPARENT, msg)
            .await
    }

    /// Bidirectional uplink (`AT-B`). The downlink is written to the front
    /// of `downlink`; its length is in the returned receipt.
    pub async fn send_bidi(&self, msg: &[u8], downlink: &mut [u8]) -> Result<BidiReceipt> {
        self.send_bidirectional(commands::SEND_BIDI, msg, downlink)
            .await
    }

    /// Bidirectional uplink with MPF field (`AT-BMPF`).
    pub async fn send_bidi_mpf(&self, msg: &[u8], downlink: &mut [u8]) -> Result<BidiReceipt> {
        self.send_bidirectional(commands::SEND_BIDI_MPF, msg, downlink)
            .await
    }

    /// Transparent bidirectional uplink (`AT-TB`).
    pub async fn send_bidi_transparent(
        &self,
        msg: &[u8],
        downlink: &mut [u8],
    ) -> Result<BidiReceipt> {
        self.send_bidirectional(commands::SEND_BIDI_TRANSPARENT, msg, downlink)
            .await
    }

    // ---------------------------------------------------------------
    // MAC attachment
    // ---------------------------------------------------------------

    /// Over-the-air attach (`AT-MAOA`).
    pub async fn mac_attach(&self, nonce: &[u8; ATTACH_NONCE_LEN]) -> Result<Option<MacState>> {
        self.mac_transition(commands::MAC_ATTACH, commands::cmd_mac_attach(nonce)?)
            .await
    }

    /// Over-the-air detach (`AT-MDOA`), carrying optional user data.
    pub async fn mac_detach(&self, data: &[u8]) -> Result<Option<MacState>> {
        self.mac_transition(commands::MAC_DETACH, commands::cmd_mac_detach(data)?)
            .await
    }

    /// Local attach without over-the-air exchange (`AT-MALO`).
    pub async fn mac_attach_local(&self) -> Result<Option<MacState>> {
        self.mac_transition(commands::MAC_ATTACH_LOCAL, commands::cmd_mac_attach_local())
            .await
    }

    /// Local detach (`AT-MDLO`).
    pub async fn mac_detach_local(&self) -> Result<Option<MacState>> {
        self.mac_transition(commands::MAC_DETACH_LOCAL, commands::cmd_mac_detach_local())
            .await
    }
}
