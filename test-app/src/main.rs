// mioty test application -- CLI tool for exercising a mioty modem over its
// AT interface, against real hardware or a mock transport.
//
// Usage:
//   mioty-test-app --port /dev/ttyACM0 info
//   mioty-test-app --mock info
//   mioty-test-app --port /dev/ttyACM0 eui set 70B3D56770000001
//   mioty-test-app --port /dev/ttyACM0 power set 14
//   mioty-test-app --port /dev/ttyACM0 attach --local
//   mioty-test-app --port /dev/ttyACM0 send --bidi --variant mpf 0102AABB

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use mioty::codec;
use mioty::transport::{DEFAULT_BAUD_RATE, FlowControl, SerialConfig};
use mioty::{MiotyModem, MiotyModemBuilder};
use mioty_test_harness::MockTransport;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// mioty test application -- drives a mioty modem from the command line.
#[derive(Parser)]
#[command(name = "mioty-test-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyACM0, COM3). Required unless --mock.
    #[arg(long)]
    port: Option<String>,

    /// Baud rate the modem is currently configured for.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Use RTS/CTS hardware flow control on the serial port.
    #[arg(long)]
    rtscts: bool,

    /// Use a mock transport with canned replies instead of a serial port.
    /// Only the `info` command has canned replies.
    #[arg(long)]
    mock: bool,

    /// Timeout for each read from the port, in milliseconds.
    #[arg(long, default_value_t = 100)]
    read_timeout_ms: u64,

    /// Consecutive empty reads tolerated before giving up on a reply.
    #[arg(long, default_value_t = 600)]
    max_idle_polls: u32,

    /// Log every AT round trip (overrides RUST_LOG).
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read and print every queryable setting.
    Info,

    /// Soft reset the modem.
    Reset,

    /// Restore factory defaults.
    FactoryReset,

    /// EUI64 operations.
    Eui {
        #[command(subcommand)]
        action: BytesAction,
    },

    /// IPv6 subnet mask operations.
    Ipv6 {
        #[command(subcommand)]
        action: BytesAction,
    },

    /// Short address operations.
    ShortAddr {
        #[command(subcommand)]
        action: BytesAction,
    },

    /// Network key (write only).
    NetworkKey {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Application crypto key (write only).
    AppKey {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Transmit power level.
    Power {
        #[command(subcommand)]
        action: IntAction,
    },

    /// Modem baud rate.
    Baud {
        #[command(subcommand)]
        action: IntAction,
    },

    /// Uplink mode.
    UplinkMode {
        #[command(subcommand)]
        action: IntAction,
    },

    /// Uplink profile.
    UplinkProfile {
        #[command(subcommand)]
        action: IntAction,
    },

    /// Uplink synchronisation burst.
    SyncBurst {
        #[command(subcommand)]
        action: IntAction,
    },

    /// Application crypto mode.
    CryptoMode {
        #[command(subcommand)]
        action: IntAction,
    },

    /// Read the uplink packet counter.
    PacketCounter,

    /// Send an uplink message.
    Send {
        /// Request a downlink in reply.
        #[arg(long)]
        bidi: bool,

        /// Message flavour.
        #[arg(long, value_enum, default_value = "plain")]
        variant: SendVariant,

        /// Payload as hex (e.g. 0102AABB).
        #[arg(value_parser = parse_hex_bytes)]
        payload: HexBytes,
    },

    /// Attach to the network.
    Attach {
        /// Attach locally instead of over the air.
        #[arg(long)]
        local: bool,

        /// Four-byte nonce as hex for an over-the-air attach.
        #[arg(long, value_parser = parse_hex_bytes)]
        nonce: Option<HexBytes>,
    },

    /// Detach from the network.
    Detach {
        /// Detach locally instead of over the air.
        #[arg(long)]
        local: bool,

        /// Data carried by an over-the-air detach, as hex.
        #[arg(long, value_parser = parse_hex_bytes)]
        data: Option<HexBytes>,
    },
}

#[derive(Subcommand)]
enum BytesAction {
    /// Read the current value.
    Get,
    /// Write a new value.
    Set {
        /// Value as hex.
        #[arg(value_parser = parse_hex_bytes)]
        value: HexBytes,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Write a 16-byte key.
    Set {
        /// Key as 32 hex characters.
        #[arg(value_parser = parse_hex_bytes)]
        key: HexBytes,
    },
}

#[derive(Subcommand)]
enum IntAction {
    /// Read the current value.
    Get,
    /// Write a new value.
    Set { value: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SendVariant {
    Plain,
    Mpf,
    Transparent,
}

/// Binary argument given on the command line as hex.
#[derive(Clone, Debug, PartialEq, Eq)]
struct HexBytes(Vec<u8>);

/// Parse a hex string like "0x70B3D567" or "70b3d567" into bytes.
fn parse_hex_bytes(s: &str) -> std::result::Result<HexBytes, String> {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if s.len() % 2 != 0 {
        return Err(format!("hex string has odd length {}", s.len()));
    }
    if let Some(c) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(format!("invalid hex character '{c}'"));
    }
    let mut bytes = vec![0u8; s.len() / 2];
    codec::hex_to_bytes(s.as_bytes(), &mut bytes);
    Ok(HexBytes(bytes))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Uppercase hex rendering of `bytes`.
fn to_hex(bytes: &[u8]) -> String {
    let mut out = vec![0u8; bytes.len() * 2];
    codec::bytes_to_hex(bytes, &mut out);
    String::from_utf8_lossy(&out).into_owned()
}

/// Require exactly `N` bytes for a fixed-size field.
fn fixed<const N: usize>(bytes: &HexBytes, what: &str) -> Result<[u8; N]> {
    <[u8; N]>::try_from(bytes.0.as_slice())
        .map_err(|_| anyhow!("{what} must be {N} bytes ({} hex chars), got {}", 2 * N, bytes.0.len()))
}

/// Attach the operation name and numeric return code to a modem error.
fn failed(op: &'static str) -> impl FnOnce(mioty::Error) -> anyhow::Error {
    move |e| anyhow!("{op} failed (return code {}): {e}", e.return_code().as_u8())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Mock transport answering the query sequence issued by `info`.
fn info_mock() -> MockTransport {
    let mut mock = MockTransport::new();
    mock.expect(b"AT-MEUI?\r", b"-MEUI:8\t70B3D56770000001\x1A\r\n0\r\n");
    mock.expect(b"AT-MIP6?\r", b"-MIP6:8\tFFFFFFFFFFFF0000\x1A\r\n0\r\n");
    mock.expect(b"AT-MSAD?\r", b"-MSAD:2\t0001\x1A\r\n0\r\n");
    mock.expect(b"AT-UTPL?\r", b"-UTPL:14\r\n0\r\n");
    mock.expect(b"AT+IPR?\r", b"+IPR:115200\r\n0\r\n");
    mock.expect(b"AT-UM?\r", b"-UM:0\r\n0\r\n");
    mock.expect(b"AT-UP?\r", b"-UP:0\r\n0\r\n");
    mock.expect(b"AT-US?\r", b"-US:1\r\n0\r\n");
    mock.expect(b"AT-ACM?\r", b"-ACM:0\r\n0\r\n");
    mock.expect_chunked(b"AT-MPCT?\r", b"-MPCT:42\r\n0\r\n", 4);
    mock
}

fn serial_config(cli: &Cli) -> SerialConfig {
    let mut config = SerialConfig::with_baud_rate(cli.baud);
    if cli.rtscts {
        config.flow_control = FlowControl::Hardware;
    }
    config
}

async fn create_modem(cli: &Cli) -> Result<MiotyModem> {
    let builder = MiotyModemBuilder::new()
        .serial_config(serial_config(cli))
        .read_timeout(Duration::from_millis(cli.read_timeout_ms))
        .max_idle_polls(cli.max_idle_polls);

    if cli.mock {
        if !matches!(cli.command, Command::Info) {
            bail!("--mock only has canned replies for the `info` command");
        }
        let modem = builder
            .build_with_transport(Box::new(info_mock()))
            .await
            .context("failed to build modem with mock transport")?;
        println!("Connected (mock transport)");
        return Ok(modem);
    }

    let port = cli
        .port
        .as_deref()
        .context("--port is required when not using --mock")?;
    let modem = builder
        .serial_port(port)
        .build()
        .await
        .with_context(|| format!("failed to open {port} at {} baud", cli.baud))?;
    println!("Connected to {port} at {} baud", cli.baud);
    Ok(modem)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_info(modem: &MiotyModem) -> Result<()> {
    let eui = modem.eui().await.map_err(failed("read EUI64"))?;
    let mask = modem
        .ipv6_subnet_mask()
        .await
        .map_err(failed("read IPv6 subnet mask"))?;
    let short = modem
        .short_address()
        .await
        .map_err(failed("read short address"))?;
    let power = modem
        .transmit_power()
        .await
        .map_err(failed("read transmit power"))?;
    let baud = modem.baud_rate().await.map_err(failed("read baud rate"))?;
    let mode = modem
        .uplink_mode()
        .await
        .map_err(failed("read uplink mode"))?;
    let profile = modem
        .uplink_profile()
        .await
        .map_err(failed("read uplink profile"))?;
    let burst = modem
        .uplink_sync_burst()
        .await
        .map_err(failed("read sync burst"))?;
    let crypto = modem
        .app_crypto_mode()
        .await
        .map_err(failed("read crypto mode"))?;
    let counter = modem
        .packet_counter()
        .await
        .map_err(failed("read packet counter"))?;

    println!("Modem Information");
    println!("  EUI64:          {}", to_hex(&eui));
    println!("  IPv6 mask:      {}", to_hex(&mask));
    println!("  Short address:  {}", to_hex(&short));
    println!();
    println!("Settings");
    println!("  Transmit power: {power}");
    println!("  Baud rate:      {baud}");
    println!("  Uplink mode:    {mode}");
    println!("  Uplink profile: {profile}");
    println!("  Sync burst:     {burst}");
    println!("  Crypto mode:    {crypto}");
    println!("  Packet counter: {counter}");
    Ok(())
}

async fn cmd_bytes(modem: &MiotyModem, field: &Command, action: &BytesAction) -> Result<()> {
    match (field, action) {
        (Command::Eui { .. }, BytesAction::Get) => {
            let eui = modem.eui().await.map_err(failed("read EUI64"))?;
            println!("EUI64: {}", to_hex(&eui));
        }
        (Command::Eui { .. }, BytesAction::Set { value }) => {
            let eui = fixed::<8>(value, "EUI64")?;
            modem.set_eui(&eui).await.map_err(failed("set EUI64"))?;
            println!("EUI64 set to {}", to_hex(&eui));
        }
        (Command::Ipv6 { .. }, BytesAction::Get) => {
            let mask = modem
                .ipv6_subnet_mask()
                .await
                .map_err(failed("read IPv6 subnet mask"))?;
            println!("IPv6 subnet mask: {}", to_hex(&mask));
        }
        (Command::Ipv6 { .. }, BytesAction::Set { value }) => {
            let mask = fixed::<8>(value, "IPv6 subnet mask")?;
            modem
                .set_ipv6_subnet_mask(&mask)
                .await
                .map_err(failed("set IPv6 subnet mask"))?;
            println!("IPv6 subnet mask set to {}", to_hex(&mask));
        }
        (Command::ShortAddr { .. }, BytesAction::Get) => {
            let addr = modem
                .short_address()
                .await
                .map_err(failed("read short address"))?;
            println!("Short address: {}", to_hex(&addr));
        }
        (Command::ShortAddr { .. }, BytesAction::Set { value }) => {
            let addr = fixed::<2>(value, "short address")?;
            modem
                .set_short_address(&addr)
                .await
                .map_err(failed("set short address"))?;
            println!("Short address set to {}", to_hex(&addr));
        }
        _ => unreachable!("cmd_bytes called for a non-bytes command"),
    }
    Ok(())
}

async fn cmd_int(modem: &MiotyModem, field: &Command, action: &IntAction) -> Result<()> {
    let name = match field {
        Command::Power { .. } => "Transmit power",
        Command::Baud { .. } => "Baud rate",
        Command::UplinkMode { .. } => "Uplink mode",
        Command::UplinkProfile { .. } => "Uplink profile",
        Command::SyncBurst { .. } => "Sync burst",
        Command::CryptoMode { .. } => "Crypto mode",
        _ => unreachable!("cmd_int called for a non-integer command"),
    };

    match action {
        IntAction::Get => {
            let value = match field {
                Command::Power { .. } => modem.transmit_power().await,
                Command::Baud { .. } => modem.baud_rate().await,
                Command::UplinkMode { .. } => modem.uplink_mode().await,
                Command::UplinkProfile { .. } => modem.uplink_profile().await,
                Command::SyncBurst { .. } => modem.uplink_sync_burst().await,
                _ => modem.app_crypto_mode().await,
            }
            .map_err(failed("read setting"))?;
            println!("{name}: {value}");
        }
        IntAction::Set { value } => {
            let value = *value;
            match field {
                Command::Power { .. } => modem.set_transmit_power(value).await,
                Command::Baud { .. } => modem.set_baud_rate(value).await,
                Command::UplinkMode { .. } => modem.set_uplink_mode(value).await,
                Command::UplinkProfile { .. } => modem.set_uplink_profile(value).await,
                Command::SyncBurst { .. } => modem.set_uplink_sync_burst(value).await,
                _ => modem.set_app_crypto_mode(value).await,
            }
            .map_err(failed("write setting"))?;
            println!("{name} set to {value}");
            if matches!(field, Command::Baud { .. }) {
                println!("Reconnect with --baud {value} for further commands");
            }
        }
    }
    Ok(())
}

async fn cmd_send(
    modem: &MiotyModem,
    bidi: bool,
    variant: SendVariant,
    payload: &[u8],
) -> Result<()> {
    if bidi {
        let mut downlink = [0u8; mioty::at::protocol::MAX_PAYLOAD_LEN];
        let receipt = match variant {
            SendVariant::Plain => modem.send_bidi(payload, &mut downlink).await,
            SendVariant::Mpf => modem.send_bidi_mpf(payload, &mut downlink).await,
            SendVariant::Transparent => modem.send_bidi_transparent(payload, &mut downlink).await,
        }
        .map_err(failed("bidirectional uplink"))?;

        println!("Uplink sent ({} bytes)", payload.len());
        if let Some(counter) = receipt.packet_counter {
            println!("  Packet counter: {counter}");
        }
        println!(
            "  Downlink:       {} ({} bytes)",
            to_hex(&downlink[..receipt.downlink_len]),
            receipt.downlink_len
        );
    } else {
        let counter = match variant {
            SendVariant::Plain => modem.send_uni(payload).await,
            SendVariant::Mpf => modem.send_uni_mpf(payload).await,
            SendVariant::Transparent => modem.send_uni_transparent(payload).await,
        }
        .map_err(failed("uplink"))?;

        println!("Uplink sent ({} bytes)", payload.len());
        if let Some(counter) = counter {
            println!("  Packet counter: {counter}");
        }
    }
    Ok(())
}

async fn cmd_attach(modem: &MiotyModem, local: bool, nonce: Option<&HexBytes>) -> Result<()> {
    let state = if local {
        if nonce.is_some() {
            bail!("--nonce is only used for over-the-air attach");
        }
        modem
            .mac_attach_local()
            .await
            .map_err(failed("local attach"))?
    } else {
        let nonce = match nonce {
            Some(n) => fixed::<4>(n, "nonce")?,
            None => [0u8; 4],
        };
        modem.mac_attach(&nonce).await.map_err(failed("attach"))?
    };

    match state {
        Some(state) => println!("Attached ({state})"),
        None => println!("Attached"),
    }
    Ok(())
}

async fn cmd_detach(modem: &MiotyModem, local: bool, data: Option<&HexBytes>) -> Result<()> {
    let state = if local {
        if data.is_some() {
            bail!("--data is only used for over-the-air detach");
        }
        modem
            .mac_detach_local()
            .await
            .map_err(failed("local detach"))?
    } else {
        let data = data.map(|d| d.0.as_slice()).unwrap_or_default();
        modem.mac_detach(data).await.map_err(failed("detach"))?
    };

    match state {
        Some(state) => println!("Detached ({state})"),
        None => println!("Detached"),
    }
    Ok(())
}

async fn run(modem: &MiotyModem, command: &Command) -> Result<()> {
    match command {
        Command::Info => cmd_info(modem).await,
        Command::Reset => {
            modem.reset().await.map_err(failed("reset"))?;
            println!("Modem reset");
            Ok(())
        }
        Command::FactoryReset => {
            modem
                .factory_reset()
                .await
                .map_err(failed("factory reset"))?;
            println!("Factory defaults restored");
            Ok(())
        }
        Command::Eui { action } | Command::Ipv6 { action } | Command::ShortAddr { action } => {
            cmd_bytes(modem, command, action).await
        }
        Command::NetworkKey {
            action: KeyAction::Set { key },
        } => {
            let key = fixed::<16>(key, "network key")?;
            modem
                .set_network_key(&key)
                .await
                .map_err(failed("set network key"))?;
            println!("Network key set");
            Ok(())
        }
        Command::AppKey {
            action: KeyAction::Set { key },
        } => {
            let key = fixed::<16>(key, "application key")?;
            modem
                .set_app_crypto_key(&key)
                .await
                .map_err(failed("set application key"))?;
            println!("Application key set");
            Ok(())
        }
        Command::Power { action }
        | Command::Baud { action }
        | Command::UplinkMode { action }
        | Command::UplinkProfile { action }
        | Command::SyncBurst { action }
        | Command::CryptoMode { action } => cmd_int(modem, command, action).await,
        Command::PacketCounter => {
            let counter = modem
                .packet_counter()
                .await
                .map_err(failed("read packet counter"))?;
            println!("Packet counter: {counter}");
            Ok(())
        }
        Command::Send {
            bidi,
            variant,
            payload,
        } => cmd_send(modem, *bidi, *variant, &payload.0).await,
        Command::Attach { local, nonce } => cmd_attach(modem, *local, nonce.as_ref()).await,
        Command::Detach { local, data } => cmd_detach(modem, *local, data.as_ref()).await,
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let modem = create_modem(&cli).await?;
    let result = run(&modem, &cli.command).await;

    if let Err(e) = modem.close().await {
        tracing::warn!(error = %e, "Failed to close transport");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_accepts_prefix_and_case() {
        assert_eq!(parse_hex_bytes("0x70b3").unwrap(), HexBytes(vec![0x70, 0xB3]));
        assert_eq!(parse_hex_bytes("AABB").unwrap(), HexBytes(vec![0xAA, 0xBB]));
        assert_eq!(parse_hex_bytes("").unwrap(), HexBytes(vec![]));
    }

    #[test]
    fn parse_hex_rejects_bad_input() {
        assert!(parse_hex_bytes("ABC").is_err());
        assert!(parse_hex_bytes("GG").is_err());
    }

    #[test]
    fn fixed_checks_length() {
        let bytes = HexBytes(vec![1, 2]);
        assert_eq!(fixed::<2>(&bytes, "short address").unwrap(), [1, 2]);
        assert!(fixed::<8>(&bytes, "EUI64").is_err());
    }

    #[test]
    fn hex_rendering_is_uppercase() {
        assert_eq!(to_hex(&[0xDE, 0xAD, 0x01]), "DEAD01");
    }

    #[test]
    fn cli_parses_send() {
        let cli = Cli::try_parse_from([
            "mioty-test-app",
            "--port",
            "/dev/ttyACM0",
            "send",
            "--bidi",
            "--variant",
            "mpf",
            "0102",
        ])
        .unwrap();
        match cli.command {
            Command::Send {
                bidi,
                variant,
                payload,
            } => {
                assert!(bidi);
                assert_eq!(variant, SendVariant::Mpf);
                assert_eq!(payload, HexBytes(vec![1, 2]));
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn cli_serial_framing() {
        let cli = Cli::try_parse_from([
            "mioty-test-app",
            "--port",
            "/dev/ttyACM0",
            "--baud",
            "9600",
            "--rtscts",
            "info",
        ])
        .unwrap();
        let config = serial_config(&cli);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.flow_control, FlowControl::Hardware);
    }

    #[test]
    fn cli_parses_int_setting() {
        let cli = Cli::try_parse_from(["mioty-test-app", "--mock", "power", "set", "14"]).unwrap();
        assert!(cli.mock);
        assert_eq!(cli.baud, DEFAULT_BAUD_RATE);
        assert_eq!(serial_config(&cli).flow_control, FlowControl::None);
        assert!(matches!(
            cli.command,
            Command::Power {
                action: IntAction::Set { value: 14 }
            }
        ));
    }

    #[tokio::test]
    async fn info_runs_against_mock() {
        let modem = MiotyModemBuilder::new()
            .build_with_transport(Box::new(info_mock()))
            .await
            .unwrap();
        run(&modem, &Command::Info).await.unwrap();
    }

    #[tokio::test]
    async fn mock_rejects_other_commands() {
        let cli = Cli::try_parse_from(["mioty-test-app", "--mock", "reset"]).unwrap();
        assert!(create_modem(&cli).await.is_err());
    }
}
