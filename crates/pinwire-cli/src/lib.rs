//! Command-line front end for the pinwire driver.
//!
//! Argument parsing, configuration loading and command execution live here so
//! the binary in `main.rs` stays a thin wrapper and the command paths can be
//! driven against a simulated board in tests.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pinwire_driver::{
    DeviceProfile, Driver, DriverConfig, ProfileTable, Transport, DEFAULT_HANDSHAKE_ATTEMPTS,
};
use pinwire_protocol::*;

/// Drive a microcontroller's pins over a serial link.
#[derive(Debug, Parser)]
#[command(name = "pinwire", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// How to reach the board.
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// Serial port, e.g. /dev/ttyACM0 or COM3.
    #[arg(short, long, global = true, default_value = "/dev/ttyACM0")]
    pub port: String,

    /// Board model: a builtin name or one added by --profiles.
    #[arg(short, long, global = true, default_value = "uno")]
    pub model: String,

    /// YAML file of profile overrides, keyed by model name.
    #[arg(long, global = true)]
    pub profiles: Option<std::path::PathBuf>,

    /// Per-attempt read timeout in milliseconds.
    #[arg(long, global = true, default_value_t = 100)]
    pub read_timeout_ms: u64,

    /// Per-attempt write timeout in milliseconds.
    #[arg(long, global = true, default_value_t = 100)]
    pub write_timeout_ms: u64,

    /// Attempts per request.
    #[arg(long, global = true, default_value_t = 1)]
    pub attempts: u32,

    /// Attempts for the initial handshake.
    #[arg(long, global = true, default_value_t = DEFAULT_HANDSHAKE_ATTEMPTS)]
    pub handshake_attempts: u32,

    /// Talk to an in-memory simulated board instead of a serial port.
    #[arg(long, global = true)]
    pub simulate: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List known board models and their profiles.
    Models,
    /// Connect, report the peer's protocol version and disconnect.
    Handshake,
    /// Read a digital pin.
    DigitalRead { pin: u8 },
    /// Drive a digital pin.
    DigitalWrite { pin: u8, level: LevelArg },
    /// Sample an analog input.
    AnalogRead { pin: u8 },
    /// Set a PWM duty cycle (0-255).
    AnalogWrite { pin: u8, duty: u8 },
    /// Configure a pin.
    PinMode { pin: u8, mode: ModeArg },
    /// Start a square wave on a pin.
    Tone {
        pin: u8,
        frequency_hz: u16,
        /// Zero plays until `no-tone`.
        #[arg(default_value_t = 0)]
        duration_ms: u32,
    },
    /// Stop a tone.
    NoTone { pin: u8 },
    /// Clock a byte out.
    ShiftOut {
        data_pin: u8,
        clock_pin: u8,
        order: OrderArg,
        value: u8,
    },
    /// Clock a byte in.
    ShiftIn {
        data_pin: u8,
        clock_pin: u8,
        order: OrderArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LevelArg {
    Low,
    High,
}

impl From<LevelArg> for PinLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Low => PinLevel::Low,
            LevelArg::High => PinLevel::High,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Input,
    Output,
    InputPullup,
}

impl From<ModeArg> for PinMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Input => PinMode::Input,
            ModeArg::Output => PinMode::Output,
            ModeArg::InputPullup => PinMode::InputPullup,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OrderArg {
    Lsb,
    Msb,
}

impl From<OrderArg> for BitOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Lsb => BitOrder::LsbFirst,
            OrderArg::Msb => BitOrder::MsbFirst,
        }
    }
}

/// Builtin profiles, merged with the overrides in `path` when given.
pub fn load_profiles(path: Option<&Path>) -> Result<ProfileTable> {
    let mut table = ProfileTable::builtin();
    if let Some(path) = path {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading profiles from {}", path.display()))?;
        let overrides: ProfileTable = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing profiles in {}", path.display()))?;
        table.merge(overrides);
    }
    Ok(table)
}

/// Build the driver configuration for these arguments.
pub fn driver_config(args: &ConnectionArgs, profiles: &ProfileTable) -> Result<DriverConfig> {
    let mut config = DriverConfig::from_table(args.port.clone(), &args.model, profiles)?;
    if args.simulate {
        // The simulated board is ready as soon as it exists.
        config.profile.startup_grace_ms = 0;
    }
    Ok(config
        .with_timeouts(
            Duration::from_millis(args.read_timeout_ms),
            Duration::from_millis(args.write_timeout_ms),
        )
        .with_request_attempts(args.attempts)
        .with_handshake_attempts(args.handshake_attempts))
}

/// One line per profile, in name order.
pub fn describe_profiles(profiles: &ProfileTable) -> String {
    profiles
        .iter()
        .map(|(name, profile)| describe_profile(name, profile))
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_profile(name: &str, profile: &DeviceProfile) -> String {
    format!(
        "{name:<10} baud={} grace={}ms redeploy={}",
        profile.baud_rate, profile.startup_grace_ms, profile.requires_redeploy
    )
}

/// Run one pin command on an open driver and render the peer's answer.
///
/// `Models` never reaches a driver; it is handled before connecting.
pub fn execute<T: Transport>(driver: &mut Driver<T>, command: &Command) -> Result<String> {
    let line = match *command {
        Command::Models => anyhow::bail!("`models` does not talk to a board"),
        Command::Handshake => format!(
            "{} speaks protocol {}",
            driver.port(),
            driver.peer().version
        ),
        Command::DigitalRead { pin } => {
            let resp = driver.digital_read(DigitalReadRequest { pin })?;
            format!("pin {} is {}", resp.pin, resp.level)
        }
        Command::DigitalWrite { pin, level } => {
            let resp = driver.digital_write(DigitalWriteRequest {
                pin,
                level: level.into(),
            })?;
            format!("pin {} set {}", resp.pin, resp.level)
        }
        Command::AnalogRead { pin } => {
            let resp = driver.analog_read(AnalogReadRequest { pin })?;
            format!("pin {} reads {}", resp.pin, resp.value)
        }
        Command::AnalogWrite { pin, duty } => {
            let resp = driver.analog_write(AnalogWriteRequest { pin, duty })?;
            format!("pin {} duty {}", resp.pin, resp.duty)
        }
        Command::PinMode { pin, mode } => {
            let resp = driver.pin_mode(PinModeRequest {
                pin,
                mode: mode.into(),
            })?;
            format!("pin {} mode {}", resp.pin, resp.mode)
        }
        Command::Tone {
            pin,
            frequency_hz,
            duration_ms,
        } => {
            let resp = driver.tone(ToneRequest {
                pin,
                frequency_hz,
                duration_ms,
            })?;
            format!(
                "pin {} tone {} Hz for {} ms",
                resp.pin, resp.frequency_hz, resp.duration_ms
            )
        }
        Command::NoTone { pin } => {
            let resp = driver.no_tone(NoToneRequest { pin })?;
            format!("pin {} silent", resp.pin)
        }
        Command::ShiftOut {
            data_pin,
            clock_pin,
            order,
            value,
        } => {
            let resp = driver.shift_out(ShiftOutRequest {
                data_pin,
                clock_pin,
                bit_order: order.into(),
                value,
            })?;
            format!("shifted out 0x{:02X}", resp.value)
        }
        Command::ShiftIn {
            data_pin,
            clock_pin,
            order,
        } => {
            let resp = driver.shift_in(ShiftInRequest {
                data_pin,
                clock_pin,
                bit_order: order.into(),
            })?;
            format!("shifted in 0x{:02X}", resp.value)
        }
    };
    Ok(line)
}
