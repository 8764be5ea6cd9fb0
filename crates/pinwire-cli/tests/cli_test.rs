//! Argument parsing and command execution against a simulated board.

use std::io::Write;

use clap::Parser;
use pinwire_cli::{describe_profiles, driver_config, execute, load_profiles, Cli, Command};
use pinwire_driver::sim::SimulatedBoard;
use pinwire_driver::{DeviceModel, Driver, DriverConfig};
use tempfile::NamedTempFile;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("pinwire").chain(args.iter().copied()))
        .expect("arguments should parse")
}

fn config_for(cli: &Cli) -> anyhow::Result<DriverConfig> {
    let profiles = load_profiles(cli.connection.profiles.as_deref())?;
    driver_config(&cli.connection, &profiles)
}

fn run(args: &[&str]) -> anyhow::Result<String> {
    let cli = parse(args);
    let config = config_for(&cli)?;
    let mut driver = Driver::open_with(config, |port, _, _| Ok(SimulatedBoard::new(port).0))?;
    execute(&mut driver, &cli.command)
}

fn profile_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = parse(&["digital-write", "13", "high", "--port", "COM3", "-m", "leonardo", "-vv"]);

    assert_eq!(cli.connection.port, "COM3");
    assert_eq!(cli.connection.model, "leonardo");
    assert_eq!(cli.verbose, 2);
    assert!(matches!(cli.command, Command::DigitalWrite { pin: 13, .. }));
}

#[test]
fn test_unknown_model_is_rejected() {
    let cli = parse(&["--model", "esp32", "handshake"]);
    let err = config_for(&cli).unwrap_err();
    assert!(err.to_string().contains("unknown device model: esp32"), "{err}");
}

#[test]
fn test_config_from_flags() {
    let cli = parse(&[
        "--model",
        "nano",
        "--read-timeout-ms",
        "250",
        "--attempts",
        "4",
        "handshake",
    ]);
    let config = config_for(&cli).unwrap();

    assert_eq!(config.model, DeviceModel::Nano.name());
    assert_eq!(config.read_timeout.as_millis(), 250);
    assert_eq!(config.request_attempts, 4);
    assert_eq!(config.resolved_profile().startup_grace_ms, 4000);
}

#[test]
fn test_simulate_skips_grace() {
    let cli = parse(&["--simulate", "handshake"]);
    let config = config_for(&cli).unwrap();
    assert!(config.resolved_profile().startup_grace().is_zero());
}

#[test]
fn test_profile_file_overrides_builtin() {
    let file = profile_file("uno:\n  startup_grace_ms: 1500\n");

    let table = load_profiles(Some(file.path())).unwrap();
    assert_eq!(table.resolve("uno").unwrap().startup_grace_ms, 1500);
    assert_eq!(table.resolve("uno").unwrap().baud_rate, 115_200);
    assert!(describe_profiles(&table).contains("grace=1500ms"));
}

#[test]
fn test_board_added_by_profile_file_is_selectable() {
    let file = profile_file("my-custom-board:\n  baud_rate: 57600\n  startup_grace_ms: 1000\n");
    let path = file.path().to_str().unwrap();

    let cli = parse(&["--profiles", path, "--model", "my-custom-board", "handshake"]);
    let config = config_for(&cli).unwrap();
    assert_eq!(config.model, "my-custom-board");
    assert_eq!(config.resolved_profile().baud_rate, 57_600);
    assert_eq!(config.resolved_profile().startup_grace_ms, 1000);

    let output = run(&[
        "--simulate",
        "--profiles",
        path,
        "--model",
        "my-custom-board",
        "digital-write",
        "7",
        "low",
    ])
    .unwrap();
    assert_eq!(output, "pin 7 set low");
}

#[test]
fn test_malformed_profile_file_is_reported() {
    let file = profile_file("uno: [not, a, profile]");

    let err = load_profiles(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("parsing profiles"));
}

#[test]
fn test_commands_against_simulated_board() {
    assert_eq!(run(&["--simulate", "digital-write", "13", "high"]).unwrap(), "pin 13 set high");
    assert_eq!(run(&["--simulate", "analog-read", "0"]).unwrap(), "pin 0 reads 0");
    assert_eq!(
        run(&["--simulate", "pin-mode", "4", "input-pullup"]).unwrap(),
        "pin 4 mode input-pullup"
    );
    assert_eq!(
        run(&["--simulate", "tone", "8", "440"]).unwrap(),
        "pin 8 tone 440 Hz for 0 ms"
    );
    assert_eq!(
        run(&["--simulate", "shift-out", "11", "12", "msb", "165"]).unwrap(),
        "shifted out 0xA5"
    );
    assert!(run(&["--simulate", "handshake"]).unwrap().contains("protocol 1.2"));
}

#[test]
fn test_peer_rejection_is_an_error() {
    let err = run(&["--simulate", "digital-read", "99"]).unwrap_err();
    assert!(err.to_string().contains("invalid pin"), "{err}");
}
