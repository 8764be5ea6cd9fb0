use anyhow::Result;
use clap::Parser;
use pinwire_cli::{describe_profiles, driver_config, execute, load_profiles, Cli, Command};
use pinwire_driver::sim::SimulatedBoard;
use pinwire_driver::telemetry::describe_metrics;
use pinwire_driver::Driver;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    describe_metrics();

    let profiles = load_profiles(cli.connection.profiles.as_deref())?;
    if let Command::Models = cli.command {
        println!("{}", describe_profiles(&profiles));
        return Ok(());
    }

    let config = driver_config(&cli.connection, &profiles)?;
    let output = if cli.connection.simulate {
        let port = config.port.clone();
        let mut driver = Driver::open_with(config, |_, _, _| Ok(SimulatedBoard::new(&port).0))?;
        let output = execute(&mut driver, &cli.command);
        driver.close();
        output?
    } else {
        let mut driver = Driver::open(config)?;
        let output = execute(&mut driver, &cli.command);
        driver.close();
        output?
    };

    println!("{output}");
    Ok(())
}
