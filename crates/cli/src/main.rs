use clap::{Parser, Subcommand};

mod commands;
use commands::{
    handle_beacon_command, handle_config_command, handle_gas_command, BeaconCommands,
    ConfigCommands, GasCommands,
};

#[derive(Parser)]
#[command(name = "oracle-cli")]
#[command(about = "Oracle CLI - Operator tool for the oracle node")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration Management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Gas price resolution
    #[command(subcommand)]
    Gas(GasCommands),

    /// Signed beacon consensus
    #[command(subcommand)]
    Beacons(BeaconCommands),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config(config_command) => handle_config_command(config_command)?,
        Commands::Gas(gas_command) => handle_gas_command(gas_command).await?,
        Commands::Beacons(beacon_command) => handle_beacon_command(beacon_command)?,
    }

    Ok(())
}
