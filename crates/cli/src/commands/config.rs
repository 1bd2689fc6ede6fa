use clap::Subcommand;
use oracle_core::{config::AppConfig, gas::GasStrategy};
use std::path::Path;

use super::utils::{print_error, print_info, print_success, CliError, CliResult};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to config file (defaults to config/config.toml)
        #[arg(short, long, default_value = "config/config.toml")]
        file: String,
    },
}

pub fn handle_config_command(command: ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Validate { file } => validate_config(&file),
    }
}

/// Loads a configuration file the way the node does, failing if it does not exist.
pub fn load_config(file: &str) -> CliResult<AppConfig> {
    if !Path::new(file).exists() {
        print_error(&format!("Configuration file not found: {file}"));
        return Err(CliError::Config(format!("File not found: {file}")));
    }

    print_info(&format!("Loading configuration from {file}..."));
    Ok(AppConfig::from_file(file)?)
}

fn validate_config(file: &str) -> CliResult<()> {
    let config = load_config(file)?;

    print_info("Validating configuration...");
    config.validate()?;

    print_success("Configuration is valid!");

    println!("Configuration Summary:");
    for chain in &config.chains {
        let strategies: Vec<&str> = chain.gas_price_oracle.iter().map(GasStrategy::name).collect();
        println!(
            "  Chain {}: {} providers, max concurrency {}, gas oracle [{}]",
            chain.id,
            chain.providers.len(),
            chain.max_concurrency,
            strategies.join(", ")
        );
    }
    println!(
        "  Signing: {}",
        if config.signing.enabled {
            format!(
                "{}:{} (staleness {}s, deviation {}%)",
                config.signing.bind_address,
                config.signing.bind_port,
                config.signing.staleness_seconds,
                config.signing.deviation_threshold_percent
            )
        } else {
            "disabled".to_string()
        }
    );
    println!("  Cycle interval: {}s", config.node.cycle_interval_seconds);
    println!(
        "  Private key: {}",
        if config.node.private_key.is_some() { "set" } else { "not set" }
    );

    Ok(())
}
