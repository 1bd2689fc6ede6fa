use clap::Subcommand;
use oracle_core::{
    gas::GasPriceOracle,
    logging::CycleLog,
    rpc::{HttpClient, JsonRpcClient},
};
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;

use super::{
    config::load_config,
    utils::{print_info, print_success, CliError, CliResult},
};

#[derive(Subcommand)]
pub enum GasCommands {
    /// Resolve the gas target a chain's providers would use right now
    Resolve {
        /// Chain id from the configuration
        #[arg(short, long)]
        chain: u64,

        /// Only query this provider
        #[arg(short, long)]
        provider: Option<String>,

        /// Path to config file (defaults to config/config.toml)
        #[arg(short, long, default_value = "config/config.toml")]
        file: String,
    },
}

pub async fn handle_gas_command(command: GasCommands) -> CliResult<()> {
    match command {
        GasCommands::Resolve { chain, provider, file } => {
            resolve_gas(chain, provider.as_deref(), &file).await
        }
    }
}

async fn resolve_gas(chain_id: u64, only: Option<&str>, file: &str) -> CliResult<()> {
    let config = load_config(file)?;
    config.validate()?;

    let chain = config
        .chain(chain_id)
        .ok_or_else(|| CliError::Config(format!("Chain {chain_id} is not configured")))?;
    let oracle = GasPriceOracle::new(
        chain.id,
        chain.gas_price_oracle.clone(),
        chain.fulfillment_gas_limit,
        chain.retry.clone(),
    )
    .map_err(|e| CliError::Config(e.to_string()))?;

    let http = Arc::new(HttpClient::new()?);
    let budget = Duration::from_secs(config.node.gas_oracle_timeout_seconds);

    let providers: Vec<_> =
        chain.providers.iter().filter(|p| only.map_or(true, |name| p.name == name)).collect();
    if providers.is_empty() {
        return Err(CliError::Config(format!("No matching provider on chain {chain_id}")));
    }

    for provider in providers {
        print_info(&format!("Resolving gas price via {}...", provider.name));
        let client = JsonRpcClient::new(
            provider.name.as_str(),
            provider.url.clone(),
            Arc::clone(&http),
            provider.timeout(),
        );

        let mut log = CycleLog::new();
        let target = oracle.resolve(&client, Instant::now() + budget, &mut log).await;

        for entry in log.entries() {
            println!("  {} {}", entry.level, entry.message);
        }
        print_success(&format!("{}: {target}", provider.name));
    }

    Ok(())
}
