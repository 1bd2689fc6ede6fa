use clap::Subcommand;
use oracle_core::beacon::{
    select_update_values, ConsensusSettings, SignBeaconUpdateRequest, SignBeaconUpdateResponse,
};
use std::path::Path;

use super::{
    config::load_config,
    utils::{print_info, CliError, CliResult},
};

#[derive(Subcommand)]
pub enum BeaconCommands {
    /// Run the consensus selector over a saved sign-beacon-update request body
    Select {
        /// JSON file holding `{ "airnode": ..., "beacons": [...] }`
        #[arg(short, long)]
        file: String,

        /// Unix time to validate timestamps against (defaults to now)
        #[arg(long)]
        now: Option<u64>,

        /// Config file supplying staleness and deviation settings
        #[arg(short, long, default_value = "config/config.toml")]
        config: String,
    },
}

pub fn handle_beacon_command(command: BeaconCommands) -> CliResult<()> {
    match command {
        BeaconCommands::Select { file, now, config } => select_beacons(&file, now, &config),
    }
}

fn select_beacons(file: &str, now: Option<u64>, config_file: &str) -> CliResult<()> {
    let settings = if Path::new(config_file).exists() {
        load_config(config_file)?.signing.consensus_settings()
    } else {
        print_info("No configuration found, using default consensus settings");
        ConsensusSettings::default()
    };

    let raw = std::fs::read(file)?;
    let request: SignBeaconUpdateRequest = serde_json::from_slice(&raw)?;
    let now = now.unwrap_or_else(unix_now);

    print_info(&format!(
        "Selecting from {} beacons for airnode {} at {now}...",
        request.beacons.len(),
        request.airnode
    ));

    match select_update_values(&request, now, &settings) {
        Ok(values) => {
            let response = SignBeaconUpdateResponse::new(&values);
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&e.to_response())?);
            Err(CliError::Rejected(e.to_string()))
        }
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}
