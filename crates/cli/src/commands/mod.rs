pub mod beacons;
pub mod config;
pub mod gas;
pub mod utils;

pub use beacons::{handle_beacon_command, BeaconCommands};
pub use config::{handle_config_command, ConfigCommands};
pub use gas::{handle_gas_command, GasCommands};
