//! Command handlers, one module per subcommand.

pub mod config_cmd;
pub mod devices;
pub mod run;
pub mod sites;

use std::path::PathBuf;

use solarflow_config::Config;
use solarflow_core::BridgeConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file path in effect: `--config`, else the platform default.
pub fn effective_config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(solarflow_config::config_path)
}

pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = effective_config_path(global);
    Ok(solarflow_config::load_config(Some(&path))?)
}

/// Load the config file and resolve it into a runnable `BridgeConfig`.
pub fn bridge_config(global: &GlobalOpts) -> Result<BridgeConfig, CliError> {
    let cfg = load_config(global)?;
    if cfg.accounts.is_empty() {
        return Err(CliError::NoConfig {
            path: effective_config_path(global).display().to_string(),
        });
    }
    Ok(solarflow_config::to_bridge_config(&cfg)?)
}
