use block_auctioneer_rs::Config as RelayConfig;
use block_relay_rs::config::from_toml_file;
use clap::Args;
use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub relay: Option<RelayConfig>,
}

impl Config {
    pub fn from_toml_file<P: AsRef<Path> + fmt::Display>(path: P) -> eyre::Result<Config> {
        from_toml_file::<_, Self>(path).wrap_err("could not load config")
    }
}

#[derive(Debug, Args)]
#[clap(about = "🔬 (debug) utility to verify configuration")]
pub struct Command {
    #[clap(env, default_value = "config.toml")]
    config_file: String,
}

impl Command {
    pub async fn execute(self) -> eyre::Result<()> {
        let config = Config::from_toml_file(&self.config_file)?;
        info!("{config:#?}");

        Ok(())
    }
}
