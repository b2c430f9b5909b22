use crate::cmd::config::Config;
use block_auctioneer_rs::Service;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Args)]
#[clap(about = "🚀 auction block space across relays for proposers")]
pub struct Command {
    #[clap(env, default_value = "config.toml")]
    config_file: String,
}

impl Command {
    pub async fn execute(self, shutdown: CancellationToken) -> eyre::Result<()> {
        let config = Config::from_toml_file(&self.config_file)?;

        if let Some(config) = config.relay {
            info!(relays = config.relays.len(), port = config.port, "starting block relay");
            Ok(Service::from(config).spawn(shutdown)?.await?)
        } else {
            Err(eyre::eyre!("missing relay config from file provided"))
        }
    }
}
