use block_relay_rs::types::BlockVersion;
use ethereum_consensus::primitives::U256;
use serde::{Deserialize, Serialize};
use std::{net::Ipv4Addr, time::Duration};

/// How validator registrations reach the relays.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationMode {
    /// Decode registrations and forward them to every relay.
    #[default]
    Structured,
    /// Forward the submitted body to every relay as is.
    Passthrough,
    /// Reject registrations.
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: Ipv4Addr,
    pub port: u16,
    pub relays: Vec<String>,
    /// Upper bound on each relay's answer to a bid request
    pub bid_timeout_ms: u64,
    /// Upper bound on each relay's answer to an unblinding request
    pub unblind_timeout_ms: u64,
    /// Bids below this value (in wei) are excluded from auctions
    #[serde(with = "ethereum_consensus::serde::as_str")]
    pub min_bid: U256,
    pub registration: RegistrationMode,
    /// Forks whose blinded blocks are accepted for unblinding
    pub versions: Vec<BlockVersion>,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::UNSPECIFIED,
            port: 18550,
            relays: vec![],
            bid_timeout_ms: 950,
            unblind_timeout_ms: 4000,
            min_bid: U256::default(),
            registration: RegistrationMode::default(),
            versions: BlockVersion::ALL.to_vec(),
            metrics_port: None,
        }
    }
}

impl Config {
    pub fn bid_timeout(&self) -> Duration {
        Duration::from_millis(self.bid_timeout_ms)
    }

    pub fn unblind_timeout(&self) -> Duration {
        Duration::from_millis(self.unblind_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_relays_are_required() {
        let config: Config = toml::from_str(r#"relays = ["https://relay.example"]"#).unwrap();
        assert_eq!(config.port, 18550);
        assert_eq!(config.bid_timeout(), Duration::from_millis(950));
        assert_eq!(config.registration, RegistrationMode::Structured);
        assert_eq!(config.versions, BlockVersion::ALL.to_vec());
        assert_eq!(config.relays.len(), 1);
    }

    #[test]
    fn parses_every_key() {
        let config: Config = toml::from_str(
            r#"
            host = "127.0.0.1"
            port = 28550
            relays = []
            bid_timeout_ms = 500
            unblind_timeout_ms = 2000
            min_bid = "1000000000"
            registration = "passthrough"
            versions = ["deneb", "electra"]
            metrics_port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.host, Ipv4Addr::LOCALHOST);
        assert_eq!(config.min_bid, U256::from(1_000_000_000u64));
        assert_eq!(config.registration, RegistrationMode::Passthrough);
        assert_eq!(config.versions, vec![BlockVersion::Deneb, BlockVersion::Electra]);
        assert_eq!(config.metrics_port, Some(9000));
    }
}
