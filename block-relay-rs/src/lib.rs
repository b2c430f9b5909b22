mod bid_provider;
pub mod blinded_block_provider;
pub mod codec;
pub mod config;
mod error;
pub mod metrics;
pub mod registrar;
pub mod relay;
mod serde;
pub mod types;

pub use bid_provider::{BidProvider, BidProviders, ProviderId};
pub use blinded_block_provider::BlindedBlockProvider;
pub use error::{ApiError, Error};
pub use relay::{Relay, RelayEndpoint, RelayEndpoints};
