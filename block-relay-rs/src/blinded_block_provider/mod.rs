mod api;

use crate::{
    error::Error,
    types::{AuctionContents, AuctionRequest, SignedBuilderBid, VersionedSignedBlindedBeaconBlock},
};
use async_trait::async_trait;

pub use api::{
    client::Client,
    server::{BlockProviderServer, Server},
};

/// The operations behind the proposer-facing builder API.
#[async_trait]
pub trait BlindedBlockProvider {
    /// Returns the best bid for the auction, or `None` if there is nothing to offer.
    async fn fetch_best_bid(
        &self,
        auction_request: &AuctionRequest,
    ) -> Result<Option<SignedBuilderBid>, Error>;

    /// Reveals the contents of a previously offered bid, or `None` if nobody can.
    async fn unblind_block(
        &self,
        signed_block: &VersionedSignedBlindedBeaconBlock,
    ) -> Result<Option<AuctionContents>, Error>;
}
