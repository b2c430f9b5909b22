use crate::{
    auctioneer::{AuctionResult, Auctioneer},
    unblinder::Unblinder,
};
use async_trait::async_trait;
use block_relay_rs::{
    types::{
        AuctionContents, AuctionRequest, SignedBuilderBid, VersionedSignedBlindedBeaconBlock,
        VersionedSignedProposal,
    },
    BlindedBlockProvider, Error,
};
use parking_lot::Mutex;
use std::{collections::BTreeMap, ops::Deref, sync::Arc};
use tokio_util::sync::CancellationToken;

// Upper bound on remembered auctions; the lowest slots are evicted first.
const MAX_RECORDED_AUCTIONS: usize = 64;

/// Serves the builder API by auctioning each proposal across every relay.
#[derive(Clone)]
pub struct RelayMux(Arc<RelayMuxInner>);

impl Deref for RelayMux {
    type Target = RelayMuxInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub struct RelayMuxInner {
    auctioneer: Auctioneer,
    unblinder: Unblinder,
    shutdown: CancellationToken,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    // ordered by slot first
    auctions: BTreeMap<AuctionRequest, Arc<AuctionResult>>,
}

impl RelayMux {
    pub fn new(auctioneer: Auctioneer, unblinder: Unblinder, shutdown: CancellationToken) -> Self {
        let inner = RelayMuxInner { auctioneer, unblinder, shutdown, state: Default::default() };
        Self(Arc::new(inner))
    }

    /// Remembers `result` for unblinding. Auctions nobody bid in have no winners to ask and
    /// are not kept.
    fn record_auction(&self, auction_request: AuctionRequest, result: Arc<AuctionResult>) {
        if result.participation.is_empty() {
            return
        }

        let mut state = self.state.lock();
        state.auctions.insert(auction_request, result);
        while state.auctions.len() > MAX_RECORDED_AUCTIONS {
            state.auctions.pop_first();
        }
    }

    /// Finds the auction whose winners offered the block committed to in `signed_block`.
    fn auction_for(
        &self,
        signed_block: &VersionedSignedBlindedBeaconBlock,
    ) -> Option<Arc<AuctionResult>> {
        let slot = signed_block.slot();
        let parent_hash = signed_block.parent_hash();
        let block_hash = signed_block.block_hash();

        let state = self.state.lock();
        state
            .auctions
            .iter()
            .filter(|(request, _)| request.slot == slot && &request.parent_hash == parent_hash)
            .map(|(_, result)| result)
            .find(|result| {
                result.winning_providers.iter().any(|id| {
                    result
                        .participation
                        .get(id)
                        .map_or(false, |entry| entry.bid.block_hash() == block_hash)
                })
            })
            .cloned()
    }
}

#[async_trait]
impl BlindedBlockProvider for RelayMux {
    async fn fetch_best_bid(
        &self,
        auction_request: &AuctionRequest,
    ) -> Result<Option<SignedBuilderBid>, Error> {
        let result = self.auctioneer.auction_block(auction_request, &self.shutdown).await?;
        let result = Arc::new(result);
        self.record_auction(auction_request.clone(), result.clone());

        if result.is_excluded() {
            tracing::warn!(%auction_request, "winning bid is excluded, not offering it");
            return Ok(None)
        }

        match result.winning_bid() {
            Some(signed_bid) => {
                tracing::info!(
                    %auction_request,
                    %signed_bid,
                    winners = ?result.winning_providers,
                    "auction won"
                );
                Ok(Some(signed_bid.clone()))
            }
            None => {
                tracing::info!(%auction_request, "no bids received");
                Ok(None)
            }
        }
    }

    async fn unblind_block(
        &self,
        signed_block: &VersionedSignedBlindedBeaconBlock,
    ) -> Result<Option<AuctionContents>, Error> {
        let auction = self.auction_for(signed_block);
        if auction.is_none() {
            tracing::warn!(
                slot = signed_block.slot(),
                block_hash = ?signed_block.block_hash(),
                "no matching auction found, asking every provider"
            );
        }

        let proposal = self.unblinder.unblind_block(signed_block, auction.as_deref()).await?;
        Ok(proposal.map(VersionedSignedProposal::into_auction_contents))
    }
}
