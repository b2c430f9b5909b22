use crate::{
    error::Error,
    types::{AuctionContents, AuctionRequest, SignedBuilderBid, VersionedSignedBlindedBeaconBlock},
};
use async_trait::async_trait;
use std::{fmt, sync::Arc};

/// Stable identifier of a bid provider.
pub type ProviderId = String;

/// A single source of bids, typically a remote relay.
///
/// `Ok(None)` is an explicit "no bid" and is distinct from a failure.
#[async_trait]
pub trait BidProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn fetch_bid(
        &self,
        auction_request: &AuctionRequest,
    ) -> Result<Option<SignedBuilderBid>, Error>;

    async fn unblind_block(
        &self,
        signed_block: &VersionedSignedBlindedBeaconBlock,
    ) -> Result<Option<AuctionContents>, Error>;
}

/// The configured set of providers, in a fixed order.
#[derive(Clone, Default)]
pub struct BidProviders(Vec<Arc<dyn BidProvider>>);

impl BidProviders {
    pub fn new(providers: Vec<Arc<dyn BidProvider>>) -> Self {
        Self(providers)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn BidProvider>> {
        self.0.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn BidProvider>> {
        self.0.iter().find(|provider| provider.id() == id)
    }

    pub fn ids(&self) -> Vec<ProviderId> {
        self.0.iter().map(|provider| provider.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Arc<dyn BidProvider>> for BidProviders {
    fn from_iter<I: IntoIterator<Item = Arc<dyn BidProvider>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Debug for BidProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter().map(|provider| provider.id())).finish()
    }
}
