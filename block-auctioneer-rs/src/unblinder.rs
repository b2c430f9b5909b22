use crate::auctioneer::AuctionResult;
use block_relay_rs::{
    metrics::{ApiMethod, Metrics},
    types::{
        AuctionContents, BlockVersion, VersionedSignedBlindedBeaconBlock, VersionedSignedProposal,
    },
    BidProvider, BidProviders, Error,
};
use futures::future::join_all;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// Recovers full blocks from the providers that bid for them.
pub struct Unblinder {
    providers: BidProviders,
    versions: Vec<BlockVersion>,
    timeout: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl Unblinder {
    pub fn new(providers: BidProviders, versions: Vec<BlockVersion>, timeout: Duration) -> Self {
        Self { providers, versions, timeout, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Asks the winners of `auction` (or every provider, without a matching auction) to reveal
    /// the contents of `signed_block` and rebuilds the full proposal from the first valid answer.
    ///
    /// Providers are consulted in configuration order, so repeated calls with the same answers
    /// give the same proposal. Returns `None` if some provider declined and none succeeded, and
    /// [`Error::UnblindFailed`] if every provider failed or returned invalid contents.
    pub async fn unblind_block(
        &self,
        signed_block: &VersionedSignedBlindedBeaconBlock,
        auction: Option<&AuctionResult>,
    ) -> Result<Option<VersionedSignedProposal>, Error> {
        let version = signed_block.version();
        if !self.versions.contains(&version) {
            return Err(Error::InvalidOptions(format!("{version} blocks are not accepted")))
        }

        let targets = self.targets(signed_block, auction);
        if targets.is_empty() {
            tracing::warn!(slot = signed_block.slot(), "no providers to unblind block");
            return Ok(None)
        }

        let responses = join_all(targets.iter().map(|provider| async move {
            (provider.id(), self.request_contents(provider.as_ref(), signed_block).await)
        }))
        .await;

        let mut declined = false;
        let mut failures = vec![];
        for (provider, response) in responses {
            match response {
                Ok(Some(contents)) => match signed_block.unblind(&contents) {
                    Ok(proposal) => {
                        tracing::info!(
                            provider,
                            slot = signed_block.slot(),
                            block_hash = ?proposal.block_hash(),
                            "unblinded block"
                        );
                        return Ok(Some(proposal))
                    }
                    Err(err) => {
                        tracing::warn!(provider, %err, "provider returned invalid contents");
                        failures.push(format!("{provider}: {err}"));
                    }
                },
                Ok(None) => {
                    tracing::debug!(provider, "provider could not unblind block");
                    declined = true;
                }
                Err(err) => {
                    tracing::warn!(provider, %err, "failed to unblind block");
                    failures.push(format!("{provider}: {err}"));
                }
            }
        }

        if declined {
            Ok(None)
        } else {
            Err(Error::UnblindFailed(failures))
        }
    }

    fn targets(
        &self,
        signed_block: &VersionedSignedBlindedBeaconBlock,
        auction: Option<&AuctionResult>,
    ) -> Vec<&Arc<dyn BidProvider>> {
        let block_hash = signed_block.block_hash();
        let winners = auction
            .map(|auction| {
                auction
                    .winning_providers
                    .iter()
                    .filter(|id| {
                        auction
                            .participation
                            .get(*id)
                            .map_or(false, |entry| entry.bid.block_hash() == block_hash)
                    })
                    .filter_map(|id| self.providers.get(id))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        if winners.is_empty() {
            self.providers.iter().collect()
        } else {
            winners
        }
    }

    async fn request_contents(
        &self,
        provider: &dyn BidProvider,
        signed_block: &VersionedSignedBlindedBeaconBlock,
    ) -> Result<Option<AuctionContents>, Error> {
        let id = provider.id();
        if let Some(metrics) = &self.metrics {
            metrics.inc_provider_request(ApiMethod::UnblindBlock, id);
        }

        let start = Instant::now();
        let outcome =
            tokio::time::timeout(self.timeout, provider.unblind_block(signed_block)).await;
        if let Some(metrics) = &self.metrics {
            metrics.observe_provider_duration(ApiMethod::UnblindBlock, id, start.elapsed());
        }

        outcome.unwrap_or_else(|_| {
            if let Some(metrics) = &self.metrics {
                metrics.inc_provider_timeout(ApiMethod::UnblindBlock, id);
            }
            Err(Error::Timeout(id.to_string()))
        })
    }
}
