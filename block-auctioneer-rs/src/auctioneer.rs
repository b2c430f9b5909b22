use crate::scoring::{BidScorer, EXCLUDED};
use block_relay_rs::{
    metrics::{ApiMethod, Metrics},
    types::{AuctionRequest, SignedBuilderBid},
    BidProvider, BidProviders, Error, ProviderId,
};
use ethereum_consensus::primitives::U256;
use futures::stream::{FuturesUnordered, StreamExt};
use std::{
    collections::{btree_map::Entry, BTreeMap, BTreeSet},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;

/// One provider's contribution to an auction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidParticipation {
    pub category: String,
    pub score: U256,
    pub bid: SignedBuilderBid,
}

/// Outcome of a single auction.
#[derive(Debug, Clone, Default)]
pub struct AuctionResult {
    /// At most one participation per provider
    pub participation: BTreeMap<ProviderId, BidParticipation>,
    /// Every provider that was asked for a bid
    pub all_providers: Vec<ProviderId>,
    /// The participation with the highest score, if any
    pub winning_participation: Option<BidParticipation>,
    /// Every provider whose score equals the winning score
    pub winning_providers: BTreeSet<ProviderId>,
}

impl AuctionResult {
    /// Computes the winners of `participation`.
    ///
    /// Excluded participations only compete when nothing else was offered. Among tied
    /// providers the smallest id supplies `winning_participation`, so the result does not
    /// depend on the order in which providers answered.
    pub fn new(
        all_providers: Vec<ProviderId>,
        participation: BTreeMap<ProviderId, BidParticipation>,
    ) -> Self {
        let has_eligible = participation.values().any(|entry| entry.category != EXCLUDED);
        let contenders = participation
            .iter()
            .filter(|(_, entry)| !has_eligible || entry.category != EXCLUDED)
            .collect::<Vec<_>>();

        let winning_score = contenders.iter().map(|(_, entry)| &entry.score).max().cloned();
        let winning_providers: BTreeSet<ProviderId> = match &winning_score {
            Some(score) => contenders
                .iter()
                .filter(|(_, entry)| &entry.score == score)
                .map(|(id, _)| (*id).clone())
                .collect(),
            None => BTreeSet::new(),
        };
        let winning_participation = winning_providers
            .iter()
            .next()
            .and_then(|id| participation.get(id))
            .cloned();

        Self { participation, all_providers, winning_participation, winning_providers }
    }

    pub fn winning_bid(&self) -> Option<&SignedBuilderBid> {
        self.winning_participation.as_ref().map(|entry| &entry.bid)
    }

    pub fn is_excluded(&self) -> bool {
        self.winning_participation.as_ref().map_or(false, |entry| entry.category == EXCLUDED)
    }
}

/// Runs auctions across every configured provider.
pub struct Auctioneer {
    providers: BidProviders,
    scorer: Arc<dyn BidScorer>,
    timeout: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl Auctioneer {
    pub fn new(providers: BidProviders, scorer: Arc<dyn BidScorer>, timeout: Duration) -> Self {
        Self { providers, scorer, timeout, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Asks every provider for a bid and picks the winner.
    ///
    /// Failing or silent providers are logged and left out of `participation`. If `cancel`
    /// fires first, the bids gathered so far are returned, or [`Error::Cancelled`] if there
    /// are none.
    pub async fn auction_block(
        &self,
        auction_request: &AuctionRequest,
        cancel: &CancellationToken,
    ) -> Result<AuctionResult, Error> {
        if self.providers.is_empty() {
            return Err(Error::NoProviders)
        }

        let mut pending = self
            .providers
            .iter()
            .map(|provider| async move {
                let outcome = self.fetch_bid(provider.as_ref(), auction_request).await;
                (provider.id(), outcome)
            })
            .collect::<FuturesUnordered<_>>();

        let mut participation = BTreeMap::new();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    if participation.is_empty() {
                        return Err(Error::Cancelled)
                    }
                    tracing::warn!(%auction_request, "auction cancelled, returning partial result");
                    break
                }
                next = pending.next() => match next {
                    Some((provider, Ok(Some(bid)))) => {
                        self.record_bid(&mut participation, provider, auction_request, bid)
                    }
                    Some((provider, Ok(None))) => {
                        tracing::debug!(provider, %auction_request, "no bid offered");
                    }
                    Some((provider, Err(err))) => {
                        tracing::warn!(provider, %auction_request, %err, "failed to fetch bid");
                    }
                    None => break,
                },
            }
        }

        let result = AuctionResult::new(self.providers.ids(), participation);
        tracing::debug!(
            %auction_request,
            participants = result.participation.len(),
            winners = ?result.winning_providers,
            "auction complete"
        );
        Ok(result)
    }

    async fn fetch_bid(
        &self,
        provider: &dyn BidProvider,
        auction_request: &AuctionRequest,
    ) -> Result<Option<SignedBuilderBid>, Error> {
        let id = provider.id();
        if let Some(metrics) = &self.metrics {
            metrics.inc_provider_request(ApiMethod::FetchBid, id);
        }

        let start = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, provider.fetch_bid(auction_request)).await;
        if let Some(metrics) = &self.metrics {
            metrics.observe_provider_duration(ApiMethod::FetchBid, id, start.elapsed());
        }

        outcome.unwrap_or_else(|_| {
            if let Some(metrics) = &self.metrics {
                metrics.inc_provider_timeout(ApiMethod::FetchBid, id);
            }
            Err(Error::Timeout(id.to_string()))
        })
    }

    fn record_bid(
        &self,
        participation: &mut BTreeMap<ProviderId, BidParticipation>,
        provider: &str,
        auction_request: &AuctionRequest,
        bid: SignedBuilderBid,
    ) {
        let category = self.scorer.categorize(auction_request, &bid);
        let score = self.scorer.score(&category, &bid);
        if category == EXCLUDED {
            tracing::warn!(provider, %auction_request, %bid, "excluding bid from auction");
            if let Some(metrics) = &self.metrics {
                metrics.inc_invalid_bid(provider);
            }
        } else {
            tracing::debug!(provider, %auction_request, %bid, %category, "received bid");
        }

        let entry = BidParticipation { category, score, bid };
        match participation.entry(provider.to_string()) {
            Entry::Occupied(mut existing) => {
                if existing.get().score < entry.score {
                    existing.insert(entry);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{ValueScorer, EXCLUDED, NORMAL};
    use async_trait::async_trait;
    use block_relay_rs::types::{
        capella, AuctionContents, SignedBuilderBid, VersionedSignedBlindedBeaconBlock,
    };

    enum Answer {
        Bid(u64),
        NoBid,
        Fail,
    }

    struct MockProvider {
        id: String,
        answer: Answer,
        delay: Duration,
    }

    fn provider(id: &str, answer: Answer) -> Arc<dyn BidProvider> {
        Arc::new(MockProvider { id: id.to_string(), answer, delay: Duration::ZERO })
    }

    fn slow_provider(id: &str, answer: Answer, delay: Duration) -> Arc<dyn BidProvider> {
        Arc::new(MockProvider { id: id.to_string(), answer, delay })
    }

    fn bid(value: u64) -> SignedBuilderBid {
        let mut bid = capella::SignedBuilderBid::default();
        bid.message.value = U256::from(value);
        SignedBuilderBid::Capella(bid)
    }

    #[async_trait]
    impl BidProvider for MockProvider {
        fn id(&self) -> &str {
            &self.id
        }

        async fn fetch_bid(
            &self,
            _auction_request: &AuctionRequest,
        ) -> Result<Option<SignedBuilderBid>, Error> {
            tokio::time::sleep(self.delay).await;
            match self.answer {
                Answer::Bid(value) => Ok(Some(bid(value))),
                Answer::NoBid => Ok(None),
                Answer::Fail => Err(Error::Internal("relay is down".into())),
            }
        }

        async fn unblind_block(
            &self,
            _signed_block: &VersionedSignedBlindedBeaconBlock,
        ) -> Result<Option<AuctionContents>, Error> {
            Ok(None)
        }
    }

    fn auctioneer(providers: Vec<Arc<dyn BidProvider>>) -> Auctioneer {
        Auctioneer::new(
            BidProviders::new(providers),
            Arc::new(ValueScorer::default()),
            Duration::from_millis(200),
        )
    }

    async fn run(auctioneer: &Auctioneer) -> AuctionResult {
        let request = AuctionRequest::default();
        auctioneer.auction_block(&request, &CancellationToken::new()).await.unwrap()
    }

    #[tokio::test]
    async fn highest_score_wins() {
        let auctioneer = auctioneer(vec![
            provider("r1", Answer::Bid(5)),
            provider("r2", Answer::Bid(8)),
        ]);
        let result = run(&auctioneer).await;

        assert_eq!(result.participation.len(), 2);
        let winner = result.winning_participation.unwrap();
        assert_eq!(winner.score, U256::from(8));
        assert_eq!(winner.category, NORMAL);
        assert_eq!(result.winning_providers, BTreeSet::from(["r2".to_string()]));
    }

    #[tokio::test]
    async fn ties_keep_every_winner() {
        let auctioneer = auctioneer(vec![
            provider("r2", Answer::Bid(7)),
            provider("r1", Answer::Bid(7)),
        ]);
        let result = run(&auctioneer).await;

        assert_eq!(result.winning_providers, BTreeSet::from(["r1".to_string(), "r2".to_string()]));
        assert_eq!(result.winning_participation.unwrap().score, U256::from(7));
    }

    #[tokio::test]
    async fn silent_and_failing_providers_do_not_participate() {
        let auctioneer = auctioneer(vec![
            provider("r1", Answer::NoBid),
            provider("r2", Answer::Fail),
            slow_provider("r3", Answer::Bid(3), Duration::from_secs(5)),
        ]);
        let result = run(&auctioneer).await;

        assert!(result.participation.is_empty());
        assert!(result.winning_participation.is_none());
        assert!(result.winning_providers.is_empty());
        assert_eq!(result.all_providers, vec!["r1", "r2", "r3"]);
    }

    #[tokio::test]
    async fn failures_do_not_affect_other_providers() {
        let auctioneer = auctioneer(vec![
            provider("r1", Answer::Fail),
            provider("r2", Answer::Bid(2)),
        ]);
        let result = run(&auctioneer).await;

        assert_eq!(result.participation.len(), 1);
        assert_eq!(result.winning_providers, BTreeSet::from(["r2".to_string()]));
    }

    #[tokio::test]
    async fn duplicate_ids_keep_the_highest_score() {
        let auctioneer = auctioneer(vec![
            provider("r1", Answer::Bid(4)),
            provider("r1", Answer::Bid(6)),
        ]);
        let result = run(&auctioneer).await;

        assert_eq!(result.participation.len(), 1);
        assert_eq!(result.participation["r1"].score, U256::from(6));
    }

    #[tokio::test]
    async fn no_providers_is_an_error() {
        let auctioneer = auctioneer(vec![]);
        let err = auctioneer
            .auction_block(&AuctionRequest::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoProviders));
    }

    #[tokio::test]
    async fn cancellation_keeps_finished_bids() {
        let auctioneer = Auctioneer::new(
            BidProviders::new(vec![
                provider("r1", Answer::Bid(1)),
                slow_provider("r2", Answer::Bid(9), Duration::from_secs(30)),
            ]),
            Arc::new(ValueScorer::default()),
            Duration::from_secs(60),
        );
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let result = auctioneer.auction_block(&AuctionRequest::default(), &cancel).await.unwrap();
        assert_eq!(result.winning_providers, BTreeSet::from(["r1".to_string()]));
        assert_eq!(result.all_providers.len(), 2);
    }

    #[tokio::test]
    async fn cancellation_without_bids_fails() {
        let slow = slow_provider("r1", Answer::Bid(1), Duration::from_secs(30));
        let auctioneer = auctioneer(vec![slow]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = auctioneer.auction_block(&AuctionRequest::default(), &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn empty_participation_has_no_winner() {
        let result = AuctionResult::new(vec!["r1".into()], BTreeMap::new());
        assert!(result.winning_bid().is_none());
        assert!(!result.is_excluded());
    }

    fn participation(category: &str, score: u64, value: u64) -> BidParticipation {
        let category = category.to_string();
        BidParticipation { category, score: U256::from(score), bid: bid(value) }
    }

    #[test]
    fn excluded_bids_never_shadow_eligible_ones() {
        let participation = BTreeMap::from([
            ("a".to_string(), participation(EXCLUDED, 0, 100)),
            ("b".to_string(), participation(NORMAL, 0, 0)),
        ]);
        let result = AuctionResult::new(vec!["a".into(), "b".into()], participation);

        assert_eq!(result.winning_providers, BTreeSet::from(["b".to_string()]));
        assert_eq!(result.winning_bid(), Some(&bid(0)));
        assert!(!result.is_excluded());
    }

    #[test]
    fn only_excluded_bids_win_as_excluded() {
        let participation = BTreeMap::from([
            ("a".to_string(), participation(EXCLUDED, 0, 100)),
            ("b".to_string(), participation(EXCLUDED, 0, 50)),
        ]);
        let result = AuctionResult::new(vec!["a".into(), "b".into()], participation);

        assert_eq!(result.winning_providers, BTreeSet::from(["a".to_string(), "b".to_string()]));
        assert!(result.is_excluded());
    }
}
