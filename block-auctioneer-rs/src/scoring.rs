use block_relay_rs::types::{AuctionRequest, SignedBuilderBid};
use ethereum_consensus::primitives::U256;

/// Category of bids eligible to win on their value.
pub const NORMAL: &str = "normal";
/// Category of bids that must never be offered to a proposer.
pub const EXCLUDED: &str = "excluded";

/// Policy assigning a category and a score to every bid of an auction.
///
/// Higher scores win.
pub trait BidScorer: Send + Sync {
    fn categorize(&self, auction_request: &AuctionRequest, bid: &SignedBuilderBid) -> String;

    fn score(&self, category: &str, bid: &SignedBuilderBid) -> U256;
}

/// Scores bids by their value, excluding those for another parent or below a floor.
#[derive(Debug, Clone, Default)]
pub struct ValueScorer {
    min_bid: U256,
}

impl ValueScorer {
    pub fn new(min_bid: U256) -> Self {
        Self { min_bid }
    }
}

impl BidScorer for ValueScorer {
    fn categorize(&self, auction_request: &AuctionRequest, bid: &SignedBuilderBid) -> String {
        if bid.parent_hash() != &auction_request.parent_hash || bid.value() < &self.min_bid {
            EXCLUDED.to_string()
        } else {
            NORMAL.to_string()
        }
    }

    fn score(&self, category: &str, bid: &SignedBuilderBid) -> U256 {
        if category == EXCLUDED {
            U256::default()
        } else {
            bid.value().clone()
        }
    }
}
