use crate::error::Error;
use ethereum_consensus::primitives::{BlsPublicKey, Hash32, Slot};

const HASH_LENGTH: usize = 32;
const PUBLIC_KEY_LENGTH: usize = 48;

/// Describes a single unique auction.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct AuctionRequest {
    /// Slot for the proposal
    #[serde(with = "crate::serde::as_str")]
    pub slot: Slot,
    /// Hash of the parent block for the proposal
    pub parent_hash: Hash32,
    /// Public key of the proposer for the proposal
    pub public_key: BlsPublicKey,
}

impl AuctionRequest {
    /// Builds a request from the raw path segments of `GET /eth/v1/builder/header`.
    pub fn from_path(slot: &str, parent_hash: &str, public_key: &str) -> Result<Self, Error> {
        let slot = slot.parse::<Slot>().map_err(|err| Error::InvalidParameter {
            name: "slot",
            value: slot.to_string(),
            reason: err.to_string(),
        })?;

        let bytes = parse_hex_param("parenthash", parent_hash, HASH_LENGTH)?;
        let parent_hash = Hash32::try_from(bytes.as_ref()).map_err(|err| {
            Error::InvalidParameter {
                name: "parenthash",
                value: parent_hash.to_string(),
                reason: format!("{err:?}"),
            }
        })?;

        let bytes = parse_hex_param("pubkey", public_key, PUBLIC_KEY_LENGTH)?;
        let public_key = BlsPublicKey::try_from(bytes.as_ref()).map_err(|err| {
            Error::InvalidParameter {
                name: "pubkey",
                value: public_key.to_string(),
                reason: err.to_string(),
            }
        })?;

        Ok(Self { slot, parent_hash, public_key })
    }
}

fn parse_hex_param(name: &'static str, value: &str, length: usize) -> Result<Vec<u8>, Error> {
    let invalid = |reason: String| Error::InvalidParameter { name, value: value.to_string(), reason };

    let digits = value.strip_prefix("0x").ok_or_else(|| invalid("missing 0x prefix".into()))?;
    let bytes = hex::decode(digits).map_err(|err| invalid(err.to_string()))?;
    if bytes.len() != length {
        return Err(invalid(format!("expected {length} bytes but found {}", bytes.len())))
    }
    Ok(bytes)
}

impl std::fmt::Display for AuctionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot;
        let parent_hash = &self.parent_hash;
        let public_key = &self.public_key;
        write!(f, "slot {slot}, parent hash {parent_hash} and proposer {public_key}")
    }
}
