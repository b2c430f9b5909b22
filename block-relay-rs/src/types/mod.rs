mod auction_request;
pub mod bellatrix;
mod blinded_block;
mod builder_bid;
pub mod capella;
pub mod deneb;
pub mod electra;
mod proposal;

use crate::error::Error;
use ethereum_consensus::{
    deneb::{mainnet::MAX_BLOB_COMMITMENTS_PER_BLOCK, polynomial_commitments::KzgCommitment},
    primitives::Hash32,
    ssz::prelude::List,
};
use std::{fmt, str::FromStr};

pub use auction_request::AuctionRequest;
pub use blinded_block::VersionedSignedBlindedBeaconBlock;
pub use builder_bid::SignedBuilderBid;
pub use ethereum_consensus::builder::SignedValidatorRegistration;
pub use proposal::{AuctionContents, VersionedSignedProposal};

/// The consensus forks whose block formats the relay can handle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BlockVersion {
    Bellatrix,
    Capella,
    Deneb,
    Electra,
}

impl BlockVersion {
    pub const ALL: [Self; 4] = [Self::Bellatrix, Self::Capella, Self::Deneb, Self::Electra];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bellatrix => "bellatrix",
            Self::Capella => "capella",
            Self::Deneb => "deneb",
            Self::Electra => "electra",
        }
    }
}

impl fmt::Display for BlockVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let version = s.trim();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(version))
            .ok_or_else(|| Error::UnknownBlockVersion(version.to_string()))
    }
}

/// Types carrying the fork they belong to.
pub trait Versioned {
    fn version(&self) -> BlockVersion;
}

/// The builder API's JSON envelope for fork-dependent data.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VersionedValue<T> {
    pub version: BlockVersion,
    pub data: T,
}

pub(crate) fn verify_block_hash(expected: &Hash32, provided: &Hash32) -> Result<(), Error> {
    if expected != provided {
        return Err(Error::InvalidExecutionPayload {
            expected: expected.clone(),
            provided: provided.clone(),
        })
    }
    Ok(())
}

pub(crate) fn verify_blobs_bundle(
    commitments: &List<KzgCommitment, MAX_BLOB_COMMITMENTS_PER_BLOCK>,
    bundle: &deneb::BlobsBundle,
) -> Result<(), Error> {
    let count = commitments.len();
    if bundle.commitments != *commitments ||
        bundle.proofs.len() != count ||
        bundle.blobs.len() != count
    {
        return Err(Error::InvalidBlobsBundle)
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_versions_ignoring_case() {
        assert_eq!("deneb".parse::<BlockVersion>().unwrap(), BlockVersion::Deneb);
        assert_eq!("Electra".parse::<BlockVersion>().unwrap(), BlockVersion::Electra);
        assert_eq!("CAPELLA".parse::<BlockVersion>().unwrap(), BlockVersion::Capella);
    }

    #[test]
    fn rejects_unknown_version() {
        let err = "phase0".parse::<BlockVersion>().unwrap_err();
        assert_eq!(err.to_string(), "unknown block version phase0");
    }

    #[test]
    fn serializes_lowercase() {
        let value = VersionedValue { version: BlockVersion::Bellatrix, data: 7u8 };
        let encoding = serde_json::to_string(&value).unwrap();
        assert_eq!(encoding, r#"{"version":"bellatrix","data":7}"#);
    }
}
