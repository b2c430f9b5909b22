use crate::types::{bellatrix, capella, deneb, electra, BlockVersion, Versioned};
use ethereum_consensus::primitives::{BlsPublicKey, Hash32, U256};
use std::fmt;

/// A relay's signed offer to fill a proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedBuilderBid {
    Bellatrix(bellatrix::SignedBuilderBid),
    Capella(capella::SignedBuilderBid),
    Deneb(deneb::SignedBuilderBid),
    Electra(electra::SignedBuilderBid),
}

impl SignedBuilderBid {
    pub fn version(&self) -> BlockVersion {
        match self {
            Self::Bellatrix(..) => BlockVersion::Bellatrix,
            Self::Capella(..) => BlockVersion::Capella,
            Self::Deneb(..) => BlockVersion::Deneb,
            Self::Electra(..) => BlockVersion::Electra,
        }
    }

    pub fn value(&self) -> &U256 {
        match self {
            Self::Bellatrix(bid) => &bid.message.value,
            Self::Capella(bid) => &bid.message.value,
            Self::Deneb(bid) => &bid.message.value,
            Self::Electra(bid) => &bid.message.value,
        }
    }

    pub fn block_hash(&self) -> &Hash32 {
        match self {
            Self::Bellatrix(bid) => &bid.message.header.block_hash,
            Self::Capella(bid) => &bid.message.header.block_hash,
            Self::Deneb(bid) => &bid.message.header.block_hash,
            Self::Electra(bid) => &bid.message.header.block_hash,
        }
    }

    pub fn parent_hash(&self) -> &Hash32 {
        match self {
            Self::Bellatrix(bid) => &bid.message.header.parent_hash,
            Self::Capella(bid) => &bid.message.header.parent_hash,
            Self::Deneb(bid) => &bid.message.header.parent_hash,
            Self::Electra(bid) => &bid.message.header.parent_hash,
        }
    }

    pub fn public_key(&self) -> &BlsPublicKey {
        match self {
            Self::Bellatrix(bid) => &bid.message.public_key,
            Self::Capella(bid) => &bid.message.public_key,
            Self::Deneb(bid) => &bid.message.public_key,
            Self::Electra(bid) => &bid.message.public_key,
        }
    }
}

impl Versioned for SignedBuilderBid {
    fn version(&self) -> BlockVersion {
        self.version()
    }
}

impl fmt::Display for SignedBuilderBid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let block_hash = self.block_hash();
        let value = self.value();
        write!(f, "block hash {block_hash} and value {value:?}")
    }
}
