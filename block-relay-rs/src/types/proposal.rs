use crate::types::{bellatrix, capella, deneb, electra, BlockVersion, Versioned};
use ethereum_consensus::primitives::Hash32;

/// A full signed block, produced only by successfully unblinding a blinded block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionedSignedProposal {
    Bellatrix(bellatrix::SignedBeaconBlock),
    Capella(capella::SignedBeaconBlock),
    Deneb(deneb::SignedBlockContents),
    Electra(electra::SignedBlockContents),
}

impl VersionedSignedProposal {
    pub fn version(&self) -> BlockVersion {
        match self {
            Self::Bellatrix(..) => BlockVersion::Bellatrix,
            Self::Capella(..) => BlockVersion::Capella,
            Self::Deneb(..) => BlockVersion::Deneb,
            Self::Electra(..) => BlockVersion::Electra,
        }
    }

    pub fn block_hash(&self) -> &Hash32 {
        match self {
            Self::Bellatrix(block) => &block.message.body.execution_payload.block_hash,
            Self::Capella(block) => &block.message.body.execution_payload.block_hash,
            Self::Deneb(contents) => {
                &contents.signed_block.message.body.execution_payload.block_hash
            }
            Self::Electra(contents) => {
                &contents.signed_block.message.body.execution_payload.block_hash
            }
        }
    }

    /// Projects the proposal into what a proposer receives from the builder API.
    pub fn into_auction_contents(self) -> AuctionContents {
        match self {
            Self::Bellatrix(block) => AuctionContents::Bellatrix(block.message.body.execution_payload),
            Self::Capella(block) => AuctionContents::Capella(block.message.body.execution_payload),
            Self::Deneb(contents) => {
                let body = contents.signed_block.message.body;
                AuctionContents::Deneb(deneb::ExecutionPayloadAndBlobsBundle {
                    execution_payload: body.execution_payload,
                    blobs_bundle: deneb::BlobsBundle {
                        commitments: body.blob_kzg_commitments,
                        proofs: contents.kzg_proofs,
                        blobs: contents.blobs,
                    },
                })
            }
            Self::Electra(contents) => {
                let body = contents.signed_block.message.body;
                AuctionContents::Electra(electra::ExecutionPayloadAndBlobsBundle {
                    execution_payload: body.execution_payload,
                    blobs_bundle: electra::BlobsBundle {
                        commitments: body.blob_kzg_commitments,
                        proofs: contents.kzg_proofs,
                        blobs: contents.blobs,
                    },
                })
            }
        }
    }
}

/// The payload (and blobs, from deneb onwards) revealed for a winning bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuctionContents {
    Bellatrix(bellatrix::ExecutionPayload),
    Capella(capella::ExecutionPayload),
    Deneb(deneb::ExecutionPayloadAndBlobsBundle),
    Electra(electra::ExecutionPayloadAndBlobsBundle),
}

impl AuctionContents {
    pub fn version(&self) -> BlockVersion {
        match self {
            Self::Bellatrix(..) => BlockVersion::Bellatrix,
            Self::Capella(..) => BlockVersion::Capella,
            Self::Deneb(..) => BlockVersion::Deneb,
            Self::Electra(..) => BlockVersion::Electra,
        }
    }

    pub fn block_hash(&self) -> &Hash32 {
        match self {
            Self::Bellatrix(payload) => &payload.block_hash,
            Self::Capella(payload) => &payload.block_hash,
            Self::Deneb(contents) => &contents.execution_payload.block_hash,
            Self::Electra(contents) => &contents.execution_payload.block_hash,
        }
    }
}

impl Versioned for VersionedSignedProposal {
    fn version(&self) -> BlockVersion {
        self.version()
    }
}

impl Versioned for AuctionContents {
    fn version(&self) -> BlockVersion {
        self.version()
    }
}
