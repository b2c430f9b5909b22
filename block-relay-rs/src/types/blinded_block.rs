use crate::{
    error::Error,
    types::{
        bellatrix, capella, deneb, electra, AuctionContents, BlockVersion, Versioned,
        VersionedSignedProposal,
    },
};
use ethereum_consensus::primitives::{Hash32, Slot};

/// A signed blinded block for one of the supported forks.
///
/// The variant is always chosen from an explicit version indicator, never from the shape of
/// the encoded data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionedSignedBlindedBeaconBlock {
    Bellatrix(bellatrix::SignedBlindedBeaconBlock),
    Capella(capella::SignedBlindedBeaconBlock),
    Deneb(deneb::SignedBlindedBeaconBlock),
    Electra(electra::SignedBlindedBeaconBlock),
}

impl VersionedSignedBlindedBeaconBlock {
    pub fn version(&self) -> BlockVersion {
        match self {
            Self::Bellatrix(..) => BlockVersion::Bellatrix,
            Self::Capella(..) => BlockVersion::Capella,
            Self::Deneb(..) => BlockVersion::Deneb,
            Self::Electra(..) => BlockVersion::Electra,
        }
    }

    pub fn slot(&self) -> Slot {
        match self {
            Self::Bellatrix(block) => block.message.slot,
            Self::Capella(block) => block.message.slot,
            Self::Deneb(block) => block.message.slot,
            Self::Electra(block) => block.message.slot,
        }
    }

    pub fn block_hash(&self) -> &Hash32 {
        match self {
            Self::Bellatrix(block) => &block.message.body.execution_payload_header.block_hash,
            Self::Capella(block) => &block.message.body.execution_payload_header.block_hash,
            Self::Deneb(block) => &block.message.body.execution_payload_header.block_hash,
            Self::Electra(block) => &block.message.body.execution_payload_header.block_hash,
        }
    }

    pub fn parent_hash(&self) -> &Hash32 {
        match self {
            Self::Bellatrix(block) => &block.message.body.execution_payload_header.parent_hash,
            Self::Capella(block) => &block.message.body.execution_payload_header.parent_hash,
            Self::Deneb(block) => &block.message.body.execution_payload_header.parent_hash,
            Self::Electra(block) => &block.message.body.execution_payload_header.parent_hash,
        }
    }

    /// Combines this block with the `contents` a relay revealed for it.
    ///
    /// Fails if the contents belong to another fork or do not match the commitments in the
    /// block.
    pub fn unblind(&self, contents: &AuctionContents) -> Result<VersionedSignedProposal, Error> {
        let proposal = match (self, contents) {
            (Self::Bellatrix(block), AuctionContents::Bellatrix(payload)) => {
                VersionedSignedProposal::Bellatrix(bellatrix::unblind(block, payload)?)
            }
            (Self::Capella(block), AuctionContents::Capella(payload)) => {
                VersionedSignedProposal::Capella(capella::unblind(block, payload)?)
            }
            (Self::Deneb(block), AuctionContents::Deneb(contents)) => {
                VersionedSignedProposal::Deneb(deneb::unblind(block, contents)?)
            }
            (Self::Electra(block), AuctionContents::Electra(contents)) => {
                VersionedSignedProposal::Electra(electra::unblind(block, contents)?)
            }
            _ => {
                return Err(Error::VersionMismatch {
                    expected: self.version(),
                    provided: contents.version(),
                })
            }
        };
        Ok(proposal)
    }
}

impl Versioned for VersionedSignedBlindedBeaconBlock {
    fn version(&self) -> BlockVersion {
        self.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_consensus::primitives::Hash32;

    fn block_hash(byte: u8) -> Hash32 {
        Hash32::try_from([byte; 32].as_ref()).unwrap()
    }

    #[test]
    fn unblinds_matching_payload() {
        let mut block = bellatrix::SignedBlindedBeaconBlock::default();
        block.message.slot = 7;
        block.message.body.execution_payload_header.block_hash = block_hash(1);
        let block = VersionedSignedBlindedBeaconBlock::Bellatrix(block);

        let payload = bellatrix::ExecutionPayload { block_hash: block_hash(1), ..Default::default() };
        let proposal = block.unblind(&AuctionContents::Bellatrix(payload.clone())).unwrap();
        assert_eq!(proposal.version(), BlockVersion::Bellatrix);
        assert_eq!(proposal.block_hash(), &block_hash(1));
        assert_eq!(proposal.into_auction_contents(), AuctionContents::Bellatrix(payload));
    }

    #[test]
    fn rejects_payload_for_other_block() {
        let mut block = capella::SignedBlindedBeaconBlock::default();
        block.message.body.execution_payload_header.block_hash = block_hash(1);
        let block = VersionedSignedBlindedBeaconBlock::Capella(block);

        let payload = capella::ExecutionPayload { block_hash: block_hash(2), ..Default::default() };
        let err = block.unblind(&AuctionContents::Capella(payload)).unwrap_err();
        assert!(matches!(err, Error::InvalidExecutionPayload { .. }));
    }

    #[test]
    fn rejects_contents_for_other_fork() {
        let block = VersionedSignedBlindedBeaconBlock::Deneb(Default::default());
        let contents = AuctionContents::Capella(Default::default());
        let err = block.unblind(&contents).unwrap_err();
        assert!(matches!(
            err,
            Error::VersionMismatch { expected: BlockVersion::Deneb, provided: BlockVersion::Capella }
        ));
    }

    #[test]
    fn rejects_blobs_bundle_with_missing_blobs() {
        let block = VersionedSignedBlindedBeaconBlock::Deneb(Default::default());
        let mut contents = deneb::ExecutionPayloadAndBlobsBundle::default();
        contents.blobs_bundle.proofs.push(Default::default());
        let err = block.unblind(&AuctionContents::Deneb(contents)).unwrap_err();
        assert!(matches!(err, Error::InvalidBlobsBundle));
    }

    #[test]
    fn unblinds_deneb_block_with_blobs() {
        let mut block = deneb::SignedBlindedBeaconBlock::default();
        block.message.slot = 9;
        block.message.body.execution_payload_header.block_hash = block_hash(3);
        let mut contents = deneb::ExecutionPayloadAndBlobsBundle::default();
        contents.execution_payload.block_hash = block_hash(3);
        for _ in 0..2 {
            block.message.body.blob_kzg_commitments.push(Default::default());
            contents.blobs_bundle.commitments.push(Default::default());
            contents.blobs_bundle.proofs.push(Default::default());
            contents.blobs_bundle.blobs.push(Default::default());
        }
        let block = VersionedSignedBlindedBeaconBlock::Deneb(block);

        let proposal = block.unblind(&AuctionContents::Deneb(contents.clone())).unwrap();
        let VersionedSignedProposal::Deneb(signed_contents) = &proposal else {
            panic!("expected a deneb proposal, got {}", proposal.version())
        };
        let message = &signed_contents.signed_block.message;
        assert_eq!(message.slot, 9);
        assert_eq!(message.body.execution_payload.block_hash, block_hash(3));
        assert_eq!(message.body.blob_kzg_commitments.len(), 2);
        assert_eq!(signed_contents.kzg_proofs.len(), 2);
        assert_eq!(signed_contents.blobs.len(), 2);
        assert_eq!(proposal.into_auction_contents(), AuctionContents::Deneb(contents));
    }

    #[test]
    fn unblinds_electra_block_with_blobs() {
        let mut block = electra::SignedBlindedBeaconBlock::default();
        block.message.slot = 11;
        block.message.body.execution_payload_header.block_hash = block_hash(4);
        let mut contents = electra::ExecutionPayloadAndBlobsBundle::default();
        contents.execution_payload.block_hash = block_hash(4);
        block.message.body.blob_kzg_commitments.push(Default::default());
        contents.blobs_bundle.commitments.push(Default::default());
        contents.blobs_bundle.proofs.push(Default::default());
        contents.blobs_bundle.blobs.push(Default::default());
        let block = VersionedSignedBlindedBeaconBlock::Electra(block);

        let proposal = block.unblind(&AuctionContents::Electra(contents.clone())).unwrap();
        assert_eq!(proposal.version(), BlockVersion::Electra);
        assert_eq!(proposal.block_hash(), &block_hash(4));
        let VersionedSignedProposal::Electra(signed_contents) = &proposal else {
            panic!("expected an electra proposal, got {}", proposal.version())
        };
        assert_eq!(signed_contents.signed_block.message.slot, 11);
        assert_eq!(signed_contents.kzg_proofs.len(), 1);
        assert_eq!(signed_contents.blobs.len(), 1);
        assert_eq!(proposal.into_auction_contents(), AuctionContents::Electra(contents));
    }

    #[test]
    fn rejects_blobs_bundle_for_other_commitments() {
        let mut block = electra::SignedBlindedBeaconBlock::default();
        block.message.body.blob_kzg_commitments.push(Default::default());
        let block = VersionedSignedBlindedBeaconBlock::Electra(block);

        let contents = electra::ExecutionPayloadAndBlobsBundle::default();
        let err = block.unblind(&AuctionContents::Electra(contents)).unwrap_err();
        assert!(matches!(err, Error::InvalidBlobsBundle));
    }
}
