use crate::{
    error::Error,
    types::{verify_block_hash, verify_blobs_bundle},
};
pub use ethereum_consensus::deneb::mainnet as spec;
use ethereum_consensus::{
    deneb::{
        mainnet::MAX_BLOB_COMMITMENTS_PER_BLOCK,
        polynomial_commitments::{KzgCommitment, KzgProof},
    },
    primitives::{BlsPublicKey, BlsSignature, U256},
    ssz::prelude::*,
};

// NOTE: type alias here to call out the important types clearly, in lieu of just `pub use ...`
pub type ExecutionPayload = spec::ExecutionPayload;
pub type ExecutionPayloadHeader = spec::ExecutionPayloadHeader;
pub type SignedBlindedBeaconBlock = spec::SignedBlindedBeaconBlock;
pub type SignedBeaconBlock = spec::SignedBeaconBlock;
pub type Blob = spec::Blob;

#[derive(Debug, Default, Clone, PartialEq, Eq, SimpleSerialize)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct BuilderBid {
    pub header: ExecutionPayloadHeader,
    pub blob_kzg_commitments: List<KzgCommitment, MAX_BLOB_COMMITMENTS_PER_BLOCK>,
    #[serde(with = "crate::serde::as_str")]
    pub value: U256,
    #[serde(rename = "pubkey")]
    pub public_key: BlsPublicKey,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, SimpleSerialize)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SignedBuilderBid {
    pub message: BuilderBid,
    pub signature: BlsSignature,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, SimpleSerialize)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct BlobsBundle {
    pub commitments: List<KzgCommitment, MAX_BLOB_COMMITMENTS_PER_BLOCK>,
    pub proofs: List<KzgProof, MAX_BLOB_COMMITMENTS_PER_BLOCK>,
    pub blobs: List<Blob, MAX_BLOB_COMMITMENTS_PER_BLOCK>,
}

/// Contents returned by a relay when unblinding a deneb block.
#[derive(Debug, Default, Clone, PartialEq, Eq, SimpleSerialize)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ExecutionPayloadAndBlobsBundle {
    pub execution_payload: ExecutionPayload,
    pub blobs_bundle: BlobsBundle,
}

/// A full signed block along with the blob data required to publish it.
#[derive(Debug, Default, Clone, PartialEq, Eq, SimpleSerialize)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SignedBlockContents {
    pub signed_block: SignedBeaconBlock,
    pub kzg_proofs: List<KzgProof, MAX_BLOB_COMMITMENTS_PER_BLOCK>,
    pub blobs: List<Blob, MAX_BLOB_COMMITMENTS_PER_BLOCK>,
}

pub fn unblind(
    signed_blinded_block: &SignedBlindedBeaconBlock,
    contents: &ExecutionPayloadAndBlobsBundle,
) -> Result<SignedBlockContents, Error> {
    let block = &signed_blinded_block.message;
    let body = &block.body;
    let execution_payload = &contents.execution_payload;
    verify_block_hash(&body.execution_payload_header.block_hash, &execution_payload.block_hash)?;
    verify_blobs_bundle(&body.blob_kzg_commitments, &contents.blobs_bundle)?;

    let message = spec::BeaconBlock {
        slot: block.slot,
        proposer_index: block.proposer_index,
        parent_root: block.parent_root.clone(),
        state_root: block.state_root.clone(),
        body: spec::BeaconBlockBody {
            randao_reveal: body.randao_reveal.clone(),
            eth1_data: body.eth1_data.clone(),
            graffiti: body.graffiti.clone(),
            proposer_slashings: body.proposer_slashings.clone(),
            attester_slashings: body.attester_slashings.clone(),
            attestations: body.attestations.clone(),
            deposits: body.deposits.clone(),
            voluntary_exits: body.voluntary_exits.clone(),
            sync_aggregate: body.sync_aggregate.clone(),
            execution_payload: execution_payload.clone(),
            bls_to_execution_changes: body.bls_to_execution_changes.clone(),
            blob_kzg_commitments: body.blob_kzg_commitments.clone(),
        },
    };
    let signed_block =
        SignedBeaconBlock { message, signature: signed_blinded_block.signature.clone() };
    Ok(SignedBlockContents {
        signed_block,
        kzg_proofs: contents.blobs_bundle.proofs.clone(),
        blobs: contents.blobs_bundle.blobs.clone(),
    })
}
