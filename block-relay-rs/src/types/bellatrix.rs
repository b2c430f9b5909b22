use crate::{error::Error, types::verify_block_hash};
pub use ethereum_consensus::bellatrix::mainnet as spec;
use ethereum_consensus::{
    primitives::{BlsPublicKey, BlsSignature, U256},
    ssz::prelude::*,
};

// NOTE: type alias here to call out the important types clearly, in lieu of just `pub use ...`
pub type ExecutionPayload = spec::ExecutionPayload;
pub type ExecutionPayloadHeader = spec::ExecutionPayloadHeader;
pub type SignedBlindedBeaconBlock = spec::SignedBlindedBeaconBlock;
pub type SignedBeaconBlock = spec::SignedBeaconBlock;

#[derive(Debug, Default, Clone, PartialEq, Eq, SimpleSerialize)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct BuilderBid {
    pub header: ExecutionPayloadHeader,
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

/// Rebuilds the full block by substituting `execution_payload` for the committed header.
pub fn unblind(
    signed_blinded_block: &SignedBlindedBeaconBlock,
    execution_payload: &ExecutionPayload,
) -> Result<SignedBeaconBlock, Error> {
    let block = &signed_blinded_block.message;
    let body = &block.body;
    verify_block_hash(&body.execution_payload_header.block_hash, &execution_payload.block_hash)?;

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
        },
    };
    Ok(SignedBeaconBlock { message, signature: signed_blinded_block.signature.clone() })
}
