use parse_display::Display;
use strum::IntoStaticStr;
use thiserror::Error;
use types::phase0::{
    containers::Checkpoint,
    primitives::{CommitteeIndex, Epoch, Slot, SubnetId, ValidatorIndex, H256},
};

/// How the network layer should treat a message that failed validation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[display(style = "lowercase")]
pub enum Classification {
    /// The message is invalid under the protocol. The sender may be penalized.
    Reject,
    /// The message may become valid later or is merely redundant.
    Ignore,
}

pub trait ValidationError {
    fn classification(&self) -> Classification;

    /// Whether the failure came from a capability or helper rather than from the message.
    fn is_internal(&self) -> bool;

    fn reason(&self) -> &'static str;
}

#[derive(Debug, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum AttestationError {
    #[error(
        "attestation target epoch does not match its slot \
         (slot: {slot}, target epoch: {target_epoch})"
    )]
    BadTargetEpoch { slot: Slot, target_epoch: Epoch },
    #[error(
        "attestation is too old \
         (slot: {slot}, earliest permissible slot: {earliest_permissible_slot})"
    )]
    PastSlot {
        slot: Slot,
        earliest_permissible_slot: Slot,
    },
    #[error(
        "attestation is from the future \
         (slot: {slot}, latest permissible slot: {latest_permissible_slot})"
    )]
    FutureSlot {
        slot: Slot,
        latest_permissible_slot: Slot,
    },
    #[error("attestation votes for an unknown block: {beacon_block_root:?}")]
    UnknownBeaconBlockRoot { beacon_block_root: H256 },
    #[error("attestation votes for a known bad block: {beacon_block_root:?}")]
    KnownBadBlock { beacon_block_root: H256 },
    #[error(
        "attestation target is not an ancestor of the voted block \
         (target root: {target_root:?}, beacon block root: {beacon_block_root:?})"
    )]
    TargetBlockNotAnAncestorOfLmdBlock {
        target_root: H256,
        beacon_block_root: H256,
    },
    #[error("finalized checkpoint is not an ancestor of the voted block: {beacon_block_root:?}")]
    FinalizedCheckpointNotAnAncestorOfRoot { beacon_block_root: H256 },
    #[error("state at attestation target could not be obtained (target: {target:?}): {error}")]
    MissingTargetState {
        target: Checkpoint,
        error: anyhow::Error,
    },
    #[error("no committee for slot {slot} and index {index}: {error}")]
    NoCommitteeForSlotAndIndex {
        slot: Slot,
        index: CommitteeIndex,
        error: anyhow::Error,
    },
    #[error("attestation bitfield does not match committee: {error}")]
    InvalidAggregationBits { error: anyhow::Error },
    #[error("unaggregated attestation does not have exactly one bit set (set bits: {set_bits})")]
    NotExactlyOneAggregationBitSet { set_bits: usize },
    #[error("attestation arrived on the wrong subnet (received: {received}, expected: {expected})")]
    InvalidSubnetId {
        received: SubnetId,
        expected: SubnetId,
    },
    #[error(
        "attestation from validator {validator_index} \
         for target epoch {target_epoch} already seen"
    )]
    AttestationAlreadyKnown {
        target_epoch: Epoch,
        validator_index: ValidatorIndex,
    },
    #[error("attestation signature is invalid")]
    InvalidSignature,
    #[error("indexed attestation is invalid: {error}")]
    InvalidIndexedAttestation { error: anyhow::Error },
    #[error("state at attestation target is missing (target: {target:?}): {error}")]
    TargetStateMissing {
        target: Checkpoint,
        error: anyhow::Error,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ValidationError for AttestationError {
    fn classification(&self) -> Classification {
        match self {
            Self::BadTargetEpoch { .. }
            | Self::KnownBadBlock { .. }
            | Self::TargetBlockNotAnAncestorOfLmdBlock { .. }
            | Self::FinalizedCheckpointNotAnAncestorOfRoot { .. }
            | Self::NoCommitteeForSlotAndIndex { .. }
            | Self::InvalidAggregationBits { .. }
            | Self::NotExactlyOneAggregationBitSet { .. }
            | Self::InvalidSubnetId { .. }
            | Self::InvalidSignature
            | Self::InvalidIndexedAttestation { .. } => Classification::Reject,
            Self::PastSlot { .. }
            | Self::FutureSlot { .. }
            | Self::UnknownBeaconBlockRoot { .. }
            | Self::MissingTargetState { .. }
            | Self::AttestationAlreadyKnown { .. }
            | Self::TargetStateMissing { .. }
            | Self::Internal(_) => Classification::Ignore,
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    fn reason(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum AggregateAndProofError {
    #[error(
        "aggregate target epoch does not match its slot \
         (slot: {slot}, target epoch: {target_epoch})"
    )]
    BadTargetEpoch { slot: Slot, target_epoch: Epoch },
    #[error(
        "aggregate is too old \
         (slot: {slot}, earliest permissible slot: {earliest_permissible_slot})"
    )]
    PastSlot {
        slot: Slot,
        earliest_permissible_slot: Slot,
    },
    #[error(
        "aggregate is from the future \
         (slot: {slot}, latest permissible slot: {latest_permissible_slot})"
    )]
    FutureSlot {
        slot: Slot,
        latest_permissible_slot: Slot,
    },
    #[error(
        "aggregate from aggregator {aggregator_index} \
         for target epoch {target_epoch} already seen"
    )]
    AggregatorAlreadyKnown {
        target_epoch: Epoch,
        aggregator_index: ValidatorIndex,
    },
    #[error("aggregate votes for an unknown block: {beacon_block_root:?}")]
    UnknownBeaconBlockRoot { beacon_block_root: H256 },
    #[error("aggregate votes for a known bad block: {beacon_block_root:?}")]
    KnownBadBlock { beacon_block_root: H256 },
    #[error("state at aggregate target could not be obtained (target: {target:?}): {error}")]
    MissingTargetState {
        target: Checkpoint,
        error: anyhow::Error,
    },
    #[error("no committee for slot {slot} and index {index}: {error}")]
    NoCommitteeForSlotAndIndex {
        slot: Slot,
        index: CommitteeIndex,
        error: anyhow::Error,
    },
    #[error("aggregate bitfield does not match committee: {error}")]
    InvalidAggregationBits { error: anyhow::Error },
    #[error("aggregate has no participants")]
    WrongNumberOfAggregationBits,
    #[error("selection proof does not make validator {aggregator_index} an aggregator")]
    InvalidAggregator { aggregator_index: ValidatorIndex },
    #[error("aggregator {aggregator_index} is not in the committee")]
    AggregatorNotInCommittee { aggregator_index: ValidatorIndex },
    #[error("aggregate and proof contains an invalid signature")]
    InvalidSignature,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ValidationError for AggregateAndProofError {
    fn classification(&self) -> Classification {
        match self {
            Self::BadTargetEpoch { .. }
            | Self::KnownBadBlock { .. }
            | Self::NoCommitteeForSlotAndIndex { .. }
            | Self::InvalidAggregationBits { .. }
            | Self::WrongNumberOfAggregationBits
            | Self::InvalidAggregator { .. }
            | Self::AggregatorNotInCommittee { .. }
            | Self::InvalidSignature => Classification::Reject,
            Self::PastSlot { .. }
            | Self::FutureSlot { .. }
            | Self::AggregatorAlreadyKnown { .. }
            | Self::UnknownBeaconBlockRoot { .. }
            | Self::MissingTargetState { .. }
            | Self::Internal(_) => Classification::Ignore,
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    fn reason(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum BlockError {
    #[error("block would revert finalized slot (slot: {slot}, finalized slot: {finalized_slot})")]
    WouldRevertFinalizedSlot { slot: Slot, finalized_slot: Slot },
    #[error("block is from the future (slot: {slot}, current slot: {current_slot})")]
    FutureSlot { slot: Slot, current_slot: Slot },
    #[error("block is known to be bad: {block_root:?}")]
    KnownBadBlock { block_root: H256 },
    #[error(
        "proposer {proposer_index} already proposed a block in slot {slot} \
         (existing block root: {existing_block_root:?})"
    )]
    RepeatProposal {
        slot: Slot,
        proposer_index: ValidatorIndex,
        existing_block_root: H256,
    },
    #[error("state for parent could not be obtained (parent root: {parent_root:?}): {error}")]
    ParentUnknown {
        parent_root: H256,
        error: anyhow::Error,
    },
    #[error("block proposer signature is invalid")]
    ProposalSignatureInvalid,
    #[error("block has incorrect proposer (declared: {proposer_index}, expected: {expected})")]
    IncorrectProposer {
        proposer_index: ValidatorIndex,
        expected: ValidatorIndex,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ValidationError for BlockError {
    fn classification(&self) -> Classification {
        match self {
            Self::WouldRevertFinalizedSlot { .. }
            | Self::KnownBadBlock { .. }
            | Self::RepeatProposal { .. }
            | Self::ProposalSignatureInvalid
            | Self::IncorrectProposer { .. } => Classification::Reject,
            Self::FutureSlot { .. } | Self::ParentUnknown { .. } | Self::Internal(_) => {
                Classification::Ignore
            }
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    fn reason(&self) -> &'static str {
        self.into()
    }
}
