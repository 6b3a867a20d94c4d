use parse_display::Display;
use thiserror::Error;
use types::phase0::primitives::{CommitteeIndex, Epoch, Slot};

#[derive(Debug, Error)]
pub enum Error {
    #[error("attestation has no attesting indices")]
    AttestationHasNoAttestingIndices,
    #[error("attesting indices are not sorted and unique")]
    AttestingIndicesNotSortedAndUnique,
    #[error("committee index {index} is out of bounds (committees per slot: {committees_per_slot})")]
    CommitteeIndexOutOfBounds {
        index: CommitteeIndex,
        committees_per_slot: u64,
    },
    #[error("aggregation bitfield length {aggregation_bitfield_length} does not match committee length {committee_length}")]
    CommitteeLengthMismatch {
        aggregation_bitfield_length: usize,
        committee_length: usize,
    },
    #[error("epoch {epoch} is after the next one relative to state at slot {state_slot}")]
    EpochAfterNext { epoch: Epoch, state_slot: Slot },
    #[error("epoch {epoch} is before the previous one relative to state at slot {state_slot}")]
    EpochBeforePrevious { epoch: Epoch, state_slot: Slot },
    #[error("epoch number overflowed")]
    EpochOverflow,
    #[error("failed to select proposer")]
    FailedToSelectProposer,
    #[error("no validators are active")]
    NoActiveValidators,
    #[error("{0} is invalid")]
    SignatureInvalid(SignatureKind),
    #[error("subnet ID overflowed")]
    SubnetIdOverflow,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
pub enum SignatureKind {
    #[display("aggregate and proof signature")]
    AggregateAndProof,
    #[display("attestation signature")]
    Attestation,
    #[display("block signature")]
    Block,
    #[display("collection of multiple signatures")]
    Multi,
    #[display("selection proof")]
    SelectionProof,
    #[display("voluntary exit signature")]
    VoluntaryExit,
}
