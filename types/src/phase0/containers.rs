use bitvec::{order::Lsb0, vec::BitVec};

use crate::phase0::primitives::{
    CommitteeIndex, Epoch, Gwei, PublicKeyBytes, SignatureBytes, Slot, ValidatorIndex, H256,
};

pub type AggregationBits = BitVec<u8, Lsb0>;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AggregateAndProof {
    pub aggregator_index: ValidatorIndex,
    pub aggregate: Attestation,
    pub selection_proof: SignatureBytes,
}

#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct Attestation {
    pub aggregation_bits: AggregationBits,
    pub data: AttestationData,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct AttestationData {
    pub slot: Slot,
    pub index: CommitteeIndex,
    pub beacon_block_root: H256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AttesterSlashing {
    pub attestation_1: IndexedAttestation,
    pub attestation_2: IndexedAttestation,
}

#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct BeaconBlock {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub body: BeaconBlockBody,
}

#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct BeaconBlockBody {
    pub randao_reveal: SignatureBytes,
    pub graffiti: H256,
    pub attester_slashings: Vec<AttesterSlashing>,
    pub attestations: Vec<Attestation>,
    pub voluntary_exits: Vec<SignedVoluntaryExit>,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: H256,
}

#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct IndexedAttestation {
    pub attesting_indices: Vec<ValidatorIndex>,
    pub data: AttestationData,
    pub signature: SignatureBytes,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SignedAggregateAndProof {
    pub message: AggregateAndProof,
    pub signature: SignatureBytes,
}

#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct SignedVoluntaryExit {
    pub message: VoluntaryExit,
    pub signature: SignatureBytes,
}

/// A single entry in the validator registry.
///
/// Records are stored contiguously in [`BeaconState::validators`] and addressed by position.
///
/// [`BeaconState::validators`]: crate::phase0::beacon_state::BeaconState::validators
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Validator {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: H256,
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct VoluntaryExit {
    pub epoch: Epoch,
    pub validator_index: ValidatorIndex,
}
