use core::{num::NonZeroU64, ops::Div as _};

use anyhow::{ensure, Result};
use itertools::Itertools as _;
use tap::{Pipe as _, TryConv as _};
use typenum::Unsigned as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::{TargetAggregatorsPerCommittee, FAR_FUTURE_EPOCH},
        containers::{AttestationData, IndexedAttestation, Validator},
        primitives::{Epoch, SignatureBytes},
    },
    preset::Preset,
};

use crate::{error::Error, signing, verifier::Verifier};

// > Check if ``validator`` is active.
#[inline]
#[must_use]
pub const fn is_active_validator(validator: &Validator, epoch: Epoch) -> bool {
    validator.activation_epoch <= epoch && epoch < validator.exit_epoch
}

// > Check if ``validator`` is eligible to be placed into the activation queue.
#[must_use]
pub const fn is_eligible_for_activation_queue<P: Preset>(validator: &Validator) -> bool {
    validator.activation_eligibility_epoch == FAR_FUTURE_EPOCH
        && validator.effective_balance == P::MAX_EFFECTIVE_BALANCE
}

// > Check if ``validator`` is eligible for activation.
#[must_use]
pub const fn is_eligible_for_activation<P: Preset>(
    state: &BeaconState<P>,
    validator: &Validator,
) -> bool {
    // > Placement in queue is finalized
    validator.activation_eligibility_epoch <= state.finalized_checkpoint.epoch
        // > Has not yet been activated
        && validator.activation_epoch == FAR_FUTURE_EPOCH
}

// > Check if ``validator`` is slashable.
#[inline]
#[must_use]
pub const fn is_slashable_validator(validator: &Validator, epoch: Epoch) -> bool {
    !validator.slashed
        && validator.activation_epoch <= epoch
        && epoch < validator.withdrawable_epoch
}

// > Check if ``data_1`` and ``data_2`` are slashable according to Casper FFG rules.
#[inline]
#[must_use]
pub fn is_slashable_attestation_data(data_1: AttestationData, data_2: AttestationData) -> bool {
    // > Double vote
    (data_1 != data_2 && data_1.target.epoch == data_2.target.epoch)
        // > Surround vote
        || (data_1.source.epoch < data_2.source.epoch && data_2.target.epoch < data_1.target.epoch)
}

/// Checks the structure of `indexed_attestation` and passes its signature to `verifier`.
///
/// With `MultiVerifier` the signature is only checked when `finish` is called.
pub fn validate_indexed_attestation<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    indexed_attestation: &IndexedAttestation,
    mut verifier: impl Verifier,
) -> Result<()> {
    let indices = &indexed_attestation.attesting_indices;

    ensure!(!indices.is_empty(), Error::AttestationHasNoAttestingIndices);

    // > Verify indices are sorted and unique
    ensure!(
        indices.iter().tuple_windows().all(|(a, b)| a < b),
        Error::AttestingIndicesNotSortedAndUnique,
    );

    // > Verify aggregate signature
    verifier.verify(signing::indexed_attestation_signature_set(
        config,
        state,
        indexed_attestation,
    )?)
}

/// <https://github.com/ethereum/consensus-specs/blob/5e83e60a594c1d855d1396b8e25fbf43af913577/specs/phase0/validator.md#aggregation-selection>
#[must_use]
pub fn is_aggregator(committee_length: usize, selection_proof: SignatureBytes) -> bool {
    let digest = hashing::hash_768(selection_proof);

    let mut prefix = [0; size_of::<u64>()];
    prefix.copy_from_slice(&digest[..size_of::<u64>()]);
    let dividend = u64::from_le_bytes(prefix);

    let modulo = committee_length
        .try_conv::<u64>()
        .unwrap_or(u64::MAX)
        .div(TargetAggregatorsPerCommittee::U64)
        .pipe(NonZeroU64::new)
        .unwrap_or(NonZeroU64::MIN);

    dividend % modulo == 0
}
