use core::{num::NonZeroU64, ops::Div as _};

use anyhow::{ensure, Result};
use arithmetic::U64Ext as _;
use tap::{Pipe as _, TryConv as _};
use typenum::Unsigned as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::AttestationSubnetCount,
        primitives::{
            CommitteeIndex, Domain, DomainType, Epoch, Slot, SubnetId, ValidatorIndex, Version,
            H256,
        },
    },
    preset::Preset,
};

use crate::error::Error;

#[must_use]
pub fn compute_epoch_at_slot<P: Preset>(slot: Slot) -> Epoch {
    slot.div_typenum::<P::SlotsPerEpoch>()
}

#[must_use]
pub const fn compute_start_slot_at_epoch<P: Preset>(epoch: Epoch) -> Slot {
    epoch.saturating_mul(P::SlotsPerEpoch::U64)
}

#[must_use]
pub fn is_epoch_start<P: Preset>(slot: Slot) -> bool {
    slots_since_epoch_start::<P>(slot) == 0
}

#[must_use]
pub fn slots_since_epoch_start<P: Preset>(slot: Slot) -> u64 {
    slot - compute_start_slot_at_epoch::<P>(compute_epoch_at_slot::<P>(slot))
}

// > Return the epoch during which validator activations and exits initiated in ``epoch`` take effect.
#[must_use]
pub const fn compute_activation_exit_epoch<P: Preset>(epoch: Epoch) -> Epoch {
    epoch.saturating_add(1 + P::MAX_SEED_LOOKAHEAD)
}

/// Maximum number of validators allowed to exit (or activate) per epoch.
///
/// Defined as `max(MIN_PER_EPOCH_CHURN_LIMIT, active_validator_count / CHURN_LIMIT_QUOTIENT)`.
/// The result is monotonically non-decreasing in `active_validator_count`.
#[must_use]
pub fn compute_churn_limit(config: &Config, active_validator_count: u64) -> u64 {
    active_validator_count
        .div(config.churn_limit_quotient)
        .max(config.min_per_epoch_churn_limit)
}

#[must_use]
pub fn committee_count_from_active_validator_count<P: Preset>(active_validator_count: u64) -> u64 {
    active_validator_count
        .div_typenum::<P::SlotsPerEpoch>()
        .div(P::TARGET_COMMITTEE_SIZE)
        .clamp(1, P::MAX_COMMITTEES_PER_SLOT.get())
}

fn compute_fork_data_root(current_version: Version, genesis_validators_root: H256) -> H256 {
    let mut padded_version = H256::zero();
    padded_version[..Version::len_bytes()].copy_from_slice(current_version.as_bytes());
    hashing::hash_256_256(padded_version, genesis_validators_root)
}

#[must_use]
pub fn compute_domain(
    config: &Config,
    domain_type: DomainType,
    fork_version: Option<Version>,
    genesis_validators_root: Option<H256>,
) -> Domain {
    let fork_version = fork_version.unwrap_or(config.genesis_fork_version);
    let genesis_validators_root = genesis_validators_root.unwrap_or_else(H256::zero);
    let fork_data_root = compute_fork_data_root(fork_version, genesis_validators_root);

    let mut domain = Domain::zero();
    domain[..DomainType::len_bytes()].copy_from_slice(domain_type.as_bytes());
    domain[DomainType::len_bytes()..].copy_from_slice(&fork_data_root[..28]);
    domain
}

#[must_use]
pub fn compute_signing_root(object_root: H256, domain: Domain) -> H256 {
    hashing::hash_256_256(object_root, domain)
}

pub(crate) fn compute_shuffled_index<P: Preset>(
    index: ValidatorIndex,
    index_count: NonZeroU64,
    seed: H256,
) -> ValidatorIndex {
    shuffling::shuffle_single::<P>(index, index_count, seed)
}

pub(crate) fn compute_proposer_index<P: Preset>(
    state: &BeaconState<P>,
    indices: &[ValidatorIndex],
    seed: H256,
) -> Result<ValidatorIndex> {
    let total = indices
        .len()
        .try_conv::<u64>()?
        .pipe(NonZeroU64::new)
        .ok_or(Error::NoActiveValidators)?;

    let max_random_byte = u64::from(u8::MAX);

    let bytes_per_hash = H256::len_bytes() as u64;

    for quotient in 0..u64::MAX / bytes_per_hash {
        let random_bytes = hashing::hash_256_64(seed, quotient);

        for (offset, random_byte) in (0..).zip(random_bytes.as_bytes().iter().copied()) {
            let attempt = quotient * bytes_per_hash + offset;

            let shuffled_index_of_index =
                compute_shuffled_index::<P>(attempt % total, total, seed).try_conv::<usize>()?;

            let candidate_index = indices
                .get(shuffled_index_of_index)
                .copied()
                .ok_or(Error::FailedToSelectProposer)?;

            let effective_balance = state.validator(candidate_index)?.effective_balance;

            if effective_balance * max_random_byte
                >= P::MAX_EFFECTIVE_BALANCE * u64::from(random_byte)
            {
                return Ok(candidate_index);
            }
        }
    }

    Err(Error::FailedToSelectProposer.into())
}

/// [`compute_subnet_for_attestation`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/validator.md#broadcast-attestation)
pub fn compute_subnet_for_attestation<P: Preset>(
    committees_per_slot: u64,
    slot: Slot,
    committee_index: CommitteeIndex,
) -> Result<SubnetId> {
    ensure!(
        committee_index < committees_per_slot,
        Error::CommitteeIndexOutOfBounds {
            index: committee_index,
            committees_per_slot,
        },
    );

    let slots_since_epoch_start = slots_since_epoch_start::<P>(slot);

    committees_per_slot
        .checked_mul(slots_since_epoch_start)
        .and_then(|committees| committees.checked_add(committee_index))
        .map(u64::mod_typenum::<AttestationSubnetCount>)
        .ok_or_else(|| Error::SubnetIdOverflow.into())
}
