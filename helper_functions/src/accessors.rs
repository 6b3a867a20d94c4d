use core::ops::Div as _;

use anyhow::{bail, ensure, Result};
use bitvec::slice::BitSlice;
use hashing::Hasher;
use itertools::{EitherOrBoth, Itertools as _};
use typenum::Unsigned as _;
use types::{
    config::Config,
    nonstandard::RelativeEpoch,
    phase0::{
        beacon_state::BeaconState,
        consts::{DOMAIN_BEACON_ATTESTER, DOMAIN_BEACON_PROPOSER},
        containers::{Attestation, AttesterSlashing, IndexedAttestation},
        primitives::{
            CommitteeIndex, Domain, DomainType, Epoch, PublicKeyBytes, Slot, SubnetId,
            ValidatorIndex, H256,
        },
    },
    preset::Preset,
};

use crate::{error::Error, misc, predicates};

#[must_use]
pub fn get_current_epoch<P: Preset>(state: &BeaconState<P>) -> Epoch {
    misc::compute_epoch_at_slot::<P>(state.slot)
}

#[must_use]
pub fn get_next_epoch<P: Preset>(state: &BeaconState<P>) -> Epoch {
    get_current_epoch(state) + 1
}

pub fn relative_epoch<P: Preset>(state: &BeaconState<P>, epoch: Epoch) -> Result<RelativeEpoch> {
    let state_slot = state.slot;

    match get_next_epoch(state).checked_sub(epoch) {
        None => bail!(Error::EpochAfterNext { epoch, state_slot }),
        Some(0) => Ok(RelativeEpoch::Next),
        Some(1) => Ok(RelativeEpoch::Current),
        Some(2) => Ok(RelativeEpoch::Previous),
        Some(_) => bail!(Error::EpochBeforePrevious { epoch, state_slot }),
    }
}

#[must_use]
pub fn get_randao_mix<P: Preset>(state: &BeaconState<P>, epoch: Epoch) -> H256 {
    state.randao_mix(epoch)
}

pub fn public_key<P: Preset>(
    state: &BeaconState<P>,
    validator_index: ValidatorIndex,
) -> Result<PublicKeyBytes> {
    Ok(state.validator(validator_index)?.pubkey)
}

pub fn get_active_validator_indices<P: Preset>(
    state: &BeaconState<P>,
    epoch: Epoch,
) -> impl Iterator<Item = ValidatorIndex> + '_ {
    (0..)
        .zip(&state.validators)
        .filter(move |(_, validator)| predicates::is_active_validator(validator, epoch))
        .map(|(index, _)| index)
}

#[must_use]
pub fn active_validator_count<P: Preset>(state: &BeaconState<P>, epoch: Epoch) -> u64 {
    get_active_validator_indices(state, epoch).count() as u64
}

/// The churn limit for the current epoch of `state`.
#[must_use]
pub fn get_validator_churn_limit<P: Preset>(config: &Config, state: &BeaconState<P>) -> u64 {
    let active_validator_count = active_validator_count(state, get_current_epoch(state));
    misc::compute_churn_limit(config, active_validator_count)
}

#[must_use]
pub fn get_seed<P: Preset>(state: &BeaconState<P>, epoch: Epoch, domain_type: DomainType) -> H256 {
    let mix = get_randao_mix(
        state,
        epoch + P::EpochsPerHistoricalVector::U64 - P::MIN_SEED_LOOKAHEAD - 1,
    );

    Hasher::default()
        .bytes(domain_type)
        .u64(epoch)
        .h256(mix)
        .finish()
}

#[must_use]
pub fn get_committee_count_per_slot<P: Preset>(state: &BeaconState<P>, epoch: Epoch) -> u64 {
    misc::committee_count_from_active_validator_count::<P>(active_validator_count(state, epoch))
}

pub fn get_subnet_for_attestation<P: Preset>(
    state: &BeaconState<P>,
    slot: Slot,
    committee_index: CommitteeIndex,
) -> Result<SubnetId> {
    let epoch = misc::compute_epoch_at_slot::<P>(slot);
    let committees_per_slot = get_committee_count_per_slot(state, epoch);

    misc::compute_subnet_for_attestation::<P>(committees_per_slot, slot, committee_index)
}

/// Validator indices of the committee assigned to `committee_index` at `slot`.
///
/// `slot` must be in the previous, current or next epoch relative to `state`.
pub fn beacon_committee<P: Preset>(
    state: &BeaconState<P>,
    slot: Slot,
    committee_index: CommitteeIndex,
) -> Result<Vec<ValidatorIndex>> {
    let epoch = misc::compute_epoch_at_slot::<P>(slot);

    relative_epoch(state, epoch)?;

    let committees_per_slot = get_committee_count_per_slot(state, epoch);

    ensure!(
        committee_index < committees_per_slot,
        Error::CommitteeIndexOutOfBounds {
            index: committee_index,
            committees_per_slot,
        },
    );

    let mut indices = get_active_validator_indices(state, epoch).collect_vec();

    shuffling::shuffle_slice::<P, _>(
        &mut indices,
        get_seed(state, epoch, DOMAIN_BEACON_ATTESTER),
    );

    let validator_count = ValidatorIndex::try_from(indices.len())?;
    let committees_in_epoch = committees_per_slot * P::SlotsPerEpoch::U64;
    let slots_since_epoch_start = misc::slots_since_epoch_start::<P>(slot);
    let index_in_epoch = slots_since_epoch_start * committees_per_slot + committee_index;
    let start = usize::try_from((validator_count * index_in_epoch).div(committees_in_epoch))?;
    let end = usize::try_from((validator_count * (index_in_epoch + 1)).div(committees_in_epoch))?;

    indices.truncate(end);
    indices.drain(..start);

    Ok(indices)
}

pub fn get_beacon_proposer_index<P: Preset>(state: &BeaconState<P>) -> Result<ValidatorIndex> {
    let epoch = get_current_epoch(state);
    let seed = hashing::hash_256_64(get_seed(state, epoch, DOMAIN_BEACON_PROPOSER), state.slot);
    let indices = get_active_validator_indices(state, epoch).collect_vec();

    misc::compute_proposer_index(state, &indices, seed)
}

#[must_use]
pub fn get_domain<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    domain_type: DomainType,
) -> Domain {
    misc::compute_domain(
        config,
        domain_type,
        Some(state.fork_version),
        Some(state.genesis_validators_root),
    )
}

/// Members of `committee` whose bit is set in `aggregation_bits`, in committee order.
pub fn attesting_indices_for_committee(
    committee: &[ValidatorIndex],
    aggregation_bits: &BitSlice<u8>,
) -> Result<Vec<ValidatorIndex>> {
    ensure!(
        committee.len() == aggregation_bits.len(),
        Error::CommitteeLengthMismatch {
            aggregation_bitfield_length: aggregation_bits.len(),
            committee_length: committee.len(),
        },
    );

    Ok(aggregation_bits
        .iter_ones()
        .map(|position| committee[position])
        .collect())
}

/// Builds an [`IndexedAttestation`] from a committee that has already been computed.
pub fn indexed_attestation_from_committee(
    committee: &[ValidatorIndex],
    attestation: &Attestation,
) -> Result<IndexedAttestation> {
    let mut attesting_indices =
        attesting_indices_for_committee(committee, &attestation.aggregation_bits)?;

    attesting_indices.sort_unstable();

    Ok(IndexedAttestation {
        attesting_indices,
        data: attestation.data,
        signature: attestation.signature,
    })
}

pub fn get_indexed_attestation<P: Preset>(
    state: &BeaconState<P>,
    attestation: &Attestation,
) -> Result<IndexedAttestation> {
    let data = attestation.data;
    let committee = beacon_committee(state, data.slot, data.index)?;
    indexed_attestation_from_committee(&committee, attestation)
}

/// Validators present in both attestations of `attester_slashing`, in ascending order.
///
/// Both index lists must be sorted, which [`predicates::validate_indexed_attestation`] ensures.
pub fn slashable_indices(
    attester_slashing: &AttesterSlashing,
) -> impl Iterator<Item = ValidatorIndex> + '_ {
    let attesting_indices_1 = attester_slashing
        .attestation_1
        .attesting_indices
        .iter()
        .copied();

    let attesting_indices_2 = attester_slashing
        .attestation_2
        .attesting_indices
        .iter()
        .copied();

    attesting_indices_1
        .merge_join_by(attesting_indices_2, Ord::cmp)
        .filter_map(|either_or_both| match either_or_both {
            EitherOrBoth::Both(validator_index, _) => Some(validator_index),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use bitvec::{bitvec, order::Lsb0};
    use types::{
        phase0::{consts::FAR_FUTURE_EPOCH, containers::Validator},
        preset::Minimal,
    };

    use super::*;

    fn state_with_active_validators(count: usize, slot: Slot) -> BeaconState<Minimal> {
        let validator = Validator {
            effective_balance: Minimal::MAX_EFFECTIVE_BALANCE,
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
            ..Validator::default()
        };

        BeaconState {
            slot,
            validators: vec![validator; count],
            balances: vec![Minimal::MAX_EFFECTIVE_BALANCE; count],
            ..BeaconState::default()
        }
    }

    #[test]
    fn relative_epoch_at_genesis_has_no_distinct_previous_epoch() {
        let state = state_with_active_validators(1, 0);

        assert_eq!(relative_epoch(&state, 0).ok(), Some(RelativeEpoch::Current));
        assert_eq!(relative_epoch(&state, 1).ok(), Some(RelativeEpoch::Next));
        assert!(relative_epoch(&state, 2).is_err());
    }

    #[test]
    fn relative_epoch_later_in_chain() {
        let state = state_with_active_validators(1, 80);

        assert_eq!(relative_epoch(&state, 9).ok(), Some(RelativeEpoch::Previous));
        assert_eq!(relative_epoch(&state, 10).ok(), Some(RelativeEpoch::Current));
        assert_eq!(relative_epoch(&state, 11).ok(), Some(RelativeEpoch::Next));
        assert!(relative_epoch(&state, 8).is_err());
        assert!(relative_epoch(&state, 12).is_err());
    }

    #[test]
    fn committees_of_an_epoch_partition_active_validators() -> Result<()> {
        let state = state_with_active_validators(100, 0);
        let committees_per_slot = get_committee_count_per_slot(&state, 0);

        let mut members = (0..8)
            .cartesian_product(0..committees_per_slot)
            .map(|(slot, index)| beacon_committee(&state, slot, index))
            .flatten_ok()
            .collect::<Result<Vec<_>>>()?;

        members.sort_unstable();

        assert_eq!(members, (0..100).collect_vec());

        Ok(())
    }

    #[test]
    fn beacon_committee_rejects_index_out_of_bounds() {
        let state = state_with_active_validators(16, 0);

        assert_eq!(get_committee_count_per_slot(&state, 0), 1);
        assert!(beacon_committee(&state, 0, 1).is_err());
    }

    #[test]
    fn attesting_indices_follow_set_bits() -> Result<()> {
        let committee = [10, 20, 30, 40];
        let bits = bitvec![u8, Lsb0; 0, 1, 0, 1];

        assert_eq!(attesting_indices_for_committee(&committee, &bits)?, [20, 40]);

        Ok(())
    }

    #[test]
    fn attesting_indices_require_matching_length() {
        let committee = [10, 20, 30];
        let bits = bitvec![u8, Lsb0; 0, 1];

        assert!(attesting_indices_for_committee(&committee, &bits).is_err());
    }

    #[test]
    fn indexed_attestation_indices_are_sorted() -> Result<()> {
        let attestation = Attestation {
            aggregation_bits: bitvec![u8, Lsb0; 1, 1, 1],
            ..Attestation::default()
        };

        let indexed_attestation = indexed_attestation_from_committee(&[9, 3, 7], &attestation)?;

        assert_eq!(indexed_attestation.attesting_indices, [3, 7, 9]);

        Ok(())
    }

    #[test]
    fn slashable_indices_are_the_intersection() {
        let attester_slashing = AttesterSlashing {
            attestation_1: IndexedAttestation {
                attesting_indices: vec![1, 3, 5, 7, 9],
                ..IndexedAttestation::default()
            },
            attestation_2: IndexedAttestation {
                attesting_indices: vec![2, 3, 7, 8, 9],
                ..IndexedAttestation::default()
            },
        };

        assert_eq!(slashable_indices(&attester_slashing).collect_vec(), [3, 7, 9]);
    }

    #[test]
    fn proposer_is_an_active_validator() -> Result<()> {
        let mut state = state_with_active_validators(8, 3);
        state.validators[2].exit_epoch = 0;

        let proposer_index = get_beacon_proposer_index(&state)?;

        assert!(proposer_index < 8);
        assert_ne!(proposer_index, 2);

        Ok(())
    }
}
