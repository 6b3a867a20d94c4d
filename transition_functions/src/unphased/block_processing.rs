use anyhow::{ensure, Context as _, Result};
use helper_functions::{
    accessors::{get_current_epoch, slashable_indices},
    mutators::{initiate_validator_exit, slash_validator},
    predicates::{
        is_active_validator, is_slashable_attestation_data, is_slashable_validator,
        validate_indexed_attestation,
    },
    signing::SignForSingleFork as _,
    verifier::{SingleVerifier, Verifier},
};
use itertools::Itertools as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::FAR_FUTURE_EPOCH,
        containers::{AttesterSlashing, SignedVoluntaryExit},
        primitives::ValidatorIndex,
    },
    preset::Preset,
};

use crate::unphased::Error;

/// Applies `attester_slashing` to `state`.
///
/// Attesters present in both attestations are slashed in ascending index order.
/// The state is left untouched if validation fails.
pub fn process_attester_slashing<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    attester_slashing: &AttesterSlashing,
    verifier: impl Verifier,
) -> Result<()> {
    let slashable_indices =
        validate_attester_slashing_with_verifier(config, state, attester_slashing, verifier)?;

    for validator_index in slashable_indices {
        slash_validator(config, state, validator_index, None)?;
    }

    Ok(())
}

pub fn validate_attester_slashing_with_verifier<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    attester_slashing: &AttesterSlashing,
    mut verifier: impl Verifier,
) -> Result<Vec<ValidatorIndex>> {
    let attestation_1 = &attester_slashing.attestation_1;
    let attestation_2 = &attester_slashing.attestation_2;

    let data_1 = attestation_1.data;
    let data_2 = attestation_2.data;

    ensure!(
        is_slashable_attestation_data(data_1, data_2),
        Error::AttesterSlashingNotSlashable { data_1, data_2 },
    );

    verifier.reserve(2);

    validate_indexed_attestation(config, state, attestation_1, &mut verifier)
        .context(Error::AttesterSlashingInvalidAttestation1)?;

    validate_indexed_attestation(config, state, attestation_2, &mut verifier)
        .context(Error::AttesterSlashingInvalidAttestation2)?;

    let common_attesters = slashable_indices(attester_slashing).collect_vec();

    ensure!(
        !common_attesters.is_empty(),
        Error::AttesterSlashingNoCommonAttesters,
    );

    let current_epoch = get_current_epoch(state);
    let mut slashable_indices = Vec::with_capacity(common_attesters.len());

    for attester_index in common_attesters.iter().copied() {
        if is_slashable_validator(state.validator(attester_index)?, current_epoch) {
            slashable_indices.push(attester_index);
        }
    }

    ensure!(
        !slashable_indices.is_empty(),
        Error::AttesterSlashingNoSlashingsApplied { common_attesters },
    );

    Ok(slashable_indices)
}

pub fn process_voluntary_exit<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    signed_voluntary_exit: SignedVoluntaryExit,
    verifier: impl Verifier,
) -> Result<()> {
    validate_voluntary_exit_with_verifier(config, state, signed_voluntary_exit, verifier)?;

    // > Initiate exit
    initiate_validator_exit(config, state, signed_voluntary_exit.message.validator_index)
}

pub fn validate_voluntary_exit<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    signed_voluntary_exit: SignedVoluntaryExit,
    verifier: SingleVerifier<'_>,
) -> Result<()> {
    validate_voluntary_exit_with_verifier(config, state, signed_voluntary_exit, verifier)
}

fn validate_voluntary_exit_with_verifier<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    signed_voluntary_exit: SignedVoluntaryExit,
    verifier: impl Verifier,
) -> Result<()> {
    let voluntary_exit = signed_voluntary_exit.message;
    let index = voluntary_exit.validator_index;
    let validator = state.validator(index)?;
    let current_epoch = get_current_epoch(state);

    // > Verify the validator is active
    ensure!(
        is_active_validator(validator, current_epoch),
        Error::ValidatorNotActive {
            index,
            current_epoch,
        },
    );

    // > Verify exit has not been initiated
    ensure!(
        validator.exit_epoch == FAR_FUTURE_EPOCH,
        Error::ValidatorAlreadyExited {
            index,
            exit_epoch: validator.exit_epoch,
        },
    );

    // > Exits must specify an epoch when they become valid; they are not valid before then
    ensure!(
        current_epoch >= voluntary_exit.epoch,
        Error::VoluntaryExitNotYetValid {
            epoch: voluntary_exit.epoch,
            current_epoch,
        },
    );

    // > Verify the validator has been active long enough
    ensure!(
        current_epoch >= validator.activation_epoch.saturating_add(config.shard_committee_period),
        Error::ValidatorHasNotBeenActiveLongEnough {
            index,
            activation_epoch: validator.activation_epoch,
            current_epoch,
        },
    );

    // > Verify signature
    voluntary_exit.verify(
        config,
        state,
        signed_voluntary_exit.signature,
        validator.pubkey,
        verifier,
    )
}
