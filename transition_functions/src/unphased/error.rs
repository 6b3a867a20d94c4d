use thiserror::Error;
use types::phase0::{
    containers::AttestationData,
    primitives::{Epoch, ValidatorIndex},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("attestation data is not slashable (data_1: {data_1:?}, data_2: {data_2:?})")]
    AttesterSlashingNotSlashable {
        data_1: AttestationData,
        data_2: AttestationData,
    },
    #[error("first attestation in attester slashing is invalid")]
    AttesterSlashingInvalidAttestation1,
    #[error("second attestation in attester slashing is invalid")]
    AttesterSlashingInvalidAttestation2,
    #[error("attestations in attester slashing have no attesters in common")]
    AttesterSlashingNoCommonAttesters,
    #[error("no attesters slashed (common attesters: {common_attesters:?})")]
    AttesterSlashingNoSlashingsApplied { common_attesters: Vec<ValidatorIndex> },
    #[error("validator {index} has already initiated exit in epoch {exit_epoch}")]
    ValidatorAlreadyExited {
        index: ValidatorIndex,
        exit_epoch: Epoch,
    },
    #[error(
        "validator {index} has not been active long enough \
         (activation_epoch: {activation_epoch}, current_epoch: {current_epoch})"
    )]
    ValidatorHasNotBeenActiveLongEnough {
        index: ValidatorIndex,
        activation_epoch: Epoch,
        current_epoch: Epoch,
    },
    #[error("validator {index} is not active in epoch {current_epoch}")]
    ValidatorNotActive {
        index: ValidatorIndex,
        current_epoch: Epoch,
    },
    #[error("voluntary exit is not valid until epoch {epoch} (current_epoch: {current_epoch})")]
    VoluntaryExitNotYetValid { epoch: Epoch, current_epoch: Epoch },
}
