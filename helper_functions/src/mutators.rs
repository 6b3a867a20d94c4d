use anyhow::Result;
use typenum::Unsigned as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::FAR_FUTURE_EPOCH,
        primitives::{Gwei, ValidatorIndex},
    },
    preset::Preset,
};

use crate::{accessors, error::Error, exit_queue::ExitQueue};

#[inline]
pub fn increase_balance(balance: &mut Gwei, delta: Gwei) {
    *balance += delta;
}

#[inline]
pub fn decrease_balance(balance: &mut Gwei, delta: Gwei) {
    *balance = balance.saturating_sub(delta);
}

pub fn initiate_validator_exit<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    validator_index: ValidatorIndex,
) -> Result<()> {
    // > Return if validator already initiated exit
    if state.validator(validator_index)?.exit_epoch != FAR_FUTURE_EPOCH {
        return Ok(());
    }

    // > Compute exit queue epoch
    let mut exit_queue = ExitQueue::for_state(state);
    let churn_limit = accessors::get_validator_churn_limit(config, state);

    initiate_validator_exit_with_queue(config, state, validator_index, &mut exit_queue, churn_limit)
}

/// Like [`initiate_validator_exit`] but reuses an [`ExitQueue`] built by the caller.
///
/// `exit_queue` is updated with the new exit, so it stays valid for subsequent calls
/// within the same epoch.
pub fn initiate_validator_exit_with_queue<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    validator_index: ValidatorIndex,
    exit_queue: &mut ExitQueue,
    churn_limit: u64,
) -> Result<()> {
    let validator = state.validator_mut(validator_index)?;

    // > Return if validator already initiated exit
    if validator.exit_epoch != FAR_FUTURE_EPOCH {
        return Ok(());
    }

    let exit_epoch = exit_queue.next_exit_epoch(churn_limit)?;

    let withdrawable_epoch = exit_epoch
        .checked_add(config.min_validator_withdrawability_delay)
        .ok_or(Error::EpochOverflow)?;

    // > Set validator exit epoch and withdrawable epoch
    validator.exit_epoch = exit_epoch;
    validator.withdrawable_epoch = withdrawable_epoch;

    exit_queue.record_exit(exit_epoch);

    Ok(())
}

// > Slash the validator with index ``slashed_index``.
pub fn slash_validator<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    slashed_index: ValidatorIndex,
    whistleblower_index: Option<ValidatorIndex>,
) -> Result<()> {
    let epoch = accessors::get_current_epoch(state);

    initiate_validator_exit(config, state, slashed_index)?;

    let validator = state.validator_mut(slashed_index)?;

    validator.slashed = true;
    validator.withdrawable_epoch = validator
        .withdrawable_epoch
        .max(epoch.saturating_add(P::EpochsPerSlashingsVector::U64));

    let effective_balance = validator.effective_balance;

    *state.slashings_at_mut(epoch) += effective_balance;

    decrease_balance(
        state.balance_mut(slashed_index)?,
        effective_balance / P::MIN_SLASHING_PENALTY_QUOTIENT,
    );

    // > Apply proposer and whistleblower rewards
    let proposer_index = accessors::get_beacon_proposer_index(state)?;
    let whistleblower_index = whistleblower_index.unwrap_or(proposer_index);
    let whistleblower_reward = effective_balance / P::WHISTLEBLOWER_REWARD_QUOTIENT;
    let proposer_reward = whistleblower_reward / P::PROPOSER_REWARD_QUOTIENT;

    increase_balance(state.balance_mut(proposer_index)?, proposer_reward);

    increase_balance(
        state.balance_mut(whistleblower_index)?,
        whistleblower_reward - proposer_reward,
    );

    Ok(())
}
