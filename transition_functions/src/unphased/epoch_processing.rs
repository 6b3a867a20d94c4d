use anyhow::Result;
use helper_functions::{
    accessors::{get_current_epoch, get_next_epoch, get_validator_churn_limit},
    exit_queue::ExitQueue,
    misc::compute_activation_exit_epoch,
    mutators::initiate_validator_exit_with_queue,
    predicates::{
        is_active_validator, is_eligible_for_activation, is_eligible_for_activation_queue,
    },
};
use itertools::Itertools as _;
use log::debug;
use types::{config::Config, phase0::beacon_state::BeaconState, preset::Preset};

pub fn process_registry_updates<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
) -> Result<()> {
    let current_epoch = get_current_epoch(state);
    let next_epoch = get_next_epoch(state);

    // The indices collected in these do not overlap.
    let mut eligible_for_activation_queue = vec![];
    let mut ejections = vec![];
    let mut activation_queue = vec![];

    for (validator, validator_index) in state.validators.iter().zip(0..) {
        if is_eligible_for_activation_queue::<P>(validator) {
            eligible_for_activation_queue.push(validator_index);
        }

        if is_active_validator(validator, current_epoch)
            && validator.effective_balance <= config.ejection_balance
        {
            ejections.push(validator_index);
        }

        if is_eligible_for_activation(state, validator) {
            activation_queue.push((validator_index, validator.activation_eligibility_epoch));
        }
    }

    // > Process activation eligibility and ejections
    for validator_index in eligible_for_activation_queue {
        state.validator_mut(validator_index)?.activation_eligibility_epoch = next_epoch;
    }

    // Ejections only add exits, so one scan of the registry serves all of them.
    let churn_limit = get_validator_churn_limit(config, state);
    let mut exit_queue = ExitQueue::for_state(state);

    if !ejections.is_empty() {
        debug!("ejecting {} validators in epoch {current_epoch}", ejections.len());
    }

    for validator_index in ejections {
        initiate_validator_exit_with_queue(
            config,
            state,
            validator_index,
            &mut exit_queue,
            churn_limit,
        )?;
    }

    // > Queue validators eligible for activation and not yet dequeued for activation
    let activation_queue = activation_queue
        .into_iter()
        .sorted_unstable_by_key(|&(validator_index, activation_eligibility_epoch)| {
            // > Order by the sequence of activation_eligibility_epoch setting and then index
            (activation_eligibility_epoch, validator_index)
        })
        .map(|(validator_index, _)| validator_index);

    // > Dequeued validators for activation up to churn limit
    let activation_exit_epoch = compute_activation_exit_epoch::<P>(current_epoch);

    for validator_index in activation_queue.take(churn_limit.try_into()?) {
        state.validator_mut(validator_index)?.activation_epoch = activation_exit_epoch;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use types::{
        phase0::{consts::FAR_FUTURE_EPOCH, containers::Validator, primitives::Epoch},
        preset::Minimal,
    };

    use super::*;

    const SLOT: u64 = 80;
    const CURRENT_EPOCH: Epoch = 10;

    #[test]
    fn low_balance_validators_are_ejected_through_the_exit_queue() -> Result<()> {
        let config = Config::minimal();
        let mut state = factory::state_with_validators::<Minimal>(16, SLOT);

        for validator in &mut state.validators[..3] {
            validator.effective_balance = config.ejection_balance;
        }

        process_registry_updates(&config, &mut state)?;

        let exit_epochs = state.validators[..4]
            .iter()
            .map(|validator| validator.exit_epoch)
            .collect_vec();

        // The churn limit is 2, so the third ejection spills over.
        assert_eq!(exit_epochs, [15, 15, 16, FAR_FUTURE_EPOCH]);

        Ok(())
    }

    #[test]
    fn ejections_respect_exits_already_in_the_queue() -> Result<()> {
        let config = Config::mainnet();
        let mut state = factory::state_with_validators::<Minimal>(16, SLOT);

        // 4 validators already exit in epoch 20, filling the mainnet minimum churn.
        for validator in &mut state.validators[..4] {
            validator.exit_epoch = 20;
        }

        state.validators[10].effective_balance = config.ejection_balance;

        process_registry_updates(&config, &mut state)?;

        assert_eq!(state.validators[10].exit_epoch, 21);

        Ok(())
    }

    #[test]
    fn activation_queue_is_dequeued_up_to_churn_limit() -> Result<()> {
        let config = Config::minimal();
        let mut state = factory::state_with_validators::<Minimal>(16, SLOT);

        state.finalized_checkpoint.epoch = 8;

        let pending = Validator {
            activation_epoch: FAR_FUTURE_EPOCH,
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
            ..state.validators[0]
        };

        state.validators.extend([
            Validator {
                activation_eligibility_epoch: 7,
                ..pending
            },
            Validator {
                activation_eligibility_epoch: 5,
                ..pending
            },
            Validator {
                activation_eligibility_epoch: 9,
                ..pending
            },
            Validator {
                activation_eligibility_epoch: 6,
                ..pending
            },
            Validator {
                activation_eligibility_epoch: FAR_FUTURE_EPOCH,
                ..pending
            },
        ]);
        state.balances.extend([Minimal::MAX_EFFECTIVE_BALANCE; 5]);

        process_registry_updates(&config, &mut state)?;

        let activation_epochs = state.validators[16..]
            .iter()
            .map(|validator| validator.activation_epoch)
            .collect_vec();

        // Eligibility epoch 9 is not finalized yet. Of the rest, the two earliest are activated.
        assert_eq!(
            activation_epochs,
            [FAR_FUTURE_EPOCH, 15, FAR_FUTURE_EPOCH, 15, FAR_FUTURE_EPOCH],
        );
        assert_eq!(state.validators[20].activation_eligibility_epoch, CURRENT_EPOCH + 1);

        Ok(())
    }
}
