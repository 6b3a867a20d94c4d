use core::cmp::Ordering;

use anyhow::Result;
use types::{
    phase0::{
        beacon_state::BeaconState,
        consts::FAR_FUTURE_EPOCH,
        primitives::Epoch,
    },
    preset::Preset,
};

use crate::{accessors, error::Error, misc};

/// The tail of the exit queue: the latest exit epoch in use and how many validators exit in it.
///
/// Building one scans the whole registry.
/// Processing that initiates many exits in a row should build it once and call
/// [`ExitQueue::record_exit`] after every exit instead of rescanning.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ExitQueue {
    epoch: Epoch,
    churn: u64,
}

impl ExitQueue {
    /// `activation_exit_epoch` is the earliest epoch a newly initiated exit may take effect in.
    #[must_use]
    pub fn new(activation_exit_epoch: Epoch, exit_epochs: impl IntoIterator<Item = Epoch>) -> Self {
        let mut exit_queue = Self {
            epoch: activation_exit_epoch,
            churn: 0,
        };

        for exit_epoch in exit_epochs {
            exit_queue.record_exit(exit_epoch);
        }

        exit_queue
    }

    #[must_use]
    pub fn for_state<P: Preset>(state: &BeaconState<P>) -> Self {
        let current_epoch = accessors::get_current_epoch(state);
        let activation_exit_epoch = misc::compute_activation_exit_epoch::<P>(current_epoch);
        let exit_epochs = state.validators.iter().map(|validator| validator.exit_epoch);

        Self::new(activation_exit_epoch, exit_epochs)
    }

    #[must_use]
    pub const fn epoch(self) -> Epoch {
        self.epoch
    }

    #[must_use]
    pub const fn churn(self) -> u64 {
        self.churn
    }

    /// The exit epoch the next exiting validator will be assigned.
    ///
    /// Spills over to the following epoch once the tail epoch has `churn_limit` exits.
    pub fn next_exit_epoch(self, churn_limit: u64) -> Result<Epoch> {
        if self.churn < churn_limit {
            return Ok(self.epoch);
        }

        // `FAR_FUTURE_EPOCH` means "not exiting" and cannot be used as an exit epoch.
        self.epoch
            .checked_add(1)
            .filter(|epoch| *epoch != FAR_FUTURE_EPOCH)
            .ok_or_else(|| Error::EpochOverflow.into())
    }

    pub fn record_exit(&mut self, exit_epoch: Epoch) {
        if exit_epoch == FAR_FUTURE_EPOCH {
            return;
        }

        match exit_epoch.cmp(&self.epoch) {
            Ordering::Less => {}
            Ordering::Equal => self.churn += 1,
            Ordering::Greater => {
                self.epoch = exit_epoch;
                self.churn = 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;
    use test_case::test_case;
    use types::config::Config;

    use super::*;

    #[test]
    fn empty_queue_starts_at_activation_exit_epoch() -> Result<()> {
        let exit_queue = ExitQueue::new(15, []);

        assert_eq!(exit_queue.churn(), 0);
        assert_eq!(exit_queue.next_exit_epoch(4)?, 15);

        Ok(())
    }

    #[test]
    fn far_future_and_past_exits_are_ignored() {
        let exit_queue = ExitQueue::new(15, [FAR_FUTURE_EPOCH, 3, 14, FAR_FUTURE_EPOCH]);

        assert_eq!(exit_queue, ExitQueue::new(15, []));
    }

    #[test_case(&[20, 20, 20],     4 => 20; "room left in the latest epoch")]
    #[test_case(&[20, 20, 20, 20], 4 => 21; "latest epoch full")]
    #[test_case(&[15, 15, 15, 15], 4 => 16; "activation exit epoch full")]
    #[test_case(&[16, 20, 18],     4 => 20; "latest epoch wins regardless of order")]
    fn next_exit_epoch(exit_epochs: &[Epoch], churn_limit: u64) -> Epoch {
        ExitQueue::new(15, exit_epochs.iter().copied())
            .next_exit_epoch(churn_limit)
            .expect("no overflow below FAR_FUTURE_EPOCH")
    }

    #[test]
    fn recording_exits_matches_rescanning() -> Result<()> {
        let mut exit_epochs = vec![16, 17, 17];
        let mut exit_queue = ExitQueue::new(15, exit_epochs.iter().copied());

        for _ in 0..10 {
            let exit_epoch = exit_queue.next_exit_epoch(2)?;
            exit_queue.record_exit(exit_epoch);
            exit_epochs.push(exit_epoch);

            assert_eq!(exit_queue, ExitQueue::new(15, exit_epochs.iter().copied()));
        }

        assert_eq!(exit_queue.epoch(), 22);

        Ok(())
    }

    #[test]
    fn next_exit_epoch_overflow_is_an_error() {
        let exit_queue = ExitQueue::new(FAR_FUTURE_EPOCH - 1, [FAR_FUTURE_EPOCH - 1]);

        let error = exit_queue
            .next_exit_epoch(1)
            .expect_err("FAR_FUTURE_EPOCH is not a valid exit epoch");

        assert!(matches!(error.downcast_ref(), Some(Error::EpochOverflow)));
        assert_eq!(
            exit_queue.next_exit_epoch(2).ok(),
            Some(FAR_FUTURE_EPOCH - 1),
        );
    }

    #[test]
    fn spillover_just_below_far_future_epoch_is_allowed() -> Result<()> {
        let exit_queue = ExitQueue::new(FAR_FUTURE_EPOCH - 2, [FAR_FUTURE_EPOCH - 2]);

        assert_eq!(exit_queue.next_exit_epoch(1)?, FAR_FUTURE_EPOCH - 1);

        Ok(())
    }

    #[quickcheck]
    fn churn_limit_is_monotonic(smaller: u64, larger: u64) -> bool {
        let config = Config::mainnet();
        let (smaller, larger) = (smaller.min(larger), smaller.max(larger));

        misc::compute_churn_limit(&config, smaller) <= misc::compute_churn_limit(&config, larger)
    }

    #[quickcheck]
    fn churn_limit_is_at_least_the_minimum(active_validator_count: u64) -> bool {
        let config = Config::minimal();

        let churn_limit = misc::compute_churn_limit(&config, active_validator_count);

        churn_limit >= config.min_per_epoch_churn_limit
    }
}
