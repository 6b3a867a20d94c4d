use core::marker::PhantomData;

use anyhow::Result;
use arithmetic::U64Ext as _;
use typenum::{NonZero, Unsigned};

use crate::{
    error::Error,
    phase0::{
        containers::{Checkpoint, Validator},
        primitives::{Epoch, Gwei, Slot, UnixSeconds, ValidatorIndex, Version, H256},
    },
    preset::Preset,
};

/// The subset of `BeaconState` needed by exit processing, slashing and gossip validation.
///
/// Validators and balances are parallel arenas indexed by [`ValidatorIndex`].
/// Snapshots are shared as `Arc<BeaconState<P>>` and mutated copy-on-write.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BeaconState<P: Preset> {
    pub genesis_time: UnixSeconds,
    pub genesis_validators_root: H256,
    pub slot: Slot,
    pub fork_version: Version,
    pub validators: Vec<Validator>,
    pub balances: Vec<Gwei>,
    pub randao_mixes: Box<[H256]>,
    pub slashings: Box<[Gwei]>,
    pub finalized_checkpoint: Checkpoint,
    pub phantom: PhantomData<P>,
}

impl<P: Preset> Default for BeaconState<P> {
    fn default() -> Self {
        Self {
            genesis_time: 0,
            genesis_validators_root: H256::zero(),
            slot: 0,
            fork_version: Version::zero(),
            validators: vec![],
            balances: vec![],
            randao_mixes: vec![H256::zero(); P::EpochsPerHistoricalVector::USIZE].into(),
            slashings: vec![0; P::EpochsPerSlashingsVector::USIZE].into(),
            finalized_checkpoint: Checkpoint::default(),
            phantom: PhantomData,
        }
    }
}

impl<P: Preset> BeaconState<P> {
    pub fn validator(&self, validator_index: ValidatorIndex) -> Result<&Validator> {
        usize::try_from(validator_index)
            .ok()
            .and_then(|index| self.validators.get(index))
            .ok_or_else(|| Error::ValidatorIndexOutOfBounds { validator_index }.into())
    }

    pub fn validator_mut(&mut self, validator_index: ValidatorIndex) -> Result<&mut Validator> {
        usize::try_from(validator_index)
            .ok()
            .and_then(|index| self.validators.get_mut(index))
            .ok_or_else(|| Error::ValidatorIndexOutOfBounds { validator_index }.into())
    }

    pub fn balance_mut(&mut self, validator_index: ValidatorIndex) -> Result<&mut Gwei> {
        usize::try_from(validator_index)
            .ok()
            .and_then(|index| self.balances.get_mut(index))
            .ok_or_else(|| Error::ValidatorIndexOutOfBounds { validator_index }.into())
    }

    #[must_use]
    pub fn validator_count(&self) -> u64 {
        self.validators.len() as u64
    }

    #[must_use]
    pub fn randao_mix(&self, epoch: Epoch) -> H256 {
        self.randao_mixes[Self::position::<P::EpochsPerHistoricalVector>(epoch)]
    }

    #[must_use]
    pub fn slashings_at(&self, epoch: Epoch) -> Gwei {
        self.slashings[Self::position::<P::EpochsPerSlashingsVector>(epoch)]
    }

    pub fn slashings_at_mut(&mut self, epoch: Epoch) -> &mut Gwei {
        &mut self.slashings[Self::position::<P::EpochsPerSlashingsVector>(epoch)]
    }

    fn position<N: Unsigned + NonZero>(epoch: Epoch) -> usize {
        epoch
            .mod_typenum::<N>()
            .try_into()
            .expect("remainder of division by a vector length fits in usize")
    }
}

#[cfg(test)]
mod tests {
    use crate::preset::Minimal;

    use super::*;

    #[test]
    fn out_of_bounds_validator_is_an_error() {
        let state = BeaconState::<Minimal> {
            validators: vec![Validator::default()],
            balances: vec![0],
            ..BeaconState::default()
        };

        assert!(state.validator(0).is_ok());
        assert!(state.validator(1).is_err());
        assert!(state.validator(u64::MAX).is_err());
    }

    #[test]
    fn vectors_wrap_around() {
        let mut state = BeaconState::<Minimal>::default();
        state.randao_mixes[1] = H256::repeat_byte(1);
        *state.slashings_at_mut(65) += 5;

        assert_eq!(state.randao_mix(65), H256::repeat_byte(1));
        assert_eq!(state.slashings_at(1), 5);
    }
}
