use core::{fmt::Debug, hash::Hash, num::NonZeroU64};

use nonzero_ext::nonzero;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use strum::{Display, EnumString};
use typenum::{NonZero, Unsigned, U2048, U32, U64, U65536, U8, U8192};

use crate::{config::Config, phase0::primitives::Gwei};

/// Compile-time configuration variables.
///
/// See [presets in `consensus-specs`](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/presets).
pub trait Preset: Copy + Eq + Ord + Hash + Default + Debug + Send + Sync + 'static {
    type EpochsPerHistoricalVector: Unsigned + NonZero + Debug + Send + Sync;
    type EpochsPerSlashingsVector: Unsigned + NonZero + Debug + Send + Sync;
    type MaxValidatorsPerCommittee: Unsigned + NonZero + Debug + Send + Sync;
    type SlotsPerEpoch: Unsigned + NonZero + Debug + Send + Sync;

    // Meta
    const NAME: PresetName;

    const EFFECTIVE_BALANCE_INCREMENT: NonZeroU64 = nonzero!(1_000_000_000_u64);
    const MAX_COMMITTEES_PER_SLOT: NonZeroU64 = nonzero!(64_u64);
    const MAX_EFFECTIVE_BALANCE: Gwei = 32_000_000_000;
    const MAX_SEED_LOOKAHEAD: u64 = 4;
    const MIN_SEED_LOOKAHEAD: u64 = 1;
    const MIN_SLASHING_PENALTY_QUOTIENT: NonZeroU64 = nonzero!(128_u64);
    const PROPOSER_REWARD_QUOTIENT: NonZeroU64 = nonzero!(8_u64);
    const SHUFFLE_ROUND_COUNT: u8 = 90;
    const TARGET_COMMITTEE_SIZE: NonZeroU64 = nonzero!(128_u64);
    const WHISTLEBLOWER_REWARD_QUOTIENT: NonZeroU64 = nonzero!(512_u64);

    /// Returns the default configuration associated with a preset.
    ///
    /// This should only be used in tests.
    #[must_use]
    fn default_config() -> Config {
        Self::NAME.default_config()
    }
}

/// [Mainnet preset](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/presets/mainnet).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Mainnet;

impl Preset for Mainnet {
    type EpochsPerHistoricalVector = U65536;
    type EpochsPerSlashingsVector = U8192;
    type MaxValidatorsPerCommittee = U2048;
    type SlotsPerEpoch = U32;

    const NAME: PresetName = PresetName::Mainnet;
}

/// [Minimal preset](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/presets/minimal).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Minimal;

impl Preset for Minimal {
    type EpochsPerHistoricalVector = U64;
    type EpochsPerSlashingsVector = U64;
    type MaxValidatorsPerCommittee = U2048;
    type SlotsPerEpoch = U8;

    const NAME: PresetName = PresetName::Minimal;

    const MAX_COMMITTEES_PER_SLOT: NonZeroU64 = nonzero!(4_u64);
    const MIN_SLASHING_PENALTY_QUOTIENT: NonZeroU64 = nonzero!(64_u64);
    const SHUFFLE_ROUND_COUNT: u8 = 10;
    const TARGET_COMMITTEE_SIZE: NonZeroU64 = nonzero!(4_u64);
}

#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Debug,
    Display,
    EnumString,
    DeserializeFromStr,
    SerializeDisplay,
)]
#[strum(serialize_all = "lowercase")]
pub enum PresetName {
    #[default]
    Mainnet,
    Minimal,
}

impl PresetName {
    #[must_use]
    pub fn default_config(self) -> Config {
        match self {
            Self::Mainnet => Config::mainnet(),
            Self::Minimal => Config::minimal(),
        }
    }
}
