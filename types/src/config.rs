use core::{num::NonZeroU64, time::Duration};
use std::borrow::Cow;

use anyhow::Result;
use hex_literal::hex;
use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};

use crate::{
    phase0::primitives::{Gwei, Version, H32},
    preset::PresetName,
};

/// Configuration variables customizable at runtime.
///
/// See [configurations in `consensus-specs`](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/configs).
///
/// The last group of fields is node-local and absent from standard configuration files.
/// They are filled in with defaults when loading one.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    // Meta
    pub config_name: Cow<'static, str>,
    pub preset_base: PresetName,

    // Genesis
    pub genesis_fork_version: Version,

    // Time parameters
    pub min_validator_withdrawability_delay: u64,
    pub seconds_per_slot: NonZeroU64,
    pub shard_committee_period: u64,

    // Validator cycle
    pub churn_limit_quotient: NonZeroU64,
    pub ejection_balance: Gwei,
    pub min_per_epoch_churn_limit: u64,

    // Networking
    pub maximum_gossip_clock_disparity_millis: u64,

    // Node-local
    pub seen_cache_retained_epochs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl Config {
    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            // Meta
            config_name: Cow::Borrowed("mainnet"),
            preset_base: PresetName::Mainnet,

            // Genesis
            genesis_fork_version: H32(hex!("00000000")),

            // Time parameters
            min_validator_withdrawability_delay: 256,
            seconds_per_slot: nonzero!(12_u64),
            shard_committee_period: 256,

            // Validator cycle
            churn_limit_quotient: nonzero!(65536_u64),
            ejection_balance: 16_000_000_000,
            min_per_epoch_churn_limit: 4,

            // Networking
            maximum_gossip_clock_disparity_millis: 500,

            // Node-local
            seen_cache_retained_epochs: 2,
        }
    }

    #[must_use]
    pub fn minimal() -> Self {
        Self {
            // Meta
            config_name: Cow::Borrowed("minimal"),
            preset_base: PresetName::Minimal,

            // Genesis
            genesis_fork_version: H32(hex!("00000001")),

            // Time parameters
            seconds_per_slot: nonzero!(6_u64),
            shard_committee_period: 64,

            // Validator cycle
            churn_limit_quotient: nonzero!(32_u64),
            min_per_epoch_churn_limit: 2,

            ..Self::mainnet()
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    #[must_use]
    pub const fn slot_duration(&self) -> Duration {
        Duration::from_secs(self.seconds_per_slot.get())
    }

    #[must_use]
    pub const fn maximum_gossip_clock_disparity(&self) -> Duration {
        Duration::from_millis(self.maximum_gossip_clock_disparity_millis)
    }
}
