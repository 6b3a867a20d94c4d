//! Concurrent caches used to suppress duplicate gossip messages.

pub use crate::{
    block_caches::{KnownBadBlocks, SeenBlockProposers},
    epoch_indexed_set::EpochIndexedSet,
};

use types::phase0::primitives::ValidatorIndex;

/// Aggregators that already had an aggregate admitted, keyed by target epoch.
pub type SeenAggregators = EpochIndexedSet<ValidatorIndex>;

/// Validators that already had an unaggregated attestation admitted, keyed by target epoch.
pub type SeenAttesters = EpochIndexedSet<ValidatorIndex>;

mod block_caches;
mod epoch_indexed_set;
