use core::ops::RangeInclusive;
use std::sync::Arc;

use anyhow::Result;
use clock::SlotClock;
use helper_functions::verifier::{BatchVerifier, SignatureSet};
use seen_caches::{KnownBadBlocks, SeenAggregators, SeenAttesters, SeenBlockProposers};
use std_ext::ArcExt as _;
use typenum::Unsigned as _;
use types::{
    config::Config,
    phase0::{consts::ATTESTATION_PROPAGATION_SLOT_RANGE, primitives::Slot},
    preset::Preset,
};

use crate::{
    capabilities::{ForkChoice, StateRegen},
    pending::PendingMessages,
};

/// Admission gate for gossip messages.
///
/// Validations of different messages may run concurrently on the same `GossipValidator`.
/// Duplicate suppression is shared between them.
pub struct GossipValidator<P: Preset> {
    pub(crate) config: Arc<Config>,
    pub(crate) clock: Arc<dyn SlotClock>,
    pub(crate) fork_choice: Arc<dyn ForkChoice>,
    pub(crate) state_regen: Arc<dyn StateRegen<P>>,
    batch_verifier: Arc<dyn BatchVerifier>,
    pub(crate) seen_aggregators: SeenAggregators,
    pub(crate) seen_attesters: SeenAttesters,
    pub(crate) seen_block_proposers: SeenBlockProposers,
    pub(crate) known_bad_blocks: KnownBadBlocks,
    pub(crate) pending_messages: PendingMessages,
}

impl<P: Preset> GossipValidator<P> {
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        clock: Arc<dyn SlotClock>,
        fork_choice: Arc<dyn ForkChoice>,
        state_regen: Arc<dyn StateRegen<P>>,
        batch_verifier: Arc<dyn BatchVerifier>,
    ) -> Self {
        let retained_epochs = seen_cache_retained_epochs::<P>(&config);

        Self {
            config,
            clock,
            fork_choice,
            state_regen,
            batch_verifier,
            seen_aggregators: SeenAggregators::new(retained_epochs),
            seen_attesters: SeenAttesters::new(retained_epochs),
            seen_block_proposers: SeenBlockProposers::default(),
            known_bad_blocks: KnownBadBlocks::default(),
            pending_messages: PendingMessages::default(),
        }
    }

    #[must_use]
    pub const fn seen_aggregators(&self) -> &SeenAggregators {
        &self.seen_aggregators
    }

    #[must_use]
    pub const fn seen_attesters(&self) -> &SeenAttesters {
        &self.seen_attesters
    }

    #[must_use]
    pub const fn seen_block_proposers(&self) -> &SeenBlockProposers {
        &self.seen_block_proposers
    }

    /// Blocks that failed validation permanently.
    ///
    /// Callers should record blocks that fail the full state transition here as well.
    #[must_use]
    pub const fn known_bad_blocks(&self) -> &KnownBadBlocks {
        &self.known_bad_blocks
    }

    #[must_use]
    pub const fn pending_messages(&self) -> &PendingMessages {
        &self.pending_messages
    }

    // > `attestation.data.slot` is within the last `ATTESTATION_PROPAGATION_SLOT_RANGE` slots
    // > (within a `MAXIMUM_GOSSIP_CLOCK_DISPARITY` allowance)
    pub(crate) fn propagation_slot_range(&self) -> RangeInclusive<Slot> {
        let earliest_permissible_slot = self
            .clock
            .current_slot()
            .saturating_sub(ATTESTATION_PROPAGATION_SLOT_RANGE);

        let latest_permissible_slot = self.clock.current_slot_with_gossip_disparity();

        earliest_permissible_slot..=latest_permissible_slot
    }

    /// Verifies `signature_sets` as one batch on the blocking thread pool.
    pub(crate) async fn verify_signature_sets(
        &self,
        signature_sets: Vec<SignatureSet>,
    ) -> Result<bool> {
        let batch_verifier = self.batch_verifier.clone_arc();

        let valid =
            tokio::task::spawn_blocking(move || batch_verifier.verify_batch(&signature_sets))
                .await?;

        Ok(valid)
    }

    pub(crate) fn batch_verifier(&self) -> &dyn BatchVerifier {
        self.batch_verifier.as_ref()
    }
}

// Seen entries must outlive every target epoch reachable from the propagation window.
// Otherwise a message could be admitted again after its entry is pruned.
fn seen_cache_retained_epochs<P: Preset>(config: &Config) -> u64 {
    let propagation_epochs = ATTESTATION_PROPAGATION_SLOT_RANGE.div_ceil(P::SlotsPerEpoch::U64);

    config
        .seen_cache_retained_epochs
        .max(propagation_epochs.saturating_add(1))
}
