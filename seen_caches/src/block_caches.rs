use dashmap::{mapref::entry::Entry, DashMap};
use log::debug;
use types::phase0::primitives::{Slot, ValidatorIndex, H256};

/// First block root seen from each proposer in each slot.
#[derive(Default, Debug)]
pub struct SeenBlockProposers {
    proposals: DashMap<(Slot, ValidatorIndex), H256>,
}

impl SeenBlockProposers {
    #[must_use]
    pub fn is_known(&self, slot: Slot, proposer_index: ValidatorIndex) -> bool {
        self.proposals.contains_key(&(slot, proposer_index))
    }

    #[must_use]
    pub fn block_root(&self, slot: Slot, proposer_index: ValidatorIndex) -> Option<H256> {
        self.proposals
            .get(&(slot, proposer_index))
            .map(|entry| *entry.value())
    }

    /// Records `block_root` unless a block from `proposer_index` was already recorded for `slot`.
    ///
    /// Returns the root recorded earlier, if any.
    pub fn insert(
        &self,
        slot: Slot,
        proposer_index: ValidatorIndex,
        block_root: H256,
    ) -> Option<H256> {
        match self.proposals.entry((slot, proposer_index)) {
            Entry::Occupied(occupied) => Some(*occupied.get()),
            Entry::Vacant(vacant) => {
                vacant.insert(block_root);
                None
            }
        }
    }

    pub fn prune(&self, finalized_slot: Slot) {
        let before = self.proposals.len();

        self.proposals.retain(|(slot, _), _| *slot > finalized_slot);

        debug!(
            "pruned {} seen block proposals (finalized slot: {finalized_slot})",
            before.saturating_sub(self.proposals.len()),
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}

/// Roots of blocks that failed validation permanently, with their slots.
#[derive(Default, Debug)]
pub struct KnownBadBlocks {
    roots: DashMap<H256, Slot>,
}

impl KnownBadBlocks {
    #[must_use]
    pub fn contains(&self, block_root: H256) -> bool {
        self.roots.contains_key(&block_root)
    }

    pub fn insert(&self, block_root: H256, slot: Slot) {
        self.roots.insert(block_root, slot);
    }

    pub fn prune(&self, finalized_slot: Slot) {
        self.roots.retain(|_, slot| *slot > finalized_slot);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
