use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use static_assertions::assert_obj_safe;
use types::{
    phase0::{
        beacon_state::BeaconState,
        containers::{Checkpoint, IndexedAttestation},
        primitives::{Slot, H256},
    },
    preset::{Mainnet, Preset},
};

/// Produces historical states.
///
/// Both methods may have to replay blocks and can take a long time.
/// The states returned are shared snapshots and must not be mutated.
#[async_trait]
pub trait StateRegen<P: Preset>: Send + Sync {
    /// The state at the start of the epoch of `checkpoint`, built on `checkpoint.root`.
    async fn checkpoint_state(&self, checkpoint: Checkpoint) -> Result<Arc<BeaconState<P>>>;

    /// The post-state of the block with root `block_root` advanced through empty slots to `slot`.
    async fn block_slot_state(&self, block_root: H256, slot: Slot)
        -> Result<Arc<BeaconState<P>>>;
}

pub trait ForkChoice: Send + Sync {
    fn has_block(&self, block_root: H256) -> bool;

    /// Whether `descendant_root` is `ancestor_root` or a block built on it.
    fn is_descendant(&self, ancestor_root: H256, descendant_root: H256) -> bool;

    fn is_descendant_of_finalized(&self, block_root: H256) -> bool;

    fn finalized_checkpoint(&self) -> Checkpoint;

    fn on_attestation(&self, indexed_attestation: &IndexedAttestation) -> Result<()>;
}

assert_obj_safe!(ForkChoice);

// `assert_obj_safe!` does not accept generic traits.
const _: Option<&dyn StateRegen<Mainnet>> = None;
