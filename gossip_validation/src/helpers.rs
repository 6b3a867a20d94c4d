use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{ensure, Result};
use async_trait::async_trait;
use clock::ManualSlotClock;
use factory::InsecureBatchVerifier;
use helper_functions::misc;
use parking_lot::Mutex;
use std_ext::ArcExt as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::GENESIS_EPOCH,
        containers::{AttestationData, Checkpoint, IndexedAttestation},
        primitives::{Epoch, Slot, H256},
    },
    preset::{Minimal, Preset},
};

use crate::{
    capabilities::{ForkChoice, StateRegen},
    validator::GossipValidator,
};

pub const VALIDATOR_COUNT: u64 = 64;
pub const CURRENT_SLOT: Slot = 10;

pub const FINALIZED_ROOT: H256 = H256::repeat_byte(1);
pub const TARGET_ROOT: H256 = H256::repeat_byte(2);
pub const HEAD_ROOT: H256 = H256::repeat_byte(3);
pub const ORPHAN_ROOT: H256 = H256::repeat_byte(4);

/// A linear chain of blocks. Each block descends from all blocks before it.
pub struct FakeForkChoice {
    chain: Vec<H256>,
    orphans: Vec<H256>,
    finalized_checkpoint: Mutex<Checkpoint>,
    attestations: Mutex<Vec<IndexedAttestation>>,
}

impl FakeForkChoice {
    fn position(&self, block_root: H256) -> Option<usize> {
        self.chain.iter().position(|root| *root == block_root)
    }

    pub fn set_finalized_checkpoint(&self, checkpoint: Checkpoint) {
        *self.finalized_checkpoint.lock() = checkpoint;
    }

    pub fn attestations(&self) -> Vec<IndexedAttestation> {
        self.attestations.lock().clone()
    }
}

impl ForkChoice for FakeForkChoice {
    fn has_block(&self, block_root: H256) -> bool {
        self.position(block_root).is_some() || self.orphans.contains(&block_root)
    }

    fn is_descendant(&self, ancestor_root: H256, descendant_root: H256) -> bool {
        match (self.position(ancestor_root), self.position(descendant_root)) {
            (Some(ancestor), Some(descendant)) => ancestor <= descendant,
            _ => false,
        }
    }

    fn is_descendant_of_finalized(&self, block_root: H256) -> bool {
        self.is_descendant(self.finalized_checkpoint().root, block_root)
    }

    fn finalized_checkpoint(&self) -> Checkpoint {
        *self.finalized_checkpoint.lock()
    }

    fn on_attestation(&self, indexed_attestation: &IndexedAttestation) -> Result<()> {
        self.attestations.lock().push(indexed_attestation.clone());
        Ok(())
    }
}

/// Produces copies of one state with the slot changed. Only knows about blocks in the chain.
pub struct FakeStateRegen<P: Preset> {
    state: Arc<BeaconState<P>>,
    known_roots: Mutex<Vec<H256>>,
    calls: AtomicUsize,
}

impl<P: Preset> FakeStateRegen<P> {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn forget(&self, block_root: H256) {
        self.known_roots.lock().retain(|root| *root != block_root);
    }

    fn state_at(&self, block_root: H256, slot: Slot) -> Result<Arc<BeaconState<P>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        ensure!(
            self.known_roots.lock().contains(&block_root),
            "no state for block {block_root:?}",
        );

        let mut state = self.state.clone_arc();
        state.make_mut_cow().slot = slot;
        Ok(state)
    }
}

#[async_trait]
impl<P: Preset> StateRegen<P> for FakeStateRegen<P> {
    async fn checkpoint_state(&self, checkpoint: Checkpoint) -> Result<Arc<BeaconState<P>>> {
        let slot = misc::compute_start_slot_at_epoch::<P>(checkpoint.epoch);
        self.state_at(checkpoint.root, slot)
    }

    async fn block_slot_state(
        &self,
        block_root: H256,
        slot: Slot,
    ) -> Result<Arc<BeaconState<P>>> {
        self.state_at(block_root, slot)
    }
}

pub struct Context {
    pub config: Arc<Config>,
    pub clock: Arc<ManualSlotClock>,
    pub fork_choice: Arc<FakeForkChoice>,
    pub state_regen: Arc<FakeStateRegen<Minimal>>,
    pub batch_verifier: Arc<InsecureBatchVerifier>,
    pub validator: Arc<GossipValidator<Minimal>>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_validator_count(VALIDATOR_COUNT)
    }

    /// Every state served by the fake regenerator has `validator_count` active validators.
    pub fn with_validator_count(validator_count: u64) -> Self {
        let config = Arc::new(Config::minimal());
        let clock = Arc::new(ManualSlotClock::new(CURRENT_SLOT));

        let fork_choice = Arc::new(FakeForkChoice {
            chain: vec![FINALIZED_ROOT, TARGET_ROOT, HEAD_ROOT],
            orphans: vec![ORPHAN_ROOT],
            finalized_checkpoint: Mutex::new(Checkpoint {
                epoch: GENESIS_EPOCH,
                root: FINALIZED_ROOT,
            }),
            attestations: Mutex::default(),
        });

        let state_regen = Arc::new(FakeStateRegen {
            state: Arc::new(factory::state_with_validators(validator_count, 0)),
            known_roots: Mutex::new(vec![FINALIZED_ROOT, TARGET_ROOT, HEAD_ROOT]),
            calls: AtomicUsize::new(0),
        });

        let batch_verifier = Arc::new(InsecureBatchVerifier::default());

        let validator = Arc::new(GossipValidator::new(
            config.clone_arc(),
            clock.clone_arc(),
            fork_choice.clone_arc(),
            state_regen.clone_arc(),
            batch_verifier.clone_arc(),
        ));

        Self {
            config,
            clock,
            fork_choice,
            state_regen,
            batch_verifier,
            validator,
        }
    }

    /// The state the validator will see for `slot`.
    pub fn state_at(slot: Slot) -> BeaconState<Minimal> {
        factory::state_with_validators(VALIDATOR_COUNT, slot)
    }

    pub fn target_state(epoch: Epoch) -> BeaconState<Minimal> {
        Self::state_at(misc::compute_start_slot_at_epoch::<Minimal>(epoch))
    }

    /// A vote for `HEAD_ROOT` in committee 0 of `slot`.
    pub fn attestation_data(slot: Slot) -> AttestationData {
        AttestationData {
            slot,
            index: 0,
            beacon_block_root: HEAD_ROOT,
            source: Checkpoint {
                epoch: GENESIS_EPOCH,
                root: FINALIZED_ROOT,
            },
            target: Checkpoint {
                epoch: misc::compute_epoch_at_slot::<Minimal>(slot),
                root: TARGET_ROOT,
            },
        }
    }
}
