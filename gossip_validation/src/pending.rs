use std::collections::BTreeMap;

use log::debug;
use parking_lot::Mutex;
use types::phase0::{
    containers::{Attestation, SignedAggregateAndProof},
    primitives::{Slot, SubnetId},
};

pub const DEFAULT_PENDING_CAPACITY: usize = 1024;

/// A gossip message that arrived before its slot.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PendingMessage {
    Attestation {
        attestation: Box<Attestation>,
        subnet_id: SubnetId,
    },
    AggregateAndProof(Box<SignedAggregateAndProof>),
}

impl PendingMessage {
    #[must_use]
    pub fn slot(&self) -> Slot {
        match self {
            Self::Attestation { attestation, .. } => attestation.data.slot,
            Self::AggregateAndProof(aggregate_and_proof) => {
                aggregate_and_proof.message.aggregate.data.slot
            }
        }
    }
}

/// Messages waiting for their slot, grouped by slot.
#[derive(Debug)]
pub struct PendingMessages {
    messages: Mutex<BTreeMap<Slot, Vec<PendingMessage>>>,
    capacity: usize,
}

impl Default for PendingMessages {
    fn default() -> Self {
        Self::new(DEFAULT_PENDING_CAPACITY)
    }
}

impl PendingMessages {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: Mutex::default(),
            capacity,
        }
    }

    /// Returns `false` if the queue is full and `message` was dropped.
    pub fn push(&self, message: PendingMessage) -> bool {
        let mut messages = self.messages.lock();

        if messages.values().map(Vec::len).sum::<usize>() >= self.capacity {
            debug!(
                "dropping pending message for slot {} because the queue is full",
                message.slot(),
            );
            return false;
        }

        messages.entry(message.slot()).or_default().push(message);

        true
    }

    /// Removes and returns messages for `current_slot` and earlier, oldest first.
    pub fn take_ready(&self, current_slot: Slot) -> Vec<PendingMessage> {
        let mut messages = self.messages.lock();

        let later = match current_slot.checked_add(1) {
            Some(next_slot) => messages.split_off(&next_slot),
            None => BTreeMap::new(),
        };

        core::mem::replace(&mut *messages, later)
            .into_values()
            .flatten()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.lock().values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}
