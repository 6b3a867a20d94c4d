use core::{fmt::Debug, hash::Hash};

use crossbeam_skiplist::SkipMap;
use dashmap::DashSet;
use log::debug;
use types::phase0::primitives::Epoch;

/// Keys seen in each epoch.
///
/// [`EpochIndexedSet::insert`] is an atomic insert-if-absent.
/// Of any number of concurrent insertions of the same key into the same epoch, exactly one
/// returns `true`.
pub struct EpochIndexedSet<K> {
    epochs: SkipMap<Epoch, DashSet<K>>,
    retained_epochs: u64,
}

impl<K: Eq + Hash + Send + Sync + 'static> EpochIndexedSet<K> {
    /// `retained_epochs` is the number of epochs kept by [`EpochIndexedSet::prune`],
    /// counting the current one. Values below 1 are treated as 1.
    #[must_use]
    pub fn new(retained_epochs: u64) -> Self {
        Self {
            epochs: SkipMap::new(),
            retained_epochs: retained_epochs.max(1),
        }
    }

    #[must_use]
    pub fn is_known(&self, epoch: Epoch, key: &K) -> bool {
        self.epochs
            .get(&epoch)
            .is_some_and(|entry| entry.value().contains(key))
    }

    /// Returns `true` if `key` was not present in `epoch` before the call.
    pub fn insert(&self, epoch: Epoch, key: K) -> bool {
        self.epochs
            .get_or_insert_with(epoch, DashSet::new)
            .value()
            .insert(key)
    }

    /// Drops all epochs older than the retention horizon relative to `current_epoch`.
    ///
    /// An [`EpochIndexedSet::insert`] racing with the removal of its epoch may return `true` and
    /// still lose the key. Callers must only let the horizon pass epochs that no message can
    /// target anymore.
    pub fn prune(&self, current_epoch: Epoch) {
        let lowest_retained_epoch = current_epoch.saturating_sub(self.retained_epochs - 1);

        for entry in self.epochs.range(..lowest_retained_epoch) {
            debug!(
                "pruning {} seen keys from epoch {} (current epoch: {current_epoch})",
                entry.value().len(),
                entry.key(),
            );

            entry.remove();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.epochs.iter().map(|entry| entry.value().len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn lowest_epoch(&self) -> Option<Epoch> {
        self.epochs.front().map(|entry| *entry.key())
    }
}

impl<K: Eq + Hash + Debug> Debug for EpochIndexedSet<K> {
    fn fmt(&self, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        formatter
            .debug_map()
            .entries(self.epochs.iter().map(|entry| (*entry.key(), entry.value().len())))
            .finish()
    }
}
