//! Deterministic digests standing in for `hash_tree_root`.
//!
//! Full SSZ merkleization is provided outside this workspace. These digests are only used to
//! derive signing roots and identities, so they need to be collision resistant and stable, not
//! compatible with SSZ.

use hashing::Hasher;

use crate::phase0::{
    containers::{
        AggregateAndProof, Attestation, AttestationData, AttesterSlashing, BeaconBlock,
        BeaconBlockBody, Checkpoint, IndexedAttestation, VoluntaryExit,
    },
    primitives::{SignatureBytes, H256},
};

pub trait ObjectRoot {
    fn object_root(&self) -> H256 {
        self.feed(Hasher::default()).finish()
    }

    #[must_use]
    fn feed(&self, hasher: Hasher) -> Hasher;
}

// `Slot` and `Epoch` are both aliases of `u64`, so this covers selection proofs and RANDAO reveals.
impl ObjectRoot for u64 {
    fn feed(&self, hasher: Hasher) -> Hasher {
        hasher.u64(*self)
    }
}

impl ObjectRoot for H256 {
    fn feed(&self, hasher: Hasher) -> Hasher {
        hasher.h256(*self)
    }
}

impl ObjectRoot for SignatureBytes {
    fn feed(&self, hasher: Hasher) -> Hasher {
        hasher.bytes(self)
    }
}

impl<T: ObjectRoot> ObjectRoot for [T] {
    fn feed(&self, hasher: Hasher) -> Hasher {
        self.iter()
            .fold(hasher.u64(self.len() as u64), |hasher, element| {
                hasher.h256(element.object_root())
            })
    }
}

impl ObjectRoot for Checkpoint {
    fn feed(&self, hasher: Hasher) -> Hasher {
        hasher.u64(self.epoch).h256(self.root)
    }
}

impl ObjectRoot for AttestationData {
    fn feed(&self, hasher: Hasher) -> Hasher {
        let hasher = hasher
            .u64(self.slot)
            .u64(self.index)
            .h256(self.beacon_block_root);

        self.target.feed(self.source.feed(hasher))
    }
}

impl ObjectRoot for Attestation {
    fn feed(&self, hasher: Hasher) -> Hasher {
        hasher
            .u64(self.aggregation_bits.len() as u64)
            .bytes(self.aggregation_bits.as_raw_slice())
            .h256(self.data.object_root())
            .bytes(self.signature)
    }
}

impl ObjectRoot for IndexedAttestation {
    fn feed(&self, hasher: Hasher) -> Hasher {
        self.attesting_indices
            .feed(hasher)
            .h256(self.data.object_root())
            .bytes(self.signature)
    }
}

impl ObjectRoot for AttesterSlashing {
    fn feed(&self, hasher: Hasher) -> Hasher {
        hasher
            .h256(self.attestation_1.object_root())
            .h256(self.attestation_2.object_root())
    }
}

impl ObjectRoot for AggregateAndProof {
    fn feed(&self, hasher: Hasher) -> Hasher {
        hasher
            .u64(self.aggregator_index)
            .h256(self.aggregate.object_root())
            .bytes(self.selection_proof)
    }
}

impl ObjectRoot for VoluntaryExit {
    fn feed(&self, hasher: Hasher) -> Hasher {
        hasher.u64(self.epoch).u64(self.validator_index)
    }
}

impl ObjectRoot for BeaconBlockBody {
    fn feed(&self, hasher: Hasher) -> Hasher {
        let exits = self
            .voluntary_exits
            .iter()
            .map(|exit| exit.message)
            .collect::<Vec<_>>();

        let hasher = hasher.bytes(self.randao_reveal).h256(self.graffiti);
        let hasher = self.attester_slashings.feed(hasher);
        let hasher = self.attestations.feed(hasher);

        exits.feed(hasher)
    }
}

impl ObjectRoot for BeaconBlock {
    fn feed(&self, hasher: Hasher) -> Hasher {
        hasher
            .u64(self.slot)
            .u64(self.proposer_index)
            .h256(self.parent_root)
            .h256(self.state_root)
            .h256(self.body.object_root())
    }
}

#[cfg(test)]
mod tests {
    use bitvec::{bitvec, order::Lsb0};

    use super::*;

    #[test]
    fn roots_depend_on_every_field() {
        let data = AttestationData::default();
        let mut moved_target = data;
        moved_target.target.epoch = 1;

        assert_ne!(data.object_root(), moved_target.object_root());
    }

    #[test]
    fn bitfield_length_is_part_of_the_root() {
        let short = Attestation {
            aggregation_bits: bitvec![u8, Lsb0; 0; 7],
            ..Attestation::default()
        };

        let long = Attestation {
            aggregation_bits: bitvec![u8, Lsb0; 0; 8],
            ..Attestation::default()
        };

        assert_ne!(short.object_root(), long.object_root());
    }

    #[test]
    fn list_roots_are_order_sensitive() {
        let exit_of = |validator_index| VoluntaryExit {
            epoch: 0,
            validator_index,
        };

        assert_ne!(
            [exit_of(1), exit_of(2)].object_root(),
            [exit_of(2), exit_of(1)].object_root(),
        );
        assert_ne!(
            <[VoluntaryExit]>::object_root(&[]),
            [exit_of(0)].object_root(),
        );
    }
}
