use helper_functions::{
    accessors, misc, predicates, signing,
    verifier::{MultiVerifier, NullVerifier},
};
use types::{
    nonstandard::SignatureStatus,
    phase0::{
        containers::{Attestation, AttestationData, IndexedAttestation},
        primitives::SubnetId,
    },
    preset::Preset,
};

use crate::{error::AttestationError, validator::GossipValidator};

/// Where an unaggregated attestation came from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AttestationOrigin {
    Gossip { subnet_id: SubnetId },
    /// Submitted locally. The subnet is not known and is not checked.
    Api,
}

impl AttestationOrigin {
    const fn subnet_id(self) -> Option<SubnetId> {
        match self {
            Self::Gossip { subnet_id } => Some(subnet_id),
            Self::Api => None,
        }
    }
}

impl<P: Preset> GossipValidator<P> {
    /// Validates an unaggregated attestation and records its attester as seen.
    pub async fn validate_attestation(
        &self,
        attestation: &Attestation,
        origin: AttestationOrigin,
        signature_status: SignatureStatus,
    ) -> Result<IndexedAttestation, AttestationError> {
        let AttestationData {
            slot,
            index,
            beacon_block_root,
            target,
            ..
        } = attestation.data;

        // > The attestation's epoch matches its target
        if target.epoch != misc::compute_epoch_at_slot::<P>(slot) {
            return Err(AttestationError::BadTargetEpoch {
                slot,
                target_epoch: target.epoch,
            });
        }

        let permissible_slots = self.propagation_slot_range();

        if slot < *permissible_slots.start() {
            return Err(AttestationError::PastSlot {
                slot,
                earliest_permissible_slot: *permissible_slots.start(),
            });
        }

        if slot > *permissible_slots.end() {
            return Err(AttestationError::FutureSlot {
                slot,
                latest_permissible_slot: *permissible_slots.end(),
            });
        }

        // Bad blocks are never added to fork choice, so this has to be checked first.
        if self.known_bad_blocks.contains(beacon_block_root) {
            return Err(AttestationError::KnownBadBlock { beacon_block_root });
        }

        // > The block being voted for (`attestation.data.beacon_block_root`) has been seen
        if !self.fork_choice.has_block(beacon_block_root) {
            return Err(AttestationError::UnknownBeaconBlockRoot { beacon_block_root });
        }

        // > The attestation's target block is an ancestor of the block named in the LMD vote
        if !self.fork_choice.is_descendant(target.root, beacon_block_root) {
            return Err(AttestationError::TargetBlockNotAnAncestorOfLmdBlock {
                target_root: target.root,
                beacon_block_root,
            });
        }

        // > The current `finalized_checkpoint` is an ancestor of the block defined by
        // > `attestation.data.beacon_block_root`
        if !self.fork_choice.is_descendant_of_finalized(beacon_block_root) {
            return Err(AttestationError::FinalizedCheckpointNotAnAncestorOfRoot {
                beacon_block_root,
            });
        }

        let target_state = self
            .state_regen
            .checkpoint_state(target)
            .await
            .map_err(|error| AttestationError::MissingTargetState { target, error })?;

        let committee = accessors::beacon_committee(&target_state, slot, index)
            .map_err(|error| AttestationError::NoCommitteeForSlotAndIndex { slot, index, error })?;

        let indexed_attestation =
            accessors::indexed_attestation_from_committee(&committee, attestation)
                .map_err(|error| AttestationError::InvalidAggregationBits { error })?;

        // > The attestation is unaggregated -- that is, it has exactly one participating validator
        let validator_index = match indexed_attestation.attesting_indices.as_slice() {
            [validator_index] => *validator_index,
            attesting_indices => {
                return Err(AttestationError::NotExactlyOneAggregationBitSet {
                    set_bits: attesting_indices.len(),
                })
            }
        };

        // > The attestation is for the correct subnet
        if let Some(received) = origin.subnet_id() {
            let expected = accessors::get_subnet_for_attestation(&target_state, slot, index)?;

            if received != expected {
                return Err(AttestationError::InvalidSubnetId { received, expected });
            }
        }

        // > There has been no other valid attestation seen on an attestation subnet that has an
        // > identical `attestation.data.target.epoch` and participating validator index.
        if self.seen_attesters.is_known(target.epoch, &validator_index) {
            return Err(AttestationError::AttestationAlreadyKnown {
                target_epoch: target.epoch,
                validator_index,
            });
        }

        // > The signature of `attestation` is valid.
        if signature_status.needs_verification() {
            let signature_set = signing::indexed_attestation_signature_set(
                &self.config,
                &target_state,
                &indexed_attestation,
            )?;

            if !self.verify_signature_sets(vec![signature_set]).await? {
                return Err(AttestationError::InvalidSignature);
            }
        }

        // Another copy may have been admitted while the signature was being verified.
        if !self.seen_attesters.insert(target.epoch, validator_index) {
            return Err(AttestationError::AttestationAlreadyKnown {
                target_epoch: target.epoch,
                validator_index,
            });
        }

        Ok(indexed_attestation)
    }

    /// Applies an attestation that does not come from gossip (for example, one included in a
    /// block) to fork choice.
    pub async fn process_attestation(
        &self,
        attestation: &Attestation,
        signature_status: SignatureStatus,
    ) -> Result<IndexedAttestation, AttestationError> {
        let AttestationData {
            slot,
            index,
            target,
            ..
        } = attestation.data;

        let target_state = self
            .state_regen
            .checkpoint_state(target)
            .await
            .map_err(|error| AttestationError::TargetStateMissing { target, error })?;

        let indexed_attestation = accessors::get_indexed_attestation(&target_state, attestation)
            .map_err(|error| AttestationError::NoCommitteeForSlotAndIndex { slot, index, error })?;

        let signature_sets = if signature_status.needs_verification() {
            let mut verifier = MultiVerifier::new(self.batch_verifier());

            predicates::validate_indexed_attestation(
                &self.config,
                &target_state,
                &indexed_attestation,
                &mut verifier,
            )
            .map_err(|error| AttestationError::InvalidIndexedAttestation { error })?;

            verifier.into_signature_sets()
        } else {
            predicates::validate_indexed_attestation(
                &self.config,
                &target_state,
                &indexed_attestation,
                NullVerifier,
            )
            .map_err(|error| AttestationError::InvalidIndexedAttestation { error })?;

            vec![]
        };

        if !signature_sets.is_empty() && !self.verify_signature_sets(signature_sets).await? {
            return Err(AttestationError::InvalidSignature);
        }

        self.fork_choice.on_attestation(&indexed_attestation)?;

        Ok(indexed_attestation)
    }
}
