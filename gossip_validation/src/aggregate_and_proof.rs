use helper_functions::{accessors, misc, predicates, signing, signing::SignForSingleFork as _};
use types::{
    phase0::containers::{
        AggregateAndProof, AttestationData, IndexedAttestation, SignedAggregateAndProof,
    },
    preset::Preset,
};

use crate::{error::AggregateAndProofError, validator::GossipValidator};

impl<P: Preset> GossipValidator<P> {
    /// Validates an aggregate and records its aggregator as seen for the target epoch.
    pub async fn validate_aggregate_and_proof(
        &self,
        signed_aggregate_and_proof: &SignedAggregateAndProof,
    ) -> Result<IndexedAttestation, AggregateAndProofError> {
        let SignedAggregateAndProof {
            ref message,
            signature,
        } = *signed_aggregate_and_proof;

        let AggregateAndProof {
            aggregator_index,
            ref aggregate,
            selection_proof,
        } = *message;

        let AttestationData {
            slot,
            index,
            beacon_block_root,
            target,
            ..
        } = aggregate.data;

        if target.epoch != misc::compute_epoch_at_slot::<P>(slot) {
            return Err(AggregateAndProofError::BadTargetEpoch {
                slot,
                target_epoch: target.epoch,
            });
        }

        let permissible_slots = self.propagation_slot_range();

        if slot < *permissible_slots.start() {
            return Err(AggregateAndProofError::PastSlot {
                slot,
                earliest_permissible_slot: *permissible_slots.start(),
            });
        }

        if slot > *permissible_slots.end() {
            return Err(AggregateAndProofError::FutureSlot {
                slot,
                latest_permissible_slot: *permissible_slots.end(),
            });
        }

        // > The aggregate is the first valid aggregate received for the aggregator with index
        // > `aggregate_and_proof.aggregator_index` for the epoch `aggregate.data.target.epoch`.
        if self.seen_aggregators.is_known(target.epoch, &aggregator_index) {
            return Err(AggregateAndProofError::AggregatorAlreadyKnown {
                target_epoch: target.epoch,
                aggregator_index,
            });
        }

        if self.known_bad_blocks.contains(beacon_block_root) {
            return Err(AggregateAndProofError::KnownBadBlock { beacon_block_root });
        }

        if !self.fork_choice.has_block(beacon_block_root) {
            return Err(AggregateAndProofError::UnknownBeaconBlockRoot { beacon_block_root });
        }

        let target_state = self
            .state_regen
            .checkpoint_state(target)
            .await
            .map_err(|error| AggregateAndProofError::MissingTargetState { target, error })?;

        let committee =
            accessors::beacon_committee(&target_state, slot, index).map_err(|error| {
                AggregateAndProofError::NoCommitteeForSlotAndIndex { slot, index, error }
            })?;

        let indexed_attestation =
            accessors::indexed_attestation_from_committee(&committee, aggregate)
                .map_err(|error| AggregateAndProofError::InvalidAggregationBits { error })?;

        // > The attestation has participants
        if indexed_attestation.attesting_indices.is_empty() {
            return Err(AggregateAndProofError::WrongNumberOfAggregationBits);
        }

        // > `aggregate_and_proof.selection_proof` selects the validator as an aggregator for the
        // > slot
        if !predicates::is_aggregator(committee.len(), selection_proof) {
            return Err(AggregateAndProofError::InvalidAggregator { aggregator_index });
        }

        // > The aggregator's validator index is within the committee
        if !committee.contains(&aggregator_index) {
            return Err(AggregateAndProofError::AggregatorNotInCommittee { aggregator_index });
        }

        let aggregator_public_key = accessors::public_key(&target_state, aggregator_index)?;

        let signature_sets = vec![
            slot.signature_set(
                &self.config,
                &target_state,
                selection_proof,
                vec![aggregator_public_key],
            ),
            message.signature_set(
                &self.config,
                &target_state,
                signature,
                vec![aggregator_public_key],
            ),
            signing::indexed_attestation_signature_set(
                &self.config,
                &target_state,
                &indexed_attestation,
            )?,
        ];

        if !self.verify_signature_sets(signature_sets).await? {
            return Err(AggregateAndProofError::InvalidSignature);
        }

        // Another copy may have been admitted while the signatures were being verified.
        if !self.seen_aggregators.insert(target.epoch, aggregator_index) {
            return Err(AggregateAndProofError::AggregatorAlreadyKnown {
                target_epoch: target.epoch,
                aggregator_index,
            });
        }

        Ok(indexed_attestation)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use futures::future::join_all;
    use itertools::Itertools as _;
    use types::{
        phase0::primitives::{Slot, ValidatorIndex},
        preset::Minimal,
    };

    use crate::{
        error::{Classification, ValidationError as _},
        helpers::Context,
    };

    use super::*;

    const SLOT: Slot = 9;

    fn aggregate_and_proof(
        context: &Context,
        positions: &[usize],
    ) -> Result<(SignedAggregateAndProof, ValidatorIndex)> {
        let data = Context::attestation_data(SLOT);
        let state = Context::target_state(data.target.epoch);
        let aggregate = factory::attestation(&context.config, &state, data, positions)?;

        let aggregator_index = factory::find_aggregator(&context.config, &state, data)?
            .expect("every member of a committee of 4 is an aggregator");

        let signed_aggregate_and_proof = factory::signed_aggregate_and_proof(
            &context.config,
            &state,
            aggregate,
            aggregator_index,
        );

        Ok((signed_aggregate_and_proof, aggregator_index))
    }

    #[tokio::test]
    async fn valid_aggregate_is_admitted_with_one_batch_of_three_signatures() -> Result<()> {
        let context = Context::new();
        let (signed_aggregate_and_proof, aggregator_index) =
            aggregate_and_proof(&context, &[0, 1, 2])?;

        let indexed_attestation = context
            .validator
            .validate_aggregate_and_proof(&signed_aggregate_and_proof)
            .await?;

        assert_eq!(indexed_attestation.attesting_indices.len(), 3);
        assert!(indexed_attestation
            .attesting_indices
            .iter()
            .tuple_windows()
            .all(|(a, b)| a < b));

        assert_eq!(context.batch_verifier.batch_count(), 1);
        assert_eq!(context.batch_verifier.set_count(), 3);

        assert!(context
            .validator
            .seen_aggregators()
            .is_known(1, &aggregator_index));

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicate_aggregates_are_admitted_exactly_once() -> Result<()> {
        let context = Context::new();
        let (signed_aggregate_and_proof, _) = aggregate_and_proof(&context, &[0, 1])?;

        let handles = (0..8).map(|_| {
            let validator = context.validator.clone();
            let signed_aggregate_and_proof = signed_aggregate_and_proof.clone();

            tokio::spawn(async move {
                validator
                    .validate_aggregate_and_proof(&signed_aggregate_and_proof)
                    .await
            })
        });

        let mut admitted = 0;

        for result in join_all(handles).await {
            match result? {
                Ok(_) => admitted += 1,
                Err(AggregateAndProofError::AggregatorAlreadyKnown { target_epoch: 1, .. }) => {}
                Err(error) => panic!("unexpected error: {error}"),
            }
        }

        assert_eq!(admitted, 1);
        assert_eq!(context.validator.seen_aggregators().len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn seen_aggregator_is_ignored_before_state_lookup() -> Result<()> {
        let context = Context::new();
        let (signed_aggregate_and_proof, aggregator_index) =
            aggregate_and_proof(&context, &[0])?;

        context
            .validator
            .seen_aggregators()
            .insert(1, aggregator_index);

        let error = context
            .validator
            .validate_aggregate_and_proof(&signed_aggregate_and_proof)
            .await
            .expect_err("aggregator was already seen");

        assert!(matches!(
            error,
            AggregateAndProofError::AggregatorAlreadyKnown { .. },
        ));
        assert_eq!(error.classification(), Classification::Ignore);
        assert_eq!(context.state_regen.call_count(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn empty_aggregate_is_rejected() -> Result<()> {
        let context = Context::new();
        let (signed_aggregate_and_proof, _) = aggregate_and_proof(&context, &[])?;

        let error = context
            .validator
            .validate_aggregate_and_proof(&signed_aggregate_and_proof)
            .await
            .expect_err("aggregate without participants should be rejected");

        assert!(matches!(
            error,
            AggregateAndProofError::WrongNumberOfAggregationBits,
        ));
        assert_eq!(error.classification(), Classification::Reject);
        assert_eq!(context.batch_verifier.batch_count(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn aggregator_outside_committee_is_rejected() -> Result<()> {
        let context = Context::new();
        let data = Context::attestation_data(SLOT);
        let state = Context::target_state(data.target.epoch);
        let aggregate = factory::attestation(&context.config, &state, data, &[0])?;

        let outsider = accessors::beacon_committee(&state, SLOT, 1)?[0];

        let signed_aggregate_and_proof =
            factory::signed_aggregate_and_proof(&context.config, &state, aggregate, outsider);

        let error = context
            .validator
            .validate_aggregate_and_proof(&signed_aggregate_and_proof)
            .await
            .expect_err("aggregator should have to be a member of the committee");

        assert!(matches!(
            error,
            AggregateAndProofError::AggregatorNotInCommittee { aggregator_index }
                if aggregator_index == outsider,
        ));

        Ok(())
    }

    #[tokio::test]
    async fn unselected_aggregator_is_rejected_before_signature_verification() -> Result<()> {
        // 1024 validators give committees of 32, which select about half of their members.
        let context = Context::with_validator_count(1024);
        let data = Context::attestation_data(SLOT);
        let target_slot = misc::compute_start_slot_at_epoch::<Minimal>(data.target.epoch);
        let state = factory::state_with_validators::<Minimal>(1024, target_slot);
        let committee = accessors::beacon_committee(&state, SLOT, 0)?;

        assert_eq!(committee.len(), 32);

        let unselected = committee
            .iter()
            .copied()
            .find(|validator_index| {
                let selection_proof =
                    factory::selection_proof(&context.config, &state, SLOT, *validator_index);

                !predicates::is_aggregator(committee.len(), selection_proof)
            })
            .expect("some member of a committee of 32 should not be an aggregator");

        let aggregate = factory::attestation(&context.config, &state, data, &[0, 1])?;

        let signed_aggregate_and_proof =
            factory::signed_aggregate_and_proof(&context.config, &state, aggregate, unselected);

        let error = context
            .validator
            .validate_aggregate_and_proof(&signed_aggregate_and_proof)
            .await
            .expect_err("selection proof should not select the aggregator");

        assert!(matches!(
            error,
            AggregateAndProofError::InvalidAggregator { aggregator_index }
                if aggregator_index == unselected,
        ));
        assert_eq!(error.classification(), Classification::Reject);
        assert_eq!(context.batch_verifier.batch_count(), 0);
        assert!(context.validator.seen_aggregators().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn aggregate_with_invalid_selection_proof_is_rejected_and_not_recorded() -> Result<()> {
        let context = Context::new();
        let (mut signed_aggregate_and_proof, aggregator_index) =
            aggregate_and_proof(&context, &[0, 1])?;

        let state = Context::target_state(1);

        // A selection proof for another slot. Committees of 4 accept any proof as eligible.
        signed_aggregate_and_proof.message.selection_proof =
            factory::selection_proof(&context.config, &state, SLOT - 1, aggregator_index);

        let error = context
            .validator
            .validate_aggregate_and_proof(&signed_aggregate_and_proof)
            .await
            .expect_err("selection proof should be invalid");

        assert!(matches!(error, AggregateAndProofError::InvalidSignature));
        assert_eq!(context.batch_verifier.batch_count(), 1);
        assert!(context.validator.seen_aggregators().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn aggregate_outside_propagation_window_is_ignored() -> Result<()> {
        let context = Context::new();
        let (signed_aggregate_and_proof, _) = aggregate_and_proof(&context, &[0])?;

        context.clock.set_slot(SLOT - 1);

        let error = context
            .validator
            .validate_aggregate_and_proof(&signed_aggregate_and_proof)
            .await
            .expect_err("aggregate from the future should be ignored");

        assert!(matches!(
            error,
            AggregateAndProofError::FutureSlot {
                slot: SLOT,
                latest_permissible_slot: 8,
            },
        ));

        Ok(())
    }
}
