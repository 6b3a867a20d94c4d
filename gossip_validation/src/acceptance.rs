use core::{fmt, pin::pin};

use anyhow::Result;
use futures::{Stream, StreamExt as _};
use helper_functions::misc;
use log::{debug, warn};
use parse_display::Display;
use typenum::Unsigned as _;
use types::{
    nonstandard::SignatureStatus,
    phase0::{
        containers::{Attestation, SignedAggregateAndProof, SignedBeaconBlock},
        primitives::{Epoch, Slot, SubnetId},
    },
    preset::Preset,
};

use crate::{
    attestation::AttestationOrigin,
    error::{AggregateAndProofError, AttestationError, Classification, ValidationError},
    pending::PendingMessage,
    validator::GossipValidator,
};

/// The verdict reported back to the gossip router.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[display(style = "lowercase")]
pub enum MessageAcceptance {
    Accept,
    Ignore,
    Reject,
}

impl From<Classification> for MessageAcceptance {
    fn from(classification: Classification) -> Self {
        match classification {
            Classification::Reject => Self::Reject,
            Classification::Ignore => Self::Ignore,
        }
    }
}

impl<P: Preset> GossipValidator<P> {
    pub async fn accept_attestation(
        &self,
        attestation: Attestation,
        subnet_id: SubnetId,
    ) -> MessageAcceptance {
        let result = self
            .validate_attestation(
                &attestation,
                AttestationOrigin::Gossip { subnet_id },
                SignatureStatus::Unverified,
            )
            .await;

        let acceptance = report("attestation", &result);

        if matches!(result, Err(AttestationError::FutureSlot { .. })) {
            self.defer(PendingMessage::Attestation {
                attestation: Box::new(attestation),
                subnet_id,
            });
        }

        acceptance
    }

    pub async fn accept_aggregate_and_proof(
        &self,
        signed_aggregate_and_proof: SignedAggregateAndProof,
    ) -> MessageAcceptance {
        let result = self
            .validate_aggregate_and_proof(&signed_aggregate_and_proof)
            .await;

        let acceptance = report("aggregate and proof", &result);

        if matches!(result, Err(AggregateAndProofError::FutureSlot { .. })) {
            self.defer(PendingMessage::AggregateAndProof(Box::new(
                signed_aggregate_and_proof,
            )));
        }

        acceptance
    }

    pub async fn accept_block(&self, signed_block: &SignedBeaconBlock) -> MessageAcceptance {
        report("block", &self.validate_block(signed_block).await)
    }

    /// Validates a message released by [`Self::on_slot`] again.
    pub async fn resubmit(&self, message: PendingMessage) -> MessageAcceptance {
        match message {
            PendingMessage::Attestation {
                attestation,
                subnet_id,
            } => self.accept_attestation(*attestation, subnet_id).await,
            PendingMessage::AggregateAndProof(signed_aggregate_and_proof) => {
                self.accept_aggregate_and_proof(*signed_aggregate_and_proof)
                    .await
            }
        }
    }

    /// Releases messages deferred until `slot` or earlier.
    #[must_use]
    pub fn on_slot(&self, slot: Slot) -> Vec<PendingMessage> {
        self.pending_messages.take_ready(slot)
    }

    /// Drops cache entries that can no longer affect validation.
    pub fn on_epoch(&self, epoch: Epoch) {
        self.seen_aggregators.prune(epoch);
        self.seen_attesters.prune(epoch);

        let finalized_epoch = self.fork_choice.finalized_checkpoint().epoch;
        let finalized_slot = misc::compute_start_slot_at_epoch::<P>(finalized_epoch);

        self.seen_block_proposers.prune(finalized_slot);
        self.known_bad_blocks.prune(finalized_slot);
    }

    /// Drives [`Self::on_epoch`] and [`Self::on_slot`] from a stream of slots such as the one
    /// returned by [`clock::slot_ticks`], resubmitting released messages.
    pub async fn run(&self, slots: impl Stream<Item = Result<Slot>>) -> Result<()> {
        let mut slots = pin!(slots);

        while let Some(slot) = slots.next().await {
            let slot = slot?;

            if misc::is_epoch_start::<P>(slot) {
                self.on_epoch(misc::compute_epoch_at_slot::<P>(slot));
            }

            for message in self.on_slot(slot) {
                self.resubmit(message).await;
            }
        }

        Ok(())
    }

    // Only messages close to the current slot are kept to stop peers from filling the queue.
    fn defer(&self, message: PendingMessage) {
        let slot = message.slot();
        let horizon = self
            .clock
            .current_slot()
            .saturating_add(P::SlotsPerEpoch::U64);

        if slot > horizon {
            debug!("not deferring message for slot {slot} beyond slot {horizon}");
            return;
        }

        if self.pending_messages.push(message) {
            debug!("deferred message until slot {slot}");
        }
    }
}

fn report<T, E: ValidationError + fmt::Display>(
    kind: &str,
    result: &Result<T, E>,
) -> MessageAcceptance {
    match result {
        Ok(_) => {
            debug!("gossip {kind} accepted");
            MessageAcceptance::Accept
        }
        Err(error) if error.is_internal() => {
            warn!("gossip {kind} could not be validated: {error}");
            MessageAcceptance::Ignore
        }
        Err(error) => {
            let acceptance = MessageAcceptance::from(error.classification());
            let reason = error.reason();
            debug!("gossip {kind} {acceptance} ({reason}): {error}");
            acceptance
        }
    }
}
