use helper_functions::{accessors, misc, signing::SignForSingleFork as _};
use types::{
    object_root::ObjectRoot as _,
    phase0::{
        containers::{BeaconBlock, SignedBeaconBlock},
        primitives::H256,
    },
    preset::Preset,
};

use crate::{error::BlockError, validator::GossipValidator};

impl<P: Preset> GossipValidator<P> {
    /// Checks whether `signed_block` may be propagated and returns its root.
    ///
    /// The block still has to go through the full state transition before it can be imported.
    pub async fn validate_block(
        &self,
        signed_block: &SignedBeaconBlock,
    ) -> Result<H256, BlockError> {
        let SignedBeaconBlock {
            ref message,
            signature,
        } = *signed_block;

        let BeaconBlock {
            slot,
            proposer_index,
            parent_root,
            ..
        } = *message;

        let block_root = message.object_root();

        // > The block is from a slot greater than the latest finalized slot
        let finalized_epoch = self.fork_choice.finalized_checkpoint().epoch;
        let finalized_slot = misc::compute_start_slot_at_epoch::<P>(finalized_epoch);

        if slot <= finalized_slot {
            return Err(BlockError::WouldRevertFinalizedSlot {
                slot,
                finalized_slot,
            });
        }

        // > The block is not from a future slot (with a `MAXIMUM_GOSSIP_CLOCK_DISPARITY` allowance)
        let current_slot = self.clock.current_slot_with_gossip_disparity();

        if slot > current_slot {
            return Err(BlockError::FutureSlot { slot, current_slot });
        }

        if self.known_bad_blocks.contains(block_root) {
            return Err(BlockError::KnownBadBlock { block_root });
        }

        // > The block is the first block with valid signature received for the proposer for the
        // > slot
        if let Some(existing_block_root) =
            self.seen_block_proposers.block_root(slot, proposer_index)
        {
            return Err(BlockError::RepeatProposal {
                slot,
                proposer_index,
                existing_block_root,
            });
        }

        let state = self
            .state_regen
            .block_slot_state(parent_root, slot)
            .await
            .map_err(|error| BlockError::ParentUnknown { parent_root, error })?;

        // A proposer index outside the registry cannot have produced a valid signature.
        let Ok(public_key) = accessors::public_key(&state, proposer_index) else {
            return Err(BlockError::ProposalSignatureInvalid);
        };

        // > The proposer signature, `signed_beacon_block.signature`, is valid with respect to the
        // > `proposer_index` pubkey.
        let signature_set =
            message.signature_set(&self.config, &state, signature, vec![public_key]);

        if !self.verify_signature_sets(vec![signature_set]).await? {
            return Err(BlockError::ProposalSignatureInvalid);
        }

        // > The block is proposed by the expected `proposer_index` for the block's slot
        let expected = accessors::get_beacon_proposer_index(&state)?;

        if proposer_index != expected {
            // The root covers `proposer_index`, so no valid block can share it.
            self.known_bad_blocks.insert(block_root, slot);

            return Err(BlockError::IncorrectProposer {
                proposer_index,
                expected,
            });
        }

        if let Some(existing_block_root) =
            self.seen_block_proposers.insert(slot, proposer_index, block_root)
        {
            return Err(BlockError::RepeatProposal {
                slot,
                proposer_index,
                existing_block_root,
            });
        }

        Ok(block_root)
    }
}
