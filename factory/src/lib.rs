//! Fixtures for tests.
//!
//! Signatures produced here are digests of the message and public keys.
//! They are only accepted by [`InsecureBatchVerifier`] and offer no security at all.

use core::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use bitvec::{bitvec, order::Lsb0};
use hashing::Hasher;
use helper_functions::{
    accessors, predicates,
    signing::SignForSingleFork as _,
    verifier::{BatchVerifier, SignatureSet},
};
use itertools::Itertools as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::{FAR_FUTURE_EPOCH, GENESIS_EPOCH},
        containers::{
            AggregateAndProof, Attestation, AttestationData, BeaconBlock, IndexedAttestation,
            SignedAggregateAndProof, SignedBeaconBlock, SignedVoluntaryExit, Validator,
            VoluntaryExit,
        },
        primitives::{PublicKeyBytes, SignatureBytes, Slot, ValidatorIndex, H256},
    },
    preset::Preset,
};

#[must_use]
pub fn public_key(validator_index: ValidatorIndex) -> PublicKeyBytes {
    let digest = Hasher::default().u64(validator_index).finish();
    let mut public_key = PublicKeyBytes::zero();
    public_key[..H256::len_bytes()].copy_from_slice(digest.as_bytes());
    public_key
}

#[must_use]
pub fn sign(message: H256, public_keys: &[PublicKeyBytes]) -> SignatureBytes {
    let digest = public_keys
        .iter()
        .fold(Hasher::default().h256(message), |hasher, public_key| {
            hasher.bytes(public_key)
        })
        .finish();

    let second = hashing::hash_256(digest);
    let third = hashing::hash_256(second);

    let mut signature = SignatureBytes::zero();
    signature[..32].copy_from_slice(digest.as_bytes());
    signature[32..64].copy_from_slice(second.as_bytes());
    signature[64..].copy_from_slice(third.as_bytes());
    signature
}

/// Accepts exactly the signatures produced by [`sign`] and counts how many batches it checked.
#[derive(Default, Debug)]
pub struct InsecureBatchVerifier {
    batches: AtomicUsize,
    sets: AtomicUsize,
}

impl InsecureBatchVerifier {
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

impl BatchVerifier for InsecureBatchVerifier {
    fn verify_batch(&self, sets: &[SignatureSet]) -> bool {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.sets.fetch_add(sets.len(), Ordering::SeqCst);

        sets.iter()
            .all(|set| set.signature == sign(set.message, &set.public_keys))
    }
}

/// A state at `slot` with `count` validators active since genesis and a nonzero RANDAO history.
#[must_use]
pub fn state_with_validators<P: Preset>(count: u64, slot: Slot) -> BeaconState<P> {
    let validators = (0..count)
        .map(|validator_index| Validator {
            pubkey: public_key(validator_index),
            effective_balance: P::MAX_EFFECTIVE_BALANCE,
            activation_eligibility_epoch: GENESIS_EPOCH,
            activation_epoch: GENESIS_EPOCH,
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
            ..Validator::default()
        })
        .collect_vec();

    let balances = vec![P::MAX_EFFECTIVE_BALANCE; validators.len()];

    let mut state = BeaconState {
        genesis_time: 1_606_824_023,
        genesis_validators_root: H256::repeat_byte(0x4b),
        slot,
        validators,
        balances,
        ..BeaconState::default()
    };

    for (mix, position) in state.randao_mixes.iter_mut().zip(0_u64..) {
        *mix = hashing::hash_256_64(H256::zero(), position);
    }

    state
}

pub fn sign_indexed_attestation<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    indexed_attestation: &mut IndexedAttestation,
) -> Result<()> {
    let public_keys = indexed_attestation
        .attesting_indices
        .iter()
        .map(|validator_index| accessors::public_key(state, *validator_index))
        .collect::<Result<Vec<_>>>()?;

    let message = indexed_attestation.data.signing_root(config, state);

    indexed_attestation.signature = sign(message, &public_keys);

    Ok(())
}

/// An attestation with the committee members at `positions` participating.
pub fn attestation<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    data: AttestationData,
    positions: &[usize],
) -> Result<Attestation> {
    let committee = accessors::beacon_committee(state, data.slot, data.index)?;
    let mut aggregation_bits = bitvec![u8, Lsb0; 0; committee.len()];

    for position in positions.iter().copied() {
        aggregation_bits.set(position, true);
    }

    let mut attestation = Attestation {
        aggregation_bits,
        data,
        signature: SignatureBytes::zero(),
    };

    let mut indexed_attestation =
        accessors::indexed_attestation_from_committee(&committee, &attestation)?;

    sign_indexed_attestation(config, state, &mut indexed_attestation)?;

    attestation.signature = indexed_attestation.signature;

    Ok(attestation)
}

#[must_use]
pub fn selection_proof<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    slot: Slot,
    validator_index: ValidatorIndex,
) -> SignatureBytes {
    sign(slot.signing_root(config, state), &[public_key(validator_index)])
}

/// The first member of the committee of `data` whose selection proof makes it an aggregator.
pub fn find_aggregator<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    data: AttestationData,
) -> Result<Option<ValidatorIndex>> {
    let committee = accessors::beacon_committee(state, data.slot, data.index)?;

    Ok(committee.iter().copied().find(|validator_index| {
        let selection_proof = selection_proof(config, state, data.slot, *validator_index);
        predicates::is_aggregator(committee.len(), selection_proof)
    }))
}

#[must_use]
pub fn signed_aggregate_and_proof<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    aggregate: Attestation,
    aggregator_index: ValidatorIndex,
) -> SignedAggregateAndProof {
    let message = AggregateAndProof {
        aggregator_index,
        selection_proof: selection_proof(config, state, aggregate.data.slot, aggregator_index),
        aggregate,
    };

    let signature = sign(
        message.signing_root(config, state),
        &[public_key(aggregator_index)],
    );

    SignedAggregateAndProof { message, signature }
}

#[must_use]
pub fn signed_voluntary_exit<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    voluntary_exit: VoluntaryExit,
) -> SignedVoluntaryExit {
    let signature = sign(
        voluntary_exit.signing_root(config, state),
        &[public_key(voluntary_exit.validator_index)],
    );

    SignedVoluntaryExit {
        message: voluntary_exit,
        signature,
    }
}

/// A block at `state.slot` built on `parent_root` and signed by the expected proposer.
pub fn signed_block<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    parent_root: H256,
) -> Result<SignedBeaconBlock> {
    let proposer_index = accessors::get_beacon_proposer_index(state)?;

    let block = BeaconBlock {
        slot: state.slot,
        proposer_index,
        parent_root,
        ..BeaconBlock::default()
    };

    Ok(sign_block(config, state, block))
}

/// Signs `block` with the key of its declared proposer.
#[must_use]
pub fn sign_block<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    block: BeaconBlock,
) -> SignedBeaconBlock {
    let signature = sign(block.signing_root(config, state), &[public_key(block.proposer_index)]);

    SignedBeaconBlock {
        message: block,
        signature,
    }
}

#[cfg(test)]
mod tests {
    use helper_functions::verifier::{SingleVerifier, Verifier as _};
    use types::{phase0::containers::Checkpoint, preset::Minimal};

    use super::*;

    #[test]
    fn public_keys_are_distinct() {
        assert_ne!(public_key(0), public_key(1));
    }

    #[test]
    fn insecure_verifier_checks_message_and_keys() {
        let verifier = InsecureBatchVerifier::default();
        let keys = [public_key(1), public_key(2)];
        let message = H256::repeat_byte(9);

        let set = |message, public_keys: &[PublicKeyBytes]| SignatureSet {
            message,
            signature: sign(H256::repeat_byte(9), &keys),
            public_keys: public_keys.to_vec(),
            kind: helper_functions::error::SignatureKind::Attestation,
        };

        assert!(verifier.verify_batch(&[set(message, &keys)]));
        assert!(!verifier.verify_batch(&[set(H256::zero(), &keys)]));
        assert!(!verifier.verify_batch(&[set(message, &keys[..1])]));
        assert_eq!(verifier.batch_count(), 3);
    }

    #[test]
    fn attestations_verify_against_their_state() -> Result<()> {
        let config = Config::minimal();
        let state = state_with_validators::<Minimal>(64, 9);
        let backend = InsecureBatchVerifier::default();

        let data = AttestationData {
            slot: 9,
            index: 0,
            target: Checkpoint {
                epoch: 1,
                root: H256::repeat_byte(1),
            },
            ..AttestationData::default()
        };

        let attestation = attestation(&config, &state, data, &[0, 1])?;
        let indexed_attestation = accessors::get_indexed_attestation(&state, &attestation)?;

        assert_eq!(indexed_attestation.attesting_indices.len(), 2);

        predicates::validate_indexed_attestation(
            &config,
            &state,
            &indexed_attestation,
            SingleVerifier::new(&backend),
        )?;

        let mut verifier = SingleVerifier::new(&backend);

        verifier.verify(slot_selection_proof_set(&config, &state, data.slot, 3))?;

        Ok(())
    }

    fn slot_selection_proof_set(
        config: &Config,
        state: &BeaconState<Minimal>,
        slot: Slot,
        validator_index: ValidatorIndex,
    ) -> SignatureSet {
        slot.signature_set(
            config,
            state,
            selection_proof(config, state, slot, validator_index),
            vec![public_key(validator_index)],
        )
    }

    #[test]
    fn blocks_are_signed_by_the_expected_proposer() -> Result<()> {
        let config = Config::minimal();
        let state = state_with_validators::<Minimal>(64, 9);
        let signed_block = signed_block(&config, &state, H256::repeat_byte(2))?;

        assert_eq!(
            signed_block.message.proposer_index,
            accessors::get_beacon_proposer_index(&state)?,
        );

        Ok(())
    }
}
