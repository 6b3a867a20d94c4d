use anyhow::Result;
use types::{
    config::Config,
    object_root::ObjectRoot,
    phase0::{
        beacon_state::BeaconState,
        consts::{
            DOMAIN_AGGREGATE_AND_PROOF, DOMAIN_BEACON_ATTESTER, DOMAIN_BEACON_PROPOSER,
            DOMAIN_SELECTION_PROOF, DOMAIN_VOLUNTARY_EXIT,
        },
        containers::{
            AggregateAndProof, AttestationData, BeaconBlock, IndexedAttestation, VoluntaryExit,
        },
        primitives::{DomainType, PublicKeyBytes, SignatureBytes, Slot, H256},
    },
    preset::Preset,
};

use crate::{
    accessors,
    error::SignatureKind,
    misc,
    verifier::{SignatureSet, Verifier},
};

/// Objects signed with a domain derived from the fork of the state they are verified against.
pub trait SignForSingleFork<P: Preset>: ObjectRoot {
    const DOMAIN_TYPE: DomainType;
    const SIGNATURE_KIND: SignatureKind;

    fn signing_root(&self, config: &Config, beacon_state: &BeaconState<P>) -> H256 {
        let domain = accessors::get_domain(config, beacon_state, Self::DOMAIN_TYPE);
        misc::compute_signing_root(self.object_root(), domain)
    }

    fn signature_set(
        &self,
        config: &Config,
        beacon_state: &BeaconState<P>,
        signature: SignatureBytes,
        public_keys: Vec<PublicKeyBytes>,
    ) -> SignatureSet {
        SignatureSet {
            message: self.signing_root(config, beacon_state),
            signature,
            public_keys,
            kind: Self::SIGNATURE_KIND,
        }
    }

    fn verify(
        &self,
        config: &Config,
        beacon_state: &BeaconState<P>,
        signature: SignatureBytes,
        public_key: PublicKeyBytes,
        mut verifier: impl Verifier,
    ) -> Result<()> {
        verifier.verify(self.signature_set(config, beacon_state, signature, vec![public_key]))
    }
}

impl<P: Preset> SignForSingleFork<P> for AggregateAndProof {
    const DOMAIN_TYPE: DomainType = DOMAIN_AGGREGATE_AND_PROOF;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::AggregateAndProof;
}

impl<P: Preset> SignForSingleFork<P> for AttestationData {
    const DOMAIN_TYPE: DomainType = DOMAIN_BEACON_ATTESTER;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::Attestation;
}

impl<P: Preset> SignForSingleFork<P> for BeaconBlock {
    const DOMAIN_TYPE: DomainType = DOMAIN_BEACON_PROPOSER;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::Block;
}

// Selection proofs sign the slot being aggregated.
impl<P: Preset> SignForSingleFork<P> for Slot {
    const DOMAIN_TYPE: DomainType = DOMAIN_SELECTION_PROOF;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::SelectionProof;
}

impl<P: Preset> SignForSingleFork<P> for VoluntaryExit {
    const DOMAIN_TYPE: DomainType = DOMAIN_VOLUNTARY_EXIT;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::VoluntaryExit;
}

/// The aggregate signature of `indexed_attestation` over the public keys of its attesters.
pub fn indexed_attestation_signature_set<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    indexed_attestation: &IndexedAttestation,
) -> Result<SignatureSet> {
    let public_keys = indexed_attestation
        .attesting_indices
        .iter()
        .map(|validator_index| accessors::public_key(state, *validator_index))
        .collect::<Result<_>>()?;

    Ok(indexed_attestation.data.signature_set(
        config,
        state,
        indexed_attestation.signature,
        public_keys,
    ))
}
