//! Gossip validation of attestations, aggregates and blocks.
//!
//! Every pipeline is a method on [`GossipValidator`] that either admits a message or returns an
//! error that can be classified as [`Classification::Reject`] (the sender misbehaved) or
//! [`Classification::Ignore`] (the message is unusable now but not provably invalid).
//! The `accept_*` methods turn those results into a [`MessageAcceptance`] for the gossip router.

pub use crate::{
    acceptance::MessageAcceptance,
    attestation::AttestationOrigin,
    capabilities::{ForkChoice, StateRegen},
    error::{
        AggregateAndProofError, AttestationError, BlockError, Classification, ValidationError,
    },
    pending::{PendingMessage, PendingMessages, DEFAULT_PENDING_CAPACITY},
    validator::GossipValidator,
};

mod acceptance;
mod aggregate_and_proof;
mod attestation;
mod block;
mod capabilities;
mod error;
mod pending;
mod validator;

#[cfg(test)]
mod helpers;
