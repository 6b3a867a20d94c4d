pub mod accessors;
pub mod error;
pub mod exit_queue;
pub mod misc;
pub mod mutators;
pub mod predicates;
pub mod signing;
pub mod verifier;
