pub mod unphased {
    pub use block_processing::{
        process_attester_slashing, process_voluntary_exit, validate_attester_slashing_with_verifier,
        validate_voluntary_exit,
    };
    pub use epoch_processing::process_registry_updates;
    pub use error::Error;

    mod block_processing;
    mod epoch_processing;
    mod error;
}
