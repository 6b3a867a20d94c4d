use thiserror::Error;

use crate::phase0::primitives::ValidatorIndex;

#[derive(Debug, Error)]
pub enum Error {
    #[error("validator index {validator_index} is out of bounds")]
    ValidatorIndexOutOfBounds { validator_index: ValidatorIndex },
}
