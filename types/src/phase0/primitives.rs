use fixed_hash::construct_fixed_hash;

pub use ethereum_types::{H256, H32};

pub type CommitteeIndex = u64;
pub type Domain = H256;
pub type DomainType = H32;
pub type Epoch = u64;
pub type Gwei = u64;
pub type Slot = u64;
pub type SubnetId = u64;
pub type UnixSeconds = u64;
pub type ValidatorIndex = u64;
pub type Version = H32;

// Public keys and signatures are kept in compressed form.
// Decompressing and checking them is left to the `BatchVerifier` implementation.
construct_fixed_hash! {
    pub struct PublicKeyBytes(48);
}

construct_fixed_hash! {
    pub struct SignatureBytes(96);
}

impl SignatureBytes {
    /// The point at infinity in compressed form.
    #[must_use]
    pub fn empty() -> Self {
        let mut bytes = Self::zero();
        bytes.0[0] = 0xc0;
        bytes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }
}
