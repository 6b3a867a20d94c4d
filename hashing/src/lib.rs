use ethereum_types::H256;
use sha2::{Digest as _, Sha256};

#[inline]
#[must_use]
pub fn hash_bytes(bytes: impl AsRef<[u8]>) -> H256 {
    H256(Sha256::digest(bytes).into())
}

#[inline]
#[must_use]
pub fn hash_256(bytes: H256) -> H256 {
    hash_bytes(bytes)
}

#[inline]
#[must_use]
pub fn hash_256_8(a: H256, b: u8) -> H256 {
    Hasher::default().h256(a).u8(b).finish()
}

#[inline]
#[must_use]
pub fn hash_256_8_32(a: H256, b: u8, c: u32) -> H256 {
    Hasher::default().h256(a).u8(b).bytes(c.to_le_bytes()).finish()
}

#[inline]
#[must_use]
pub fn hash_256_64(a: H256, b: u64) -> H256 {
    Hasher::default().h256(a).u64(b).finish()
}

#[inline]
#[must_use]
pub fn hash_256_256(left: H256, right: H256) -> H256 {
    Hasher::default().h256(left).h256(right).finish()
}

// Only ever called with `SignatureBytes`, which lives in `types` and would create a cycle.
#[inline]
#[must_use]
pub fn hash_768(bytes: impl AsRef<[u8]>) -> H256 {
    let bytes = bytes.as_ref();
    debug_assert_eq!(bytes.len(), 96);
    hash_bytes(bytes)
}

/// Incremental SHA-256 over fixed-width little-endian fields.
///
/// Every field has a fixed width, so concatenation is unambiguous without length prefixes.
/// Variable-length data must be preceded by its length using [`Hasher::u64`].
#[derive(Default, Clone)]
pub struct Hasher(Sha256);

impl Hasher {
    #[must_use]
    pub fn u8(mut self, value: u8) -> Self {
        self.0.update([value]);
        self
    }

    #[must_use]
    pub fn u64(mut self, value: u64) -> Self {
        self.0.update(value.to_le_bytes());
        self
    }

    #[must_use]
    pub fn bool(self, value: bool) -> Self {
        self.u8(value.into())
    }

    #[must_use]
    pub fn h256(mut self, value: H256) -> Self {
        self.0.update(value.as_bytes());
        self
    }

    #[must_use]
    pub fn bytes(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.0.update(bytes);
        self
    }

    #[must_use]
    pub fn finish(self) -> H256 {
        H256(self.0.finalize().into())
    }
}
