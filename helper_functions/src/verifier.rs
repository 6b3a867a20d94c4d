#![expect(clippy::module_name_repetitions)]

use anyhow::{ensure, Result};
use static_assertions::assert_obj_safe;
use types::phase0::primitives::{PublicKeyBytes, SignatureBytes, H256};

use crate::error::{Error, SignatureKind};

/// A signature together with everything needed to check it.
///
/// `public_keys` are aggregated before verification.
/// A set with a single key is an ordinary signature.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SignatureSet {
    pub message: H256,
    pub signature: SignatureBytes,
    pub public_keys: Vec<PublicKeyBytes>,
    pub kind: SignatureKind,
}

/// Cryptographic backend.
///
/// Implementations may be slow and are expected to be called from a blocking context.
pub trait BatchVerifier: Send + Sync {
    /// Returns `true` only if every set in `sets` is valid.
    fn verify_batch(&self, sets: &[SignatureSet]) -> bool;
}

assert_obj_safe!(BatchVerifier);

pub trait Verifier {
    const IS_NULL: bool;

    fn reserve(&mut self, additional: usize);

    fn verify(&mut self, signature_set: SignatureSet) -> Result<()>;

    fn finish(&self) -> Result<()>;
}

impl<V: Verifier> Verifier for &mut V {
    const IS_NULL: bool = V::IS_NULL;

    #[inline]
    fn reserve(&mut self, additional: usize) {
        (*self).reserve(additional);
    }

    #[inline]
    fn verify(&mut self, signature_set: SignatureSet) -> Result<()> {
        (*self).verify(signature_set)
    }

    #[inline]
    fn finish(&self) -> Result<()> {
        (**self).finish()
    }
}

/// Skips verification. Used for objects whose signatures were checked elsewhere.
pub struct NullVerifier;

impl Verifier for NullVerifier {
    const IS_NULL: bool = true;

    #[inline]
    fn reserve(&mut self, _additional: usize) {}

    #[inline]
    fn verify(&mut self, _signature_set: SignatureSet) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn finish(&self) -> Result<()> {
        Ok(())
    }
}

/// Verifies every set as soon as it is passed in.
#[derive(Clone, Copy)]
pub struct SingleVerifier<'backend> {
    backend: &'backend dyn BatchVerifier,
}

impl<'backend> SingleVerifier<'backend> {
    #[must_use]
    pub fn new(backend: &'backend dyn BatchVerifier) -> Self {
        Self { backend }
    }
}

impl Verifier for SingleVerifier<'_> {
    const IS_NULL: bool = false;

    #[inline]
    fn reserve(&mut self, _additional: usize) {}

    fn verify(&mut self, signature_set: SignatureSet) -> Result<()> {
        let kind = signature_set.kind;

        ensure!(
            self.backend.verify_batch(&[signature_set]),
            Error::SignatureInvalid(kind),
        );

        Ok(())
    }

    #[inline]
    fn finish(&self) -> Result<()> {
        Ok(())
    }
}

/// Collects sets and verifies them all at once in [`Verifier::finish`].
pub struct MultiVerifier<'backend> {
    backend: &'backend dyn BatchVerifier,
    signature_sets: Vec<SignatureSet>,
}

impl<'backend> MultiVerifier<'backend> {
    #[must_use]
    pub fn new(backend: &'backend dyn BatchVerifier) -> Self {
        Self {
            backend,
            signature_sets: vec![],
        }
    }

    #[must_use]
    pub fn into_signature_sets(self) -> Vec<SignatureSet> {
        self.signature_sets
    }
}

impl Verifier for MultiVerifier<'_> {
    const IS_NULL: bool = false;

    #[inline]
    fn reserve(&mut self, additional: usize) {
        self.signature_sets.reserve_exact(additional);
    }

    #[inline]
    fn verify(&mut self, signature_set: SignatureSet) -> Result<()> {
        self.signature_sets.push(signature_set);
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        let kind = match self.signature_sets.as_slice() {
            [] => return Ok(()),
            [signature_set] => signature_set.kind,
            _ => SignatureKind::Multi,
        };

        ensure!(
            self.backend.verify_batch(&self.signature_sets),
            Error::SignatureInvalid(kind),
        );

        Ok(())
    }
}
