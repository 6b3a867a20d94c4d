/// Position of an epoch relative to the epoch of a state.
///
/// Committees can only be computed for these three epochs without advancing the state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RelativeEpoch {
    Previous,
    Current,
    Next,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum SignatureStatus {
    #[default]
    Unverified,
    /// Verified upstream, for example by the producer of a block containing the object.
    Verified,
}

impl SignatureStatus {
    #[must_use]
    pub const fn needs_verification(self) -> bool {
        matches!(self, Self::Unverified)
    }
}
