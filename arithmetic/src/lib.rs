use core::num::NonZeroU64;

use easy_ext::ext;
use typenum::{NonZero, Unsigned};

#[ext(NonZeroExt)]
pub impl<N: Unsigned + NonZero> N {
    #[inline]
    #[must_use]
    fn non_zero() -> NonZeroU64 {
        NonZeroU64::new(Self::U64).expect("the bound on N ensures that it is nonzero")
    }
}

#[ext(U64Ext)]
pub impl u64 {
    #[inline]
    #[must_use]
    fn is_multiple_of_typenum<N: Unsigned + NonZero>(self) -> bool {
        self % N::U64 == 0
    }

    #[inline]
    #[must_use]
    fn prev_multiple_of(self, factor: NonZeroU64) -> Self {
        self - self % factor
    }

    #[inline]
    #[must_use]
    fn div_typenum<N: Unsigned + NonZero>(self) -> Self {
        self / N::U64
    }

    #[inline]
    #[must_use]
    fn mod_typenum<N: Unsigned + NonZero>(self) -> Self {
        self % N::U64
    }

    #[inline]
    #[must_use]
    fn mul_typenum<N: Unsigned>(self) -> Option<u64> {
        self.checked_mul(N::U64)
    }
}

#[cfg(test)]
mod tests {
    use nonzero_ext::nonzero;
    use test_case::test_case;
    use typenum::{U32, U8};

    use super::*;

    #[test_case(0 => 0)]
    #[test_case(7 => 0)]
    #[test_case(8 => 1)]
    #[test_case(17 => 2)]
    fn div_typenum_floors(value: u64) -> u64 {
        value.div_typenum::<U8>()
    }

    #[test]
    fn mod_and_multiples() {
        assert_eq!(33.mod_typenum::<U32>(), 1);
        assert!(64.is_multiple_of_typenum::<U32>());
        assert!(!65.is_multiple_of_typenum::<U32>());
        assert_eq!(70.prev_multiple_of(nonzero!(32_u64)), 64);
        assert_eq!(U8::non_zero().get(), 8);
    }

    #[test]
    fn mul_typenum_detects_overflow() {
        assert_eq!(2.mul_typenum::<U8>(), Some(16));
        assert_eq!(u64::MAX.mul_typenum::<U8>(), None);
    }
}
