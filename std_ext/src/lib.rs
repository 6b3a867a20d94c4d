use std::sync::Arc;

use easy_ext::ext;

#[ext(ArcExt)]
pub impl<T: ?Sized> Arc<T> {
    /// Clones the pointer, not the value behind it.
    #[must_use]
    fn clone_arc(&self) -> Self {
        Self::clone(self)
    }

    /// Copy-on-write access. Other holders of the same `Arc` keep seeing the old value.
    fn make_mut_cow(&mut self) -> &mut T
    where
        T: Clone,
    {
        Self::make_mut(self)
    }
}
