//! Small general purpose utilities

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

/// Newtype around a reference which uses referential equality and hashing
///
/// Interned data is deduplicated at construction, so two references to it are
/// interchangeable exactly when they are pointer-equal. Wrapping them in
/// `RefId` lets maps key off that pointer instead of re-hashing the contents.
pub struct RefId<'a, T: ?Sized>(pub &'a T);

impl<'a, T: ?Sized> RefId<'a, T> {
    /// Check referential equality of two references
    pub fn same(left: &'a T, right: &'a T) -> bool {
        std::ptr::eq(left, right)
    }
}

impl<'a, T: ?Sized> Clone for RefId<'a, T> {
    fn clone(&self) -> Self {
        RefId(self.0)
    }
}

impl<'a, T: ?Sized> Copy for RefId<'a, T> {}

impl<'a, T: ?Sized> Hash for RefId<'a, T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.0, state)
    }
}

impl<'a, T: ?Sized> PartialEq for RefId<'a, T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl<'a, T: ?Sized> Eq for RefId<'a, T> {}

impl<'a, T: ?Sized> Deref for RefId<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.0
    }
}

impl<'a, T: fmt::Debug + ?Sized> fmt::Debug for RefId<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}
