//! The seam between the adapter and the values it protects.
//!
//! The binding and substitution engine never looks inside a default value. Everything
//! it needs to know is expressed by [`DefaultValue`]: whether two values are the very
//! same object, whether a value is of a kind that needs no copying, and how to produce
//! shallow and deep copies. The native [`Object`](crate::Object) model implements it,
//! and so does the Python extension for `Py<PyAny>`.

use std::fmt;

/// Opaque identity token of a value with reference semantics.
///
/// Two values with equal `ObjectId`s are the same underlying object. The token is the
/// address of the value's shared storage, so it is only meaningful while the value is
/// alive, which the wrapper guarantees for every default it records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Creates an identity token from a storage address.
    #[inline]
    #[must_use]
    pub fn from_addr(addr: usize) -> Self {
        Self(addr)
    }

    /// Returns the raw address value.
    #[inline]
    #[must_use]
    pub fn addr(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A value that can be recorded as a parameter default and copied per call.
///
/// Implementations must uphold two rules:
/// - `identity()` returns the same token for clones that alias one object, and
///   different tokens for distinct live objects;
/// - `shallow_copy()` and `deep_copy()` of a value that is not immutable return an
///   object whose identity differs from the original.
pub trait DefaultValue: Clone + Send + Sync {
    /// Error raised when a value refuses to be copied.
    type Error;

    /// Returns the identity of the underlying object, if it has one.
    ///
    /// Immediates (small ints, bools, `None`) may return `None`: they can never alias
    /// a mutable object.
    fn identity(&self) -> Option<ObjectId>;

    /// Whether this value belongs to a known-immutable kind that never needs copying.
    fn is_immutable(&self) -> bool;

    /// Duplicates the top-level container only; nested members stay shared.
    fn shallow_copy(&self) -> Result<Self, Self::Error>;

    /// Recursively duplicates all nested mutable structure.
    fn deep_copy(&self) -> Result<Self, Self::Error>;

    /// Identity comparison (`is` in Python), never value equality.
    fn is_same(&self, other: &Self) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
