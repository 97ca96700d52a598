//! Typed ID wrappers for type-safe entity references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines a newtype ID wrapping a `u32`, with the usual conversions.
macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub const fn new(id: u32) -> Self {
                Self(id)
            }

            #[inline]
            pub const fn as_u32(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(NodeId, "Unique identifier for a map node");
define_id!(RobotId, "Unique identifier for an AGV");
define_id!(ShelfId, "Unique identifier for a mobile shelf (its home node id)");
define_id!(TaskId, "Unique identifier for a picking task");

/// Monotonic id generator for a single id type, used where the domain itself
/// doesn't hand out ids (e.g. operator-submitted tasks use whatever id the
/// operator gave them; this is for anything assigned internally).
#[derive(Debug, Clone)]
pub struct IdGenerator<T> {
    next: u32,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Default for IdGenerator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: From<u32>> IdGenerator<T> {
    pub fn new() -> Self {
        Self {
            next: 0,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn next(&mut self) -> T {
        let id = self.next;
        self.next += 1;
        T::from(id)
    }
}
