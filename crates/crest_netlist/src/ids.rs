//! Opaque ID newtypes for netlist entities.
//!
//! Each ID is a thin `u32` wrapper that is `Copy`, `Hash`, and
//! `Serialize`/`Deserialize`. IDs are created by
//! [`Arena::alloc`](crate::arena::Arena::alloc) and used for O(1) lookup.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a signal in the prepared netlist.
    SignalId
);

define_id!(
    /// Opaque, copyable ID for a clock domain.
    DomainId
);

define_id!(
    /// Opaque, copyable ID for a primitive cell.
    CellId
);
