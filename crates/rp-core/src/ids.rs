//! Strongly typed, zero-cost identifier wrappers.
//!
//! Every id the backend hands out is an opaque 32-bit integer.  Wrapping them
//! keeps a replicant id from being passed where a body-part object id is
//! expected, which is the most common mistake when assembling instructions.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            #[inline(always)]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$inner> for $name {
            #[inline(always)]
            fn from(raw: $inner) -> $name {
                $name(raw)
            }
        }
    };
}

typed_id! {
    /// Id of a replicant (the agent's root object in the simulation).
    pub struct ReplicantId(u32);
}

typed_id! {
    /// Id of any other simulation object: body parts, props, containers.
    pub struct ObjectId(u32);
}

impl ReplicantId {
    /// A replicant is itself an object; body-part and collision records refer
    /// to it through the object id space.
    #[inline]
    pub fn as_object(self) -> ObjectId {
        ObjectId(self.0)
    }

    /// Avatar (camera) id used by image-sensor instructions.
    pub fn avatar_id(self) -> String {
        self.0.to_string()
    }
}
