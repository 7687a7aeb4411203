//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in the simulation has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. All IDs use UUID v7
//! (time-ordered) for efficient database indexing.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
        )]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }

            /// Fold the identifier into 64 bits, for seeding per-entity
            /// random streams.
            pub const fn seed_bits(self) -> u64 {
                let (high, low) = self.0.as_u64_pair();
                high ^ low
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a game (one independent world).
    GameId
}

define_id! {
    /// Unique identifier for a player. Issued by the external account
    /// service; the simulation only stores and compares it.
    PlayerId
}

define_id! {
    /// Unique identifier for a mobile unit (settlers, scouts, ...).
    UnitId
}

define_id! {
    /// Unique identifier for a settlement.
    SettlementId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = GameId::new();
        let b = GameId::new();
        assert_ne!(a, b);
        assert_ne!(a.into_inner(), Uuid::nil());
    }

    #[test]
    fn seed_bits_are_stable_for_same_id() {
        let id = SettlementId::from(Uuid::from_u64_pair(0xF0F0, 0x0F0F));
        assert_eq!(id.seed_bits(), 0xF0F0 ^ 0x0F0F);
        assert_eq!(id.seed_bits(), id.seed_bits());
    }

    #[test]
    fn id_roundtrips_through_uuid() {
        let id = PlayerId::new();
        let raw: Uuid = id.into();
        assert_eq!(PlayerId::from(raw), id);
        assert_eq!(id.to_string(), raw.to_string());
    }
}
