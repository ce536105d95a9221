use serde::{Deserialize, Serialize};

/// Declares an integer-backed identifier newtype.
///
/// Every record in the system is keyed by a store-assigned `i64`. Wrapping each
/// key in its own type keeps a product id from being passed where a warehouse
/// id is expected.
macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw store identifier.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw store identifier.
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

record_id!(
    /// Identifier of an order in the order ledger.
    OrderId
);

record_id!(
    /// Opaque identifier of the acting user, supplied by the authentication layer.
    UserId
);

record_id!(
    /// Identifier of a product.
    ProductId
);

record_id!(
    /// Identifier of a physical warehouse.
    WarehouseId
);
