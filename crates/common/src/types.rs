use serde::{Deserialize, Serialize};

/// Declares a store-assigned integer identifier.
///
/// Each identifier wraps the row id handed out by the store so that a
/// product id can never be passed where a client id is expected.
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from a raw row id.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw row id.
            pub const fn as_i64(&self) -> i64 {
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

row_id!(
    /// Identifier of a client in the catalog.
    ClientId
);

row_id!(
    /// Identifier of a product in the catalog.
    ProductId
);

row_id!(
    /// Identifier of a committed sale.
    SaleId
);

row_id!(
    /// Identifier of a line item belonging to a sale.
    LineItemId
);

/// The kind of record a lookup refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Client,
    Product,
    Sale,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Client => f.write_str("client"),
            Entity::Product => f.write_str("product"),
            Entity::Sale => f.write_str("sale"),
        }
    }
}
