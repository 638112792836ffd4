use serde::{Deserialize, Serialize};

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database identity.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw identity value.
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
    /// Identity of a catalog item.
    ItemId
);
row_id!(
    /// Identity of a size/price menu entry.
    MenuId
);
row_id!(
    /// Identity of a customer.
    CustomerId
);
row_id!(
    /// Identity of an order.
    OrderId
);
row_id!(
    /// Identity of a single order line.
    OrderDetailId
);
