use serde::{Deserialize, Serialize};

/// The persisted entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Item,
    Menu,
    Customer,
    Order,
    OrderDetail,
}

impl EntityKind {
    /// Name of the backing SQL table.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Item => "items",
            EntityKind::Menu => "menus",
            EntityKind::Customer => "customers",
            EntityKind::Order => "orders",
            EntityKind::OrderDetail => "order_details",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Item => "Item",
            EntityKind::Menu => "Menu",
            EntityKind::Customer => "Customer",
            EntityKind::Order => "Order",
            EntityKind::OrderDetail => "OrderDetail",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
