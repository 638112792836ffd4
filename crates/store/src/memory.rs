use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use schema::relationships::Relationship;
use schema::{
    Customer, CustomerId, CustomerWithOrders, EntityKind, Item, ItemId, ItemWithMenus, Menu,
    MenuId, MenuWithItem, NewCustomer, NewItem, NewMenu, NewOrder, NewOrderDetail, Order,
    OrderDetail, OrderDetailId, OrderId, OrderWithDetails, Validate,
};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::{
    Result, StoreError,
    store::{Store, Transaction, ensure_references},
};

/// Column access used by the generic relationship walk.
trait Row {
    fn id(&self) -> i64;
    fn column(&self, column: &str) -> Option<i64>;
}

impl Row for Item {
    fn id(&self) -> i64 {
        self.id.as_i64()
    }

    fn column(&self, _column: &str) -> Option<i64> {
        None
    }
}

impl Row for Menu {
    fn id(&self) -> i64 {
        self.id.as_i64()
    }

    fn column(&self, column: &str) -> Option<i64> {
        (column == "item_id").then(|| self.item_id.as_i64())
    }
}

impl Row for Customer {
    fn id(&self) -> i64 {
        self.id.as_i64()
    }

    fn column(&self, _column: &str) -> Option<i64> {
        None
    }
}

impl Row for Order {
    fn id(&self) -> i64 {
        self.id.as_i64()
    }

    fn column(&self, column: &str) -> Option<i64> {
        (column == "customer_id").then(|| self.customer_id.as_i64())
    }
}

impl Row for OrderDetail {
    fn id(&self) -> i64 {
        self.id.as_i64()
    }

    fn column(&self, column: &str) -> Option<i64> {
        match column {
            "order_id" => Some(self.order_id.as_i64()),
            "customer_id" => Some(self.customer_id.as_i64()),
            "item_id" => Some(self.item_id.as_i64()),
            _ => None,
        }
    }
}

/// Email comparison matching the `lower(email)` unique index in PostgreSQL.
fn same_email(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn referencing<R: Row>(rows: &BTreeMap<i64, R>, column: &str, parent_id: i64) -> Vec<i64> {
    rows.values()
        .filter(|row| row.column(column) == Some(parent_id))
        .map(Row::id)
        .collect()
}

#[derive(Debug, Clone, Default)]
struct Tables {
    items: BTreeMap<i64, Item>,
    menus: BTreeMap<i64, Menu>,
    customers: BTreeMap<i64, Customer>,
    orders: BTreeMap<i64, Order>,
    details: BTreeMap<i64, OrderDetail>,
    sequences: HashMap<EntityKind, i64>,
}

impl Tables {
    fn next_id(&mut self, kind: EntityKind) -> i64 {
        let seq = self.sequences.entry(kind).or_insert(0);
        *seq += 1;
        *seq
    }

    fn contains(&self, kind: EntityKind, id: i64) -> bool {
        match kind {
            EntityKind::Item => self.items.contains_key(&id),
            EntityKind::Menu => self.menus.contains_key(&id),
            EntityKind::Customer => self.customers.contains_key(&id),
            EntityKind::Order => self.orders.contains_key(&id),
            EntityKind::OrderDetail => self.details.contains_key(&id),
        }
    }

    fn len(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Item => self.items.len(),
            EntityKind::Menu => self.menus.len(),
            EntityKind::Customer => self.customers.len(),
            EntityKind::Order => self.orders.len(),
            EntityKind::OrderDetail => self.details.len(),
        }
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.customers
            .values()
            .any(|c| same_email(&c.email, email) && Some(c.id.as_i64()) != except)
    }

    fn item_with_menus(&self, item: &Item) -> ItemWithMenus {
        ItemWithMenus {
            item: item.clone(),
            menus: self
                .menus
                .values()
                .filter(|m| m.item_id == item.id)
                .cloned()
                .collect(),
        }
    }

    fn order_with_details(&self, order: &Order) -> OrderWithDetails {
        OrderWithDetails {
            order: order.clone(),
            order_details: self
                .details
                .values()
                .filter(|d| d.order_id == order.id)
                .cloned()
                .collect(),
        }
    }
}

/// In-memory store implementation for testing and local runs.
///
/// A transaction holds the write lock for its whole lifetime and works on a
/// staged copy of the tables, so transactions are serialized and readers
/// observe either all of a transaction's writes or none of them. A unit of
/// work must therefore only use its transaction, never the store's read
/// methods.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let guard = self.tables.clone().write_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, staged }))
    }

    async fn find_item(&self, id: ItemId) -> Result<Option<ItemWithMenus>> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .get(&id.as_i64())
            .map(|item| tables.item_with_menus(item)))
    }

    async fn list_items(&self) -> Result<Vec<ItemWithMenus>> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .values()
            .map(|item| tables.item_with_menus(item))
            .collect())
    }

    async fn list_menus(&self) -> Result<Vec<MenuWithItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .menus
            .values()
            .filter_map(|menu| {
                tables
                    .items
                    .get(&menu.item_id.as_i64())
                    .map(|item| MenuWithItem {
                        menu: menu.clone(),
                        item: item.clone(),
                    })
            })
            .collect())
    }

    async fn find_customer(&self, id: CustomerId) -> Result<Option<CustomerWithOrders>> {
        let tables = self.tables.read().await;
        Ok(tables
            .customers
            .get(&id.as_i64())
            .map(|customer| CustomerWithOrders {
                customer: customer.clone(),
                orders: tables
                    .orders
                    .values()
                    .filter(|o| o.customer_id == customer.id)
                    .map(|o| tables.order_with_details(o))
                    .collect(),
            }))
    }

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .customers
            .values()
            .find(|c| same_email(&c.email, email))
            .cloned())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let tables = self.tables.read().await;
        Ok(tables.customers.values().cloned().collect())
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<OrderWithDetails>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .get(&id.as_i64())
            .map(|order| tables.order_with_details(order)))
    }

    async fn list_orders(&self) -> Result<Vec<OrderWithDetails>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .map(|order| tables.order_with_details(order))
            .collect())
    }

    async fn count(&self, kind: EntityKind) -> Result<u64> {
        Ok(self.tables.read().await.len(kind) as u64)
    }
}

/// Transaction over a staged copy of the tables.
pub struct InMemoryTransaction {
    guard: OwnedRwLockWriteGuard<Tables>,
    staged: Tables,
}

impl InMemoryTransaction {
    fn require(&self, kind: EntityKind, id: i64) -> Result<()> {
        if self.staged.contains(kind, id) {
            Ok(())
        } else {
            Err(StoreError::not_found(kind, id))
        }
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn exists(&mut self, kind: EntityKind, id: i64) -> Result<bool> {
        Ok(self.staged.contains(kind, id))
    }

    async fn dependents(&mut self, rel: &Relationship, parent_id: i64) -> Result<Vec<i64>> {
        let tables = &self.staged;
        Ok(match rel.child {
            EntityKind::Item => referencing(&tables.items, rel.column, parent_id),
            EntityKind::Menu => referencing(&tables.menus, rel.column, parent_id),
            EntityKind::Customer => referencing(&tables.customers, rel.column, parent_id),
            EntityKind::Order => referencing(&tables.orders, rel.column, parent_id),
            EntityKind::OrderDetail => referencing(&tables.details, rel.column, parent_id),
        })
    }

    async fn remove_row(&mut self, kind: EntityKind, id: i64) -> Result<()> {
        let tables = &mut self.staged;
        let removed = match kind {
            EntityKind::Item => tables.items.remove(&id).is_some(),
            EntityKind::Menu => tables.menus.remove(&id).is_some(),
            EntityKind::Customer => tables.customers.remove(&id).is_some(),
            EntityKind::Order => tables.orders.remove(&id).is_some(),
            EntityKind::OrderDetail => tables.details.remove(&id).is_some(),
        };
        if removed {
            Ok(())
        } else {
            Err(StoreError::not_found(kind, id))
        }
    }

    async fn create_item(&mut self, item: NewItem) -> Result<Item> {
        item.validate()?;
        let id = self.staged.next_id(EntityKind::Item);
        let item = item.into_item(ItemId::new(id));
        self.staged.items.insert(id, item.clone());
        Ok(item)
    }

    async fn create_menu(&mut self, menu: NewMenu) -> Result<Menu> {
        menu.validate()?;
        ensure_references(self, &menu).await?;
        let id = self.staged.next_id(EntityKind::Menu);
        let menu = menu.into_menu(MenuId::new(id));
        self.staged.menus.insert(id, menu.clone());
        Ok(menu)
    }

    async fn create_customer(&mut self, customer: NewCustomer) -> Result<Customer> {
        customer.validate()?;
        if self.staged.email_taken(&customer.email, None) {
            return Err(StoreError::Conflict(format!(
                "email {} is already registered",
                customer.email
            )));
        }
        let id = self.staged.next_id(EntityKind::Customer);
        let customer = customer.into_customer(CustomerId::new(id));
        self.staged.customers.insert(id, customer.clone());
        Ok(customer)
    }

    async fn create_order(&mut self, order: NewOrder) -> Result<Order> {
        order.validate()?;
        ensure_references(self, &order).await?;
        let id = self.staged.next_id(EntityKind::Order);
        let order = order.into_order(OrderId::new(id));
        self.staged.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn create_order_detail(&mut self, detail: NewOrderDetail) -> Result<OrderDetail> {
        detail.validate()?;
        ensure_references(self, &detail).await?;
        let id = self.staged.next_id(EntityKind::OrderDetail);
        let detail = detail.into_detail(OrderDetailId::new(id));
        self.staged.details.insert(id, detail.clone());
        Ok(detail)
    }

    async fn update_item(&mut self, id: ItemId, item: NewItem) -> Result<Item> {
        self.require(EntityKind::Item, id.as_i64())?;
        item.validate()?;
        let item = item.into_item(id);
        self.staged.items.insert(id.as_i64(), item.clone());
        Ok(item)
    }

    async fn update_menu(&mut self, id: MenuId, menu: NewMenu) -> Result<Menu> {
        self.require(EntityKind::Menu, id.as_i64())?;
        menu.validate()?;
        ensure_references(self, &menu).await?;
        let menu = menu.into_menu(id);
        self.staged.menus.insert(id.as_i64(), menu.clone());
        Ok(menu)
    }

    async fn update_customer(
        &mut self,
        id: CustomerId,
        customer: NewCustomer,
    ) -> Result<Customer> {
        self.require(EntityKind::Customer, id.as_i64())?;
        customer.validate()?;
        if self.staged.email_taken(&customer.email, Some(id.as_i64())) {
            return Err(StoreError::Conflict(format!(
                "email {} is already registered",
                customer.email
            )));
        }
        let customer = customer.into_customer(id);
        self.staged.customers.insert(id.as_i64(), customer.clone());
        Ok(customer)
    }

    async fn update_order(&mut self, id: OrderId, order: NewOrder) -> Result<Order> {
        self.require(EntityKind::Order, id.as_i64())?;
        order.validate()?;
        ensure_references(self, &order).await?;
        let order = order.into_order(id);
        self.staged.orders.insert(id.as_i64(), order.clone());
        Ok(order)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
