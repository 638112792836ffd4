use async_trait::async_trait;
use futures_util::future::BoxFuture;
use schema::relationships::{DeletePolicy, Relationship, dependents_of};
use schema::{
    Customer, CustomerId, CustomerWithOrders, EntityKind, Item, ItemId, ItemWithMenus, Menu,
    MenuId, MenuWithItem, NewCustomer, NewItem, NewMenu, NewOrder, NewOrderDetail, Order,
    OrderDetail, OrderId, OrderWithDetails, Record,
};

use crate::{Result, StoreError};

/// Read side of the gateway plus the entry point for writes.
///
/// Every write goes through a [`Transaction`]. All implementations must be
/// thread-safe (Send + Sync) and must not carry state between transactions.
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a transaction. Writes made through it become visible to readers
    /// only once [`Transaction::commit`] succeeds.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;

    /// Loads an item with its menus.
    async fn find_item(&self, id: ItemId) -> Result<Option<ItemWithMenus>>;

    /// Lists every item with its menus, in insertion order.
    async fn list_items(&self) -> Result<Vec<ItemWithMenus>>;

    /// Lists every menu together with its parent item.
    async fn list_menus(&self) -> Result<Vec<MenuWithItem>>;

    /// Loads a customer with orders and each order's details.
    async fn find_customer(&self, id: CustomerId) -> Result<Option<CustomerWithOrders>>;

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>>;

    async fn list_customers(&self) -> Result<Vec<Customer>>;

    /// Loads an order with its details.
    async fn find_order(&self, id: OrderId) -> Result<Option<OrderWithDetails>>;

    async fn list_orders(&self) -> Result<Vec<OrderWithDetails>>;

    /// Number of rows of the given kind.
    async fn count(&self, kind: EntityKind) -> Result<u64>;
}

/// A unit of work against the store.
///
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait Transaction: Send {
    async fn exists(&mut self, kind: EntityKind, id: i64) -> Result<bool>;

    /// Ids of `rel.child` rows whose `rel.column` equals `parent_id`.
    async fn dependents(&mut self, rel: &Relationship, parent_id: i64) -> Result<Vec<i64>>;

    /// Removes a single row without consulting relationships.
    async fn remove_row(&mut self, kind: EntityKind, id: i64) -> Result<()>;

    async fn create_item(&mut self, item: NewItem) -> Result<Item>;

    async fn create_menu(&mut self, menu: NewMenu) -> Result<Menu>;

    async fn create_customer(&mut self, customer: NewCustomer) -> Result<Customer>;

    async fn create_order(&mut self, order: NewOrder) -> Result<Order>;

    async fn create_order_detail(&mut self, detail: NewOrderDetail) -> Result<OrderDetail>;

    async fn update_item(&mut self, id: ItemId, item: NewItem) -> Result<Item>;

    async fn update_menu(&mut self, id: MenuId, menu: NewMenu) -> Result<Menu>;

    async fn update_customer(&mut self, id: CustomerId, customer: NewCustomer)
    -> Result<Customer>;

    async fn update_order(&mut self, id: OrderId, order: NewOrder) -> Result<Order>;

    /// Deletes a row, applying the declared delete policy of every
    /// relationship it is the parent of.
    ///
    /// Restricted dependents are checked before anything is removed; cascaded
    /// dependents are deleted recursively under their own policies. Returns
    /// the number of rows removed, including cascaded ones.
    async fn delete(&mut self, kind: EntityKind, id: i64) -> Result<u64> {
        if !self.exists(kind, id).await? {
            return Err(StoreError::not_found(kind, id));
        }

        let mut cascades = Vec::new();
        for rel in dependents_of(kind) {
            let children = self.dependents(rel, id).await?;
            if children.is_empty() {
                continue;
            }
            match rel.policy {
                DeletePolicy::Restrict => {
                    return Err(StoreError::DeleteRestricted {
                        kind,
                        id,
                        dependent: rel.child,
                        count: children.len(),
                    });
                }
                DeletePolicy::Cascade => cascades.push((rel.child, children)),
            }
        }

        let mut removed = 0;
        for (child, ids) in cascades {
            for child_id in ids {
                removed += self.delete(child, child_id).await?;
            }
        }
        self.remove_row(kind, id).await?;
        tracing::debug!(%kind, id, cascaded = removed, "row deleted");
        Ok(removed + 1)
    }

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Checks that every foreign key carried by `record` resolves.
pub async fn ensure_references<T, R>(tx: &mut T, record: &R) -> Result<()>
where
    T: Transaction + ?Sized,
    R: Record + Sync,
{
    for reference in record.references() {
        if !tx.exists(reference.target, reference.id).await? {
            return Err(StoreError::DanglingReference {
                child: R::KIND,
                column: reference.column,
                target: reference.target,
                id: reference.id,
            });
        }
    }
    Ok(())
}

/// Runs `work` inside a single transaction.
///
/// Commits when `work` succeeds; rolls back and returns its error otherwise,
/// leaving the store exactly as it was.
///
/// ```ignore
/// let order = run_in_transaction(&store, move |tx| {
///     Box::pin(async move { tx.create_order(new_order).await })
/// })
/// .await?;
/// ```
pub async fn run_in_transaction<S, T, E, F>(store: &S, work: F) -> std::result::Result<T, E>
where
    S: Store + ?Sized,
    T: Send,
    E: From<StoreError> + std::fmt::Display + Send,
    F: for<'t> FnOnce(&'t mut dyn Transaction) -> BoxFuture<'t, std::result::Result<T, E>> + Send,
{
    let mut tx = store.begin().await?;
    match work(tx.as_mut()).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            tracing::debug!(error = %err, "unit of work failed, rolling back");
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

/// Single-operation convenience methods, each in its own transaction.
#[async_trait]
pub trait StoreExt: Store {
    async fn create_item(&self, item: NewItem) -> Result<Item> {
        run_in_transaction(self, move |tx| {
            Box::pin(async move { tx.create_item(item).await })
        })
        .await
    }

    async fn create_menu(&self, menu: NewMenu) -> Result<Menu> {
        run_in_transaction(self, move |tx| {
            Box::pin(async move { tx.create_menu(menu).await })
        })
        .await
    }

    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer> {
        run_in_transaction(self, move |tx| {
            Box::pin(async move { tx.create_customer(customer).await })
        })
        .await
    }

    async fn delete(&self, kind: EntityKind, id: i64) -> Result<u64> {
        run_in_transaction(self, move |tx| {
            Box::pin(async move { tx.delete(kind, id).await })
        })
        .await
    }
}

// Blanket implementation for all Store implementations
impl<T: Store + ?Sized> StoreExt for T {}
