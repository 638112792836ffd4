use std::collections::HashMap;

use async_trait::async_trait;
use schema::relationships::{RELATIONSHIPS, Relationship};
use schema::{
    Customer, CustomerId, CustomerWithOrders, EntityKind, Item, ItemId, ItemWithMenus, Menu,
    MenuId, MenuWithItem, Money, NewCustomer, NewItem, NewMenu, NewOrder, NewOrderDetail, Order,
    OrderDetail, OrderDetailId, OrderId, OrderWithDetails, Record, Validate,
};
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};

use crate::{
    Result, StoreError,
    store::{Store, Transaction, ensure_references},
};

const ITEM_COLUMNS: &str = "id, name, image, ingredients, allergens, is_vegetarian, is_gluten_free, is_drink, is_dressing";
const MENU_COLUMNS: &str = "id, item_id, size, price_cents";
const CUSTOMER_COLUMNS: &str = "id, name, email, password_hash";
const ORDER_COLUMNS: &str =
    "id, customer_id, order_date_time, total_amount_cents, payment_status, delivery_status";
const DETAIL_COLUMNS: &str =
    "id, order_id, customer_id, item_id, size, quantity, price_per_piece_cents";

const EMAIL_CONSTRAINT: &str = "customers_email_key";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Opens a read-only snapshot so multi-query eager loads see one
    /// consistent state.
    async fn snapshot(&self) -> Result<sqlx::Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    async fn details_for_orders(
        conn: &mut sqlx::PgConnection,
        orders: Vec<Order>,
    ) -> Result<Vec<OrderWithDetails>> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = orders.iter().map(|o| o.id.as_i64()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {DETAIL_COLUMNS} FROM order_details WHERE order_id = ANY($1) ORDER BY id ASC"
        ))
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderDetail>> = HashMap::new();
        for row in rows {
            let detail = row_to_detail(&row)?;
            by_order.entry(detail.order_id).or_default().push(detail);
        }

        Ok(orders
            .into_iter()
            .map(|order| OrderWithDetails {
                order_details: by_order.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect())
    }

    async fn menus_for_items(
        conn: &mut sqlx::PgConnection,
        items: Vec<Item>,
    ) -> Result<Vec<ItemWithMenus>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = items.iter().map(|i| i.id.as_i64()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {MENU_COLUMNS} FROM menus WHERE item_id = ANY($1) ORDER BY id ASC"
        ))
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut by_item: HashMap<ItemId, Vec<Menu>> = HashMap::new();
        for row in rows {
            let menu = row_to_menu(&row)?;
            by_item.entry(menu.item_id).or_default().push(menu);
        }

        Ok(items
            .into_iter()
            .map(|item| ItemWithMenus {
                menus: by_item.remove(&item.id).unwrap_or_default(),
                item,
            })
            .collect())
    }
}

fn row_to_item(row: &PgRow) -> Result<Item> {
    Ok(Item {
        id: ItemId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        image: row.try_get("image")?,
        ingredients: row.try_get("ingredients")?,
        allergens: row.try_get("allergens")?,
        is_vegetarian: row.try_get("is_vegetarian")?,
        is_gluten_free: row.try_get("is_gluten_free")?,
        is_drink: row.try_get("is_drink")?,
        is_dressing: row.try_get("is_dressing")?,
    })
}

fn row_to_menu(row: &PgRow) -> Result<Menu> {
    Ok(Menu {
        id: MenuId::new(row.try_get("id")?),
        item_id: ItemId::new(row.try_get("item_id")?),
        size: row.try_get("size")?,
        price: Money::from_cents(row.try_get("price_cents")?),
    })
}

fn row_to_customer(row: &PgRow) -> Result<Customer> {
    Ok(Customer {
        id: CustomerId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
    })
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        customer_id: CustomerId::new(row.try_get("customer_id")?),
        order_date_time: row.try_get("order_date_time")?,
        total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
        payment_status: row.try_get("payment_status")?,
        delivery_status: row.try_get("delivery_status")?,
    })
}

fn row_to_detail(row: &PgRow) -> Result<OrderDetail> {
    Ok(OrderDetail {
        id: OrderDetailId::new(row.try_get("id")?),
        order_id: OrderId::new(row.try_get("order_id")?),
        customer_id: CustomerId::new(row.try_get("customer_id")?),
        item_id: ItemId::new(row.try_get("item_id")?),
        size: row.try_get("size")?,
        quantity: row.try_get("quantity")?,
        price_per_piece: Money::from_cents(row.try_get("price_per_piece_cents")?),
    })
}

/// Finds the relationship enforced by a foreign-key constraint.
///
/// The migration leaves foreign keys unnamed, so PostgreSQL names them
/// `<table>_<column>_fkey`.
fn relationship_for(constraint: &str) -> Option<&'static Relationship> {
    RELATIONSHIPS.iter().find(|rel| {
        constraint
            .strip_prefix(rel.child.table())
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|rest| rest.strip_suffix("_fkey"))
            == Some(rel.column)
    })
}

/// The relationship behind a foreign-key violation, if `err` is one.
fn violated_relationship(err: &sqlx::Error) -> Option<&'static Relationship> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            db_err.constraint().and_then(relationship_for)
        }
        _ => None,
    }
}

/// Maps constraint violations the application checks did not catch (for
/// example a concurrent insert of the same email) onto store errors.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.constraint() == Some(EMAIL_CONSTRAINT) {
            return StoreError::Conflict("email is already registered".to_string());
        }
    }
    StoreError::Database(err)
}

/// Like [`map_write_error`], but reports a foreign key that stopped resolving
/// between the reference check and the write as a dangling reference.
fn map_reference_error<R: Record>(record: &R) -> impl FnOnce(sqlx::Error) -> StoreError + '_ {
    move |err| {
        let reference = violated_relationship(&err).and_then(|rel| {
            record
                .references()
                .into_iter()
                .find(|reference| reference.column == rel.column)
        });
        match reference {
            Some(reference) => StoreError::DanglingReference {
                child: R::KIND,
                column: reference.column,
                target: reference.target,
                id: reference.id,
            },
            None => map_write_error(err),
        }
    }
}

/// Maps a foreign-key violation on delete to a restricted delete. The
/// dependent showed up after the relationship walk, so only one is known.
fn map_delete_error(kind: EntityKind, id: i64) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| match violated_relationship(&err) {
        Some(rel) if rel.parent == kind => StoreError::DeleteRestricted {
            kind,
            id,
            dependent: rel.child,
            count: 1,
        },
        _ => map_write_error(err),
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn find_item(&self, id: ItemId) -> Result<Option<ItemWithMenus>> {
        let mut tx = self.snapshot().await?;
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let item = row_to_item(&row)?;
        let mut loaded = Self::menus_for_items(&mut *tx, vec![item]).await?;
        tx.commit().await?;
        Ok(loaded.pop())
    }

    async fn list_items(&self) -> Result<Vec<ItemWithMenus>> {
        let mut tx = self.snapshot().await?;
        let rows = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY id ASC"))
            .fetch_all(&mut *tx)
            .await?;
        let items = rows.iter().map(row_to_item).collect::<Result<Vec<_>>>()?;
        let loaded = Self::menus_for_items(&mut *tx, items).await?;
        tx.commit().await?;
        Ok(loaded)
    }

    async fn list_menus(&self) -> Result<Vec<MenuWithItem>> {
        let rows = sqlx::query(
            r#"
            SELECT m.id AS menu_id, m.item_id, m.size, m.price_cents,
                   i.id, i.name, i.image, i.ingredients, i.allergens,
                   i.is_vegetarian, i.is_gluten_free, i.is_drink, i.is_dressing
            FROM menus m
            JOIN items i ON i.id = m.item_id
            ORDER BY m.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<MenuWithItem> {
                Ok(MenuWithItem {
                    menu: Menu {
                        id: MenuId::new(row.try_get("menu_id")?),
                        item_id: ItemId::new(row.try_get("item_id")?),
                        size: row.try_get("size")?,
                        price: Money::from_cents(row.try_get("price_cents")?),
                    },
                    item: row_to_item(row)?,
                })
            })
            .collect()
    }

    async fn find_customer(&self, id: CustomerId) -> Result<Option<CustomerWithOrders>> {
        let mut tx = self.snapshot().await?;
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let customer = row_to_customer(&row)?;

        let order_rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = $1 ORDER BY id ASC"
        ))
        .bind(id.as_i64())
        .fetch_all(&mut *tx)
        .await?;
        let orders = order_rows
            .iter()
            .map(row_to_order)
            .collect::<Result<Vec<_>>>()?;
        let orders = Self::details_for_orders(&mut *tx, orders).await?;
        tx.commit().await?;

        Ok(Some(CustomerWithOrders { customer, orders }))
    }

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_customer).transpose()
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_customer).collect()
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<OrderWithDetails>> {
        let mut tx = self.snapshot().await?;
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let order = row_to_order(&row)?;
        let mut loaded = Self::details_for_orders(&mut *tx, vec![order]).await?;
        tx.commit().await?;
        Ok(loaded.pop())
    }

    async fn list_orders(&self) -> Result<Vec<OrderWithDetails>> {
        let mut tx = self.snapshot().await?;
        let rows = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id ASC"))
            .fetch_all(&mut *tx)
            .await?;
        let orders = rows.iter().map(row_to_order).collect::<Result<Vec<_>>>()?;
        let loaded = Self::details_for_orders(&mut *tx, orders).await?;
        tx.commit().await?;
        Ok(loaded)
    }

    async fn count(&self, kind: EntityKind) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", kind.table()))
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

/// A store transaction backed by a `sqlx` transaction.
///
/// Dropping it without committing rolls back.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

impl PostgresTransaction {
    async fn require(&mut self, kind: EntityKind, id: i64) -> Result<()> {
        if self.exists(kind, id).await? {
            Ok(())
        } else {
            Err(StoreError::not_found(kind, id))
        }
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn exists(&mut self, kind: EntityKind, id: i64) -> Result<bool> {
        let found: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            kind.table()
        ))
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(found)
    }

    async fn dependents(&mut self, rel: &Relationship, parent_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(&format!(
            "SELECT id FROM {} WHERE {} = $1 ORDER BY id ASC FOR UPDATE",
            rel.child.table(),
            rel.column
        ))
        .bind(parent_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids)
    }

    async fn remove_row(&mut self, kind: EntityKind, id: i64) -> Result<()> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_delete_error(kind, id))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(kind, id));
        }
        Ok(())
    }

    async fn create_item(&mut self, item: NewItem) -> Result<Item> {
        item.validate()?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO items (name, image, ingredients, allergens, is_vegetarian, is_gluten_free, is_drink, is_dressing)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&item.name)
        .bind(&item.image)
        .bind(&item.ingredients)
        .bind(&item.allergens)
        .bind(item.is_vegetarian)
        .bind(item.is_gluten_free)
        .bind(item.is_drink)
        .bind(item.is_dressing)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        Ok(item.into_item(ItemId::new(id)))
    }

    async fn create_menu(&mut self, menu: NewMenu) -> Result<Menu> {
        menu.validate()?;
        ensure_references(self, &menu).await?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO menus (item_id, size, price_cents) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(menu.item_id.as_i64())
        .bind(&menu.size)
        .bind(menu.price.cents())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_reference_error(&menu))?;
        Ok(menu.into_menu(MenuId::new(id)))
    }

    async fn create_customer(&mut self, customer: NewCustomer) -> Result<Customer> {
        customer.validate()?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO customers (name, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.password_hash)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        Ok(customer.into_customer(CustomerId::new(id)))
    }

    async fn create_order(&mut self, order: NewOrder) -> Result<Order> {
        order.validate()?;
        ensure_references(self, &order).await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (customer_id, order_date_time, total_amount_cents, payment_status, delivery_status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(order.customer_id.as_i64())
        .bind(order.order_date_time)
        .bind(order.total_amount.cents())
        .bind(&order.payment_status)
        .bind(&order.delivery_status)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_reference_error(&order))?;
        Ok(order.into_order(OrderId::new(id)))
    }

    async fn create_order_detail(&mut self, detail: NewOrderDetail) -> Result<OrderDetail> {
        detail.validate()?;
        ensure_references(self, &detail).await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO order_details (order_id, customer_id, item_id, size, quantity, price_per_piece_cents)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(detail.order_id.as_i64())
        .bind(detail.customer_id.as_i64())
        .bind(detail.item_id.as_i64())
        .bind(&detail.size)
        .bind(detail.quantity)
        .bind(detail.price_per_piece.cents())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_reference_error(&detail))?;
        Ok(detail.into_detail(OrderDetailId::new(id)))
    }

    async fn update_item(&mut self, id: ItemId, item: NewItem) -> Result<Item> {
        self.require(EntityKind::Item, id.as_i64()).await?;
        item.validate()?;
        sqlx::query(
            r#"
            UPDATE items SET name = $2, image = $3, ingredients = $4, allergens = $5,
                is_vegetarian = $6, is_gluten_free = $7, is_drink = $8, is_dressing = $9
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(&item.name)
        .bind(&item.image)
        .bind(&item.ingredients)
        .bind(&item.allergens)
        .bind(item.is_vegetarian)
        .bind(item.is_gluten_free)
        .bind(item.is_drink)
        .bind(item.is_dressing)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        Ok(item.into_item(id))
    }

    async fn update_menu(&mut self, id: MenuId, menu: NewMenu) -> Result<Menu> {
        self.require(EntityKind::Menu, id.as_i64()).await?;
        menu.validate()?;
        ensure_references(self, &menu).await?;
        sqlx::query("UPDATE menus SET item_id = $2, size = $3, price_cents = $4 WHERE id = $1")
            .bind(id.as_i64())
            .bind(menu.item_id.as_i64())
            .bind(&menu.size)
            .bind(menu.price.cents())
            .execute(&mut *self.tx)
            .await
            .map_err(map_reference_error(&menu))?;
        Ok(menu.into_menu(id))
    }

    async fn update_customer(
        &mut self,
        id: CustomerId,
        customer: NewCustomer,
    ) -> Result<Customer> {
        self.require(EntityKind::Customer, id.as_i64()).await?;
        customer.validate()?;
        sqlx::query(
            "UPDATE customers SET name = $2, email = $3, password_hash = $4 WHERE id = $1",
        )
        .bind(id.as_i64())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.password_hash)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        Ok(customer.into_customer(id))
    }

    async fn update_order(&mut self, id: OrderId, order: NewOrder) -> Result<Order> {
        self.require(EntityKind::Order, id.as_i64()).await?;
        order.validate()?;
        ensure_references(self, &order).await?;
        sqlx::query(
            r#"
            UPDATE orders SET customer_id = $2, order_date_time = $3, total_amount_cents = $4,
                payment_status = $5, delivery_status = $6
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(order.customer_id.as_i64())
        .bind(order.order_date_time)
        .bind(order.total_amount.cents())
        .bind(&order.payment_status)
        .bind(&order.delivery_status)
        .execute(&mut *self.tx)
        .await
        .map_err(map_reference_error(&order))?;
        Ok(order.into_order(id))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
