//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and run serially because
//! every test truncates the tables. Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::Utc;
use schema::{
    CustomerId, EntityKind, ItemId, MenuId, Money, NewCustomer, NewItem, NewMenu, NewOrder,
    NewOrderDetail, OrderId,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{PostgresStore, Store, StoreError, StoreExt, run_in_transaction};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!("../../../migrations/001_create_store_tables.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_details, orders, menus, customers, items RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn customer(email: &str) -> NewCustomer {
    NewCustomer {
        name: "Ana".into(),
        email: email.into(),
        password_hash: "$argon2id$v=19$placeholder".into(),
    }
}

fn order_for(customer_id: CustomerId) -> NewOrder {
    NewOrder {
        customer_id,
        order_date_time: Utc::now(),
        total_amount: Money::from_cents(1998),
        payment_status: "PAID".into(),
        delivery_status: "PENDING".into(),
    }
}

fn line(order_id: OrderId, customer_id: CustomerId, item_id: ItemId) -> NewOrderDetail {
    NewOrderDetail {
        order_id,
        customer_id,
        item_id,
        size: "M".into(),
        quantity: 2,
        price_per_piece: Money::from_cents(999),
    }
}

async fn place(
    store: &PostgresStore,
    customer_id: CustomerId,
    item_id: ItemId,
    lines: usize,
) -> store::Result<OrderId> {
    run_in_transaction(store, move |tx| {
        Box::pin(async move {
            let order = tx.create_order(order_for(customer_id)).await?;
            for _ in 0..lines {
                tx.create_order_detail(line(order.id, customer_id, item_id))
                    .await?;
            }
            Ok::<_, StoreError>(order.id)
        })
    })
    .await
}

#[tokio::test]
#[serial]
async fn create_and_eager_load_item_with_menus() {
    let store = get_test_store().await;

    let item = store
        .create_item(NewItem::new("Margherita", "https://x.io/m.png"))
        .await
        .unwrap();
    assert_eq!(item.id.as_i64(), 1);

    store
        .create_menu(NewMenu::new(item.id, "S", Money::from_cents(699)))
        .await
        .unwrap();
    store
        .create_menu(NewMenu::new(item.id, "L", Money::from_cents(1299)))
        .await
        .unwrap();

    let loaded = store.find_item(item.id).await.unwrap().unwrap();
    assert_eq!(loaded.menus.len(), 2);
    assert_eq!(loaded.menus[1].price, Money::from_cents(1299));

    let menus = store.list_menus().await.unwrap();
    assert_eq!(menus.len(), 2);
    assert_eq!(menus[0].item.name, "Margherita");
}

#[tokio::test]
#[serial]
async fn order_and_details_commit_together() {
    let store = get_test_store().await;
    let ana = store.create_customer(customer("ana@x.com")).await.unwrap();
    let item = store
        .create_item(NewItem::new("Margherita", "https://x.io/m.png"))
        .await
        .unwrap();

    let order_id = place(&store, ana.id, item.id, 3).await.unwrap();

    let order = store.find_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.order_details.len(), 3);
    assert!(order.order_details.iter().all(|d| d.customer_id == ana.id));
}

#[tokio::test]
#[serial]
async fn failing_detail_rolls_back_the_order() {
    let store = get_test_store().await;
    let ana = store.create_customer(customer("ana@x.com")).await.unwrap();

    let err = place(&store, ana.id, ItemId::new(404), 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::DanglingReference {
            target: EntityKind::Item,
            ..
        }
    ));

    assert_eq!(store.count(EntityKind::Order).await.unwrap(), 0);
    assert_eq!(store.count(EntityKind::OrderDetail).await.unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn delete_order_cascades_and_customer_is_restricted() {
    let store = get_test_store().await;
    let ana = store.create_customer(customer("ana@x.com")).await.unwrap();
    let item = store
        .create_item(NewItem::new("Margherita", "https://x.io/m.png"))
        .await
        .unwrap();
    let first = place(&store, ana.id, item.id, 2).await.unwrap();
    place(&store, ana.id, item.id, 1).await.unwrap();

    let err = store
        .delete(EntityKind::Customer, ana.id.as_i64())
        .await
        .unwrap_err();
    assert!(err.is_referential_integrity());

    let err = store
        .delete(EntityKind::Item, item.id.as_i64())
        .await
        .unwrap_err();
    assert!(err.is_referential_integrity());
    assert_eq!(store.count(EntityKind::OrderDetail).await.unwrap(), 3);

    let removed = store
        .delete(EntityKind::Order, first.as_i64())
        .await
        .unwrap();
    assert_eq!(removed, 3);
    assert_eq!(store.count(EntityKind::OrderDetail).await.unwrap(), 1);
}

#[tokio::test]
#[serial]
async fn customer_with_orders_and_details() {
    let store = get_test_store().await;
    let ana = store.create_customer(customer("ana@x.com")).await.unwrap();
    let item = store
        .create_item(NewItem::new("Margherita", "https://x.io/m.png"))
        .await
        .unwrap();
    place(&store, ana.id, item.id, 3).await.unwrap();
    place(&store, ana.id, item.id, 0).await.unwrap();

    let loaded = store.find_customer(ana.id).await.unwrap().unwrap();
    let lengths: Vec<_> = loaded
        .orders
        .iter()
        .map(|o| o.order_details.len())
        .collect();
    assert_eq!(lengths, vec![3, 0]);
    assert!(loaded.customer.password_hash.starts_with("$argon2id"));
}

#[tokio::test]
#[serial]
async fn duplicate_email_is_a_conflict() {
    let store = get_test_store().await;
    store.create_customer(customer("ana@x.com")).await.unwrap();

    let err = store
        .create_customer(customer("ANA@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let found = store.find_customer_by_email("Ana@X.com").await.unwrap();
    assert!(found.is_some());
}

#[tokio::test]
#[serial]
async fn update_missing_order_is_not_found() {
    let store = get_test_store().await;
    let ana = store.create_customer(customer("ana@x.com")).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .update_order(OrderId::new(99), order_for(ana.id))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            kind: EntityKind::Order,
            id: 99
        }
    ));
}

#[tokio::test]
#[serial]
async fn update_item_menu_and_customer() {
    let store = get_test_store().await;
    let ana = store.create_customer(customer("ana@x.com")).await.unwrap();
    let item = store
        .create_item(NewItem::new("Margherita", "https://x.io/m.png"))
        .await
        .unwrap();
    let other = store
        .create_item(NewItem::new("Diavola", "https://x.io/d.png"))
        .await
        .unwrap();
    let menu = store
        .create_menu(NewMenu::new(item.id, "S", Money::from_cents(699)))
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.update_item(item.id, NewItem::new("Marinara", "https://x.io/n.png"))
        .await
        .unwrap();
    tx.update_menu(menu.id, NewMenu::new(other.id, "L", Money::from_cents(1299)))
        .await
        .unwrap();
    let mut renamed = customer("Ana@X.com");
    renamed.name = "Ana Maria".into();
    tx.update_customer(ana.id, renamed).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(
        store.find_item(item.id).await.unwrap().unwrap().item.name,
        "Marinara"
    );
    let moved = store.find_item(other.id).await.unwrap().unwrap();
    assert_eq!(moved.menus.len(), 1);
    assert_eq!(moved.menus[0].price, Money::from_cents(1299));
    let found = store.find_customer_by_email("ana@x.com").await.unwrap().unwrap();
    assert_eq!(found.name, "Ana Maria");
}

#[tokio::test]
#[serial]
async fn update_missing_rows_is_not_found() {
    let store = get_test_store().await;
    let item = store
        .create_item(NewItem::new("Margherita", "https://x.io/m.png"))
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .update_item(ItemId::new(99), NewItem::new("Marinara", "https://x.io/n.png"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            kind: EntityKind::Item,
            id: 99
        }
    ));

    let err = tx
        .update_menu(MenuId::new(99), NewMenu::new(item.id, "S", Money::from_cents(699)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            kind: EntityKind::Menu,
            id: 99
        }
    ));

    let err = tx
        .update_customer(CustomerId::new(99), customer("bo@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            kind: EntityKind::Customer,
            id: 99
        }
    ));
}

#[tokio::test]
#[serial]
async fn update_menu_to_missing_item_is_dangling() {
    let store = get_test_store().await;
    let item = store
        .create_item(NewItem::new("Margherita", "https://x.io/m.png"))
        .await
        .unwrap();
    let menu = store
        .create_menu(NewMenu::new(item.id, "S", Money::from_cents(699)))
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .update_menu(menu.id, NewMenu::new(ItemId::new(42), "S", Money::from_cents(699)))
        .await
        .unwrap_err();
    tx.rollback().await.unwrap();

    assert!(matches!(
        err,
        StoreError::DanglingReference {
            child: EntityKind::Menu,
            target: EntityKind::Item,
            id: 42,
            ..
        }
    ));
    assert_eq!(store.find_item(item.id).await.unwrap().unwrap().menus.len(), 1);
}

#[tokio::test]
#[serial]
async fn update_customer_to_taken_email_conflicts() {
    let store = get_test_store().await;
    store.create_customer(customer("ana@x.com")).await.unwrap();
    let bo = store.create_customer(customer("bo@x.com")).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .update_customer(bo.id, customer("ANA@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
#[serial]
async fn constraint_backed_delete_is_restricted() {
    let store = get_test_store().await;
    let ana = store.create_customer(customer("ana@x.com")).await.unwrap();
    let item = store
        .create_item(NewItem::new("Margherita", "https://x.io/m.png"))
        .await
        .unwrap();
    place(&store, ana.id, item.id, 0).await.unwrap();

    // Removing the row directly skips the relationship walk, leaving the
    // database constraint to reject it.
    let mut tx = store.begin().await.unwrap();
    let err = tx
        .remove_row(EntityKind::Customer, ana.id.as_i64())
        .await
        .unwrap_err();
    assert!(err.is_referential_integrity());
    assert!(matches!(
        err,
        StoreError::DeleteRestricted {
            kind: EntityKind::Customer,
            dependent: EntityKind::Order,
            ..
        }
    ));
}

#[tokio::test]
#[serial]
async fn customer_deleted_during_placement_is_dangling() {
    let store = get_test_store().await;
    let ana = store.create_customer(customer("ana@x.com")).await.unwrap();

    // Remove the customer in one transaction and hold it open while a second
    // one writes an order for them.
    let mut deleting = store.begin().await.unwrap();
    deleting
        .remove_row(EntityKind::Customer, ana.id.as_i64())
        .await
        .unwrap();

    let mut placing = store.begin().await.unwrap();
    let pending = tokio::spawn(async move {
        let result = placing.create_order(order_for(ana.id)).await;
        drop(placing);
        result
    });
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    deleting.commit().await.unwrap();

    let err = pending.await.unwrap().unwrap_err();
    assert!(err.is_referential_integrity());
    assert!(matches!(
        err,
        StoreError::DanglingReference {
            child: EntityKind::Order,
            target: EntityKind::Customer,
            ..
        }
    ));
    assert_eq!(store.count(EntityKind::Order).await.unwrap(), 0);
}
