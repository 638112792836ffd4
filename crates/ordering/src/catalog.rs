//! Items and their menus.

use std::sync::Arc;

use common::ItemId;
use schema::{EntityKind, Item, ItemWithMenus, Menu, MenuWithItem, NewItem, NewMenu};
use store::{Store, StoreExt};

use crate::error::ServiceError;

/// Service for the item catalog.
pub struct CatalogService<S: Store + ?Sized> {
    store: Arc<S>,
}

impl<S: Store + ?Sized> Clone for CatalogService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store + ?Sized> CatalogService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, item), fields(name = %item.name))]
    pub async fn create_item(&self, item: NewItem) -> Result<Item, ServiceError> {
        let item = self.store.create_item(item).await?;
        tracing::info!(item_id = %item.id, "item created");
        Ok(item)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_item(&self, id: ItemId) -> Result<Option<ItemWithMenus>, ServiceError> {
        Ok(self.store.find_item(id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Vec<ItemWithMenus>, ServiceError> {
        Ok(self.store.list_items().await?)
    }

    /// Adds a size/price option to an existing item. An unknown item is a
    /// referential-integrity failure.
    #[tracing::instrument(skip(self))]
    pub async fn create_menu(&self, menu: NewMenu) -> Result<Menu, ServiceError> {
        Ok(self.store.create_menu(menu).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_menus(&self) -> Result<Vec<MenuWithItem>, ServiceError> {
        Ok(self.store.list_menus().await?)
    }

    /// Deletes an item. Refused while menus or order details refer to it.
    #[tracing::instrument(skip(self))]
    pub async fn delete_item(&self, id: ItemId) -> Result<u64, ServiceError> {
        Ok(self.store.delete(EntityKind::Item, id.as_i64()).await?)
    }
}
