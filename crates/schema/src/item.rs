//! Catalog entities: items and their size/price menus.

use common::{ItemId, MenuId, Money};
use serde::{Deserialize, Serialize};

use crate::validate::{bounded, required, url};
use crate::{EntityKind, Record, Validate, ValidationError, ValidationReason};

pub const ITEM_NAME_MAX: usize = 100;
pub const ITEM_IMAGE_MAX: usize = 150;
pub const ITEM_INGREDIENTS_MAX: usize = 500;
pub const ITEM_ALLERGENS_MAX: usize = 100;
pub const MENU_SIZE_MAX: usize = 50;

/// A catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub image: String,
    pub ingredients: String,
    pub allergens: String,
    pub is_vegetarian: bool,
    pub is_gluten_free: bool,
    pub is_drink: bool,
    pub is_dressing: bool,
}

/// Fields of an item as written by create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub ingredients: String,
    #[serde(default)]
    pub allergens: String,
    #[serde(default)]
    pub is_vegetarian: bool,
    #[serde(default)]
    pub is_gluten_free: bool,
    #[serde(default)]
    pub is_drink: bool,
    #[serde(default)]
    pub is_dressing: bool,
}

impl NewItem {
    /// Creates an item with the required fields and every flag cleared.
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ingredients: String::new(),
            allergens: String::new(),
            is_vegetarian: false,
            is_gluten_free: false,
            is_drink: false,
            is_dressing: false,
        }
    }

    pub fn into_item(self, id: ItemId) -> Item {
        Item {
            id,
            name: self.name,
            image: self.image,
            ingredients: self.ingredients,
            allergens: self.allergens,
            is_vegetarian: self.is_vegetarian,
            is_gluten_free: self.is_gluten_free,
            is_drink: self.is_drink,
            is_dressing: self.is_dressing,
        }
    }
}

impl Validate for NewItem {
    fn validate(&self) -> Result<(), ValidationError> {
        required("Item", "name", &self.name, ITEM_NAME_MAX)?;
        required("Item", "image", &self.image, ITEM_IMAGE_MAX)?;
        url("Item", "image", &self.image)?;
        bounded(
            "Item",
            "ingredients",
            &self.ingredients,
            ITEM_INGREDIENTS_MAX,
        )?;
        bounded("Item", "allergens", &self.allergens, ITEM_ALLERGENS_MAX)
    }
}

impl Record for NewItem {
    const KIND: EntityKind = EntityKind::Item;
}

/// A size/price entry for an item.
///
/// Only the `item_id` key points back at the parent; the item itself is never
/// embedded, so nesting menus under items cannot form a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub id: MenuId,
    pub item_id: ItemId,
    pub size: String,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMenu {
    pub item_id: ItemId,
    pub size: String,
    pub price: Money,
}

impl NewMenu {
    pub fn new(item_id: ItemId, size: impl Into<String>, price: Money) -> Self {
        Self {
            item_id,
            size: size.into(),
            price,
        }
    }

    pub fn into_menu(self, id: MenuId) -> Menu {
        Menu {
            id,
            item_id: self.item_id,
            size: self.size,
            price: self.price,
        }
    }
}

impl Validate for NewMenu {
    fn validate(&self) -> Result<(), ValidationError> {
        required("Menu", "size", &self.size, MENU_SIZE_MAX)?;
        if self.price.is_negative() {
            return Err(ValidationError::new(
                "Menu",
                "price",
                ValidationReason::Negative,
            ));
        }
        Ok(())
    }
}

impl Record for NewMenu {
    const KIND: EntityKind = EntityKind::Menu;

    fn column_value(&self, column: &str) -> Option<i64> {
        match column {
            "item_id" => Some(self.item_id.as_i64()),
            _ => None,
        }
    }
}

/// An item with its menus eagerly loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemWithMenus {
    #[serde(flatten)]
    pub item: Item,
    pub menus: Vec<Menu>,
}

/// A menu entry with its parent item, as listed by `GET /menus`.
///
/// This is the one back-reference that is serialized: clients listing menus
/// need the item's name and image. The embedded [`Item`] has no menu
/// collection of its own, so the output cannot cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuWithItem {
    #[serde(flatten)]
    pub menu: Menu,
    pub item: Item,
}
