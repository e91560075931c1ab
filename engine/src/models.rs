//! Typed views of the shopping-list collections.

use crate::{error::Result, Record, RecordId};
use serde::{Deserialize, Serialize};

/// Collection holding the product catalog.
pub const PRODUCTS: &str = "products";

/// Collection holding the current shopping list.
pub const SHOPPING_LIST: &str = "shopping_list";

/// A catalog product, e.g. `Apfel` with icon `noto:red-apple`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    /// How often this product was put on the list
    #[serde(default)]
    pub shopping_cart_usages: u64,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
}

impl TryFrom<&Record> for Product {
    type Error = crate::Error;

    fn try_from(record: &Record) -> Result<Self> {
        record.decode()
    }
}

/// An entry on the shopping list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListItem {
    pub id: RecordId,
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
}

fn default_quantity() -> u32 {
    1
}

impl TryFrom<&Record> for ShoppingListItem {
    type Error = crate::Error;

    fn try_from(record: &Record) -> Result<Self> {
        record.decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;

    #[test]
    fn decode_product() {
        let record = Record::from_value(json!({
            "id": "p1",
            "collectionName": "products",
            "created": "2025-11-16 16:20:42.000Z",
            "updated": "2025-11-16 16:20:42.000Z",
            "name": "Süßkartoffel",
            "icon": "noto:sweet-potato",
            "shoppingCartUsages": 3
        }))
        .unwrap();

        let product = Product::try_from(&record).unwrap();
        assert_eq!(product.id, "p1");
        assert_eq!(product.name, "Süßkartoffel");
        assert_eq!(product.icon, "noto:sweet-potato");
        assert_eq!(product.shopping_cart_usages, 3);
    }

    #[test]
    fn decode_list_item_defaults() {
        let record = Record::from_value(json!({"id": "i1", "name": "Milch"})).unwrap();
        let item = ShoppingListItem::try_from(&record).unwrap();
        assert_eq!(item.quantity, 1);
        assert_eq!(item.icon, None);
    }

    #[test]
    fn decode_rejects_wrong_types() {
        let record = Record::from_value(json!({"id": "i1", "name": "Eier", "quantity": "six"}))
            .unwrap();
        let result = ShoppingListItem::try_from(&record);
        assert!(matches!(result, Err(Error::InvalidPayload(_))));
    }
}
