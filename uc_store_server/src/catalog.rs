use std::{collections::HashMap, fs, path::Path};

use log::*;
use uc_store_engine::db_types::Item;

use crate::errors::ServerError;

/// The item catalog, loaded once at startup from a JSON array of items. Orders snapshot the item
/// at purchase time, so a catalog edit plus restart never rewrites history.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    items: HashMap<i64, Item>,
}

impl Catalog {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ServerError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| ServerError::ConfigurationError(format!("Could not read catalog {}: {e}", path.display())))?;
        let catalog = Self::from_json(&raw)?;
        info!("🏪️ Loaded {} catalog items from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn from_json(raw: &str) -> Result<Self, ServerError> {
        let items: Vec<Item> = serde_json::from_str(raw)
            .map_err(|e| ServerError::ConfigurationError(format!("Catalog is not a valid item array: {e}")))?;
        let mut map = HashMap::with_capacity(items.len());
        for item in items {
            if map.insert(item.id, item).is_some() {
                return Err(ServerError::ConfigurationError("Catalog contains duplicate item ids".to_string()));
            }
        }
        Ok(Self { items: map })
    }

    pub fn item(&self, id: i64) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod test {
    use uc_store_engine::db_types::Category;

    use super::*;

    const CATALOG: &str = r#"[
        {"id": 1, "title": "60 UC", "category": "pubg_uc", "price": 990, "amount": 60, "is_active": true},
        {"id": 2, "title": null, "category": "giftcard", "price": 5000, "is_active": false}
    ]"#;

    #[test]
    fn a_catalog_loads_from_a_json_array() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 2);
        let uc = catalog.item(1).unwrap();
        assert_eq!(uc.category, Category::PubgUc);
        assert_eq!(uc.amount, Some(60));
        assert!(catalog.item(3).is_none());
    }

    #[test]
    fn duplicate_item_ids_are_rejected() {
        let raw = r#"[
            {"id": 1, "category": "codes", "price": 990, "amount": 60, "is_active": true},
            {"id": 1, "category": "codes", "price": 990, "amount": 60, "is_active": true}
        ]"#;
        let err = Catalog::from_json(raw).unwrap_err();
        assert!(matches!(err, ServerError::ConfigurationError(_)));
    }
}
