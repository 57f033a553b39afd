//! In-memory product table

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{CatalogError, NewProduct, Product, ProductStore};

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i32, Product>,
    next_id: i32,
}

/// Product table held in memory, ordered by id
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: RwLock<Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProductStore for MemoryStore {
    fn list(&self) -> Vec<Product> {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        table.rows.values().cloned().collect()
    }

    fn get(&self, id: i32) -> Option<Product> {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        table.rows.get(&id).cloned()
    }

    fn get_by_sku(&self, sku: &str) -> Option<Product> {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        table.rows.values().find(|p| p.sku == sku).cloned()
    }

    fn create(&self, product: NewProduct) -> Result<Product, CatalogError> {
        product.validate()?;

        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
        if table.rows.values().any(|p| p.sku == product.sku) {
            return Err(CatalogError::DuplicateSku(product.sku));
        }

        table.next_id += 1;
        let product = product.with_id(table.next_id);
        table.rows.insert(product.id, product.clone());
        tracing::debug!(id = product.id, sku = %product.sku, "Product created");
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::seed_products;

    #[test]
    fn test_serial_ids_and_lookup() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        for product in seed_products() {
            store.create(product).unwrap();
        }
        let ids: Vec<i32> = store.list().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(store.get(2).unwrap().sku, "ONYU-HD-002");
        assert_eq!(store.get_by_sku("ONYU-JG-003").unwrap().id, 3);
        assert!(store.get(99).is_none());
        assert!(store.get_by_sku("nope").is_none());
    }

    #[test]
    fn test_duplicate_sku_rejected() {
        let store = MemoryStore::new();
        let product = seed_products().remove(0);
        store.create(product.clone()).unwrap();
        assert!(matches!(store.create(product), Err(CatalogError::DuplicateSku(_))));
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_invalid_product_rejected() {
        let store = MemoryStore::new();
        let mut product = seed_products().remove(0);
        product.price = -1;
        assert!(matches!(store.create(product), Err(CatalogError::Invalid(_))));
        assert!(store.is_empty());
    }
}
