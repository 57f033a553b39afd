//! Product catalog
//!
//! A single product table: ids are serial, SKUs unique, prices in minor
//! units and garment images keyed by view.

pub mod memory;
pub mod seed;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::garment::GarmentImages;

pub use memory::MemoryStore;
pub use seed::{load_catalog_file, seed_if_empty, seed_products};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("a product with SKU {0} already exists")]
    DuplicateSku(String),
    #[error("invalid product: {0}")]
    Invalid(String),
    #[error("catalog file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub detailed_description: Option<String>,
    /// Price in minor units (cents)
    pub price: i64,
    pub sku: String,
    pub images: GarmentImages,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub similar_products: Vec<i32>,
}

/// A product before it has an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub detailed_description: Option<String>,
    pub price: i64,
    pub sku: String,
    pub images: GarmentImages,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub similar_products: Vec<i32>,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::Invalid("name is required".to_string()));
        }
        if self.sku.trim().is_empty() {
            return Err(CatalogError::Invalid("sku is required".to_string()));
        }
        if self.price < 0 {
            return Err(CatalogError::Invalid("price must not be negative".to_string()));
        }
        self.images.validate().map_err(CatalogError::Invalid)
    }

    pub fn with_id(self, id: i32) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            detailed_description: self.detailed_description,
            price: self.price,
            sku: self.sku,
            images: self.images,
            features: self.features,
            sizes: self.sizes,
            similar_products: self.similar_products,
        }
    }
}

/// Storage for products
pub trait ProductStore: Send + Sync {
    fn list(&self) -> Vec<Product>;

    fn get(&self, id: i32) -> Option<Product>;

    fn get_by_sku(&self, sku: &str) -> Option<Product>;

    fn create(&self, product: NewProduct) -> Result<Product, CatalogError>;

    fn is_empty(&self) -> bool {
        self.list().is_empty()
    }
}
