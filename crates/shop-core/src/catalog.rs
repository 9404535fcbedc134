//! # Catalog Types
//!
//! Users, categories and products as seen by the checkout pipeline.
//! They are owned by collaborators; this crate only reads them. A seed catalog
//! can be loaded from `config/catalog.toml`.

use crate::error::{CommerceError, CommerceResult};
use crate::money::Amount;
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type CategoryId = i64;
pub type ProductId = i64;

/// A registered customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// A product category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A product in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,

    /// Display name
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Current catalog price; carts snapshot it when a line is added
    pub price: Amount,

    #[serde(default)]
    pub stock_quantity: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    pub category_id: CategoryId,
}

/// Seed data for the in-memory store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedCatalog {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl SeedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from TOML
    pub fn from_toml_str(content: &str) -> CommerceResult<Self> {
        let catalog: SeedCatalog = toml::from_str(content)
            .map_err(|e| CommerceError::Configuration(format!("invalid catalog: {}", e)))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Every product must point at a known category
    pub fn validate(&self) -> CommerceResult<()> {
        for product in &self.products {
            if !self.categories.iter().any(|c| c.id == product.category_id) {
                return Err(CommerceError::InvalidRequest(format!(
                    "product {} references missing category {}",
                    product.id, product.category_id
                )));
            }
        }
        Ok(())
    }
}
