use serde::{Deserialize, Serialize};

use catalog_core::{CatalogError, CatalogResult, Entity, ProductId};

/// A sellable item.
///
/// `sku` is unique across products when non-empty; that constraint lives in
/// the store, not here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: String,
    pub sku: String,
}

impl Product {
    /// A product that has not been persisted yet (id = 0).
    pub fn draft(name: impl Into<String>, price: f64, sku: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price,
            sku: sku.into(),
            ..Self::default()
        }
    }

    pub fn has_sku(&self) -> bool {
        !self.sku.is_empty()
    }

    /// Semantic checks applied before a product is written.
    pub fn validate(&self) -> CatalogResult<()> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::validation("product name must not be empty")
                .with_context("field", "name"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(CatalogError::validation(format!(
                "product price must be a non-negative number, got {}",
                self.price
            ))
            .with_context("field", "price"));
        }
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }

    fn assign_id(&mut self, id: ProductId) {
        self.id = id;
    }
}
