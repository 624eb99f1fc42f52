use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use catalog_core::{CatalogError, CatalogResult, Entity, PackageId, ProductId};

/// One `(product, quantity)` line inside a package.
///
/// Lines have no identity of their own; within a package they are keyed by
/// `product_id`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageContent {
    pub product_id: ProductId,
    pub quantity: i32,
}

impl PackageContent {
    pub fn new(product_id: ProductId, quantity: i32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Aggregate root: a named bundle of products.
///
/// Contents are created together with the package and removed with it; there
/// is no operation that touches a single line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    pub description: String,
    pub contents: Vec<PackageContent>,
}

impl Package {
    pub fn draft(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_line(mut self, product_id: ProductId, quantity: i32) -> Self {
        self.contents.push(PackageContent::new(product_id, quantity));
        self
    }

    /// Contents as an order-free set, for comparing compositions.
    pub fn content_set(&self) -> BTreeSet<PackageContent> {
        self.contents.iter().copied().collect()
    }

    /// Case-insensitive substring match on name or description.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }

    /// Copy without contents (list/search results carry no lines).
    pub fn header(&self) -> Self {
        Self {
            contents: Vec::new(),
            ..self.clone()
        }
    }

    /// Semantic checks applied before a package is composed.
    pub fn validate(&self) -> CatalogResult<()> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::validation("package name must not be empty")
                .with_context("field", "package_name"));
        }

        let mut seen = HashSet::with_capacity(self.contents.len());
        for line in &self.contents {
            if line.quantity <= 0 {
                return Err(CatalogError::validation(format!(
                    "quantity for product {} must be positive, got {}",
                    line.product_id, line.quantity
                ))
                .with_context("product_id", line.product_id));
            }
            if !seen.insert(line.product_id) {
                return Err(CatalogError::validation(format!(
                    "product {} appears more than once in package",
                    line.product_id
                ))
                .with_context("product_id", line.product_id));
            }
        }
        Ok(())
    }
}

impl Entity for Package {
    type Id = PackageId;

    fn id(&self) -> PackageId {
        self.id
    }

    fn assign_id(&mut self, id: PackageId) {
        self.id = id;
    }
}
