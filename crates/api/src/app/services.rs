//! Service layer: pre-flight checks on top of the repository.
//!
//! Everything that passes the checks is forwarded unchanged, and repository
//! errors come back unaltered. The service never looks at storage details.

use std::sync::Arc;

use tracing::debug;

use catalog_core::{CatalogError, CatalogResult, Entity, PackageId, Pagination, ProductId};
use catalog_infra::CatalogRepository;
use catalog_products::{Package, Product};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: CatalogService,
}

impl AppServices {
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        Self {
            catalog: CatalogService::new(repo),
        }
    }
}

#[derive(Clone)]
pub struct CatalogService {
    repo: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_product_by_id(&self, id: ProductId) -> CatalogResult<Product> {
        self.repo.get_product_by_id(id).await
    }

    pub async fn get_all_products(&self, limit: i64, offset: i64) -> CatalogResult<Vec<Product>> {
        let page = Pagination::new(limit, offset)?;
        self.repo.get_all_products(page).await
    }

    /// Every product, unpaginated.
    pub async fn get_every_product(&self) -> CatalogResult<Vec<Product>> {
        self.repo.get_all_products(Pagination::all()).await
    }

    /// Insert `product`; on success `product.id` holds the returned id.
    pub async fn create_product(&self, product: &mut Product) -> CatalogResult<ProductId> {
        product.validate()?;
        let id = self.repo.create_product(product).await?;
        product.id = id;
        Ok(id)
    }

    pub async fn update_product(&self, product: &Product) -> CatalogResult<()> {
        if !product.is_persisted() {
            return Err(CatalogError::validation(format!(
                "product id must be positive, got {}",
                product.id
            ))
            .with_context("param", "id"));
        }
        product.validate()?;
        self.repo.update_product(product).await
    }

    pub async fn delete_product(&self, id: ProductId) -> CatalogResult<()> {
        self.repo.delete_product(id).await
    }

    pub async fn get_package_by_id(&self, id: PackageId) -> CatalogResult<Package> {
        self.repo.get_package_by_id(id).await
    }

    pub async fn list_packages(&self, limit: i64, offset: i64) -> CatalogResult<Vec<Package>> {
        let page = Pagination::new(limit, offset)?;
        self.repo.list_packages(page).await
    }

    /// An empty query lists packages instead of matching everything.
    pub async fn search_packages(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> CatalogResult<Vec<Package>> {
        let page = Pagination::new(limit, offset)?;
        if query.is_empty() {
            debug!("empty search query; listing packages");
            return self.repo.list_packages(page).await;
        }
        self.repo.search_packages(query, page).await
    }

    /// Compose `package`; on success `package.id` holds the returned id.
    pub async fn create_package(&self, package: &mut Package) -> CatalogResult<PackageId> {
        package.validate()?;
        let id = self.repo.create_package(package).await?;
        package.id = id;
        Ok(id)
    }

    pub async fn delete_package(&self, id: PackageId) -> CatalogResult<()> {
        self.repo.delete_package(id).await
    }
}
