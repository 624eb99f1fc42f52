//! Catalog persistence boundary.
//!
//! The repository is the only layer that knows about storage. It translates
//! every storage failure into the [`CatalogError`](catalog_core::CatalogError)
//! taxonomy before returning, so callers can classify failures by kind alone.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use catalog_core::{CatalogResult, PackageId, Pagination, ProductId};
use catalog_products::{Package, Product};

pub use in_memory::InMemoryCatalogRepository;
pub use postgres::PostgresCatalogRepository;

/// Products and packages, with storage errors already classified.
///
/// ## Failure kinds
///
/// | Operation | Kinds |
/// |---|---|
/// | `get_product_by_id`, `get_package_by_id` | `NotFound`, `Internal` |
/// | `get_all_products`, `list_packages`, `search_packages` | `Internal` |
/// | `create_product` | `Conflict` (sku), `Internal` |
/// | `update_product` | `NotFound`, `Conflict` (sku), `Internal` |
/// | `delete_product` | `NotFound`, `Conflict` (still referenced by a package), `Internal` |
/// | `create_package` | `Conflict` (name), `NotFound` (missing product), `Internal` |
/// | `delete_package` | `NotFound`, `Internal` |
///
/// ## Atomicity
///
/// `create_package` writes the package and all of its contents or nothing;
/// `delete_package` removes contents and package together.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_product_by_id(&self, id: ProductId) -> CatalogResult<Product>;

    /// Products ordered by id.
    async fn get_all_products(&self, page: Pagination) -> CatalogResult<Vec<Product>>;

    /// Insert `product` and write the assigned id back into it.
    async fn create_product(&self, product: &mut Product) -> CatalogResult<ProductId>;

    /// Full replacement of the product identified by `product.id`.
    async fn update_product(&self, product: &Product) -> CatalogResult<()>;

    async fn delete_product(&self, id: ProductId) -> CatalogResult<()>;

    /// The package together with all of its contents.
    async fn get_package_by_id(&self, id: PackageId) -> CatalogResult<Package>;

    /// Packages ordered by id, without contents.
    async fn list_packages(&self, page: Pagination) -> CatalogResult<Vec<Package>>;

    /// Packages whose name or description contains `query`, ignoring case.
    async fn search_packages(&self, query: &str, page: Pagination) -> CatalogResult<Vec<Package>>;

    /// Insert the package and its contents in one transaction and write the
    /// assigned id back into it.
    async fn create_package(&self, package: &mut Package) -> CatalogResult<PackageId>;

    async fn delete_package(&self, id: PackageId) -> CatalogResult<()>;
}

#[async_trait]
impl<R> CatalogRepository for Arc<R>
where
    R: CatalogRepository + ?Sized,
{
    async fn get_product_by_id(&self, id: ProductId) -> CatalogResult<Product> {
        (**self).get_product_by_id(id).await
    }

    async fn get_all_products(&self, page: Pagination) -> CatalogResult<Vec<Product>> {
        (**self).get_all_products(page).await
    }

    async fn create_product(&self, product: &mut Product) -> CatalogResult<ProductId> {
        (**self).create_product(product).await
    }

    async fn update_product(&self, product: &Product) -> CatalogResult<()> {
        (**self).update_product(product).await
    }

    async fn delete_product(&self, id: ProductId) -> CatalogResult<()> {
        (**self).delete_product(id).await
    }

    async fn get_package_by_id(&self, id: PackageId) -> CatalogResult<Package> {
        (**self).get_package_by_id(id).await
    }

    async fn list_packages(&self, page: Pagination) -> CatalogResult<Vec<Package>> {
        (**self).list_packages(page).await
    }

    async fn search_packages(&self, query: &str, page: Pagination) -> CatalogResult<Vec<Package>> {
        (**self).search_packages(query, page).await
    }

    async fn create_package(&self, package: &mut Package) -> CatalogResult<PackageId> {
        (**self).create_package(package).await
    }

    async fn delete_package(&self, id: PackageId) -> CatalogResult<()> {
        (**self).delete_package(id).await
    }
}
