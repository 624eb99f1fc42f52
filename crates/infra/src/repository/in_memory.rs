use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use catalog_core::{CatalogError, CatalogResult, Entity, PackageId, Pagination, ProductId};
use catalog_products::{Package, Product};

use super::CatalogRepository;

/// Rows of one entity type keyed by id, with a monotonic id sequence.
#[derive(Debug)]
struct Table<E: Entity> {
    next_id: i64,
    rows: BTreeMap<E::Id, E>,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<E: Entity> Table<E> {
    fn insert(&mut self, mut row: E) -> E::Id {
        let id: E::Id = self.next_id.into();
        self.next_id += 1;
        row.assign_id(id);
        self.rows.insert(id, row);
        id
    }
}

#[derive(Debug, Default)]
struct State {
    products: Table<Product>,
    packages: Table<Package>,
}

impl State {
    /// Another stored product already carries `product`'s non-empty sku.
    fn sku_taken(&self, product: &Product) -> bool {
        product.has_sku()
            && self
                .products
                .rows
                .values()
                .any(|p| p.sku == product.sku && p.id != product.id)
    }

    fn is_referenced(&self, id: ProductId) -> bool {
        self.packages
            .rows
            .values()
            .any(|pkg| pkg.contents.iter().any(|line| line.product_id == id))
    }
}

/// In-memory catalog repository.
///
/// Enforces the same uniqueness and reference rules as the Postgres schema.
/// Every write checks all of its rules before touching state, so a failed
/// write leaves nothing behind. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCatalogRepository {
    state: RwLock<State>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> CatalogResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| CatalogError::internal("catalog state lock poisoned"))
    }

    fn write(&self) -> CatalogResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| CatalogError::internal("catalog state lock poisoned"))
    }
}

fn product_not_found(id: ProductId) -> CatalogError {
    CatalogError::not_found(format!("product {id} not found")).with_context("product_id", id)
}

fn package_not_found(id: PackageId) -> CatalogError {
    CatalogError::not_found(format!("package {id} not found")).with_context("package_id", id)
}

fn sku_conflict(sku: &str) -> CatalogError {
    CatalogError::conflict(format!("product with sku {sku:?} already exists"))
        .with_context("attribute", "sku")
        .with_context("sku", sku)
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn get_product_by_id(&self, id: ProductId) -> CatalogResult<Product> {
        let state = self.read()?;
        state
            .products
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| product_not_found(id))
    }

    async fn get_all_products(&self, page: Pagination) -> CatalogResult<Vec<Product>> {
        let state = self.read()?;
        Ok(page.apply(state.products.rows.values().cloned()))
    }

    async fn create_product(&self, product: &mut Product) -> CatalogResult<ProductId> {
        let mut state = self.write()?;
        if state.sku_taken(product) {
            return Err(sku_conflict(&product.sku));
        }
        let id = state.products.insert(product.clone());
        product.id = id;
        Ok(id)
    }

    async fn update_product(&self, product: &Product) -> CatalogResult<()> {
        let mut state = self.write()?;
        if !state.products.rows.contains_key(&product.id) {
            return Err(product_not_found(product.id));
        }
        if state.sku_taken(product) {
            return Err(sku_conflict(&product.sku));
        }
        state.products.rows.insert(product.id, product.clone());
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> CatalogResult<()> {
        let mut state = self.write()?;
        if !state.products.rows.contains_key(&id) {
            return Err(product_not_found(id));
        }
        if state.is_referenced(id) {
            return Err(CatalogError::conflict(format!("product {id} is part of a package"))
                .with_context("product_id", id));
        }
        state.products.rows.remove(&id);
        Ok(())
    }

    async fn get_package_by_id(&self, id: PackageId) -> CatalogResult<Package> {
        let state = self.read()?;
        let mut package = state
            .packages
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| package_not_found(id))?;
        package.contents.sort_by_key(|line| line.product_id);
        Ok(package)
    }

    async fn list_packages(&self, page: Pagination) -> CatalogResult<Vec<Package>> {
        let state = self.read()?;
        Ok(page.apply(state.packages.rows.values().map(Package::header)))
    }

    async fn search_packages(&self, query: &str, page: Pagination) -> CatalogResult<Vec<Package>> {
        let state = self.read()?;
        Ok(page.apply(
            state
                .packages
                .rows
                .values()
                .filter(|pkg| pkg.matches(query))
                .map(Package::header),
        ))
    }

    async fn create_package(&self, package: &mut Package) -> CatalogResult<PackageId> {
        let mut state = self.write()?;

        if state.packages.rows.values().any(|p| p.name == package.name) {
            return Err(CatalogError::conflict(format!(
                "package with name {:?} already exists",
                package.name
            ))
            .with_context("attribute", "name")
            .with_context("name", &package.name));
        }
        let mut seen = HashSet::with_capacity(package.contents.len());
        for line in &package.contents {
            if !state.products.rows.contains_key(&line.product_id) {
                return Err(product_not_found(line.product_id));
            }
            if !seen.insert(line.product_id) {
                return Err(CatalogError::conflict(format!(
                    "product {} appears more than once in package",
                    line.product_id
                ))
                .with_context("product_id", line.product_id));
            }
        }

        let id = state.packages.insert(package.clone());
        package.id = id;
        Ok(id)
    }

    async fn delete_package(&self, id: PackageId) -> CatalogResult<()> {
        let mut state = self.write()?;
        state
            .packages
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| package_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::ErrorKind;
    use catalog_products::PackageContent;

    async fn seeded() -> (InMemoryCatalogRepository, ProductId, ProductId) {
        let repo = InMemoryCatalogRepository::new();
        let a = repo
            .create_product(&mut Product::draft("Oats", 3.5, "OAT-1"))
            .await
            .unwrap();
        let b = repo
            .create_product(&mut Product::draft("Milk", 1.2, ""))
            .await
            .unwrap();
        (repo, a, b)
    }

    #[tokio::test]
    async fn ids_are_positive_and_increase() {
        let (repo, a, b) = seeded().await;
        assert!(a.get() > 0);
        assert!(b > a);

        let mut c = Product::draft("Honey", 7.0, "");
        let id = repo.create_product(&mut c).await.unwrap();
        assert_eq!(c.id, id);
        assert!(id > b);
    }

    #[tokio::test]
    async fn created_product_reads_back_unchanged() {
        let (repo, a, _) = seeded().await;
        let got = repo.get_product_by_id(a).await.unwrap();
        assert_eq!(got.name, "Oats");
        assert_eq!(got.sku, "OAT-1");
        assert_eq!(got.id, a);
    }

    #[tokio::test]
    async fn duplicate_sku_is_a_conflict_but_empty_skus_are_not() {
        let (repo, _, _) = seeded().await;
        let err = repo
            .create_product(&mut Product::draft("Oats again", 1.0, "OAT-1"))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Conflict));
        assert!(err.message().contains("sku"));

        repo.create_product(&mut Product::draft("No sku", 1.0, ""))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_keeps_own_sku_and_rejects_missing_rows() {
        let (repo, a, _) = seeded().await;
        let mut p = repo.get_product_by_id(a).await.unwrap();
        p.price = 4.0;
        repo.update_product(&p).await.unwrap();
        assert_eq!(repo.get_product_by_id(a).await.unwrap().price, 4.0);

        p.id = ProductId::new(999);
        let err = repo.update_product(&p).await.unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let (repo, a, _) = seeded().await;
        repo.delete_product(a).await.unwrap();
        assert!(repo.get_product_by_id(a).await.unwrap_err().is(ErrorKind::NotFound));
        assert!(repo.delete_product(a).await.unwrap_err().is(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn referenced_product_cannot_be_deleted() {
        let (repo, a, _) = seeded().await;
        let mut pkg = Package::draft("Breakfast", "").with_line(a, 2);
        repo.create_package(&mut pkg).await.unwrap();

        let err = repo.delete_product(a).await.unwrap_err();
        assert!(err.is(ErrorKind::Conflict));
        assert!(repo.get_product_by_id(a).await.is_ok());
    }

    #[tokio::test]
    async fn package_round_trips_with_its_contents() {
        let (repo, a, b) = seeded().await;
        let mut pkg = Package::draft("Breakfast", "Morning box")
            .with_line(b, 1)
            .with_line(a, 2);
        let id = repo.create_package(&mut pkg).await.unwrap();
        assert_eq!(pkg.id, id);

        let got = repo.get_package_by_id(id).await.unwrap();
        assert_eq!(got.name, "Breakfast");
        assert_eq!(got.content_set(), pkg.content_set());
        assert_eq!(got.contents[0], PackageContent::new(a, 2));
    }

    #[tokio::test]
    async fn failed_package_create_leaves_nothing_behind() {
        let (repo, a, _) = seeded().await;
        let mut pkg = Package::draft("Broken", "")
            .with_line(a, 1)
            .with_line(ProductId::new(999), 1);
        let err = repo.create_package(&mut pkg).await.unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
        assert!(err.message().contains("999"));

        let all = repo.list_packages(Pagination::all()).await.unwrap();
        assert!(all.is_empty());
        // The product is still unreferenced.
        repo.delete_product(a).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_package_name_is_a_conflict() {
        let (repo, _, _) = seeded().await;
        repo.create_package(&mut Package::draft("Box", "")).await.unwrap();
        let err = repo
            .create_package(&mut Package::draft("Box", "other"))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Conflict));
        assert_eq!(err.context().get("attribute").map(String::as_str), Some("name"));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_paginated() {
        let (repo, _, _) = seeded().await;
        for (name, desc) in [
            ("Breakfast Box", ""),
            ("Lunch", "a hearty BREAKFAST alternative"),
            ("Dinner", "evening"),
        ] {
            repo.create_package(&mut Package::draft(name, desc)).await.unwrap();
        }

        let hits = repo
            .search_packages("breakfast", Pagination::all())
            .await
            .unwrap();
        let names: Vec<_> = hits.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Breakfast Box", "Lunch"]);

        let second = repo
            .search_packages("breakfast", Pagination::new(1, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].name, "Lunch");

        let none = repo
            .search_packages("breakfast", Pagination::new(0, 0).unwrap())
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn delete_package_removes_contents_and_releases_products() {
        let (repo, a, _) = seeded().await;
        let mut pkg = Package::draft("Box", "").with_line(a, 3);
        let id = repo.create_package(&mut pkg).await.unwrap();

        repo.delete_package(id).await.unwrap();
        assert!(repo.get_package_by_id(id).await.unwrap_err().is(ErrorKind::NotFound));
        assert!(repo.delete_package(id).await.unwrap_err().is(ErrorKind::NotFound));
        repo.delete_product(a).await.unwrap();
    }

    #[tokio::test]
    async fn listings_omit_contents() {
        let (repo, a, _) = seeded().await;
        repo.create_package(&mut Package::draft("Box", "").with_line(a, 1))
            .await
            .unwrap();
        let all = repo.list_packages(Pagination::all()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].contents.is_empty());
    }

    #[tokio::test]
    async fn repeated_product_line_is_a_conflict() {
        let (repo, a, _) = seeded().await;
        let mut pkg = Package::draft("Doubled", "").with_line(a, 1).with_line(a, 2);

        let err = repo.create_package(&mut pkg).await.unwrap_err();
        assert!(err.is(ErrorKind::Conflict));
        assert!(err.message().contains("more than once"));
        assert!(repo.list_packages(Pagination::all()).await.unwrap().is_empty());
        assert!(!pkg.is_persisted());
    }
}
