//! Postgres-backed catalog repository.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `CatalogError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | ErrorKind | Scenario |
//! |------------|----------------------|-----------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate `product.sku` or `package.packagename` |
//! | Database (foreign key violation) | `23503` | `NotFound` / `Conflict` | Content line references a missing product / product still referenced by a package |
//! | Database (check violation) | `23514` | `Validation` | Negative price, non-positive quantity |
//! | RowNotFound | N/A | `NotFound` | `fetch_one` on a single-id lookup |
//! | Any other | Any other | `Internal` | Network errors, pool closed, commit failure, ... |
//!
//! `UPDATE`/`DELETE` statements pinned to one id report `NotFound` when they
//! affect zero rows.
//!
//! ## Thread Safety
//!
//! `PostgresCatalogRepository` is `Send + Sync` and can be shared across
//! request handlers; all access goes through the SQLx connection pool.
//!
//! ## Cancellation
//!
//! Every statement is awaited inside the caller's future. Dropping that future
//! abandons the statement, and a `Transaction` that was never committed rolls
//! back when dropped (including while unwinding from a panic).

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use catalog_core::{CatalogError, CatalogResult, PackageId, Pagination, ProductId};
use catalog_products::{Package, PackageContent, Product};

use super::CatalogRepository;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Catalog repository over a shared Postgres pool.
#[derive(Debug, Clone)]
pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> CatalogResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product_by_id(&self, id: ProductId) -> CatalogResult<Product> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price, imageurl, COALESCE(sku, '') AS sku
            FROM product
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product_by_id", e))?;

        match row {
            Some(row) => Ok(ProductRow::from_row(&row)
                .map_err(|e| map_sqlx_error("decode_product", e))?
                .into()),
            None => Err(CatalogError::not_found(format!("product {id} not found"))
                .with_context("product_id", id)),
        }
    }

    #[instrument(skip(self), fields(limit = page.limit(), offset = page.offset()), err)]
    async fn get_all_products(&self, page: Pagination) -> CatalogResult<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price, imageurl, COALESCE(sku, '') AS sku
            FROM product
            ORDER BY id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_all_products", e))?;

        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            let product = ProductRow::from_row(&row).map_err(|e| map_sqlx_error("decode_product", e))?;
            products.push(product.into());
        }
        Ok(products)
    }

    #[instrument(skip(self, product), fields(sku = %product.sku), err)]
    async fn create_product(&self, product: &mut Product) -> CatalogResult<ProductId> {
        let id: i64 = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO product (name, description, price, imageurl, sku)
            VALUES ($1, $2, $3, $4, NULLIF($5, ''))
            RETURNING id
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.image_url)
        .bind(&product.sku)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_violation(&e, UNIQUE_VIOLATION) {
                sku_conflict(&product.sku).with_source(e)
            } else {
                map_sqlx_error("create_product", e)
            }
        })?;

        product.id = ProductId::new(id);
        Ok(product.id)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn update_product(&self, product: &Product) -> CatalogResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE product
            SET name = $2,
                description = $3,
                price = $4,
                imageurl = $5,
                sku = NULLIF($6, '')
            WHERE id = $1
            "#,
        )
        .bind(product.id.get())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.image_url)
        .bind(&product.sku)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_violation(&e, UNIQUE_VIOLATION) {
                sku_conflict(&product.sku).with_source(e)
            } else {
                map_sqlx_error("update_product", e)
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::not_found(format!("product {} not found", product.id))
                .with_context("product_id", product.id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> CatalogResult<()> {
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_violation(&e, FOREIGN_KEY_VIOLATION) {
                    CatalogError::conflict(format!("product {id} is part of a package"))
                        .with_context("product_id", id)
                        .with_source(e)
                } else {
                    map_sqlx_error("delete_product", e)
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::not_found(format!("product {id} not found"))
                .with_context("product_id", id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(package_id = %id), err)]
    async fn get_package_by_id(&self, id: PackageId) -> CatalogResult<Package> {
        // One statement so header and lines come from the same snapshot.
        let rows = sqlx::query(
            r#"
            SELECT p.packageid, p.packagename, p.description, c.productid, c.quantity
            FROM package p
            LEFT JOIN packagecontent c ON c.packageid = p.packageid
            WHERE p.packageid = $1
            ORDER BY c.productid ASC
            "#,
        )
        .bind(id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_package_by_id", e))?;

        let Some(first) = rows.first() else {
            return Err(CatalogError::not_found(format!("package {id} not found"))
                .with_context("package_id", id));
        };

        let mut package: Package = PackageRow::from_row(first)
            .map_err(|e| map_sqlx_error("decode_package", e))?
            .into();

        for row in &rows {
            let product_id: Option<i64> = row
                .try_get("productid")
                .map_err(|e| map_sqlx_error("decode_package_content", e))?;
            let quantity: Option<i32> = row
                .try_get("quantity")
                .map_err(|e| map_sqlx_error("decode_package_content", e))?;
            if let (Some(product_id), Some(quantity)) = (product_id, quantity) {
                package
                    .contents
                    .push(PackageContent::new(ProductId::new(product_id), quantity));
            }
        }

        Ok(package)
    }

    #[instrument(skip(self), fields(limit = page.limit(), offset = page.offset()), err)]
    async fn list_packages(&self, page: Pagination) -> CatalogResult<Vec<Package>> {
        let rows = sqlx::query(
            r#"
            SELECT packageid, packagename, description
            FROM package
            ORDER BY packageid ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_packages", e))?;

        decode_packages(rows)
    }

    #[instrument(skip(self), fields(limit = page.limit(), offset = page.offset()), err)]
    async fn search_packages(&self, query: &str, page: Pagination) -> CatalogResult<Vec<Package>> {
        let pattern = format!("%{}%", escape_like(query));

        let rows = sqlx::query(
            r#"
            SELECT packageid, packagename, description
            FROM package
            WHERE packagename ILIKE $1 OR description ILIKE $1
            ORDER BY packageid ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("search_packages", e))?;

        decode_packages(rows)
    }

    /// Composition transaction: package row, then one row per content line,
    /// then commit. Any failure drops the transaction, which rolls it back.
    #[instrument(
        skip(self, package),
        fields(package_name = %package.name, lines = package.contents.len()),
        err
    )]
    async fn create_package(&self, package: &mut Package) -> CatalogResult<PackageId> {
        let mut tx = self.begin().await?;

        let id: i64 = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO package (packagename, description)
            VALUES ($1, $2)
            RETURNING packageid
            "#,
        )
        .bind(&package.name)
        .bind(&package.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_violation(&e, UNIQUE_VIOLATION) {
                CatalogError::conflict(format!("package with name {:?} already exists", package.name))
                    .with_context("attribute", "name")
                    .with_context("name", &package.name)
                    .with_source(e)
            } else {
                map_sqlx_error("insert_package", e)
            }
        })?;

        for line in &package.contents {
            sqlx::query(
                r#"
                INSERT INTO packagecontent (packageid, productid, quantity)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(id)
            .bind(line.product_id.get())
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_violation(&e, FOREIGN_KEY_VIOLATION) {
                    CatalogError::not_found(format!("product {} not found", line.product_id))
                        .with_context("product_id", line.product_id)
                        .with_source(e)
                } else if is_violation(&e, UNIQUE_VIOLATION) {
                    CatalogError::conflict(format!(
                        "product {} appears more than once in package",
                        line.product_id
                    ))
                    .with_context("product_id", line.product_id)
                    .with_source(e)
                } else {
                    map_sqlx_error("insert_package_content", e)
                }
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| CatalogError::internal("failed to commit package").with_source(e))?;

        let id = PackageId::new(id);
        package.id = id;
        Ok(id)
    }

    #[instrument(skip(self), fields(package_id = %id), err)]
    async fn delete_package(&self, id: PackageId) -> CatalogResult<()> {
        let mut tx = self.begin().await?;

        // Zero content rows is fine: a package may be empty.
        sqlx::query("DELETE FROM packagecontent WHERE packageid = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_package_content", e))?;

        let result = sqlx::query("DELETE FROM package WHERE packageid = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_package", e))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(CatalogError::not_found(format!("package {id} not found"))
                .with_context("package_id", id));
        }

        tx.commit()
            .await
            .map_err(|e| CatalogError::internal("failed to commit package delete").with_source(e))?;
        Ok(())
    }
}

fn sku_conflict(sku: &str) -> CatalogError {
    CatalogError::conflict(format!("product with sku {sku:?} already exists"))
        .with_context("attribute", "sku")
        .with_context("sku", sku)
}

/// Make `query` match literally inside an `ILIKE` pattern.
fn escape_like(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn decode_packages(rows: Vec<PgRow>) -> CatalogResult<Vec<Package>> {
    let mut packages = Vec::with_capacity(rows.len());
    for row in rows {
        let package = PackageRow::from_row(&row).map_err(|e| map_sqlx_error("decode_package", e))?;
        packages.push(package.into());
    }
    Ok(packages)
}

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| code.into_owned())
}

/// Check if an error carries a given SQLSTATE.
fn is_violation(err: &sqlx::Error, code: &str) -> bool {
    sqlstate(err).as_deref() == Some(code)
}

/// Map SQLx errors that have no call-site specific meaning.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> CatalogError {
    match sqlstate(&err).as_deref() {
        Some(UNIQUE_VIOLATION) => {
            return CatalogError::conflict(format!("duplicate value in {operation}"))
                .with_context("operation", operation)
                .with_source(err);
        }
        Some(FOREIGN_KEY_VIOLATION) => {
            return CatalogError::conflict(format!("referential integrity violated in {operation}"))
                .with_context("operation", operation)
                .with_source(err);
        }
        Some(CHECK_VIOLATION) => {
            return CatalogError::validation(format!("value rejected by storage in {operation}"))
                .with_context("operation", operation)
                .with_source(err);
        }
        _ => {}
    }

    match err {
        sqlx::Error::RowNotFound => {
            CatalogError::not_found(format!("no rows in {operation}")).with_context("operation", operation)
        }
        err => CatalogError::internal(format!("storage error in {operation}"))
            .with_context("operation", operation)
            .with_source(err),
    }
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: i64,
    name: String,
    description: String,
    price: f64,
    imageurl: String,
    sku: String,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            imageurl: row.try_get("imageurl")?,
            sku: row.try_get("sku")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            image_url: row.imageurl,
            sku: row.sku,
        }
    }
}

#[derive(Debug)]
struct PackageRow {
    packageid: i64,
    packagename: String,
    description: String,
}

impl<'r> FromRow<'r, PgRow> for PackageRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(PackageRow {
            packageid: row.try_get("packageid")?,
            packagename: row.try_get("packagename")?,
            description: row.try_get("description")?,
        })
    }
}

impl From<PackageRow> for Package {
    fn from(row: PackageRow) -> Self {
        Package {
            id: PackageId::new(row.packageid),
            name: row.packagename,
            description: row.description,
            contents: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::ErrorKind;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("Breakfast"), "Breakfast");
        assert_eq!(escape_like(""), "");
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = map_sqlx_error("get_product_by_id", sqlx::Error::RowNotFound);
        assert!(err.is(ErrorKind::NotFound));
    }

    #[test]
    fn other_failures_are_internal_and_keep_their_cause() {
        let err = map_sqlx_error("list_packages", sqlx::Error::PoolClosed);
        assert!(err.is(ErrorKind::Internal));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.context().get("operation").map(String::as_str), Some("list_packages"));
    }

    #[test]
    fn sku_conflict_names_the_attribute() {
        let err = sku_conflict("DUP");
        assert!(err.is(ErrorKind::Conflict));
        assert!(err.message().contains("sku"));
        assert_eq!(err.context().get("attribute").map(String::as_str), Some("sku"));
    }
}
