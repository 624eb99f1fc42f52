//! Catalog schema bootstrap.

use sqlx::PgPool;
use tracing::info;

use catalog_core::{CatalogError, CatalogResult};

/// DDL for `product`, `package` and `packagecontent` (idempotent).
pub const CATALOG_SCHEMA: &str = include_str!("../../migrations/0001_catalog.sql");

/// Create the catalog tables if they do not exist yet.
///
/// When `schema` is non-empty it is created first; connections already carry
/// it as their `search_path`.
pub async fn ensure_schema(pool: &PgPool, schema: &str) -> CatalogResult<()> {
    if !schema.is_empty() {
        // The name is restricted to [A-Za-z0-9_] by config validation.
        let ddl = format!("CREATE SCHEMA IF NOT EXISTS \"{schema}\"");
        sqlx::raw_sql(&ddl)
            .execute(pool)
            .await
            .map_err(|e| CatalogError::internal(format!("failed to create schema {schema}")).with_source(e))?;
    }

    sqlx::raw_sql(CATALOG_SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| CatalogError::internal("failed to apply catalog schema").with_source(e))?;

    info!(schema, "catalog schema ready");
    Ok(())
}
