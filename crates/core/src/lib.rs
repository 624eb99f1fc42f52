//! `catalog-core`: foundation shared by every layer of the catalog service.
//!
//! This crate contains **pure** primitives (no IO): the error taxonomy, typed
//! identifiers, pagination and the entity trait.

pub mod entity;
pub mod error;
pub mod id;
pub mod pagination;

pub use entity::Entity;
pub use error::{is_kind, kind_of, CatalogError, CatalogResult, ErrorKind};
pub use id::{PackageId, ProductId};
pub use pagination::Pagination;
