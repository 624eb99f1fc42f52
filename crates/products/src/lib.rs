//! Catalog domain module.
//!
//! Products and packages (bundles of products with per-line quantities),
//! implemented as plain domain values with semantic validation. No IO, no HTTP,
//! no storage.

pub mod package;
pub mod product;

pub use package::{Package, PackageContent};
pub use product::Product;
