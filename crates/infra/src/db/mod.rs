//! Database adapters (connection pool bootstrap, schema).

pub mod pool;
pub mod schema;

pub use pool::{connect_with_retry, pool_options};
pub use schema::ensure_schema;
