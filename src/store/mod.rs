//! Persistence layer: local key/value caches.
//!
//! `MemoryCache` stands in for session storage (drafts), `LibSqlCache` for
//! durable local storage (submitted stage data, auth token).

pub mod libsql_backend;
pub mod memory;
pub mod schema;
pub mod traits;

pub use libsql_backend::LibSqlCache;
pub use memory::MemoryCache;
pub use traits::LocalCache;
