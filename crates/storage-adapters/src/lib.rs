//! # storage-adapters
//!
//! Document Store implementations of the `domains` persistence ports.
//! `MemoryStore` is always compiled; `PostgresStore` sits behind the
//! `db-postgres` feature.

pub mod memory;
#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "db-postgres")]
pub use postgres::PostgresStore;
