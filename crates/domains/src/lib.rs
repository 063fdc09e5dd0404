//! retro-board/crates/domains/src/lib.rs
//!
//! The central domain types and interface definitions for Retro-Board.

pub mod error;
pub mod models;
pub mod predicate;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use predicate::*;
pub use traits::*;
