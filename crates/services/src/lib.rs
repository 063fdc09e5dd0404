//! # services
//!
//! Business logic for Retro-Board: link issuance, the board authorization
//! engine and lifecycle, and session activity tracking. All persistence goes
//! through the `domains` ports.

pub mod authorization;
pub mod boards;
mod failures;
pub mod lifecycle;
pub mod links;
pub mod sessions;

pub use authorization::AuthorizationEngine;
pub use boards::{BoardService, BoardServiceConfig, DEFAULT_LINK_MAX_ATTEMPTS};
pub use lifecycle::{BoardOperation, Requirement};
pub use links::{LinkGenerator, RandomLinkGenerator, DEFAULT_LINK_LENGTH};
pub use sessions::{SessionService, DEFAULT_RECENCY_WINDOW};
