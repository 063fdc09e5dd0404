//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be used by the services.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{Board, UserSession};
use crate::predicate::{BoardFilter, BoardUpdate};

/// Document persistence contract for boards.
///
/// Implementations must guarantee single-document atomicity for
/// `find_one_and_update` and `delete_one`, and must enforce uniqueness of
/// `shareable_link`, reporting a violation as
/// `StoreError::DuplicateKey { field: "shareable_link" }`.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BoardRepository: Send + Sync {
    async fn insert(&self, board: &Board) -> StoreResult<()>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Board>>;
    async fn find_by_shareable_link(&self, code: &str) -> StoreResult<Option<Board>>;

    /// Applies `update` to the board matching `filter` and returns the
    /// post-update document, or `None` if nothing matched.
    async fn find_one_and_update(&self, filter: &BoardFilter, update: &BoardUpdate) -> StoreResult<Option<Board>>;

    /// Deletes the board matching `filter`. Returns whether a document was removed.
    async fn delete_one(&self, filter: &BoardFilter) -> StoreResult<bool>;
}

/// Presence persistence contract. At most one row per (board_id, cookie_hash).
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert-or-update keyed on (board_id, cookie_hash). On conflict only
    /// `alias` and `last_active_at` change.
    async fn upsert(&self, board_id: Uuid, cookie_hash: &str, alias: &str, now: DateTime<Utc>) -> StoreResult<UserSession>;
    async fn find(&self, board_id: Uuid, cookie_hash: &str) -> StoreResult<Option<UserSession>>;
    async fn touch(&self, board_id: Uuid, cookie_hash: &str, now: DateTime<Utc>) -> StoreResult<Option<UserSession>>;
    async fn update_alias(&self, board_id: Uuid, cookie_hash: &str, alias: &str, now: DateTime<Utc>) -> StoreResult<Option<UserSession>>;

    /// Sessions with `last_active_at >= since`, most recent first.
    async fn list_active_since(&self, board_id: Uuid, since: DateTime<Utc>) -> StoreResult<Vec<UserSession>>;
    async fn delete_all_for_board(&self, board_id: Uuid) -> StoreResult<u64>;
}

/// Turns an opaque client credential (the board cookie) into a stable
/// pseudonymous identity string.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IdentityHasher: Send + Sync {
    fn hash(&self, credential: &str) -> String;
}

/// Time source, injectable so recency windows can be tested.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
