//! # In-Memory Document Store
//!
//! DashMap-backed implementation of the board and session ports.
//!
//! A `get_mut` / `remove_if` / `entry` call holds the shard write lock for
//! the key, so predicate evaluation and mutation happen under one lock and
//! concurrent callers see them as a single step. Lock order is always
//! `links` before `boards`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{
    Board, BoardFilter, BoardRepository, BoardUpdate, SessionRepository, StoreError, StoreResult,
    UserSession,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    boards: DashMap<Uuid, Board>,
    /// Unique index on `shareable_link`
    links: DashMap<String, Uuid>,
    sessions: DashMap<(Uuid, String), UserSession>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board_count(&self) -> usize {
        self.boards.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl BoardRepository for MemoryStore {
    async fn insert(&self, board: &Board) -> StoreResult<()> {
        let Entry::Vacant(link_slot) = self.links.entry(board.shareable_link.clone()) else {
            debug!(link = %board.shareable_link, "shareable link already taken");
            return Err(StoreError::DuplicateKey { field: "shareable_link" });
        };
        match self.boards.entry(board.id) {
            Entry::Occupied(_) => return Err(StoreError::DuplicateKey { field: "id" }),
            Entry::Vacant(slot) => {
                slot.insert(board.clone());
            }
        }
        link_slot.insert(board.id);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Board>> {
        Ok(self.boards.get(&id).map(|b| b.value().clone()))
    }

    async fn find_by_shareable_link(&self, code: &str) -> StoreResult<Option<Board>> {
        let id = match self.links.get(code) {
            Some(id) => *id.value(),
            None => return Ok(None),
        };
        self.find_by_id(id).await
    }

    async fn find_one_and_update(&self, filter: &BoardFilter, update: &BoardUpdate) -> StoreResult<Option<Board>> {
        let Some(mut board) = self.boards.get_mut(&filter.id) else {
            return Ok(None);
        };
        if !filter.matches(board.value()) {
            return Ok(None);
        }
        update.apply(board.value_mut());
        Ok(Some(board.value().clone()))
    }

    async fn delete_one(&self, filter: &BoardFilter) -> StoreResult<bool> {
        match self.boards.remove_if(&filter.id, |_, board| filter.matches(board)) {
            Some((_, board)) => {
                self.links.remove(&board.shareable_link);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn upsert(&self, board_id: Uuid, cookie_hash: &str, alias: &str, now: DateTime<Utc>) -> StoreResult<UserSession> {
        let session = self
            .sessions
            .entry((board_id, cookie_hash.to_owned()))
            .and_modify(|s| {
                s.alias = alias.to_owned();
                s.last_active_at = now;
            })
            .or_insert_with(|| UserSession {
                board_id,
                cookie_hash: cookie_hash.to_owned(),
                alias: alias.to_owned(),
                last_active_at: now,
                created_at: now,
            });
        Ok(session.value().clone())
    }

    async fn find(&self, board_id: Uuid, cookie_hash: &str) -> StoreResult<Option<UserSession>> {
        Ok(self
            .sessions
            .get(&(board_id, cookie_hash.to_owned()))
            .map(|s| s.value().clone()))
    }

    async fn touch(&self, board_id: Uuid, cookie_hash: &str, now: DateTime<Utc>) -> StoreResult<Option<UserSession>> {
        Ok(self
            .sessions
            .get_mut(&(board_id, cookie_hash.to_owned()))
            .map(|mut s| {
                s.last_active_at = now;
                s.value().clone()
            }))
    }

    async fn update_alias(
        &self,
        board_id: Uuid,
        cookie_hash: &str,
        alias: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<UserSession>> {
        Ok(self
            .sessions
            .get_mut(&(board_id, cookie_hash.to_owned()))
            .map(|mut s| {
                s.alias = alias.to_owned();
                s.last_active_at = now;
                s.value().clone()
            }))
    }

    async fn list_active_since(&self, board_id: Uuid, since: DateTime<Utc>) -> StoreResult<Vec<UserSession>> {
        let mut active: Vec<UserSession> = self
            .sessions
            .iter()
            .filter(|s| s.key().0 == board_id && s.last_active_at >= since)
            .map(|s| s.value().clone())
            .collect();
        active.sort_by(|a, b| b.last_active_at.cmp(&a.last_active_at));
        Ok(active)
    }

    async fn delete_all_for_board(&self, board_id: Uuid) -> StoreResult<u64> {
        let mut removed = 0;
        self.sessions.retain(|(b, _), _| {
            let keep = *b != board_id;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}
