//! # Session Activity
//!
//! Presence per (board, identity). Uniqueness of the pair is left to the
//! store's upsert; nothing here reads before writing. Closing a board does
//! not touch its sessions.

use std::sync::Arc;
use std::time::Duration;

use domains::validation::validate_alias;
use domains::{ActiveUser, BoardRepository, Clock, DomainError, Result, SessionRepository, UserSession};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::failures::store_failure;

pub const DEFAULT_RECENCY_WINDOW: Duration = Duration::from_secs(120);

pub struct SessionService {
    sessions: Arc<dyn SessionRepository>,
    boards: Arc<dyn BoardRepository>,
    clock: Arc<dyn Clock>,
    recency_window: chrono::Duration,
}

fn session_not_found(board_id: Uuid, identity: &str) -> DomainError {
    DomainError::NotFound("session", format!("{board_id}/{identity}"))
}

impl SessionService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        boards: Arc<dyn BoardRepository>,
        clock: Arc<dyn Clock>,
        recency_window: Duration,
    ) -> Self {
        Self {
            sessions,
            boards,
            clock,
            recency_window: chrono::Duration::from_std(recency_window)
                .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_RECENCY_WINDOW.as_secs() as i64)),
        }
    }

    /// Creates the session or refreshes alias and activity on an existing one.
    #[instrument(skip(self, identity, alias), fields(board_id = %board_id))]
    pub async fn join(&self, board_id: Uuid, identity: &str, alias: &str) -> Result<UserSession> {
        validate_alias(alias)?;
        let board = self.boards.find_by_id(board_id).await.map_err(store_failure(board_id))?;
        if board.is_none() {
            return Err(DomainError::NotFound("board", board_id.to_string()));
        }
        let session = self
            .sessions
            .upsert(board_id, identity, alias, self.clock.now())
            .await
            .map_err(store_failure(board_id))?;
        debug!(board_id = %board_id, "session joined");
        Ok(session)
    }

    /// Unknown sessions are an error: the client holds a stale or forged identity.
    #[instrument(skip(self, identity), fields(board_id = %board_id))]
    pub async fn heartbeat(&self, board_id: Uuid, identity: &str) -> Result<UserSession> {
        self.sessions
            .touch(board_id, identity, self.clock.now())
            .await
            .map_err(store_failure(board_id))?
            .ok_or_else(|| session_not_found(board_id, identity))
    }

    #[instrument(skip(self, identity, alias), fields(board_id = %board_id))]
    pub async fn rename(&self, board_id: Uuid, identity: &str, alias: &str) -> Result<UserSession> {
        validate_alias(alias)?;
        self.sessions
            .update_alias(board_id, identity, alias, self.clock.now())
            .await
            .map_err(store_failure(board_id))?
            .ok_or_else(|| session_not_found(board_id, identity))
    }

    #[instrument(skip(self, identity), fields(board_id = %board_id))]
    pub async fn get(&self, board_id: Uuid, identity: &str) -> Result<UserSession> {
        self.sessions
            .find(board_id, identity)
            .await
            .map_err(store_failure(board_id))?
            .ok_or_else(|| session_not_found(board_id, identity))
    }

    /// Sessions active within the recency window, most recent first, with
    /// `is_admin` computed against the board as it is now.
    #[instrument(skip(self), fields(board_id = %board_id))]
    pub async fn list_active(&self, board_id: Uuid) -> Result<Vec<ActiveUser>> {
        let board = self
            .boards
            .find_by_id(board_id)
            .await
            .map_err(store_failure(board_id))?
            .ok_or_else(|| DomainError::NotFound("board", board_id.to_string()))?;
        let since = self.clock.now() - self.recency_window;
        let sessions = self
            .sessions
            .list_active_since(board_id, since)
            .await
            .map_err(store_failure(board_id))?;
        Ok(sessions
            .into_iter()
            .map(|s| ActiveUser::project(s, &board))
            .collect())
    }

    /// Bulk removal. Board deletion does not call this yet.
    #[instrument(skip(self), fields(board_id = %board_id))]
    pub async fn delete_all_for_board(&self, board_id: Uuid) -> Result<u64> {
        let removed = self
            .sessions
            .delete_all_for_board(board_id)
            .await
            .map_err(store_failure(board_id))?;
        debug!(board_id = %board_id, removed, "sessions removed");
        Ok(removed)
    }
}
