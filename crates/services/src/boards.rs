//! # Board Service
//!
//! Entry points for board creation, lookup and every privileged mutation.
//! Identities arrive already hashed; this layer never sees raw cookies.

use std::sync::Arc;

use domains::validation::{validate_board_name, validate_column_name, validate_new_board};
use domains::{
    Board, BoardRepository, BoardState, BoardUpdate, Clock, DomainError, NewBoard, Result,
};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::authorization::AuthorizationEngine;
use crate::failures::{link_store_failure, store_failure};
use crate::lifecycle::BoardOperation;
use crate::links::LinkGenerator;

pub const DEFAULT_LINK_MAX_ATTEMPTS: u32 = 5;

const SHAREABLE_LINK_FIELD: &str = "shareable_link";

#[derive(Clone)]
pub struct BoardServiceConfig {
    /// Insert attempts before link issuance gives up
    pub link_max_attempts: u32,
    /// Operational recovery credential; `None` disables bypass deletion
    pub bypass_secret: Option<SecretString>,
}

impl Default for BoardServiceConfig {
    fn default() -> Self {
        Self { link_max_attempts: DEFAULT_LINK_MAX_ATTEMPTS, bypass_secret: None }
    }
}

pub struct BoardService {
    repo: Arc<dyn BoardRepository>,
    engine: AuthorizationEngine,
    links: Arc<dyn LinkGenerator>,
    clock: Arc<dyn Clock>,
    config: BoardServiceConfig,
}

impl BoardService {
    pub fn new(
        repo: Arc<dyn BoardRepository>,
        links: Arc<dyn LinkGenerator>,
        clock: Arc<dyn Clock>,
        config: BoardServiceConfig,
    ) -> Self {
        Self {
            engine: AuthorizationEngine::new(repo.clone()),
            repo,
            links,
            clock,
            config,
        }
    }

    /// Creates a board owned by `identity`.
    ///
    /// A fresh shareable link is drawn for each attempt. Only a unique
    /// violation on the link field triggers another attempt; any other store
    /// error is returned as is.
    #[instrument(skip(self, new, identity), fields(name = %new.name))]
    pub async fn create_board(&self, new: NewBoard, identity: &str) -> Result<Board> {
        validate_new_board(&new)?;

        let mut board = Board {
            id: Uuid::now_v7(),
            name: new.name,
            columns: new.columns,
            shareable_link: String::new(),
            state: BoardState::Active,
            card_limit_per_user: new.card_limit_per_user,
            reaction_limit_per_user: new.reaction_limit_per_user,
            created_by_hash: identity.to_owned(),
            admins: Vec::new(),
            created_at: self.clock.now(),
            closed_at: None,
        };

        for attempt in 1..=self.config.link_max_attempts {
            board.shareable_link = self.links.issue()?;
            match self.repo.insert(&board).await {
                Ok(()) => {
                    info!(board_id = %board.id, attempt, "board created");
                    return Ok(board);
                }
                Err(e) if e.is_duplicate(SHAREABLE_LINK_FIELD) => {
                    warn!(attempt, "shareable link collision, regenerating");
                }
                Err(e) => return Err(store_failure(board.id)(e)),
            }
        }

        Err(DomainError::ResourceExhausted(format!(
            "no unique shareable link after {} attempts",
            self.config.link_max_attempts
        )))
    }

    #[instrument(skip_all, fields(board_id = %id))]
    pub async fn get_board(&self, id: Uuid) -> Result<Board> {
        self.repo
            .find_by_id(id)
            .await
            .map_err(store_failure(id))?
            .ok_or_else(|| DomainError::NotFound("board", id.to_string()))
    }

    #[instrument(skip_all, fields(link = %code))]
    pub async fn get_board_by_link(&self, code: &str) -> Result<Board> {
        self.repo
            .find_by_shareable_link(code)
            .await
            .map_err(link_store_failure(code))?
            .ok_or_else(|| DomainError::NotFound("board", code.to_owned()))
    }

    #[instrument(skip_all, fields(board_id = %id))]
    pub async fn rename_board(&self, id: Uuid, name: &str, identity: &str) -> Result<Board> {
        validate_board_name(name)?;
        let update = BoardUpdate::Rename { name: name.to_owned() };
        self.engine.mutate(BoardOperation::Rename, id, identity, &update).await
    }

    /// Active -> closed. `closed_at` is written in the same atomic update.
    #[instrument(skip_all, fields(board_id = %id))]
    pub async fn close_board(&self, id: Uuid, identity: &str) -> Result<Board> {
        let update = BoardUpdate::Close { at: self.clock.now() };
        let board = self.engine.mutate(BoardOperation::Close, id, identity, &update).await?;
        info!(board_id = %id, "board closed");
        Ok(board)
    }

    #[instrument(skip_all, fields(board_id = %id))]
    pub async fn add_admin(&self, id: Uuid, new_admin: &str, identity: &str) -> Result<Board> {
        let update = BoardUpdate::AddAdmin { identity: new_admin.to_owned() };
        self.engine.mutate(BoardOperation::AddAdmin, id, identity, &update).await
    }

    /// Columns are fixed at creation, so checking the returned document for
    /// the column is as good as checking before the write.
    #[instrument(skip_all, fields(board_id = %id, column_id = %column_id))]
    pub async fn rename_column(
        &self,
        id: Uuid,
        column_id: &str,
        name: &str,
        identity: &str,
    ) -> Result<Board> {
        validate_column_name(name)?;
        let update = BoardUpdate::RenameColumn {
            column_id: column_id.to_owned(),
            name: name.to_owned(),
        };
        let board = self.engine.mutate(BoardOperation::RenameColumn, id, identity, &update).await?;
        if board.column(column_id).is_none() {
            return Err(DomainError::ColumnNotFound {
                board_id: id.to_string(),
                column_id: column_id.to_owned(),
            });
        }
        Ok(board)
    }

    /// Deletes a board. The creator may always delete; a caller presenting
    /// the configured bypass secret may delete any board. Sessions for the
    /// board are left in place.
    #[instrument(skip(self, identity, bypass_secret), fields(board_id = %id))]
    pub async fn delete_board(&self, id: Uuid, identity: &str, bypass_secret: Option<&str>) -> Result<()> {
        if let Some(presented) = bypass_secret {
            if self.bypass_matches(presented) {
                self.engine.delete_bypassing_roles(id).await?;
                warn!(board_id = %id, "board deleted with bypass secret");
                return Ok(());
            }
            warn!(board_id = %id, "invalid bypass secret presented");
        }

        self.engine.delete(id, identity).await?;
        info!(board_id = %id, "board deleted");
        Ok(())
    }

    fn bypass_matches(&self, presented: &str) -> bool {
        match &self.config.bypass_secret {
            Some(expected) => bool::from(
                presented
                    .as_bytes()
                    .ct_eq(expected.expose_secret().as_bytes()),
            ),
            None => false,
        }
    }
}
