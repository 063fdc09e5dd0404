//! # Board Authorization Engine
//!
//! Every privileged mutation is one conditional write: the filter built from
//! `BoardOperation::requirement` and the mutation go to the store together,
//! and the store decides atomically. There is no read-check-then-write path.
//!
//! When the write matches nothing, a follow-up lookup classifies the miss as
//! not-found, conflict or forbidden. That lookup only explains a failure
//! which has already happened; it never authorizes anything.

use std::sync::Arc;

use domains::{Board, BoardFilter, BoardRepository, BoardUpdate, DomainError, Result};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::failures::store_failure;
use crate::lifecycle::BoardOperation;

#[derive(Clone)]
pub struct AuthorizationEngine {
    repo: Arc<dyn BoardRepository>,
}

impl AuthorizationEngine {
    pub fn new(repo: Arc<dyn BoardRepository>) -> Self {
        Self { repo }
    }

    /// Applies `update` if `identity` may perform `operation` on the board
    /// in its current state. Returns the post-update board.
    #[instrument(skip(self, identity, update), fields(board_id = %board_id, operation = %operation))]
    pub async fn mutate(
        &self,
        operation: BoardOperation,
        board_id: Uuid,
        identity: &str,
        update: &BoardUpdate,
    ) -> Result<Board> {
        let filter = operation.filter(board_id, identity);
        match self
            .repo
            .find_one_and_update(&filter, update)
            .await
            .map_err(store_failure(board_id))?
        {
            Some(board) => Ok(board),
            None => Err(self.classify_miss(operation, board_id).await),
        }
    }

    /// Creator-gated delete.
    #[instrument(skip(self, identity), fields(board_id = %board_id))]
    pub async fn delete(&self, board_id: Uuid, identity: &str) -> Result<()> {
        let operation = BoardOperation::Delete;
        let filter = operation.filter(board_id, identity);
        if self.repo.delete_one(&filter).await.map_err(store_failure(board_id))? {
            Ok(())
        } else {
            Err(self.classify_miss(operation, board_id).await)
        }
    }

    /// Delete with no role clause, for callers that already verified the
    /// bypass credential.
    #[instrument(skip(self), fields(board_id = %board_id))]
    pub async fn delete_bypassing_roles(&self, board_id: Uuid) -> Result<()> {
        if self
            .repo
            .delete_one(&BoardFilter::by_id(board_id))
            .await
            .map_err(store_failure(board_id))?
        {
            Ok(())
        } else {
            Err(DomainError::NotFound("board", board_id.to_string()))
        }
    }

    async fn classify_miss(&self, operation: BoardOperation, board_id: Uuid) -> DomainError {
        let requirement = operation.requirement();
        let err = match self.repo.find_by_id(board_id).await {
            Err(e) => return store_failure(board_id)(e),
            Ok(None) => DomainError::NotFound("board", board_id.to_string()),
            Ok(Some(board)) => match requirement.state {
                Some(required) if board.state != required => DomainError::Conflict(format!(
                    "cannot {operation}: board {board_id} is {}",
                    board.state
                )),
                _ => DomainError::Forbidden(format!(
                    "{operation} requires {:?} privilege",
                    requirement.privilege
                )),
            },
        };
        warn!(%board_id, %operation, error = %err, "board mutation rejected");
        err
    }
}
