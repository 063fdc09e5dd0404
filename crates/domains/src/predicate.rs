//! # Board Predicates
//!
//! Conditions and mutations handed to `BoardRepository::find_one_and_update`.
//! A store evaluates the filter and applies the update as one atomic step,
//! so authorization is decided against the document as it is at write time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Board, BoardState};

/// Privilege levels, weakest first. The derived ordering is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    /// Member of `admins`, or the creator
    Admin,
    /// Only `created_by_hash`
    Creator,
}

/// Role clause of a filter: `identity` must hold at least `privilege`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleClause {
    pub identity: String,
    pub privilege: Privilege,
}

/// Conjunction of id, state and role conditions on one board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardFilter {
    pub id: Uuid,
    pub state: Option<BoardState>,
    pub role: Option<RoleClause>,
}

impl BoardFilter {
    pub fn by_id(id: Uuid) -> Self {
        Self { id, state: None, role: None }
    }

    pub fn in_state(mut self, state: BoardState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn held_by(mut self, identity: impl Into<String>, privilege: Privilege) -> Self {
        self.role = Some(RoleClause { identity: identity.into(), privilege });
        self
    }

    /// Evaluates the filter against a document. Stores without a native
    /// query language call this while holding the document's write lock.
    pub fn matches(&self, board: &Board) -> bool {
        if board.id != self.id {
            return false;
        }
        if let Some(state) = self.state {
            if board.state != state {
                return false;
            }
        }
        match &self.role {
            None => true,
            Some(RoleClause { identity, privilege: Privilege::Creator }) => board.is_creator(identity),
            Some(RoleClause { identity, privilege: Privilege::Admin }) => board.is_privileged(identity),
        }
    }
}

/// A single-document mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardUpdate {
    Rename { name: String },
    /// Sets `state = closed` and `closed_at` together.
    Close { at: DateTime<Utc> },
    /// Set semantics: adding an existing admin is a no-op.
    AddAdmin { identity: String },
    /// Renames the column with `column_id`; no-op when the column is absent.
    RenameColumn { column_id: String, name: String },
}

impl BoardUpdate {
    pub fn apply(&self, board: &mut Board) {
        match self {
            BoardUpdate::Rename { name } => board.name = name.clone(),
            BoardUpdate::Close { at } => {
                board.state = BoardState::Closed;
                board.closed_at = Some(*at);
            }
            BoardUpdate::AddAdmin { identity } => {
                if !board.admins.iter().any(|a| a == identity) {
                    board.admins.push(identity.clone());
                }
            }
            BoardUpdate::RenameColumn { column_id, name } => {
                if let Some(column) = board.columns.iter_mut().find(|c| &c.id == column_id) {
                    column.name = name.clone();
                }
            }
        }
    }
}
