//! # Domain Models
//!
//! These structs represent the core entities of Retro-Board.
//! Boards use UUID v7 for time-ordered, globally unique identification.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Lifecycle state of a board. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardState {
    Active,
    Closed,
}

impl BoardState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardState::Active => "active",
            BoardState::Closed => "closed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(BoardState::Active),
            "closed" => Some(BoardState::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column embedded in a board. It has no lifecycle of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Column {
    /// Unique within its board (e.g. "todo", "went-well")
    #[validate(length(min = 1, max = 50), custom(function = "crate::validation::column_id"))]
    pub id: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Six hex digits, with or without a leading '#'
    #[validate(custom(function = "crate::validation::hex_color"))]
    pub color: Option<String>,
}

/// The aggregate root of a retrospective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: Uuid,
    pub name: String,
    pub columns: Vec<Column>,
    /// Public join code. Globally unique and never changed after creation.
    pub shareable_link: String,
    pub state: BoardState,
    /// `None` means unlimited
    pub card_limit_per_user: Option<u32>,
    /// `None` means unlimited
    pub reaction_limit_per_user: Option<u32>,
    pub created_by_hash: String,
    pub admins: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Set exactly once, when the board closes.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Board {
    pub fn is_creator(&self, identity: &str) -> bool {
        self.created_by_hash == identity
    }

    /// True for members of `admins` and for the creator.
    pub fn is_privileged(&self, identity: &str) -> bool {
        self.is_creator(identity) || self.admins.iter().any(|a| a == identity)
    }

    pub fn column(&self, column_id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == column_id)
    }
}

/// Input for board creation. Identity and timestamps are filled in by the service.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewBoard {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 10), nested, custom(function = "crate::validation::unique_column_ids"))]
    pub columns: Vec<Column>,
    #[serde(default)]
    #[validate(range(min = 1))]
    pub card_limit_per_user: Option<u32>,
    #[serde(default)]
    #[validate(range(min = 1))]
    pub reaction_limit_per_user: Option<u32>,
}

/// Presence record for one identity on one board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub board_id: Uuid,
    pub cookie_hash: String,
    pub alias: String,
    pub last_active_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Read-time projection of a session. `is_admin` is derived from the board
/// as it is at listing time and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveUser {
    pub cookie_hash: String,
    pub alias: String,
    pub last_active_at: DateTime<Utc>,
    pub is_admin: bool,
}

impl ActiveUser {
    pub fn project(session: UserSession, board: &Board) -> Self {
        let is_admin = board.is_privileged(&session.cookie_hash);
        Self {
            cookie_hash: session.cookie_hash,
            alias: session.alias,
            last_active_at: session.last_active_at,
            is_admin,
        }
    }
}
