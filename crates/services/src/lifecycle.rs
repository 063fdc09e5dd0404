//! # Board Lifecycle
//!
//! `active` is the initial state and `closed` is terminal: the only
//! transition is `Close`, and it requires `active` like every other mutation
//! except deletion. Each privileged operation declares the state and
//! privilege it needs; the authorization engine turns that declaration
//! into a store filter.

use std::fmt;

use domains::{BoardFilter, BoardState, Privilege};
use uuid::Uuid;

/// Privileged board mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardOperation {
    Rename,
    Close,
    AddAdmin,
    RenameColumn,
    Delete,
}

/// What an operation needs from the board and the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub state: Option<BoardState>,
    pub privilege: Privilege,
}

impl BoardOperation {
    pub fn requirement(self) -> Requirement {
        use BoardOperation::*;
        match self {
            Rename | Close | RenameColumn => Requirement {
                state: Some(BoardState::Active),
                privilege: Privilege::Admin,
            },
            AddAdmin => Requirement {
                state: Some(BoardState::Active),
                privilege: Privilege::Creator,
            },
            Delete => Requirement { state: None, privilege: Privilege::Creator },
        }
    }

    /// The conditional filter for `identity` performing this operation on `board_id`.
    pub fn filter(self, board_id: Uuid, identity: &str) -> BoardFilter {
        let req = self.requirement();
        let filter = BoardFilter::by_id(board_id).held_by(identity, req.privilege);
        match req.state {
            Some(state) => filter.in_state(state),
            None => filter,
        }
    }
}

impl fmt::Display for BoardOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BoardOperation::Rename => "rename board",
            BoardOperation::Close => "close board",
            BoardOperation::AddAdmin => "add admin",
            BoardOperation::RenameColumn => "rename column",
            BoardOperation::Delete => "delete board",
        };
        f.write_str(name)
    }
}
