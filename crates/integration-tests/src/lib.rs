//! Shared fixtures for the integration suites: a hand-driven clock, a
//! scripted link generator and a fully wired engine over `MemoryStore`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use domains::{Board, Clock, Column, DomainError, NewBoard, Result};
use secrecy::SecretString;
use services::{
    BoardService, BoardServiceConfig, LinkGenerator, RandomLinkGenerator, SessionService,
    DEFAULT_RECENCY_WINDOW,
};
use storage_adapters::MemoryStore;

pub const CREATOR: &str = "hash-creator";
pub const BYPASS_SECRET: &str = "break-glass";

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Hands out codes from a fixed script, then fails.
pub struct ScriptedLinks {
    codes: Mutex<VecDeque<String>>,
}

impl ScriptedLinks {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { codes: Mutex::new(codes.into_iter().map(Into::into).collect()) }
    }

    pub fn remaining(&self) -> usize {
        self.codes.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

impl LinkGenerator for ScriptedLinks {
    fn issue(&self) -> Result<String> {
        self.codes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
            .ok_or_else(|| DomainError::ResourceExhausted("link script ran out".into()))
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

pub fn sprint_board(name: &str) -> NewBoard {
    NewBoard {
        name: name.into(),
        columns: vec![
            Column { id: "went-well".into(), name: "Went well".into(), color: Some("#22c55e".into()) },
            Column { id: "improve".into(), name: "To improve".into(), color: None },
            Column { id: "actions".into(), name: "Action items".into(), color: Some("#3B82F6".into()) },
        ],
        card_limit_per_user: Some(5),
        reaction_limit_per_user: None,
    }
}

/// Engine wired the way the binary wires it, minus the database.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub boards: BoardService,
    pub sessions: SessionService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_links(Arc::new(RandomLinkGenerator::default()), 5)
    }

    pub fn with_links(links: Arc<dyn LinkGenerator>, link_max_attempts: u32) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::starting_at(epoch()));
        let boards = BoardService::new(
            store.clone(),
            links,
            clock.clone(),
            BoardServiceConfig {
                link_max_attempts,
                bypass_secret: Some(SecretString::from(BYPASS_SECRET.to_string())),
            },
        );
        let sessions = SessionService::new(store.clone(), store.clone(), clock.clone(), DEFAULT_RECENCY_WINDOW);
        Self { store, clock, boards, sessions }
    }

    /// A fresh "Sprint 1" board owned by [`CREATOR`].
    pub async fn board(&self) -> Board {
        match self.boards.create_board(sprint_board("Sprint 1"), CREATOR).await {
            Ok(board) => board,
            Err(e) => panic!("fixture board creation failed: {e}"),
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
