//! # Retro-Board Binary
//!
//! Assembles the engine from settings and compile-time features, proves the
//! store round-trips with a short self-check, then waits for shutdown.
//! Transport layers mount on top of the services built here.

use std::sync::Arc;
use std::time::Duration;

use auth_adapters::HmacIdentityHasher;
use configs::{LogSettings, Settings};
use domains::{BoardRepository, Clock, Column, IdentityHasher, NewBoard, SessionRepository, SystemClock};
use services::{BoardService, BoardServiceConfig, RandomLinkGenerator, SessionService};
use storage_adapters::MemoryStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "db-postgres")]
use secrecy::ExposeSecret;
#[cfg(feature = "db-postgres")]
use storage_adapters::PostgresStore;

/// Everything a transport layer needs.
struct Engine {
    boards: BoardService,
    sessions: SessionService,
    identities: HmacIdentityHasher,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.log);

    if settings.uses_dev_identity_salt() {
        warn!("auth.identity_salt is the development default; set RETRO__AUTH__IDENTITY_SALT");
    }
    if settings.auth.bypass_secret.is_none() {
        info!("bypass deletion disabled (no auth.bypass_secret)");
    }

    let engine = build_engine(&settings).await?;
    self_check(&engine).await?;

    info!("🚀 Retro-Board engine ready");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

type Stores = (Arc<dyn BoardRepository>, Arc<dyn SessionRepository>);

async fn build_stores(settings: &Settings) -> anyhow::Result<Stores> {
    if let Some(stores) = postgres_stores(settings).await? {
        return Ok(stores);
    }
    info!("using in-memory store");
    let store = Arc::new(MemoryStore::new());
    let boards: Arc<dyn BoardRepository> = store.clone();
    let sessions: Arc<dyn SessionRepository> = store;
    Ok((boards, sessions))
}

#[cfg(feature = "db-postgres")]
async fn postgres_stores(settings: &Settings) -> anyhow::Result<Option<Stores>> {
    let Some(url) = &settings.database.url else {
        return Ok(None);
    };
    let store = Arc::new(PostgresStore::new(url.expose_secret(), settings.database.max_connections).await?);
    store.migrate().await?;
    info!("using postgres store");
    let boards: Arc<dyn BoardRepository> = store.clone();
    let sessions: Arc<dyn SessionRepository> = store;
    Ok(Some((boards, sessions)))
}

#[cfg(not(feature = "db-postgres"))]
async fn postgres_stores(settings: &Settings) -> anyhow::Result<Option<Stores>> {
    if settings.database.url.is_some() {
        warn!("database.url is set but this build lacks db-postgres");
    }
    Ok(None)
}

async fn build_engine(settings: &Settings) -> anyhow::Result<Engine> {
    let (board_repo, session_repo) = build_stores(settings).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let boards = BoardService::new(
        board_repo.clone(),
        Arc::new(RandomLinkGenerator::new(settings.boards.link_length)),
        clock.clone(),
        BoardServiceConfig {
            link_max_attempts: settings.boards.link_max_attempts,
            bypass_secret: settings.auth.bypass_secret.clone(),
        },
    );
    let sessions = SessionService::new(
        session_repo,
        board_repo,
        clock,
        Duration::from_secs(settings.sessions.recency_window_secs),
    );
    let identities = HmacIdentityHasher::new(settings.auth.identity_salt.clone());

    Ok(Engine { boards, sessions, identities })
}

/// Creates, reads and deletes a throwaway board and session.
async fn self_check(engine: &Engine) -> anyhow::Result<()> {
    let identity = engine.identities.hash("retro-board-self-check");
    let board = engine
        .boards
        .create_board(
            NewBoard {
                name: "self-check".into(),
                columns: vec![Column { id: "check".into(), name: "Check".into(), color: None }],
                card_limit_per_user: None,
                reaction_limit_per_user: None,
            },
            &identity,
        )
        .await?;

    let result = async {
        engine.boards.get_board_by_link(&board.shareable_link).await?;
        engine.sessions.join(board.id, &identity, "self-check").await?;
        let active = engine.sessions.list_active(board.id).await?;
        anyhow::ensure!(active.len() == 1 && active[0].is_admin, "self-check session not listed as admin");
        Ok::<_, anyhow::Error>(())
    }
    .await;

    engine.sessions.delete_all_for_board(board.id).await?;
    engine.boards.delete_board(board.id, &identity, None).await?;
    result?;
    info!("self-check passed");
    Ok(())
}
