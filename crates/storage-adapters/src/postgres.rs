//! # PostgreSQL Document Store
//!
//! Maps the board and session ports onto two tables. Board columns live in
//! a JSONB array and admins in a TEXT[] so a board stays one row, and every
//! conditional mutation is a single `UPDATE ... WHERE <filter> RETURNING`.
//! Postgres re-evaluates the WHERE clause after waiting on a row lock, which
//! is what makes two racing closes resolve to one winner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    Board, BoardFilter, BoardRepository, BoardState, BoardUpdate, Column, Privilege, SessionRepository,
    StoreError, StoreResult, UserSession,
};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::{info, warn};
use uuid::Uuid;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const BOARD_COLUMNS: &str = "id, name, columns, shareable_link, state, card_limit_per_user, \
     reaction_limit_per_user, created_by_hash, admins, created_at, closed_at";

const SESSION_COLUMNS: &str = "board_id, cookie_hash, alias, last_active_at, created_at";

/// Filter over $1..$4: id, required state, identity, whether admins qualify.
const BOARD_FILTER: &str = "id = $1 \
     AND ($2::text IS NULL OR state = $2) \
     AND ($3::text IS NULL OR created_by_hash = $3 OR ($4 AND $3 = ANY(admins)))";

const LINK_CONSTRAINT: &str = "boards_shareable_link_key";
const BOARD_PKEY: &str = "boards_pkey";

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn new(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!(max_connections, "postgres pool ready");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        MIGRATOR.run(&self.pool).await?;
        info!("migrations applied");
        Ok(())
    }
}

fn store_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            match db.constraint() {
                Some(LINK_CONSTRAINT) => return StoreError::DuplicateKey { field: "shareable_link" },
                Some(BOARD_PKEY) => return StoreError::DuplicateKey { field: "id" },
                other => warn!(constraint = ?other, "unexpected unique violation"),
            }
        }
    }
    StoreError::Unavailable(e.into())
}

#[derive(FromRow)]
struct BoardRow {
    id: Uuid,
    name: String,
    columns: Json<Vec<Column>>,
    shareable_link: String,
    state: String,
    card_limit_per_user: Option<i64>,
    reaction_limit_per_user: Option<i64>,
    created_by_hash: String,
    admins: Vec<String>,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

impl TryFrom<BoardRow> for Board {
    type Error = StoreError;

    fn try_from(row: BoardRow) -> StoreResult<Self> {
        let state = BoardState::parse(&row.state)
            .ok_or_else(|| StoreError::Unavailable(anyhow::anyhow!("unknown board state `{}`", row.state)))?;
        Ok(Board {
            id: row.id,
            name: row.name,
            columns: row.columns.0,
            shareable_link: row.shareable_link,
            state,
            card_limit_per_user: stored_limit("card_limit_per_user", row.card_limit_per_user)?,
            reaction_limit_per_user: stored_limit("reaction_limit_per_user", row.reaction_limit_per_user)?,
            created_by_hash: row.created_by_hash,
            admins: row.admins,
            created_at: row.created_at,
            closed_at: row.closed_at,
        })
    }
}

/// NULL means unlimited; anything outside `1..=u32::MAX` is corrupt.
fn stored_limit(column: &str, value: Option<i64>) -> StoreResult<Option<u32>> {
    match value {
        None => Ok(None),
        Some(v) => match u32::try_from(v) {
            Ok(limit) if limit > 0 => Ok(Some(limit)),
            _ => Err(StoreError::Unavailable(anyhow::anyhow!("{column} out of range: {v}"))),
        },
    }
}

#[derive(FromRow)]
struct SessionRow {
    board_id: Uuid,
    cookie_hash: String,
    alias: String,
    last_active_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for UserSession {
    fn from(row: SessionRow) -> Self {
        UserSession {
            board_id: row.board_id,
            cookie_hash: row.cookie_hash,
            alias: row.alias,
            last_active_at: row.last_active_at,
            created_at: row.created_at,
        }
    }
}

/// Bind values for `BOARD_FILTER`.
struct FilterParams<'a> {
    id: Uuid,
    state: Option<&'static str>,
    identity: Option<&'a str>,
    admins_qualify: bool,
}

impl<'a> From<&'a BoardFilter> for FilterParams<'a> {
    fn from(filter: &'a BoardFilter) -> Self {
        let (identity, admins_qualify) = match &filter.role {
            Some(role) => (Some(role.identity.as_str()), role.privilege == Privilege::Admin),
            None => (None, false),
        };
        FilterParams {
            id: filter.id,
            state: filter.state.map(|s| s.as_str()),
            identity,
            admins_qualify,
        }
    }
}

fn update_sql(update: &BoardUpdate) -> String {
    let set = match update {
        BoardUpdate::Rename { .. } => "name = $5",
        BoardUpdate::Close { .. } => "state = 'closed', closed_at = $5",
        BoardUpdate::AddAdmin { .. } => {
            "admins = CASE WHEN $5 = ANY(admins) THEN admins ELSE array_append(admins, $5) END"
        }
        BoardUpdate::RenameColumn { .. } => {
            "columns = (SELECT jsonb_agg(CASE WHEN c->>'id' = $5 \
                 THEN jsonb_set(c, '{name}', to_jsonb($6::text)) ELSE c END ORDER BY ord) \
             FROM jsonb_array_elements(columns) WITH ORDINALITY AS t(c, ord))"
        }
    };
    format!("UPDATE boards SET {set} WHERE {BOARD_FILTER} RETURNING {BOARD_COLUMNS}")
}

#[async_trait]
impl BoardRepository for PostgresStore {
    async fn insert(&self, board: &Board) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO boards ({BOARD_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        sqlx::query(&sql)
            .bind(board.id)
            .bind(&board.name)
            .bind(Json(&board.columns))
            .bind(&board.shareable_link)
            .bind(board.state.as_str())
            .bind(board.card_limit_per_user.map(i64::from))
            .bind(board.reaction_limit_per_user.map(i64::from))
            .bind(&board.created_by_hash)
            .bind(board.admins.as_slice())
            .bind(board.created_at)
            .bind(board.closed_at)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Board>> {
        let sql = format!("SELECT {BOARD_COLUMNS} FROM boards WHERE id = $1");
        sqlx::query_as::<_, BoardRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .map(Board::try_from)
            .transpose()
    }

    async fn find_by_shareable_link(&self, code: &str) -> StoreResult<Option<Board>> {
        let sql = format!("SELECT {BOARD_COLUMNS} FROM boards WHERE shareable_link = $1");
        sqlx::query_as::<_, BoardRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .map(Board::try_from)
            .transpose()
    }

    async fn find_one_and_update(&self, filter: &BoardFilter, update: &BoardUpdate) -> StoreResult<Option<Board>> {
        let sql = update_sql(update);
        let params = FilterParams::from(filter);
        let query = sqlx::query_as::<_, BoardRow>(&sql)
            .bind(params.id)
            .bind(params.state)
            .bind(params.identity)
            .bind(params.admins_qualify);
        let query = match update {
            BoardUpdate::Rename { name } => query.bind(name),
            BoardUpdate::Close { at } => query.bind(*at),
            BoardUpdate::AddAdmin { identity } => query.bind(identity),
            BoardUpdate::RenameColumn { column_id, name } => query.bind(column_id).bind(name),
        };
        query
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .map(Board::try_from)
            .transpose()
    }

    async fn delete_one(&self, filter: &BoardFilter) -> StoreResult<bool> {
        let sql = format!("DELETE FROM boards WHERE {BOARD_FILTER}");
        let params = FilterParams::from(filter);
        let result = sqlx::query(&sql)
            .bind(params.id)
            .bind(params.state)
            .bind(params.identity)
            .bind(params.admins_qualify)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SessionRepository for PostgresStore {
    async fn upsert(&self, board_id: Uuid, cookie_hash: &str, alias: &str, now: DateTime<Utc>) -> StoreResult<UserSession> {
        let sql = format!(
            "INSERT INTO user_sessions ({SESSION_COLUMNS}) VALUES ($1, $2, $3, $4, $4) \
             ON CONFLICT (board_id, cookie_hash) DO UPDATE \
             SET alias = EXCLUDED.alias, last_active_at = EXCLUDED.last_active_at \
             RETURNING {SESSION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(board_id)
            .bind(cookie_hash)
            .bind(alias)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.into())
    }

    async fn find(&self, board_id: Uuid, cookie_hash: &str) -> StoreResult<Option<UserSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM user_sessions WHERE board_id = $1 AND cookie_hash = $2"
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(board_id)
            .bind(cookie_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.map(Into::into))
    }

    async fn touch(&self, board_id: Uuid, cookie_hash: &str, now: DateTime<Utc>) -> StoreResult<Option<UserSession>> {
        let sql = format!(
            "UPDATE user_sessions SET last_active_at = $3 \
             WHERE board_id = $1 AND cookie_hash = $2 RETURNING {SESSION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(board_id)
            .bind(cookie_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.map(Into::into))
    }

    async fn update_alias(
        &self,
        board_id: Uuid,
        cookie_hash: &str,
        alias: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<UserSession>> {
        let sql = format!(
            "UPDATE user_sessions SET alias = $3, last_active_at = $4 \
             WHERE board_id = $1 AND cookie_hash = $2 RETURNING {SESSION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(board_id)
            .bind(cookie_hash)
            .bind(alias)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.map(Into::into))
    }

    async fn list_active_since(&self, board_id: Uuid, since: DateTime<Utc>) -> StoreResult<Vec<UserSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM user_sessions \
             WHERE board_id = $1 AND last_active_at >= $2 \
             ORDER BY last_active_at DESC"
        );
        let rows = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(board_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_all_for_board(&self, board_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE board_id = $1")
            .bind(board_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected())
    }
}
