//! Store contract against a live Postgres. Uses `RETRO_TEST_DATABASE_URL`
//! when set, otherwise starts a throwaway container.

use std::sync::Arc;

use chrono::Duration;
use domains::{
    Board, BoardFilter, BoardRepository, BoardState, BoardUpdate, Column, Privilege, SessionRepository, StoreError,
};
use integration_tests::{epoch, CREATOR};
use storage_adapters::PostgresStore;
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::testcontainers::ContainerAsync;
use tokio::task::JoinSet;
use uuid::Uuid;

struct Database {
    store: Arc<PostgresStore>,
    _node: Option<ContainerAsync<Postgres>>,
}

async fn database() -> Database {
    let (url, node) = match std::env::var("RETRO_TEST_DATABASE_URL") {
        Ok(url) => (url, None),
        Err(_) => {
            let node = Postgres::default().start().await.expect("start postgres container");
            let host = node.get_host().await.expect("container host");
            let port = node.get_host_port_ipv4(5432).await.expect("container port");
            (format!("postgres://postgres:postgres@{host}:{port}/postgres"), Some(node))
        }
    };
    let store = PostgresStore::new(&url, 16).await.expect("connect");
    store.migrate().await.expect("migrate");
    Database { store: Arc::new(store), _node: node }
}

/// Links are random so runs against a shared database do not collide.
fn board() -> Board {
    Board {
        id: Uuid::now_v7(),
        name: "Sprint 1".into(),
        columns: vec![
            Column { id: "todo".into(), name: "To Do".into(), color: None },
            Column { id: "done".into(), name: "Done".into(), color: Some("#22c55e".into()) },
        ],
        shareable_link: Uuid::new_v4().simple().to_string(),
        state: BoardState::Active,
        card_limit_per_user: Some(5),
        reaction_limit_per_user: None,
        created_by_hash: CREATOR.into(),
        admins: vec![],
        created_at: epoch(),
        closed_at: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_insert_round_trips_and_maps_unique_violations() {
    let db = database().await;
    let b = board();
    db.store.insert(&b).await.unwrap();
    assert_eq!(db.store.find_by_id(b.id).await.unwrap(), Some(b.clone()));
    assert_eq!(db.store.find_by_shareable_link(&b.shareable_link).await.unwrap(), Some(b.clone()));

    let mut same_link = board();
    same_link.shareable_link = b.shareable_link.clone();
    let err = db.store.insert(&same_link).await.unwrap_err();
    assert!(err.is_duplicate("shareable_link"), "got {err:?}");

    let mut same_id = board();
    same_id.id = b.id;
    let err = db.store.insert(&same_id).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey { field: "id" }), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_close_applies_once() {
    let db = database().await;
    let b = board();
    db.store.insert(&b).await.unwrap();
    let id = b.id;

    let mut tasks = JoinSet::new();
    for i in 0..20 {
        let store = db.store.clone();
        tasks.spawn(async move {
            let filter = BoardFilter::by_id(id).in_state(BoardState::Active).held_by(CREATOR, Privilege::Admin);
            let update = BoardUpdate::Close { at: epoch() + Duration::seconds(i) };
            store.find_one_and_update(&filter, &update).await
        });
    }

    let mut winners = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        if let Some(board) = joined.unwrap().unwrap() {
            winners.push(board);
        }
    }
    assert_eq!(winners.len(), 1);
    let stored = db.store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.state, BoardState::Closed);
    assert_eq!(stored.closed_at, winners[0].closed_at);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_role_clause_separates_admins_from_creator() {
    let db = database().await;
    let b = board();
    db.store.insert(&b).await.unwrap();

    let grant = BoardUpdate::AddAdmin { identity: "B".into() };
    let by_creator = BoardFilter::by_id(b.id).in_state(BoardState::Active).held_by(CREATOR, Privilege::Creator);
    db.store.find_one_and_update(&by_creator, &grant).await.unwrap().unwrap();
    let again = db.store.find_one_and_update(&by_creator, &grant).await.unwrap().unwrap();
    assert_eq!(again.admins, vec!["B".to_string()]);

    let b_as_creator = BoardFilter::by_id(b.id).in_state(BoardState::Active).held_by("B", Privilege::Creator);
    let promote_c = BoardUpdate::AddAdmin { identity: "C".into() };
    assert_eq!(db.store.find_one_and_update(&b_as_creator, &promote_c).await.unwrap(), None);

    let b_as_admin = BoardFilter::by_id(b.id).in_state(BoardState::Active).held_by("B", Privilege::Admin);
    let renamed = db
        .store
        .find_one_and_update(&b_as_admin, &BoardUpdate::Rename { name: "Sprint 1 by B".into() })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.name, "Sprint 1 by B");
    assert_eq!(renamed.admins, vec!["B".to_string()]);

    assert!(!db.store.delete_one(&BoardFilter::by_id(b.id).held_by("B", Privilege::Creator)).await.unwrap());
    assert!(db.store.delete_one(&BoardFilter::by_id(b.id).held_by(CREATOR, Privilege::Creator)).await.unwrap());
    assert_eq!(db.store.find_by_shareable_link(&b.shareable_link).await.unwrap(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_state_clause_blocks_closed_board() {
    let db = database().await;
    let b = board();
    db.store.insert(&b).await.unwrap();

    let admin = BoardFilter::by_id(b.id).in_state(BoardState::Active).held_by(CREATOR, Privilege::Admin);
    db.store.find_one_and_update(&admin, &BoardUpdate::Close { at: epoch() }).await.unwrap().unwrap();

    let rename = BoardUpdate::Rename { name: "Too late".into() };
    assert_eq!(db.store.find_one_and_update(&admin, &rename).await.unwrap(), None);
    assert_eq!(db.store.find_by_id(b.id).await.unwrap().unwrap().name, "Sprint 1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rename_column_touches_only_that_column() {
    let db = database().await;
    let b = board();
    db.store.insert(&b).await.unwrap();

    let filter = BoardFilter::by_id(b.id).in_state(BoardState::Active).held_by(CREATOR, Privilege::Admin);
    let update = BoardUpdate::RenameColumn { column_id: "todo".into(), name: "Backlog".into() };
    let updated = db.store.find_one_and_update(&filter, &update).await.unwrap().unwrap();

    let names: Vec<_> = updated.columns.iter().map(|c| (c.id.as_str(), c.name.as_str())).collect();
    assert_eq!(names, vec![("todo", "Backlog"), ("done", "Done")]);
    assert_eq!(updated.columns[1].color.as_deref(), Some("#22c55e"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_upsert_keeps_one_row_and_created_at() {
    let db = database().await;
    let board_id = Uuid::now_v7();
    let t0 = epoch();

    let alice = db.store.upsert(board_id, "hash-b", "Alice", t0).await.unwrap();
    let bob = db.store.upsert(board_id, "hash-b", "Bob", t0 + Duration::seconds(30)).await.unwrap();
    assert_eq!(bob.alias, "Bob");
    assert_eq!(bob.created_at, alice.created_at);
    assert_eq!(bob.last_active_at, t0 + Duration::seconds(30));

    let touched = db.store.touch(board_id, "hash-b", t0 + Duration::seconds(60)).await.unwrap().unwrap();
    assert_eq!(touched.alias, "Bob");
    assert_eq!(db.store.touch(board_id, "ghost", t0).await.unwrap(), None);

    assert_eq!(db.store.delete_all_for_board(board_id).await.unwrap(), 1);
    assert_eq!(db.store.find(board_id, "hash-b").await.unwrap(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_active_window_is_inclusive_and_most_recent_first() {
    let db = database().await;
    let board_id = Uuid::now_v7();
    let t0 = epoch();
    db.store.upsert(board_id, "old", "Old", t0).await.unwrap();
    db.store.upsert(board_id, "new", "New", t0 + Duration::seconds(10)).await.unwrap();

    let at_boundary = db.store.list_active_since(board_id, t0).await.unwrap();
    let aliases: Vec<_> = at_boundary.iter().map(|s| s.alias.as_str()).collect();
    assert_eq!(aliases, vec!["New", "Old"]);

    let past_boundary = db.store.list_active_since(board_id, t0 + Duration::milliseconds(1)).await.unwrap();
    assert_eq!(past_boundary.len(), 1);
    assert_eq!(past_boundary[0].alias, "New");

    db.store.delete_all_for_board(board_id).await.unwrap();
}
