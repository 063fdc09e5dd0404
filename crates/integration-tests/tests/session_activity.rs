use chrono::Duration;
use domains::{Clock, DomainError};
use integration_tests::{Harness, CREATOR};
use uuid::Uuid;

const B: &str = "hash-b";
const C: &str = "hash-c";

#[tokio::test]
async fn test_rejoin_replaces_alias_in_place() {
    let h = Harness::new();
    let board = h.board().await;

    let alice = h.sessions.join(board.id, B, "Alice").await.unwrap();
    h.clock.advance(Duration::seconds(30));
    let bob = h.sessions.join(board.id, B, "Bob").await.unwrap();

    assert_eq!(h.store.session_count(), 1);
    assert_eq!(bob.alias, "Bob");
    assert_eq!(bob.created_at, alice.created_at);
    assert_eq!(bob.last_active_at, h.clock.now());
    assert_eq!(h.sessions.get(board.id, B).await.unwrap(), bob);
}

#[tokio::test]
async fn test_window_boundary_is_inclusive() {
    let h = Harness::new();
    let board = h.board().await;
    let joined_at = h.clock.now();
    h.sessions.join(board.id, B, "Bob").await.unwrap();

    h.clock.set(joined_at + Duration::seconds(120) - Duration::milliseconds(1));
    assert_eq!(h.sessions.list_active(board.id).await.unwrap().len(), 1);

    h.clock.set(joined_at + Duration::seconds(120));
    assert_eq!(h.sessions.list_active(board.id).await.unwrap().len(), 1);

    h.clock.set(joined_at + Duration::seconds(120) + Duration::milliseconds(1));
    assert!(h.sessions.list_active(board.id).await.unwrap().is_empty());

    // the row is stale, not gone
    assert!(h.sessions.get(board.id, B).await.is_ok());
}

#[tokio::test]
async fn test_heartbeat_brings_session_back_into_window() {
    let h = Harness::new();
    let board = h.board().await;
    h.sessions.join(board.id, B, "Bob").await.unwrap();

    h.clock.advance(Duration::minutes(5));
    assert!(h.sessions.list_active(board.id).await.unwrap().is_empty());

    let touched = h.sessions.heartbeat(board.id, B).await.unwrap();
    assert_eq!(touched.last_active_at, h.clock.now());
    assert_eq!(touched.alias, "Bob");
    assert_eq!(h.sessions.list_active(board.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_heartbeat_and_rename_need_an_existing_session() {
    let h = Harness::new();
    let board = h.board().await;

    let err = h.sessions.heartbeat(board.id, C).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound("session", _)), "got {err:?}");

    let err = h.sessions.rename(board.id, C, "Carol").await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound("session", _)), "got {err:?}");

    assert_eq!(h.store.session_count(), 0);
}

#[tokio::test]
async fn test_rename_updates_alias_and_activity() {
    let h = Harness::new();
    let board = h.board().await;
    h.sessions.join(board.id, B, "Bob").await.unwrap();
    h.clock.advance(Duration::seconds(10));

    let renamed = h.sessions.rename(board.id, B, "Robert").await.unwrap();
    assert_eq!(renamed.alias, "Robert");
    assert_eq!(renamed.last_active_at, h.clock.now());

    let err = h.sessions.rename(board.id, B, "").await.unwrap_err();
    assert!(matches!(err, DomainError::ValidationError(_)));
}

#[tokio::test]
async fn test_join_needs_existing_board_and_valid_alias() {
    let h = Harness::new();
    let err = h.sessions.join(Uuid::now_v7(), B, "Bob").await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound("board", _)), "got {err:?}");

    let board = h.board().await;
    let long = "a".repeat(51);
    for alias in ["", "<script>", long.as_str()] {
        let err = h.sessions.join(board.id, B, alias).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationError(_)), "alias {alias:?}: {err:?}");
    }
    assert_eq!(h.store.session_count(), 0);
}

#[tokio::test]
async fn test_active_list_is_ordered_and_flags_admins() {
    let h = Harness::new();
    let board = h.board().await;
    h.boards.add_admin(board.id, B, CREATOR).await.unwrap();

    h.sessions.join(board.id, CREATOR, "Alice").await.unwrap();
    h.clock.advance(Duration::seconds(1));
    h.sessions.join(board.id, B, "Bob").await.unwrap();
    h.clock.advance(Duration::seconds(1));
    h.sessions.join(board.id, C, "Carol").await.unwrap();

    let active = h.sessions.list_active(board.id).await.unwrap();
    let summary: Vec<_> = active.iter().map(|u| (u.alias.as_str(), u.is_admin)).collect();
    assert_eq!(summary, vec![("Carol", false), ("Bob", true), ("Alice", true)]);
}

#[tokio::test]
async fn test_admin_flag_is_computed_at_read_time() {
    let h = Harness::new();
    let board = h.board().await;
    h.sessions.join(board.id, C, "Carol").await.unwrap();
    assert!(!h.sessions.list_active(board.id).await.unwrap()[0].is_admin);

    h.boards.add_admin(board.id, C, CREATOR).await.unwrap();
    assert!(h.sessions.list_active(board.id).await.unwrap()[0].is_admin);
}

#[tokio::test]
async fn test_closing_board_keeps_presence() {
    let h = Harness::new();
    let board = h.board().await;
    h.sessions.join(board.id, B, "Bob").await.unwrap();

    h.boards.close_board(board.id, CREATOR).await.unwrap();
    assert_eq!(h.sessions.list_active(board.id).await.unwrap().len(), 1);
    h.sessions.heartbeat(board.id, B).await.unwrap();
}

#[tokio::test]
async fn test_sessions_are_scoped_per_board() {
    let h = Harness::new();
    let first = h.board().await;
    let second = h.board().await;

    h.sessions.join(first.id, B, "Bob").await.unwrap();
    h.sessions.join(second.id, B, "Bobby").await.unwrap();
    h.sessions.join(second.id, C, "Carol").await.unwrap();

    assert_eq!(h.sessions.list_active(first.id).await.unwrap().len(), 1);
    assert_eq!(h.sessions.list_active(second.id).await.unwrap().len(), 2);
    assert_eq!(h.sessions.get(first.id, B).await.unwrap().alias, "Bob");
}
