//! Session host tests: page flow, room lifecycle, and the end-to-end
//! chat scenarios over an in-process network.

mod common;

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use common::{connect, host, CountingPubSub, RecordingView, ViewEvent};
use lanchat_session::{
    CoordinatorState, HostConfig, Page, SessionError, SessionHost, UiRequest,
};
use lanchat_tick::TickConfig;
use lanchat_transport::{MemoryHost, MemoryNetwork, MemoryPubSub, NetworkHost, PubSub};
use tokio::sync::mpsc;

type Host = SessionHost<MemoryPubSub, RecordingView>;

fn session(host: &MemoryHost, view: &Arc<RecordingView>) -> Host {
    SessionHost::new(
        Arc::new(host.pubsub()),
        host.local_peer_id().clone(),
        Arc::clone(view),
        HostConfig::default(),
    )
}

async fn logged_in(host: &MemoryHost, first: &str) -> (Host, Arc<RecordingView>) {
    let view = RecordingView::new();
    let mut session = session(host, &view);
    session.login(first, "Tester").unwrap();
    (session, view)
}

// =========================================================================
// Pages
// =========================================================================

#[tokio::test]
async fn test_login_moves_to_room_selection() {
    let net = MemoryNetwork::new();
    let a = host(&net);
    let view = RecordingView::new();
    let mut session = session(&a, &view);
    assert_eq!(session.page(), Page::Login);

    session.login("Alice", "Liddell").unwrap();

    assert_eq!(session.page(), Page::RoomSelection);
    assert_eq!(session.profile().unwrap().display_name(), "Alice");
    assert_eq!(
        view.last_page(),
        Some((Page::RoomSelection, "ROOM-SELECTION".to_string()))
    );
    session.shutdown().await;
}

#[tokio::test]
async fn test_invalid_login_stays_on_login_page() {
    let net = MemoryNetwork::new();
    let a = host(&net);
    let view = RecordingView::new();
    let mut session = session(&a, &view);

    assert!(matches!(
        session.login("Al", "Liddell"),
        Err(SessionError::InvalidName { .. })
    ));
    assert!(session.login("Alice", &"x".repeat(21)).is_err());
    assert_eq!(session.page(), Page::Login);
    assert!(session.profile().is_none());
    session.shutdown().await;
}

#[tokio::test]
async fn test_login_twice_is_rejected() {
    let net = MemoryNetwork::new();
    let a = host(&net);
    let (mut session, _view) = logged_in(&a, "Alice").await;

    assert!(matches!(
        session.login("Alice", "Again"),
        Err(SessionError::WrongPage { page: Page::RoomSelection, .. })
    ));
    session.shutdown().await;
}

#[tokio::test]
async fn test_join_before_login_fails() {
    let net = MemoryNetwork::new();
    let a = host(&net);
    let view = RecordingView::new();
    let mut session = session(&a, &view);

    assert!(matches!(
        session.join_room("lobby").await,
        Err(SessionError::NotLoggedIn)
    ));
    assert_eq!(session.page(), Page::Login);
    session.shutdown().await;
}

#[tokio::test]
async fn test_join_shows_chat_page_and_starts_coordinator() {
    let net = MemoryNetwork::new();
    let a = host(&net);
    let (mut session, view) = logged_in(&a, "Alice").await;

    session.join_room("lobby").await.unwrap();

    assert_eq!(session.page(), Page::Chat);
    assert_eq!(session.room_name(), Some("lobby"));
    assert_eq!(session.coordinator_state(), CoordinatorState::Running);
    assert_eq!(view.last_page(), Some((Page::Chat, "ROOM: lobby".to_string())));
    session.shutdown().await;
}

#[tokio::test]
async fn test_join_with_empty_name_uses_room_form() {
    let net = MemoryNetwork::new();
    let a = host(&net);
    let (mut session, _view) = logged_in(&a, "Alice").await;

    session.join_room("").await.unwrap();
    assert_eq!(session.room_name(), Some("gen"));
    session.shutdown().await;
}

#[tokio::test]
async fn test_invalid_room_name_keeps_current_room() {
    let net = MemoryNetwork::new();
    let a = host(&net);
    let (mut session, _view) = logged_in(&a, "Alice").await;
    session.join_room("lobby").await.unwrap();

    let result = session.join_room("no").await;

    assert!(matches!(result, Err(SessionError::InvalidName { .. })));
    assert_eq!(session.room_name(), Some("lobby"));
    assert_eq!(session.page(), Page::Chat);
    session.shutdown().await;
}

// =========================================================================
// Room lifecycle
// =========================================================================

#[tokio::test]
async fn test_leave_returns_to_room_selection_and_resets_form() {
    let net = MemoryNetwork::new();
    let a = host(&net);
    let (mut session, view) = logged_in(&a, "Alice").await;
    session.join_room("lobby").await.unwrap();
    assert_eq!(session.room_form().room_name.value(), "lobby");

    session.leave_room().await.unwrap();

    assert_eq!(session.page(), Page::RoomSelection);
    assert_eq!(session.room_name(), None);
    assert_eq!(session.room_form().room_name.value(), "gen");
    assert_eq!(session.coordinator_state(), CoordinatorState::Idle);
    assert!(view.events().contains(&ViewEvent::Cleared));
    session.shutdown().await;
}

#[tokio::test]
async fn test_leave_twice_and_leave_without_room_are_harmless() {
    let net = MemoryNetwork::new();
    let a = host(&net);
    let (mut session, _view) = logged_in(&a, "Alice").await;

    session.leave_room().await.unwrap();

    session.join_room("lobby").await.unwrap();
    session.leave_room().await.unwrap();
    session.leave_room().await.unwrap();
    assert_eq!(session.page(), Page::RoomSelection);

    // The topic was released, so the room can be joined again.
    session.join_room("lobby").await.unwrap();
    session.shutdown().await;
}

#[tokio::test]
async fn test_join_replaces_active_room() {
    let net = MemoryNetwork::new();
    let (a, b) = (host(&net), host(&net));
    connect(&a, &b).await;
    let (mut alice, view_a) = logged_in(&a, "Alice").await;
    let (mut bob, _view_b) = logged_in(&b, "Bob").await;

    alice.join_room("lobby").await.unwrap();
    alice.join_room("games").await.unwrap();
    assert_eq!(alice.room_name(), Some("games"));

    // Messages in the old room no longer reach Alice.
    bob.join_room("lobby").await.unwrap();
    bob.handle(UiRequest::SubmitLine("anyone?".into())).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(view_a.incoming().is_empty());

    alice.shutdown().await;
    bob.shutdown().await;
}

#[tokio::test]
async fn test_lines_off_chat_page_are_dropped() {
    let net = MemoryNetwork::new();
    let a = host(&net);
    let pubsub = Arc::new(CountingPubSub::new(&a));
    let counters = Arc::clone(&pubsub.counters);
    let view = RecordingView::new();
    let mut session = SessionHost::new(
        pubsub,
        a.local_peer_id().clone(),
        Arc::clone(&view),
        HostConfig::default(),
    );

    session.submit_line("on login page".into()).await.unwrap();
    session.login("Alice", "Liddell").unwrap();
    session.submit_line("on room page".into()).await.unwrap();
    session.join_room("lobby").await.unwrap();
    session.leave_room().await.unwrap();
    session.submit_line("after leaving".into()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(counters.publishes(), 0);
    assert!(view.outgoing().is_empty());
    session.shutdown().await;
}

// =========================================================================
// End-to-end scenarios
// =========================================================================

#[tokio::test]
async fn test_two_users_chat_in_lobby() {
    let net = MemoryNetwork::new();
    let (a, b) = (host(&net), host(&net));
    connect(&a, &b).await;
    let (mut alice, view_a) = logged_in(&a, "Alice").await;
    let (mut bob, view_b) = logged_in(&b, "Bob").await;

    alice.join_room("lobby").await.unwrap();
    bob.join_room("lobby").await.unwrap();

    alice.handle(UiRequest::SubmitLine("hello".into())).await.unwrap();

    assert!(view_b.wait_until(|_| !view_b.incoming().is_empty()).await);
    assert_eq!(
        view_b.incoming(),
        vec![("hello".to_string(), "Alice".to_string())]
    );

    assert!(view_a.wait_until(|_| !view_a.outgoing().is_empty()).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        view_a.outgoing(),
        vec![("hello".to_string(), "Alice".to_string())]
    );
    assert!(view_a.incoming().is_empty());

    alice.shutdown().await;
    bob.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_peer_refresh_only_while_chatting() {
    let net = MemoryNetwork::new();
    let a = host(&net);
    let pubsub = Arc::new(CountingPubSub::new(&a));
    let counters = Arc::clone(&pubsub.counters);
    let view = RecordingView::new();
    let mut session = SessionHost::new(
        pubsub,
        a.local_peer_id().clone(),
        Arc::clone(&view),
        HostConfig {
            refresh: TickConfig::every(Duration::from_secs(1)),
            ..HostConfig::default()
        },
    );

    // Login and room selection pages: no refresh.
    tokio::time::sleep(Duration::from_secs(5)).await;
    session.login("Alice", "Liddell").unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(counters.list_peers(), 0);

    session.join_room("lobby").await.unwrap();
    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(counters.list_peers(), 3);
    assert_eq!(view.peer_updates().len(), 3);

    session.leave_room().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(counters.list_peers(), 3);

    session.shutdown().await;
}

#[tokio::test]
async fn test_empty_line_never_reaches_transport() {
    let net = MemoryNetwork::new();
    let a = host(&net);
    let pubsub = Arc::new(CountingPubSub::new(&a));
    let counters = Arc::clone(&pubsub.counters);
    let view = RecordingView::new();
    let mut session = SessionHost::new(
        pubsub,
        a.local_peer_id().clone(),
        Arc::clone(&view),
        HostConfig::default(),
    );
    session.login("Alice", "Liddell").unwrap();
    session.join_room("lobby").await.unwrap();

    session.handle(UiRequest::SubmitLine(String::new())).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(counters.publishes(), 0);
    assert!(view.outgoing().is_empty());
    assert!(view.errors().is_empty());
    session.shutdown().await;
}

// =========================================================================
// Run loop
// =========================================================================

#[tokio::test]
async fn test_quit_line_and_quit_request_break() {
    let net = MemoryNetwork::new();
    let a = host(&net);
    let (mut session, _view) = logged_in(&a, "Alice").await;
    session.join_room("lobby").await.unwrap();

    let flow = session.handle(UiRequest::SubmitLine("/quit".into())).await.unwrap();
    assert_eq!(flow, ControlFlow::Break(()));
    let flow = session.handle(UiRequest::Quit).await.unwrap();
    assert_eq!(flow, ControlFlow::Break(()));

    session.shutdown().await;
    assert_eq!(session.coordinator_state(), CoordinatorState::Stopped);
}

#[tokio::test]
async fn test_run_serves_requests_until_quit() {
    let net = MemoryNetwork::new();
    let a = host(&net);
    let view = RecordingView::new();
    let session = session(&a, &view);
    let (tx, rx) = mpsc::channel(8);

    let task = tokio::spawn(session.run(rx));

    tx.send(UiRequest::Login { first: "Al".into(), last: "Liddell".into() })
        .await
        .unwrap();
    tx.send(UiRequest::Login { first: "Alice".into(), last: "Liddell".into() })
        .await
        .unwrap();
    tx.send(UiRequest::JoinRoom("lobby".into())).await.unwrap();
    tx.send(UiRequest::Leave).await.unwrap();
    tx.send(UiRequest::Quit).await.unwrap();

    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("run should return")
        .unwrap();

    let pages: Vec<Page> = view
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ViewEvent::Page(page, _) => Some(page),
            _ => None,
        })
        .collect();
    assert_eq!(
        pages,
        vec![Page::Login, Page::RoomSelection, Page::Chat, Page::RoomSelection]
    );
    assert_eq!(view.errors().len(), 1, "the short first name is reported");

    // The topic was released along the way.
    assert!(a.pubsub().join("chat-room:lobby").is_ok());
}

#[tokio::test]
async fn test_run_stops_on_shutdown_signal() {
    let net = MemoryNetwork::new();
    let a = host(&net);
    let (mut session, _view) = logged_in(&a, "Alice").await;
    session.join_room("lobby").await.unwrap();
    let signal = session.shutdown_signal();
    let (_tx, rx) = mpsc::channel(8);

    let task = tokio::spawn(session.run(rx));
    assert!(signal.trigger());
    assert!(!signal.trigger());

    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("run should return")
        .unwrap();

    // The room was left, so its topic can be joined again.
    assert!(a.pubsub().join("chat-room:lobby").is_ok());
}

#[tokio::test]
async fn test_run_ends_when_requests_close() {
    let net = MemoryNetwork::new();
    let a = host(&net);
    let view = RecordingView::new();
    let session = session(&a, &view);
    let (tx, rx) = mpsc::channel::<UiRequest>(1);
    drop(tx);

    tokio::time::timeout(Duration::from_secs(1), session.run(rx))
        .await
        .expect("run should return");
}
