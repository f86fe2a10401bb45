use super::*;
use crate::state::test_helpers;
use frames::{Mark, Segment, StrokeBegin, StrokeKind, Tool};
use tokio::time::{Duration, timeout};
use uuid::Uuid;

async fn recv_event(rx: &mut mpsc::Receiver<ServerEvent>) -> ServerEvent {
    timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("event receive timed out")
        .expect("event channel closed unexpectedly")
}

async fn assert_no_event(rx: &mut mpsc::Receiver<ServerEvent>) {
    assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err(), "expected no event");
}

fn begin(x: f64, y: f64) -> ClientEvent {
    ClientEvent::Draw(DrawRequest::StrokeBegin(StrokeBegin {
        user_id: Uuid::nil(),
        tool: Tool::Pencil,
        color: "#000000".into(),
        size: 3.0,
        from_x: x,
        from_y: y,
        timestamp: 0,
    }))
}

fn segment(from: (f64, f64), to: (f64, f64)) -> ClientEvent {
    ClientEvent::Draw(DrawRequest::Draw(Segment {
        user_id: Uuid::nil(),
        tool: Tool::Pencil,
        color: "#000000".into(),
        size: 3.0,
        from_x: from.0,
        from_y: from.1,
        to_x: to.0,
        to_y: to.1,
        timestamp: 0,
    }))
}

fn end() -> ClientEvent {
    ClientEvent::Draw(DrawRequest::StrokeEnd(Mark::default()))
}

/// Connect a client and drain its `connected` greeting.
async fn connect_client(state: &AppState) -> (UserId, mpsc::Receiver<ServerEvent>) {
    let user_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel(64);
    connect(state, user_id, tx).await;
    assert_eq!(recv_event(&mut rx).await, ServerEvent::Connected { user_id });
    (user_id, rx)
}

/// A creates a room and B joins it; all setup events are drained.
async fn room_with_two(
    state: &AppState,
) -> (RoomId, (UserId, mpsc::Receiver<ServerEvent>), (UserId, mpsc::Receiver<ServerEvent>)) {
    let (a, mut rx_a) = connect_client(state).await;
    let (b, mut rx_b) = connect_client(state).await;

    process_event(state, a, ClientEvent::CreateRoom).await;
    let ServerEvent::RoomCreated { room_id, .. } = recv_event(&mut rx_a).await else {
        panic!("expected room_created");
    };

    process_event(state, b, ClientEvent::JoinRoom { room_id: room_id.clone() }).await;
    let _joined = recv_event(&mut rx_b).await;
    let _user_joined = recv_event(&mut rx_a).await;

    (room_id, (a, rx_a), (b, rx_b))
}

async fn draw_stroke(state: &AppState, user: UserId) {
    process_event(state, user, begin(0.1, 0.1)).await;
    process_event(state, user, segment((0.1, 0.1), (0.2, 0.2))).await;
    process_event(state, user, end()).await;
}

// =============================================================================
// ROOMS
// =============================================================================

#[tokio::test]
async fn create_room_replies_with_room_and_single_member_roster() {
    let state = test_helpers::test_app_state();
    let (a, mut rx_a) = connect_client(&state).await;

    process_event(&state, a, ClientEvent::CreateRoom).await;

    match recv_event(&mut rx_a).await {
        ServerEvent::RoomCreated { room_id, user_info, users } => {
            assert_eq!(room_id.len(), 6);
            assert_eq!(users.len(), 1);
            assert_eq!(users[0].id, a);
            assert_eq!(users[0].color, user_info.color);
        }
        other => panic!("expected room_created, got {other:?}"),
    }
}

#[tokio::test]
async fn join_gives_both_clients_roster_of_two_with_distinct_colors() {
    let state = test_helpers::test_app_state();
    let (a, mut rx_a) = connect_client(&state).await;
    let (b, mut rx_b) = connect_client(&state).await;

    process_event(&state, a, ClientEvent::CreateRoom).await;
    let ServerEvent::RoomCreated { room_id, .. } = recv_event(&mut rx_a).await else {
        panic!("expected room_created");
    };

    process_event(&state, b, ClientEvent::JoinRoom { room_id: room_id.to_lowercase() }).await;

    let ServerEvent::RoomJoined { room_id: joined_id, users: b_roster, .. } = recv_event(&mut rx_b).await else {
        panic!("expected room_joined");
    };
    let ServerEvent::UserJoined { user_id, users: a_roster, .. } = recv_event(&mut rx_a).await else {
        panic!("expected user_joined");
    };

    assert_eq!(joined_id, room_id);
    assert_eq!(user_id, b);
    assert_eq!(a_roster.len(), 2);
    assert_eq!(b_roster.len(), 2);
    assert_ne!(b_roster[0].color, b_roster[1].color);
    assert_no_event(&mut rx_b).await;
}

#[tokio::test]
async fn join_unknown_room_reports_error_to_sender_only() {
    let state = test_helpers::test_app_state();
    let (room_id, (_a, mut rx_a), (b, mut rx_b)) = room_with_two(&state).await;

    process_event(&state, b, ClientEvent::JoinRoom { room_id: "ZZZZZZ".into() }).await;

    match recv_event(&mut rx_b).await {
        ServerEvent::RoomError { code, message } => {
            assert_eq!(code, "E_ROOM_NOT_FOUND");
            assert!(message.contains("ZZZZZZ"));
        }
        other => panic!("expected room_error, got {other:?}"),
    }
    assert_no_event(&mut rx_a).await;

    // Still a member of the first room.
    let live = state.live.read().await;
    assert_eq!(live.rooms.room_of(b), Some(&room_id));
}

#[tokio::test]
async fn join_blank_room_id_is_rejected() {
    let state = test_helpers::test_app_state();
    let (a, mut rx_a) = connect_client(&state).await;

    process_event(&state, a, ClientEvent::JoinRoom { room_id: "   ".into() }).await;

    assert!(matches!(
        recv_event(&mut rx_a).await,
        ServerEvent::RoomError { code, .. } if code == "E_EMPTY_ROOM_ID"
    ));
}

#[tokio::test]
async fn joining_another_room_notifies_the_old_room() {
    let state = test_helpers::test_app_state();
    let (_room, (a, mut rx_a), (b, mut rx_b)) = room_with_two(&state).await;

    process_event(&state, b, ClientEvent::CreateRoom).await;

    match recv_event(&mut rx_a).await {
        ServerEvent::UserLeft { user_id, users } => {
            assert_eq!(user_id, b);
            assert_eq!(users.len(), 1);
            assert_eq!(users[0].id, a);
        }
        other => panic!("expected user_left, got {other:?}"),
    }
    assert!(matches!(recv_event(&mut rx_b).await, ServerEvent::RoomCreated { .. }));
}

#[tokio::test]
async fn rejoining_current_room_only_replies() {
    let state = test_helpers::test_app_state();
    let (room_id, (_a, mut rx_a), (b, mut rx_b)) = room_with_two(&state).await;

    process_event(&state, b, ClientEvent::JoinRoom { room_id }).await;

    assert!(matches!(recv_event(&mut rx_b).await, ServerEvent::RoomJoined { .. }));
    assert_no_event(&mut rx_a).await;
}

// =============================================================================
// CURSORS
// =============================================================================

#[tokio::test]
async fn cursor_move_reaches_peers_with_sender_color() {
    let state = test_helpers::test_app_state();
    let (_room, (a, mut rx_a), (_b, mut rx_b)) = room_with_two(&state).await;

    process_event(&state, a, ClientEvent::CursorMove { x: 0.3, y: 0.4 }).await;

    let color = state.live.read().await.rooms.user_info(a).map(|u| u.color.clone()).expect("user info");
    assert_eq!(recv_event(&mut rx_b).await, ServerEvent::CursorMove { user_id: a, x: 0.3, y: 0.4, color });
    assert_no_event(&mut rx_a).await;
}

#[tokio::test]
async fn cursor_move_before_joining_is_ignored() {
    let state = test_helpers::test_app_state();
    let (a, mut rx_a) = connect_client(&state).await;

    process_event(&state, a, ClientEvent::CursorMove { x: 0.3, y: 0.4 }).await;

    assert_no_event(&mut rx_a).await;
}

// =============================================================================
// DRAWING
// =============================================================================

#[tokio::test]
async fn stroke_operations_go_to_peers_only_and_are_stamped() {
    let state = test_helpers::test_app_state();
    let (_room, (a, mut rx_a), (_b, mut rx_b)) = room_with_two(&state).await;

    draw_stroke(&state, a).await;

    let events = [recv_event(&mut rx_b).await, recv_event(&mut rx_b).await, recv_event(&mut rx_b).await];
    match &events {
        [
            ServerEvent::Draw(DrawEvent::StrokeBegin(first)),
            ServerEvent::Draw(DrawEvent::Draw(seg)),
            ServerEvent::Draw(DrawEvent::StrokeEnd(last)),
        ] => {
            assert_eq!(first.user_id, a);
            assert_eq!(seg.user_id, a);
            assert!(seg.timestamp > 0);
            assert!((seg.to_x - 0.2).abs() < f64::EPSILON);
            assert_eq!(last.user_id, a);
        }
        other => panic!("unexpected draw sequence: {other:?}"),
    }
    assert_no_event(&mut rx_a).await;
    assert_no_event(&mut rx_b).await;

    let live = state.live.read().await;
    let room_id = live.rooms.room_of(a).cloned().expect("room");
    let log = live.rooms.room(&room_id).expect("room").log();
    assert_eq!(log.strokes().len(), 1);
    assert_eq!(log.operation_count(), 3);
}

#[tokio::test]
async fn clear_is_echoed_to_sender_and_peers() {
    let state = test_helpers::test_app_state();
    let (_room, (a, mut rx_a), (_b, mut rx_b)) = room_with_two(&state).await;
    draw_stroke(&state, a).await;
    for _ in 0..3 {
        recv_event(&mut rx_b).await;
    }

    process_event(&state, a, ClientEvent::Draw(DrawRequest::Clear(Mark::default()))).await;

    assert!(matches!(recv_event(&mut rx_a).await, ServerEvent::Draw(DrawEvent::Clear(mark)) if mark.user_id == a));
    assert!(matches!(recv_event(&mut rx_b).await, ServerEvent::Draw(DrawEvent::Clear(_))));
}

#[tokio::test]
async fn undo_with_nothing_to_undo_sends_nothing() {
    let state = test_helpers::test_app_state();
    let (_room, (a, mut rx_a), (_b, mut rx_b)) = room_with_two(&state).await;

    process_event(&state, a, ClientEvent::Draw(DrawRequest::Clear(Mark::default()))).await;
    recv_event(&mut rx_a).await;
    recv_event(&mut rx_b).await;

    process_event(&state, a, ClientEvent::Draw(DrawRequest::Undo)).await;
    process_event(&state, a, ClientEvent::Draw(DrawRequest::Redo)).await;

    assert_no_event(&mut rx_a).await;
    assert_no_event(&mut rx_b).await;
}

#[tokio::test]
async fn undo_and_redo_are_broadcast_to_everyone_with_the_stroke() {
    let state = test_helpers::test_app_state();
    let (_room, (a, mut rx_a), (b, mut rx_b)) = room_with_two(&state).await;
    draw_stroke(&state, a).await;
    for _ in 0..3 {
        recv_event(&mut rx_b).await;
    }

    // Undo is global per room: B undoes A's stroke.
    process_event(&state, b, ClientEvent::Draw(DrawRequest::Undo)).await;
    for rx in [&mut rx_a, &mut rx_b] {
        match recv_event(rx).await {
            ServerEvent::Draw(DrawEvent::Undo { user_id, undone_stroke }) => {
                assert_eq!(user_id, b);
                assert_eq!(undone_stroke.user_id, a);
                assert_eq!(undone_stroke.kind, StrokeKind::Stroke);
                assert_eq!(undone_stroke.operations.len(), 1);
            }
            other => panic!("expected undo, got {other:?}"),
        }
    }

    process_event(&state, a, ClientEvent::Draw(DrawRequest::Redo)).await;
    for rx in [&mut rx_a, &mut rx_b] {
        assert!(matches!(recv_event(rx).await, ServerEvent::Draw(DrawEvent::Redo { redone_stroke, .. }) if redone_stroke.user_id == a));
    }
}

#[tokio::test]
async fn draw_before_joining_is_an_error() {
    let state = test_helpers::test_app_state();
    let (a, mut rx_a) = connect_client(&state).await;

    process_event(&state, a, begin(0.5, 0.5)).await;

    assert!(matches!(
        recv_event(&mut rx_a).await,
        ServerEvent::RoomError { code, .. } if code == "E_NOT_IN_ROOM"
    ));
}

#[tokio::test]
async fn canvas_state_returns_raw_operations_to_requester_only() {
    let state = test_helpers::test_app_state();
    let (_room, (a, mut rx_a), (b, mut rx_b)) = room_with_two(&state).await;
    draw_stroke(&state, a).await;
    for _ in 0..3 {
        recv_event(&mut rx_b).await;
    }

    process_event(&state, b, ClientEvent::RequestCanvasState).await;

    match recv_event(&mut rx_b).await {
        ServerEvent::CanvasState { operations } => {
            assert_eq!(operations.len(), 3);
            assert!(matches!(operations[0], Operation::StrokeBegin(_)));
            assert!(operations.iter().all(|op| op.user_id() == a));
        }
        other => panic!("expected canvas_state, got {other:?}"),
    }
    assert_no_event(&mut rx_a).await;
}

// =============================================================================
// DISCONNECT
// =============================================================================

#[tokio::test]
async fn disconnect_notifies_remaining_members() {
    let state = test_helpers::test_app_state();
    let (room_id, (a, _rx_a), (b, mut rx_b)) = room_with_two(&state).await;

    disconnect(&state, a).await;

    assert_eq!(recv_event(&mut rx_b).await, ServerEvent::UserLeft {
        user_id: a,
        users: state.live.read().await.rooms.list_members(&room_id).expect("room still exists"),
    });
    let live = state.live.read().await;
    assert!(!live.clients.contains_key(&a));
    assert_eq!(live.rooms.room(&room_id).map(|r| r.members().to_vec()), Some(vec![b]));
}

#[tokio::test]
async fn last_disconnect_deletes_room_and_log_silently() {
    let state = test_helpers::test_app_state();
    let (a, mut rx_a) = connect_client(&state).await;
    process_event(&state, a, ClientEvent::CreateRoom).await;
    let ServerEvent::RoomCreated { room_id, .. } = recv_event(&mut rx_a).await else {
        panic!("expected room_created");
    };
    draw_stroke(&state, a).await;

    disconnect(&state, a).await;

    let live = state.live.read().await;
    assert!(!live.rooms.room_exists(&room_id));
    assert_eq!(live.rooms.room_count(), 0);
}

#[tokio::test]
async fn disconnect_mid_stroke_frees_the_open_stroke() {
    let state = test_helpers::test_app_state();
    let (room_id, (a, _rx_a), (_b, _rx_b)) = room_with_two(&state).await;

    process_event(&state, a, begin(0.0, 0.0)).await;
    for i in 0..50 {
        let x = f64::from(i) / 100.0;
        process_event(&state, a, segment((x, x), (x + 0.01, x + 0.01))).await;
    }
    {
        let live = state.live.read().await;
        let log = live.rooms.room(&room_id).expect("room exists").log();
        assert_eq!(log.open_stroke(&a).map(|s| s.operations.len()), Some(50));
    }

    disconnect(&state, a).await;

    let live = state.live.read().await;
    let log = live.rooms.room(&room_id).expect("room kept by remaining member").log();
    assert!(log.open_stroke(&a).is_none());
    assert!(log.strokes().is_empty());
    // Segments already relayed stay in the raw list for late joiners.
    assert_eq!(log.operation_count(), 51);
}

#[tokio::test]
async fn switching_rooms_mid_stroke_frees_the_open_stroke() {
    let state = test_helpers::test_app_state();
    let (room_id, (a, _rx_a), (_b, _rx_b)) = room_with_two(&state).await;

    process_event(&state, a, begin(0.1, 0.1)).await;
    process_event(&state, a, segment((0.1, 0.1), (0.2, 0.2))).await;
    process_event(&state, a, ClientEvent::CreateRoom).await;

    let live = state.live.read().await;
    let old_log = live.rooms.room(&room_id).expect("old room kept by B").log();
    assert!(old_log.open_stroke(&a).is_none());
    assert_ne!(live.rooms.room_of(a), Some(&room_id));
}

// =============================================================================
// DELIVERY
// =============================================================================

#[tokio::test]
async fn full_queue_drops_event_without_blocking_others() {
    let state = test_helpers::test_app_state();
    let (_room, (a, mut rx_a), (b, mut rx_b)) = room_with_two(&state).await;

    // Swap B's queue for a tiny one that is already full.
    let mut rx_slow = test_helpers::register_client(&state, b, 1).await;
    process_event(&state, a, ClientEvent::Draw(DrawRequest::Clear(Mark::default()))).await;
    process_event(&state, a, ClientEvent::Draw(DrawRequest::Clear(Mark::default()))).await;

    assert!(matches!(recv_event(&mut rx_a).await, ServerEvent::Draw(DrawEvent::Clear(_))));
    assert!(matches!(recv_event(&mut rx_a).await, ServerEvent::Draw(DrawEvent::Clear(_))));
    assert!(matches!(recv_event(&mut rx_slow).await, ServerEvent::Draw(DrawEvent::Clear(_))));
    assert_no_event(&mut rx_slow).await;
    // The replaced queue's sender was dropped.
    assert!(rx_b.recv().await.is_none());
}

#[test]
fn handle_event_uses_server_timestamp() {
    let mut rooms = RoomRegistry::default();
    let user = Uuid::new_v4();
    let room_id = rooms.create_room();
    rooms.add_user(&room_id, user, None);

    let outcome = handle_event(&mut rooms, user, begin(0.1, 0.2), 1234).expect("user is in a room");

    match outcome {
        Outcome::BroadcastExcludeSender { room_id: target, event: ServerEvent::Draw(DrawEvent::StrokeBegin(op)) } => {
            assert_eq!(target, room_id);
            assert_eq!(op.timestamp, 1234);
            assert_eq!(op.user_id, user);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn departure_from_deleted_room_is_silent() {
    let user = Uuid::new_v4();
    let deleted = Departure { room_id: "ABCDEF".into(), remaining: Vec::new(), room_deleted: true };
    let then = Outcome::Reply(ServerEvent::Connected { user_id: user });

    assert_eq!(after_departure(user, Some(deleted), then.clone()), then);
}
