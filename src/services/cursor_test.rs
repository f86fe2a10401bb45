use super::*;
use frames::events::HIDDEN_CURSOR;
use uuid::Uuid;

#[test]
fn cursor_move_without_room_is_dropped() {
    let mut rooms = RoomRegistry::default();
    assert!(cursor_moved(&mut rooms, Uuid::new_v4(), 0.5, 0.5).is_none());
}

#[test]
fn cursor_move_records_position_and_carries_color() {
    let mut rooms = RoomRegistry::default();
    let room_id = rooms.create_room();
    let user = Uuid::new_v4();
    rooms.add_user(&room_id, user, None);

    let (target, event) = cursor_moved(&mut rooms, user, 0.25, 0.75).expect("user is in a room");
    assert_eq!(target, room_id);
    let color = rooms.user_info(user).map(|u| u.color.clone()).expect("user info");
    assert_eq!(event, ServerEvent::CursorMove { user_id: user, x: 0.25, y: 0.75, color });
    assert_eq!(rooms.user_info(user).and_then(|u| u.cursor), Some(Cursor { x: 0.25, y: 0.75 }));
}

#[test]
fn hidden_sentinel_clears_stored_cursor() {
    let mut rooms = RoomRegistry::default();
    let room_id = rooms.create_room();
    let user = Uuid::new_v4();
    rooms.add_user(&room_id, user, None);
    cursor_moved(&mut rooms, user, 0.1, 0.1);

    let (_, event) = cursor_moved(&mut rooms, user, HIDDEN_CURSOR, HIDDEN_CURSOR).expect("user is in a room");
    assert!(matches!(event, ServerEvent::CursorMove { x, y, .. } if x < 0.0 && y < 0.0));
    assert_eq!(rooms.user_info(user).and_then(|u| u.cursor), None);
}
