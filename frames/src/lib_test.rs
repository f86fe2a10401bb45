use super::*;
use serde_json::json;
use uuid::Uuid;

fn segment(user_id: UserId) -> Segment {
    Segment {
        user_id,
        tool: Tool::Pencil,
        color: "#FF0000".to_owned(),
        size: 5.0,
        from_x: 0.1,
        from_y: 0.1,
        to_x: 0.2,
        to_y: 0.2,
        timestamp: 42,
    }
}

#[test]
fn client_draw_request_parses_without_user_or_timestamp() {
    let text = r##"{"event":"draw","data":{"type":"draw","tool":"pencil","color":"#000000","size":5,"fromX":0.1,"fromY":0.1,"toX":0.2,"toY":0.2}}"##;
    let event: ClientEvent = decode(text).expect("decode should succeed");
    let ClientEvent::Draw(DrawRequest::Draw(seg)) = event else {
        panic!("expected draw segment, got {event:?}");
    };
    assert!(seg.user_id.is_nil());
    assert_eq!(seg.timestamp, 0);
    assert!((seg.to_x - 0.2).abs() < f64::EPSILON);
}

#[test]
fn non_uuid_user_id_on_request_reads_as_nil() {
    let text = r##"{"event":"draw","data":{"type":"stroke_begin","userId":"socket-abc123","tool":"eraser","color":"#000000","size":5,"fromX":0.1,"fromY":0.1}}"##;
    let event: ClientEvent = decode(text).expect("draw with foreign user id should decode");
    let ClientEvent::Draw(DrawRequest::StrokeBegin(begin)) = event else {
        panic!("expected stroke_begin, got {event:?}");
    };
    assert!(begin.user_id.is_nil());
    assert_eq!(begin.tool, Tool::Eraser);

    let end: ClientEvent = decode(r#"{"event":"draw","data":{"type":"stroke_end","userId":42}}"#).expect("stroke_end");
    assert_eq!(end, ClientEvent::Draw(DrawRequest::StrokeEnd(Mark::default())));
}

#[test]
fn uuid_user_id_still_parses() {
    let user = Uuid::new_v4();
    let text = format!(r#"{{"event":"draw","data":{{"type":"clear","userId":"{user}","timestamp":5}}}}"#);
    let event: ClientEvent = decode(&text).expect("clear");
    assert_eq!(event, ClientEvent::Draw(DrawRequest::Clear(Mark { user_id: user, timestamp: 5 })));
}

#[test]
fn payload_free_events_parse_without_data() {
    let create: ClientEvent = decode(r#"{"event":"create_room"}"#).expect("create_room");
    assert_eq!(create, ClientEvent::CreateRoom);
    let state: ClientEvent = decode(r#"{"event":"request_canvas_state"}"#).expect("request_canvas_state");
    assert_eq!(state, ClientEvent::RequestCanvasState);
    let end: ClientEvent = decode(r#"{"event":"draw","data":{"type":"stroke_end"}}"#).expect("stroke_end");
    assert_eq!(end, ClientEvent::Draw(DrawRequest::StrokeEnd(Mark::default())));
    let undo: ClientEvent = decode(r#"{"event":"draw","data":{"type":"undo"}}"#).expect("undo");
    assert_eq!(undo, ClientEvent::Draw(DrawRequest::Undo));
}

#[test]
fn join_room_uses_camel_case_field() {
    let event: ClientEvent = decode(r#"{"event":"join_room","data":{"roomId":"ABC234"}}"#).expect("join");
    assert_eq!(event, ClientEvent::JoinRoom { room_id: "ABC234".to_owned() });
}

#[test]
fn unknown_event_and_draw_type_are_rejected() {
    assert!(decode::<ClientEvent>(r#"{"event":"teleport"}"#).is_err());
    assert!(decode::<ClientEvent>(r#"{"event":"draw","data":{"type":"smudge"}}"#).is_err());
    assert!(decode::<ClientEvent>("not json").is_err());
}

#[test]
fn draw_missing_coordinates_is_rejected() {
    let text = r##"{"event":"draw","data":{"type":"draw","tool":"pencil","color":"#000","size":5}}"##;
    assert!(matches!(decode::<ClientEvent>(text), Err(CodecError::Decode(_))));
}

#[test]
fn outbound_draw_carries_user_id_and_type_tag() {
    let user = Uuid::new_v4();
    let event = ServerEvent::Draw(DrawEvent::Draw(segment(user)));
    let value: serde_json::Value = serde_json::from_str(&encode(&event).expect("encode")).expect("json");
    assert_eq!(value["event"], "draw");
    assert_eq!(value["data"]["type"], "draw");
    assert_eq!(value["data"]["userId"], json!(user));
    assert_eq!(value["data"]["fromX"], json!(0.1));
}

#[test]
fn undo_event_nests_the_undone_stroke() {
    let user = Uuid::new_v4();
    let stroke = Stroke { user_id: user, kind: StrokeKind::Stroke, operations: vec![segment(user)], timestamp: 7 };
    let event = ServerEvent::Draw(DrawEvent::Undo { user_id: user, undone_stroke: stroke });
    let value: serde_json::Value = serde_json::from_str(&encode(&event).expect("encode")).expect("json");
    assert_eq!(value["data"]["type"], "undo");
    assert_eq!(value["data"]["undoneStroke"]["type"], "stroke");
    assert_eq!(value["data"]["undoneStroke"]["operations"].as_array().map(Vec::len), Some(1));
}

#[test]
fn nil_user_and_zero_timestamp_are_omitted_on_requests() {
    let request = ClientEvent::Draw(DrawRequest::StrokeEnd(Mark::default()));
    let text = encode(&request).expect("encode");
    assert_eq!(text, r#"{"event":"draw","data":{"type":"stroke_end"}}"#);
}

#[test]
fn stamped_overwrites_client_supplied_identity() {
    let spoofed = Uuid::new_v4();
    let actual = Uuid::new_v4();
    let op = Operation::Draw(segment(spoofed)).stamped(actual, 99);
    assert_eq!(op.user_id(), actual);
    assert_eq!(op.timestamp(), 99);
}

#[test]
fn shared_history_events_are_flagged() {
    let user = Uuid::new_v4();
    assert!(DrawEvent::Clear(Mark { user_id: user, timestamp: 1 }).is_shared_history());
    assert!(!DrawEvent::Draw(segment(user)).is_shared_history());
    assert!(!DrawEvent::StrokeEnd(Mark::default()).is_shared_history());
}

#[test]
fn negative_cursor_is_hidden() {
    assert_eq!(Cursor::from_wire(-1.0, -1.0), None);
    assert_eq!(Cursor::from_wire(0.5, 0.25), Some(Cursor { x: 0.5, y: 0.25 }));
}

#[test]
fn room_error_uses_error_code() {
    #[derive(Debug, thiserror::Error)]
    #[error("room does not exist")]
    struct Missing;

    impl ErrorCode for Missing {
        fn error_code(&self) -> &'static str {
            "E_ROOM_NOT_FOUND"
        }
    }

    let event = ServerEvent::room_error(&Missing);
    assert_eq!(
        event,
        ServerEvent::RoomError { code: "E_ROOM_NOT_FOUND".to_owned(), message: "room does not exist".to_owned() }
    );
    assert_eq!(event.name(), "room_error");
}

#[test]
fn now_ms_is_positive() {
    assert!(now_ms() > 0);
}
