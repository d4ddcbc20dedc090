use super::*;

#[test]
fn request_entry_uses_comma_format() {
    assert_eq!(Message::request_entry(0, 1).to_wire_string(), "reqEntry,0,1");
}

#[test]
fn reply_ok_carries_sender_index() {
    assert_eq!(Message::reply_ok(2).to_wire_string(), "respOk,2");
}

#[test]
fn parses_request_entry() {
    let message: Message = "reqEntry,1,5".parse().unwrap();

    assert_eq!(
        message,
        Message::RequestEntry {
            index: 1,
            timestamp: 5
        }
    );
}

#[test]
fn parses_bare_reply_ok_without_index() {
    assert_eq!(
        Message::from_wire_string("respOk").unwrap(),
        Message::ReplyOk { index: None }
    );
}

#[test]
fn tolerates_surrounding_whitespace() {
    assert_eq!(
        Message::from_wire_string("  reqEntry, 3 , 12 \n").unwrap(),
        Message::request_entry(3, 12)
    );
}

#[test]
fn rejects_empty_payload() {
    assert_eq!(Message::from_wire_string("   "), Err(WireError::Empty));
}

#[test]
fn rejects_unknown_tag() {
    assert_eq!(
        Message::from_wire_string("hello,1"),
        Err(WireError::UnknownTag("hello".to_string()))
    );
}

#[test]
fn rejects_missing_timestamp() {
    assert_eq!(
        Message::from_wire_string("reqEntry,1"),
        Err(WireError::FieldCount {
            tag: "reqEntry",
            expected: 2,
            got: 1
        })
    );
}

#[test]
fn rejects_non_numeric_fields() {
    assert_eq!(
        Message::from_wire_string("reqEntry,one,5"),
        Err(WireError::InvalidField {
            field: "index",
            value: "one".to_string()
        })
    );
    assert_eq!(
        Message::from_wire_string("reqEntry,1,-5"),
        Err(WireError::InvalidField {
            field: "timestamp",
            value: "-5".to_string()
        })
    );
}

#[test]
fn rejects_reply_with_extra_fields() {
    assert!(matches!(
        Message::from_wire_string("respOk,1,2"),
        Err(WireError::FieldCount { got: 2, .. })
    ));
}

#[test]
fn handshake_is_json() {
    let handshake = Handshake::new("127.0.0.1:5000");
    let line = handshake.to_json_string().unwrap();

    assert_eq!(line, r#"{"address":"127.0.0.1:5000"}"#);
    assert_eq!(Handshake::from_json_string(&line).unwrap(), handshake);
}

#[test]
fn rejects_timestamp_no_clock_can_pass() {
    assert_eq!(
        Message::from_wire_string("reqEntry,1,18446744073709551615"),
        Err(WireError::InvalidField {
            field: "timestamp",
            value: "18446744073709551615".to_string()
        })
    );
    assert_eq!(
        Message::from_wire_string("reqEntry,1,18446744073709551614").unwrap(),
        Message::request_entry(1, u64::MAX - 1)
    );
}
