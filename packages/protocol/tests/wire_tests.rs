//! JSON shape of protocol records

use serde_json::json;
use trellis_protocol::{
    ChangeSet, EventRecord, OutboundBlock, ReportedFixKind, ScriptCall, ServerMessage,
};

#[test]
fn test_outbound_block_shape() {
    let block = OutboundBlock {
        id: 4,
        messages: vec![
            EventRecord::segment("s1", "click", json!({"x": 1})),
            EventRecord::document("close_page", json!(null)),
        ],
        ack_immediately: true,
    };

    assert_eq!(
        serde_json::to_value(&block).unwrap(),
        json!({
            "id": 4,
            "ackImmediately": true,
            "messages": [
                {"msgtype": "event", "segmentId": "s1", "eventName": "click", "data": {"x": 1}},
                {"msgtype": "event", "segmentId": null, "eventName": "close_page", "data": null}
            ]
        })
    );
}

#[test]
fn test_change_set_defaults_missing_fields() {
    let changes: ChangeSet = serde_json::from_value(json!({"removed": ["a", "b"]})).unwrap();
    assert_eq!(changes.removed, vec!["a", "b"]);
    assert!(changes.modified.is_empty());
    assert!(changes.initialise_scripts.is_empty());
    assert!(!changes.is_empty());
    assert!(ChangeSet::default().is_empty());
}

#[test]
fn test_change_set_scripts() {
    let changes: ChangeSet = serde_json::from_value(json!({
        "shutdownScripts": [["s1", [{"callback": "chart.dispose"}]]],
        "popupScripts": [["p1", {"callback": "popup.open", "args": {"anchor": "s1"}}]]
    }))
    .unwrap();

    assert_eq!(
        changes.shutdown_scripts,
        vec![("s1".to_string(), vec![ScriptCall::new("chart.dispose", json!(null))])]
    );
    assert_eq!(changes.popup_scripts[0].1.args, json!({"anchor": "s1"}));
}

#[test]
fn test_structure_fix_report() {
    let message = ServerMessage::decode(json!({
        "msgtype": "html_structure_fixes",
        "fixesByModel": [{
            "modelTypeName": "Table",
            "fixes": [
                {"fixType": "close_unclosed_tag", "tag": "td"},
                {"fixType": "drop_close_tag_with_no_matching_open_tag", "tag": "tr"}
            ]
        }]
    }))
    .unwrap();

    let ServerMessage::HtmlStructureFixes { fixes_by_model } = message else {
        panic!("expected structure fixes");
    };
    assert_eq!(fixes_by_model[0].model_type_name, "Table");
    assert_eq!(
        fixes_by_model[0].fixes[1].fix_type,
        ReportedFixKind::DropCloseTagWithNoMatchingOpenTag
    );
}

#[test]
fn test_reload_with_params() {
    let message = ServerMessage::decode(json!({
        "msgtype": "reload_page",
        "location": null,
        "getParams": {"page": 2}
    }))
    .unwrap();

    let ServerMessage::ReloadPage(request) = message else {
        panic!("expected reload");
    };
    assert_eq!(request.location, None);
    assert!(!request.is_plain_reload());
}

#[test]
fn test_resource_messages() {
    let message = ServerMessage::decode(json!({
        "msgtype": "resource_messages",
        "messages": [{"resourceId": "r1", "message": {"msgtype": "modified"}}]
    }))
    .unwrap();

    let ServerMessage::ResourceMessages { messages } = message else {
        panic!("expected resource messages");
    };
    assert_eq!(messages[0].resource_id, "r1");
}
