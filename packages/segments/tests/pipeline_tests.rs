use serde_json::json;
use std::sync::{Arc, Mutex};
use trellis_protocol::{ChangeSet, ScriptCall};
use trellis_segments::{
    ChangePipeline, MarkerConfig, ScriptError, ScriptRegistry, ScriptTarget, SegmentStore,
};

fn seg(id: &str, body: &str) -> String {
    format!(
        r#"<span class="begin" data-segid="{id}"></span>{body}<span class="end" data-segid="{id}"></span>"#
    )
}

fn placeholder(id: &str) -> String {
    format!(r#"<span class="placeholder" data-segid="{id}"></span>"#)
}

fn loaded(markup: &str) -> SegmentStore {
    let mut store = SegmentStore::new(MarkerConfig::default());
    store.load_document(markup).unwrap();
    store.register_document();
    store
}

fn visible_text(store: &SegmentStore, segment_id: &str) -> String {
    store
        .highlightable_nodes(segment_id)
        .unwrap()
        .into_iter()
        .map(|node| store.tree().text_content(node))
        .collect()
}

/// Registry whose `record` callback logs the text of each node it runs on
fn recording_registry() -> (ScriptRegistry, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ScriptRegistry::new();
    let log = Arc::clone(&seen);
    registry.register("record", move |cx, args| {
        let label = args.as_str().unwrap_or_default().to_string();
        let text = match cx.target() {
            ScriptTarget::Node(node) => cx.tree.text_content(*node),
            ScriptTarget::Popup { popup_id, nodes } => format!("{popup_id}:{}", nodes.len()),
            ScriptTarget::Document => "document".to_string(),
        };
        log.lock().unwrap().push(format!("{label}:{text}"));
        Ok(())
    });
    (registry, seen)
}

#[test]
fn test_modify_replaces_content() {
    let mut store = loaded(&seg("s1", "A"));
    let mut scripts = ScriptRegistry::new();
    let old_nodes = store.segment_nodes("s1").unwrap();

    let changes = ChangeSet {
        modified: vec![(
            "s1".into(),
            "<span data-segid=s1 class=begin></span>B<span data-segid=s1 class=end></span>".into(),
        )],
        ..Default::default()
    };
    let report = ChangePipeline::new(&mut store, &mut scripts).apply(&changes);

    assert_eq!(report.modified, vec!["s1"]);
    assert_eq!(visible_text(&store, "s1"), "B");
    assert!(store.take_broken().is_empty());
    for node in old_nodes {
        assert_eq!(store.tags().get(node), None);
    }
}

#[test]
fn test_remove_absent_segment_is_noop() {
    let mut store = loaded(&seg("s2", "keep"));
    let mut scripts = ScriptRegistry::new();

    let changes = ChangeSet {
        removed: vec!["s1".into()],
        ..Default::default()
    };
    let report = ChangePipeline::new(&mut store, &mut scripts).apply(&changes);

    assert!(report.removed.is_empty());
    assert!(store.contains("s2"));
}

#[test]
fn test_remove_drops_table_entry() {
    let mut store = loaded(&seg("s1", "gone"));
    let mut scripts = ScriptRegistry::new();

    let changes = ChangeSet {
        removed: vec!["s1".into()],
        ..Default::default()
    };
    ChangePipeline::new(&mut store, &mut scripts).apply(&changes);

    assert!(!store.contains("s1"));
}

#[test]
fn test_scripts_see_old_then_new_content() {
    let mut store = loaded(&seg("s1", "old"));
    let (mut scripts, seen) = recording_registry();

    let changes = ChangeSet {
        shutdown_scripts: vec![("s1".into(), vec![ScriptCall::new("record", json!("down"))])],
        modified: vec![("s1".into(), seg("s1", "new"))],
        initialise_scripts: vec![("s1".into(), vec![ScriptCall::new("record", json!("up"))])],
        ..Default::default()
    };
    let report = ChangePipeline::new(&mut store, &mut scripts).apply(&changes);

    assert_eq!(*seen.lock().unwrap(), vec!["down:old", "up:new"]);
    assert_eq!(report.scripts_run, 2);
}

#[test]
fn test_failing_shutdown_script_does_not_block_batch() {
    let mut store = loaded(&seg("s1", "<i>a</i><i>b</i>"));
    let (mut scripts, seen) = recording_registry();
    scripts.register("fail", |_, _| Err(ScriptError::failed("widget refused")));

    let changes = ChangeSet {
        shutdown_scripts: vec![(
            "s1".into(),
            vec![ScriptCall::new("fail", json!(null)), ScriptCall::new("record", json!("down"))],
        )],
        removed: vec!["s1".into()],
        ..Default::default()
    };
    let report = ChangePipeline::new(&mut store, &mut scripts).apply(&changes);

    assert_eq!(report.script_failures.len(), 2);
    assert_eq!(*seen.lock().unwrap(), vec!["down:a", "down:b"]);
    assert!(!store.contains("s1"));
}

#[test]
fn test_unknown_segment_abandons_remaining_node_scripts() {
    let mut store = loaded(&seg("s1", "x"));
    let (mut scripts, seen) = recording_registry();

    let changes = ChangeSet {
        initialise_scripts: vec![
            ("ghost".into(), vec![ScriptCall::new("record", json!("ghost"))]),
            ("s1".into(), vec![ScriptCall::new("record", json!("s1"))]),
        ],
        ..Default::default()
    };
    ChangePipeline::new(&mut store, &mut scripts).apply(&changes);

    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_popup_segments_stay_off_page() {
    let mut store = loaded(&seg("s1", "page"));
    let (mut scripts, seen) = recording_registry();

    let changes = ChangeSet {
        popups: vec![("menu".into(), seg("menu", &seg("item", "<b>open</b>")))],
        popup_scripts: vec![("menu".into(), ScriptCall::new("record", json!("popup")))],
        ..Default::default()
    };
    let report = ChangePipeline::new(&mut store, &mut scripts).apply(&changes);

    assert_eq!(report.popups, vec!["menu"]);
    assert_eq!(report.registered, vec!["item"]);
    assert!(!store.is_active("menu"));
    assert_eq!(visible_text(&store, "item"), "open");
    assert_eq!(*seen.lock().unwrap(), vec!["popup:menu:5"]);
}

#[test]
fn test_child_survives_parent_modification() {
    let mut store = loaded(&seg("parent", &format!("before{}", seg("child", "<input>"))));
    let child_nodes = store.segment_nodes("child").unwrap();
    let mut scripts = ScriptRegistry::new();

    let changes = ChangeSet {
        modified: vec![(
            "parent".into(),
            seg("parent", &format!("after{}", placeholder("child"))),
        )],
        ..Default::default()
    };
    let report = ChangePipeline::new(&mut store, &mut scripts).apply(&changes);

    assert_eq!(report.placeholders_resolved, 1);
    assert_eq!(store.segment_nodes("child").unwrap(), child_nodes);
    assert!(store.is_active("child"));
    assert_eq!(store.segment_id_for_node(child_nodes[1]), Some("child"));
    assert!(store.take_broken().is_empty());
}

#[test]
fn test_broken_markup_in_modification_is_collected() {
    let mut store = loaded(&seg("s1", "x"));
    let mut scripts = ScriptRegistry::new();

    let changes = ChangeSet {
        modified: vec![(
            "s1".into(),
            seg(
                "s1",
                r#"<div><span class="begin" data-segid="torn"></span></div>"#,
            ),
        )],
        ..Default::default()
    };
    ChangePipeline::new(&mut store, &mut scripts).apply(&changes);

    assert_eq!(store.take_broken(), vec!["torn"]);
    assert!(store.contains("s1"));
}

#[test]
fn test_scripts_post_events() {
    let mut store = loaded(&seg("s1", "<button>go</button>"));
    let mut scripts = ScriptRegistry::new();
    scripts.register("announce", |cx, _| {
        if let Some(node) = cx.node() {
            cx.post_event(node, "ready", json!(true));
        }
        Ok(())
    });

    let changes = ChangeSet {
        initialise_scripts: vec![("s1".into(), vec![ScriptCall::new("announce", json!(null))])],
        ..Default::default()
    };
    let report = ChangePipeline::new(&mut store, &mut scripts).apply(&changes);

    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].segment_id.as_deref(), Some("s1"));
    assert_eq!(report.events[0].event_name, "ready");
}

#[test]
fn test_repeated_modification_keeps_store_bounded() {
    let mut store = loaded(&seg("s1", "<b>0</b>"));
    let mut scripts = ScriptRegistry::new();
    let live_at_start = store.tree().node_count();
    let first_nodes = store.segment_nodes("s1").unwrap();

    let modify = |store: &mut SegmentStore, scripts: &mut ScriptRegistry, round: usize| {
        let changes = ChangeSet {
            modified: vec![("s1".into(), seg("s1", &format!("<b>{round}</b>")))],
            ..Default::default()
        };
        ChangePipeline::new(store, scripts).apply(&changes);
    };

    modify(&mut store, &mut scripts, 1);
    let slots_after_first = store.tree().len();
    for round in 2..=1000 {
        modify(&mut store, &mut scripts, round);
    }

    assert_eq!(visible_text(&store, "s1"), "1000");
    assert_eq!(store.tree().len(), slots_after_first);
    assert_eq!(store.tree().node_count(), live_at_start);
    assert_eq!(store.len(), 1);

    let last_nodes = store.segment_nodes("s1").unwrap();
    let changes = ChangeSet {
        removed: vec!["s1".into()],
        ..Default::default()
    };
    ChangePipeline::new(&mut store, &mut scripts).apply(&changes);

    for node in last_nodes {
        assert_eq!(store.tags().get(node), None);
        assert_eq!(store.segment_id_for_node(node), None);
    }
    // slots of the first run have been handed out again; none may carry a tag
    for node in first_nodes {
        assert_eq!(store.tags().get(node), None);
    }
}

#[test]
fn test_removed_popup_is_freed() {
    let mut store = loaded(&seg("s1", "page"));
    let mut scripts = ScriptRegistry::new();

    let changes = ChangeSet {
        popups: vec![("menu".into(), seg("menu", "<b>open</b>"))],
        ..Default::default()
    };
    ChangePipeline::new(&mut store, &mut scripts).apply(&changes);
    let popup_nodes = store.segment_nodes("menu").unwrap();
    let live_with_popup = store.tree().node_count();

    let changes = ChangeSet {
        removed: vec!["menu".into()],
        ..Default::default()
    };
    let report = ChangePipeline::new(&mut store, &mut scripts).apply(&changes);

    assert_eq!(report.removed, vec!["menu"]);
    for node in popup_nodes {
        assert!(!store.tree().contains(node));
        assert_eq!(store.tags().get(node), None);
    }
    // begin, <b>, its text, end and the holding fragment
    assert_eq!(store.tree().node_count(), live_with_popup - 5);
    assert_eq!(visible_text(&store, "s1"), "page");
}

#[test]
fn test_nested_child_survives_freeing_of_old_parent_run() {
    let mut store = loaded(&seg(
        "parent",
        &format!("<div>{}</div>", seg("child", "<input>")),
    ));
    let child_nodes = store.segment_nodes("child").unwrap();
    let mut scripts = ScriptRegistry::new();

    let changes = ChangeSet {
        modified: vec![(
            "parent".into(),
            seg("parent", &format!("<p>{}</p>", placeholder("child"))),
        )],
        ..Default::default()
    };
    let report = ChangePipeline::new(&mut store, &mut scripts).apply(&changes);

    assert_eq!(report.placeholders_resolved, 1);
    assert_eq!(store.segment_nodes("child").unwrap(), child_nodes);
    assert!(store.is_active("child"));
    for &node in &child_nodes {
        assert!(store.tree().contains(node));
    }
    assert_eq!(store.segment_id_for_node(child_nodes[1]), Some("child"));
}
