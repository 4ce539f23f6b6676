//! Build-stack and anchor properties of documents held by the engine

use folio_common::FolioError;
use folio_config::Config;
use folio_core::{FolioEngine, ListItemSpec};
use folio_test_helpers::prelude::*;

fn engine() -> FolioEngine {
    suppress_logs();
    let workspace = temp_dir();
    FolioEngine::new(&Config::with_root(workspace.path()))
}

fn node_count(engine: &FolioEngine, key: &str) -> usize {
    engine
        .registry()
        .with_session(key, |s| Ok(s.tree().node_count()))
        .unwrap()
}

#[test]
fn test_same_prompt_same_key_without_clobbering() {
    let engine = engine();
    let (key, _) = engine.create_document("Write a report").unwrap();
    engine.add_title(&key, "Report").unwrap();
    let before = engine.export_json(&key).unwrap();

    let (again, created) = engine.create_document("Write a report").unwrap();
    assert_eq!(again, key);
    assert!(!created, "second create must not replace the document");
    assert_eq!(engine.export_json(&key).unwrap(), before);
}

#[test]
fn test_open_close_and_extra_close() {
    let engine = engine();
    let (key, _) = engine.create_document("lists").unwrap();

    engine.open_list(&key, false).unwrap();
    assert_eq!(engine.stack_depth(&key).unwrap(), 2);
    engine.close_list(&key).unwrap();
    assert_eq!(engine.stack_depth(&key).unwrap(), 1);

    let before = engine.export_json(&key).unwrap();
    let err = engine.close_list(&key).unwrap_err();
    assert!(matches!(err, FolioError::ValidationError(_)));
    assert_eq!(engine.export_json(&key).unwrap(), before);
    assert_eq!(engine.stack_depth(&key).unwrap(), 1);
}

#[test]
fn test_paragraph_inside_open_list_changes_nothing() {
    let engine = engine();
    let (key, _) = engine.create_document("para").unwrap();
    engine.open_list(&key, false).unwrap();
    let count = node_count(&engine, &key);

    let err = engine.add_paragraph(&key, "not allowed").unwrap_err();
    assert!(matches!(err, FolioError::ValidationError(_)));
    assert_eq!(node_count(&engine, &key), count);
}

#[test]
fn test_delete_with_one_bad_anchor_deletes_nothing() {
    let engine = engine();
    let (key, _) = engine.create_document("delete").unwrap();
    let a = engine.add_paragraph(&key, "a").unwrap();
    let b = engine.add_paragraph(&key, "b").unwrap();

    let err = engine
        .delete_items(&key, &[a.clone(), "#/texts/404".to_string(), b.clone()])
        .unwrap_err();
    assert!(matches!(err, FolioError::BadAnchor(_)));
    assert_eq!(engine.read_text(&key, &a).unwrap(), "a");
    assert_eq!(engine.read_text(&key, &b).unwrap(), "b");

    assert_eq!(engine.delete_items(&key, &[a.clone()]).unwrap(), 1);
    assert!(matches!(
        engine.read_text(&key, &a),
        Err(FolioError::BadAnchor(_))
    ));
    let next = engine.add_paragraph(&key, "c").unwrap();
    assert_ne!(next, a, "anchors of deleted nodes are never handed out again");
}

#[test]
fn test_exports_are_idempotent() {
    let engine = engine();
    let (key, _) = engine.create_document("export").unwrap();
    engine.add_title(&key, "Title").unwrap();
    engine.add_section_heading(&key, "Intro", 1).unwrap();
    engine.open_list(&key, true).unwrap();
    engine
        .add_list_items(&key, &[ListItemSpec::new("one", "1."), ListItemSpec::new("two", "2.")])
        .unwrap();
    engine.close_list(&key).unwrap();
    engine
        .add_table(&key, "<table><tr><td>x</td></tr></table>", &["cap".to_string()], &[])
        .unwrap();

    assert_eq!(engine.export_markdown(&key).unwrap(), engine.export_markdown(&key).unwrap());

    let json = engine.export_json(&key).unwrap();
    let reloaded = folio_core::export::from_json(&json).unwrap();
    assert_eq!(folio_core::export::to_json(&reloaded).unwrap(), json);
}

#[test]
fn test_scenario_heading_list_item_overview() {
    let engine = engine();
    let (key, _) = engine.create_document("hello").unwrap();

    let heading = engine.add_section_heading(&key, "Intro", 1).unwrap();
    let top = engine
        .registry()
        .with_session(&key, |s| Ok(s.stack().top().anchor().to_string()))
        .unwrap();
    assert_eq!(top, heading);

    let group = engine.open_list(&key, false).unwrap();
    assert_eq!(engine.stack_depth(&key).unwrap(), 2);

    let items = engine
        .add_list_items(&key, &[ListItemSpec::new("item-1", "-")])
        .unwrap();
    assert_eq!(items.len(), 1);

    engine.close_list(&key).unwrap();
    assert_eq!(engine.stack_depth(&key).unwrap(), 1);

    let overview = engine.overview(&key).unwrap();
    let lines: Vec<&str> = overview.lines().collect();
    assert_eq!(lines.len(), 3, "overview was:\n{}", overview);
    assert!(lines[0].contains(&format!("[anchor:{}] section_header-1: Intro", heading)));
    assert!(lines[1].contains(&format!("[anchor:{}] list", group)));
    assert!(lines[2].contains(&format!("[anchor:{}] list_item", items[0])));
    assert!(!overview.contains("prompt"));
}

#[test]
fn test_anchors_are_scoped_to_their_document() {
    let engine = engine();
    let (first, _) = engine.create_document("first").unwrap();
    let (second, _) = engine.create_document("second").unwrap();
    let anchor = engine.add_paragraph(&first, "only here").unwrap();

    assert!(matches!(
        engine.read_text(&second, &anchor),
        Err(FolioError::BadAnchor(_))
    ));
}
