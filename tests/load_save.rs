use sanflow::Editor;
use sanflow::error::{FormatError, LoadError};
use sanflow::loader::{Loader, Payload};
use sanflow::model::{Attrs, Endpoint, Point};

fn two_node_flow() -> Editor {
    let mut ed = Editor::default();
    let a = ed
        .add_node("custom-rect", Point::new(0.0, 0.0), &Attrs::new().with("text", "text", "Start"))
        .unwrap();
    let b = ed
        .add_node("flow-decision", Point::new(200.0, 0.0), &Attrs::new())
        .unwrap();
    ed.add_edge(Endpoint::port(a, "right"), Endpoint::port(b, "left"), None)
        .unwrap();
    ed
}

#[test]
fn saved_file_loads_through_the_background_loader() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flow.json");
    let source = two_node_flow();
    source.document().write(&path).unwrap();

    let mut target = Editor::default();
    let mut loader = Loader::new();
    loader.request_local(&path);
    let done = loader.wait().unwrap();
    let Ok(Payload::Document(doc)) = done.result else {
        panic!("expected a document");
    };
    target.load_document(doc).unwrap();
    assert_eq!(target.document(), source.document());
}

#[test]
fn corrupt_file_leaves_the_session_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(
        &path,
        r#"{"version": 1, "cells": [
            {"kind": "edge", "id": 1,
             "source": {"type": "port", "node": 5, "port": "out"},
             "target": {"type": "point", "x": 0, "y": 0}}
        ]}"#,
    )
    .unwrap();

    let mut ed = two_node_flow();
    let before = ed.document();
    let mut loader = Loader::new();
    loader.request_local(&path);
    let done = loader.wait().unwrap();
    match done.result {
        Err(LoadError::Format(FormatError::MissingNode { node, .. })) => assert_eq!(node.0, 5),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(ed.document(), before);
    assert!(ed.can_undo());
    assert!(ed.undo());
}

#[test]
fn clipboard_carries_cells_into_a_loaded_document() {
    let mut ed = two_node_flow();
    let ids: Vec<_> = ed.graph().cells().iter().map(|c| c.id()).collect();
    assert_eq!(ed.copy(&ids), 3);

    let other = Editor::default().document().to_json().unwrap();
    ed.load_json(&other).unwrap();
    assert!(ed.graph().is_empty());

    let pasted = ed.paste();
    assert_eq!(pasted.len(), 3);
    assert_eq!(ed.graph().edges().count(), 1);
    assert_eq!(ed.selection().len(), 3);
}
