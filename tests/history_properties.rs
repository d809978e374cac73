use proptest::prelude::*;
use sanflow::clipboard::CrossingEdges;
use sanflow::document::Document;
use sanflow::editor::{Editor, EditorConfig};
use sanflow::model::{Attrs, CellId, Endpoint, Point};
use sanflow::selection::PropertyEdit;
use sanflow::stencil::{MarkerNode, TemplateKind};

#[derive(Clone, Debug)]
enum Op {
    Drop { kind: usize, x: f32, y: f32 },
    Connect { a: usize, pa: usize, b: usize, pb: usize },
    Move { node: usize, dx: f32, dy: f32 },
    Resize { node: usize, w: f32, h: f32 },
    Label { node: usize, text: String },
    Delete { node: usize },
    ClearConnections { node: usize },
    CopyPaste { node: usize, with_next: bool },
    Cut { picks: Vec<usize> },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0_usize..9, -400.0_f32..400.0, -400.0_f32..400.0)
            .prop_map(|(kind, x, y)| Op::Drop { kind, x, y }),
        3 => (0_usize..16, 0_usize..4, 0_usize..16, 0_usize..4)
            .prop_map(|(a, pa, b, pb)| Op::Connect { a, pa, b, pb }),
        2 => (0_usize..16, -50.0_f32..50.0, -50.0_f32..50.0)
            .prop_map(|(node, dx, dy)| Op::Move { node, dx, dy }),
        1 => (0_usize..16, 20.0_f32..300.0, 20.0_f32..300.0)
            .prop_map(|(node, w, h)| Op::Resize { node, w, h }),
        1 => (0_usize..16, "[a-z]{0,8}").prop_map(|(node, text)| Op::Label { node, text }),
        1 => (0_usize..16).prop_map(|node| Op::Delete { node }),
        1 => (0_usize..16).prop_map(|node| Op::ClearConnections { node }),
        1 => (0_usize..16, any::<bool>()).prop_map(|(node, with_next)| Op::CopyPaste { node, with_next }),
        1 => prop::collection::vec(0_usize..32, 1..4).prop_map(|picks| Op::Cut { picks }),
    ]
}

fn node_ids(ed: &Editor) -> Vec<CellId> {
    ed.graph().nodes().map(|n| n.id).collect()
}

fn pick(ids: &[CellId], i: usize) -> Option<CellId> {
    (!ids.is_empty()).then(|| ids[i % ids.len()])
}

fn run(ed: &mut Editor, op: &Op) {
    let ids = node_ids(ed);
    match op {
        Op::Drop { kind, x, y } => {
            let marker = MarkerNode::tagged(TemplateKind::ALL[*kind]);
            ed.drop_marker(&marker, Point::new(*x, *y)).unwrap();
        }
        Op::Connect { a, pa, b, pb } => {
            let (Some(a), Some(b)) = (pick(&ids, *a), pick(&ids, *b)) else {
                return;
            };
            let port = |id: CellId, i: usize| {
                let ports = &ed.graph().node(id).unwrap().ports;
                ports[i % ports.len()].id.clone()
            };
            let source = Endpoint::port(a, port(a, *pa));
            let target = Endpoint::port(b, port(b, *pb));
            ed.add_edge(source, target, None).unwrap();
        }
        Op::Move { node, dx, dy } => {
            if let Some(id) = pick(&ids, *node) {
                ed.move_nodes(&[id], Point::new(*dx, *dy)).unwrap();
            }
        }
        Op::Resize { node, w, h } => {
            if let Some(id) = pick(&ids, *node) {
                ed.resize(id, *w, *h).unwrap();
            }
        }
        Op::Label { node, text } => {
            if let Some(id) = pick(&ids, *node) {
                ed.select(&[id]);
                ed.apply_property(PropertyEdit::Label(text.clone())).unwrap();
            }
        }
        Op::Delete { node } => {
            if let Some(id) = pick(&ids, *node) {
                ed.remove_cells(&[id]).unwrap();
            }
        }
        Op::ClearConnections { node } => {
            if let Some(id) = pick(&ids, *node) {
                ed.clear_connections(id).unwrap();
            }
        }
        Op::CopyPaste { node, with_next } => {
            if let Some(id) = pick(&ids, *node) {
                let mut chosen = vec![id];
                if *with_next {
                    chosen.extend(pick(&ids, node + 1));
                }
                ed.copy(&chosen);
                ed.paste();
            }
        }
        Op::Cut { picks } => {
            // any mix of nodes and edges
            let cells: Vec<CellId> = ed.graph().cells().iter().map(|c| c.id()).collect();
            let mut chosen: Vec<CellId> = picks.iter().filter_map(|i| pick(&cells, *i)).collect();
            chosen.dedup();
            ed.cut(&chosen).unwrap();
            for id in &chosen {
                assert!(!ed.graph().contains(*id), "cut left {id} behind");
            }
        }
    }
}

fn assert_consistent(ed: &Editor) {
    let doc = ed.document();
    assert_eq!(doc.validate(), Ok(()));
    for id in ed.selection().ids() {
        assert!(ed.graph().contains(*id), "selection holds deleted {id}");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn undo_all_then_redo_all_is_identity(
        ops in prop::collection::vec(op_strategy(), 1..40),
        reattach in any::<bool>(),
    ) {
        let mut ed = Editor::new(EditorConfig {
            crossing_edges: if reattach { CrossingEdges::Reattach } else { CrossingEdges::Skip },
            ..EditorConfig::default()
        });
        let empty = ed.document();
        for op in &ops {
            run(&mut ed, op);
            assert_consistent(&ed);
        }
        let done = ed.document();

        while ed.undo() {
            assert_consistent(&ed);
        }
        prop_assert_eq!(ed.document(), empty);

        while ed.redo() {
            assert_consistent(&ed);
        }
        prop_assert_eq!(ed.document(), done);
    }

    #[test]
    fn each_step_undoes_to_the_previous_snapshot(
        ops in prop::collection::vec(op_strategy(), 1..25),
    ) {
        let mut ed = Editor::default();
        let mut snapshots: Vec<Document> = vec![ed.document()];
        for op in &ops {
            run(&mut ed, op);
            let now = ed.document();
            if snapshots.last() != Some(&now) {
                snapshots.push(now);
            }
        }
        snapshots.pop();
        while let Some(expected) = snapshots.pop() {
            prop_assert!(ed.undo());
            prop_assert_eq!(ed.document(), expected);
        }
    }

    #[test]
    fn saved_document_reloads_identically(
        ops in prop::collection::vec(op_strategy(), 1..30),
    ) {
        let mut ed = Editor::default();
        for op in &ops {
            run(&mut ed, op);
        }
        let json = ed.document().to_json().unwrap();
        let parsed = Document::parse(&json).unwrap();
        prop_assert_eq!(&parsed, &ed.document());

        let mut fresh = Editor::default();
        fresh.load_document(parsed).unwrap();
        prop_assert_eq!(fresh.document(), ed.document());
        prop_assert!(!fresh.can_undo());

        // ids keep counting past the loaded cells
        let max = fresh.graph().cells().iter().map(|c| c.id().0).max().unwrap_or(0);
        let id = fresh
            .add_node("custom-rect", Point::new(0.0, 0.0), &Attrs::new())
            .unwrap();
        prop_assert!(id.0 > max);
    }
}
