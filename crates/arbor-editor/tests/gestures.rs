//! Integration tests: pointer and keyboard input driving a tree session.

use arbor_core::{
    AssemblyList, Definition, DragPayload, DropConfig, DropCoordinator, MemoryLoader, NodeIndex,
    NodeKind, TreeConfig,
};
use arbor_editor::{DragState, GestureConfig, InputEvent, Modifiers, TreeSession};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

const WIDGETS: &str = include_str!("../../arbor-core/tests/fixtures/widgets.outline");

// ─── Helpers ─────────────────────────────────────────────────────────────

fn loader() -> MemoryLoader {
    MemoryLoader::new()
        .with_file("A.dll", "module A\nnamespace Alpha\ntype public First\n")
        .with_file("B.dll", "module B\n")
        .with_file("Widgets.dll", WIDGETS)
}

fn session_with(files: &[&str], config: TreeConfig) -> (Arc<AssemblyList>, TreeSession) {
    let _ = env_logger::builder().is_test(true).try_init();
    let loader = loader();
    let list = Arc::new(AssemblyList::new("default"));
    for file in files {
        list.open(file, &loader).unwrap();
    }
    let session = TreeSession::new(list.clone(), config, GestureConfig::default());
    (list, session)
}

fn session(files: &[&str]) -> (Arc<AssemblyList>, TreeSession) {
    session_with(files, TreeConfig::default())
}

fn child(session: &TreeSession, parent: NodeIndex, at: usize) -> NodeIndex {
    session.tree().nodes().children(parent)[at]
}

fn assembly(session: &TreeSession, at: usize) -> NodeIndex {
    child(session, session.tree().root(), at)
}

fn click(session: &mut TreeSession, node: NodeIndex, time_ms: u64) {
    session.handle_input(&InputEvent::press(10.0, 10.0, time_ms), Some(node));
    session.handle_input(&InputEvent::release(10.0, 10.0), Some(node));
}

fn modified_click(session: &mut TreeSession, node: NodeIndex, modifiers: Modifiers, time_ms: u64) {
    session.handle_input(&InputEvent::press_with(10.0, 10.0, modifiers, time_ms), Some(node));
    session.handle_input(&InputEvent::release(10.0, 10.0), Some(node));
}

fn drag_from(session: &mut TreeSession, node: NodeIndex, time_ms: u64) -> Option<DragPayload> {
    session.handle_input(&InputEvent::press(0.0, 0.0, time_ms), Some(node));
    session.handle_input(&InputEvent::moved(0.0, 30.0), Some(node));
    let payload = session.take_outgoing_drag();
    session.handle_input(&InputEvent::release(0.0, 30.0), None);
    payload
}

fn names(list: &AssemblyList) -> Vec<String> {
    list.snapshot()
        .iter()
        .map(|a| a.short_name().to_string())
        .collect()
}

// ─── Double click ────────────────────────────────────────────────────────

#[test]
fn double_click_with_small_move_is_not_a_drag() {
    let (_, session) = session(&["A.dll", "B.dll"]);
    let activated = Rc::new(RefCell::new(Vec::new()));
    let log = activated.clone();
    let mut session = session.with_activator(move |_: &arbor_core::AssemblyTree, node: NodeIndex| {
        log.borrow_mut().push(node);
        true
    });
    let a = assembly(&session, 0);

    click(&mut session, a, 1000);
    session.handle_input(&InputEvent::press(10.0, 10.0, 1150), Some(a));
    session.handle_input(&InputEvent::moved(12.0, 11.0), Some(a));
    assert_eq!(session.drag_state(), DragState::PressedUnconfirmed);
    session.handle_input(&InputEvent::release(12.0, 11.0), Some(a));

    assert_eq!(*activated.borrow(), vec![a]);
    assert_eq!(session.drag_state(), DragState::Idle);
    assert_eq!(session.take_outgoing_drag(), None);
    assert!(!session.tree().nodes()[a].flags.expanded);
}

#[test]
fn unhandled_double_click_expands_the_node() {
    let (_, mut session) = session(&["A.dll"]);
    let a = assembly(&session, 0);

    click(&mut session, a, 0);
    click(&mut session, a, 200);

    let node = &session.tree().nodes()[a];
    assert!(node.flags.expanded);
    assert!(node.is_materialized());
    let namespace = child(&session, a, 0);
    assert_eq!(session.tree().nodes()[namespace].text, "Alpha");

    click(&mut session, a, 1000);
    click(&mut session, a, 1200);
    assert!(!session.tree().nodes()[a].flags.expanded);
}

#[test]
fn root_toggles_only_when_its_expander_is_shown() {
    let (_, mut session) = session(&["A.dll"]);
    let root = session.tree().root();
    click(&mut session, root, 0);
    click(&mut session, root, 100);
    assert!(session.tree().nodes()[root].flags.expanded);

    let mut config = TreeConfig::default();
    config.show_root_expander = true;
    let (_, mut session) = session_with(&["A.dll"], config);
    let root = session.tree().root();
    click(&mut session, root, 0);
    click(&mut session, root, 100);
    assert!(!session.tree().nodes()[root].flags.expanded);
}

// ─── Dragging ────────────────────────────────────────────────────────────

#[test]
fn drag_past_threshold_hands_out_the_selection() {
    let (_, mut session) = session(&["A.dll", "B.dll"]);
    let b = assembly(&session, 1);

    session.handle_input(&InputEvent::press(10.0, 10.0, 0), Some(b));
    assert_eq!(session.selection(), [b]);
    session.handle_input(&InputEvent::moved(10.0, 30.0), Some(b));
    assert_eq!(session.drag_state(), DragState::Dragging);

    let payload = session.take_outgoing_drag().unwrap();
    assert_eq!(payload, DragPayload::Nodes(vec!["B.dll".to_string()]));
    assert_eq!(session.take_outgoing_drag(), None);

    session.handle_input(&InputEvent::release(10.0, 30.0), None);
    assert_eq!(session.drag_state(), DragState::Idle);
}

#[test]
fn non_assembly_nodes_do_not_drag() {
    let (_, mut session) = session(&["A.dll"]);
    let a = assembly(&session, 0);
    session.perform(arbor_editor::TreeAction::Expand, Some(a));
    let namespace = child(&session, a, 0);

    session.handle_input(&InputEvent::press(0.0, 0.0, 0), Some(namespace));
    session.handle_input(&InputEvent::moved(40.0, 0.0), Some(namespace));
    assert_eq!(session.drag_state(), DragState::PressedUnconfirmed);
    assert_eq!(session.take_outgoing_drag(), None);
}

#[test]
fn dropped_back_payload_reorders_the_list() {
    let (list, mut session) = session(&["A.dll", "B.dll"]);
    let b = assembly(&session, 1);
    session.handle_input(&InputEvent::press(0.0, 0.0, 0), Some(b));
    session.handle_input(&InputEvent::moved(0.0, 20.0), Some(b));
    let payload = session.take_outgoing_drag().unwrap();
    session.handle_input(&InputEvent::release(0.0, 20.0), None);

    let coordinator = DropCoordinator::new(list.clone(), Arc::new(loader()), DropConfig::default());
    assert!(session.can_drop(&coordinator, &payload).0);
    let placed = session.drop_at(&coordinator, &payload, 0);

    assert_eq!(placed.len(), 1);
    assert_eq!(names(&list), ["B", "A"]);
    assert_eq!(session.tree().assemblies(), list.snapshot());
    assert!(session.selection().is_empty());
}

// ─── Multi-selection ─────────────────────────────────────────────────────

#[test]
fn ctrl_click_extends_the_dragged_selection() {
    let (_, mut session) = session(&["A.dll", "B.dll"]);
    let a = assembly(&session, 0);
    let b = assembly(&session, 1);

    click(&mut session, a, 0);
    modified_click(&mut session, b, Modifiers::CTRL, 1000);
    assert_eq!(session.selection(), [a, b]);

    let payload = drag_from(&mut session, a, 2000);
    assert_eq!(
        payload,
        Some(DragPayload::Nodes(vec!["A.dll".to_string(), "B.dll".to_string()]))
    );
    assert_eq!(session.selection(), [a, b]);
}

#[test]
fn selected_descendants_ride_along_with_their_assembly() {
    let (_, mut session) = session(&["A.dll", "B.dll"]);
    let a = assembly(&session, 0);
    session.perform(arbor_editor::TreeAction::Expand, Some(a));
    let namespace = child(&session, a, 0);

    click(&mut session, a, 0);
    modified_click(&mut session, namespace, Modifiers::CTRL, 1000);
    assert_eq!(session.selection(), [a, namespace]);

    let payload = drag_from(&mut session, a, 2000);
    assert_eq!(payload, Some(DragPayload::Nodes(vec!["A.dll".to_string()])));
}

#[test]
fn ctrl_click_on_a_selected_node_deselects_it() {
    let (_, mut session) = session(&["A.dll", "B.dll"]);
    let a = assembly(&session, 0);
    let b = assembly(&session, 1);

    click(&mut session, a, 0);
    modified_click(&mut session, b, Modifiers::CTRL, 1000);
    modified_click(&mut session, a, Modifiers::CTRL, 2000);
    assert_eq!(session.selection(), [b]);
    assert!(!session.tree().nodes()[a].flags.selected);
}

#[test]
fn plain_click_inside_a_selection_collapses_it() {
    let (_, mut session) = session(&["A.dll", "B.dll"]);
    let a = assembly(&session, 0);
    let b = assembly(&session, 1);

    click(&mut session, a, 0);
    modified_click(&mut session, b, Modifiers::CTRL, 1000);
    click(&mut session, a, 2000);
    assert_eq!(session.selection(), [a]);
    assert!(!session.tree().nodes()[b].flags.selected);
}

#[test]
fn shift_click_selects_the_visible_range() {
    let (_, mut session) = session(&["A.dll", "B.dll", "Widgets.dll"]);
    let a = assembly(&session, 0);
    let b = assembly(&session, 1);
    let widgets = assembly(&session, 2);

    click(&mut session, widgets, 0);
    modified_click(&mut session, a, Modifiers::SHIFT, 1000);
    assert_eq!(session.selection(), [a, b, widgets]);
}

// ─── Tree changes ────────────────────────────────────────────────────────

#[test]
fn click_before_a_reload_does_not_pair_with_one_after() {
    let (list, session) = session(&["A.dll"]);
    let activated = Rc::new(RefCell::new(Vec::new()));
    let log = activated.clone();
    let mut session = session.with_activator(move |_: &arbor_core::AssemblyTree, node: NodeIndex| {
        log.borrow_mut().push(node);
        true
    });
    let a = assembly(&session, 0);

    click(&mut session, a, 1000);
    session.handle_input(&InputEvent::key("Delete"), Some(a));
    list.open("Widgets.dll", &loader()).unwrap();
    session.sync();
    let widgets = assembly(&session, 0);
    click(&mut session, widgets, 1100);

    assert!(activated.borrow().is_empty());
    assert_eq!(session.selection(), [widgets]);
}

// ─── Keyboard ────────────────────────────────────────────────────────────

#[test]
fn escape_cancels_editing_and_f2_does_nothing() {
    let (_, mut session) = session(&["A.dll"]);
    let a = assembly(&session, 0);

    session.handle_input(&InputEvent::key("F2"), Some(a));
    assert!(!session.tree().nodes()[a].flags.editing);

    session.begin_edit(a);
    session.handle_input(&InputEvent::key("F2"), Some(a));
    assert!(session.tree().nodes()[a].flags.editing);
    session.handle_input(&InputEvent::key("Escape"), Some(a));
    assert!(!session.tree().nodes()[a].flags.editing);
}

#[test]
fn delete_unloads_the_selected_assembly() {
    let (list, mut session) = session(&["A.dll", "B.dll"]);
    let b = assembly(&session, 1);
    click(&mut session, b, 0);

    session.handle_input(&InputEvent::key("Delete"), Some(b));
    assert_eq!(names(&list), ["A"]);
    assert_eq!(session.tree().assemblies(), list.snapshot());
    assert!(session.selection().is_empty());
}

#[test]
fn arrows_expand_and_collapse() {
    let (_, mut session) = session(&["A.dll"]);
    let a = assembly(&session, 0);
    session.handle_input(&InputEvent::key("ArrowRight"), Some(a));
    assert!(session.tree().nodes()[a].flags.expanded);
    session.handle_input(&InputEvent::key("ArrowLeft"), Some(a));
    assert!(!session.tree().nodes()[a].flags.expanded);
}

// ─── Navigation ──────────────────────────────────────────────────────────

#[test]
fn reveal_expands_the_path_and_selects() {
    let (list, mut session) = session(&["A.dll", "Widgets.dll"]);
    let widgets = list.snapshot()[1].clone();
    let style = widgets
        .module()
        .unwrap()
        .find_type("Widgets", "Button")
        .unwrap()
        .nested_types()
        .next()
        .unwrap();

    let node = session.reveal(&Definition::Type(style.clone())).unwrap();
    assert_eq!(session.tree().nodes()[node].kind, NodeKind::Type(style));
    assert_eq!(session.selection(), [node]);
    assert!(session.tree().nodes()[node].flags.selected);

    let mut cursor = session.tree().nodes().parent(node);
    while let Some(ancestor) = cursor {
        assert!(session.tree().nodes()[ancestor].flags.expanded);
        cursor = session.tree().nodes().parent(ancestor);
    }
    assert!(!session.tree().nodes()[assembly(&session, 0)].flags.expanded);
}
