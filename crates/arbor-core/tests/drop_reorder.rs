//! Integration tests: dropping payloads onto the assembly list.

use arbor_core::{
    Assembly, AssemblyList, AssemblyTree, DragPayload, DropConfig, DropCoordinator, DropEffect,
    MemoryLoader, ThreadToken, TreeConfig,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const WIDGETS: &str = include_str!("fixtures/widgets.outline");
const COLLECTIONS: &str = include_str!("fixtures/collections.outline");

// ─── Helpers ─────────────────────────────────────────────────────────────

fn loader() -> MemoryLoader {
    let mut loader = MemoryLoader::new();
    for name in ["A", "B", "C", "D", "X", "Y"] {
        loader = loader.with_file(&format!("{name}.dll"), &format!("module {name}\n"));
    }
    loader.with_package(
        "Pkg.1.0.nupkg",
        &[
            ("lib/net8.0/Widgets.dll", WIDGETS),
            ("lib/net8.0/Widgets.xml", "module Docs\n"),
            ("tools/Collections.exe", COLLECTIONS),
        ],
    )
}

fn setup(files: &[&str]) -> (Arc<AssemblyList>, DropCoordinator) {
    let _ = env_logger::builder().is_test(true).try_init();
    let loader = Arc::new(loader());
    let list = Arc::new(AssemblyList::new("default"));
    for file in files {
        list.open(file, loader.as_ref()).unwrap();
    }
    let coordinator = DropCoordinator::new(list.clone(), loader, DropConfig::default());
    (list, coordinator)
}

fn names(list: &AssemblyList) -> Vec<String> {
    list.snapshot()
        .iter()
        .map(|a| a.short_name().to_string())
        .collect()
}

fn files(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

// ─── Reordering ──────────────────────────────────────────────────────────

#[test]
fn moving_a_listed_assembly_keeps_the_drop_point() {
    let (list, coordinator) = setup(&["A.dll", "B.dll", "C.dll", "D.dll"]);
    let payload = DragPayload::Nodes(files(&["B.dll"]));

    let placed = coordinator.perform(&payload, 4);
    assert_eq!(names(&list), ["A", "C", "D", "B"]);
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].file_name(), "B.dll");
}

#[test]
fn index_is_adjusted_for_items_removed_before_it() {
    let (list, coordinator) = setup(&["A.dll", "B.dll", "C.dll", "D.dll"]);
    // Dropped between C and D: B leaves from before the target.
    coordinator.perform(&DragPayload::Nodes(files(&["B.dll"])), 3);
    assert_eq!(names(&list), ["A", "C", "B", "D"]);
}

#[test]
fn moving_towards_the_front() {
    let (list, coordinator) = setup(&["A.dll", "B.dll", "C.dll", "D.dll"]);
    coordinator.perform(&DragPayload::Nodes(files(&["C.dll", "D.dll"])), 0);
    assert_eq!(names(&list), ["C", "D", "A", "B"]);
}

#[test]
fn new_files_land_in_payload_order() {
    let (list, coordinator) = setup(&["A.dll", "B.dll"]);
    let placed = coordinator.perform(&DragPayload::FileNames(files(&["X.dll", "Y.dll"])), 1);
    assert_eq!(names(&list), ["A", "X", "Y", "B"]);
    let placed: Vec<&str> = placed.iter().map(|a| a.file_name()).collect();
    assert_eq!(placed, ["X.dll", "Y.dll"]);
}

#[test]
fn target_past_the_end_appends() {
    let (list, coordinator) = setup(&["A.dll", "B.dll"]);
    coordinator.perform(&DragPayload::FileNames(files(&["X.dll"])), 99);
    assert_eq!(names(&list), ["A", "B", "X"]);
}

// ─── Resolution ──────────────────────────────────────────────────────────

#[test]
fn failed_and_empty_paths_are_skipped() {
    let (list, coordinator) = setup(&["A.dll"]);
    let payload = DragPayload::FileNames(files(&["missing.dll", "", "X.dll", "broken.nupkg"]));

    let placed = coordinator.perform(&payload, 0);
    assert_eq!(placed.len(), 1);
    assert_eq!(names(&list), ["X", "A"]);
}

#[test]
fn duplicates_are_placed_once() {
    let (list, coordinator) = setup(&["A.dll", "B.dll"]);
    let payload = DragPayload::FileNames(files(&["X.dll", "A.dll", "X.dll"]));

    let placed = coordinator.perform(&payload, 2);
    assert_eq!(placed.len(), 2);
    assert_eq!(names(&list), ["B", "X", "A"]);
}

#[test]
fn packages_open_their_default_entries() {
    let (list, coordinator) = setup(&["A.dll"]);
    coordinator.perform(&DragPayload::FileNames(files(&["Pkg.1.0.nupkg"])), 0);

    let listed: Vec<String> = list.snapshot().iter().map(|a| a.file_name().to_string()).collect();
    assert_eq!(
        listed,
        [
            "nupkg://Pkg.1.0.nupkg;lib/net8.0/Widgets.dll",
            "nupkg://Pkg.1.0.nupkg;tools/Collections.exe",
            "A.dll",
        ]
    );
    assert!(list.snapshot().iter().all(|a| a.is_loaded()));
}

#[test]
fn custom_selector_chooses_package_entries() {
    let (list, coordinator) = setup(&[]);
    let coordinator = coordinator.with_selector(|_: &str, entries: &[String]| {
        entries
            .iter()
            .filter(|e| e.ends_with(".xml"))
            .cloned()
            .collect::<Vec<_>>()
    });
    coordinator.perform(&DragPayload::FileNames(files(&["Pkg.1.0.nupkg"])), 0);
    assert_eq!(names(&list), ["Widgets.xml"]);
}

#[test]
fn package_entries_dragged_back_are_reordered_not_reopened() {
    let (list, coordinator) = setup(&["A.dll", "B.dll"]);
    let opened = coordinator.perform(&DragPayload::FileNames(files(&["Pkg.1.0.nupkg"])), 2);
    let widgets: Vec<Assembly> = opened.into_iter().take(1).collect();

    let paths = files(&[widgets[0].file_name()]);
    let moved = coordinator.perform(&DragPayload::Nodes(paths), 0);
    assert_eq!(moved, widgets);
    assert_eq!(names(&list), ["Widgets", "A", "B", "Collections"]);
}

#[test]
fn foreign_payloads_are_refused() {
    let (list, coordinator) = setup(&["A.dll"]);
    let payload = DragPayload::Other("text/uri-list".to_string());
    assert_eq!(coordinator.can_accept(&payload), (false, DropEffect::None));
    assert!(coordinator.perform(&payload, 0).is_empty());
    assert_eq!(names(&list), ["A"]);
}

// ─── Tree integration ────────────────────────────────────────────────────

#[test]
fn tree_follows_a_drop() {
    let token = ThreadToken::current();
    let (list, coordinator) = setup(&["A.dll", "B.dll", "C.dll", "D.dll"]);
    let mut tree = AssemblyTree::new(list.clone(), TreeConfig::default(), &token);

    let payload = DragPayload::Nodes(files(&["B.dll"]));
    assert_eq!(tree.can_drop(&coordinator, &payload), (true, DropEffect::Move));
    tree.drop_payload(&coordinator, &payload, 4, &token);

    assert_eq!(tree.assemblies(), list.snapshot());
    let texts: Vec<String> = tree
        .nodes()
        .children(tree.root())
        .iter()
        .map(|&c| tree.nodes()[c].text.clone())
        .collect();
    assert_eq!(texts, ["A", "C", "D", "B"]);
}

#[test]
fn concurrent_drops_are_serialized() {
    let token = ThreadToken::current();
    let (list, coordinator) = setup(&["A.dll", "B.dll"]);
    let mut tree = AssemblyTree::new(list.clone(), TreeConfig::default(), &token);
    let coordinator = Arc::new(coordinator);

    let handles: Vec<_> = [["X.dll", "Y.dll"], ["C.dll", "D.dll"]]
        .into_iter()
        .map(|pair| {
            let coordinator = coordinator.clone();
            std::thread::spawn(move || {
                coordinator.perform(&DragPayload::FileNames(files(&pair)), 1)
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().len(), 2);
    }

    tree.pump(&token);
    assert_eq!(tree.assemblies(), list.snapshot());

    // Each drop placed its pair contiguously, in payload order.
    let order = names(&list);
    assert_eq!(order.len(), 6);
    for pair in [["X", "Y"], ["C", "D"]] {
        let at = order.iter().position(|n| n == pair[0]).unwrap();
        assert_eq!(order[at + 1], pair[1]);
    }
    assert_eq!(order[0], "A");
    assert_eq!(order[5], "B");
}
