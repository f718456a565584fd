//! Integration tests: the root's children track the assembly list.

use arbor_core::sync::{self, CollectionChange, SyncError};
use arbor_core::{Assembly, AssemblyList, AssemblyTree, LoadedAssembly, ThreadToken, TreeConfig};
use pretty_assertions::assert_eq;
use std::sync::Arc;

// ─── Helpers ─────────────────────────────────────────────────────────────

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn asm(file: &str) -> Assembly {
    Assembly::new(LoadedAssembly::failed(file, "not an image"))
}

fn texts(tree: &AssemblyTree) -> Vec<String> {
    tree.nodes()
        .children(tree.root())
        .iter()
        .map(|&c| tree.nodes()[c].text.clone())
        .collect()
}

/// Children wrap exactly the list's assemblies, by identity, in order.
fn assert_mirrors(tree: &AssemblyTree, list: &AssemblyList) {
    assert_eq!(tree.assemblies(), list.snapshot());
}

// ─── Order isomorphism ───────────────────────────────────────────────────

#[test]
fn mixed_mutations_keep_order() {
    init_logging();
    let token = ThreadToken::current();
    let list = Arc::new(AssemblyList::new("default"));
    let mut tree = AssemblyTree::new(list.clone(), TreeConfig::default(), &token);

    let items: Vec<Assembly> = ["a.dll", "b.dll", "c.dll", "d.dll", "e.dll"]
        .into_iter()
        .map(asm)
        .collect();
    for item in &items {
        list.push(item.clone());
    }
    list.insert(2, asm("x.dll"));
    list.remove(&items[0]);
    list.insert(100, asm("tail.dll"));
    list.remove(&items[4]);

    tree.pump(&token);
    assert_mirrors(&tree, &list);
    assert_eq!(texts(&tree), ["b", "x", "c", "d", "tail"]);
}

#[test]
fn pumping_in_between_gives_the_same_result() {
    let token = ThreadToken::current();
    let list = Arc::new(AssemblyList::new("default"));
    let mut tree = AssemblyTree::new(list.clone(), TreeConfig::default(), &token);

    let (a, b, c) = (asm("a.dll"), asm("b.dll"), asm("c.dll"));
    list.push(a.clone());
    tree.pump(&token);
    list.push(b.clone());
    list.insert(0, c.clone());
    tree.pump(&token);
    list.remove(&a);
    tree.pump(&token);

    assert_mirrors(&tree, &list);
    assert_eq!(tree.assemblies(), vec![c, b]);
}

#[test]
fn reset_rebuilds_from_snapshot() {
    let token = ThreadToken::current();
    let list = Arc::new(AssemblyList::new("default"));
    let mut tree = AssemblyTree::new(list.clone(), TreeConfig::default(), &token);

    for file in ["zeta.dll", "alpha.dll", "mid.dll"] {
        list.push(asm(file));
    }
    list.sort_by_name();
    list.push(asm("omega.dll"));
    tree.pump(&token);
    assert_eq!(texts(&tree), ["alpha", "mid", "zeta", "omega"]);

    list.clear();
    tree.pump(&token);
    assert!(tree.nodes().children(tree.root()).is_empty());
    assert_eq!(tree.nodes().len(), 1);
}

#[test]
fn removal_drops_materialized_subtrees() {
    let token = ThreadToken::current();
    let list = Arc::new(AssemblyList::new("default"));
    let loader = arbor_core::MemoryLoader::new()
        .with_file("Widgets.dll", include_str!("fixtures/widgets.outline"));
    let widgets = list.open("Widgets.dll", &loader).unwrap();
    let mut tree = AssemblyTree::new(list.clone(), TreeConfig::default(), &token);

    let node = tree.find_assembly_node(&widgets, &token).unwrap();
    tree.set_expanded(node, true, &token);
    assert!(tree.nodes().len() > 2);

    list.remove(&widgets);
    tree.pump(&token);
    assert_eq!(tree.nodes().len(), 1);
    assert!(!tree.nodes().contains(node));
}

#[test]
fn trees_sharing_a_list_each_see_every_change() {
    let token = ThreadToken::current();
    let list = Arc::new(AssemblyList::new("default"));
    let mut first = AssemblyTree::new(list.clone(), TreeConfig::default(), &token);

    let x = asm("x.dll");
    list.push(x.clone());
    let mut second = AssemblyTree::new(list.clone(), TreeConfig::default(), &token);
    assert_eq!(list.subscriber_count(), 2);

    assert_eq!(first.pump(&token), 1);
    assert_mirrors(&first, &list);
    assert_mirrors(&second, &list);

    list.push(asm("y.dll"));
    list.remove(&x);
    assert_eq!(second.pump(&token), 2);
    assert_eq!(first.pump(&token), 2);
    assert_mirrors(&first, &list);
    assert_mirrors(&second, &list);
    assert_eq!(texts(&first), ["y"]);
}

#[test]
fn dropping_a_tree_unsubscribes_it() {
    let token = ThreadToken::current();
    let list = Arc::new(AssemblyList::new("default"));
    let tree = AssemblyTree::new(list.clone(), TreeConfig::default(), &token);
    assert_eq!(list.subscriber_count(), 1);
    drop(tree);
    assert_eq!(list.subscriber_count(), 0);

    list.push(asm("late.dll"));
    let mut tree = AssemblyTree::new(list.clone(), TreeConfig::default(), &token);
    assert_eq!(tree.pump(&token), 0);
    assert_eq!(texts(&tree), ["late"]);
}

// ─── Unsupported changes ─────────────────────────────────────────────────

#[test]
fn unsupported_changes_leave_children_untouched() {
    let token = ThreadToken::current();
    let list = Arc::new(AssemblyList::new("default"));
    list.push(asm("a.dll"));
    list.push(asm("b.dll"));
    let mut tree = AssemblyTree::new(list.clone(), TreeConfig::default(), &token);
    let before = tree.nodes().children(tree.root()).to_vec();

    list.replace(0, asm("a2.dll"));
    let err = tree.try_pump(&token).unwrap_err();
    assert_eq!(err, SyncError::Unsupported("replace"));
    assert_eq!(tree.nodes().children(tree.root()), before.as_slice());
    assert_eq!(texts(&tree), ["a", "b"]);
}

#[test]
fn move_is_rejected_by_the_synchronizer() {
    let token = ThreadToken::current();
    let list = Arc::new(AssemblyList::new("default"));
    list.push(asm("a.dll"));
    list.push(asm("b.dll"));
    let tree = AssemblyTree::new(list, TreeConfig::default(), &token);

    let mut nodes = tree.nodes().clone();
    let root = nodes.root();
    let before = nodes.children(root).to_vec();
    let change: CollectionChange<Assembly> = CollectionChange::Move {
        from: 0,
        to: 1,
        count: 1,
    };
    let err = sync::apply(&mut nodes, root, &change, |a| {
        arbor_core::TreeNode::new(arbor_core::NodeKind::Assembly(a.clone()), "")
    })
    .unwrap_err();
    assert_eq!(err, SyncError::Unsupported("move"));
    assert_eq!(nodes.children(root), before.as_slice());
}

#[test]
#[should_panic(expected = "out of sync")]
fn pump_treats_unsupported_changes_as_fatal() {
    let token = ThreadToken::current();
    let list = Arc::new(AssemblyList::new("default"));
    list.push(asm("a.dll"));
    let mut tree = AssemblyTree::new(list.clone(), TreeConfig::default(), &token);
    list.replace(0, asm("b.dll"));
    tree.pump(&token);
}

// ─── Thread affinity ─────────────────────────────────────────────────────

#[test]
fn list_mutations_from_other_threads_are_pumped_on_the_owner() {
    let token = ThreadToken::current();
    let list = Arc::new(AssemblyList::new("default"));
    let mut tree = AssemblyTree::new(list.clone(), TreeConfig::default(), &token);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let list = list.clone();
            std::thread::spawn(move || list.push(asm(&format!("t{i}.dll"))))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(tree.pump(&token), 4);
    assert_mirrors(&tree, &list);
}

#[test]
fn tree_moved_off_its_owner_thread_refuses_work() {
    let token = ThreadToken::current();
    let list = Arc::new(AssemblyList::new("default"));
    let mut tree = AssemblyTree::new(list, TreeConfig::default(), &token);

    let outcome = std::thread::spawn(move || {
        let foreign = ThreadToken::current();
        tree.pump(&foreign);
    })
    .join();
    assert!(outcome.is_err());
}
