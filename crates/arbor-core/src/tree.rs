//! Tree node data model.
//!
//! Nodes live in a `StableDiGraph` arena: edges go parent → child and give
//! every node a non-owning way back to its parent. The display order of a
//! node's children is kept explicitly on the node, since graph adjacency
//! order is not something the arena guarantees across removals.

use crate::assembly::Assembly;
use crate::metadata::{EventRef, FieldRef, MethodRef, Module, PropertyRef, ResourceRef, TypeRef};
use crate::name::Name;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use std::ops::Index;

// ─── Node kinds ──────────────────────────────────────────────────────────

/// What a tree node wraps. Decided once, when the node is created.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// The invisible root, mirroring the assembly list.
    AssemblyList,
    Assembly(Assembly),
    /// "Resources" group under an assembly.
    ResourceList(Module),
    Resource(ResourceRef),
    /// A named entry inside a resource bundle.
    ResourceEntry(Name),
    Namespace(Name),
    Type(TypeRef),
    Field(FieldRef),
    Property(PropertyRef),
    Event(EventRef),
    Method(MethodRef),
}

impl NodeKind {
    pub fn is_assembly(&self) -> bool {
        matches!(self, NodeKind::Assembly(_))
    }

    /// Nodes whose children are populated by the lazy resolver.
    pub fn has_lazy_children(&self) -> bool {
        match self {
            NodeKind::Assembly(asm) => asm.is_loaded(),
            NodeKind::ResourceList(_) | NodeKind::Type(_) => true,
            NodeKind::Property(p) => !p.accessors().is_empty(),
            NodeKind::Event(e) => !e.accessors().is_empty(),
            NodeKind::Resource(r) => !r.data().entries.is_empty(),
            NodeKind::AssemblyList
            | NodeKind::ResourceEntry(_)
            | NodeKind::Namespace(_)
            | NodeKind::Field(_)
            | NodeKind::Method(_) => false,
        }
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeFlags {
    pub expanded: bool,
    pub editing: bool,
    pub selected: bool,
    /// Filtered out of the visible tree by the current filter settings.
    pub hidden: bool,
    /// Children have been populated. Goes false → true exactly once.
    pub materialized: bool,
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub kind: NodeKind,
    pub text: String,
    pub flags: NodeFlags,
    children: Vec<NodeIndex>,
}

impl TreeNode {
    /// A node with no lazy children starts out materialized.
    pub fn new(kind: NodeKind, text: impl Into<String>) -> Self {
        let materialized = !kind.has_lazy_children();
        Self {
            kind,
            text: text.into(),
            flags: NodeFlags {
                materialized,
                ..NodeFlags::default()
            },
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.flags.hidden = hidden;
        self
    }

    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.hidden
    }

    pub fn is_materialized(&self) -> bool {
        self.flags.materialized
    }
}

// ─── Arena ───────────────────────────────────────────────────────────────

/// An ordered tree of `TreeNode`s with exactly one root.
#[derive(Debug, Clone)]
pub struct NodeTree {
    graph: StableDiGraph<TreeNode, ()>,
    root: NodeIndex,
}

impl NodeTree {
    pub fn new(root: TreeNode) -> Self {
        let mut graph = StableDiGraph::new();
        let root = graph.add_node(root);
        Self { graph, root }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, idx: NodeIndex) -> bool {
        self.graph.contains_node(idx)
    }

    pub fn get(&self, idx: NodeIndex) -> Option<&TreeNode> {
        self.graph.node_weight(idx)
    }

    pub fn get_mut(&mut self, idx: NodeIndex) -> Option<&mut TreeNode> {
        self.graph.node_weight_mut(idx)
    }

    /// Children in display order. Empty for unknown indices.
    pub fn children(&self, idx: NodeIndex) -> &[NodeIndex] {
        self.get(idx).map(TreeNode::children).unwrap_or(&[])
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
    }

    /// Check if `ancestor` is a parent/grandparent/etc. of `descendant`.
    pub fn is_ancestor_of(&self, ancestor: NodeIndex, descendant: NodeIndex) -> bool {
        let mut current = descendant;
        while let Some(parent) = self.parent(current) {
            if parent == ancestor {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Append a child. Returns the new node's index.
    pub fn push_child(&mut self, parent: NodeIndex, node: TreeNode) -> NodeIndex {
        let at = self.children(parent).len();
        self.insert_child(parent, at, node)
    }

    /// Insert a child at `at` (clamped to the child count).
    pub fn insert_child(&mut self, parent: NodeIndex, at: usize, node: TreeNode) -> NodeIndex {
        let idx = self.graph.add_node(node);
        self.graph.add_edge(parent, idx, ());
        let children = &mut self.graph[parent].children;
        children.insert(at.min(children.len()), idx);
        idx
    }

    /// Splice `nodes` in at `at`, preserving their relative order.
    pub fn insert_children(
        &mut self,
        parent: NodeIndex,
        at: usize,
        nodes: impl IntoIterator<Item = TreeNode>,
    ) -> Vec<NodeIndex> {
        let mut inserted = Vec::new();
        for (offset, node) in nodes.into_iter().enumerate() {
            inserted.push(self.insert_child(parent, at + offset, node));
        }
        inserted
    }

    /// Remove `count` consecutive children starting at `at`, with their subtrees.
    pub fn remove_children(&mut self, parent: NodeIndex, at: usize, count: usize) {
        let Some(node) = self.graph.node_weight_mut(parent) else {
            return;
        };
        let end = (at + count).min(node.children.len());
        let start = at.min(end);
        let removed: Vec<NodeIndex> = node.children.drain(start..end).collect();
        for child in removed {
            self.remove_subtree(child);
        }
    }

    pub fn clear_children(&mut self, parent: NodeIndex) {
        let count = self.children(parent).len();
        self.remove_children(parent, 0, count);
    }

    /// Remove a node and everything below it. The root cannot be removed.
    pub fn remove_node(&mut self, idx: NodeIndex) -> Option<TreeNode> {
        if idx == self.root {
            return None;
        }
        if let Some(parent) = self.parent(idx) {
            self.graph[parent].children.retain(|&c| c != idx);
        }
        self.remove_subtree(idx)
    }

    fn remove_subtree(&mut self, idx: NodeIndex) -> Option<TreeNode> {
        let mut stack = self.children(idx).to_vec();
        while let Some(child) = stack.pop() {
            stack.extend_from_slice(self.children(child));
            self.graph.remove_node(child);
        }
        self.graph.remove_node(idx)
    }

    /// First direct child matching `pred`.
    pub fn find_child(
        &self,
        parent: NodeIndex,
        mut pred: impl FnMut(&TreeNode) -> bool,
    ) -> Option<NodeIndex> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| pred(&self.graph[c]))
    }

    /// All live node indices in depth-first display order, root first.
    pub fn depth_first(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.len());
        let mut stack = vec![self.root];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.children(idx).iter().rev().copied());
        }
        order
    }

    /// Rows a view shows, in display order: non-hidden nodes whose
    /// ancestors are all expanded, root first.
    pub fn visible_rows(&self) -> Vec<NodeIndex> {
        let mut rows = Vec::new();
        let mut stack = vec![self.root];
        while let Some(idx) = stack.pop() {
            let node = &self.graph[idx];
            if node.is_hidden() {
                continue;
            }
            rows.push(idx);
            if node.flags.expanded {
                stack.extend(self.children(idx).iter().rev().copied());
            }
        }
        rows
    }
}

impl Index<NodeIndex> for NodeTree {
    type Output = TreeNode;

    fn index(&self, idx: NodeIndex) -> &TreeNode {
        &self.graph[idx]
    }
}
