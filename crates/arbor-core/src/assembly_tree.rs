//! The assembly tree: a `NodeTree` whose root mirrors an `AssemblyList`.

use crate::assembly::{Assembly, AssemblyList, Subscription};
use crate::config::TreeConfig;
use crate::sync::{self, SyncError};
use crate::thread::ThreadToken;
use crate::tree::{NodeKind, NodeTree, TreeNode};
use petgraph::graph::NodeIndex;
use std::sync::Arc;
use std::thread::ThreadId;

pub struct AssemblyTree {
    pub(crate) nodes: NodeTree,
    pub(crate) config: TreeConfig,
    /// This tree's own queue of list changes.
    subscription: Subscription,
    owner: ThreadId,
}

impl AssemblyTree {
    /// Create the tree on the calling thread and bind its root to `list`.
    pub fn new(list: Arc<AssemblyList>, config: TreeConfig, token: &ThreadToken) -> Self {
        let mut root = TreeNode::new(NodeKind::AssemblyList, list.name());
        root.flags.expanded = true;
        let mut nodes = NodeTree::new(root);

        let (subscription, items) = list.subscribe();
        let root = nodes.root();
        sync::bind(&mut nodes, root, &items, assembly_node);

        Self {
            nodes,
            config,
            subscription,
            owner: token.owner(),
        }
    }

    pub fn nodes(&self) -> &NodeTree {
        &self.nodes
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&TreeNode> {
        self.nodes.get(idx)
    }

    pub fn root(&self) -> NodeIndex {
        self.nodes.root()
    }

    pub fn list(&self) -> &Arc<AssemblyList> {
        self.subscription.list()
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn node_mut(&mut self, idx: NodeIndex, token: &ThreadToken) -> Option<&mut TreeNode> {
        self.check(token);
        self.nodes.get_mut(idx)
    }

    /// Expand or collapse a node. Expanding materializes it first.
    pub fn set_expanded(&mut self, idx: NodeIndex, expanded: bool, token: &ThreadToken) {
        self.check(token);
        if expanded {
            self.ensure_children(idx);
        }
        if let Some(node) = self.nodes.get_mut(idx) {
            node.flags.expanded = expanded;
        }
    }

    /// Replay every queued list change onto the root's children.
    ///
    /// # Panics
    /// On a change the tree cannot mirror; see [`AssemblyTree::try_pump`].
    pub fn pump(&mut self, token: &ThreadToken) -> usize {
        match self.try_pump(token) {
            Ok(applied) => applied,
            Err(err) => panic!("assembly list out of sync with its tree: {err}"),
        }
    }

    /// Like [`AssemblyTree::pump`], but reports an unsupported change
    /// instead of panicking. Changes after the failing one are discarded.
    ///
    /// # Errors
    /// The first `SyncError` returned by the synchronizer.
    pub fn try_pump(&mut self, token: &ThreadToken) -> Result<usize, SyncError> {
        self.check(token);
        let root = self.nodes.root();
        let changes = self.subscription.take_changes();
        let count = changes.len();
        for change in &changes {
            sync::apply(&mut self.nodes, root, change, assembly_node)?;
        }
        Ok(count)
    }

    /// Assemblies in root-child order.
    pub fn assemblies(&self) -> Vec<Assembly> {
        self.nodes
            .children(self.nodes.root())
            .iter()
            .filter_map(|&c| match &self.nodes[c].kind {
                NodeKind::Assembly(asm) => Some(asm.clone()),
                _ => None,
            })
            .collect()
    }

    #[track_caller]
    pub(crate) fn check(&self, token: &ThreadToken) {
        token.verify(self.owner);
    }
}

fn assembly_node(asm: &Assembly) -> TreeNode {
    TreeNode::new(NodeKind::Assembly(asm.clone()), asm.short_name().as_str())
}
