//! Interactive session over one assembly tree.
//!
//! Owns the tree, the selection and the gesture controller, and routes
//! input events to them. Lives on the tree's owner thread.

use crate::gesture::{DragController, DragState, GestureConfig, GestureHost};
use crate::input::{InputEvent, Modifiers};
use crate::shortcuts::{ShortcutMap, TreeAction};
use arbor_core::{
    Assembly, AssemblyList, AssemblyTree, Definition, DragPayload, DropCoordinator, DropEffect,
    NodeIndex, NodeKind, ThreadToken, TreeConfig,
};
use std::sync::Arc;

// ─── Activation ──────────────────────────────────────────────────────────

/// What double click and Enter do to a node.
pub trait Activator {
    /// Returns true if the activation was handled.
    fn activate(&mut self, tree: &AssemblyTree, node: NodeIndex) -> bool;
}

impl<F> Activator for F
where
    F: FnMut(&AssemblyTree, NodeIndex) -> bool,
{
    fn activate(&mut self, tree: &AssemblyTree, node: NodeIndex) -> bool {
        self(tree, node)
    }
}

/// Leaves every activation unhandled, so double clicks toggle expansion.
struct Unhandled;

impl Activator for Unhandled {
    fn activate(&mut self, _tree: &AssemblyTree, _node: NodeIndex) -> bool {
        false
    }
}

// ─── Session ─────────────────────────────────────────────────────────────

pub struct TreeSession {
    tree: AssemblyTree,
    token: ThreadToken,
    /// Selected nodes, in selection order.
    selection: Vec<NodeIndex>,
    /// Fixed end of a shift-click range.
    anchor: Option<NodeIndex>,
    controller: DragController,
    activator: Box<dyn Activator>,
    outgoing_drag: Option<DragPayload>,
}

impl TreeSession {
    /// Open a session on the calling thread.
    pub fn new(list: Arc<AssemblyList>, config: TreeConfig, gestures: GestureConfig) -> Self {
        let token = ThreadToken::current();
        let tree = AssemblyTree::new(list, config, &token);
        Self {
            tree,
            token,
            selection: Vec::new(),
            anchor: None,
            controller: DragController::new(gestures),
            activator: Box::new(Unhandled),
            outgoing_drag: None,
        }
    }

    pub fn with_activator(mut self, activator: impl Activator + 'static) -> Self {
        self.activator = Box::new(activator);
        self
    }

    pub fn tree(&self) -> &AssemblyTree {
        &self.tree
    }

    pub fn token(&self) -> &ThreadToken {
        &self.token
    }

    pub fn selection(&self) -> &[NodeIndex] {
        &self.selection
    }

    pub fn drag_state(&self) -> DragState {
        self.controller.state()
    }

    /// Payload of a drag started from this tree, if one is waiting to be
    /// handed to the platform.
    pub fn take_outgoing_drag(&mut self) -> Option<DragPayload> {
        self.outgoing_drag.take()
    }

    /// Route one input event. `target` is the node under the pointer, or
    /// the focused node for key events.
    pub fn handle_input(&mut self, event: &InputEvent, target: Option<NodeIndex>) {
        if let InputEvent::Key {
            key,
            ctrl,
            shift,
            alt,
            meta,
        } = event
        {
            if let Some(action) = ShortcutMap::resolve(key, *ctrl, *shift, *alt, *meta) {
                self.perform(action, target);
            }
            return;
        }

        let mut host = SessionHost {
            tree: &mut self.tree,
            token: &self.token,
            selection: &mut self.selection,
            anchor: &mut self.anchor,
            activator: self.activator.as_mut(),
            outgoing: &mut self.outgoing_drag,
        };
        self.controller.handle(event, target, &mut host);
    }

    /// Run a shortcut action against `target`.
    pub fn perform(&mut self, action: TreeAction, target: Option<NodeIndex>) {
        log::debug!("tree action {action:?} on {target:?}");
        match action {
            TreeAction::Expand | TreeAction::Collapse => {
                if let Some(node) = target {
                    let expand = action == TreeAction::Expand;
                    self.tree.set_expanded(node, expand, &self.token);
                }
            }
            TreeAction::Activate => {
                if let Some(node) = target {
                    self.activator.activate(&self.tree, node);
                }
            }
            TreeAction::Unload => {
                for assembly in self.selected_assemblies() {
                    self.tree.list().remove(&assembly);
                }
                self.sync();
            }
            TreeAction::SortList => {
                self.tree.list().sort_by_name();
                self.sync();
            }
            TreeAction::CancelEdit | TreeAction::BeginRename => {
                let Some(node) = target else {
                    return;
                };
                let key = if action == TreeAction::CancelEdit {
                    "Escape"
                } else {
                    "F2"
                };
                let mut host = SessionHost {
                    tree: &mut self.tree,
                    token: &self.token,
                    selection: &mut self.selection,
                    anchor: &mut self.anchor,
                    activator: self.activator.as_mut(),
                    outgoing: &mut self.outgoing_drag,
                };
                self.controller.key(key, node, &mut host);
            }
        }
    }

    /// Replay pending list changes and drop selection entries whose nodes
    /// went away.
    pub fn sync(&mut self) -> usize {
        let applied = self.tree.pump(&self.token);
        if applied > 0 {
            self.forget_stale_nodes();
        }
        applied
    }

    /// Node indices are reused once freed, so anything remembered by index
    /// may now name a different node.
    fn forget_stale_nodes(&mut self) {
        let nodes = self.tree.nodes();
        self.selection
            .retain(|&idx| nodes.get(idx).is_some_and(|n| n.flags.selected));
        if self
            .anchor
            .is_some_and(|idx| !nodes.get(idx).is_some_and(|n| n.flags.selected))
        {
            self.anchor = None;
        }
        self.controller.reset();
    }

    pub fn can_drop(&self, coordinator: &DropCoordinator, payload: &DragPayload) -> (bool, DropEffect) {
        self.tree.can_drop(coordinator, payload)
    }

    /// Drop `payload` onto the root at `index`.
    pub fn drop_at(
        &mut self,
        coordinator: &DropCoordinator,
        payload: &DragPayload,
        index: usize,
    ) -> Vec<Assembly> {
        let placed = self.tree.drop_payload(coordinator, payload, index, &self.token);
        self.tree.pump(&self.token);
        self.forget_stale_nodes();
        placed
    }

    /// Put `node` in edit mode. `Escape` leaves it again.
    pub fn begin_edit(&mut self, node: NodeIndex) {
        if let Some(n) = self.tree.node_mut(node, &self.token) {
            n.flags.editing = true;
        }
    }

    /// Find the node showing `def`, expand its ancestors and select it.
    pub fn reveal(&mut self, def: &Definition) -> Option<NodeIndex> {
        let node = self.tree.find_node(def, &self.token)?;
        let mut cursor = self.tree.nodes().parent(node);
        while let Some(ancestor) = cursor {
            self.tree.set_expanded(ancestor, true, &self.token);
            cursor = self.tree.nodes().parent(ancestor);
        }
        set_selection(&mut self.tree, &self.token, &mut self.selection, vec![node]);
        self.anchor = Some(node);
        Some(node)
    }

    fn selected_assemblies(&self) -> Vec<Assembly> {
        self.selection
            .iter()
            .filter_map(|&idx| match &self.tree.nodes().get(idx)?.kind {
                NodeKind::Assembly(asm) => Some(asm.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Replace the selection, keeping node flags in step.
fn set_selection(
    tree: &mut AssemblyTree,
    token: &ThreadToken,
    selection: &mut Vec<NodeIndex>,
    nodes: Vec<NodeIndex>,
) {
    for idx in selection.drain(..) {
        if let Some(n) = tree.node_mut(idx, token) {
            n.flags.selected = false;
        }
    }
    for idx in nodes {
        if let Some(n) = tree.node_mut(idx, token) {
            n.flags.selected = true;
            selection.push(idx);
        }
    }
}

// ─── Gesture host ────────────────────────────────────────────────────────

/// Borrowed view of a session that gestures act on.
struct SessionHost<'a> {
    tree: &'a mut AssemblyTree,
    token: &'a ThreadToken,
    selection: &'a mut Vec<NodeIndex>,
    anchor: &'a mut Option<NodeIndex>,
    activator: &'a mut dyn Activator,
    outgoing: &'a mut Option<DragPayload>,
}

impl SessionHost<'_> {
    /// Ctrl toggles `node`, shift selects the visible rows between the
    /// anchor and `node`, a plain click selects only `node`.
    fn click_select(&mut self, node: NodeIndex, modifiers: Modifiers) {
        let mut next = self.selection.clone();
        if modifiers.toggles() {
            if let Some(at) = next.iter().position(|&n| n == node) {
                next.remove(at);
            } else {
                next.push(node);
            }
            *self.anchor = Some(node);
        } else if modifiers.shift {
            let anchor = *self.anchor.get_or_insert(node);
            next = self.range(anchor, node);
        } else {
            next = vec![node];
            *self.anchor = Some(node);
        }
        set_selection(self.tree, self.token, self.selection, next);
    }

    fn range(&self, from: NodeIndex, to: NodeIndex) -> Vec<NodeIndex> {
        let rows = self.tree.nodes().visible_rows();
        let (Some(a), Some(b)) = (
            rows.iter().position(|&r| r == from),
            rows.iter().position(|&r| r == to),
        ) else {
            return vec![to];
        };
        rows[a.min(b)..=a.max(b)].to_vec()
    }
}

impl GestureHost for SessionHost<'_> {
    fn is_selected(&self, node: NodeIndex) -> bool {
        self.selection.contains(&node)
    }

    fn press_default(&mut self, node: NodeIndex, modifiers: Modifiers) {
        self.click_select(node, modifiers);
    }

    fn release_default(&mut self, node: NodeIndex, modifiers: Modifiers) {
        if modifiers.toggles() || modifiers.shift || self.selection.len() > 1 {
            self.click_select(node, modifiers);
        }
    }

    fn top_level_selection(&self) -> Vec<NodeIndex> {
        let nodes = self.tree.nodes();
        self.selection
            .iter()
            .copied()
            .filter(|&n| {
                !self
                    .selection
                    .iter()
                    .any(|&other| other != n && nodes.is_ancestor_of(other, n))
            })
            .collect()
    }

    fn can_drag(&self, _node: NodeIndex, selection: &[NodeIndex]) -> bool {
        !selection.is_empty()
            && selection
                .iter()
                .all(|&n| self.tree.node(n).is_some_and(|n| n.kind.is_assembly()))
    }

    fn start_drag(&mut self, _node: NodeIndex, selection: &[NodeIndex]) {
        let files = selection
            .iter()
            .filter_map(|&n| match &self.tree.node(n)?.kind {
                NodeKind::Assembly(asm) => Some(asm.file_name().to_string()),
                _ => None,
            })
            .collect();
        *self.outgoing = Some(DragPayload::Nodes(files));
    }

    fn activate(&mut self, node: NodeIndex) -> bool {
        self.activator.activate(self.tree, node)
    }

    fn is_root(&self, node: NodeIndex) -> bool {
        node == self.tree.root()
    }

    fn shows_root_expander(&self) -> bool {
        self.tree.config().show_root_expander
    }

    fn toggle_expanded(&mut self, node: NodeIndex) {
        let Some(expanded) = self.tree.node(node).map(|n| n.flags.expanded) else {
            return;
        };
        self.tree.set_expanded(node, !expanded, self.token);
    }

    fn is_editing(&self, node: NodeIndex) -> bool {
        self.tree.node(node).is_some_and(|n| n.flags.editing)
    }

    fn set_editing(&mut self, node: NodeIndex, editing: bool) {
        if let Some(n) = self.tree.node_mut(node, self.token) {
            n.flags.editing = editing;
        }
    }
}
