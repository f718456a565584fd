//! Lazy resolver: populates a node's children the first time they are
//! needed, then never again.

use crate::assembly_tree::AssemblyTree;
use crate::config::FilterSettings;
use crate::metadata::{EventRef, MethodRef, Module, PropertyRef, ResourceRef, TypeRef, Visibility};
use crate::name::Name;
use crate::thread::ThreadToken;
use crate::tree::{NodeKind, TreeNode};
use petgraph::graph::NodeIndex;
use std::collections::BTreeMap;

impl AssemblyTree {
    /// Populate `idx`'s children if that has not happened yet.
    pub fn materialize(&mut self, idx: NodeIndex, token: &ThreadToken) {
        self.check(token);
        self.ensure_children(idx);
    }

    pub(crate) fn ensure_children(&mut self, idx: NodeIndex) {
        let Some(node) = self.nodes.get(idx) else {
            return;
        };
        if node.is_materialized() {
            return;
        }
        let kind = node.kind.clone();
        let filter = self.config.filter.clone();

        match &kind {
            NodeKind::Assembly(asm) => {
                if let Some(module) = asm.module() {
                    self.populate_assembly(idx, module, &filter);
                }
            }
            NodeKind::ResourceList(module) => {
                for resource in module.resources() {
                    self.nodes.push_child(idx, resource_node(resource));
                }
            }
            NodeKind::Resource(resource) => {
                for &entry in &resource.data().entries {
                    self.nodes
                        .push_child(idx, TreeNode::new(NodeKind::ResourceEntry(entry), entry.as_str()));
                }
            }
            NodeKind::Type(ty) => self.populate_type(idx, ty, &filter),
            NodeKind::Property(prop) => {
                let hidden = filtered(&filter, prop.data().visibility);
                for accessor in prop.accessors() {
                    self.nodes
                        .push_child(idx, accessor_node(accessor, &filter, hidden));
                }
            }
            NodeKind::Event(event) => {
                let hidden = filtered(&filter, event.data().visibility);
                for accessor in event.accessors() {
                    self.nodes
                        .push_child(idx, accessor_node(accessor, &filter, hidden));
                }
            }
            NodeKind::AssemblyList
            | NodeKind::ResourceEntry(_)
            | NodeKind::Namespace(_)
            | NodeKind::Field(_)
            | NodeKind::Method(_) => {}
        }

        if let Some(node) = self.nodes.get_mut(idx) {
            node.flags.materialized = true;
            log::trace!(
                "materialized {:?} with {} children",
                node.text,
                node.children().len()
            );
        }
    }

    /// Resources group first, then namespaces in name order, each filled
    /// with its top-level types.
    fn populate_assembly(&mut self, idx: NodeIndex, module: &Module, filter: &FilterSettings) {
        if module.resources().next().is_some() {
            self.nodes.push_child(
                idx,
                TreeNode::new(NodeKind::ResourceList(module.clone()), "Resources"),
            );
        }

        let mut namespaces: BTreeMap<Name, Vec<TypeRef>> = BTreeMap::new();
        for ty in module.top_level_types() {
            namespaces.entry(ty.namespace()).or_default().push(ty);
        }

        for (namespace, types) in namespaces {
            let text = if namespace.is_empty() { "-" } else { namespace.as_str() };
            let type_nodes: Vec<TreeNode> = types.iter().map(|t| type_node(t, filter)).collect();
            let all_hidden = type_nodes.iter().all(TreeNode::is_hidden);
            let ns = self.nodes.push_child(
                idx,
                TreeNode::new(NodeKind::Namespace(namespace), text).hidden(all_hidden),
            );
            self.nodes.insert_children(ns, 0, type_nodes);
        }
    }

    fn populate_type(&mut self, idx: NodeIndex, ty: &TypeRef, filter: &FilterSettings) {
        let mut children = Vec::new();
        children.extend(ty.nested_types().map(|t| type_node(&t, filter)));
        children.extend(ty.fields().map(|f| {
            let hidden = filtered(filter, f.data().visibility);
            TreeNode::new(NodeKind::Field(f.clone()), f.name().as_str()).hidden(hidden)
        }));
        children.extend(ty.properties().map(|p| property_node(p, filter)));
        children.extend(ty.events().map(|e| event_node(e, filter)));
        children.extend(
            ty.methods()
                .filter(|m| !m.is_accessor())
                .map(|m| {
                    let hidden = filtered(filter, m.data().visibility);
                    TreeNode::new(NodeKind::Method(m.clone()), m.name().as_str()).hidden(hidden)
                }),
        );
        self.nodes.insert_children(idx, 0, children);
    }
}

fn filtered(filter: &FilterSettings, visibility: Visibility) -> bool {
    !filter.show_non_public && !visibility.is_public_api()
}

fn type_node(ty: &TypeRef, filter: &FilterSettings) -> TreeNode {
    TreeNode::new(NodeKind::Type(ty.clone()), ty.name().as_str())
        .hidden(filtered(filter, ty.data().visibility))
}

fn property_node(prop: PropertyRef, filter: &FilterSettings) -> TreeNode {
    let hidden = filtered(filter, prop.data().visibility);
    let text = prop.name().to_string();
    TreeNode::new(NodeKind::Property(prop), text).hidden(hidden)
}

fn event_node(event: EventRef, filter: &FilterSettings) -> TreeNode {
    let hidden = filtered(filter, event.data().visibility);
    let text = event.name().to_string();
    TreeNode::new(NodeKind::Event(event), text).hidden(hidden)
}

fn resource_node(resource: ResourceRef) -> TreeNode {
    let text = resource.name().to_string();
    TreeNode::new(NodeKind::Resource(resource), text)
}

/// Accessors are hidden when their owner is, or when accessors are filtered.
fn accessor_node(method: MethodRef, filter: &FilterSettings, owner_hidden: bool) -> TreeNode {
    let hidden = owner_hidden || !filter.show_accessors || filtered(filter, method.data().visibility);
    let text = method.name().to_string();
    TreeNode::new(NodeKind::Method(method), text).hidden(hidden)
}
