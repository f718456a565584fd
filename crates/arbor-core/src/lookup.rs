//! Node lookup: resolve a definition handle to the node that displays it.
//!
//! Resolution walks down from the assembly node along the definition's
//! ancestor chain, materializing only the nodes on that path. A miss is an
//! ordinary `None`.

use crate::assembly::Assembly;
use crate::assembly_tree::AssemblyTree;
use crate::metadata::{Definition, EventRef, FieldRef, MethodRef, Module, PropertyRef, ResourceRef, TypeRef};
use crate::thread::ThreadToken;
use crate::tree::{NodeKind, TreeNode};
use petgraph::graph::NodeIndex;

impl AssemblyTree {
    pub fn find_node(&mut self, def: &Definition, token: &ThreadToken) -> Option<NodeIndex> {
        self.check(token);
        match def {
            Definition::Type(ty) => self.type_node(ty),
            Definition::Method(m) => self.method_node(m),
            Definition::Field(f) => self.field_node(f),
            Definition::Property(p) => self.property_node(p),
            Definition::Event(e) => self.event_node(e),
            Definition::Resource(r) => self.resource_node(r),
        }
    }

    /// The root child wrapping exactly `assembly`.
    pub fn find_assembly_node(&self, assembly: &Assembly, token: &ThreadToken) -> Option<NodeIndex> {
        self.check(token);
        self.nodes
            .find_child(self.nodes.root(), |n| matches!(&n.kind, NodeKind::Assembly(a) if a == assembly))
    }

    /// The root child whose loaded module is `module`.
    pub fn find_module_node(&self, module: &Module, token: &ThreadToken) -> Option<NodeIndex> {
        self.check(token);
        self.module_node(module)
    }

    fn module_node(&self, module: &Module) -> Option<NodeIndex> {
        self.nodes.find_child(self.nodes.root(), |n| match &n.kind {
            NodeKind::Assembly(a) => a.module() == Some(module),
            _ => false,
        })
    }

    fn type_node(&mut self, ty: &TypeRef) -> Option<NodeIndex> {
        let parent = match ty.declaring_type() {
            Some(outer) => {
                let outer = self.type_node(&outer)?;
                self.ensure_children(outer);
                outer
            }
            None => {
                let asm = self.module_node(ty.module())?;
                self.ensure_children(asm);
                let namespace = ty.namespace();
                self.nodes
                    .find_child(asm, |n| matches!(n.kind, NodeKind::Namespace(ns) if ns == namespace))?
            }
        };
        self.nodes
            .find_child(parent, |n| visible(n, |k| matches!(k, NodeKind::Type(t) if t == ty)))
    }

    /// Materialized node of the type declaring a member.
    fn declaring_node(&mut self, declaring: &TypeRef) -> Option<NodeIndex> {
        let idx = self.type_node(declaring)?;
        self.ensure_children(idx);
        Some(idx)
    }

    fn field_node(&mut self, field: &FieldRef) -> Option<NodeIndex> {
        let ty = self.declaring_node(&field.declaring_type())?;
        self.nodes
            .find_child(ty, |n| visible(n, |k| matches!(k, NodeKind::Field(f) if f == field)))
    }

    fn property_node(&mut self, prop: &PropertyRef) -> Option<NodeIndex> {
        let ty = self.declaring_node(&prop.declaring_type())?;
        self.nodes
            .find_child(ty, |n| visible(n, |k| matches!(k, NodeKind::Property(p) if p == prop)))
    }

    fn event_node(&mut self, event: &EventRef) -> Option<NodeIndex> {
        let ty = self.declaring_node(&event.declaring_type())?;
        self.nodes
            .find_child(ty, |n| visible(n, |k| matches!(k, NodeKind::Event(e) if e == event)))
    }

    /// A direct method child, or failing that an accessor under a visible
    /// property/event. A hidden accessor resolves to its owner.
    fn method_node(&mut self, method: &MethodRef) -> Option<NodeIndex> {
        let ty = self.declaring_node(&method.declaring_type())?;
        let direct = self
            .nodes
            .find_child(ty, |n| visible(n, |k| matches!(k, NodeKind::Method(m) if m == method)));
        if direct.is_some() {
            return direct;
        }

        let owners: Vec<NodeIndex> = self
            .nodes
            .children(ty)
            .iter()
            .copied()
            .filter(|&c| {
                let node = &self.nodes[c];
                !node.is_hidden()
                    && match &node.kind {
                        NodeKind::Property(p) => p.accessors().contains(method),
                        NodeKind::Event(e) => e.accessors().contains(method),
                        _ => false,
                    }
            })
            .collect();

        for owner in owners {
            self.ensure_children(owner);
            let Some(accessor) = self
                .nodes
                .find_child(owner, |n| matches!(&n.kind, NodeKind::Method(m) if m == method))
            else {
                continue;
            };
            return Some(if self.nodes[accessor].is_hidden() {
                owner
            } else {
                accessor
            });
        }
        None
    }

    /// Resource nodes match by identity. Failing that, an already
    /// materialized entry node whose text equals the resource name.
    fn resource_node(&mut self, resource: &ResourceRef) -> Option<NodeIndex> {
        let root = self.nodes.root();
        let assemblies: Vec<NodeIndex> = self
            .nodes
            .children(root)
            .iter()
            .copied()
            .filter(|&c| matches!(&self.nodes[c].kind, NodeKind::Assembly(a) if a.is_loaded()))
            .collect();
        let name = resource.name();

        for asm in assemblies {
            self.ensure_children(asm);
            let lists: Vec<NodeIndex> = self
                .nodes
                .children(asm)
                .iter()
                .copied()
                .filter(|&c| matches!(self.nodes[c].kind, NodeKind::ResourceList(_)))
                .collect();
            for list in lists {
                self.ensure_children(list);
                let by_identity = self
                    .nodes
                    .find_child(list, |n| matches!(&n.kind, NodeKind::Resource(r) if r == resource));
                if by_identity.is_some() {
                    return by_identity;
                }
                let by_name = self.nodes.children(list).iter().find_map(|&bundle| {
                    self.nodes.find_child(bundle, |n| {
                        matches!(n.kind, NodeKind::ResourceEntry(entry) if entry == name)
                    })
                });
                if by_name.is_some() {
                    return by_name;
                }
            }
        }
        None
    }
}

fn visible(node: &TreeNode, pred: impl FnOnce(&NodeKind) -> bool) -> bool {
    !node.is_hidden() && pred(&node.kind)
}
