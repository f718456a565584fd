//! Module metadata and definition handles.
//!
//! A `Module` is an immutable, shared table set (types, members, resources)
//! produced by whatever loads an assembly. Handles into it (`TypeRef`,
//! `MethodRef`, ...) pair the module's identity with a table index, so two
//! handles are equal only when they name the same definition of the same
//! loaded module. Structurally identical modules loaded twice never compare
//! equal.

use crate::name::Name;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// ─── Table ids ───────────────────────────────────────────────────────────

macro_rules! table_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(u32);

            impl $name {
                fn from_len(len: usize) -> Self {
                    Self(u32::try_from(len).unwrap_or(u32::MAX))
                }

                pub fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

table_id!(
    /// Row in the type table.
    TypeId,
    /// Row in the method table.
    MethodId,
    /// Row in the field table.
    FieldId,
    /// Row in the property table.
    PropertyId,
    /// Row in the event table.
    EventId,
    /// Row in the resource table.
    ResourceId,
);

// ─── Rows ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Protected,
    Internal,
    Private,
}

impl Visibility {
    /// Visible to consumers outside the declaring assembly.
    pub fn is_public_api(self) -> bool {
        matches!(self, Visibility::Public | Visibility::Protected)
    }
}

#[derive(Debug, Clone)]
pub struct TypeData {
    pub name: Name,
    pub namespace: Name,
    pub visibility: Visibility,
    pub declaring: Option<TypeId>,
    pub nested: Vec<TypeId>,
    pub fields: Vec<FieldId>,
    pub properties: Vec<PropertyId>,
    pub events: Vec<EventId>,
    pub methods: Vec<MethodId>,
}

/// Which property or event a method is an accessor of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorOwner {
    Property(PropertyId),
    Event(EventId),
}

#[derive(Debug, Clone)]
pub struct MethodData {
    pub name: Name,
    pub visibility: Visibility,
    pub declaring: TypeId,
    pub accessor_of: Option<AccessorOwner>,
}

#[derive(Debug, Clone)]
pub struct FieldData {
    pub name: Name,
    pub visibility: Visibility,
    pub declaring: TypeId,
}

#[derive(Debug, Clone)]
pub struct PropertyData {
    pub name: Name,
    pub visibility: Visibility,
    pub declaring: TypeId,
    pub getter: Option<MethodId>,
    pub setter: Option<MethodId>,
}

#[derive(Debug, Clone)]
pub struct EventData {
    pub name: Name,
    pub visibility: Visibility,
    pub declaring: TypeId,
    pub add: Option<MethodId>,
    pub remove: Option<MethodId>,
    pub invoke: Option<MethodId>,
}

/// An embedded resource. Resource bundles (`.resources`) carry named entries.
#[derive(Debug, Clone)]
pub struct ResourceData {
    pub name: Name,
    pub entries: Vec<Name>,
}

#[derive(Debug, Default)]
pub struct ModuleData {
    pub name: String,
    pub types: Vec<TypeData>,
    pub methods: Vec<MethodData>,
    pub fields: Vec<FieldData>,
    pub properties: Vec<PropertyData>,
    pub events: Vec<EventData>,
    pub resources: Vec<ResourceData>,
}

// ─── Module ──────────────────────────────────────────────────────────────

/// Shared, identity-compared module metadata.
#[derive(Clone)]
pub struct Module(Arc<ModuleData>);

impl Module {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn data(&self) -> &ModuleData {
        &self.0
    }

    /// Types without a declaring type, in table order.
    pub fn top_level_types(&self) -> impl Iterator<Item = TypeRef> + '_ {
        self.0
            .types
            .iter()
            .enumerate()
            .filter(|(_, t)| t.declaring.is_none())
            .map(move |(i, _)| self.handle(TypeId::from_len(i)))
    }

    pub fn resources(&self) -> impl Iterator<Item = ResourceRef> + '_ {
        (0..self.0.resources.len()).map(move |i| self.handle(ResourceId::from_len(i)))
    }

    pub fn type_ref(&self, id: TypeId) -> Option<TypeRef> {
        (id.index() < self.0.types.len()).then(|| self.handle(id))
    }

    pub fn method_ref(&self, id: MethodId) -> Option<MethodRef> {
        (id.index() < self.0.methods.len()).then(|| self.handle(id))
    }

    pub fn field_ref(&self, id: FieldId) -> Option<FieldRef> {
        (id.index() < self.0.fields.len()).then(|| self.handle(id))
    }

    pub fn property_ref(&self, id: PropertyId) -> Option<PropertyRef> {
        (id.index() < self.0.properties.len()).then(|| self.handle(id))
    }

    pub fn event_ref(&self, id: EventId) -> Option<EventRef> {
        (id.index() < self.0.events.len()).then(|| self.handle(id))
    }

    pub fn resource_ref(&self, id: ResourceId) -> Option<ResourceRef> {
        (id.index() < self.0.resources.len()).then(|| self.handle(id))
    }

    /// Find a type by namespace and name (first match).
    pub fn find_type(&self, namespace: &str, name: &str) -> Option<TypeRef> {
        let namespace = Name::existing(namespace)?;
        let name = Name::existing(name)?;
        self.0
            .types
            .iter()
            .position(|t| t.namespace == namespace && t.name == name)
            .map(|i| self.handle(TypeId::from_len(i)))
    }

    pub fn find_resource(&self, name: &str) -> Option<ResourceRef> {
        let name = Name::existing(name)?;
        self.0
            .resources
            .iter()
            .position(|r| r.name == name)
            .map(move |i| self.handle(ResourceId::from_len(i)))
    }

    fn handle<I>(&self, id: I) -> DefRef<I> {
        DefRef {
            module: self.clone(),
            id,
        }
    }
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Module {}

impl Hash for Module {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Module({} @ {:p})", self.0.name, Arc::as_ptr(&self.0))
    }
}

// ─── Handles ─────────────────────────────────────────────────────────────

/// A definition inside a specific loaded module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DefRef<I> {
    module: Module,
    id: I,
}

pub type TypeRef = DefRef<TypeId>;
pub type MethodRef = DefRef<MethodId>;
pub type FieldRef = DefRef<FieldId>;
pub type PropertyRef = DefRef<PropertyId>;
pub type EventRef = DefRef<EventId>;
pub type ResourceRef = DefRef<ResourceId>;

impl<I: Copy> DefRef<I> {
    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn id(&self) -> I {
        self.id
    }

    fn sibling<J>(&self, id: J) -> DefRef<J> {
        self.module.handle(id)
    }
}

impl TypeRef {
    pub fn data(&self) -> &TypeData {
        &self.module.0.types[self.id.index()]
    }

    pub fn name(&self) -> Name {
        self.data().name
    }

    pub fn namespace(&self) -> Name {
        self.data().namespace
    }

    pub fn declaring_type(&self) -> Option<TypeRef> {
        self.data().declaring.map(|id| self.sibling(id))
    }

    pub fn nested_types(&self) -> impl Iterator<Item = TypeRef> + '_ {
        self.data().nested.iter().map(move |&id| self.sibling(id))
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldRef> + '_ {
        self.data().fields.iter().map(move |&id| self.sibling(id))
    }

    pub fn properties(&self) -> impl Iterator<Item = PropertyRef> + '_ {
        self.data().properties.iter().map(move |&id| self.sibling(id))
    }

    pub fn events(&self) -> impl Iterator<Item = EventRef> + '_ {
        self.data().events.iter().map(move |&id| self.sibling(id))
    }

    /// All methods, accessors included.
    pub fn methods(&self) -> impl Iterator<Item = MethodRef> + '_ {
        self.data().methods.iter().map(move |&id| self.sibling(id))
    }

    /// Full name with declaring types joined by `+` (e.g. `Ns.Outer+Inner`).
    pub fn full_name(&self) -> String {
        match self.declaring_type() {
            Some(outer) => format!("{}+{}", outer.full_name(), self.name()),
            None if self.namespace().is_empty() => self.name().to_string(),
            None => format!("{}.{}", self.namespace(), self.name()),
        }
    }
}

impl MethodRef {
    pub fn data(&self) -> &MethodData {
        &self.module.0.methods[self.id.index()]
    }

    pub fn name(&self) -> Name {
        self.data().name
    }

    pub fn declaring_type(&self) -> TypeRef {
        self.sibling(self.data().declaring)
    }

    pub fn is_accessor(&self) -> bool {
        self.data().accessor_of.is_some()
    }
}

impl FieldRef {
    pub fn data(&self) -> &FieldData {
        &self.module.0.fields[self.id.index()]
    }

    pub fn name(&self) -> Name {
        self.data().name
    }

    pub fn declaring_type(&self) -> TypeRef {
        self.sibling(self.data().declaring)
    }
}

impl PropertyRef {
    pub fn data(&self) -> &PropertyData {
        &self.module.0.properties[self.id.index()]
    }

    pub fn name(&self) -> Name {
        self.data().name
    }

    pub fn declaring_type(&self) -> TypeRef {
        self.sibling(self.data().declaring)
    }

    /// Getter, then setter.
    pub fn accessors(&self) -> SmallVec<[MethodRef; 3]> {
        let data = self.data();
        [data.getter, data.setter]
            .into_iter()
            .flatten()
            .map(|id| self.sibling(id))
            .collect()
    }
}

impl EventRef {
    pub fn data(&self) -> &EventData {
        &self.module.0.events[self.id.index()]
    }

    pub fn name(&self) -> Name {
        self.data().name
    }

    pub fn declaring_type(&self) -> TypeRef {
        self.sibling(self.data().declaring)
    }

    /// Add, remove, then invoke.
    pub fn accessors(&self) -> SmallVec<[MethodRef; 3]> {
        let data = self.data();
        [data.add, data.remove, data.invoke]
            .into_iter()
            .flatten()
            .map(|id| self.sibling(id))
            .collect()
    }
}

impl ResourceRef {
    pub fn data(&self) -> &ResourceData {
        &self.module.0.resources[self.id.index()]
    }

    pub fn name(&self) -> Name {
        self.data().name
    }
}

/// Any definition the tree can navigate to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Definition {
    Type(TypeRef),
    Method(MethodRef),
    Field(FieldRef),
    Property(PropertyRef),
    Event(EventRef),
    Resource(ResourceRef),
}

impl Definition {
    pub fn module(&self) -> &Module {
        match self {
            Definition::Type(d) => d.module(),
            Definition::Method(d) => d.module(),
            Definition::Field(d) => d.module(),
            Definition::Property(d) => d.module(),
            Definition::Event(d) => d.module(),
            Definition::Resource(d) => d.module(),
        }
    }
}

// ─── Builder ─────────────────────────────────────────────────────────────

/// Assembles a `Module` table by table.
pub struct ModuleBuilder {
    data: ModuleData,
}

impl ModuleBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            data: ModuleData {
                name: name.to_string(),
                ..ModuleData::default()
            },
        }
    }

    pub fn add_type(&mut self, namespace: &str, name: &str, visibility: Visibility) -> TypeId {
        self.push_type(Name::intern(namespace), name, visibility, None)
    }

    /// Add a type nested in `declaring`. Nested types share the outer namespace.
    pub fn add_nested_type(
        &mut self,
        declaring: TypeId,
        name: &str,
        visibility: Visibility,
    ) -> TypeId {
        let namespace = self.data.types[declaring.index()].namespace;
        let id = self.push_type(namespace, name, visibility, Some(declaring));
        self.data.types[declaring.index()].nested.push(id);
        id
    }

    pub fn add_field(&mut self, declaring: TypeId, name: &str, visibility: Visibility) -> FieldId {
        let id = FieldId::from_len(self.data.fields.len());
        self.data.fields.push(FieldData {
            name: Name::intern(name),
            visibility,
            declaring,
        });
        self.data.types[declaring.index()].fields.push(id);
        id
    }

    pub fn add_method(
        &mut self,
        declaring: TypeId,
        name: &str,
        visibility: Visibility,
    ) -> MethodId {
        self.push_method(declaring, name, visibility, None)
    }

    /// Add a property with `get_Name` / `set_Name` accessor methods.
    pub fn add_property(
        &mut self,
        declaring: TypeId,
        name: &str,
        visibility: Visibility,
        getter: bool,
        setter: bool,
    ) -> PropertyId {
        let id = PropertyId::from_len(self.data.properties.len());
        let owner = Some(AccessorOwner::Property(id));
        let getter = getter
            .then(|| self.push_method(declaring, &format!("get_{name}"), visibility, owner));
        let setter = setter
            .then(|| self.push_method(declaring, &format!("set_{name}"), visibility, owner));
        self.data.properties.push(PropertyData {
            name: Name::intern(name),
            visibility,
            declaring,
            getter,
            setter,
        });
        self.data.types[declaring.index()].properties.push(id);
        id
    }

    /// Add an event with `add_Name` / `remove_Name` accessor methods.
    pub fn add_event(&mut self, declaring: TypeId, name: &str, visibility: Visibility) -> EventId {
        let id = EventId::from_len(self.data.events.len());
        let owner = Some(AccessorOwner::Event(id));
        let add = self.push_method(declaring, &format!("add_{name}"), visibility, owner);
        let remove = self.push_method(declaring, &format!("remove_{name}"), visibility, owner);
        self.data.events.push(EventData {
            name: Name::intern(name),
            visibility,
            declaring,
            add: Some(add),
            remove: Some(remove),
            invoke: None,
        });
        self.data.types[declaring.index()].events.push(id);
        id
    }

    pub fn add_resource(&mut self, name: &str, entries: &[&str]) -> ResourceId {
        let id = ResourceId::from_len(self.data.resources.len());
        self.data.resources.push(ResourceData {
            name: Name::intern(name),
            entries: entries.iter().map(|e| Name::intern(e)).collect(),
        });
        id
    }

    #[must_use]
    pub fn build(self) -> Module {
        Module(Arc::new(self.data))
    }

    fn push_type(
        &mut self,
        namespace: Name,
        name: &str,
        visibility: Visibility,
        declaring: Option<TypeId>,
    ) -> TypeId {
        let id = TypeId::from_len(self.data.types.len());
        self.data.types.push(TypeData {
            name: Name::intern(name),
            namespace,
            visibility,
            declaring,
            nested: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            methods: Vec::new(),
        });
        id
    }

    fn push_method(
        &mut self,
        declaring: TypeId,
        name: &str,
        visibility: Visibility,
        accessor_of: Option<AccessorOwner>,
    ) -> MethodId {
        let id = MethodId::from_len(self.data.methods.len());
        self.data.methods.push(MethodData {
            name: Name::intern(name),
            visibility,
            declaring,
            accessor_of,
        });
        self.data.types[declaring.index()].methods.push(id);
        id
    }
}
