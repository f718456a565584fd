pub mod assembly;
pub mod assembly_tree;
pub mod config;
pub mod drop;
mod lazy;
mod lookup;
pub mod metadata;
pub mod name;
pub mod parser;
pub mod sync;
pub mod thread;
pub mod tree;

pub use assembly::{
    Assembly, AssemblyList, AssemblyLoader, FileLoader, ListGuard, LoadError, LoadedAssembly,
    MemoryLoader, SourcePath, Subscription,
};
pub use assembly_tree::AssemblyTree;
pub use config::{DropConfig, FilterSettings, TreeConfig};
pub use drop::{DragPayload, DropCoordinator, DropEffect, EntrySelector, ExtensionSelector};
pub use metadata::{Definition, Module, ModuleBuilder, Visibility};
pub use name::Name;
pub use parser::parse_outline;
pub use sync::{CollectionChange, SyncError};
pub use thread::ThreadToken;
pub use tree::{NodeFlags, NodeKind, NodeTree, TreeNode};

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;
