//! Drop coordinator: turns a drag payload into assemblies placed at a
//! target index of the assembly list.

use crate::assembly::{Assembly, AssemblyList, AssemblyLoader, ListGuard, SourcePath};
use crate::assembly_tree::AssemblyTree;
use crate::config::DropConfig;
use crate::thread::ThreadToken;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Format tag of payloads that carry assembly nodes dragged out of a tree.
pub const NODE_FORMAT: &str = "ArborAssemblyNodes";

/// Format tag of the platform's generic file list.
pub const FILE_NAMES_FORMAT: &str = "FileNames";

// ─── Payload ─────────────────────────────────────────────────────────────

/// What the external drag/drop subsystem hands over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragPayload {
    /// Assembly nodes from a tree, by file name.
    Nodes(Vec<String>),
    /// Plain file paths.
    FileNames(Vec<String>),
    /// Anything else, identified only by its format tag.
    Other(String),
}

impl DragPayload {
    pub fn format(&self) -> &str {
        match self {
            DragPayload::Nodes(_) => NODE_FORMAT,
            DragPayload::FileNames(_) => FILE_NAMES_FORMAT,
            DragPayload::Other(format) => format.as_str(),
        }
    }

    /// Paths carried by the payload, if it is one the tree understands.
    pub fn paths(&self) -> Option<&[String]> {
        match self {
            DragPayload::Nodes(paths) | DragPayload::FileNames(paths) => Some(paths.as_slice()),
            DragPayload::Other(_) => None,
        }
    }

    /// Serialize for the drag/drop subsystem's byte transport.
    pub fn encode(&self) -> Result<Vec<u8>, String> {
        rmp_serde::to_vec(self).map_err(|e| format!("Failed to encode drag payload: {e}"))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, String> {
        rmp_serde::from_slice(bytes).map_err(|e| format!("Failed to decode drag payload: {e}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropEffect {
    Move,
    None,
}

// ─── Package entry selection ─────────────────────────────────────────────

/// Chooses which entries of a dropped package get opened.
pub trait EntrySelector {
    fn select(&self, archive: &str, entries: &[String]) -> Vec<String>;
}

impl<F> EntrySelector for F
where
    F: Fn(&str, &[String]) -> Vec<String>,
{
    fn select(&self, archive: &str, entries: &[String]) -> Vec<String> {
        self(archive, entries)
    }
}

/// Picks entries whose extension is listed in `DropConfig::entry_extensions`.
#[derive(Debug, Clone, Default)]
pub struct ExtensionSelector {
    config: DropConfig,
}

impl ExtensionSelector {
    pub fn new(config: DropConfig) -> Self {
        Self { config }
    }
}

impl EntrySelector for ExtensionSelector {
    fn select(&self, _archive: &str, entries: &[String]) -> Vec<String> {
        entries
            .iter()
            .filter(|e| self.config.is_default_entry(e))
            .cloned()
            .collect()
    }
}

// ─── Coordinator ─────────────────────────────────────────────────────────

pub struct DropCoordinator {
    list: Arc<AssemblyList>,
    loader: Arc<dyn AssemblyLoader + Send + Sync>,
    config: DropConfig,
    selector: Box<dyn EntrySelector + Send + Sync>,
}

impl DropCoordinator {
    pub fn new(
        list: Arc<AssemblyList>,
        loader: Arc<dyn AssemblyLoader + Send + Sync>,
        config: DropConfig,
    ) -> Self {
        let selector = Box::new(ExtensionSelector::new(config.clone()));
        Self {
            list,
            loader,
            config,
            selector,
        }
    }

    #[must_use]
    pub fn with_selector(mut self, selector: impl EntrySelector + Send + Sync + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    pub fn list(&self) -> &Arc<AssemblyList> {
        &self.list
    }

    /// Whether the payload can land in the list, and with which effect.
    pub fn can_accept(&self, payload: &DragPayload) -> (bool, DropEffect) {
        match payload {
            DragPayload::Nodes(_) | DragPayload::FileNames(_) => (true, DropEffect::Move),
            DragPayload::Other(_) => (false, DropEffect::None),
        }
    }

    /// Open or look up every path in the payload, then place the resulting
    /// assemblies at `index`, in payload order. Paths that fail to open are
    /// skipped; the rest still land.
    pub fn perform(&self, payload: &DragPayload, index: usize) -> Vec<Assembly> {
        let Some(paths) = payload.paths() else {
            return Vec::new();
        };

        let mut guard = self.list.lock();
        let mut resolved: Vec<Assembly> = Vec::new();
        for path in paths.iter().filter(|p| !p.is_empty()) {
            for asm in self.open(&mut guard, path) {
                if !resolved.contains(&asm) {
                    resolved.push(asm);
                }
            }
        }

        let mut index = index;
        for asm in &resolved {
            if let Some(at) = guard.index_of(asm) {
                if at < index {
                    index -= 1;
                }
                guard.remove_at(at);
            }
        }
        for asm in resolved.iter().rev() {
            guard.insert(index, asm.clone());
        }
        log::debug!("dropped {} assemblies at {index}", resolved.len());
        resolved
    }

    fn open(&self, guard: &mut ListGuard<'_>, path: &str) -> Vec<Assembly> {
        if !self.config.is_package(path) {
            return match guard.open(&SourcePath::parse(path), self.loader.as_ref()) {
                Ok(asm) => vec![asm],
                Err(err) => {
                    log::warn!("cannot open {path}: {err}");
                    Vec::new()
                }
            };
        }

        let entries = match self.loader.entries(path) {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!("cannot read package {path}: {err}");
                return Vec::new();
            }
        };
        self.selector
            .select(path, &entries)
            .iter()
            .filter_map(|entry| {
                let source = SourcePath::package_entry(path, entry);
                guard
                    .open(&source, self.loader.as_ref())
                    .map_err(|err| log::warn!("cannot open {source}: {err}"))
                    .ok()
            })
            .collect()
    }
}

impl AssemblyTree {
    pub fn can_drop(&self, coordinator: &DropCoordinator, payload: &DragPayload) -> (bool, DropEffect) {
        coordinator.can_accept(payload)
    }

    /// Perform a drop onto the root and bring the tree up to date.
    pub fn drop_payload(
        &mut self,
        coordinator: &DropCoordinator,
        payload: &DragPayload,
        index: usize,
        token: &ThreadToken,
    ) -> Vec<Assembly> {
        self.check(token);
        debug_assert!(
            Arc::ptr_eq(coordinator.list(), self.list()),
            "drop coordinator is bound to a different assembly list"
        );
        let placed = coordinator.perform(payload, index);
        self.pump(token);
        placed
    }
}
