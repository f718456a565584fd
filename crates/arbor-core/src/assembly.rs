//! Loaded assemblies and the shared assembly list backing the tree root.
//!
//! The list is shared between threads (files may be opened from anywhere),
//! so its contents live behind a single lock. Every mutation records a
//! `CollectionChange` in the queue of each `Subscription`; a tree drains its
//! own queue on its owner thread and replays the changes through the
//! collection synchronizer, one at a time.

use crate::metadata::Module;
use crate::name::Name;
use crate::parser::parse_outline;
use crate::sync::CollectionChange;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

// ─── Errors ──────────────────────────────────────────────────────────────

/// Why a path could not be turned into an assembly.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("invalid assembly image {path}: {reason}")]
    InvalidImage { path: String, reason: String },

    #[error("cannot read package {path}: {reason}")]
    Package { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ─── Paths ───────────────────────────────────────────────────────────────

/// A location an assembly can be opened from: a plain file, or an entry
/// inside a package, written `scheme://archive;entry`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourcePath {
    File(String),
    PackageEntry {
        scheme: String,
        archive: String,
        entry: String,
    },
}

impl SourcePath {
    pub fn parse(path: &str) -> Self {
        if let Some((scheme, rest)) = path.split_once("://")
            && let Some((archive, entry)) = rest.rsplit_once(';')
            && !scheme.is_empty()
        {
            return SourcePath::PackageEntry {
                scheme: scheme.to_string(),
                archive: archive.to_string(),
                entry: entry.to_string(),
            };
        }
        SourcePath::File(path.to_string())
    }

    pub fn package_entry(archive: &str, entry: &str) -> Self {
        let scheme = archive
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "package".to_string());
        SourcePath::PackageEntry {
            scheme,
            archive: archive.to_string(),
            entry: entry.to_string(),
        }
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourcePath::File(path) => f.write_str(path),
            SourcePath::PackageEntry {
                scheme,
                archive,
                entry,
            } => write!(f, "{scheme}://{archive};{entry}"),
        }
    }
}

// ─── Assemblies ──────────────────────────────────────────────────────────

/// One entry of the assembly list. The module is `None` when the file was
/// listed but its metadata could not be read.
#[derive(Debug)]
pub struct LoadedAssembly {
    file_name: String,
    short_name: Name,
    module: Option<Module>,
    load_error: Option<String>,
}

impl LoadedAssembly {
    pub fn new(file_name: impl Into<String>, module: Module) -> Self {
        let file_name = file_name.into();
        Self {
            short_name: short_name_of(&file_name),
            file_name,
            module: Some(module),
            load_error: None,
        }
    }

    /// An assembly that stays listed even though loading its metadata failed.
    pub fn failed(file_name: impl Into<String>, reason: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            short_name: short_name_of(&file_name),
            file_name,
            module: None,
            load_error: Some(reason.into()),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn short_name(&self) -> Name {
        self.short_name
    }

    pub fn module(&self) -> Option<&Module> {
        self.module.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.module.is_some()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }
}

fn short_name_of(file_name: &str) -> Name {
    let base = file_name
        .rsplit(['/', '\\', ';'])
        .next()
        .unwrap_or(file_name);
    let stem = match base.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && ["dll", "exe", "winmd"].contains(&ext.to_ascii_lowercase().as_str()) =>
        {
            stem
        }
        _ => base,
    };
    Name::intern(stem)
}

/// Shared handle to a `LoadedAssembly`. Equality is identity.
#[derive(Clone)]
pub struct Assembly(Arc<LoadedAssembly>);

impl Assembly {
    pub fn new(loaded: LoadedAssembly) -> Self {
        Assembly(Arc::new(loaded))
    }
}

impl Deref for Assembly {
    type Target = LoadedAssembly;

    fn deref(&self) -> &LoadedAssembly {
        &self.0
    }
}

impl PartialEq for Assembly {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Assembly {}

impl fmt::Debug for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Assembly({} @ {:p})", self.0.file_name, Arc::as_ptr(&self.0))
    }
}

// ─── Loader ──────────────────────────────────────────────────────────────

/// Opens assemblies by path. Implemented by the host: a real metadata
/// reader, or an in-memory table in tests.
pub trait AssemblyLoader {
    /// Load a plain assembly file.
    fn load(&self, path: &str) -> Result<LoadedAssembly, LoadError>;

    /// List the entry names inside a package.
    fn entries(&self, archive: &str) -> Result<Vec<String>, LoadError>;

    /// Load one package entry addressed by its composite path.
    fn load_entry(&self, path: &SourcePath) -> Result<LoadedAssembly, LoadError>;
}

/// Loader backed by module outlines held in memory, keyed by path.
/// Package entries are keyed by their composite path string.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    files: HashMap<String, String>,
    packages: HashMap<String, Vec<String>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file whose content is a module outline.
    pub fn with_file(mut self, path: &str, outline: &str) -> Self {
        self.files.insert(path.to_string(), outline.to_string());
        self
    }

    /// Register a package with `(entry name, outline)` pairs.
    pub fn with_package(mut self, archive: &str, entries: &[(&str, &str)]) -> Self {
        let mut names = Vec::with_capacity(entries.len());
        for (entry, outline) in entries {
            let path = SourcePath::package_entry(archive, entry).to_string();
            self.files.insert(path, (*outline).to_string());
            names.push((*entry).to_string());
        }
        self.packages.insert(archive.to_string(), names);
        self
    }

    fn load_outline(&self, path: &str) -> Result<LoadedAssembly, LoadError> {
        let text = self
            .files
            .get(path)
            .ok_or_else(|| LoadError::NotFound(path.to_string()))?;
        let module = parse_outline(text).map_err(|reason| LoadError::InvalidImage {
            path: path.to_string(),
            reason,
        })?;
        Ok(LoadedAssembly::new(path, module))
    }
}

impl AssemblyLoader for MemoryLoader {
    fn load(&self, path: &str) -> Result<LoadedAssembly, LoadError> {
        self.load_outline(path)
    }

    fn entries(&self, archive: &str) -> Result<Vec<String>, LoadError> {
        self.packages
            .get(archive)
            .cloned()
            .ok_or_else(|| LoadError::Package {
                path: archive.to_string(),
                reason: "not a known package".to_string(),
            })
    }

    fn load_entry(&self, path: &SourcePath) -> Result<LoadedAssembly, LoadError> {
        self.load_outline(&path.to_string())
    }
}

/// Loader reading module outlines from disk. A package is a directory;
/// its entries are the files below it, as `/`-separated relative paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl FileLoader {
    fn load_outline(&self, path: &Path, file_name: String) -> Result<LoadedAssembly, LoadError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound(file_name));
            }
            Err(err) => return Err(err.into()),
        };
        let module = parse_outline(&text).map_err(|reason| LoadError::InvalidImage {
            path: file_name.clone(),
            reason,
        })?;
        Ok(LoadedAssembly::new(file_name, module))
    }
}

impl AssemblyLoader for FileLoader {
    fn load(&self, path: &str) -> Result<LoadedAssembly, LoadError> {
        self.load_outline(Path::new(path), path.to_string())
    }

    fn entries(&self, archive: &str) -> Result<Vec<String>, LoadError> {
        let root = Path::new(archive);
        if !root.is_dir() {
            return Err(LoadError::Package {
                path: archive.to_string(),
                reason: "not a package directory".to_string(),
            });
        }
        let mut entries = Vec::new();
        collect_entries(root, root, &mut entries)?;
        entries.sort();
        Ok(entries)
    }

    fn load_entry(&self, path: &SourcePath) -> Result<LoadedAssembly, LoadError> {
        match path {
            SourcePath::PackageEntry { archive, entry, .. } => {
                self.load_outline(&Path::new(archive).join(entry), path.to_string())
            }
            SourcePath::File(file) => self.load(file),
        }
    }
}

fn collect_entries(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), LoadError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_entries(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            out.push(parts.join("/"));
        }
    }
    Ok(())
}

// ─── Assembly list ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ListState {
    assemblies: Vec<Assembly>,
    /// Pending changes per subscription id.
    queues: HashMap<u64, Vec<CollectionChange<Assembly>>>,
    next_subscription: u64,
}

impl ListState {
    fn record(&mut self, change: CollectionChange<Assembly>) {
        for queue in self.queues.values_mut() {
            queue.push(change.clone());
        }
    }
}

/// The ordered, shared list of open assemblies.
#[derive(Debug)]
pub struct AssemblyList {
    name: String,
    state: Mutex<ListState>,
}

impl AssemblyList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(ListState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take the list lock. Held for the duration of a drop.
    pub fn lock(&self) -> ListGuard<'_> {
        ListGuard(self.state.lock())
    }

    pub fn snapshot(&self) -> Vec<Assembly> {
        self.state.lock().assemblies.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().assemblies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&self, assembly: Assembly) {
        self.lock().push(assembly);
    }

    pub fn insert(&self, index: usize, assembly: Assembly) {
        self.lock().insert(index, assembly);
    }

    /// Unload an assembly. Returns false if it was not listed.
    pub fn remove(&self, assembly: &Assembly) -> bool {
        let mut guard = self.lock();
        match guard.index_of(assembly) {
            Some(index) => {
                guard.remove_at(index);
                true
            }
            None => false,
        }
    }

    /// Swap the assembly at `index` in place (hot reload). Produces a
    /// `Replace` change, which the tree does not support.
    pub fn replace(&self, index: usize, assembly: Assembly) -> Option<Assembly> {
        let mut state = self.state.lock();
        let slot = state.assemblies.get_mut(index)?;
        let old = std::mem::replace(slot, assembly.clone());
        state.record(CollectionChange::Replace {
            at: index,
            items: vec![assembly],
        });
        Some(old)
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.assemblies.clear();
        state.record(CollectionChange::Reset { items: Vec::new() });
    }

    /// Sort by short name; observed as a reset.
    pub fn sort_by_name(&self) {
        let mut state = self.state.lock();
        state
            .assemblies
            .sort_by(|a, b| a.short_name().as_str().cmp(b.short_name().as_str()));
        let items = state.assemblies.clone();
        state.record(CollectionChange::Reset { items });
    }

    /// Open `path` with `loader`, or return the already listed assembly
    /// with that file name. New assemblies are appended.
    pub fn open(&self, path: &str, loader: &dyn AssemblyLoader) -> Result<Assembly, LoadError> {
        self.lock().open(&SourcePath::parse(path), loader)
    }

    /// Start observing changes. Returns the subscription together with the
    /// contents it starts from; every later mutation lands in its queue.
    pub fn subscribe(self: &Arc<Self>) -> (Subscription, Vec<Assembly>) {
        let mut state = self.state.lock();
        let id = state.next_subscription;
        state.next_subscription += 1;
        state.queues.insert(id, Vec::new());
        let subscription = Subscription {
            list: Arc::clone(self),
            id,
        };
        (subscription, state.assemblies.clone())
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().queues.len()
    }
}

/// One observer's queue of list changes. Unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription {
    list: Arc<AssemblyList>,
    id: u64,
}

impl Subscription {
    pub fn list(&self) -> &Arc<AssemblyList> {
        &self.list
    }

    /// Drain this subscription's pending changes, oldest first.
    pub fn take_changes(&self) -> Vec<CollectionChange<Assembly>> {
        self.list
            .state
            .lock()
            .queues
            .get_mut(&self.id)
            .map(std::mem::take)
            .unwrap_or_default()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.list.state.lock().queues.remove(&self.id);
    }
}

/// Exclusive access to the assembly list.
pub struct ListGuard<'a>(MutexGuard<'a, ListState>);

impl ListGuard<'_> {
    pub fn assemblies(&self) -> &[Assembly] {
        &self.0.assemblies
    }

    pub fn len(&self) -> usize {
        self.0.assemblies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.assemblies.is_empty()
    }

    pub fn index_of(&self, assembly: &Assembly) -> Option<usize> {
        self.0.assemblies.iter().position(|a| a == assembly)
    }

    pub fn find_by_file(&self, file_name: &str) -> Option<Assembly> {
        self.0
            .assemblies
            .iter()
            .find(|a| a.file_name() == file_name)
            .cloned()
    }

    pub fn push(&mut self, assembly: Assembly) {
        let at = self.0.assemblies.len();
        self.insert(at, assembly);
    }

    /// Insert at `index`, clamped to the list length.
    pub fn insert(&mut self, index: usize, assembly: Assembly) {
        let at = index.min(self.0.assemblies.len());
        self.0.assemblies.insert(at, assembly.clone());
        self.0.record(CollectionChange::Insert {
            at,
            items: vec![assembly],
        });
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Assembly> {
        if index >= self.0.assemblies.len() {
            return None;
        }
        let removed = self.0.assemblies.remove(index);
        self.0.record(CollectionChange::Remove {
            at: index,
            count: 1,
        });
        Some(removed)
    }

    /// Open a plain file or a package entry. Already listed paths return the
    /// listed assembly; anything new is appended.
    pub fn open(
        &mut self,
        path: &SourcePath,
        loader: &dyn AssemblyLoader,
    ) -> Result<Assembly, LoadError> {
        let file_name = path.to_string();
        if let Some(existing) = self.find_by_file(&file_name) {
            return Ok(existing);
        }
        let loaded = match path {
            SourcePath::File(p) => loader.load(p)?,
            SourcePath::PackageEntry { .. } => loader.load_entry(path)?,
        };
        let assembly = Assembly::new(loaded);
        log::debug!("opened {file_name}");
        self.push(assembly.clone());
        Ok(assembly)
    }
}
