//! Interned metadata names.
//!
//! Namespaces, type, member and resource names repeat heavily across the
//! modules of an assembly list, and lookups compare them constantly. Every
//! distinct string is stored once in a process-wide interner.

use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

static NAMES: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Equality and hashing use the interner key. Ordering is by text, so
/// sorted collections of names read alphabetically.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name(Spur);

impl Name {
    pub fn intern(text: &str) -> Self {
        Name(NAMES.get_or_intern(text))
    }

    /// The name for `text` if some module already uses it. Lookups go
    /// through here so that probing for unknown names does not grow the
    /// interner.
    pub fn existing(text: &str) -> Option<Self> {
        NAMES.get(text).map(Name)
    }

    /// The global namespace.
    pub fn empty() -> Self {
        Self::intern("")
    }

    pub fn as_str(&self) -> &'static str {
        NAMES.resolve(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.0 == other.0 {
            return Ordering::Equal;
        }
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Name").field(&self.as_str()).finish()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Name::intern(&text))
    }
}
