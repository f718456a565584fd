//! Tree configuration.
//!
//! All fields have defaults, so a partial JSON document (or none at all)
//! yields a usable configuration.

use serde::{Deserialize, Serialize};

/// Which definitions are shown. Filtered nodes still exist in the tree,
/// flagged `hidden`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Show internal and private definitions. Default: **false**.
    pub show_non_public: bool,

    /// Show property/event accessor methods under their owner. Default: **true**.
    pub show_accessors: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            show_non_public: false,
            show_accessors: true,
        }
    }
}

/// How dropped files are opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropConfig {
    /// Files with these extensions are packages: their entries are listed
    /// and a subset is opened instead of the file itself.
    pub package_extensions: Vec<String>,

    /// Package entries selected by default.
    pub entry_extensions: Vec<String>,
}

impl Default for DropConfig {
    fn default() -> Self {
        Self {
            package_extensions: vec![".nupkg".to_string()],
            entry_extensions: vec![".dll".to_string(), ".exe".to_string()],
        }
    }
}

impl DropConfig {
    pub fn is_package(&self, path: &str) -> bool {
        has_extension(path, &self.package_extensions)
    }

    pub fn is_default_entry(&self, entry: &str) -> bool {
        has_extension(entry, &self.entry_extensions)
    }
}

fn has_extension(path: &str, extensions: &[String]) -> bool {
    let path = path.to_ascii_lowercase();
    extensions
        .iter()
        .any(|ext| path.ends_with(&ext.to_ascii_lowercase()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Display the assembly list node itself. Default: **false**.
    pub show_root: bool,

    /// Let the root node expand/collapse on double click. Default: **false**.
    pub show_root_expander: bool,

    pub filter: FilterSettings,

    pub drop: DropConfig,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            show_root: false,
            show_root_expander: false,
            filter: FilterSettings::default(),
            drop: DropConfig::default(),
        }
    }
}

impl TreeConfig {
    /// # Errors
    /// Returns the `serde_json` error message if `json` is malformed.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Invalid tree config: {e}"))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = TreeConfig::from_json(r#"{ "filter": { "show_non_public": true } }"#).unwrap();
        assert!(config.filter.show_non_public);
        assert!(config.filter.show_accessors);
        assert!(!config.show_root_expander);
        assert_eq!(config.drop, DropConfig::default());
    }

    #[test]
    fn json_roundtrip() {
        let mut config = TreeConfig::default();
        config.show_root_expander = true;
        config.drop.entry_extensions.push(".winmd".to_string());
        assert_eq!(TreeConfig::from_json(&config.to_json()).unwrap(), config);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = TreeConfig::from_json("{ show_root: yes").unwrap_err();
        assert!(err.starts_with("Invalid tree config"));
    }

    #[test]
    fn extension_matching_ignores_case() {
        let drop = DropConfig::default();
        assert!(drop.is_package("/tmp/Foo.1.0.NUPKG"));
        assert!(!drop.is_package("/tmp/Foo.dll"));
        assert!(drop.is_default_entry("lib/net8.0/Foo.dll"));
        assert!(!drop.is_default_entry("lib/net8.0/Foo.xml"));
    }
}
