//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `TreeAction`s for the focused
//! tree item. Keys follow `KeyboardEvent.key` naming.

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeAction {
    // ── Navigation ──
    Expand,
    Collapse,
    /// Run the item's activation action (Enter).
    Activate,

    // ── List ──
    /// Remove the selected assemblies from the list.
    Unload,
    /// Put the selected assemblies in name order.
    SortList,

    // ── Editing ──
    CancelEdit,
    BeginRename,
}

/// Resolves key events into tree actions.
///
/// On macOS `meta` is ⌘, on other platforms `ctrl` serves the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
    ) -> Option<TreeAction> {
        let cmd = ctrl || meta;

        if cmd && shift {
            return match key {
                "s" | "S" => Some(TreeAction::SortList),
                _ => None,
            };
        }

        if cmd || alt {
            return None;
        }

        match key {
            "ArrowRight" | "Right" | "+" => Some(TreeAction::Expand),
            "ArrowLeft" | "Left" | "-" => Some(TreeAction::Collapse),
            "Enter" => Some(TreeAction::Activate),
            "Delete" => Some(TreeAction::Unload),
            "Escape" => Some(TreeAction::CancelEdit),
            "F2" => Some(TreeAction::BeginRename),
            _ => None,
        }
    }
}
