//! Pointer gesture state machine for tree items.
//!
//! Translates press / move / release sequences into selection changes,
//! drag initiation, activation and expansion toggling. The controller owns
//! only gesture state; everything it acts on goes through `GestureHost`.
//!
//! ## Transitions
//!
//! | State | Event | Effect |
//! |-------|-------|--------|
//! | `Idle` | primary press | capture, anchor, maybe double click → `PressedUnconfirmed` |
//! | `PressedUnconfirmed` | move past threshold | ask `can_drag`; if allowed `start_drag` → `Dragging` |
//! | any | release ending a recorded press | drop capture, activate on double click → `Idle` |
//!
//! A release without a press this controller saw is ignored. Hosts call
//! [`DragController::reset`] when node indices may have been reused.

use crate::input::{InputEvent, Modifiers, PointerButton};
use arbor_core::NodeIndex;
use serde::{Deserialize, Serialize};

/// What a gesture acts on: selection, expansion, drag capabilities.
pub trait GestureHost {
    fn is_selected(&self, node: NodeIndex) -> bool;

    /// Selection change for a press on an unselected node.
    fn press_default(&mut self, node: NodeIndex, modifiers: Modifiers);

    /// Selection change for a release on a node that was already selected
    /// when it was pressed.
    fn release_default(&mut self, node: NodeIndex, modifiers: Modifiers);

    /// Pointer moved over `node` without a capture.
    fn move_default(&mut self, _node: NodeIndex, _x: f32, _y: f32) {}

    /// Selected nodes that have no selected ancestor.
    fn top_level_selection(&self) -> Vec<NodeIndex>;

    fn can_drag(&self, node: NodeIndex, selection: &[NodeIndex]) -> bool;

    /// Hand the selection to the external drag/drop subsystem.
    fn start_drag(&mut self, node: NodeIndex, selection: &[NodeIndex]);

    /// Run the node's activation action. Returns true if it was handled.
    fn activate(&mut self, node: NodeIndex) -> bool;

    fn is_root(&self, node: NodeIndex) -> bool;

    fn shows_root_expander(&self) -> bool;

    fn toggle_expanded(&mut self, node: NodeIndex);

    fn is_editing(&self, node: NodeIndex) -> bool;

    fn set_editing(&mut self, node: NodeIndex, editing: bool);
}

/// Drag and double-click thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Horizontal travel that turns a press into a drag. Default: **4.0**.
    pub drag_threshold_x: f32,

    /// Vertical travel that turns a press into a drag. Default: **4.0**.
    pub drag_threshold_y: f32,

    /// Maximum gap between the presses of a double click. Default: **500** ms.
    pub double_click_ms: u64,

    /// Maximum travel between the presses of a double click. Default: **4.0**.
    pub double_click_distance: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            drag_threshold_x: 4.0,
            drag_threshold_y: 4.0,
            double_click_ms: 500,
            double_click_distance: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    PressedUnconfirmed,
    Dragging,
}

#[derive(Debug, Clone, Copy)]
struct Click {
    node: NodeIndex,
    x: f32,
    y: f32,
    time_ms: u64,
}

pub struct DragController {
    config: GestureConfig,
    state: DragState,
    /// Node holding the pointer capture (primary presses only).
    captured: Option<NodeIndex>,
    /// Node and modifiers of the press the next release ends.
    pressed: Option<(NodeIndex, Modifiers)>,
    anchor: (f32, f32),
    was_selected: bool,
    double_click_pending: bool,
    last_click: Option<Click>,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl DragController {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: DragState::Idle,
            captured: None,
            pressed: None,
            anchor: (0.0, 0.0),
            was_selected: false,
            double_click_pending: false,
            last_click: None,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn captured(&self) -> Option<NodeIndex> {
        self.captured
    }

    pub fn double_click_pending(&self) -> bool {
        self.double_click_pending
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Forget the gesture in progress and the last click.
    pub fn reset(&mut self) {
        self.state = DragState::Idle;
        self.captured = None;
        self.pressed = None;
        self.was_selected = false;
        self.double_click_pending = false;
        self.last_click = None;
    }

    /// Feed one event. `target` is the node under the pointer (or with
    /// focus, for keys). Events without a target are ignored unless the
    /// pointer is captured.
    pub fn handle(&mut self, event: &InputEvent, target: Option<NodeIndex>, host: &mut impl GestureHost) {
        match event {
            InputEvent::PointerDown {
                x,
                y,
                button,
                modifiers,
                time_ms,
            } => {
                if let Some(node) = target {
                    let click = Click {
                        node,
                        x: *x,
                        y: *y,
                        time_ms: *time_ms,
                    };
                    self.press(click, *button, *modifiers, host);
                }
            }
            InputEvent::PointerMove { x, y } => self.pointer_move(target, *x, *y, host),
            InputEvent::PointerUp { .. } => self.release(host),
            InputEvent::Key { key, .. } => {
                if let Some(node) = target {
                    self.key(key, node, host);
                }
            }
        }
    }

    fn press(
        &mut self,
        click: Click,
        button: PointerButton,
        modifiers: Modifiers,
        host: &mut impl GestureHost,
    ) {
        let node = click.node;
        self.was_selected = host.is_selected(node);
        self.pressed = Some((node, modifiers));
        if !self.was_selected {
            host.press_default(node, modifiers);
        }
        if button != PointerButton::Primary {
            return;
        }

        self.anchor = (click.x, click.y);
        self.captured = Some(node);
        self.state = DragState::PressedUnconfirmed;

        if self.is_second_click(&click) {
            self.double_click_pending = true;
            self.last_click = None;
        } else {
            self.last_click = Some(click);
        }
        log::trace!(
            "press on {node:?}: was_selected={}, double_click={}",
            self.was_selected,
            self.double_click_pending
        );
    }

    fn is_second_click(&self, click: &Click) -> bool {
        let Some(last) = self.last_click else {
            return false;
        };
        last.node == click.node
            && click.time_ms.saturating_sub(last.time_ms) <= self.config.double_click_ms
            && (click.x - last.x).abs() <= self.config.double_click_distance
            && (click.y - last.y).abs() <= self.config.double_click_distance
    }

    fn pointer_move(&mut self, target: Option<NodeIndex>, x: f32, y: f32, host: &mut impl GestureHost) {
        let Some(node) = self.captured else {
            if let Some(node) = target {
                host.move_default(node, x, y);
            }
            return;
        };
        if self.state != DragState::PressedUnconfirmed {
            return;
        }

        let (ax, ay) = self.anchor;
        if (x - ax).abs() < self.config.drag_threshold_x
            && (y - ay).abs() < self.config.drag_threshold_y
        {
            return;
        }

        let selection = host.top_level_selection();
        if host.can_drag(node, &selection) {
            self.state = DragState::Dragging;
            self.double_click_pending = false;
            self.last_click = None;
            log::trace!("drag started from {node:?} with {} nodes", selection.len());
            host.start_drag(node, &selection);
        }
    }

    fn release(&mut self, host: &mut impl GestureHost) {
        let dragged = self.state == DragState::Dragging;
        self.state = DragState::Idle;
        self.captured = None;
        let was_selected = std::mem::take(&mut self.was_selected);
        let double_click = std::mem::take(&mut self.double_click_pending);
        let Some((node, modifiers)) = self.pressed.take() else {
            return;
        };

        if double_click {
            let handled = host.activate(node);
            log::trace!("double click on {node:?}, handled={handled}");
            if !handled && (!host.is_root(node) || host.shows_root_expander()) {
                host.toggle_expanded(node);
            }
        }
        if was_selected && !dragged {
            host.release_default(node, modifiers);
        }
    }

    /// `Escape` leaves edit mode. `F2` is accepted but does nothing yet.
    pub fn key(&self, key: &str, node: NodeIndex, host: &mut impl GestureHost) {
        // TODO: start in-place rename on F2 once nodes can be renamed.
        if key == "Escape" && host.is_editing(node) {
            host.set_editing(node, false);
        }
    }
}
