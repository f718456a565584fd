//! Arbor editor: pointer gestures, keyboard shortcuts and the interactive
//! session layered over an `arbor_core::AssemblyTree`.

pub mod gesture;
pub mod input;
pub mod session;
pub mod shortcuts;

pub use gesture::{DragController, DragState, GestureConfig, GestureHost};
pub use input::{InputEvent, Modifiers, PointerButton};
pub use session::{Activator, TreeSession};
pub use shortcuts::{ShortcutMap, TreeAction};
