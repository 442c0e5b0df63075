//! Imprint Core
//!
//! Editor state shared by the loaders, the capture pipeline and the host:
//!
//! - **Style State**: the overlay text and its font, color and size
//! - **Editing State Machine**: viewing/editing, picker tabs, caret, focus
//! - **Load Status**: per-resource status and overall readiness
//!
//! # Example
//!
//! ```rust
//! use imprint_core::{EditingMachine, EditMode, FocusTarget, EditorElement, Tool};
//!
//! let mut editing = EditingMachine::new(false);
//! editing.begin_editing("Hello", true);
//! assert_eq!(editing.caret(), Some(5));
//!
//! // Picking a color moves focus inside the editor: still editing
//! editing.blur(FocusTarget::Editor(EditorElement::ToolButton(Tool::Color)));
//! assert_eq!(editing.mode(), EditMode::Editing);
//! ```

pub mod caret;
pub mod color;
pub mod editing;
pub mod fsm;
pub mod status;
pub mod style;

pub use caret::{CaretBlink, CARET_BLINK_INTERVAL};
pub use color::Color;
pub use editing::{
    EditMode, EditingMachine, EditingState, EditorEffect, EditorElement, FocusTarget, Tool,
};
pub use fsm::{StateMachine, Transition};
pub use status::{LoadStatus, Readiness};
pub use style::{StyleState, PLACEHOLDER_TEXT};
