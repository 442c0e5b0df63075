//! Editing state machine
//!
//! Governs whether the overlay text is being viewed or edited, which style
//! picker tab is active, where the caret sits, and which side effects the host
//! has to apply (focus, scroll, caret blink).
//!
//! ```text
//!   Viewing ──begin (image ready)──▶ Editing{Font}
//!   Editing ──close──────────────────▶ Viewing
//!   Editing ──blur to outside/none───▶ Viewing
//!   Editing ──blur to editor element─▶ Editing   (no transition)
//! ```

use crate::fsm::{StateMachine, Transition};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level editing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditMode {
    Viewing,
    Editing,
}

/// Style picker tab shown in the toolbar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tool {
    None,
    Size,
    Color,
    #[default]
    Font,
}

/// Snapshot of the editing state. `active_tool` is only meaningful while
/// editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditingState {
    pub mode: EditMode,
    pub active_tool: Tool,
}

/// Elements that make up the editor's subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorElement {
    Root,
    TextInput,
    Toolbar,
    ToolButton(Tool),
    EditButton,
    CloseButton,
    FontOption,
    ColorSwatch,
    SizeOption,
}

/// Where focus went when the text input lost it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    /// An element inside the editor subtree
    Editor(EditorElement),
    /// A focusable element elsewhere on the page
    Outside,
    /// No focusable element received focus
    Nowhere,
}

impl FocusTarget {
    pub fn is_inside_editor(&self) -> bool {
        matches!(self, FocusTarget::Editor(_))
    }
}

/// Side effects the host applies after a transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditorEffect {
    /// Focus the text input with the caret at this character offset
    FocusInput { caret: usize },
    /// Scroll the overlay above an on-screen keyboard
    ScrollIntoView { top_fraction: f32, delay: Duration },
    StartCaretBlink,
    StopCaretBlink,
}

/// Delay before the touch-viewport scroll
pub const SCROLL_DELAY: Duration = Duration::from_millis(100);

/// Scroll target as a fraction of the viewport height
pub const SCROLL_TOP_FRACTION: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditEvent {
    Begin,
    Close,
    BlurOutside,
}

#[derive(Debug, Default)]
struct EditContext {
    touch_viewport: bool,
    image_ready: bool,
    text_len: usize,
    active_tool: Tool,
    caret: Option<usize>,
    effects: Vec<EditorEffect>,
}

/// The editor's viewing/editing machine
pub struct EditingMachine {
    fsm: StateMachine<EditMode, EditEvent, EditContext>,
    ctx: EditContext,
}

impl EditingMachine {
    /// Create a machine in `Viewing`. `touch_viewport` enables the keyboard
    /// scroll effect on entering `Editing`.
    pub fn new(touch_viewport: bool) -> Self {
        let fsm = StateMachine::builder(EditMode::Viewing)
            .transition(
                Transition::new(EditMode::Viewing, EditEvent::Begin, EditMode::Editing)
                    .with_guard(|ctx: &EditContext| ctx.image_ready),
            )
            .on(EditMode::Editing, EditEvent::Close, EditMode::Viewing)
            .on(EditMode::Editing, EditEvent::BlurOutside, EditMode::Viewing)
            .on_enter(EditMode::Editing, |ctx: &mut EditContext| {
                ctx.active_tool = Tool::Font;
                ctx.effects.push(EditorEffect::StopCaretBlink);
                place_caret_at_end(ctx);
                if ctx.touch_viewport {
                    ctx.effects.push(EditorEffect::ScrollIntoView {
                        top_fraction: SCROLL_TOP_FRACTION,
                        delay: SCROLL_DELAY,
                    });
                }
            })
            .on_enter(EditMode::Viewing, |ctx: &mut EditContext| {
                ctx.caret = None;
                ctx.effects.push(EditorEffect::StartCaretBlink);
            })
            .build();

        Self {
            fsm,
            ctx: EditContext {
                touch_viewport,
                ..Default::default()
            },
        }
    }

    pub fn mode(&self) -> EditMode {
        self.fsm.current_state()
    }

    pub fn is_editing(&self) -> bool {
        self.fsm.is_in(EditMode::Editing)
    }

    pub fn state(&self) -> EditingState {
        EditingState {
            mode: self.mode(),
            active_tool: self.ctx.active_tool,
        }
    }

    pub fn active_tool(&self) -> Tool {
        self.ctx.active_tool
    }

    /// Caret offset (in characters) while editing
    pub fn caret(&self) -> Option<usize> {
        self.ctx.caret
    }

    /// Start editing `text`. Refused until the image is ready, since the
    /// overlay is not shown before that. Calling it while already editing
    /// (the toolbar's edit button) re-focuses with the caret at the end.
    pub fn begin_editing(&mut self, text: &str, image_ready: bool) -> Vec<EditorEffect> {
        self.ctx.text_len = text.chars().count();
        self.ctx.image_ready = image_ready;

        if self.is_editing() {
            place_caret_at_end(&mut self.ctx);
        } else {
            self.fsm.send(EditEvent::Begin, &mut self.ctx);
        }
        self.take_effects()
    }

    /// Explicit close button
    pub fn close(&mut self) -> Vec<EditorEffect> {
        self.fsm.send(EditEvent::Close, &mut self.ctx);
        self.take_effects()
    }

    /// The text input lost focus to `related`
    pub fn blur(&mut self, related: FocusTarget) -> Vec<EditorEffect> {
        if related.is_inside_editor() {
            tracing::trace!("blur to {:?} stays in editor", related);
        } else {
            self.fsm.send(EditEvent::BlurOutside, &mut self.ctx);
        }
        self.take_effects()
    }

    /// Switch the picker tab. Ignored outside `Editing`.
    pub fn select_tool(&mut self, tool: Tool) -> bool {
        if !self.is_editing() {
            return false;
        }
        self.ctx.active_tool = tool;
        true
    }

    /// The text changed while editing; the caret follows the typed text
    pub fn text_changed(&mut self, text: &str) {
        self.ctx.text_len = text.chars().count();
        if self.is_editing() {
            self.ctx.caret = Some(self.ctx.text_len);
        }
    }

    /// Move the caret, clamped to the text length
    pub fn set_caret(&mut self, offset: usize) {
        if self.is_editing() {
            self.ctx.caret = Some(offset.min(self.ctx.text_len));
        }
    }

    /// Give focus back to the text input after a style pick, keeping the
    /// caret where it is
    pub fn refocus_input(&mut self) -> Vec<EditorEffect> {
        match self.ctx.caret {
            Some(caret) if self.is_editing() => vec![EditorEffect::FocusInput { caret }],
            _ => Vec::new(),
        }
    }

    fn take_effects(&mut self) -> Vec<EditorEffect> {
        std::mem::take(&mut self.ctx.effects)
    }
}

fn place_caret_at_end(ctx: &mut EditContext) {
    ctx.caret = Some(ctx.text_len);
    ctx.effects.push(EditorEffect::FocusInput {
        caret: ctx.text_len,
    });
}
