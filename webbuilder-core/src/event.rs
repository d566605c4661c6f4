//! Input events into the editor and notifications out of it.

use serde::{Deserialize, Serialize};

use crate::drag::{DragPayload, DropIndicator};
use crate::element::ElementId;
use crate::selection::Overlay;
use crate::style::{Breakpoint, InteractionState, StyleMap};

/// Phase of a pointer or drag event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed / drag started.
    Down,
    /// Pointer moved.
    Move,
    /// Button released / dropped.
    Up,
    /// Gesture abandoned.
    Cancel,
}

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct KeyModifiers {
    /// Shift key pressed.
    #[serde(default)]
    pub shift: bool,
    /// Control key pressed.
    #[serde(default)]
    pub ctrl: bool,
    /// Alt/Option key pressed.
    #[serde(default)]
    pub alt: bool,
    /// Meta/Command key pressed.
    #[serde(default)]
    pub meta: bool,
}

impl KeyModifiers {
    /// No modifiers.
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Control only.
    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };

    /// Shift only.
    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    /// Ctrl on Linux/Windows or Cmd on macOS.
    #[must_use]
    pub const fn primary(self) -> bool {
        self.ctrl || self.meta
    }
}

/// All input events the canvas can receive, in screen coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputEvent {
    /// Pointer (mouse) event over the canvas.
    Pointer {
        /// X coordinate.
        x: f32,
        /// Y coordinate.
        y: f32,
        /// Mouse button (0 = left, 1 = middle, 2 = right).
        #[serde(default)]
        button: u8,
        /// Event phase.
        phase: PointerPhase,
    },

    /// HTML5 drag event over the canvas.
    Drag {
        /// X coordinate.
        x: f32,
        /// Y coordinate.
        y: f32,
        /// Event phase (`down` starts the drag, `up` drops).
        phase: PointerPhase,
        /// Payload, required when the drag starts.
        #[serde(default)]
        payload: Option<DragPayload>,
    },

    /// Keyboard event.
    Key {
        /// Key name (`z`, `Delete`, `ArrowUp`, ...).
        key: String,
        /// Whether the key is pressed.
        #[serde(default = "InputEvent::default_pressed")]
        pressed: bool,
        /// Active modifier keys.
        #[serde(default)]
        modifiers: KeyModifiers,
    },

    /// Pointer entered an element.
    HoverEnter {
        /// Hovered element.
        element: ElementId,
    },

    /// Pointer left an element.
    HoverLeave {
        /// Element left.
        element: ElementId,
    },
}

impl InputEvent {
    const fn default_pressed() -> bool {
        true
    }

    /// A key press.
    pub fn key(key: impl Into<String>, modifiers: KeyModifiers) -> Self {
        Self::Key {
            key: key.into(),
            pressed: true,
            modifiers,
        }
    }

    /// A left-button pointer event.
    #[must_use]
    pub const fn pointer(x: f32, y: f32, phase: PointerPhase) -> Self {
        Self::Pointer {
            x,
            y,
            button: 0,
            phase,
        }
    }
}

/// Notification for the surrounding UI, drained with
/// [`CanvasController::take_events`](crate::CanvasController::take_events).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditorEvent {
    /// Selection changed; `styles` are the resolved values for the panel.
    SelectionChanged {
        /// Selected element, `None` when cleared.
        element: Option<ElementId>,
        /// Resolved styles for the current state and breakpoint.
        styles: StyleMap,
    },
    /// Selection overlay moved or changed handles.
    OverlayChanged {
        /// New overlay.
        overlay: Overlay,
    },
    /// Canvas content changed (tree, styles or text).
    ContentChanged,
    /// Undo/redo availability changed.
    HistoryChanged {
        /// An undo is possible.
        can_undo: bool,
        /// A redo is possible.
        can_redo: bool,
    },
    /// The simulated breakpoint changed.
    BreakpointChanged {
        /// New breakpoint.
        breakpoint: Breakpoint,
        /// Simulated viewport width in pixels.
        viewport_width: f32,
    },
    /// The interaction state being edited changed.
    StateChanged {
        /// New state.
        state: InteractionState,
    },
    /// The drag indicator changed.
    DropIndicatorChanged {
        /// New indicator.
        indicator: DropIndicator,
    },
}
