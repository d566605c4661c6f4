//! Single selection with overlay, resize handles and positioned moves.
//!
//! ```text
//! Idle ──select──► Selected ──begin_resize──► Resizing ──┐
//!  ▲                 │   ▲ ──begin_move────► Moving ─────┤ drag_to*
//!  └───deselect──────┘   └────────── end_gesture ────────┘
//! ```
//!
//! Live resize/move previews write the element's applied styles and
//! bounds only. The final geometry reaches the style store when the
//! gesture ends, in the `base` state of the breakpoint being edited.

use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::element::{ElementId, Point, Positioning, Rect};
use crate::resolver::StyleResolver;
use crate::style::{Breakpoint, InteractionState, StyleMap};

/// Default minimum width/height while resizing.
pub const DEFAULT_MIN_SIZE: f32 = 10.0;

/// One of the eight overlay handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    /// Top edge.
    N,
    /// Top-right corner.
    Ne,
    /// Right edge.
    E,
    /// Bottom-right corner.
    Se,
    /// Bottom edge.
    S,
    /// Bottom-left corner.
    Sw,
    /// Left edge.
    W,
    /// Top-left corner.
    Nw,
}

impl ResizeHandle {
    /// All handles clockwise from the top edge.
    pub const ALL: [Self; 8] = [
        Self::N,
        Self::Ne,
        Self::E,
        Self::Se,
        Self::S,
        Self::Sw,
        Self::W,
        Self::Nw,
    ];

    /// Handles that only grow the box right and down.
    pub const FLOW: [Self; 3] = [Self::E, Self::S, Self::Se];

    const fn north(self) -> bool {
        matches!(self, Self::N | Self::Ne | Self::Nw)
    }

    const fn south(self) -> bool {
        matches!(self, Self::S | Self::Se | Self::Sw)
    }

    const fn east(self) -> bool {
        matches!(self, Self::E | Self::Ne | Self::Se)
    }

    const fn west(self) -> bool {
        matches!(self, Self::W | Self::Nw | Self::Sw)
    }

    /// Where the handle sits on a box.
    #[must_use]
    pub fn anchor(self, rect: Rect) -> Point {
        let x = if self.west() {
            rect.x
        } else if self.east() {
            rect.x + rect.width
        } else {
            rect.x + rect.width / 2.0
        };
        let y = if self.north() {
            rect.y
        } else if self.south() {
            rect.y + rect.height
        } else {
            rect.y + rect.height / 2.0
        };
        Point::new(x, y)
    }
}

/// Current state of the selection machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Nothing selected.
    Idle,
    /// An element is selected.
    Selected,
    /// A resize handle is being dragged.
    Resizing,
    /// A positioned element is being dragged.
    Moving,
}

impl SelectionMode {
    /// Whether a resize or move is in progress.
    #[must_use]
    pub const fn is_gesture(self) -> bool {
        matches!(self, Self::Resizing | Self::Moving)
    }
}

/// Selection outline drawn over the selected element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    /// Outline box in canvas coordinates.
    pub rect: Rect,
    /// Whether the overlay is shown.
    pub visible: bool,
    /// Active handles and their anchor points.
    pub handles: Vec<(ResizeHandle, Point)>,
}

/// Box geometry in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Geometry {
    left: f32,
    top: f32,
    width: f32,
    height: f32,
}

#[derive(Debug, Clone, Copy)]
struct Gesture {
    handle: Option<ResizeHandle>,
    origin: Point,
    start: Geometry,
    current: Geometry,
    start_bounds: Rect,
    positioning: Positioning,
}

/// Parse a pixel length (`"120px"`, `"12.5"`). Other units yield `None`.
#[must_use]
pub fn parse_px(value: &str) -> Option<f32> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number.parse::<f32>().ok().filter(|n| n.is_finite())
}

/// Format a pixel length, rounded to whole pixels.
#[must_use]
pub fn format_px(value: f32) -> String {
    format!("{}px", value.round())
}

/// Tracks the single selected element and its direct-manipulation gestures.
#[derive(Debug, Clone)]
pub struct SelectionController {
    selected: Option<ElementId>,
    mode: SelectionMode,
    overlay: Overlay,
    gesture: Option<Gesture>,
    min_size: f32,
}

impl SelectionController {
    /// Create an idle controller.
    #[must_use]
    pub fn new() -> Self {
        Self::with_min_size(DEFAULT_MIN_SIZE)
    }

    /// Create an idle controller with a custom minimum resize size.
    #[must_use]
    pub fn with_min_size(min_size: f32) -> Self {
        Self {
            selected: None,
            mode: SelectionMode::Idle,
            overlay: Overlay::default(),
            gesture: None,
            min_size: min_size.max(1.0),
        }
    }

    /// The selected element.
    #[must_use]
    pub const fn selected(&self) -> Option<ElementId> {
        self.selected
    }

    /// Current mode.
    #[must_use]
    pub const fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Current overlay.
    #[must_use]
    pub const fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Select an element, replacing any previous selection.
    ///
    /// Returns `true` if the selection changed. Re-selecting the selected
    /// element only refreshes the overlay. Unknown ids and the canvas root
    /// are ignored.
    pub fn select(&mut self, canvas: &mut Canvas, id: ElementId, breakpoint: Breakpoint) -> bool {
        if id == canvas.root() || !canvas.contains(id) {
            tracing::debug!("Select ignored for {id}");
            return false;
        }
        if self.selected == Some(id) {
            self.refresh_overlay(canvas, breakpoint);
            return false;
        }
        self.clear_flags(canvas);
        if let Some(element) = canvas.get_mut(id) {
            element.selected = true;
        }
        self.selected = Some(id);
        self.mode = SelectionMode::Selected;
        self.gesture = None;
        self.refresh_overlay(canvas, breakpoint);
        true
    }

    /// Clear the selection. Returns `true` if something was selected.
    pub fn deselect(&mut self, canvas: &mut Canvas) -> bool {
        let had = self.selected.is_some();
        self.clear_flags(canvas);
        self.reset();
        had
    }

    /// Forget the selection without touching the canvas (after a restore).
    pub fn reset(&mut self) {
        self.selected = None;
        self.mode = SelectionMode::Idle;
        self.gesture = None;
        self.overlay = Overlay::default();
    }

    fn clear_flags(&self, canvas: &mut Canvas) {
        if let Some(element) = self.selected.and_then(|id| canvas.get_mut(id)) {
            element.selected = false;
        }
    }

    /// Recompute the overlay from the selected element's live bounds.
    ///
    /// A selection whose element has left the canvas is dropped.
    pub fn refresh_overlay(&mut self, canvas: &Canvas, breakpoint: Breakpoint) {
        let Some(id) = self.selected else {
            self.overlay = Overlay::default();
            return;
        };
        let Some(element) = canvas.get(id) else {
            self.reset();
            return;
        };
        let rect = element.bounds;
        let handles = self
            .available_handles(canvas, breakpoint)
            .into_iter()
            .map(|h| (h, h.anchor(rect)))
            .collect();
        self.overlay = Overlay {
            rect,
            visible: true,
            handles,
        };
    }

    /// Handles that apply to the selected element's positioning.
    ///
    /// Absolutely positioned elements get all eight; flow elements with an
    /// explicit width or height get the right/bottom handles; anything else
    /// gets none.
    #[must_use]
    pub fn available_handles(&self, canvas: &Canvas, breakpoint: Breakpoint) -> Vec<ResizeHandle> {
        let Some(element) = self.selected.and_then(|id| canvas.get(id)) else {
            return Vec::new();
        };
        let styles = StyleResolver::resolve(element, breakpoint);
        if Positioning::from_styles(&styles).is_absolute() {
            ResizeHandle::ALL.to_vec()
        } else if styles.contains_key("width") || styles.contains_key("height") {
            ResizeHandle::FLOW.to_vec()
        } else {
            Vec::new()
        }
    }

    fn start_geometry(canvas: &Canvas, id: ElementId, styles: &StyleMap) -> Option<Geometry> {
        let element = canvas.get(id)?;
        let bounds = element.bounds;
        let parent = element
            .parent
            .and_then(|p| canvas.get(p))
            .map_or_else(Rect::default, |p| p.bounds);
        let read = |property: &str, fallback: f32| {
            styles
                .get(property)
                .and_then(|v| parse_px(v))
                .unwrap_or(fallback)
        };
        Some(Geometry {
            left: read("left", bounds.x - parent.x),
            top: read("top", bounds.y - parent.y),
            width: read("width", bounds.width),
            height: read("height", bounds.height),
        })
    }

    fn begin(&mut self, canvas: &Canvas, handle: Option<ResizeHandle>, pointer: Point, breakpoint: Breakpoint) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        if self.mode != SelectionMode::Selected {
            return false;
        }
        let Some(element) = canvas.get(id) else {
            return false;
        };
        let styles = StyleResolver::resolve(element, breakpoint);
        let positioning = Positioning::from_styles(&styles);
        let Some(start) = Self::start_geometry(canvas, id, &styles) else {
            return false;
        };
        self.gesture = Some(Gesture {
            handle,
            origin: pointer,
            start,
            current: start,
            start_bounds: element.bounds,
            positioning,
        });
        self.mode = if handle.is_some() {
            SelectionMode::Resizing
        } else {
            SelectionMode::Moving
        };
        true
    }

    /// Start dragging a resize handle at a screen point.
    ///
    /// Refused when the handle is not available for the element.
    pub fn begin_resize(&mut self, canvas: &Canvas, handle: ResizeHandle, pointer: Point, breakpoint: Breakpoint) -> bool {
        if !self.available_handles(canvas, breakpoint).contains(&handle) {
            tracing::debug!("Resize handle {handle:?} not available");
            return false;
        }
        self.begin(canvas, Some(handle), pointer, breakpoint)
    }

    /// Start dragging the selected element. Only non-static elements move.
    pub fn begin_move(&mut self, canvas: &Canvas, pointer: Point, breakpoint: Breakpoint) -> bool {
        let positioned = self
            .selected
            .and_then(|id| canvas.get(id))
            .is_some_and(|e| Positioning::from_styles(&StyleResolver::resolve(e, breakpoint)).is_positioned());
        if !positioned {
            tracing::debug!("Move ignored: element is statically positioned");
            return false;
        }
        self.begin(canvas, None, pointer, breakpoint)
    }

    /// Continue the active gesture to a new screen point.
    ///
    /// The pointer delta is divided by the canvas zoom.
    pub fn drag_to(&mut self, canvas: &mut Canvas, pointer: Point) {
        let (Some(id), Some(mut gesture)) = (self.selected, self.gesture) else {
            return;
        };
        let zoom = if canvas.zoom > 0.0 { canvas.zoom } else { 1.0 };
        let dx = (pointer.x - gesture.origin.x) / zoom;
        let dy = (pointer.y - gesture.origin.y) / zoom;
        let start = gesture.start;
        let mut next = start;

        match gesture.handle {
            Some(handle) => {
                if handle.east() {
                    next.width = (start.width + dx).max(self.min_size);
                } else if handle.west() {
                    next.width = (start.width - dx).max(self.min_size);
                }
                if handle.south() {
                    next.height = (start.height + dy).max(self.min_size);
                } else if handle.north() {
                    next.height = (start.height - dy).max(self.min_size);
                }
                if gesture.positioning.is_absolute() {
                    if handle.west() {
                        next.left = start.left + (start.width - next.width);
                    }
                    if handle.north() {
                        next.top = start.top + (start.height - next.height);
                    }
                }
            }
            None => {
                next.left = start.left + dx;
                next.top = start.top + dy;
            }
        }
        gesture.current = next;
        self.gesture = Some(gesture);

        let changed = Self::changed_properties(&gesture);
        if let Some(element) = canvas.get_mut(id) {
            for (property, value) in &changed {
                element.applied.insert((*property).to_string(), value.clone());
            }
            let b = gesture.start_bounds;
            element.bounds = Rect::new(
                b.x + (next.left - start.left),
                b.y + (next.top - start.top),
                next.width,
                next.height,
            );
            self.overlay.rect = element.bounds;
        }
        let rect = self.overlay.rect;
        for (handle, anchor) in &mut self.overlay.handles {
            *anchor = handle.anchor(rect);
        }
    }

    #[allow(clippy::float_cmp)]
    fn changed_properties(gesture: &Gesture) -> Vec<(&'static str, String)> {
        let (start, current) = (gesture.start, gesture.current);
        let mut out = Vec::new();
        if current.width != start.width {
            out.push(("width", format_px(current.width)));
        }
        if current.height != start.height {
            out.push(("height", format_px(current.height)));
        }
        if current.left != start.left {
            out.push(("left", format_px(current.left)));
        }
        if current.top != start.top {
            out.push(("top", format_px(current.top)));
        }
        out
    }

    /// Finish the active gesture, writing changed geometry into the
    /// `base` cell of `breakpoint`.
    ///
    /// Returns `true` if the style store changed.
    pub fn end_gesture(&mut self, canvas: &mut Canvas, breakpoint: Breakpoint) -> bool {
        let gesture = self.gesture.take();
        if self.selected.is_some() {
            self.mode = SelectionMode::Selected;
        }
        let (Some(id), Some(gesture)) = (self.selected, gesture) else {
            return false;
        };
        let changed = Self::changed_properties(&gesture);
        if changed.is_empty() {
            return false;
        }
        let Some(element) = canvas.get_mut(id) else {
            return false;
        };
        for (property, value) in &changed {
            element
                .styles
                .set(InteractionState::Base, breakpoint, property, value);
        }
        tracing::info!(
            "Committed {} on {id}",
            changed.iter().map(|(p, v)| format!("{p}={v}")).collect::<Vec<_>>().join(", ")
        );
        true
    }

    /// Abandon the active gesture, restoring the pre-gesture bounds.
    pub fn cancel_gesture(&mut self, canvas: &mut Canvas, breakpoint: Breakpoint) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        if let Some(element) = self.selected.and_then(|id| canvas.get_mut(id)) {
            element.bounds = gesture.start_bounds;
            StyleResolver::apply_live_styles(element, breakpoint);
        }
        self.mode = SelectionMode::Selected;
        self.refresh_overlay(canvas, breakpoint);
    }

    /// Nudge an absolutely positioned selection by `(dx, dy)` pixels.
    ///
    /// Writes `left`/`top` into the `base` cell of `breakpoint`. Returns
    /// `true` if anything moved.
    pub fn nudge(&mut self, canvas: &mut Canvas, dx: f32, dy: f32, breakpoint: Breakpoint) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        if self.gesture.is_some() {
            return false;
        }
        let Some(element) = canvas.get(id) else {
            return false;
        };
        let styles = StyleResolver::resolve(element, breakpoint);
        if !Positioning::from_styles(&styles).is_absolute() {
            tracing::debug!("Nudge ignored: {id} is not absolutely positioned");
            return false;
        }
        let Some(start) = Self::start_geometry(canvas, id, &styles) else {
            return false;
        };
        let Some(element) = canvas.get_mut(id) else {
            return false;
        };
        if dx != 0.0 {
            element
                .styles
                .set(InteractionState::Base, breakpoint, "left", &format_px(start.left + dx));
        }
        if dy != 0.0 {
            element
                .styles
                .set(InteractionState::Base, breakpoint, "top", &format_px(start.top + dy));
        }
        element.bounds.x += dx;
        element.bounds.y += dy;
        dx != 0.0 || dy != 0.0
    }
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ComponentKind, Element};

    fn canvas_with(styles: &[(&str, &str)]) -> (Canvas, ElementId) {
        let mut canvas = Canvas::new(800.0, 600.0);
        let root = canvas.root();
        let mut element =
            Element::new(ComponentKind::Container).with_bounds(Rect::new(100.0, 50.0, 200.0, 100.0));
        for (property, value) in styles {
            element
                .styles
                .set(InteractionState::Base, Breakpoint::Desktop, property, value);
        }
        let id = canvas.insert(element, root, 0).unwrap();
        canvas.bind_all();
        (canvas, id)
    }

    fn style(canvas: &Canvas, id: ElementId, bp: Breakpoint, property: &str) -> Option<String> {
        canvas
            .get(id)
            .and_then(|e| e.styles.get(InteractionState::Base, bp, property))
            .map(str::to_string)
    }

    #[test]
    fn test_select_is_exclusive_and_idempotent() {
        let (mut canvas, a) = canvas_with(&[]);
        let root = canvas.root();
        let b = canvas.insert(Element::new(ComponentKind::Text), root, 1).unwrap();
        let mut selection = SelectionController::new();

        assert!(selection.select(&mut canvas, a, Breakpoint::Desktop));
        assert!(!selection.select(&mut canvas, a, Breakpoint::Desktop));
        assert!(selection.overlay().visible);
        assert_eq!(selection.overlay().rect, Rect::new(100.0, 50.0, 200.0, 100.0));

        assert!(selection.select(&mut canvas, b, Breakpoint::Desktop));
        assert!(!canvas.get(a).unwrap().selected);
        assert!(canvas.get(b).unwrap().selected);
        assert_eq!(canvas.elements().filter(|e| e.selected).count(), 1);

        assert!(!selection.select(&mut canvas, root, Breakpoint::Desktop));
        assert!(selection.deselect(&mut canvas));
        assert_eq!(selection.mode(), SelectionMode::Idle);
        assert!(!selection.overlay().visible);
    }

    #[test]
    fn test_handles_follow_positioning() {
        let (mut canvas, flow) = canvas_with(&[]);
        let mut selection = SelectionController::new();
        selection.select(&mut canvas, flow, Breakpoint::Desktop);
        assert!(selection.available_handles(&canvas, Breakpoint::Desktop).is_empty());
        assert!(!selection.begin_resize(&canvas, ResizeHandle::E, Point::new(0.0, 0.0), Breakpoint::Desktop));

        let (mut canvas, sized) = canvas_with(&[("width", "200px")]);
        selection.reset();
        selection.select(&mut canvas, sized, Breakpoint::Desktop);
        assert_eq!(
            selection.available_handles(&canvas, Breakpoint::Desktop),
            ResizeHandle::FLOW.to_vec()
        );

        let (mut canvas, absolute) = canvas_with(&[("position", "absolute")]);
        selection.reset();
        selection.select(&mut canvas, absolute, Breakpoint::Desktop);
        assert_eq!(selection.overlay().handles.len(), 8);
    }

    #[test]
    fn test_resize_commits_to_current_breakpoint() {
        let (mut canvas, id) = canvas_with(&[("width", "200px"), ("height", "100px")]);
        let mut selection = SelectionController::new();
        selection.select(&mut canvas, id, Breakpoint::Tablet);

        assert!(selection.begin_resize(&canvas, ResizeHandle::Se, Point::new(300.0, 150.0), Breakpoint::Tablet));
        assert_eq!(selection.mode(), SelectionMode::Resizing);
        selection.drag_to(&mut canvas, Point::new(340.0, 170.0));
        assert_eq!(selection.overlay().rect, Rect::new(100.0, 50.0, 240.0, 120.0));
        assert_eq!(
            canvas.get(id).unwrap().applied.get("width").map(String::as_str),
            Some("240px")
        );

        assert!(selection.end_gesture(&mut canvas, Breakpoint::Tablet));
        assert_eq!(selection.mode(), SelectionMode::Selected);
        assert_eq!(style(&canvas, id, Breakpoint::Tablet, "width").as_deref(), Some("240px"));
        assert_eq!(style(&canvas, id, Breakpoint::Tablet, "height").as_deref(), Some("120px"));
        assert_eq!(style(&canvas, id, Breakpoint::Desktop, "width").as_deref(), Some("200px"));
    }

    #[test]
    fn test_resize_clamps_and_moves_west_edge() {
        let (mut canvas, id) = canvas_with(&[
            ("position", "absolute"),
            ("left", "100px"),
            ("top", "50px"),
            ("width", "200px"),
            ("height", "100px"),
        ]);
        let mut selection = SelectionController::new();
        selection.select(&mut canvas, id, Breakpoint::Desktop);

        selection.begin_resize(&canvas, ResizeHandle::W, Point::new(100.0, 100.0), Breakpoint::Desktop);
        selection.drag_to(&mut canvas, Point::new(400.0, 100.0));
        selection.end_gesture(&mut canvas, Breakpoint::Desktop);

        assert_eq!(style(&canvas, id, Breakpoint::Desktop, "width").as_deref(), Some("10px"));
        assert_eq!(style(&canvas, id, Breakpoint::Desktop, "left").as_deref(), Some("290px"));
        assert_eq!(style(&canvas, id, Breakpoint::Desktop, "height").as_deref(), Some("100px"));
    }

    #[test]
    fn test_move_divides_by_zoom_and_requires_positioning() {
        let (mut canvas, id) = canvas_with(&[("position", "relative"), ("left", "10px"), ("top", "0px")]);
        canvas.zoom = 2.0;
        let mut selection = SelectionController::new();
        selection.select(&mut canvas, id, Breakpoint::Desktop);

        assert!(selection.begin_move(&canvas, Point::new(0.0, 0.0), Breakpoint::Desktop));
        selection.drag_to(&mut canvas, Point::new(40.0, 20.0));
        assert!(selection.end_gesture(&mut canvas, Breakpoint::Desktop));
        assert_eq!(style(&canvas, id, Breakpoint::Desktop, "left").as_deref(), Some("30px"));
        assert_eq!(style(&canvas, id, Breakpoint::Desktop, "top").as_deref(), Some("10px"));

        let (mut canvas, flow) = canvas_with(&[]);
        selection.reset();
        selection.select(&mut canvas, flow, Breakpoint::Desktop);
        assert!(!selection.begin_move(&canvas, Point::new(0.0, 0.0), Breakpoint::Desktop));
    }

    #[test]
    fn test_nudge_only_absolute() {
        let (mut canvas, id) = canvas_with(&[("position", "absolute"), ("left", "5px"), ("top", "5px")]);
        let mut selection = SelectionController::new();
        selection.select(&mut canvas, id, Breakpoint::Desktop);
        assert!(selection.nudge(&mut canvas, 10.0, 0.0, Breakpoint::Desktop));
        assert!(selection.nudge(&mut canvas, 0.0, -1.0, Breakpoint::Desktop));
        assert_eq!(style(&canvas, id, Breakpoint::Desktop, "left").as_deref(), Some("15px"));
        assert_eq!(style(&canvas, id, Breakpoint::Desktop, "top").as_deref(), Some("4px"));

        let (mut canvas, relative) = canvas_with(&[("position", "relative")]);
        selection.reset();
        selection.select(&mut canvas, relative, Breakpoint::Desktop);
        assert!(!selection.nudge(&mut canvas, 1.0, 0.0, Breakpoint::Desktop));
    }

    #[test]
    fn test_px_helpers() {
        assert_eq!(parse_px("12px"), Some(12.0));
        assert_eq!(parse_px(" 3.5 "), Some(3.5));
        assert_eq!(parse_px("50%"), None);
        assert_eq!(format_px(239.6), "240px");
        assert_eq!(format_px(-4.0), "-4px");
    }
}
