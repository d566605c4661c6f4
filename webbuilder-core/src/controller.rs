//! The editing session: one canvas and everything that acts on it.
//!
//! [`CanvasController`] owns the canvas tree together with the registry,
//! asset library, drag engine, selection and history. Every user action
//! goes through it, and every mutating action ends in the same commit
//! sequence:
//!
//! ```text
//! mutate tree/styles ─► re-apply live styles ─► refresh overlay
//!                    ─► push snapshot ─► queue EditorEvents
//! ```
//!
//! The host drains notifications with [`CanvasController::take_events`]
//! after each call instead of registering callbacks.

use serde::{Deserialize, Serialize};

use crate::asset::{Asset, AssetLibrary};
use crate::canvas::Canvas;
use crate::config::EditorConfig;
use crate::drag::{DragDropEngine, DragPayload, DropIndicator, DropOutcome, DropTarget};
use crate::element::{is_editable_attribute, ComponentKind, Element, ElementId, Point, Rect};
use crate::event::{EditorEvent, InputEvent, KeyModifiers, PointerPhase};
use crate::export::{self, ExportOptions, MarkupMode};
use crate::history::{HistoryManager, HistorySnapshot};
use crate::project::ProjectFile;
use crate::registry::{ComponentRegistry, ComponentTemplate};
use crate::resolver::{EditContext, StyleResolver};
use crate::selection::{ResizeHandle, SelectionController};
use crate::snapshot::{self, CanvasDocument, ElementDocument, ViewportDocument};
use crate::style::{Breakpoint, InteractionState, StyleMap};
use crate::{CanvasError, CanvasResult};

/// Distance in canvas pixels within which a pointer grabs a resize handle.
pub const HANDLE_HIT_RADIUS: f32 = 6.0;

/// One row of the layers panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerEntry {
    /// Nesting depth; children of the page body are at 0.
    pub depth: usize,
    /// Element id.
    pub id: ElementId,
    /// Template key.
    pub component_type: String,
    /// Display label.
    pub label: String,
    /// Whether this is the selected element.
    pub selected: bool,
}

/// A single editing session.
#[derive(Debug, Clone)]
pub struct CanvasController {
    canvas: Canvas,
    registry: ComponentRegistry,
    assets: AssetLibrary,
    blocks: Vec<ComponentTemplate>,
    drag: DragDropEngine,
    selection: SelectionController,
    history: HistoryManager,
    context: EditContext,
    clipboard: Option<ElementDocument>,
    hovered: Option<ElementId>,
    config: EditorConfig,
    events: Vec<EditorEvent>,
}

impl CanvasController {
    /// Create a session with the default configuration and built-in components.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    /// Create a session with the given configuration.
    #[must_use]
    pub fn with_config(config: EditorConfig) -> Self {
        Self::with_registry(config, ComponentRegistry::builtin())
    }

    /// Create a session with a custom component registry.
    #[must_use]
    pub fn with_registry(config: EditorConfig, registry: ComponentRegistry) -> Self {
        let context = EditContext::default();
        let canvas = Canvas::new(config.viewport_width(context.breakpoint), config.canvas_height);
        let mut controller = Self {
            canvas,
            registry,
            assets: AssetLibrary::new(),
            blocks: Vec::new(),
            drag: DragDropEngine::new(),
            selection: SelectionController::with_min_size(config.min_element_size),
            history: HistoryManager::with_capacity(config.max_undo_steps),
            context,
            clipboard: None,
            hovered: None,
            config,
            events: Vec::new(),
        };
        controller.canvas.bind_all();
        if let Some(initial) = controller.snapshot() {
            controller.history.reset(initial);
        }
        controller
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The canvas tree.
    #[must_use]
    pub const fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// The component registry.
    #[must_use]
    pub const fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Uploaded assets.
    #[must_use]
    pub const fn assets(&self) -> &AssetLibrary {
        &self.assets
    }

    /// Custom blocks saved in this session.
    #[must_use]
    pub fn blocks(&self) -> &[ComponentTemplate] {
        &self.blocks
    }

    /// Selection state.
    #[must_use]
    pub const fn selection(&self) -> &SelectionController {
        &self.selection
    }

    /// The selected element.
    #[must_use]
    pub const fn selected(&self) -> Option<ElementId> {
        self.selection.selected()
    }

    /// Undo/redo history.
    #[must_use]
    pub const fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// Drag-and-drop state.
    #[must_use]
    pub const fn drag(&self) -> &DragDropEngine {
        &self.drag
    }

    /// Breakpoint and interaction state being edited.
    #[must_use]
    pub const fn context(&self) -> EditContext {
        self.context
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Drain queued notifications.
    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    /// The serialized tree as stored in history.
    ///
    /// Two sessions with equal content produce equal strings.
    #[must_use]
    pub fn content_snapshot(&self) -> String {
        self.snapshot().map(HistorySnapshot::into_inner).unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Commit / restore
    // -----------------------------------------------------------------------

    fn snapshot(&self) -> Option<HistorySnapshot> {
        let document = CanvasDocument::from_canvas(&self.canvas);
        match serde_json::to_string(&document.root) {
            Ok(json) => Some(HistorySnapshot::new(json)),
            Err(e) => {
                tracing::warn!("Failed to snapshot canvas: {e}");
                None
            }
        }
    }

    fn commit(&mut self, action: &str) {
        let breakpoint = self.context.breakpoint;
        StyleResolver::apply_all(&mut self.canvas, breakpoint);
        self.hovered = None;
        self.selection.refresh_overlay(&self.canvas, breakpoint);
        if let Some(snapshot) = self.snapshot() {
            self.history.push(snapshot);
        }
        tracing::debug!("Committed {action} ({} history entries)", self.history.len());
        self.events.push(EditorEvent::ContentChanged);
        self.emit_history();
        self.emit_overlay();
    }

    fn emit_history(&mut self) {
        self.events.push(EditorEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    fn emit_overlay(&mut self) {
        self.events.push(EditorEvent::OverlayChanged {
            overlay: self.selection.overlay().clone(),
        });
    }

    fn emit_selection(&mut self) {
        let element = self.selection.selected();
        let styles = element.map(|id| self.resolved_styles(id)).unwrap_or_default();
        self.events.push(EditorEvent::SelectionChanged { element, styles });
    }

    /// Swap in a restored tree, keeping viewport and known bounds.
    fn install(&mut self, mut canvas: Canvas) {
        let bounds = snapshot::bounds_of(&self.canvas);
        for element in canvas.elements_mut() {
            if let Some(rect) = bounds.get(&element.id) {
                element.bounds = *rect;
            }
        }
        canvas.zoom = self.canvas.zoom;
        canvas.pan_x = self.canvas.pan_x;
        canvas.pan_y = self.canvas.pan_y;
        canvas.set_viewport(
            self.config.viewport_width(self.context.breakpoint),
            self.config.canvas_height,
        );
        canvas.bind_all();
        StyleResolver::apply_all(&mut canvas, self.context.breakpoint);
        self.canvas = canvas;
        self.hovered = None;
        self.drag.cancel();
        self.selection.reset();
    }

    fn restore(&mut self, snapshot: &HistorySnapshot) -> CanvasResult<()> {
        let root: ElementDocument = serde_json::from_str(snapshot.as_str())?;
        let document = CanvasDocument {
            viewport: ViewportDocument::from(&self.canvas),
            root,
        };
        let canvas = document.into_canvas()?;
        self.install(canvas);
        self.events.push(EditorEvent::SelectionChanged {
            element: None,
            styles: StyleMap::new(),
        });
        self.events.push(EditorEvent::ContentChanged);
        self.emit_history();
        self.emit_overlay();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Step back one snapshot. Returns `true` if the canvas changed.
    ///
    /// The selection is cleared: it is not part of history.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        match self.restore(&snapshot) {
            Ok(()) => {
                tracing::debug!("Undo to entry {}", self.history.len());
                true
            }
            Err(e) => {
                tracing::warn!("Undo failed: {e}");
                false
            }
        }
    }

    /// Step forward one snapshot. Returns `true` if the canvas changed.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        match self.restore(&snapshot) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Redo failed: {e}");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Breakpoint / state
    // -----------------------------------------------------------------------

    /// Switch the simulated breakpoint, re-applying every element's styles.
    pub fn set_breakpoint(&mut self, breakpoint: Breakpoint) {
        self.context = self.context.at(breakpoint);
        let width = self.config.viewport_width(breakpoint);
        self.canvas.set_viewport(width, self.config.canvas_height);
        StyleResolver::apply_all(&mut self.canvas, breakpoint);
        self.hovered = None;
        self.selection.refresh_overlay(&self.canvas, breakpoint);
        tracing::info!("Breakpoint set to {breakpoint} ({width}px)");
        self.events.push(EditorEvent::BreakpointChanged {
            breakpoint,
            viewport_width: width,
        });
        self.emit_overlay();
        self.emit_selection();
    }

    /// Switch which interaction state style edits target.
    pub fn set_state(&mut self, state: InteractionState) {
        self.context = self.context.with_state(state);
        self.events.push(EditorEvent::StateChanged { state });
        self.emit_selection();
    }

    /// Set the canvas zoom; non-positive values are ignored.
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom > 0.0 && zoom.is_finite() {
            self.canvas.zoom = zoom;
        }
    }

    /// Set the canvas pan offset in screen pixels.
    pub fn set_pan(&mut self, x: f32, y: f32) {
        self.canvas.pan_x = x;
        self.canvas.pan_y = y;
    }

    /// Report an element's rendered box in canvas coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not on the canvas.
    pub fn set_element_bounds(&mut self, id: ElementId, bounds: Rect) -> CanvasResult<()> {
        self.canvas.set_bounds(id, bounds)?;
        if self.selection.selected() == Some(id) {
            self.selection.refresh_overlay(&self.canvas, self.context.breakpoint);
            self.emit_overlay();
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Select an element. Returns `true` if the selection changed.
    pub fn select(&mut self, id: ElementId) -> bool {
        let changed = self.selection.select(&mut self.canvas, id, self.context.breakpoint);
        if changed {
            tracing::debug!("Selected {id}");
            self.emit_selection();
            self.emit_overlay();
        }
        changed
    }

    /// Clear the selection. Returns `true` if something was selected.
    pub fn deselect(&mut self) -> bool {
        let changed = self.selection.deselect(&mut self.canvas);
        if changed {
            self.emit_selection();
            self.emit_overlay();
        }
        changed
    }

    /// Styles the properties panel shows for an element in the current context.
    #[must_use]
    pub fn resolved_styles(&self, id: ElementId) -> StyleMap {
        self.canvas
            .get(id)
            .map(|e| StyleResolver::panel_styles(e, self.context))
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Style and content edits
    // -----------------------------------------------------------------------

    /// Set a property on the selected element in the current state and breakpoint.
    ///
    /// Returns `true` if the stored value changed.
    pub fn update_element_style(&mut self, property: &str, value: &str) -> bool {
        self.selection
            .selected()
            .is_some_and(|id| self.set_element_style(id, property, value))
    }

    /// Set a property on any element in the current state and breakpoint.
    pub fn set_element_style(&mut self, id: ElementId, property: &str, value: &str) -> bool {
        let EditContext { breakpoint, state } = self.context;
        let Some(element) = self.canvas.get_mut(id) else {
            return false;
        };
        let before = element.styles.clone();
        element.styles.set(state, breakpoint, property, value);
        if element.styles == before {
            return false;
        }
        tracing::debug!("Style {property}={value} on {id} at {state}/{breakpoint}");
        self.commit("style");
        if self.selection.selected() == Some(id) {
            self.emit_selection();
        }
        true
    }

    /// Remove a property from the selected element's current cell.
    pub fn remove_element_style(&mut self, property: &str) -> bool {
        let EditContext { breakpoint, state } = self.context;
        let Some(element) = self.selection.selected().and_then(|id| self.canvas.get_mut(id)) else {
            return false;
        };
        let before = element.styles.clone();
        element.styles.remove(state, breakpoint, property);
        if element.styles == before {
            return false;
        }
        self.commit("remove style");
        self.emit_selection();
        true
    }

    /// Replace an element's text content.
    pub fn update_text(&mut self, id: ElementId, text: &str) -> bool {
        let Some(slot) = self.canvas.get_mut(id).and_then(|e| e.text.as_mut()) else {
            return false;
        };
        if slot.text == text {
            return false;
        }
        text.clone_into(&mut slot.text);
        self.commit("text");
        true
    }

    /// Set an attribute (`href`, `alt`, ...) on an element.
    ///
    /// For media elements `src` and `alt` go to the media slot. Names the
    /// markup writer emits itself (`id`, `class`, `style`, `data-*` editor
    /// attributes) and `on*` handlers are refused.
    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) -> bool {
        let Some(element) = self.canvas.get_mut(id) else {
            return false;
        };
        let changed = match (name, element.media.as_mut()) {
            (name, _) if !matches!(name, "src" | "alt") && !is_editable_attribute(name) => {
                tracing::debug!("Refused attribute '{name}' on {id}");
                false
            }
            ("src", Some(media)) if media.src != value => {
                value.clone_into(&mut media.src);
                true
            }
            ("alt", Some(media)) if media.alt != value => {
                value.clone_into(&mut media.alt);
                true
            }
            ("src" | "alt", Some(_)) => false,
            _ => element.attributes.insert(name.to_string(), value.to_string()).as_deref() != Some(value),
        };
        if changed {
            self.commit("attribute");
        }
        changed
    }

    /// Add a class to the selected element.
    pub fn add_class(&mut self, class: &str) -> bool {
        let changed = self
            .selection
            .selected()
            .and_then(|id| self.canvas.get_mut(id))
            .is_some_and(|e| e.add_class(class));
        if changed {
            self.commit("add class");
        }
        changed
    }

    /// Remove a class from the selected element.
    pub fn remove_class(&mut self, class: &str) -> bool {
        let changed = self
            .selection
            .selected()
            .and_then(|id| self.canvas.get_mut(id))
            .is_some_and(|e| e.remove_class(class));
        if changed {
            self.commit("remove class");
        }
        changed
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// Insert a registry component under `parent` at `index`.
    ///
    /// The new element is selected.
    ///
    /// # Errors
    ///
    /// Returns an error if the component type is unknown or the parent
    /// is not on the canvas.
    pub fn add_component(&mut self, component_type: &str, parent: ElementId, index: usize) -> CanvasResult<ElementId> {
        let template = self
            .registry
            .get(component_type)
            .ok_or_else(|| CanvasError::UnknownComponent(component_type.to_string()))?;
        let id = template.instantiate(&mut self.canvas, parent, index)?;
        self.bind_subtree(id);
        self.selection.select(&mut self.canvas, id, self.context.breakpoint);
        self.commit("add component");
        self.emit_selection();
        Ok(id)
    }

    fn bind_subtree(&mut self, id: ElementId) {
        for node in self.canvas.descendants(id) {
            if let Some(element) = self.canvas.get_mut(node) {
                element.handlers_bound = true;
            }
        }
    }

    /// Delete the selected element and its subtree.
    pub fn delete_selected(&mut self) -> bool {
        let Some(id) = self.selection.selected() else {
            return false;
        };
        if let Err(e) = self.canvas.remove(id) {
            tracing::warn!("Delete failed for {id}: {e}");
            return false;
        }
        self.selection.reset();
        tracing::info!("Deleted {id}");
        self.commit("delete");
        self.emit_selection();
        true
    }

    /// Copy the selected subtree to the clipboard.
    pub fn copy(&mut self) -> bool {
        let Some(element) = self.selection.selected().and_then(|id| self.canvas.get(id)) else {
            return false;
        };
        self.clipboard = Some(ElementDocument::capture(&self.canvas, element));
        true
    }

    /// Copy the selected subtree, then delete it.
    pub fn cut(&mut self) -> bool {
        self.copy() && self.delete_selected()
    }

    /// Whether the clipboard holds anything.
    #[must_use]
    pub const fn has_clipboard(&self) -> bool {
        self.clipboard.is_some()
    }

    /// Paste the clipboard with fresh ids.
    ///
    /// Goes inside a selected drop zone, after any other selected element,
    /// or at the end of the page body.
    pub fn paste(&mut self) -> Option<ElementId> {
        let document = self.clipboard.as_ref()?.with_fresh_ids();
        let (parent, index) = match self.selection.selected() {
            Some(id) if self.canvas.get(id).is_some_and(Element::is_drop_zone) => {
                (id, self.canvas.children(id).len())
            }
            Some(id) => {
                let parent = self.canvas.parent(id)?;
                (parent, self.canvas.index_of(id).map_or(usize::MAX, |i| i + 1))
            }
            None => {
                let root = self.canvas.root();
                (root, self.canvas.children(root).len())
            }
        };
        self.insert_document(&document, parent, index, "paste")
    }

    /// Duplicate the selected subtree right after itself.
    pub fn duplicate(&mut self) -> Option<ElementId> {
        let id = self.selection.selected()?;
        let document = ElementDocument::capture(&self.canvas, self.canvas.get(id)?).with_fresh_ids();
        let parent = self.canvas.parent(id)?;
        let index = self.canvas.index_of(id)? + 1;
        self.insert_document(&document, parent, index, "duplicate")
    }

    fn insert_document(
        &mut self,
        document: &ElementDocument,
        parent: ElementId,
        index: usize,
        action: &str,
    ) -> Option<ElementId> {
        match document.insert_into(&mut self.canvas, parent, index) {
            Ok(id) => {
                self.bind_subtree(id);
                self.selection.select(&mut self.canvas, id, self.context.breakpoint);
                self.commit(action);
                self.emit_selection();
                Some(id)
            }
            Err(e) => {
                tracing::warn!("{action} failed: {e}");
                None
            }
        }
    }

    /// Move the selected element one place earlier among its siblings.
    pub fn move_selected_up(&mut self) -> bool {
        self.shift_selected(-1)
    }

    /// Move the selected element one place later among its siblings.
    pub fn move_selected_down(&mut self) -> bool {
        self.shift_selected(1)
    }

    fn shift_selected(&mut self, offset: isize) -> bool {
        let Some(id) = self.selection.selected() else {
            return false;
        };
        let (Some(parent), Some(index)) = (self.canvas.parent(id), self.canvas.index_of(id)) else {
            return false;
        };
        let Some(target) = index.checked_add_signed(offset) else {
            return false;
        };
        if target >= self.canvas.children(parent).len() {
            return false;
        }
        if let Err(e) = self.canvas.move_to(id, parent, target) {
            tracing::warn!("Reorder failed for {id}: {e}");
            return false;
        }
        self.commit("reorder");
        true
    }

    /// Wrap the selected element in a new container placed where it was.
    pub fn wrap_selected(&mut self) -> Option<ElementId> {
        let id = self.selection.selected()?;
        let parent = self.canvas.parent(id)?;
        let index = self.canvas.index_of(id)?;
        let wrapper = match self.registry.get(ComponentKind::Container.key()) {
            Some(template) => template.to_element(),
            None => Element::new(ComponentKind::Container),
        };
        let result = self
            .canvas
            .insert(wrapper, parent, index)
            .and_then(|wrapper| self.canvas.move_to(id, wrapper, 0).map(|()| wrapper));
        match result {
            Ok(wrapper) => {
                self.bind_subtree(wrapper);
                self.commit("wrap");
                Some(wrapper)
            }
            Err(e) => {
                tracing::warn!("Wrap failed for {id}: {e}");
                None
            }
        }
    }

    /// Remove everything below the page body.
    pub fn clear_canvas(&mut self) -> bool {
        if self.canvas.children(self.canvas.root()).is_empty() {
            return false;
        }
        self.canvas.clear();
        self.selection.reset();
        self.commit("clear");
        self.emit_selection();
        true
    }

    /// Capture the selected subtree as a reusable block.
    ///
    /// The block joins the registry under `key`, replacing any block or
    /// built-in component with the same key.
    pub fn save_as_block(&mut self, key: &str, label: &str) -> Option<ComponentTemplate> {
        let id = self.selection.selected()?;
        let block = ComponentTemplate::capture(&self.canvas, id, key, label)?;
        self.blocks.retain(|b| b.key != block.key);
        self.blocks.push(block.clone());
        self.registry = ComponentRegistry::with_templates(self.blocks.clone());
        tracing::info!("Saved block {key}");
        Some(block)
    }

    /// Remove a saved block from the registry.
    ///
    /// A built-in component the block was shadowing becomes available again.
    pub fn remove_block(&mut self, key: &str) -> bool {
        let before = self.blocks.len();
        self.blocks.retain(|b| b.key != key);
        if self.blocks.len() == before {
            return false;
        }
        self.registry = ComponentRegistry::with_templates(self.blocks.clone());
        tracing::info!("Removed block {key}");
        true
    }

    // -----------------------------------------------------------------------
    // Assets
    // -----------------------------------------------------------------------

    /// Add an asset to the library, returning its id.
    pub fn register_asset(&mut self, asset: Asset) -> String {
        self.assets.add(asset)
    }

    // -----------------------------------------------------------------------
    // Drag and drop
    // -----------------------------------------------------------------------

    /// Start a drag.
    pub fn begin_drag(&mut self, payload: DragPayload) {
        tracing::debug!("Drag started: {payload:?}");
        self.drag.begin_drag(payload);
    }

    /// Track a drag over a screen point.
    pub fn drag_over(&mut self, screen: Point) -> Option<DropTarget> {
        let before = self.drag.indicator();
        let point = self.canvas.to_canvas_point(screen);
        let target = self.drag.pointer_move(&self.canvas, point, self.context.breakpoint);
        let indicator = self.drag.indicator();
        if indicator != before {
            self.events.push(EditorEvent::DropIndicatorChanged { indicator });
        }
        target
    }

    /// Drop the in-flight drag at its last resolved target.
    pub fn drop_payload(&mut self) -> DropOutcome {
        let had_indicator = self.drag.indicator() != DropIndicator::None;
        let breakpoint = self.context.breakpoint;
        let outcome = self
            .drag
            .commit_drop(&mut self.canvas, &self.registry, &self.assets, breakpoint);
        if had_indicator {
            self.events.push(EditorEvent::DropIndicatorChanged {
                indicator: DropIndicator::None,
            });
        }
        match outcome {
            DropOutcome::Ignored => {}
            DropOutcome::Inserted(id) => {
                self.selection.select(&mut self.canvas, id, breakpoint);
                self.commit("drop");
                self.emit_selection();
            }
            DropOutcome::Moved(_) => self.commit("move"),
            DropOutcome::AssetBound(_) => self.commit("bind asset"),
        }
        outcome
    }

    /// Abandon the in-flight drag.
    pub fn cancel_drag(&mut self) {
        if self.drag.indicator() != DropIndicator::None {
            self.events.push(EditorEvent::DropIndicatorChanged {
                indicator: DropIndicator::None,
            });
        }
        self.drag.cancel();
    }

    // -----------------------------------------------------------------------
    // Pointer
    // -----------------------------------------------------------------------

    fn handle_at(&self, point: Point) -> Option<ResizeHandle> {
        let overlay = self.selection.overlay();
        if !overlay.visible {
            return None;
        }
        overlay
            .handles
            .iter()
            .find(|(_, anchor)| {
                (anchor.x - point.x).abs() <= HANDLE_HIT_RADIUS && (anchor.y - point.y).abs() <= HANDLE_HIT_RADIUS
            })
            .map(|(handle, _)| *handle)
    }

    /// Pointer pressed at a screen point.
    ///
    /// Grabs a resize handle if one is under the pointer; otherwise selects
    /// the element under it (the page body deselects) and starts a move when
    /// the element is positioned.
    pub fn pointer_down(&mut self, screen: Point) {
        let point = self.canvas.to_canvas_point(screen);
        let breakpoint = self.context.breakpoint;
        if let Some(handle) = self.handle_at(point) {
            if self.selection.begin_resize(&self.canvas, handle, screen, breakpoint) {
                return;
            }
        }
        match self.canvas.element_at(point) {
            Some(id) if id != self.canvas.root() => {
                self.select(id);
                self.selection.begin_move(&self.canvas, screen, breakpoint);
            }
            _ => {
                self.deselect();
            }
        }
    }

    /// Pointer moved to a screen point.
    pub fn pointer_move(&mut self, screen: Point) {
        if self.drag.is_dragging() {
            self.drag_over(screen);
            return;
        }
        if self.selection.mode().is_gesture() {
            self.selection.drag_to(&mut self.canvas, screen);
            self.selection_overlay_follow();
            return;
        }
        let point = self.canvas.to_canvas_point(screen);
        let under = self.canvas.element_at(point).filter(|id| *id != self.canvas.root());
        if under != self.hovered {
            if let Some(previous) = self.hovered {
                self.hover_leave(previous);
            }
            if let Some(next) = under {
                self.hover_enter(next);
            }
        }
    }

    fn selection_overlay_follow(&mut self) {
        self.selection.refresh_overlay(&self.canvas, self.context.breakpoint);
        self.emit_overlay();
    }

    /// Pointer released at a screen point.
    pub fn pointer_up(&mut self, screen: Point) {
        if self.drag.is_dragging() {
            self.drag_over(screen);
            self.drop_payload();
            return;
        }
        if !self.selection.mode().is_gesture() {
            return;
        }
        let breakpoint = self.context.breakpoint;
        if self.selection.end_gesture(&mut self.canvas, breakpoint) {
            self.commit("resize");
            self.emit_selection();
        } else {
            self.selection.cancel_gesture(&mut self.canvas, breakpoint);
            self.emit_overlay();
        }
    }

    /// Pointer gesture abandoned.
    pub fn pointer_cancel(&mut self) {
        self.cancel_drag();
        if self.selection.mode().is_gesture() {
            self.selection.cancel_gesture(&mut self.canvas, self.context.breakpoint);
            self.emit_overlay();
        }
    }

    /// Pointer entered an element: preview its hover styles.
    pub fn hover_enter(&mut self, id: ElementId) {
        let breakpoint = self.context.breakpoint;
        if let Some(element) = self.canvas.get_mut(id) {
            StyleResolver::hover_enter(element, breakpoint);
            self.hovered = Some(id);
        }
    }

    /// Pointer left an element: restore its base styles.
    pub fn hover_leave(&mut self, id: ElementId) {
        let breakpoint = self.context.breakpoint;
        if let Some(element) = self.canvas.get_mut(id) {
            StyleResolver::hover_leave(element, breakpoint);
        }
        if self.hovered == Some(id) {
            self.hovered = None;
        }
    }

    // -----------------------------------------------------------------------
    // Keyboard
    // -----------------------------------------------------------------------

    /// Handle a key press. Returns `true` if it did something.
    pub fn handle_key(&mut self, key: &str, modifiers: KeyModifiers) -> bool {
        if modifiers.primary() {
            return match key.to_ascii_lowercase().as_str() {
                "z" if modifiers.shift => self.redo(),
                "z" => self.undo(),
                "y" => self.redo(),
                "c" => self.copy(),
                "x" => self.cut(),
                "v" => self.paste().is_some(),
                "d" => self.duplicate().is_some(),
                _ => false,
            };
        }
        let step = if modifiers.shift {
            self.config.large_nudge_step
        } else {
            self.config.nudge_step
        };
        match key {
            "Delete" | "Backspace" => self.delete_selected(),
            "Escape" => {
                let dragging = self.drag.is_dragging();
                self.pointer_cancel();
                self.deselect() || dragging
            }
            "ArrowUp" => self.nudge(0.0, -step),
            "ArrowDown" => self.nudge(0.0, step),
            "ArrowLeft" => self.nudge(-step, 0.0),
            "ArrowRight" => self.nudge(step, 0.0),
            _ => false,
        }
    }

    fn nudge(&mut self, dx: f32, dy: f32) -> bool {
        let moved = self
            .selection
            .nudge(&mut self.canvas, dx, dy, self.context.breakpoint);
        if moved {
            self.commit("nudge");
        }
        moved
    }

    /// Dispatch a host input event.
    pub fn handle_event(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::Pointer { x, y, button, phase } => {
                if *button != 0 {
                    return false;
                }
                let point = Point::new(*x, *y);
                match phase {
                    PointerPhase::Down => self.pointer_down(point),
                    PointerPhase::Move => self.pointer_move(point),
                    PointerPhase::Up => self.pointer_up(point),
                    PointerPhase::Cancel => self.pointer_cancel(),
                }
                true
            }
            InputEvent::Drag { x, y, phase, payload } => {
                let point = Point::new(*x, *y);
                match phase {
                    PointerPhase::Down => {
                        let Some(payload) = payload.clone() else {
                            tracing::debug!("Drag start without payload ignored");
                            return false;
                        };
                        self.begin_drag(payload);
                        self.drag_over(point);
                        true
                    }
                    PointerPhase::Move => self.drag_over(point).is_some(),
                    PointerPhase::Up => {
                        self.drag_over(point);
                        self.drop_payload().is_mutation()
                    }
                    PointerPhase::Cancel => {
                        self.cancel_drag();
                        true
                    }
                }
            }
            InputEvent::Key { key, pressed, modifiers } => *pressed && self.handle_key(key, *modifiers),
            InputEvent::HoverEnter { element } => {
                self.hover_enter(*element);
                true
            }
            InputEvent::HoverLeave { element } => {
                self.hover_leave(*element);
                true
            }
        }
    }

    // -----------------------------------------------------------------------
    // Read-only views
    // -----------------------------------------------------------------------

    /// Depth-first outline of the tree below the page body.
    #[must_use]
    pub fn layers(&self) -> Vec<LayerEntry> {
        let selected = self.selection.selected();
        self.canvas
            .walk()
            .into_iter()
            .filter(|(depth, _)| *depth > 0)
            .filter_map(|(depth, id)| {
                let element = self.canvas.get(id)?;
                Some(LayerEntry {
                    depth: depth - 1,
                    id,
                    component_type: element.component_type.clone(),
                    label: element.label(),
                    selected: selected == Some(id),
                })
            })
            .collect()
    }

    /// Generated stylesheet for the whole canvas.
    #[must_use]
    pub fn export_css(&self) -> String {
        export::serialize_styles(&self.canvas, &ExportOptions::default())
    }

    /// Standalone HTML document.
    #[must_use]
    pub fn export_document(&self) -> String {
        export::export_document(&self.canvas, &ExportOptions::default())
    }

    /// Body markup in the given mode.
    #[must_use]
    pub fn markup(&self, mode: MarkupMode) -> String {
        export::render_markup(&self.canvas, mode, &ExportOptions::default())
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    /// Capture the session as a project file.
    #[must_use]
    pub fn save_project(&self) -> ProjectFile {
        ProjectFile::capture(&self.canvas, &self.assets, &self.blocks)
    }

    /// Replace the session content with a project.
    ///
    /// History restarts at the loaded state.
    ///
    /// # Errors
    ///
    /// Returns an error if the project document holds malformed or
    /// duplicate ids, or a tag or attribute name in the document or its
    /// blocks is unsafe; the session is unchanged in that case.
    pub fn load_project(&mut self, project: &ProjectFile) -> CanvasResult<()> {
        let canvas = project.to_canvas()?;
        project
            .blocks
            .iter()
            .try_for_each(ComponentTemplate::check_markup_names)?;
        self.install(canvas);
        self.assets = project.assets.clone();
        self.blocks.clone_from(&project.blocks);
        self.registry = ComponentRegistry::with_templates(self.blocks.clone());
        self.clipboard = None;
        if let Some(snapshot) = self.snapshot() {
            self.history.reset(snapshot);
        }
        tracing::info!(
            "Loaded project with {} elements and {} assets",
            self.canvas.element_count(),
            self.assets.len()
        );
        self.events.push(EditorEvent::SelectionChanged {
            element: None,
            styles: StyleMap::new(),
        });
        self.events.push(EditorEvent::ContentChanged);
        self.emit_history();
        self.emit_overlay();
        Ok(())
    }
}

impl Default for CanvasController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectionMode;

    fn with_button() -> (CanvasController, ElementId) {
        let mut controller = CanvasController::new();
        let root = controller.canvas().root();
        let button = controller.add_component("button", root, 0).unwrap();
        controller.take_events();
        (controller, button)
    }

    #[test]
    fn test_new_session_has_one_snapshot() {
        let controller = CanvasController::new();
        assert_eq!(controller.history().len(), 1);
        assert!(!controller.history().can_undo());
        assert_eq!(controller.canvas().element_count(), 1);
    }

    #[test]
    fn test_add_component_selects_and_records() {
        let (controller, button) = with_button();
        assert_eq!(controller.selected(), Some(button));
        assert!(controller.history().can_undo());
        assert!(controller.canvas().get(button).unwrap().handlers_bound);
    }

    #[test]
    fn test_unknown_component_is_error() {
        let mut controller = CanvasController::new();
        let root = controller.canvas().root();
        let err = controller.add_component("carousel", root, 0).unwrap_err();
        assert!(matches!(err, CanvasError::UnknownComponent(_)));
        assert_eq!(controller.history().len(), 1);
    }

    #[test]
    fn test_style_edit_writes_current_cell() {
        let (mut controller, button) = with_button();
        controller.set_breakpoint(Breakpoint::Tablet);
        assert!(controller.update_element_style("fontSize", "20px"));

        let element = controller.canvas().get(button).unwrap();
        assert_eq!(
            element.styles.get(InteractionState::Base, Breakpoint::Tablet, "font-size"),
            Some("20px")
        );
        assert_eq!(
            element.styles.get(InteractionState::Base, Breakpoint::Desktop, "font-size"),
            None
        );

        let events = controller.take_events();
        assert!(events.contains(&EditorEvent::ContentChanged));
        assert!(events.iter().any(|e| matches!(
            e,
            EditorEvent::SelectionChanged { styles, .. } if styles.get("font-size").map(String::as_str) == Some("20px")
        )));
    }

    #[test]
    fn test_same_value_is_not_recorded() {
        let (mut controller, _) = with_button();
        let len = controller.history().len();
        assert!(!controller.update_element_style("padding", "12px 24px"));
        assert_eq!(controller.history().len(), len);
    }

    #[test]
    fn test_hover_edit_does_not_touch_base() {
        let (mut controller, button) = with_button();
        controller.set_state(InteractionState::Hover);
        controller.update_element_style("background-color", "#000");

        let element = controller.canvas().get(button).unwrap();
        assert_eq!(element.applied.get("background-color").map(String::as_str), Some("#3b82f6"));
        assert_eq!(
            controller.resolved_styles(button).get("background-color").map(String::as_str),
            Some("#000")
        );
    }

    #[test]
    fn test_undo_redo_restores_content() {
        let (mut controller, button) = with_button();
        let before = controller.content_snapshot();
        controller.update_element_style("color", "red");
        let after = controller.content_snapshot();

        assert!(controller.undo());
        assert_eq!(controller.content_snapshot(), before);
        assert_eq!(controller.selected(), None);
        assert!(controller.canvas().get(button).unwrap().handlers_bound);

        assert!(controller.redo());
        assert_eq!(controller.content_snapshot(), after);
        assert!(!controller.redo());
    }

    #[test]
    fn test_new_edit_after_undo_drops_redo() {
        let (mut controller, _) = with_button();
        controller.update_element_style("color", "red");
        controller.undo();
        let root = controller.canvas().root();
        controller.add_component("divider", root, 0).unwrap();
        assert!(!controller.history().can_redo());
    }

    #[test]
    fn test_delete_selected() {
        let (mut controller, button) = with_button();
        assert!(controller.handle_key("Delete", KeyModifiers::NONE));
        assert!(!controller.canvas().contains(button));
        assert_eq!(controller.selected(), None);
        assert!(!controller.delete_selected());
    }

    #[test]
    fn test_copy_paste_creates_fresh_ids() {
        let (mut controller, button) = with_button();
        assert!(controller.handle_key("c", KeyModifiers::CTRL));
        assert!(controller.handle_key("v", KeyModifiers::CTRL));

        let root = controller.canvas().root();
        let children = controller.canvas().children(root).to_vec();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], button);
        assert_ne!(children[1], button);
        assert_eq!(controller.selected(), Some(children[1]));
    }

    #[test]
    fn test_paste_into_selected_container() {
        let (mut controller, _) = with_button();
        controller.copy();
        let root = controller.canvas().root();
        let container = controller.add_component("container", root, 1).unwrap();
        let pasted = controller.paste().unwrap();
        assert_eq!(controller.canvas().parent(pasted), Some(container));
    }

    #[test]
    fn test_cut_then_paste_moves_content() {
        let (mut controller, button) = with_button();
        assert!(controller.cut());
        assert!(!controller.canvas().contains(button));
        let pasted = controller.paste().unwrap();
        assert_eq!(controller.canvas().get(pasted).unwrap().component_type, "button");
    }

    #[test]
    fn test_duplicate_and_reorder() {
        let (mut controller, button) = with_button();
        let copy = controller.duplicate().unwrap();
        let root = controller.canvas().root();
        assert_eq!(controller.canvas().children(root), &[button, copy]);

        assert!(controller.move_selected_up());
        assert_eq!(controller.canvas().children(root), &[copy, button]);
        assert!(!controller.move_selected_up());
        assert!(controller.move_selected_down());
        assert_eq!(controller.canvas().children(root), &[button, copy]);
    }

    #[test]
    fn test_wrap_selected() {
        let (mut controller, button) = with_button();
        let wrapper = controller.wrap_selected().unwrap();
        let root = controller.canvas().root();
        assert_eq!(controller.canvas().children(root), &[wrapper]);
        assert_eq!(controller.canvas().children(wrapper), &[button]);
        assert_eq!(controller.selected(), Some(button));
    }

    #[test]
    fn test_breakpoint_switch_reapplies() {
        let (mut controller, button) = with_button();
        controller.set_breakpoint(Breakpoint::Mobile);
        controller.update_element_style("padding", "4px");
        assert_eq!(
            controller.canvas().get(button).unwrap().applied.get("padding").map(String::as_str),
            Some("4px")
        );

        controller.set_breakpoint(Breakpoint::Desktop);
        assert_eq!(
            controller.canvas().get(button).unwrap().applied.get("padding").map(String::as_str),
            Some("12px 24px")
        );
        assert!((controller.canvas().viewport_width - 1280.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pointer_down_selects_and_body_deselects() {
        let (mut controller, button) = with_button();
        controller.deselect();
        controller
            .set_element_bounds(button, Rect::new(10.0, 10.0, 100.0, 40.0))
            .unwrap();

        controller.pointer_down(Point::new(20.0, 20.0));
        assert_eq!(controller.selected(), Some(button));
        assert_eq!(controller.selection().mode(), SelectionMode::Selected);

        controller.pointer_down(Point::new(600.0, 600.0));
        assert_eq!(controller.selected(), None);
    }

    #[test]
    fn test_resize_through_pointer_commits_once() {
        let (mut controller, button) = with_button();
        controller.update_element_style("width", "100px");
        controller
            .set_element_bounds(button, Rect::new(0.0, 0.0, 100.0, 40.0))
            .unwrap();
        let len = controller.history().len();

        controller.pointer_down(Point::new(100.0, 20.0));
        assert_eq!(controller.selection().mode(), SelectionMode::Resizing);
        controller.pointer_move(Point::new(150.0, 20.0));
        controller.pointer_move(Point::new(180.0, 20.0));
        assert_eq!(controller.history().len(), len);
        controller.pointer_up(Point::new(180.0, 20.0));

        assert_eq!(controller.history().len(), len + 1);
        assert_eq!(
            controller
                .canvas()
                .get(button)
                .unwrap()
                .styles
                .get(InteractionState::Base, Breakpoint::Desktop, "width"),
            Some("180px")
        );
    }

    #[test]
    fn test_arrow_nudge_absolute_only() {
        let (mut controller, button) = with_button();
        assert!(!controller.handle_key("ArrowRight", KeyModifiers::NONE));

        controller.update_element_style("position", "absolute");
        controller.update_element_style("left", "10px");
        assert!(controller.handle_key("ArrowRight", KeyModifiers::SHIFT));
        assert_eq!(
            controller
                .canvas()
                .get(button)
                .unwrap()
                .styles
                .get(InteractionState::Base, Breakpoint::Desktop, "left"),
            Some("20px")
        );
    }

    #[test]
    fn test_escape_deselects() {
        let (mut controller, _) = with_button();
        assert!(controller.handle_key("Escape", KeyModifiers::NONE));
        assert_eq!(controller.selected(), None);
        assert!(!controller.handle_key("Escape", KeyModifiers::NONE));
    }

    #[test]
    fn test_drag_new_component_into_body() {
        let mut controller = CanvasController::new();
        controller.begin_drag(DragPayload::NewComponent {
            component_type: "heading".to_string(),
        });
        assert!(controller.drag_over(Point::new(50.0, 50.0)).is_some());
        let outcome = controller.drop_payload();

        let DropOutcome::Inserted(id) = outcome else {
            panic!("expected insert, got {outcome:?}");
        };
        assert_eq!(controller.selected(), Some(id));
        assert!(controller.history().can_undo());
        assert!(!controller.drag().is_dragging());
    }

    #[test]
    fn test_hover_preview_is_not_recorded() {
        let (mut controller, button) = with_button();
        controller.set_state(InteractionState::Hover);
        controller.update_element_style("color", "white");
        let len = controller.history().len();

        controller.hover_enter(button);
        assert_eq!(
            controller.canvas().get(button).unwrap().text.as_ref().unwrap().applied.get("color").map(String::as_str),
            Some("white")
        );
        controller.hover_leave(button);
        assert_eq!(controller.history().len(), len);
        assert!(!controller.canvas().get(button).unwrap().hovered);
    }

    #[test]
    fn test_layers_outline() {
        let mut controller = CanvasController::new();
        let root = controller.canvas().root();
        let section = controller.add_component("section", root, 0).unwrap();
        controller.add_component("heading", section, 0).unwrap();

        let layers = controller.layers();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].depth, 0);
        assert_eq!(layers[0].component_type, "section");
        assert_eq!(layers[1].depth, 1);
        assert!(layers[1].selected);
    }

    #[test]
    fn test_save_block_joins_registry() {
        let (mut controller, _) = with_button();
        controller.update_element_style("color", "red");
        let block = controller.save_as_block("red-button", "Red Button").unwrap();
        assert_eq!(block.key, "red-button");
        assert!(controller.registry().get("red-button").is_some());
        assert!(controller.registry().get("button").is_some());
    }

    #[test]
    fn test_project_roundtrip_resets_history() {
        let (mut controller, button) = with_button();
        let project = controller.save_project();

        let mut other = CanvasController::new();
        other.load_project(&project).unwrap();
        assert!(other.canvas().contains(button));
        assert!(!other.history().can_undo());
        assert_eq!(other.content_snapshot(), controller.content_snapshot());
        assert_eq!(other.export_css(), controller.export_css());
        controller.take_events();
    }

    #[test]
    fn test_key_event_dispatch() {
        let (mut controller, _) = with_button();
        let event = InputEvent::key("z", KeyModifiers::CTRL);
        assert!(controller.handle_event(&event));
        assert_eq!(controller.canvas().element_count(), 1);
        let redo = InputEvent::key(
            "Z",
            KeyModifiers {
                shift: true,
                ..KeyModifiers::CTRL
            },
        );
        assert!(controller.handle_event(&redo));
        assert_eq!(controller.canvas().element_count(), 2);
    }

    #[test]
    fn test_style_values_cannot_break_out_of_export() {
        let mut controller = CanvasController::new();
        let root = controller.canvas().root();
        let text = controller.add_component("text", root, 0).unwrap();
        let before = controller.history().len();

        assert!(!controller.update_element_style("font-family", "x</style><script>alert(1)</script>"));
        assert!(!controller.update_element_style("color", "red; } body { display: none"));
        assert!(!controller.update_element_style("color:red", "blue"));
        assert_eq!(controller.history().len(), before);
        assert!(controller
            .canvas()
            .get(text)
            .unwrap()
            .styles
            .get(InteractionState::Base, Breakpoint::Desktop, "font-family")
            .is_none());

        assert!(controller.update_element_style("font-family", "\"Helvetica Neue\", sans-serif"));
        let doc = controller.export_document();
        assert!(!doc.contains("<script>"));
        assert!(!doc.contains("display: none"));
        assert!(doc.contains("font-family: \"Helvetica Neue\", sans-serif;"));
        assert_eq!(doc.matches("</style>").count(), 1);
    }

    #[test]
    fn test_reserved_attributes_are_refused() {
        let (mut controller, button) = with_button();
        let before = controller.history().len();
        for name in ["id", "class", "style", "data-element-id", "data-styles", "onclick", "x y"] {
            assert!(!controller.set_attribute(button, name, "x"), "accepted {name}");
        }
        assert_eq!(controller.history().len(), before);

        assert!(controller.set_attribute(button, "aria-label", "Buy"));
        let html = controller.markup(MarkupMode::Editor);
        assert_eq!(html.matches(" id=").count(), 1);
        assert!(html.contains("aria-label=\"Buy\""));
    }

    #[test]
    fn test_remove_block_restores_builtin() {
        let (mut controller, _) = with_button();
        controller.save_as_block("custom-cta", "CTA").unwrap();
        controller.update_element_style("color", "red");
        controller.save_as_block("button", "Red Button").unwrap();
        assert_eq!(controller.blocks().len(), 2);
        assert_eq!(controller.registry().get("button").unwrap().label, "Red Button");

        assert!(controller.remove_block("button"));
        assert!(controller.remove_block("custom-cta"));
        assert!(!controller.remove_block("custom-cta"));
        assert!(controller.blocks().is_empty());
        assert!(controller.registry().get("custom-cta").is_none());
        assert_ne!(controller.registry().get("button").unwrap().label, "Red Button");
    }

    #[test]
    fn test_project_with_unsafe_block_is_refused() {
        let (controller, _) = with_button();
        let mut project = controller.save_project();
        project.blocks.push(
            ComponentTemplate::new(ComponentKind::Button, "Bad", "Custom")
                .with_key("bad")
                .with_attribute("onmouseover", "alert(1)"),
        );

        let mut other = CanvasController::new();
        let before = other.content_snapshot();
        assert!(matches!(
            other.load_project(&project),
            Err(CanvasError::InvalidMarkup(_))
        ));
        assert_eq!(other.content_snapshot(), before);
        assert!(other.registry().get("bad").is_none());
    }
}
