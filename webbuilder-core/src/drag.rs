//! Drag-and-drop placement and reordering.
//!
//! ```text
//! begin_drag(payload) ──► pointer_move(point)* ──► commit_drop()
//!        │                    │ resolves DropTarget      │ mutates tree
//!        └────────────── cancel() ◄──────────────────────┘ always clears
//! ```
//!
//! Every resolution failure is a silent no-op; a drop with no target or an
//! invalid target leaves the canvas untouched.

use serde::{Deserialize, Serialize};

use crate::asset::AssetLibrary;
use crate::canvas::Canvas;
use crate::element::{Element, ElementId, LayoutAxis, Point, Rect};
use crate::registry::ComponentRegistry;
use crate::resolver::StyleResolver;
use crate::style::Breakpoint;

/// What is being dragged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DragPayload {
    /// A palette item to instantiate.
    NewComponent {
        /// Registry key.
        component_type: String,
    },
    /// An existing element being moved.
    ReorderElement {
        /// The dragged element.
        element: ElementId,
    },
    /// An uploaded asset headed for a media slot.
    Asset {
        /// Asset library id.
        asset_id: String,
    },
}

/// Relationship between the payload and the resolved target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    /// Insert as the target's previous sibling.
    Before,
    /// Insert as the target's next sibling.
    After,
    /// Append as the target's last child.
    Inside,
}

/// Resolved drop location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTarget {
    /// Element the position is relative to.
    pub target: ElementId,
    /// Where relative to `target`.
    pub position: DropPosition,
}

impl DropTarget {
    /// Create a drop target.
    #[must_use]
    pub const fn new(target: ElementId, position: DropPosition) -> Self {
        Self { target, position }
    }

    /// Parent and child index this target inserts at.
    #[must_use]
    pub fn insertion_point(&self, canvas: &Canvas) -> Option<(ElementId, usize)> {
        match self.position {
            DropPosition::Inside => canvas
                .get(self.target)
                .map(|e| (self.target, e.children.len())),
            DropPosition::Before => Some((canvas.parent(self.target)?, canvas.index_of(self.target)?)),
            DropPosition::After => Some((canvas.parent(self.target)?, canvas.index_of(self.target)? + 1)),
        }
    }
}

/// Visual feedback for the current drag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropIndicator {
    /// Nothing to show.
    None,
    /// Outline a container (or media element) the payload would land in.
    Highlight {
        /// Highlighted element.
        element: ElementId,
    },
    /// Line at the insertion point between siblings.
    InsertionLine {
        /// Container receiving the payload.
        container: ElementId,
        /// Zero-thickness rect along the insertion edge.
        line: Rect,
    },
}

/// Result of committing a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// Nothing changed.
    Ignored,
    /// A new element was instantiated.
    Inserted(ElementId),
    /// An existing element was moved.
    Moved(ElementId),
    /// An asset was bound to an element's media slot.
    AssetBound(ElementId),
}

impl DropOutcome {
    /// Whether the canvas was mutated.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Tracks at most one in-flight drag.
#[derive(Debug, Clone)]
pub struct DragDropEngine {
    payload: Option<DragPayload>,
    target: Option<DropTarget>,
    indicator: DropIndicator,
}

impl DragDropEngine {
    /// Create an idle engine.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            payload: None,
            target: None,
            indicator: DropIndicator::None,
        }
    }

    /// Start a drag, replacing any drag already in flight.
    pub fn begin_drag(&mut self, payload: DragPayload) {
        if let Some(previous) = self.payload.take() {
            tracing::debug!("Drag {previous:?} superseded");
        }
        self.target = None;
        self.indicator = DropIndicator::None;
        self.payload = Some(payload);
    }

    /// Whether a drag is in flight.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.payload.is_some()
    }

    /// The in-flight payload.
    #[must_use]
    pub const fn payload(&self) -> Option<&DragPayload> {
        self.payload.as_ref()
    }

    /// The most recently resolved target.
    #[must_use]
    pub const fn target(&self) -> Option<DropTarget> {
        self.target
    }

    /// Current visual indicator.
    #[must_use]
    pub const fn indicator(&self) -> DropIndicator {
        self.indicator
    }

    /// Drop the in-flight drag without mutating anything.
    pub fn cancel(&mut self) {
        self.payload = None;
        self.target = None;
        self.indicator = DropIndicator::None;
    }

    /// Resolve the drop target under a canvas-space point.
    ///
    /// Only bounding boxes are read, so this is cheap enough to call on
    /// every pointer move.
    pub fn pointer_move(
        &mut self,
        canvas: &Canvas,
        point: Point,
        breakpoint: Breakpoint,
    ) -> Option<DropTarget> {
        let resolved = match &self.payload {
            None => None,
            Some(DragPayload::Asset { .. }) => canvas
                .element_at(point)
                .filter(|id| canvas.get(*id).is_some_and(|e| e.media.is_some()))
                .map(|id| (DropTarget::new(id, DropPosition::Inside), DropIndicator::Highlight { element: id })),
            Some(DragPayload::NewComponent { .. }) => canvas
                .drop_zone_at(point)
                .map(|container| resolve_in_container(canvas, container, point, breakpoint, None)),
            Some(DragPayload::ReorderElement { element }) if canvas.contains(*element) => canvas
                .drop_zone_at_excluding(point, *element)
                .map(|container| resolve_in_container(canvas, container, point, breakpoint, Some(*element))),
            Some(DragPayload::ReorderElement { .. }) => None,
        };

        match resolved {
            Some((target, indicator)) => {
                self.target = Some(target);
                self.indicator = indicator;
            }
            None => {
                self.target = None;
                self.indicator = DropIndicator::None;
            }
        }
        self.target
    }

    /// Apply the in-flight drag at the resolved target.
    ///
    /// Payload and target are cleared whatever the outcome. Inserted
    /// elements come back with handlers bound and live styles applied;
    /// selection and history are left to the caller.
    pub fn commit_drop(
        &mut self,
        canvas: &mut Canvas,
        registry: &ComponentRegistry,
        assets: &AssetLibrary,
        breakpoint: Breakpoint,
    ) -> DropOutcome {
        let payload = self.payload.take();
        let target = self.target.take();
        self.indicator = DropIndicator::None;

        let (Some(payload), Some(target)) = (payload, target) else {
            tracing::debug!("Drop ignored: nothing resolved");
            return DropOutcome::Ignored;
        };

        match payload {
            DragPayload::NewComponent { component_type } => {
                insert_component(canvas, registry, &component_type, target, breakpoint)
            }
            DragPayload::ReorderElement { element } => move_element(canvas, element, target),
            DragPayload::Asset { asset_id } => bind_asset(canvas, assets, &asset_id, target),
        }
    }
}

impl Default for DragDropEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Main axis of a container at a breakpoint.
///
/// Resolved `display: flex` with a row direction is horizontal, a column
/// direction vertical; any other explicit display is block flow. Without
/// styles the kind's default axis applies.
#[must_use]
pub fn layout_axis(canvas: &Canvas, container: ElementId, breakpoint: Breakpoint) -> LayoutAxis {
    let Some(element) = canvas.get(container) else {
        return LayoutAxis::Vertical;
    };
    let styles = StyleResolver::resolve(element, breakpoint);
    let display = styles.get("display").map(|d| d.trim().to_ascii_lowercase());
    let direction = styles
        .get("flex-direction")
        .map(|d| d.trim().to_ascii_lowercase());

    match display.as_deref() {
        Some("flex" | "inline-flex") => match direction.as_deref() {
            Some(d) if d.starts_with("column") => LayoutAxis::Vertical,
            _ => LayoutAxis::Horizontal,
        },
        Some("grid" | "inline-grid") | None => element.capabilities().layout_axis,
        Some(_) => LayoutAxis::Vertical,
    }
}

fn resolve_in_container(
    canvas: &Canvas,
    container: ElementId,
    point: Point,
    breakpoint: Breakpoint,
    dragged: Option<ElementId>,
) -> (DropTarget, DropIndicator) {
    let axis = layout_axis(canvas, container, breakpoint);
    let coordinate = match axis {
        LayoutAxis::Vertical => point.y,
        LayoutAxis::Horizontal => point.x,
    };

    let closest = canvas
        .children(container)
        .iter()
        .filter(|c| Some(**c) != dragged)
        .filter_map(|c| canvas.get(*c))
        .map(|c| (c.bounds.distance_along(axis, coordinate), c))
        .fold(None, |best: Option<(f32, &Element)>, (distance, child)| match best {
            Some((d, _)) if d <= distance => best,
            _ => Some((distance, child)),
        });

    let Some((_, child)) = closest else {
        return (
            DropTarget::new(container, DropPosition::Inside),
            DropIndicator::Highlight { element: container },
        );
    };

    let bounds = child.bounds;
    let position = if coordinate < bounds.midpoint(axis) {
        DropPosition::Before
    } else {
        DropPosition::After
    };
    let edge = match position {
        DropPosition::After => bounds.start(axis) + bounds.extent(axis),
        _ => bounds.start(axis),
    };
    let line = match axis {
        LayoutAxis::Vertical => Rect::new(bounds.x, edge, bounds.width, 0.0),
        LayoutAxis::Horizontal => Rect::new(edge, bounds.y, 0.0, bounds.height),
    };
    (
        DropTarget::new(child.id, position),
        DropIndicator::InsertionLine { container, line },
    )
}

fn insert_component(
    canvas: &mut Canvas,
    registry: &ComponentRegistry,
    component_type: &str,
    target: DropTarget,
    breakpoint: Breakpoint,
) -> DropOutcome {
    let Some(template) = registry.get(component_type) else {
        tracing::debug!("Drop ignored: unknown component type '{component_type}'");
        return DropOutcome::Ignored;
    };
    let Some((parent, index)) = target.insertion_point(canvas) else {
        return DropOutcome::Ignored;
    };
    match template.instantiate(canvas, parent, index) {
        Ok(id) => {
            for node in canvas.descendants(id) {
                if let Some(element) = canvas.get_mut(node) {
                    element.handlers_bound = true;
                }
            }
            StyleResolver::apply_subtree(canvas, id, breakpoint);
            tracing::info!("Inserted {component_type} {id} into {parent} at {index}");
            DropOutcome::Inserted(id)
        }
        Err(e) => {
            tracing::debug!("Drop ignored: {e}");
            DropOutcome::Ignored
        }
    }
}

fn move_element(canvas: &mut Canvas, element: ElementId, target: DropTarget) -> DropOutcome {
    if !canvas.contains(element) || canvas.is_self_or_ancestor(element, target.target) {
        tracing::debug!("Drop ignored: {element} cannot move relative to its own subtree");
        return DropOutcome::Ignored;
    }
    let Some((parent, mut index)) = target.insertion_point(canvas) else {
        return DropOutcome::Ignored;
    };
    let current_parent = canvas.parent(element);
    let current_index = canvas.index_of(element);
    if current_parent == Some(parent) {
        if let Some(current) = current_index {
            if current < index {
                index -= 1;
            }
            if current == index {
                return DropOutcome::Ignored;
            }
        }
    }
    match canvas.move_to(element, parent, index) {
        Ok(()) => {
            tracing::info!("Moved {element} into {parent} at {index}");
            DropOutcome::Moved(element)
        }
        Err(e) => {
            tracing::debug!("Drop ignored: {e}");
            DropOutcome::Ignored
        }
    }
}

fn bind_asset(canvas: &mut Canvas, assets: &AssetLibrary, asset_id: &str, target: DropTarget) -> DropOutcome {
    let Some(asset) = assets.get(asset_id) else {
        tracing::debug!("Drop ignored: unknown asset '{asset_id}'");
        return DropOutcome::Ignored;
    };
    let Some(slot) = canvas.get_mut(target.target).and_then(|e| e.media.as_mut()) else {
        return DropOutcome::Ignored;
    };
    if !slot.kind.accepts(&asset.mime_type) {
        tracing::debug!(
            "Drop ignored: {} does not fit a {:?} slot",
            asset.mime_type,
            slot.kind
        );
        return DropOutcome::Ignored;
    }
    slot.src.clone_from(&asset.data);
    if slot.alt.is_empty() {
        slot.alt.clone_from(&asset.name);
    }
    tracing::info!("Bound asset {} to {}", asset.id, target.target);
    DropOutcome::AssetBound(target.target)
}
