//! Canvas tree: owns every element and their parent/child links.

use std::collections::HashMap;

use crate::element::{ComponentKind, Element, ElementId, Point, Rect};
use crate::{CanvasError, CanvasResult};

/// Default canvas viewport width in pixels.
pub const DEFAULT_WIDTH: f32 = 1280.0;

/// Default canvas viewport height in pixels.
pub const DEFAULT_HEIGHT: f32 = 800.0;

/// The element tree being edited.
///
/// Elements are stored in an id-indexed arena; the root is a synthetic
/// `element`-kind drop zone standing in for the page body.
#[derive(Debug, Clone)]
pub struct Canvas {
    /// All elements in the tree, indexed by ID.
    elements: HashMap<ElementId, Element>,
    /// The page-body container.
    root: ElementId,
    /// Simulated viewport width in pixels.
    pub viewport_width: f32,
    /// Simulated viewport height in pixels.
    pub viewport_height: f32,
    /// Current zoom level (1.0 = 100%).
    pub zoom: f32,
    /// Pan offset X in screen pixels.
    pub pan_x: f32,
    /// Pan offset Y in screen pixels.
    pub pan_y: f32,
}

impl Canvas {
    /// Create an empty canvas with the given viewport size.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        let root = Element::new(ComponentKind::Element)
            .with_tag("body")
            .with_bounds(Rect::new(0.0, 0.0, width, height));
        Self::with_root(root, width, height)
    }

    /// Create a canvas around an existing root element.
    #[must_use]
    pub fn with_root(mut root: Element, width: f32, height: f32) -> Self {
        root.parent = None;
        let id = root.id;
        let mut elements = HashMap::new();
        elements.insert(id, root);
        Self {
            elements,
            root: id,
            viewport_width: width,
            viewport_height: height,
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    /// ID of the root canvas container.
    #[must_use]
    pub const fn root(&self) -> ElementId {
        self.root
    }

    /// Get an element by ID.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Get a mutable reference to an element by ID.
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    /// Whether the element is in the tree.
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    /// Number of elements, root included.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Whether only the root remains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.len() == 1
    }

    /// Iterate over all elements in arbitrary order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Iterate mutably over all elements in arbitrary order.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.elements.values_mut()
    }

    /// Parent of an element.
    #[must_use]
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.get(id).and_then(|e| e.parent)
    }

    /// Children of an element in document order (empty if unknown).
    #[must_use]
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.get(id).map_or(&[], |e| e.children.as_slice())
    }

    /// Position of an element among its siblings.
    #[must_use]
    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Whether `ancestor` is `id` itself or one of its ancestors.
    #[must_use]
    pub fn is_self_or_ancestor(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Depth-first (pre-order) ids of a subtree, `id` first.
    #[must_use]
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if let Some(element) = self.get(node) {
                out.push(node);
                stack.extend(element.children.iter().rev().copied());
            }
        }
        out
    }

    /// Depth-first walk of the whole tree as `(depth, id)`, root at depth 0.
    #[must_use]
    pub fn walk(&self) -> Vec<(usize, ElementId)> {
        let mut out = Vec::new();
        let mut stack = vec![(0, self.root)];
        while let Some((depth, node)) = stack.pop() {
            if let Some(element) = self.get(node) {
                out.push((depth, node));
                stack.extend(element.children.iter().rev().map(|c| (depth + 1, *c)));
            }
        }
        out
    }

    /// Insert a detached element under `parent` at `index` (clamped).
    ///
    /// # Errors
    ///
    /// Returns an error if the parent is unknown or the id is already in use.
    pub fn insert(
        &mut self,
        mut element: Element,
        parent: ElementId,
        index: usize,
    ) -> CanvasResult<ElementId> {
        let id = element.id;
        if self.contains(id) {
            return Err(CanvasError::InvalidOperation(format!(
                "element {id} is already on the canvas"
            )));
        }
        let siblings = &mut self
            .elements
            .get_mut(&parent)
            .ok_or_else(|| CanvasError::ElementNotFound(parent.to_string()))?
            .children;
        let at = index.min(siblings.len());
        siblings.insert(at, id);
        element.parent = Some(parent);
        self.elements.insert(id, element);
        Ok(id)
    }

    /// Unlink an element from its parent without dropping it from the arena.
    fn detach(&mut self, id: ElementId) -> CanvasResult<(ElementId, usize)> {
        if id == self.root {
            return Err(CanvasError::RootImmutable);
        }
        let parent = self
            .parent(id)
            .ok_or_else(|| CanvasError::ElementNotFound(id.to_string()))?;
        let siblings = &mut self
            .elements
            .get_mut(&parent)
            .ok_or_else(|| CanvasError::ElementNotFound(parent.to_string()))?
            .children;
        let index = siblings.iter().position(|c| *c == id);
        debug_assert!(index.is_some(), "parent {parent} does not list child {id}");
        let index = index.ok_or_else(|| CanvasError::ElementNotFound(id.to_string()))?;
        siblings.remove(index);
        Ok((parent, index))
    }

    /// Move an element (with its whole subtree) under `new_parent` at `index`.
    ///
    /// `index` is interpreted against the parent's children *after* the
    /// element has been detached.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::CycleDetected`] if `new_parent` is the element
    /// itself or inside its subtree, [`CanvasError::RootImmutable`] for the
    /// root, or a not-found error for unknown ids.
    pub fn move_to(&mut self, id: ElementId, new_parent: ElementId, index: usize) -> CanvasResult<()> {
        if id == self.root {
            return Err(CanvasError::RootImmutable);
        }
        if !self.contains(new_parent) {
            return Err(CanvasError::ElementNotFound(new_parent.to_string()));
        }
        if self.is_self_or_ancestor(id, new_parent) {
            return Err(CanvasError::CycleDetected(id.to_string()));
        }
        self.detach(id)?;
        let siblings = &mut self
            .elements
            .get_mut(&new_parent)
            .ok_or_else(|| CanvasError::ElementNotFound(new_parent.to_string()))?
            .children;
        let at = index.min(siblings.len());
        siblings.insert(at, id);
        if let Some(element) = self.elements.get_mut(&id) {
            element.parent = Some(new_parent);
        }
        Ok(())
    }

    /// Remove an element and all its descendants, returning the removed element.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not found or is the root.
    pub fn remove(&mut self, id: ElementId) -> CanvasResult<Element> {
        self.detach(id)?;
        let subtree = self.descendants(id);
        let mut removed = None;
        for node in subtree {
            let element = self.elements.remove(&node);
            if node == id {
                removed = element;
            }
        }
        removed.ok_or_else(|| CanvasError::ElementNotFound(id.to_string()))
    }

    /// Remove every element except the root.
    pub fn clear(&mut self) {
        let root = self.root;
        self.elements.retain(|id, _| *id == root);
        if let Some(element) = self.elements.get_mut(&root) {
            element.children.clear();
        }
    }

    /// Report an element's live bounding box.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not found.
    pub fn set_bounds(&mut self, id: ElementId, bounds: Rect) -> CanvasResult<()> {
        let element = self
            .get_mut(id)
            .ok_or_else(|| CanvasError::ElementNotFound(id.to_string()))?;
        element.bounds = bounds;
        Ok(())
    }

    /// Set the viewport dimensions; the root box follows the viewport.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport_width = width;
        self.viewport_height = height;
        let root = self.root;
        if let Some(element) = self.get_mut(root) {
            element.bounds = Rect::new(0.0, 0.0, width, height);
        }
    }

    /// Convert screen coordinates to canvas coordinates.
    #[must_use]
    pub fn to_canvas_point(&self, screen: Point) -> Point {
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        Point::new((screen.x - self.pan_x) / zoom, (screen.y - self.pan_y) / zoom)
    }

    /// Innermost element containing a canvas point, filtered by `accept`.
    ///
    /// Takes the deepest element under the point, then the nearest accepted
    /// element on its ancestor chain.
    fn innermost_at(&self, point: Point, accept: impl Fn(&Element) -> bool) -> Option<ElementId> {
        let root = self.get(self.root)?;
        if !root.contains_point(point) {
            return None;
        }
        let hit = self.deepest_at(root, point)?;
        let mut current = Some(hit);
        while let Some(element) = current {
            if accept(element) {
                return Some(element.id);
            }
            current = element.parent.and_then(|p| self.get(p));
        }
        None
    }

    /// Deepest element in `element`'s subtree whose box holds the point.
    /// Elements never laid out are skipped.
    ///
    /// Later siblings (painted on top) win. Every subtree is searched, not
    /// only children whose box holds the point, since positioned
    /// descendants can overflow their parent.
    fn deepest_at<'a>(&'a self, element: &'a Element, point: Point) -> Option<&'a Element> {
        element
            .children
            .iter()
            .rev()
            .filter_map(|c| self.get(*c))
            .find_map(|c| self.deepest_at(c, point))
            .or_else(|| {
                (!element.bounds.is_empty() && element.contains_point(point)).then_some(element)
            })
    }

    /// Innermost element under a canvas point whose handlers are bound.
    #[must_use]
    pub fn element_at(&self, point: Point) -> Option<ElementId> {
        self.innermost_at(point, |e| e.handlers_bound || e.id == self.root)
    }

    /// Innermost drop zone under a canvas point (the root counts).
    #[must_use]
    pub fn drop_zone_at(&self, point: Point) -> Option<ElementId> {
        self.innermost_at(point, Element::is_drop_zone)
    }

    /// Innermost drop zone under a canvas point, skipping a subtree.
    #[must_use]
    pub fn drop_zone_at_excluding(&self, point: Point, excluded: ElementId) -> Option<ElementId> {
        self.innermost_at(point, |e| {
            e.is_drop_zone() && !self.is_self_or_ancestor(excluded, e.id)
        })
    }

    /// Attach interaction handlers to every element.
    pub fn bind_all(&mut self) {
        for element in self.elements.values_mut() {
            element.handlers_bound = true;
        }
    }

    /// Verify parent/child links agree (debug builds only).
    pub fn debug_check(&self) {
        if cfg!(debug_assertions) {
            for element in self.elements.values() {
                for child in &element.children {
                    let linked = self.get(*child).and_then(|c| c.parent);
                    debug_assert_eq!(linked, Some(element.id), "broken link to {child}");
                }
                if element.id != self.root {
                    debug_assert!(element.parent.is_some(), "orphan element {}", element.id);
                }
            }
        }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}
