//! Serialized representation of the canvas tree.
//!
//! Used for history snapshots and project files. Each element's styles are
//! carried as the same JSON string the editor attaches to its markup, so a
//! corrupt style payload only costs that element its styling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::element::{
    check_markup_names, ComponentKind, Element, ElementId, MediaSlot, Rect, TextSlot,
};
use crate::style::StyleStore;
use crate::{CanvasError, CanvasResult};

/// Document-friendly element description, children nested in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDocument {
    /// Element identifier.
    pub id: String,
    /// Template key.
    pub component_type: String,
    /// Component kind.
    #[serde(default = "ElementDocument::default_kind")]
    pub kind: ComponentKind,
    /// HTML tag.
    pub tag: String,
    /// User classes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    /// Extra attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Text slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextSlot>,
    /// Media slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaSlot>,
    /// Style store encoded as JSON.
    #[serde(default)]
    pub styles: String,
    /// Children in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementDocument>,
}

impl ElementDocument {
    const fn default_kind() -> ComponentKind {
        ComponentKind::Element
    }

    /// Capture an element and its subtree.
    #[must_use]
    pub fn capture(canvas: &Canvas, element: &Element) -> Self {
        let mut text = element.text.clone();
        if let Some(slot) = text.as_mut() {
            slot.applied.clear();
        }
        Self {
            id: element.id.to_string(),
            component_type: element.component_type.clone(),
            kind: element.kind,
            tag: element.tag.clone(),
            classes: element.classes.clone(),
            attributes: element.attributes.clone(),
            text,
            media: element.media.clone(),
            styles: element.styles.to_json(),
            children: element
                .children
                .iter()
                .filter_map(|c| canvas.get(*c))
                .map(|c| Self::capture(canvas, c))
                .collect(),
        }
    }

    /// Convert this node (without children) to a runtime element.
    ///
    /// Derived state (bounds, applied styles, selection, handlers) starts
    /// cleared; styles that fail to decode fall back to empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is not a valid UUID, or a tag or attribute
    /// name could not be written back into markup verbatim.
    pub fn to_element(&self) -> CanvasResult<Element> {
        check_markup_names(&self.tag, self.text.as_ref(), &self.attributes)?;
        let mut element = Element::new(self.kind)
            .with_tag(self.tag.clone())
            .with_styles(StyleStore::from_json_lossy(&self.styles));
        element.id = ElementId::parse(&self.id)?;
        element.component_type.clone_from(&self.component_type);
        element.classes.clone_from(&self.classes);
        element.attributes.clone_from(&self.attributes);
        element.text.clone_from(&self.text);
        element.media.clone_from(&self.media);
        Ok(element)
    }

    /// Copy of this subtree with every id replaced by a fresh one.
    #[must_use]
    pub fn with_fresh_ids(&self) -> Self {
        Self {
            id: ElementId::new().to_string(),
            children: self.children.iter().map(Self::with_fresh_ids).collect(),
            ..self.clone()
        }
    }

    /// Insert this subtree under `parent` at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent is unknown or an id is malformed or
    /// already on the canvas.
    pub fn insert_into(&self, canvas: &mut Canvas, parent: ElementId, index: usize) -> CanvasResult<ElementId> {
        let id = canvas.insert(self.to_element()?, parent, index)?;
        for (i, child) in self.children.iter().enumerate() {
            child.insert_into(canvas, id, i)?;
        }
        Ok(id)
    }
}

/// Viewport information.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportDocument {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Zoom level.
    #[serde(default = "ViewportDocument::default_zoom")]
    pub zoom: f32,
    /// Horizontal pan offset.
    #[serde(default)]
    pub pan_x: f32,
    /// Vertical pan offset.
    #[serde(default)]
    pub pan_y: f32,
}

impl ViewportDocument {
    const fn default_zoom() -> f32 {
        1.0
    }
}

impl From<&Canvas> for ViewportDocument {
    fn from(canvas: &Canvas) -> Self {
        Self {
            width: canvas.viewport_width,
            height: canvas.viewport_height,
            zoom: canvas.zoom,
            pan_x: canvas.pan_x,
            pan_y: canvas.pan_y,
        }
    }
}

/// Canonical canvas document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasDocument {
    /// Viewport metadata.
    pub viewport: ViewportDocument,
    /// The root element with the whole tree nested below it.
    pub root: ElementDocument,
}

impl CanvasDocument {
    /// Build a document from a runtime canvas.
    #[must_use]
    pub fn from_canvas(canvas: &Canvas) -> Self {
        let root = canvas.get(canvas.root()).map_or_else(
            || ElementDocument::capture(canvas, &Element::new(ComponentKind::Element).with_tag("body")),
            |root| ElementDocument::capture(canvas, root),
        );
        Self {
            viewport: ViewportDocument::from(canvas),
            root,
        }
    }

    /// Rebuild a runtime canvas from this document.
    ///
    /// The restored elements have no handlers bound and no bounds reported.
    ///
    /// # Errors
    ///
    /// Returns an error if an id is malformed or appears twice, or a tag or
    /// attribute name is not safe to write into markup.
    pub fn into_canvas(self) -> CanvasResult<Canvas> {
        let root = self.root.to_element()?;
        let mut canvas = Canvas::with_root(root, self.viewport.width, self.viewport.height);
        canvas.zoom = self.viewport.zoom;
        canvas.pan_x = self.viewport.pan_x;
        canvas.pan_y = self.viewport.pan_y;
        canvas.set_viewport(self.viewport.width, self.viewport.height);

        let root_id = canvas.root();
        for (i, child) in self.root.children.iter().enumerate() {
            child.insert_into(&mut canvas, root_id, i)?;
        }
        canvas.debug_check();
        Ok(canvas)
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CanvasResult<String> {
        serde_json::to_string(self).map_err(CanvasError::from)
    }

    /// Parse from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not a canvas document.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        serde_json::from_str(json).map_err(CanvasError::from)
    }
}

/// Bounds of every element, for carrying layout across a restore.
#[must_use]
pub fn bounds_of(canvas: &Canvas) -> BTreeMap<ElementId, Rect> {
    canvas.elements().map(|e| (e.id, e.bounds)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Breakpoint, InteractionState};

    fn sample() -> (Canvas, ElementId, ElementId) {
        let mut canvas = Canvas::new(1024.0, 768.0);
        let root = canvas.root();
        let section = canvas.insert(Element::new(ComponentKind::Section), root, 0).unwrap();
        let mut button = Element::new(ComponentKind::Button).with_text(TextSlot::new("span", "Go"));
        button
            .styles
            .set(InteractionState::Hover, Breakpoint::Tablet, "color", "red");
        button.add_class("cta");
        let button = canvas.insert(button, section, 0).unwrap();
        (canvas, section, button)
    }

    #[test]
    fn test_document_restores_tree() {
        let (mut canvas, section, button) = sample();
        canvas.bind_all();
        canvas.zoom = 1.5;

        let json = CanvasDocument::from_canvas(&canvas).to_json().unwrap();
        let restored = CanvasDocument::from_json(&json).unwrap().into_canvas().unwrap();

        assert_eq!(restored.root(), canvas.root());
        assert_eq!(restored.children(restored.root()), &[section]);
        assert_eq!(restored.children(section), &[button]);
        let element = restored.get(button).unwrap();
        assert_eq!(element.classes, vec!["cta".to_string()]);
        assert_eq!(element.styles, canvas.get(button).unwrap().styles);
        assert!(!element.handlers_bound);
        assert!((restored.zoom - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_corrupt_styles_fail_open() {
        let (canvas, _, button) = sample();
        let mut doc = CanvasDocument::from_canvas(&canvas);
        doc.root.children[0].children[0].styles = "{oops".to_string();

        let restored = doc.into_canvas().unwrap();
        assert!(restored.get(button).unwrap().styles.is_empty());
    }

    #[test]
    fn test_fresh_ids_copy() {
        let (mut canvas, section, button) = sample();
        let doc = ElementDocument::capture(&canvas, canvas.get(section).unwrap()).with_fresh_ids();
        let root = canvas.root();
        let copy = doc.insert_into(&mut canvas, root, 1).unwrap();

        assert_ne!(copy, section);
        let copied_child = canvas.children(copy)[0];
        assert_ne!(copied_child, button);
        assert_eq!(
            canvas.get(copied_child).unwrap().styles,
            canvas.get(button).unwrap().styles
        );
        assert_eq!(canvas.element_count(), 5);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let (canvas, _, _) = sample();
        let mut doc = CanvasDocument::from_canvas(&canvas);
        let copy = doc.root.children[0].clone();
        doc.root.children.push(copy);
        assert!(doc.into_canvas().is_err());
    }

    #[test]
    fn test_unsafe_markup_names_are_rejected() {
        let (canvas, _, _) = sample();
        let clean = CanvasDocument::from_canvas(&canvas);

        let mut doc = clean.clone();
        doc.root.children[0].tag = "div><script>alert(1)</script".to_string();
        assert!(matches!(doc.into_canvas(), Err(CanvasError::InvalidMarkup(_))));

        let mut doc = clean.clone();
        if let Some(slot) = doc.root.children[0].children[0].text.as_mut() {
            slot.tag = "span onclick=x".to_string();
        }
        assert!(matches!(doc.into_canvas(), Err(CanvasError::InvalidMarkup(_))));

        for name in ["data-element-id", "onload", "a=\"\" b"] {
            let mut doc = clean.clone();
            doc.root.children[0]
                .attributes
                .insert(name.to_string(), "x".to_string());
            assert!(
                matches!(doc.into_canvas(), Err(CanvasError::InvalidMarkup(_))),
                "accepted {name}"
            );
        }

        let mut doc = clean;
        doc.root.children[0]
            .attributes
            .insert("aria-label".to_string(), "Hero".to_string());
        assert!(doc.into_canvas().is_ok());
    }
}
