//! Catalog of insertable component templates.
//!
//! The registry is built once and then only read. Custom blocks captured from
//! the canvas are handed back to the host, which passes them in when it
//! builds the next registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::element::{
    check_markup_names, ComponentKind, Element, ElementId, MediaKind, MediaSlot, TextSlot,
};
use crate::style::{Breakpoint, InteractionState, StyleMap, StyleStore};
use crate::CanvasResult;

/// Placeholder image used by the built-in image template.
const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/350x250?text=Image";

/// A markup skeleton plus default styles, addressed by a type key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentTemplate {
    /// Registry key (`button`, `two-column`, `custom-hero`, ...).
    pub key: String,
    /// Palette label.
    pub label: String,
    /// Palette category.
    #[serde(default)]
    pub category: String,
    /// Kind of the instantiated root element.
    pub kind: ComponentKind,
    /// HTML tag of the root element.
    pub tag: String,
    /// Initial user classes.
    #[serde(default)]
    pub classes: Vec<String>,
    /// Initial attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Initial text slot.
    #[serde(default)]
    pub text: Option<TextSlot>,
    /// Initial media slot.
    #[serde(default)]
    pub media: Option<MediaSlot>,
    /// Applied as the `base.desktop` cell on instantiation.
    #[serde(default)]
    pub default_styles: StyleMap,
    /// Additional style cells carried by captured blocks.
    #[serde(default, skip_serializing_if = "StyleStore::is_empty")]
    pub extra_styles: StyleStore,
    /// Nested templates instantiated as children.
    #[serde(default)]
    pub children: Vec<ComponentTemplate>,
}

fn styles(pairs: &[(&str, &str)]) -> StyleMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

impl ComponentTemplate {
    /// Start a template for a built-in kind with its default tag.
    pub fn new(kind: ComponentKind, label: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            key: kind.key().to_string(),
            label: label.into(),
            category: category.into(),
            kind,
            tag: Element::new(kind).tag,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            text: None,
            media: None,
            default_styles: StyleMap::new(),
            extra_styles: StyleStore::new(),
            children: Vec::new(),
        }
    }

    /// Override the registry key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Override the root tag.
    #[must_use]
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = tag.to_string();
        self
    }

    /// Set the text slot.
    #[must_use]
    pub fn with_text(mut self, tag: &str, text: &str) -> Self {
        self.text = Some(TextSlot::new(tag, text));
        self
    }

    /// Set the media slot.
    #[must_use]
    pub fn with_media(mut self, kind: MediaKind, src: &str, alt: &str) -> Self {
        self.media = Some(MediaSlot::new(kind, src, alt));
        self
    }

    /// Set an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the default `base.desktop` styles.
    #[must_use]
    pub fn with_styles(mut self, pairs: &[(&str, &str)]) -> Self {
        self.default_styles = styles(pairs);
        self
    }

    /// Append a child template.
    #[must_use]
    pub fn with_child(mut self, child: ComponentTemplate) -> Self {
        self.children.push(child);
        self
    }

    /// Build a detached element (without children) from this template.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut element_styles = self.extra_styles.clone();
        for (property, value) in &self.default_styles {
            element_styles.set(InteractionState::Base, Breakpoint::Desktop, property, value);
        }
        let mut element = Element::new(self.kind)
            .with_tag(self.tag.clone())
            .with_styles(element_styles);
        element.component_type.clone_from(&self.key);
        element.classes.clone_from(&self.classes);
        element.attributes.clone_from(&self.attributes);
        element.text.clone_from(&self.text);
        element.media.clone_from(&self.media);
        element
    }

    /// Instantiate the template (recursively) under `parent` at `index`.
    ///
    /// Every created element receives a fresh id.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` is not in the canvas or a tag or
    /// attribute name in the template tree is unsafe.
    pub fn instantiate(&self, canvas: &mut Canvas, parent: ElementId, index: usize) -> CanvasResult<ElementId> {
        self.check_markup_names()?;
        self.insert_tree(canvas, parent, index)
    }

    /// Validate tag and attribute names across the whole template tree.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CanvasError::InvalidMarkup`] for the first unsafe name.
    pub fn check_markup_names(&self) -> CanvasResult<()> {
        check_markup_names(&self.tag, self.text.as_ref(), &self.attributes)?;
        self.children.iter().try_for_each(Self::check_markup_names)
    }

    fn insert_tree(&self, canvas: &mut Canvas, parent: ElementId, index: usize) -> CanvasResult<ElementId> {
        let id = canvas.insert(self.to_element(), parent, index)?;
        for (i, child) in self.children.iter().enumerate() {
            child.insert_tree(canvas, id, i)?;
        }
        Ok(id)
    }

    /// Capture an element subtree as a reusable template.
    ///
    /// All style cells are kept; the `base.desktop` cell becomes the
    /// template's default styles.
    #[must_use]
    pub fn capture(canvas: &Canvas, id: ElementId, key: &str, label: &str) -> Option<Self> {
        let element = canvas.get(id)?;
        let mut extra = element.styles.clone();
        let defaults = extra
            .cell(InteractionState::Base, Breakpoint::Desktop)
            .cloned()
            .unwrap_or_default();
        for property in defaults.keys() {
            extra.remove(InteractionState::Base, Breakpoint::Desktop, property);
        }
        let children = element
            .children
            .iter()
            .filter_map(|child| {
                canvas
                    .get(*child)
                    .and_then(|c| Self::capture(canvas, *child, &c.component_type, label))
            })
            .collect();
        let mut text = element.text.clone();
        if let Some(slot) = text.as_mut() {
            slot.applied.clear();
        }
        Some(Self {
            key: key.to_string(),
            label: label.to_string(),
            category: "Custom".to_string(),
            kind: element.kind,
            tag: element.tag.clone(),
            classes: element.classes.clone(),
            attributes: element.attributes.clone(),
            text,
            media: element.media.clone(),
            default_styles: defaults,
            extra_styles: extra,
            children,
        })
    }
}

/// Read-only catalog of component templates keyed by component type.
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    templates: BTreeMap<String, ComponentTemplate>,
}

impl ComponentRegistry {
    /// Create a registry with exactly the given templates.
    #[must_use]
    pub fn from_templates(templates: impl IntoIterator<Item = ComponentTemplate>) -> Self {
        Self {
            templates: templates.into_iter().map(|t| (t.key.clone(), t)).collect(),
        }
    }

    /// The built-in catalog plus `custom` templates (custom keys win).
    #[must_use]
    pub fn with_templates(custom: impl IntoIterator<Item = ComponentTemplate>) -> Self {
        let mut registry = Self::builtin();
        for template in custom {
            tracing::debug!("Registering custom block '{}'", template.key);
            registry.templates.insert(template.key.clone(), template);
        }
        registry
    }

    /// The built-in catalog.
    #[must_use]
    pub fn builtin() -> Self {
        let column = || {
            ComponentTemplate::new(ComponentKind::Column, "Column", "Layout")
                .with_styles(&[("flex", "1"), ("min-height", "80px"), ("padding", "10px")])
        };
        Self::from_templates([
            ComponentTemplate::new(ComponentKind::Text, "Text", "Basic")
                .with_text("span", "Insert your text here")
                .with_styles(&[("padding", "10px")]),
            ComponentTemplate::new(ComponentKind::Heading, "Heading", "Basic")
                .with_tag("div")
                .with_text("h2", "Heading")
                .with_styles(&[("padding", "10px"), ("font-size", "32px"), ("font-weight", "700")]),
            ComponentTemplate::new(ComponentKind::Paragraph, "Paragraph", "Basic")
                .with_tag("div")
                .with_text("p", "Lorem ipsum dolor sit amet, consectetur adipiscing elit.")
                .with_styles(&[("padding", "10px"), ("line-height", "1.6")]),
            ComponentTemplate::new(ComponentKind::Button, "Button", "Basic")
                .with_text("span", "Click me")
                .with_attribute("type", "button")
                .with_styles(&[("padding", "12px 24px"), ("backgroundColor", "#3b82f6")]),
            ComponentTemplate::new(ComponentKind::Link, "Link", "Basic")
                .with_text("span", "Link")
                .with_attribute("href", "#")
                .with_styles(&[("color", "#3b82f6"), ("text-decoration", "underline")]),
            ComponentTemplate::new(ComponentKind::Image, "Image", "Media")
                .with_media(MediaKind::Image, PLACEHOLDER_IMAGE, "Image")
                .with_styles(&[("max-width", "100%"), ("display", "block")]),
            ComponentTemplate::new(ComponentKind::Video, "Video", "Media")
                .with_media(MediaKind::Video, "", "Video")
                .with_attribute("controls", "")
                .with_styles(&[("width", "100%"), ("display", "block")]),
            ComponentTemplate::new(ComponentKind::Container, "Container", "Layout")
                .with_styles(&[("padding", "20px"), ("min-height", "100px")]),
            ComponentTemplate::new(ComponentKind::Section, "Section", "Layout")
                .with_styles(&[("padding", "40px 20px"), ("min-height", "200px")]),
            ComponentTemplate::new(ComponentKind::Row, "Row", "Layout")
                .with_styles(&[("display", "flex"), ("gap", "10px"), ("min-height", "80px")]),
            column(),
            ComponentTemplate::new(ComponentKind::TwoColumn, "Two Columns", "Layout")
                .with_styles(&[("display", "flex"), ("gap", "20px")])
                .with_child(column())
                .with_child(column()),
            ComponentTemplate::new(ComponentKind::Divider, "Divider", "Basic")
                .with_styles(&[("border", "none"), ("border-top", "1px solid #e5e7eb"), ("margin", "20px 0")]),
            ComponentTemplate::new(ComponentKind::Spacer, "Spacer", "Basic")
                .with_styles(&[("height", "40px")]),
        ])
    }

    /// Look up a template by component type.
    #[must_use]
    pub fn get(&self, component_type: &str) -> Option<&ComponentTemplate> {
        self.templates.get(component_type)
    }

    /// All templates ordered by key.
    pub fn templates(&self) -> impl Iterator<Item = &ComponentTemplate> {
        self.templates.values()
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the registry has no templates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let registry = ComponentRegistry::builtin();
        let button = registry.get("button").expect("button template");
        assert_eq!(button.kind, ComponentKind::Button);
        assert!(registry.get("carousel").is_none());
        assert!(registry.len() >= 10);
    }

    #[test]
    fn test_default_styles_land_in_base_desktop() {
        let registry = ComponentRegistry::builtin();
        let element = registry.get("button").unwrap().to_element();

        assert_eq!(element.component_type, "button");
        assert_eq!(
            element.styles.cell(InteractionState::Base, Breakpoint::Desktop),
            Some(&styles(&[("padding", "12px 24px"), ("background-color", "#3b82f6")]))
        );
        assert!(element.styles.cell(InteractionState::Base, Breakpoint::Mobile).is_none());
    }

    #[test]
    fn test_two_column_instantiates_children() {
        let registry = ComponentRegistry::builtin();
        let mut canvas = Canvas::default();
        let root = canvas.root();

        let id = registry
            .get("two-column")
            .unwrap()
            .instantiate(&mut canvas, root, 0)
            .unwrap();

        let columns = canvas.children(id);
        assert_eq!(columns.len(), 2);
        assert!(columns
            .iter()
            .all(|c| canvas.get(*c).map(|e| e.kind) == Some(ComponentKind::Column)));
    }

    #[test]
    fn test_capture_then_instantiate_gives_fresh_ids() {
        let registry = ComponentRegistry::builtin();
        let mut canvas = Canvas::default();
        let root = canvas.root();
        let row = registry.get("two-column").unwrap().instantiate(&mut canvas, root, 0).unwrap();
        canvas
            .get_mut(row)
            .unwrap()
            .styles
            .set(InteractionState::Hover, Breakpoint::Mobile, "gap", "4px");

        let block = ComponentTemplate::capture(&canvas, row, "custom-row", "My Row").unwrap();
        assert_eq!(block.children.len(), 2);
        assert_eq!(block.default_styles.get("gap").map(String::as_str), Some("20px"));

        let custom = ComponentRegistry::with_templates([block]);
        let copy = custom.get("custom-row").unwrap().instantiate(&mut canvas, root, 1).unwrap();

        assert_ne!(copy, row);
        let copied = canvas.get(copy).unwrap();
        assert_eq!(copied.component_type, "custom-row");
        assert_eq!(copied.styles, canvas.get(row).unwrap().styles);
        assert_eq!(canvas.children(copy).len(), 2);
    }

    #[test]
    fn test_unsafe_template_names_insert_nothing() {
        let mut canvas = Canvas::default();
        let root = canvas.root();
        let block = ComponentTemplate::new(ComponentKind::Section, "Bad", "Custom")
            .with_key("bad")
            .with_child(
                ComponentTemplate::new(ComponentKind::Paragraph, "P", "Custom")
                    .with_text("p></p><script>x</script><p", "hi"),
            );
        let err = block.instantiate(&mut canvas, root, 0).unwrap_err();
        assert!(matches!(err, crate::CanvasError::InvalidMarkup(_)));
        assert_eq!(canvas.element_count(), 1);

        let handler = ComponentTemplate::new(ComponentKind::Button, "B", "Custom")
            .with_attribute("onclick", "alert(1)");
        assert!(handler.check_markup_names().is_err());
    }

    #[test]
    fn test_builtin_templates_are_markup_safe() {
        let registry = ComponentRegistry::builtin();
        assert!(registry.templates().all(|t| t.check_markup_names().is_ok()));
    }

    #[test]
    fn test_deserialized_extra_styles_are_sanitized() {
        let json = r#"{
            "key": "x", "label": "X", "kind": "section", "tag": "section",
            "extra_styles": {"hover": {"desktop": {"color": "red}</style>", "gap": "4px"}}}
        }"#;
        let template: ComponentTemplate = serde_json::from_str(json).unwrap();
        let cell = template
            .extra_styles
            .cell(InteractionState::Hover, Breakpoint::Desktop)
            .unwrap();
        assert_eq!(cell.len(), 1);
        assert!(cell.contains_key("gap"));
    }
}
