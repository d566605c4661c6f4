//! Canvas elements - the nodes of the page being built.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::style::{StyleMap, StyleStore};
use crate::{CanvasError, CanvasResult};

/// Prefix of the DOM `id` attribute rendered for every element.
pub const DOM_ID_PREFIX: &str = "wb-";

/// Unique identifier for an element.
///
/// Generated from a v4 UUID, so ids are never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse an id from its string form, with or without the DOM prefix.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidId`] if the string is not a UUID.
    pub fn parse(s: &str) -> Result<Self, CanvasError> {
        let raw = s.strip_prefix(DOM_ID_PREFIX).unwrap_or(s);
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|e| CanvasError::InvalidId(format!("{s}: {e}")))
    }

    /// The value rendered as the element's `id` attribute and CSS selector.
    #[must_use]
    pub fn dom_id(&self) -> String {
        format!("{DOM_ID_PREFIX}{}", self.0.simple())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ElementId {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Kind of media a slot can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// `<img>` source.
    Image,
    /// `<video>` source.
    Video,
}

impl MediaKind {
    /// Whether an asset with this MIME type can fill the slot.
    #[must_use]
    pub fn accepts(self, mime_type: &str) -> bool {
        let mime = mime_type.to_ascii_lowercase();
        match self {
            Self::Image => mime.starts_with("image/"),
            Self::Video => mime.starts_with("video/"),
        }
    }
}

/// Main axis along which a container stacks its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutAxis {
    /// Block flow / `flex-direction: column`.
    Vertical,
    /// `flex-direction: row`.
    Horizontal,
}

/// What a component kind is able to do in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// Accepts dropped children.
    pub drop_zone: bool,
    /// Media slot the element exposes, if any.
    pub media_slot: Option<MediaKind>,
    /// Carries a designated text-bearing descendant.
    pub text_slot: bool,
    /// Stacks children along this axis unless styles say otherwise.
    pub layout_axis: LayoutAxis,
}

/// Closed set of component kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    /// Page body or other synthetic node.
    Element,
    /// Inline text block.
    Text,
    /// Section heading.
    Heading,
    /// Paragraph of body copy.
    Paragraph,
    /// Call-to-action button.
    Button,
    /// Hyperlink.
    Link,
    /// Image.
    Image,
    /// Video.
    Video,
    /// Generic block container.
    Container,
    /// Full-width page section.
    Section,
    /// Horizontal flex row.
    Row,
    /// Column inside a row.
    Column,
    /// Row preset with two columns.
    TwoColumn,
    /// Horizontal rule.
    Divider,
    /// Empty vertical space.
    Spacer,
}

impl ComponentKind {
    /// Every kind, in palette order.
    pub const ALL: [Self; 15] = [
        Self::Element,
        Self::Text,
        Self::Heading,
        Self::Paragraph,
        Self::Button,
        Self::Link,
        Self::Image,
        Self::Video,
        Self::Container,
        Self::Section,
        Self::Row,
        Self::Column,
        Self::TwoColumn,
        Self::Divider,
        Self::Spacer,
    ];

    /// Registry key of the built-in template for this kind.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Element => "element",
            Self::Text => "text",
            Self::Heading => "heading",
            Self::Paragraph => "paragraph",
            Self::Button => "button",
            Self::Link => "link",
            Self::Image => "image",
            Self::Video => "video",
            Self::Container => "container",
            Self::Section => "section",
            Self::Row => "row",
            Self::Column => "column",
            Self::TwoColumn => "two-column",
            Self::Divider => "divider",
            Self::Spacer => "spacer",
        }
    }

    /// Capability set of this kind.
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        let (drop_zone, media_slot, text_slot, layout_axis) = match self {
            Self::Element | Self::Container | Self::Section | Self::Column => {
                (true, None, false, LayoutAxis::Vertical)
            }
            Self::Row | Self::TwoColumn => (true, None, false, LayoutAxis::Horizontal),
            Self::Text | Self::Heading | Self::Paragraph | Self::Button | Self::Link => {
                (false, None, true, LayoutAxis::Vertical)
            }
            Self::Image => (false, Some(MediaKind::Image), false, LayoutAxis::Vertical),
            Self::Video => (false, Some(MediaKind::Video), false, LayoutAxis::Vertical),
            Self::Divider | Self::Spacer => (false, None, false, LayoutAxis::Vertical),
        };
        Capabilities {
            drop_zone,
            media_slot,
            text_slot,
            layout_axis,
        }
    }

    /// Whether elements of this kind accept dropped children.
    #[must_use]
    pub const fn is_drop_zone(self) -> bool {
        self.capabilities().drop_zone
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ComponentKind {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.key() == s)
            .ok_or_else(|| CanvasError::UnknownComponent(s.to_string()))
    }
}

/// A point in screen or canvas coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position in pixels.
    pub x: f32,
    /// Vertical position in pixels.
    pub y: f32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box in canvas coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// X position (pixels from left).
    pub x: f32,
    /// Y position (pixels from top).
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Rect {
    /// Create a rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check if a point is within this rectangle (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Whether the box has no area (never laid out).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Start coordinate along `axis`.
    #[must_use]
    pub fn start(&self, axis: LayoutAxis) -> f32 {
        match axis {
            LayoutAxis::Vertical => self.y,
            LayoutAxis::Horizontal => self.x,
        }
    }

    /// Extent along `axis`.
    #[must_use]
    pub fn extent(&self, axis: LayoutAxis) -> f32 {
        match axis {
            LayoutAxis::Vertical => self.height,
            LayoutAxis::Horizontal => self.width,
        }
    }

    /// Midpoint along `axis`.
    #[must_use]
    pub fn midpoint(&self, axis: LayoutAxis) -> f32 {
        self.start(axis) + self.extent(axis) / 2.0
    }

    /// Distance from a coordinate to this box along `axis`; zero inside.
    #[must_use]
    pub fn distance_along(&self, axis: LayoutAxis, coordinate: f32) -> f32 {
        let start = self.start(axis);
        let end = start + self.extent(axis);
        if coordinate < start {
            start - coordinate
        } else if coordinate > end {
            coordinate - end
        } else {
            0.0
        }
    }
}

/// The designated text-bearing descendant of an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSlot {
    /// Tag of the inner text node (`span`, `h2`, ...).
    pub tag: String,
    /// Text content.
    pub text: String,
    /// Typography applied to the text node (derived, never persisted).
    #[serde(skip)]
    pub applied: StyleMap,
}

impl TextSlot {
    /// Create a text slot.
    pub fn new(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
            applied: StyleMap::new(),
        }
    }
}

/// A bindable image/video source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSlot {
    /// Media kind the slot accepts.
    pub kind: MediaKind,
    /// Source URI or data URI.
    pub src: String,
    /// Alternate text.
    #[serde(default)]
    pub alt: String,
}

impl MediaSlot {
    /// Create a media slot.
    pub fn new(kind: MediaKind, src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            kind,
            src: src.into(),
            alt: alt.into(),
        }
    }
}

/// Attributes the markup writer emits itself.
pub const RESERVED_ATTRIBUTES: [&str; 6] = [
    "id",
    "class",
    "style",
    "data-element-id",
    "data-component",
    "data-styles",
];

/// Whether `tag` is a lowercase HTML tag name (`[a-z][a-z0-9-]*`).
#[must_use]
pub fn is_valid_tag_name(tag: &str) -> bool {
    tag.starts_with(|c: char| c.is_ascii_lowercase())
        && tag
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Whether `name` may be stored as a user attribute.
///
/// Reserved names and `on*` event handlers are refused, as is anything
/// outside `[A-Za-z][A-Za-z0-9_.:-]*`.
#[must_use]
pub fn is_editable_attribute(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        && !RESERVED_ATTRIBUTES.contains(&lower.as_str())
        && !lower.starts_with("on")
}

/// Check that a node's tag, text slot tag and attribute names can be
/// written into markup verbatim.
///
/// # Errors
///
/// Returns [`CanvasError::InvalidMarkup`] naming the first offending name.
pub fn check_markup_names(
    tag: &str,
    text: Option<&TextSlot>,
    attributes: &BTreeMap<String, String>,
) -> CanvasResult<()> {
    let slot_tag = text.map(|slot| slot.tag.as_str());
    if let Some(bad) = std::iter::once(tag)
        .chain(slot_tag)
        .find(|t| !is_valid_tag_name(t))
    {
        return Err(CanvasError::InvalidMarkup(format!("tag '{bad}'")));
    }
    if let Some(name) = attributes.keys().find(|name| !is_editable_attribute(name)) {
        return Err(CanvasError::InvalidMarkup(format!("attribute '{name}'")));
    }
    Ok(())
}

/// Positioning mode taken from an element's resolved `position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Positioning {
    /// Normal flow.
    Static,
    /// `position: relative`.
    Relative,
    /// `position: absolute`.
    Absolute,
    /// `position: fixed`.
    Fixed,
}

impl Positioning {
    /// Read the positioning mode from a resolved style map.
    #[must_use]
    pub fn from_styles(styles: &StyleMap) -> Self {
        match styles.get("position").map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "absolute" => Self::Absolute,
            Some(v) if v == "fixed" => Self::Fixed,
            Some(v) if v == "relative" || v == "sticky" => Self::Relative,
            _ => Self::Static,
        }
    }

    /// Anything but static flow.
    #[must_use]
    pub const fn is_positioned(self) -> bool {
        !matches!(self, Self::Static)
    }

    /// `absolute` or `fixed`: edges move with `top`/`left`.
    #[must_use]
    pub const fn is_absolute(self) -> bool {
        matches!(self, Self::Absolute | Self::Fixed)
    }
}

/// A node on the canvas.
#[derive(Debug, Clone)]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Template key this element was instantiated from.
    pub component_type: String,
    /// Closed kind driving capabilities.
    pub kind: ComponentKind,
    /// HTML tag of the element's own box.
    pub tag: String,
    /// Free-form user CSS classes.
    pub classes: Vec<String>,
    /// Extra HTML attributes (`href`, `type`, ...).
    pub attributes: BTreeMap<String, String>,
    /// Designated text-bearing descendant.
    pub text: Option<TextSlot>,
    /// Bindable media source.
    pub media: Option<MediaSlot>,
    /// Source of truth for styling.
    pub styles: StyleStore,
    /// Inline styles currently applied to the box (derived from `styles`).
    pub applied: StyleMap,
    /// Live bounding box reported by the renderer.
    pub bounds: Rect,
    /// Parent element; `None` only for the canvas root.
    pub parent: Option<ElementId>,
    /// Child elements in document order.
    pub children: Vec<ElementId>,
    /// Whether this element is selected.
    pub selected: bool,
    /// Whether the hover preview is active.
    pub hovered: bool,
    /// Whether pointer/hover handlers are attached.
    pub handlers_bound: bool,
}

impl Element {
    /// Create an element of the given kind with its default tag.
    #[must_use]
    pub fn new(kind: ComponentKind) -> Self {
        let tag = match kind {
            ComponentKind::Section => "section",
            ComponentKind::Heading => "h2",
            ComponentKind::Paragraph => "p",
            ComponentKind::Button => "button",
            ComponentKind::Link => "a",
            ComponentKind::Image => "img",
            ComponentKind::Video => "video",
            ComponentKind::Divider => "hr",
            _ => "div",
        };
        Self {
            id: ElementId::new(),
            component_type: kind.key().to_string(),
            kind,
            tag: tag.to_string(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            text: None,
            media: None,
            styles: StyleStore::new(),
            applied: StyleMap::new(),
            bounds: Rect::default(),
            parent: None,
            children: Vec::new(),
            selected: false,
            hovered: false,
            handlers_bound: false,
        }
    }

    /// Set the HTML tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Set the text slot.
    #[must_use]
    pub fn with_text(mut self, text: TextSlot) -> Self {
        self.text = Some(text);
        self
    }

    /// Set the media slot.
    #[must_use]
    pub fn with_media(mut self, media: MediaSlot) -> Self {
        self.media = Some(media);
        self
    }

    /// Set the style store.
    #[must_use]
    pub fn with_styles(mut self, styles: StyleStore) -> Self {
        self.styles = styles;
        self
    }

    /// Set the reported bounding box.
    #[must_use]
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }

    /// Capability set of this element's kind.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.kind.capabilities()
    }

    /// Whether this element accepts dropped children.
    #[must_use]
    pub const fn is_drop_zone(&self) -> bool {
        self.kind.is_drop_zone()
    }

    /// Check if a point (in canvas coordinates) is within this element.
    #[must_use]
    pub fn contains_point(&self, point: Point) -> bool {
        self.bounds.contains(point)
    }

    /// Add a user class if absent. Returns whether it was added.
    pub fn add_class(&mut self, class: &str) -> bool {
        let class = class.trim();
        if class.is_empty() || self.classes.iter().any(|c| c == class) {
            return false;
        }
        self.classes.push(class.to_string());
        true
    }

    /// Remove a user class. Returns whether it was present.
    pub fn remove_class(&mut self, class: &str) -> bool {
        let before = self.classes.len();
        self.classes.retain(|c| c != class.trim());
        before != self.classes.len()
    }

    /// Short human label for layer listings.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.text {
            Some(slot) if !slot.text.trim().is_empty() => {
                let text: String = slot.text.trim().chars().take(24).collect();
                format!("{} \"{text}\"", self.component_type)
            }
            _ => self.component_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_id_dom_roundtrip() {
        let id = ElementId::new();
        let dom = id.dom_id();
        assert!(dom.starts_with(DOM_ID_PREFIX));
        assert_eq!(ElementId::parse(&dom).ok(), Some(id));
        assert_eq!(ElementId::parse(&id.to_string()).ok(), Some(id));
        assert!(ElementId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_capabilities() {
        assert!(ComponentKind::Container.is_drop_zone());
        assert!(!ComponentKind::Button.is_drop_zone());
        assert_eq!(
            ComponentKind::Image.capabilities().media_slot,
            Some(MediaKind::Image)
        );
        assert_eq!(
            ComponentKind::Row.capabilities().layout_axis,
            LayoutAxis::Horizontal
        );
        assert!(ComponentKind::Heading.capabilities().text_slot);
    }

    #[test]
    fn test_kind_keys_roundtrip() {
        for kind in ComponentKind::ALL {
            assert_eq!(kind.key().parse::<ComponentKind>().ok(), Some(kind));
        }
        assert!("carousel".parse::<ComponentKind>().is_err());
    }

    #[test]
    fn test_media_accepts() {
        assert!(MediaKind::Image.accepts("image/png"));
        assert!(!MediaKind::Image.accepts("video/mp4"));
        assert!(MediaKind::Video.accepts("VIDEO/WEBM"));
    }

    #[test]
    fn test_rect_geometry() {
        let rect = Rect::new(10.0, 20.0, 100.0, 40.0);
        assert!(rect.contains(Point::new(10.0, 20.0)));
        assert!(!rect.contains(Point::new(9.0, 20.0)));
        assert!((rect.midpoint(LayoutAxis::Vertical) - 40.0).abs() < f32::EPSILON);
        assert!((rect.distance_along(LayoutAxis::Horizontal, 0.0) - 10.0).abs() < f32::EPSILON);
        assert!(rect.distance_along(LayoutAxis::Vertical, 30.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_positioning_from_styles() {
        let mut styles = StyleMap::new();
        assert_eq!(Positioning::from_styles(&styles), Positioning::Static);
        styles.insert("position".into(), "Absolute".into());
        assert!(Positioning::from_styles(&styles).is_absolute());
        styles.insert("position".into(), "relative".into());
        let p = Positioning::from_styles(&styles);
        assert!(p.is_positioned() && !p.is_absolute());
    }

    #[test]
    fn test_class_editing() {
        let mut element = Element::new(ComponentKind::Text);
        assert!(element.add_class("hero"));
        assert!(!element.add_class("hero"));
        assert!(!element.add_class("  "));
        assert!(element.remove_class("hero"));
        assert!(element.classes.is_empty());
    }
}
