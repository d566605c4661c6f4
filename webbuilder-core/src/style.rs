//! Per-element responsive style storage.
//!
//! Every element owns a [`StyleStore`]: a three-level map
//! `state -> breakpoint -> property -> value`. Cells are sparse; reading a
//! breakpoint that has no cell falls back to the wider breakpoints.
//!
//! ```text
//! base ──┬── desktop { width: 100px, color: blue }
//!        └── mobile  { width: 50px }
//! hover ─── desktop  { color: red }
//!
//! resolve(base, tablet) = { width: 100px, color: blue }
//! resolve(base, mobile) = { width: 50px,  color: blue }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::CanvasError;

/// Flat `property -> value` map. Property names are CSS kebab-case.
pub type StyleMap = BTreeMap<String, String>;

/// CSS properties that belong on an element's text-bearing descendant
/// rather than its own box.
pub const TYPOGRAPHY_PROPERTIES: [&str; 8] = [
    "color",
    "font-family",
    "font-size",
    "font-weight",
    "text-align",
    "line-height",
    "text-decoration",
    "font-style",
];

/// Check whether a (normalized) property is a typography property.
#[must_use]
pub fn is_typography_property(property: &str) -> bool {
    TYPOGRAPHY_PROPERTIES.contains(&property)
}

/// Pseudo-class-like mode a style cell is recorded under.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum InteractionState {
    /// Normal rendering.
    #[default]
    Base,
    /// Pointer over the element.
    Hover,
}

impl InteractionState {
    /// All states in emission order.
    pub const ALL: [Self; 2] = [Self::Base, Self::Hover];

    /// Lowercase name used in persisted data.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Hover => "hover",
        }
    }

    /// CSS pseudo-class suffix appended to selectors.
    #[must_use]
    pub const fn pseudo_class(self) -> &'static str {
        match self {
            Self::Base => "",
            Self::Hover => ":hover",
        }
    }
}

impl fmt::Display for InteractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InteractionState {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base" | "normal" => Ok(Self::Base),
            "hover" => Ok(Self::Hover),
            other => Err(CanvasError::InvalidOperation(format!(
                "unknown interaction state '{other}'"
            ))),
        }
    }
}

/// Responsive viewport tier.
///
/// The derived ordering is the specificity order: `Desktop < Tablet < Mobile`.
/// Narrower breakpoints override wider ones.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    /// Unconstrained width.
    #[default]
    Desktop,
    /// `max-width: 1023px`.
    Tablet,
    /// `max-width: 767px`.
    Mobile,
}

impl Breakpoint {
    /// All breakpoints, widest first.
    pub const ALL: [Self; 3] = [Self::Desktop, Self::Tablet, Self::Mobile];

    /// Lowercase name used in persisted data.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Tablet => "tablet",
            Self::Mobile => "mobile",
        }
    }

    /// Upper bound of the media query for this tier, `None` for desktop.
    #[must_use]
    pub const fn max_width(self) -> Option<u32> {
        match self {
            Self::Desktop => None,
            Self::Tablet => Some(1023),
            Self::Mobile => Some(767),
        }
    }

    /// The `@media` condition wrapping rules for this tier.
    #[must_use]
    pub fn media_query(self) -> Option<String> {
        self.max_width().map(|w| format!("(max-width: {w}px)"))
    }

    /// Breakpoints whose cells apply when rendering at `self`, widest first.
    #[must_use]
    pub fn cascade(self) -> &'static [Self] {
        match self {
            Self::Desktop => &Self::ALL[..1],
            Self::Tablet => &Self::ALL[..2],
            Self::Mobile => &Self::ALL[..],
        }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Breakpoint {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "desktop" => Ok(Self::Desktop),
            "tablet" => Ok(Self::Tablet),
            "mobile" => Ok(Self::Mobile),
            other => Err(CanvasError::InvalidOperation(format!(
                "unknown breakpoint '{other}'"
            ))),
        }
    }
}

/// Normalize a property name to CSS kebab-case.
///
/// `backgroundColor` becomes `background-color`, `WebkitTransform` becomes
/// `-webkit-transform`, `msTransform` becomes `-ms-transform`. Custom
/// properties (`--x`) and names that are already kebab-case pass through.
#[must_use]
pub fn css_property_name(name: &str) -> String {
    let name = name.trim();
    if name.starts_with("--") {
        return name.to_string();
    }
    let vendor = name.starts_with("Webkit")
        || name.starts_with("Moz")
        || name
            .strip_prefix("ms")
            .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()));
    let mut out = String::with_capacity(name.len() + 4);
    if vendor && name.starts_with("ms") {
        out.push('-');
    }
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 || vendor {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Whether a normalized property name can be written into a stylesheet.
///
/// Lowercase letters, digits and hyphens, starting with a letter after an
/// optional vendor (`-`) or custom-property (`--`) prefix.
#[must_use]
pub fn is_valid_property_name(name: &str) -> bool {
    let body = name.trim_start_matches('-');
    name.len() - body.len() <= 2
        && body.starts_with(|c: char| c.is_ascii_lowercase())
        && body
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Whether a value stays inside its declaration when written as
/// `property: value;`.
///
/// Braces, angle brackets, backslashes, control characters and comments are
/// refused anywhere. `;` is only allowed inside quotes or parentheses, and
/// both must be balanced.
#[must_use]
pub fn is_valid_property_value(value: &str) -> bool {
    if value.contains("/*") {
        return false;
    }
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    for ch in value.chars() {
        if ch.is_control() || matches!(ch, '{' | '}' | '<' | '>' | '\\') {
            return false;
        }
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            (None, ';') if depth == 0 => return false,
            (None, _) => {}
        }
    }
    quote.is_none() && depth == 0
}

/// Sparse `state -> breakpoint -> property -> value` style storage.
///
/// Deserialization drops any declaration [`StyleStore::set`] would refuse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StyleStore {
    cells: Cells,
}

type Cells = BTreeMap<InteractionState, BTreeMap<Breakpoint, StyleMap>>;

impl<'de> Deserialize<'de> for StyleStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Cells::deserialize(deserializer).map(|cells| Self { cells }.sanitized())
    }
}

impl StyleStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose `base.desktop` cell holds `defaults`.
    #[must_use]
    pub fn with_defaults(defaults: &StyleMap) -> Self {
        let mut store = Self::new();
        for (property, value) in defaults {
            store.set(InteractionState::Base, Breakpoint::Desktop, property, value);
        }
        store
    }

    /// Write a single property. An empty value removes the property.
    ///
    /// Returns `false`, leaving the store untouched, when the name or value
    /// would not survive serialization as a CSS declaration.
    pub fn set(
        &mut self,
        state: InteractionState,
        breakpoint: Breakpoint,
        property: &str,
        value: &str,
    ) -> bool {
        let property = css_property_name(property);
        let value = value.trim();
        if !is_valid_property_name(&property) {
            tracing::debug!("Rejected style property '{property}'");
            return false;
        }
        if value.is_empty() {
            self.remove(state, breakpoint, &property);
            return true;
        }
        if !is_valid_property_value(value) {
            tracing::debug!("Rejected value for '{property}': {value}");
            return false;
        }
        self.cells
            .entry(state)
            .or_default()
            .entry(breakpoint)
            .or_default()
            .insert(property, value.to_string());
        true
    }

    /// Write every property of `map` into one cell.
    pub fn set_all(&mut self, state: InteractionState, breakpoint: Breakpoint, map: &StyleMap) {
        for (property, value) in map {
            self.set(state, breakpoint, property, value);
        }
    }

    /// Remove a property from one cell, pruning cells that become empty.
    pub fn remove(&mut self, state: InteractionState, breakpoint: Breakpoint, property: &str) {
        let property = css_property_name(property);
        let Some(by_breakpoint) = self.cells.get_mut(&state) else {
            return;
        };
        if let Some(cell) = by_breakpoint.get_mut(&breakpoint) {
            cell.remove(&property);
            if cell.is_empty() {
                by_breakpoint.remove(&breakpoint);
            }
        }
        if by_breakpoint.is_empty() {
            self.cells.remove(&state);
        }
    }

    /// Read one property from exactly one cell (no cascade).
    #[must_use]
    pub fn get(&self, state: InteractionState, breakpoint: Breakpoint, property: &str) -> Option<&str> {
        self.cell(state, breakpoint)
            .and_then(|cell| cell.get(&css_property_name(property)))
            .map(String::as_str)
    }

    /// Borrow one cell, if present.
    #[must_use]
    pub fn cell(&self, state: InteractionState, breakpoint: Breakpoint) -> Option<&StyleMap> {
        self.cells.get(&state).and_then(|m| m.get(&breakpoint))
    }

    /// Iterate over non-empty cells in `(breakpoint, state)` order, widest first.
    pub fn cells(&self) -> impl Iterator<Item = (InteractionState, Breakpoint, &StyleMap)> {
        Breakpoint::ALL.into_iter().flat_map(move |bp| {
            InteractionState::ALL.into_iter().filter_map(move |state| {
                self.cell(state, bp)
                    .filter(|cell| !cell.is_empty())
                    .map(|cell| (state, bp, cell))
            })
        })
    }

    /// Merge the cells of `state` along the breakpoint cascade.
    ///
    /// Wider breakpoints are applied first so narrower ones win.
    #[must_use]
    pub fn resolve(&self, state: InteractionState, breakpoint: Breakpoint) -> StyleMap {
        let mut merged = StyleMap::new();
        for bp in breakpoint.cascade() {
            if let Some(cell) = self.cell(state, *bp) {
                merged.extend(cell.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        merged
    }

    /// Resolve the base state, then overlay the hover state.
    #[must_use]
    pub fn resolve_hover(&self, breakpoint: Breakpoint) -> StyleMap {
        let mut merged = self.resolve(InteractionState::Base, breakpoint);
        merged.extend(self.resolve(InteractionState::Hover, breakpoint));
        merged
    }

    /// Whether no cell holds any property.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.values().all(|m| m.values().all(BTreeMap::is_empty))
    }

    /// Encode as the JSON string attached to persisted markup.
    #[must_use]
    pub fn to_json(&self) -> String {
        // Maps of strings always serialize.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Decode persisted style JSON, failing open to an empty store.
    #[must_use]
    pub fn from_json_lossy(json: &str) -> Self {
        if json.trim().is_empty() {
            return Self::new();
        }
        match serde_json::from_str::<Self>(json) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("Discarding malformed style data: {e}");
                Self::new()
            }
        }
    }

    /// Rebuild through `set`, dropping declarations it would refuse.
    fn sanitized(self) -> Self {
        let mut clean = Self::new();
        let mut dropped = 0usize;
        for (state, by_breakpoint) in self.cells {
            for (breakpoint, cell) in by_breakpoint {
                for (property, value) in cell {
                    if !clean.set(state, breakpoint, &property, &value) {
                        dropped += 1;
                    }
                }
            }
        }
        if dropped > 0 {
            tracing::warn!("Dropped {dropped} invalid style declarations");
        }
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascade_falls_back_to_wider_breakpoints() {
        let mut store = StyleStore::new();
        store.set(InteractionState::Base, Breakpoint::Desktop, "width", "100px");
        store.set(InteractionState::Base, Breakpoint::Mobile, "width", "50px");

        let mobile = store.resolve(InteractionState::Base, Breakpoint::Mobile);
        let tablet = store.resolve(InteractionState::Base, Breakpoint::Tablet);
        let desktop = store.resolve(InteractionState::Base, Breakpoint::Desktop);

        assert_eq!(mobile.get("width").map(String::as_str), Some("50px"));
        assert_eq!(tablet.get("width").map(String::as_str), Some("100px"));
        assert_eq!(desktop.get("width").map(String::as_str), Some("100px"));
    }

    #[test]
    fn test_hover_overlays_base() {
        let mut store = StyleStore::new();
        store.set(InteractionState::Base, Breakpoint::Desktop, "color", "blue");
        store.set(InteractionState::Base, Breakpoint::Desktop, "padding", "4px");
        store.set(InteractionState::Hover, Breakpoint::Desktop, "color", "red");

        let hovered = store.resolve_hover(Breakpoint::Tablet);
        assert_eq!(hovered.get("color").map(String::as_str), Some("red"));
        assert_eq!(hovered.get("padding").map(String::as_str), Some("4px"));
    }

    #[test]
    fn test_property_names_are_normalized() {
        assert_eq!(css_property_name("backgroundColor"), "background-color");
        assert_eq!(css_property_name("font-size"), "font-size");
        assert_eq!(css_property_name("WebkitTransform"), "-webkit-transform");
        assert_eq!(css_property_name("--brand"), "--brand");
        assert_eq!(css_property_name("msTransform"), "-ms-transform");
        assert_eq!(css_property_name("MozAppearance"), "-moz-appearance");
        assert_eq!(css_property_name("msx"), "msx");

        let mut store = StyleStore::new();
        store.set(InteractionState::Base, Breakpoint::Desktop, "fontSize", "14px");
        assert_eq!(
            store.get(InteractionState::Base, Breakpoint::Desktop, "font-size"),
            Some("14px")
        );
    }

    #[test]
    fn test_empty_value_removes_and_prunes() {
        let mut store = StyleStore::new();
        store.set(InteractionState::Hover, Breakpoint::Tablet, "color", "red");
        assert!(!store.is_empty());

        store.set(InteractionState::Hover, Breakpoint::Tablet, "color", "");
        assert!(store.is_empty());
        assert!(store.cell(InteractionState::Hover, Breakpoint::Tablet).is_none());
        assert_eq!(store.to_json(), "{}");
    }

    #[test]
    fn test_json_shape_and_roundtrip() {
        let mut store = StyleStore::new();
        store.set(InteractionState::Base, Breakpoint::Desktop, "width", "100px");
        store.set(InteractionState::Hover, Breakpoint::Mobile, "color", "red");

        let json = store.to_json();
        assert_eq!(
            json,
            r#"{"base":{"desktop":{"width":"100px"}},"hover":{"mobile":{"color":"red"}}}"#
        );
        assert_eq!(StyleStore::from_json_lossy(&json), store);
    }

    #[test]
    fn test_malformed_json_fails_open() {
        assert!(StyleStore::from_json_lossy("{ not json").is_empty());
        assert!(StyleStore::from_json_lossy(r#"{"sideways":{}}"#).is_empty());
        assert!(StyleStore::from_json_lossy("").is_empty());
    }

    #[test]
    fn test_cells_iterate_widest_first() {
        let mut store = StyleStore::new();
        store.set(InteractionState::Hover, Breakpoint::Mobile, "color", "red");
        store.set(InteractionState::Base, Breakpoint::Tablet, "width", "1px");
        store.set(InteractionState::Base, Breakpoint::Desktop, "width", "2px");

        let order: Vec<_> = store.cells().map(|(s, b, _)| (s, b)).collect();
        assert_eq!(
            order,
            vec![
                (InteractionState::Base, Breakpoint::Desktop),
                (InteractionState::Base, Breakpoint::Tablet),
                (InteractionState::Hover, Breakpoint::Mobile),
            ]
        );
    }

    #[test]
    fn test_breakpoint_parsing_and_media() {
        assert_eq!("Tablet".parse::<Breakpoint>().ok(), Some(Breakpoint::Tablet));
        assert!("watch".parse::<Breakpoint>().is_err());
        assert_eq!(Breakpoint::Desktop.media_query(), None);
        assert_eq!(
            Breakpoint::Mobile.media_query().as_deref(),
            Some("(max-width: 767px)")
        );
    }

    #[test]
    fn test_values_that_escape_the_declaration_are_rejected() {
        let mut store = StyleStore::new();
        for value in [
            "x</style><script>alert(1)</script>",
            "red; } body { display: none",
            "red;",
            "red /* */",
            "\\3b",
            "url(a.png",
            "\"open",
            "a)b",
            "line\nbreak",
        ] {
            assert!(
                !store.set(InteractionState::Base, Breakpoint::Desktop, "color", value),
                "accepted {value:?}"
            );
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_realistic_values_are_accepted() {
        let mut store = StyleStore::new();
        for value in [
            "rgba(0, 0, 0, .5)",
            "\"Helvetica Neue\", sans-serif",
            "url(\"data:image/png;base64,iVBORw0K\")",
            "url(data:image/png;base64,AAAA)",
            "calc(100% - 2rem) !important",
            "'a; b'",
        ] {
            assert!(
                store.set(InteractionState::Base, Breakpoint::Desktop, "background", value),
                "rejected {value:?}"
            );
        }
    }

    #[test]
    fn test_invalid_property_names_are_rejected() {
        let mut store = StyleStore::new();
        for name in ["", "color:red", "a b", "---x", "1px", "col{or"] {
            assert!(
                !store.set(InteractionState::Base, Breakpoint::Desktop, name, "red"),
                "accepted {name:?}"
            );
        }
        assert!(is_valid_property_name("-webkit-transform"));
        assert!(is_valid_property_name("--brand-2"));
        assert!(store.set(InteractionState::Base, Breakpoint::Desktop, "--brand", "red"));
    }

    #[test]
    fn test_loaded_json_drops_invalid_declarations() {
        let json = r#"{"base":{"desktop":{"color":"red;}</style>","width":"10px","a b":"1"}}}"#;
        let store = StyleStore::from_json_lossy(json);
        let cell = store.cell(InteractionState::Base, Breakpoint::Desktop).unwrap();
        assert_eq!(cell.len(), 1);
        assert_eq!(cell.get("width").map(String::as_str), Some("10px"));
    }
}
