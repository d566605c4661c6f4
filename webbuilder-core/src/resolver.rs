//! Projection of stored styles onto rendered elements.
//!
//! The [`StyleStore`](crate::StyleStore) is the only source of truth. What an
//! element currently shows (`Element::applied` plus its text slot's applied
//! map) is recomputed from it, never read back.

use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::element::{Element, ElementId};
use crate::style::{is_typography_property, Breakpoint, InteractionState, StyleMap};

/// Which style cell edits write to and which breakpoint is displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditContext {
    /// Breakpoint being simulated and edited.
    pub breakpoint: Breakpoint,
    /// Interaction state being edited.
    pub state: InteractionState,
}

impl EditContext {
    /// Create a context.
    #[must_use]
    pub const fn new(breakpoint: Breakpoint, state: InteractionState) -> Self {
        Self { breakpoint, state }
    }

    /// Same context at another breakpoint.
    #[must_use]
    pub const fn at(self, breakpoint: Breakpoint) -> Self {
        Self { breakpoint, ..self }
    }

    /// Same context for another state.
    #[must_use]
    pub const fn with_state(self, state: InteractionState) -> Self {
        Self { state, ..self }
    }
}

/// Stateless style projection helpers.
pub struct StyleResolver;

impl StyleResolver {
    /// Effective base styles of an element at a breakpoint.
    #[must_use]
    pub fn resolve(element: &Element, breakpoint: Breakpoint) -> StyleMap {
        element.styles.resolve(InteractionState::Base, breakpoint)
    }

    /// Values shown in the properties panel for the given context.
    ///
    /// For the hover state this is the hover cascade laid over the base
    /// cascade, which is what the element shows while hovered.
    #[must_use]
    pub fn panel_styles(element: &Element, context: EditContext) -> StyleMap {
        match context.state {
            InteractionState::Base => Self::resolve(element, context.breakpoint),
            InteractionState::Hover => element.styles.resolve_hover(context.breakpoint),
        }
    }

    /// Replace everything applied to `element` with `styles`.
    ///
    /// Typography goes to the text slot when the element has one.
    fn project(element: &mut Element, styles: StyleMap) {
        element.applied.clear();
        match element.text.as_mut() {
            Some(slot) => {
                slot.applied.clear();
                for (property, value) in styles {
                    if is_typography_property(&property) {
                        slot.applied.insert(property, value);
                    } else {
                        element.applied.insert(property, value);
                    }
                }
            }
            None => element.applied = styles,
        }
    }

    /// Apply the base cascade at `breakpoint`, ending any hover preview.
    pub fn apply_live_styles(element: &mut Element, breakpoint: Breakpoint) {
        let styles = Self::resolve(element, breakpoint);
        Self::project(element, styles);
        element.hovered = false;
    }

    /// Preview the hover state over the base cascade.
    ///
    /// Nothing is written to the style store. No-op for elements whose
    /// handlers are not bound.
    pub fn hover_enter(element: &mut Element, breakpoint: Breakpoint) {
        if !element.handlers_bound {
            return;
        }
        let styles = element.styles.resolve_hover(breakpoint);
        Self::project(element, styles);
        element.hovered = true;
    }

    /// End the hover preview.
    pub fn hover_leave(element: &mut Element, breakpoint: Breakpoint) {
        if element.handlers_bound {
            Self::apply_live_styles(element, breakpoint);
        }
    }

    /// Re-apply live styles to every element on the canvas.
    pub fn apply_all(canvas: &mut Canvas, breakpoint: Breakpoint) {
        for element in canvas.elements_mut() {
            Self::apply_live_styles(element, breakpoint);
        }
    }

    /// Re-apply live styles to a subtree.
    pub fn apply_subtree(canvas: &mut Canvas, id: ElementId, breakpoint: Breakpoint) {
        for node in canvas.descendants(id) {
            if let Some(element) = canvas.get_mut(node) {
                Self::apply_live_styles(element, breakpoint);
            }
        }
    }

    /// Full applied map of an element, text-slot typography included.
    #[must_use]
    pub fn applied(element: &Element) -> StyleMap {
        let mut all = element.applied.clone();
        if let Some(slot) = &element.text {
            all.extend(slot.applied.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        all
    }
}
