//! Editor configuration.

use serde::{Deserialize, Serialize};

use crate::style::Breakpoint;
use crate::CanvasResult;

/// Tunables for a [`CanvasController`](crate::CanvasController).
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Snapshots retained for undo.
    pub max_undo_steps: usize,
    /// Arrow-key nudge in pixels.
    pub nudge_step: f32,
    /// Arrow-key nudge with Shift held.
    pub large_nudge_step: f32,
    /// Smallest width/height a resize can produce.
    pub min_element_size: f32,
    /// Simulated viewport width at the desktop breakpoint.
    pub desktop_width: f32,
    /// Simulated viewport width at the tablet breakpoint.
    pub tablet_width: f32,
    /// Simulated viewport width at the mobile breakpoint.
    pub mobile_width: f32,
    /// Simulated viewport height.
    pub canvas_height: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_undo_steps: crate::history::DEFAULT_CAPACITY,
            nudge_step: 1.0,
            large_nudge_step: 10.0,
            min_element_size: crate::selection::DEFAULT_MIN_SIZE,
            desktop_width: crate::canvas::DEFAULT_WIDTH,
            tablet_width: 768.0,
            mobile_width: 375.0,
            canvas_height: crate::canvas::DEFAULT_HEIGHT,
        }
    }

    /// Parse a configuration from JSON; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CanvasResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Simulated viewport width for a breakpoint.
    #[must_use]
    pub fn viewport_width(&self, breakpoint: Breakpoint) -> f32 {
        match breakpoint {
            Breakpoint::Desktop => self.desktop_width,
            Breakpoint::Tablet => self.tablet_width,
            Breakpoint::Mobile => self.mobile_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.max_undo_steps, 50);
        assert!((config.viewport_width(Breakpoint::Tablet) - 768.0).abs() < f32::EPSILON);
        assert!((config.viewport_width(Breakpoint::Mobile) - 375.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = EditorConfig::from_json(r#"{"maxUndoSteps": 5, "nudgeStep": 2}"#).unwrap();
        assert_eq!(config.max_undo_steps, 5);
        assert!((config.nudge_step - 2.0).abs() < f32::EPSILON);
        assert!((config.large_nudge_step - 10.0).abs() < f32::EPSILON);
        assert!(EditorConfig::from_json("[").is_err());
    }
}
