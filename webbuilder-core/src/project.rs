//! Saved project files.
//!
//! A project file carries the exported HTML and CSS for quick preview
//! alongside the canvas document that is actually reloaded.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::asset::AssetLibrary;
use crate::canvas::Canvas;
use crate::export::{render_markup, serialize_styles, ExportOptions, MarkupMode};
use crate::registry::ComponentTemplate;
use crate::snapshot::CanvasDocument;
use crate::CanvasResult;

/// Current time in milliseconds since the Unix epoch.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Timestamps won't exceed u64 for billions of years
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// On-disk project representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Version of the editor that wrote the file.
    pub version: String,
    /// Save time in milliseconds since epoch.
    pub timestamp: u64,
    /// Clean body markup at save time.
    #[serde(default)]
    pub html: String,
    /// Generated stylesheet at save time.
    #[serde(default)]
    pub css: String,
    /// The canvas tree.
    pub document: CanvasDocument,
    /// Uploaded assets.
    #[serde(default)]
    pub assets: AssetLibrary,
    /// Custom blocks saved by the user.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<ComponentTemplate>,
}

impl ProjectFile {
    /// Capture the current canvas.
    #[must_use]
    pub fn capture(canvas: &Canvas, assets: &AssetLibrary, blocks: &[ComponentTemplate]) -> Self {
        let options = ExportOptions::default();
        Self {
            version: crate::VERSION.to_string(),
            timestamp: now_ms(),
            html: render_markup(canvas, MarkupMode::Export, &options),
            css: serialize_styles(canvas, &options),
            document: CanvasDocument::from_canvas(canvas),
            assets: assets.clone(),
            blocks: blocks.to_vec(),
        }
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CanvasResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not a project file.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> CanvasResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        tracing::info!("Saved project to {}", path.display());
        Ok(())
    }

    /// Read from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the content is not a project.
    pub fn load(path: impl AsRef<Path>) -> CanvasResult<Self> {
        let path = path.as_ref();
        let project = Self::from_json(&fs::read_to_string(path)?)?;
        tracing::info!(
            "Loaded project from {} (version {})",
            path.display(),
            project.version
        );
        Ok(project)
    }

    /// Rebuild the canvas stored in this project.
    ///
    /// # Errors
    ///
    /// Returns an error if the document holds malformed or duplicate ids.
    pub fn to_canvas(&self) -> CanvasResult<Canvas> {
        self.document.clone().into_canvas()
    }
}
