//! WebAssembly bindings for webbuilder-core.
//!
//! Structured values cross the boundary as JSON strings.

use wasm_bindgen::prelude::*;

use crate::asset::Asset;
use crate::config::EditorConfig;
use crate::drag::DragPayload;
use crate::element::{ElementId, Rect};
use crate::event::InputEvent;
use crate::export::MarkupMode;
use crate::project::ProjectFile;
use crate::style::{Breakpoint, InteractionState};
use crate::CanvasController;

/// Initialize the editor WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();
}

fn parse_id(id: &str) -> Result<ElementId, String> {
    ElementId::parse(id).map_err(|e| e.to_string())
}

/// Editor session for WASM.
#[wasm_bindgen]
pub struct WasmEditor {
    controller: CanvasController,
}

#[wasm_bindgen]
impl WasmEditor {
    /// Create an editor with the default configuration.
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Self {
        Self {
            controller: CanvasController::new(),
        }
    }

    /// Create an editor from a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error string if the configuration is malformed.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(json: &str) -> Result<WasmEditor, String> {
        let config = EditorConfig::from_json(json).map_err(|e| e.to_string())?;
        Ok(Self {
            controller: CanvasController::with_config(config),
        })
    }

    /// Dispatch an input event serialized as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error string if the event cannot be parsed.
    #[wasm_bindgen(js_name = handleEvent)]
    pub fn handle_event(&mut self, json: &str) -> Result<bool, String> {
        let event: InputEvent = serde_json::from_str(json).map_err(|e| e.to_string())?;
        Ok(self.controller.handle_event(&event))
    }

    /// Drain queued editor notifications as a JSON array.
    #[wasm_bindgen(js_name = takeEvents)]
    pub fn take_events(&mut self) -> String {
        serde_json::to_string(&self.controller.take_events()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Report an element's rendered box.
    ///
    /// # Errors
    ///
    /// Returns an error string if the id is malformed or unknown.
    #[wasm_bindgen(js_name = setElementBounds)]
    pub fn set_element_bounds(&mut self, id: &str, x: f32, y: f32, width: f32, height: f32) -> Result<(), String> {
        self.controller
            .set_element_bounds(parse_id(id)?, Rect::new(x, y, width, height))
            .map_err(|e| e.to_string())
    }

    /// Start a drag from a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns an error string if the payload cannot be parsed.
    #[wasm_bindgen(js_name = beginDrag)]
    pub fn begin_drag(&mut self, json: &str) -> Result<(), String> {
        let payload: DragPayload = serde_json::from_str(json).map_err(|e| e.to_string())?;
        self.controller.begin_drag(payload);
        Ok(())
    }

    /// Select an element by id.
    ///
    /// # Errors
    ///
    /// Returns an error string if the id is malformed.
    #[wasm_bindgen(js_name = selectElement)]
    pub fn select_element(&mut self, id: &str) -> Result<bool, String> {
        Ok(self.controller.select(parse_id(id)?))
    }

    /// Clear the selection.
    pub fn deselect(&mut self) -> bool {
        self.controller.deselect()
    }

    /// Id of the selected element, if any.
    #[wasm_bindgen(js_name = selectedId)]
    #[must_use]
    pub fn selected_id(&self) -> Option<String> {
        self.controller.selected().map(|id| id.to_string())
    }

    /// Set a property on the selected element in the current context.
    #[wasm_bindgen(js_name = updateElementStyle)]
    pub fn update_element_style(&mut self, property: &str, value: &str) -> bool {
        self.controller.update_element_style(property, value)
    }

    /// Replace an element's text.
    ///
    /// # Errors
    ///
    /// Returns an error string if the id is malformed.
    #[wasm_bindgen(js_name = updateText)]
    pub fn update_text(&mut self, id: &str, text: &str) -> Result<bool, String> {
        Ok(self.controller.update_text(parse_id(id)?, text))
    }

    /// Switch the simulated breakpoint (`desktop`, `tablet`, `mobile`).
    ///
    /// # Errors
    ///
    /// Returns an error string for an unknown breakpoint.
    #[wasm_bindgen(js_name = setBreakpoint)]
    pub fn set_breakpoint(&mut self, name: &str) -> Result<(), String> {
        let breakpoint: Breakpoint = name.parse().map_err(|e: crate::CanvasError| e.to_string())?;
        self.controller.set_breakpoint(breakpoint);
        Ok(())
    }

    /// Switch the edited interaction state (`base`, `hover`).
    ///
    /// # Errors
    ///
    /// Returns an error string for an unknown state.
    #[wasm_bindgen(js_name = setState)]
    pub fn set_state(&mut self, name: &str) -> Result<(), String> {
        let state: InteractionState = name.parse().map_err(|e: crate::CanvasError| e.to_string())?;
        self.controller.set_state(state);
        Ok(())
    }

    /// Undo the last change.
    pub fn undo(&mut self) -> bool {
        self.controller.undo()
    }

    /// Redo the last undone change.
    pub fn redo(&mut self) -> bool {
        self.controller.redo()
    }

    /// Resolved styles of an element for the properties panel, as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error string if the id is malformed.
    #[wasm_bindgen(js_name = resolvedStyles)]
    pub fn resolved_styles(&self, id: &str) -> Result<String, String> {
        let styles = self.controller.resolved_styles(parse_id(id)?);
        serde_json::to_string(&styles).map_err(|e| e.to_string())
    }

    /// Layers panel outline as JSON.
    #[must_use]
    pub fn layers(&self) -> String {
        serde_json::to_string(&self.controller.layers()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Component palette as JSON.
    #[must_use]
    pub fn components(&self) -> String {
        let templates: Vec<_> = self.controller.registry().templates().collect();
        serde_json::to_string(&templates).unwrap_or_else(|_| "[]".to_string())
    }

    /// Editor-mode body markup.
    #[wasm_bindgen(js_name = editorMarkup)]
    #[must_use]
    pub fn editor_markup(&self) -> String {
        self.controller.markup(MarkupMode::Editor)
    }

    /// Generated stylesheet.
    #[wasm_bindgen(js_name = exportCss)]
    #[must_use]
    pub fn export_css(&self) -> String {
        self.controller.export_css()
    }

    /// Standalone HTML document.
    #[wasm_bindgen(js_name = exportHtml)]
    #[must_use]
    pub fn export_html(&self) -> String {
        self.controller.export_document()
    }

    /// Upload an asset, returning its id.
    #[wasm_bindgen(js_name = registerAsset)]
    pub fn register_asset(&mut self, name: &str, mime_type: &str, bytes: &[u8]) -> String {
        self.controller
            .register_asset(Asset::from_bytes(name, mime_type, bytes))
    }

    /// Save the session as project JSON.
    ///
    /// # Errors
    ///
    /// Returns an error string if serialization fails.
    #[wasm_bindgen(js_name = saveProject)]
    pub fn save_project(&self) -> Result<String, String> {
        self.controller.save_project().to_json().map_err(|e| e.to_string())
    }

    /// Load project JSON into the session.
    ///
    /// # Errors
    ///
    /// Returns an error string if parsing or loading fails.
    #[wasm_bindgen(js_name = loadProject)]
    pub fn load_project(&mut self, json: &str) -> Result<(), String> {
        let project = ProjectFile::from_json(json).map_err(|e| e.to_string())?;
        self.controller.load_project(&project).map_err(|e| e.to_string())
    }
}

impl Default for WasmEditor {
    fn default() -> Self {
        Self::new()
    }
}
