//! Error types for canvas operations.

use thiserror::Error;

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur in canvas operations.
///
/// Interactive entry points (drag/drop, selection, keyboard) never surface
/// these to the user; they log and ignore. Tree primitives and persistence
/// return them so callers can decide.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// Element not found in the canvas tree.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Invalid element operation.
    #[error("Invalid operation on element: {0}")]
    InvalidOperation(String),

    /// Moving an element into itself or one of its descendants.
    #[error("Would create cycle: {0} cannot be placed inside its own subtree")]
    CycleDetected(String),

    /// The root canvas container cannot be moved, removed or copied.
    #[error("The canvas root cannot be modified this way")]
    RootImmutable,

    /// An element id string could not be parsed.
    #[error("Invalid element id: {0}")]
    InvalidId(String),

    /// A tag or attribute name that cannot be written into markup.
    #[error("Invalid markup name: {0}")]
    InvalidMarkup(String),

    /// Unknown component type key.
    #[error("Unknown component type: {0}")]
    UnknownComponent(String),

    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Project file I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
