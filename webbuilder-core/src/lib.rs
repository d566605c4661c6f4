//! # WebBuilder Core
//!
//! Canvas editing engine for a drag-and-drop website builder.
//! Compiles to WASM for the browser editor and runs natively for tooling.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                  CanvasController                     │
//! ├───────────────────────────────────────────────────────┤
//! │  DragDropEngine     │  SelectionController            │
//! │  - Drop targeting   │  - Overlay + handles            │
//! │  - Reorder / assets │  - Resize / move / nudge        │
//! ├───────────────────────────────────────────────────────┤
//! │  Canvas tree        │  StyleStore (state × breakpoint)│
//! │  - Elements         │  StyleResolver                  │
//! │  - Hit testing      │  - Cascade, hover preview       │
//! ├───────────────────────────────────────────────────────┤
//! │  ComponentRegistry  │  HistoryManager  │  Exporter    │
//! └───────────────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod asset;
pub mod canvas;
pub mod config;
pub mod controller;
pub mod drag;
pub mod element;
pub mod error;
pub mod event;
pub mod export;
pub mod history;
pub mod project;
pub mod registry;
pub mod resolver;
pub mod selection;
pub mod snapshot;
pub mod style;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use asset::{Asset, AssetLibrary};
pub use canvas::Canvas;
pub use config::EditorConfig;
pub use controller::{CanvasController, LayerEntry};
pub use drag::{DragDropEngine, DragPayload, DropIndicator, DropOutcome, DropPosition, DropTarget};
pub use element::{ComponentKind, Element, ElementId, Point, Rect};
pub use error::{CanvasError, CanvasResult};
pub use event::{EditorEvent, InputEvent, KeyModifiers, PointerPhase};
pub use export::{ExportOptions, MarkupMode};
pub use history::{HistoryManager, HistorySnapshot};
pub use project::ProjectFile;
pub use registry::{ComponentRegistry, ComponentTemplate};
pub use resolver::{EditContext, StyleResolver};
pub use selection::{ResizeHandle, SelectionController, SelectionMode};
pub use snapshot::CanvasDocument;
pub use style::{Breakpoint, InteractionState, StyleMap, StyleStore};

/// Engine version, recorded in saved projects.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
