//! Overtype Core Library
//!
//! Document annotation and edit engine: place, select, move, restyle, and
//! persist text elements onto a multi-page document with full undo/redo,
//! coordinate mapping across screen/normalized/document space, smart
//! detection of existing page text, and flattening of all edits into a new
//! document byte stream.

pub mod coords;
pub mod detect;
pub mod element;
pub mod export;
pub mod history;
pub mod session;
pub mod store;

pub use coords::{PageRotation, PageViewport, ScreenPoint};
pub use detect::{detect_text_at, DetectedRun, HIT_TOLERANCE_PCT};
pub use element::{
    Color, ElementId, ElementPatch, FontFamily, NormPoint, NormRect, TextAlign, TextElement,
};
pub use export::ExportError;
pub use history::HistoryManager;
pub use session::{EditorSession, ToolMode};
pub use store::{ElementStore, StoreSnapshot};
