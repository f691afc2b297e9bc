//! Editor session orchestration
//!
//! Owns the element store, history, and view state, and mediates every
//! mutation: pointer gestures are interpreted under the current tool mode,
//! committing operations snapshot the store into history exactly once per
//! logical user action, and everything mutating is gated while an export is
//! in flight.

use crate::coords::{self, PageViewport, ScreenPoint};
use crate::detect::{self, DetectedRun, HIT_TOLERANCE_PCT};
use crate::element::{ElementId, ElementPatch, TextElement};
use crate::export::{self, ExportError};
use crate::history::HistoryManager;
use crate::store::{ElementStore, StoreSnapshot};
use pdf_engine::{BackendError, DocumentHandle, LopdfBackend, PageSize, PdfBackend};

/// Text a click in add mode starts with.
const DEFAULT_TEXT: &str = "Text";

/// Fallback page geometry when no document is loaded (US Letter).
const FALLBACK_PAGE: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

const MIN_SCALE: f32 = 0.1;
const MAX_SCALE: f32 = 16.0;

/// Active tool, driving how pointer-down gestures are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    #[default]
    Select,
    Add,
    Edit,
}

#[derive(Debug)]
struct DragState {
    id: ElementId,
    before: StoreSnapshot,
    moved: bool,
}

/// Single-document editing session.
///
/// One instance per loaded document; the store is discarded when a new
/// document is loaded or the session is dropped.
pub struct EditorSession<B: PdfBackend = LopdfBackend> {
    backend: B,
    document: Option<DocumentHandle>,
    store: ElementStore,
    history: HistoryManager,
    current_page: u32,
    total_pages: u32,
    scale: f32,
    tool_mode: ToolMode,
    processing: bool,
    drag: Option<DragState>,
}

impl EditorSession<LopdfBackend> {
    pub fn with_default_backend() -> Self {
        Self::new(LopdfBackend::new())
    }
}

impl<B: PdfBackend> EditorSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            document: None,
            store: ElementStore::new(),
            history: HistoryManager::new(),
            current_page: 1,
            total_pages: 0,
            scale: 1.0,
            tool_mode: ToolMode::Select,
            processing: false,
            drag: None,
        }
    }

    /// Load a source document, discarding any previous edit state.
    pub fn load_document(&mut self, bytes: Vec<u8>) -> Result<(), BackendError> {
        let handle = self.backend.open(bytes.into())?;
        let page_count = self.backend.page_count(handle)?;

        if let Some(previous) = self.document.take() {
            let _ = self.backend.close(previous);
        }

        self.document = Some(handle);
        self.total_pages = page_count;
        self.current_page = 1;
        self.store.clear();
        self.history.clear();
        self.drag = None;
        self.tool_mode = ToolMode::Select;

        Ok(())
    }

    // --- read surface -----------------------------------------------------

    pub fn elements(&self) -> &[TextElement] {
        self.store.elements()
    }

    pub fn element(&self, id: ElementId) -> Option<&TextElement> {
        self.store.get(id)
    }

    pub fn selected_id(&self) -> Option<ElementId> {
        self.store.selected_id()
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn tool_mode(&self) -> ToolMode {
        self.tool_mode
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // --- committing mutations --------------------------------------------

    fn mutation_allowed(&self, action: &str) -> bool {
        if self.processing {
            log::warn!("{action} ignored while an export is in flight");
            return false;
        }
        true
    }

    fn page_in_range(&self, page_number: u32) -> bool {
        page_number >= 1 && page_number <= self.total_pages
    }

    /// Create an element at a normalized point. Returns `None` (logged) when
    /// the page is out of range or an export is in flight.
    pub fn add_text_element(
        &mut self,
        page_number: u32,
        x: f32,
        y: f32,
        text: impl Into<String>,
    ) -> Option<ElementId> {
        if !self.mutation_allowed("add") {
            return None;
        }
        if !self.page_in_range(page_number) {
            log::warn!("add ignored: page {page_number} outside 1..={}", self.total_pages);
            return None;
        }

        let before = self.store.snapshot();
        let id = self.store.add(TextElement::new(page_number, x, y, text));
        self.history.commit(before);

        Some(id)
    }

    pub fn update_element(&mut self, id: ElementId, patch: &ElementPatch) {
        if !self.mutation_allowed("update") {
            return;
        }

        let before = self.store.snapshot();
        if self.store.update(id, patch) {
            self.history.commit(before);
        }
    }

    pub fn delete_element(&mut self, id: ElementId) {
        if !self.mutation_allowed("delete") {
            return;
        }

        let before = self.store.snapshot();
        if self.store.delete(id) {
            self.history.commit(before);
            if self.drag.as_ref().is_some_and(|d| d.id == id) {
                self.drag = None;
            }
        }
    }

    /// Selection is transient UI state; it never commits history.
    pub fn select_element(&mut self, id: Option<ElementId>) {
        if !self.mutation_allowed("select") {
            return;
        }
        self.store.select(id);
    }

    /// Continuous drag update. The first call for an element captures the
    /// pre-drag snapshot; no call here pushes history.
    pub fn move_element(&mut self, id: ElementId, x: f32, y: f32) {
        if !self.mutation_allowed("move") {
            return;
        }
        if self.store.get(id).is_none() {
            log::debug!("move ignored: no element {id:?}");
            return;
        }

        if self.drag.as_ref().map(|d| d.id) != Some(id) {
            self.drag =
                Some(DragState { id, before: self.store.snapshot(), moved: false });
        }

        self.store.move_to(id, x, y);
        if let Some(drag) = &mut self.drag {
            drag.moved = true;
        }
    }

    /// Commit the finished drag as exactly one history entry.
    pub fn finish_movement(&mut self, id: ElementId) {
        if !self.mutation_allowed("finish move") {
            return;
        }

        match self.drag.take() {
            Some(drag) if drag.id == id => {
                if drag.moved {
                    self.history.commit(drag.before);
                }
            }
            other => {
                self.drag = other;
                log::debug!("finish ignored: no drag in progress for {id:?}");
            }
        }
    }

    pub fn undo(&mut self) {
        if !self.mutation_allowed("undo") {
            return;
        }

        if let Some(previous) = self.history.undo(self.store.snapshot()) {
            self.store.restore(previous);
            self.drag = None;
        }
    }

    pub fn redo(&mut self) {
        if !self.mutation_allowed("redo") {
            return;
        }

        if let Some(next) = self.history.redo(self.store.snapshot()) {
            self.store.restore(next);
            self.drag = None;
        }
    }

    // --- view state (never commits history) -------------------------------

    pub fn go_to_page(&mut self, page_number: u32) {
        if !self.page_in_range(page_number) {
            log::warn!(
                "navigation ignored: page {page_number} outside 1..={}",
                self.total_pages
            );
            return;
        }
        self.current_page = page_number;
    }

    /// Fix the page count before a document is loaded. Once a document set
    /// it, the count is immutable.
    pub fn set_total_pages(&mut self, total_pages: u32) {
        if self.total_pages != 0 && self.total_pages != total_pages {
            log::warn!(
                "total pages is fixed at {} for this session; {total_pages} ignored",
                self.total_pages
            );
            return;
        }
        self.total_pages = total_pages;
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
    }

    pub fn set_tool_mode(&mut self, tool_mode: ToolMode) {
        self.tool_mode = tool_mode;
    }

    // --- gestures ----------------------------------------------------------

    fn page_size_or_fallback(&self, page_number: u32) -> PageSize {
        self.document
            .and_then(|handle| self.backend.page_size(handle, page_number).ok())
            .unwrap_or(FALLBACK_PAGE)
    }

    /// Interpret a pointer-down on the current page under the active tool.
    ///
    /// Returns the element the gesture produced or selected, if any.
    pub fn pointer_down(
        &mut self,
        point: ScreenPoint,
        viewport: &PageViewport,
    ) -> Option<ElementId> {
        if !self.mutation_allowed("pointer") {
            return None;
        }

        let norm = coords::to_normalized(point, viewport);

        match self.tool_mode {
            ToolMode::Select => {
                let page = self.page_size_or_fallback(self.current_page);
                let hit = self
                    .store
                    .page_elements(self.current_page)
                    .iter()
                    .rev()
                    .find(|e| e.hit_test(norm, page, HIT_TOLERANCE_PCT))
                    .map(|e| e.id);

                match hit {
                    Some(id) => {
                        self.store.select(Some(id));
                        // Potential drag; committed once on pointer-up.
                        self.drag = Some(DragState {
                            id,
                            before: self.store.snapshot(),
                            moved: false,
                        });
                        Some(id)
                    }
                    None => {
                        self.store.select(None);
                        self.drag = None;
                        None
                    }
                }
            }
            ToolMode::Add => {
                let id =
                    self.add_text_element(self.current_page, norm.x, norm.y, DEFAULT_TEXT)?;
                // Hand straight over to select so the new element can be
                // repositioned or restyled without another mode switch.
                self.tool_mode = ToolMode::Select;
                Some(id)
            }
            ToolMode::Edit => {
                let detected = self.detect_text_at(norm.x, norm.y)?;
                let before = self.store.snapshot();
                let id = self.store.add(detected.into_covering_element(self.current_page));
                self.history.commit(before);
                self.tool_mode = ToolMode::Select;
                Some(id)
            }
        }
    }

    /// Pointer released: commits an in-progress drag, if any.
    pub fn pointer_up(&mut self) {
        if let Some(id) = self.drag.as_ref().map(|d| d.id) {
            self.finish_movement(id);
        }
    }

    // --- document services -------------------------------------------------

    /// Find the text run under a normalized point on the current page.
    ///
    /// `None` means "no existing text here", including when no document is
    /// loaded or the page's runs cannot be read (logged, never an error).
    pub fn detect_text_at(&self, x_pct: f32, y_pct: f32) -> Option<DetectedRun> {
        let handle = self.document?;

        match self.backend.page_text_runs(handle, self.current_page) {
            Ok(runs) => detect::detect_text_at(&runs, x_pct, y_pct),
            Err(err) => {
                log::warn!("text detection unavailable: {err}");
                None
            }
        }
    }

    /// Canvas geometry for one page at the session scale, from the external
    /// rasterizer.
    pub fn page_viewport(&self, page_number: u32) -> Option<PageViewport> {
        let handle = self.document?;

        match self.backend.render_page_surface(handle, page_number, self.scale) {
            Ok(surface) => Some(PageViewport::new(
                surface.image.width() as f32,
                surface.image.height() as f32,
            )),
            Err(err) => {
                log::warn!("page surface unavailable: {err}");
                None
            }
        }
    }

    /// Flatten all elements onto a copy of `source_bytes`.
    ///
    /// Holds the processing flag for the duration; the flag clears on every
    /// exit path, and a failed export leaves store and history untouched.
    pub fn save_pdf(&mut self, source_bytes: &[u8]) -> Result<Vec<u8>, ExportError> {
        self.processing = true;
        let result = export::flatten_elements(&mut self.backend, source_bytes, &self.store);
        self.processing = false;
        result
    }

    /// Drop all edits and history, back to the freshly-loaded state.
    pub fn reset(&mut self) {
        if !self.mutation_allowed("reset") {
            return;
        }

        self.store.clear();
        self.history.clear();
        self.drag = None;
        self.current_page = 1;
        self.tool_mode = ToolMode::Select;
    }
}
