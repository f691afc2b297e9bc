//! Document parse/write boundary for the edit engine
//!
//! Exposes a handle-based [`PdfBackend`] trait covering the three collaborator
//! roles the engine consumes: loading source bytes, extracting positioned text
//! runs for smart detection, and assembling an output document with flattened
//! edits. [`LopdfBackend`] is the default implementation on top of `lopdf`.

use image::{ImageBuffer, Rgba};
use lopdf::Document;
use std::collections::HashMap;

mod text;
mod write;

pub use write::STANDARD_FONTS;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Opaque handle to a loaded source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Opaque handle to an output document under assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputHandle(u64);

impl OutputHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Page dimensions in points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

/// A point in absolute document space: points, origin at bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfPoint {
    pub x: f32,
    pub y: f32,
}

/// A rectangle in absolute document space (bottom-left anchored).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Bounding box of an extracted text run in normalized page space
/// (percent of page width/height, origin at top-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RunBox {
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// A positioned text run extracted from a page's content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTextRun {
    pub text: String,
    pub bbox: RunBox,
    /// Effective font size in points.
    pub font_size: f32,
    /// Base font name hint (e.g. "Helvetica-Bold").
    pub font_name: String,
    pub bold: bool,
    pub italic: bool,
}

/// Typography for a single `draw_text` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDrawStyle {
    /// One of the 14 standard base fonts (e.g. "Times-BoldItalic").
    pub base_font: String,
    pub size_pt: f32,
    /// RGB, each component in 0.0..=1.0.
    pub color: [f32; 3],
    /// 0.0 (transparent) to 1.0 (opaque).
    pub opacity: f32,
    /// Clockwise rotation in degrees, about the text origin.
    pub rotation_deg: f32,
    /// Horizontal stretch factor, 1.0 = natural width.
    pub horizontal_scaling: f32,
}

/// Rendered page surface plus the geometry needed to derive a viewport.
pub struct PageSurface {
    pub image: RgbaImage,
    pub width_pt: f32,
    pub height_pt: f32,
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Bytes(Vec<u8>),
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for OpenSource {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("font {0:?} is not an embeddable standard font")]
    UnsupportedFont(String),
    #[error("write error: {0}")]
    Write(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Document-parsing/writing collaborator consumed by the edit engine.
///
/// Page numbers are 1-indexed everywhere, matching the engine's model.
pub trait PdfBackend {
    fn open(&mut self, source: OpenSource) -> BackendResult<DocumentHandle>;
    fn page_count(&self, handle: DocumentHandle) -> BackendResult<u32>;
    fn page_size(&self, handle: DocumentHandle, page_number: u32) -> BackendResult<PageSize>;

    /// Positioned text runs for one page, for smart detection.
    fn page_text_runs(
        &self,
        handle: DocumentHandle,
        page_number: u32,
    ) -> BackendResult<Vec<PageTextRun>>;

    /// Raster surface for page display; the engine only needs its geometry.
    fn render_page_surface(
        &self,
        handle: DocumentHandle,
        page_number: u32,
        scale: f32,
    ) -> BackendResult<PageSurface>;

    fn begin_output(&mut self, handle: DocumentHandle) -> BackendResult<OutputHandle>;
    fn draw_filled_rect(
        &mut self,
        output: OutputHandle,
        page_number: u32,
        rect: PdfRect,
        color: [f32; 3],
    ) -> BackendResult<()>;
    fn draw_text(
        &mut self,
        output: OutputHandle,
        page_number: u32,
        origin: PdfPoint,
        text: &str,
        style: &TextDrawStyle,
    ) -> BackendResult<()>;
    fn finish_output(&mut self, output: OutputHandle) -> BackendResult<Vec<u8>>;

    fn close(&mut self, handle: DocumentHandle) -> BackendResult<()>;
}

#[derive(Debug, Clone)]
struct DocumentRecord {
    bytes: Vec<u8>,
    page_sizes: Vec<PageSize>,
}

/// Default backend: pure-Rust parsing and writing via `lopdf`.
#[derive(Default)]
pub struct LopdfBackend {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
    outputs: HashMap<OutputHandle, write::OutputDoc>,
}

impl LopdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_sizes(bytes: &[u8]) -> BackendResult<Vec<PageSize>> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(BackendError::EncryptedUnsupported);
        }

        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut sizes = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            let dict = doc.get_dictionary(object_id)?;
            let size = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = array[0].as_float().ok()?;
                    let y0 = array[1].as_float().ok()?;
                    let x1 = array[2].as_float().ok()?;
                    let y1 = array[3].as_float().ok()?;
                    Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
                })
                .unwrap_or(PageSize { width_pt: 612.0, height_pt: 792.0 });

            sizes.push(size);
        }

        if sizes.is_empty() {
            return Err(BackendError::Write("document has no pages".to_owned()));
        }

        Ok(sizes)
    }

    fn record(&self, handle: DocumentHandle) -> BackendResult<&DocumentRecord> {
        self.docs.get(&handle).ok_or(BackendError::InvalidHandle(handle.raw()))
    }

    fn output(&mut self, handle: OutputHandle) -> BackendResult<&mut write::OutputDoc> {
        self.outputs.get_mut(&handle).ok_or(BackendError::InvalidHandle(handle.raw()))
    }

    fn check_page(&self, handle: DocumentHandle, page_number: u32) -> BackendResult<PageSize> {
        let record = self.record(handle)?;
        let page_count = record.page_sizes.len() as u32;
        if page_number == 0 || page_number > page_count {
            return Err(BackendError::PageOutOfRange { page: page_number, page_count });
        }
        Ok(record.page_sizes[(page_number - 1) as usize])
    }
}

impl PdfBackend for LopdfBackend {
    fn open(&mut self, source: OpenSource) -> BackendResult<DocumentHandle> {
        let OpenSource::Bytes(bytes) = source;
        let page_sizes = Self::parse_sizes(&bytes)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        self.docs.insert(handle, DocumentRecord { bytes, page_sizes });

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> BackendResult<u32> {
        Ok(self.record(handle)?.page_sizes.len() as u32)
    }

    fn page_size(&self, handle: DocumentHandle, page_number: u32) -> BackendResult<PageSize> {
        self.check_page(handle, page_number)
    }

    fn page_text_runs(
        &self,
        handle: DocumentHandle,
        page_number: u32,
    ) -> BackendResult<Vec<PageTextRun>> {
        let page_size = self.check_page(handle, page_number)?;
        let record = self.record(handle)?;

        let doc = Document::load_mem(&record.bytes)?;
        let Some(page_id) = doc.get_pages().get(&page_number).copied() else {
            return Ok(Vec::new());
        };

        text::extract_runs(&doc, page_id, page_size)
    }

    fn render_page_surface(
        &self,
        handle: DocumentHandle,
        page_number: u32,
        scale: f32,
    ) -> BackendResult<PageSurface> {
        let page_size = self.check_page(handle, page_number)?;
        let scale = if scale <= 0.0 { 1.0 } else { scale };

        let width = (page_size.width_pt * scale).round().max(1.0) as u32;
        let height = (page_size.height_pt * scale).round().max(1.0) as u32;

        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, Rgba([220, 220, 220, 255]));
                image.put_pixel(x, height - 1, Rgba([220, 220, 220, 255]));
            }
            for y in 0..height {
                image.put_pixel(0, y, Rgba([220, 220, 220, 255]));
                image.put_pixel(width - 1, y, Rgba([220, 220, 220, 255]));
            }
        }

        Ok(PageSurface { image, width_pt: page_size.width_pt, height_pt: page_size.height_pt })
    }

    fn begin_output(&mut self, handle: DocumentHandle) -> BackendResult<OutputHandle> {
        let record = self.record(handle)?;
        let output_doc = write::OutputDoc::from_bytes(&record.bytes)?;

        self.next_handle += 1;
        let output = OutputHandle(self.next_handle);
        self.outputs.insert(output, output_doc);

        Ok(output)
    }

    fn draw_filled_rect(
        &mut self,
        output: OutputHandle,
        page_number: u32,
        rect: PdfRect,
        color: [f32; 3],
    ) -> BackendResult<()> {
        self.output(output)?.push_filled_rect(page_number, rect, color)
    }

    fn draw_text(
        &mut self,
        output: OutputHandle,
        page_number: u32,
        origin: PdfPoint,
        text: &str,
        style: &TextDrawStyle,
    ) -> BackendResult<()> {
        self.output(output)?.push_text(page_number, origin, text, style)
    }

    fn finish_output(&mut self, output: OutputHandle) -> BackendResult<Vec<u8>> {
        let output_doc =
            self.outputs.remove(&output).ok_or(BackendError::InvalidHandle(output.raw()))?;
        output_doc.serialize()
    }

    fn close(&mut self, handle: DocumentHandle) -> BackendResult<()> {
        self.docs.remove(&handle).map(|_| ()).ok_or(BackendError::InvalidHandle(handle.raw()))
    }
}

#[cfg(test)]
pub mod fixtures {
    //! Synthetic in-memory documents used by the backend tests.

    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Build a minimal document where each page shows one line of text.
    pub fn document_with_text(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids: Vec<Object> = Vec::new();
        for page_text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![100.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*page_text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("content should encode"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("document should serialize");
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_document_and_reads_page_geometry() {
        let mut backend = LopdfBackend::new();
        let handle = backend
            .open(fixtures::document_with_text(&["first", "second"]).into())
            .expect("open should succeed");

        assert_eq!(backend.page_count(handle).expect("count should succeed"), 2);

        let size = backend.page_size(handle, 1).expect("size should succeed");
        assert_eq!(size.width_pt, 612.0);
        assert_eq!(size.height_pt, 792.0);
    }

    #[test]
    fn page_numbers_are_one_indexed() {
        let mut backend = LopdfBackend::new();
        let handle = backend
            .open(fixtures::document_with_text(&["only"]).into())
            .expect("open should succeed");

        assert!(matches!(
            backend.page_size(handle, 0),
            Err(BackendError::PageOutOfRange { page: 0, page_count: 1 })
        ));
        assert!(matches!(
            backend.page_size(handle, 2),
            Err(BackendError::PageOutOfRange { page: 2, page_count: 1 })
        ));
    }

    #[test]
    fn extracts_text_runs_with_geometry() {
        let mut backend = LopdfBackend::new();
        let handle = backend
            .open(fixtures::document_with_text(&["Invoice total"]).into())
            .expect("open should succeed");

        let runs = backend.page_text_runs(handle, 1).expect("runs should extract");
        assert_eq!(runs.len(), 1);

        let run = &runs[0];
        assert_eq!(run.text, "Invoice total");
        assert_eq!(run.font_name, "Helvetica");
        assert!(!run.bold);
        assert!((run.font_size - 12.0).abs() < 0.01);

        // Placed at x=100pt on a 612pt page.
        assert!((run.bbox.x - 100.0 / 612.0 * 100.0).abs() < 0.1);
        assert!(run.bbox.width > 0.0);
        assert!(run.bbox.y > 0.0 && run.bbox.y < 100.0);
    }

    #[test]
    fn render_surface_reports_page_geometry() {
        let mut backend = LopdfBackend::new();
        let handle = backend
            .open(fixtures::document_with_text(&["only"]).into())
            .expect("open should succeed");

        let surface = backend.render_page_surface(handle, 1, 1.5).expect("surface should render");
        assert_eq!(surface.image.width(), 918);
        assert_eq!(surface.width_pt, 612.0);
    }

    #[test]
    fn output_roundtrip_preserves_page_count() {
        let mut backend = LopdfBackend::new();
        let handle = backend
            .open(fixtures::document_with_text(&["a", "b"]).into())
            .expect("open should succeed");

        let output = backend.begin_output(handle).expect("output should begin");
        backend
            .draw_text(
                output,
                2,
                PdfPoint { x: 50.0, y: 300.0 },
                "stamped",
                &TextDrawStyle {
                    base_font: "Helvetica".to_owned(),
                    size_pt: 14.0,
                    color: [0.0, 0.0, 0.0],
                    opacity: 1.0,
                    rotation_deg: 0.0,
                    horizontal_scaling: 1.0,
                },
            )
            .expect("draw should queue");

        let bytes = backend.finish_output(output).expect("finish should serialize");
        assert!(!bytes.is_empty());

        let reopened = backend.open(bytes.into()).expect("output should reparse");
        assert_eq!(backend.page_count(reopened).expect("count should succeed"), 2);
    }

    #[test]
    fn invalid_handle_returns_error() {
        let backend = LopdfBackend::new();
        let err = backend
            .page_count(DocumentHandle(999))
            .expect_err("should fail for unknown handle");

        assert!(matches!(err, BackendError::InvalidHandle(999)));
    }
}
