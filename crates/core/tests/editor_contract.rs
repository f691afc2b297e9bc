//! End-to-end contract tests for the editing session
//!
//! Drives the full surface against synthetic in-memory documents: load,
//! gesture-driven editing, smart detection, undo/redo, and export.

use overtype_core::{EditorSession, ElementPatch, ScreenPoint, ToolMode};
use pdf_engine::{LopdfBackend, PdfBackend};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Build a document with one text line per page at a known position.
fn document_with_lines(pages: &[(&str, f32, f32)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids: Vec<Object> = Vec::new();
    for (text, x, y) in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![(*x).into(), (*y).into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
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

fn two_page_source() -> Vec<u8> {
    document_with_lines(&[("Hello world", 100.0, 700.0), ("Second page", 72.0, 720.0)])
}

fn page_texts(bytes: &[u8], page_number: u32) -> Vec<String> {
    let mut backend = LopdfBackend::new();
    let handle = backend.open(bytes.to_vec().into()).expect("output should parse");
    backend
        .page_text_runs(handle, page_number)
        .expect("runs should extract")
        .into_iter()
        .map(|run| run.text)
        .collect()
}

#[test]
fn scenario_walkthrough() {
    let source = two_page_source();
    let mut session = EditorSession::with_default_backend();
    session.load_document(source.clone()).expect("load should succeed");
    session.set_total_pages(2);
    assert_eq!(session.total_pages(), 2);

    let id = session.add_text_element(1, 50.0, 50.0, "Hello").expect("in range");
    assert_eq!(session.elements().len(), 1);
    let element = session.element(id).expect("element");
    assert_eq!(element.page_number, 1);
    assert_eq!(element.x, 50.0);
    assert_eq!(element.y, 50.0);
    assert!(element.selected);

    session.update_element(id, &ElementPatch { font_size: Some(24.0), ..Default::default() });
    assert_eq!(session.element(id).expect("element").font_size, 24.0);

    session.undo();
    assert_eq!(session.element(id).expect("element").font_size, 16.0);

    session.undo();
    assert!(session.elements().is_empty());

    session.add_text_element(1, 50.0, 50.0, "Hello").expect("in range");
    let output = session.save_pdf(&source).expect("export should succeed");
    assert!(!output.is_empty());

    let mut backend = LopdfBackend::new();
    let reopened = backend.open(output.into()).expect("output should parse");
    assert_eq!(backend.page_count(reopened).expect("count"), 2);
}

#[test]
fn export_without_edits_leaves_structure_untouched() {
    let source = two_page_source();
    let mut session = EditorSession::with_default_backend();
    session.load_document(source.clone()).expect("load should succeed");

    let output = session.save_pdf(&source).expect("export should succeed");

    let mut backend = LopdfBackend::new();
    let reopened = backend.open(output.clone().into()).expect("output should parse");
    assert_eq!(backend.page_count(reopened).expect("count"), 2);

    // No spurious marks: the only text on each page is the source text.
    assert_eq!(page_texts(&output, 1), vec!["Hello world".to_owned()]);
    assert_eq!(page_texts(&output, 2), vec!["Second page".to_owned()]);
}

#[test]
fn detection_finds_the_source_run() {
    let source = two_page_source();
    let mut session = EditorSession::with_default_backend();
    session.load_document(source).expect("load should succeed");

    // Center of "Hello world": 11 glyphs at 12pt Helvetica from x=100pt,
    // baseline y=700pt on a 612x792pt page.
    let x_pct = (100.0 + 33.0) / 612.0 * 100.0;
    let y_pct = (1.0 - 706.0 / 792.0) * 100.0;

    let detected = session.detect_text_at(x_pct, y_pct).expect("should find the run");
    assert_eq!(detected.text, "Hello world");
    assert!((detected.font_size - 12.0).abs() < 0.1);

    // Far corner of the page: a miss, not an error.
    assert!(session.detect_text_at(95.0, 95.0).is_none());
}

#[test]
fn edit_in_place_flow_covers_and_replaces_the_run() {
    let source = two_page_source();
    let mut session = EditorSession::with_default_backend();
    session.load_document(source.clone()).expect("load should succeed");

    let viewport = session.page_viewport(1).expect("viewport should derive");
    assert_eq!(viewport.width_px, 612.0);

    session.set_tool_mode(ToolMode::Edit);
    let x_pct = (100.0 + 33.0) / 612.0 * 100.0;
    let y_pct = (1.0 - 706.0 / 792.0) * 100.0;
    let id = session
        .pointer_down(
            ScreenPoint { x: x_pct / 100.0 * 612.0, y: y_pct / 100.0 * 792.0 },
            &viewport,
        )
        .expect("hit should seed a covering element");

    assert_eq!(session.tool_mode(), ToolMode::Select);
    let element = session.element(id).expect("element");
    assert_eq!(element.text, "Hello world");
    assert!(element.original_rect.is_some());
    assert!(element.selected);

    session.update_element(id, &ElementPatch { text: Some("Hello Rust".to_owned()), ..Default::default() });

    let output = session.save_pdf(&source).expect("export should succeed");
    let texts = page_texts(&output, 1);
    assert!(texts.iter().any(|t| t == "Hello Rust"), "replacement text missing: {texts:?}");
}

#[test]
fn failed_export_clears_processing_and_preserves_state() {
    let source = two_page_source();
    let mut session = EditorSession::with_default_backend();
    session.load_document(source).expect("load should succeed");
    session.add_text_element(1, 30.0, 30.0, "survivor").expect("in range");

    let err = session.save_pdf(b"not a pdf at all").expect_err("garbage should fail");
    assert!(matches!(err, overtype_core::ExportError::ParseFailed(_)));

    assert!(!session.is_processing());
    assert_eq!(session.elements().len(), 1);
    assert!(session.can_undo());

    // The session stays fully editable after the failure.
    session.add_text_element(2, 40.0, 40.0, "after").expect("in range");
    assert_eq!(session.elements().len(), 2);
}

#[test]
fn cyrillic_text_is_transliterated_into_the_output() {
    let source = two_page_source();
    let mut session = EditorSession::with_default_backend();
    session.load_document(source.clone()).expect("load should succeed");

    session.add_text_element(1, 60.0, 60.0, "Привет").expect("in range");
    let output = session.save_pdf(&source).expect("export should succeed");

    let texts = page_texts(&output, 1);
    assert!(texts.iter().any(|t| t == "Privet"), "transliteration missing: {texts:?}");
}

#[test]
fn elements_flatten_onto_their_own_pages() {
    let source = two_page_source();
    let mut session = EditorSession::with_default_backend();
    session.load_document(source.clone()).expect("load should succeed");

    session.add_text_element(1, 20.0, 20.0, "first page note").expect("in range");
    session.add_text_element(2, 80.0, 80.0, "second page note").expect("in range");

    let output = session.save_pdf(&source).expect("export should succeed");

    assert!(page_texts(&output, 1).iter().any(|t| t == "first page note"));
    assert!(!page_texts(&output, 1).iter().any(|t| t == "second page note"));
    assert!(page_texts(&output, 2).iter().any(|t| t == "second page note"));
}
