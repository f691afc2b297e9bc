//! Smart detection of existing page text under a click point
//!
//! Finds the text run a user most likely meant when clicking on rendered page
//! content, so edit-in-place flows can lift it into an editable element.

use crate::element::{FontFamily, NormPoint, NormRect, TextAlign, TextElement};
use pdf_engine::PageTextRun;

/// Tolerance margin for run hit-testing, in percent of page size per side.
///
/// Tunable: large enough to absorb imprecise clicks near a run's edge, small
/// enough that neighboring lines stay distinguishable.
pub const HIT_TOLERANCE_PCT: f32 = 1.0;

/// A text run lifted from the page, ready to seed a covering element.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedRun {
    pub text: String,
    /// Run bounding box in normalized page space.
    pub rect: NormRect,
    /// Font size in points.
    pub font_size: f32,
    pub font_family: FontFamily,
    pub bold: bool,
    pub italic: bool,
}

impl DetectedRun {
    /// Seed an edit-mode element that visually replaces this run: the run's
    /// box becomes `original_rect` so the serializer paints a covering patch.
    pub fn into_covering_element(self, page_number: u32) -> TextElement {
        let center = self.rect.center();
        let mut element = TextElement::new(page_number, center.x, center.y, self.text);
        element.font_family = self.font_family;
        element.font_size = self.font_size;
        element.bold = self.bold;
        element.italic = self.italic;
        element.original_rect = Some(self.rect);
        element.text_align = TextAlign::Left;
        element
    }
}

/// Find the run under a normalized click point.
///
/// Every run's box is expanded by [`HIT_TOLERANCE_PCT`] before the containment
/// check; among matches the smallest-area run wins, so a single word beats an
/// enclosing paragraph. `None` means "no existing text here", not an error.
pub fn detect_text_at(runs: &[PageTextRun], x_pct: f32, y_pct: f32) -> Option<DetectedRun> {
    let point = NormPoint::clamped(x_pct, y_pct);

    runs.iter()
        .filter(|run| {
            NormRect::new(run.bbox.x, run.bbox.y, run.bbox.width, run.bbox.height)
                .expanded(HIT_TOLERANCE_PCT)
                .contains(point)
        })
        .min_by(|a, b| {
            a.bbox
                .area()
                .partial_cmp(&b.bbox.area())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|run| DetectedRun {
            text: run.text.clone(),
            rect: NormRect::new(run.bbox.x, run.bbox.y, run.bbox.width, run.bbox.height),
            font_size: run.font_size,
            font_family: FontFamily::from_name_hint(&run.font_name),
            bold: run.bold,
            italic: run.italic,
        })
}
