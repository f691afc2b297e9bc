//! Text element data model
//!
//! All placement lives in normalized page space: percentages (0-100) of page
//! width/height with the origin at top-left, so stored state survives zoom and
//! DPI changes. An element's anchor is its *center*, which keeps the anchor
//! stable under rotation and font-size changes.

use pdf_engine::PageSize;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a text element
///
/// Ids are never reused within a session, even after deletion, so history
/// entries referencing an id stay unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

/// RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to normalized RGB components (0.0 to 1.0).
    pub fn to_normalized(&self) -> [f32; 3] {
        [self.r as f32 / 255.0, self.g as f32 / 255.0, self.b as f32 / 255.0]
    }

    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };
}

/// Supported font families
///
/// A fixed set; each family resolves onto the standard base fonts the
/// serializer can embed without font files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontFamily {
    Helvetica,
    Times,
    Courier,
}

impl FontFamily {
    /// Standard base font for this family and weight/slant combination.
    pub fn base_font(&self, bold: bool, italic: bool) -> &'static str {
        match self {
            FontFamily::Helvetica => match (bold, italic) {
                (true, true) => "Helvetica-BoldOblique",
                (true, false) => "Helvetica-Bold",
                (false, true) => "Helvetica-Oblique",
                (false, false) => "Helvetica",
            },
            FontFamily::Times => match (bold, italic) {
                (true, true) => "Times-BoldItalic",
                (true, false) => "Times-Bold",
                (false, true) => "Times-Italic",
                (false, false) => "Times-Roman",
            },
            FontFamily::Courier => match (bold, italic) {
                (true, true) => "Courier-BoldOblique",
                (true, false) => "Courier-Bold",
                (false, true) => "Courier-Oblique",
                (false, false) => "Courier",
            },
        }
    }

    /// Closest supported family for a font name hint (e.g. "Times-BoldItalic",
    /// "CourierNewPSMT"). Unknown names map to Helvetica.
    pub fn from_name_hint(hint: &str) -> Self {
        let lower = hint.to_lowercase();
        if lower.contains("courier") || lower.contains("mono") {
            FontFamily::Courier
        } else if lower.contains("times") || lower.contains("serif") || lower.contains("roman") {
            FontFamily::Times
        } else {
            FontFamily::Helvetica
        }
    }

    /// Average glyph advance as a fraction of the font size.
    fn avg_advance(&self) -> f32 {
        match self {
            FontFamily::Courier => 0.6,
            _ => 0.5,
        }
    }

    /// Estimated natural width of `text` at `size_pt`, in points.
    pub fn text_width_pt(&self, text: &str, size_pt: f32) -> f32 {
        self.avg_advance() * size_pt * text.chars().count() as f32
    }
}

impl Default for FontFamily {
    fn default() -> Self {
        FontFamily::Helvetica
    }
}

/// Horizontal alignment of text inside its box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// A point in normalized page space (percent of page width/height, top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormPoint {
    pub x: f32,
    pub y: f32,
}

impl NormPoint {
    /// Clamp into the 0-100 range; drags can transiently exceed page bounds.
    pub fn clamped(x: f32, y: f32) -> Self {
        Self { x: x.clamp(0.0, 100.0), y: y.clamp(0.0, 100.0) }
    }
}

/// A rectangle in normalized page space (top-left anchored)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn center(&self) -> NormPoint {
        NormPoint::clamped(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Grow by `margin` percent on every side.
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + margin * 2.0,
            height: self.height + margin * 2.0,
        }
    }

    pub fn contains(&self, point: NormPoint) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

/// A single editable text annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub id: ElementId,

    /// Page this element belongs to, 1-indexed.
    pub page_number: u32,

    /// Center of the element, percent of page width.
    pub x: f32,

    /// Center of the element, percent of page height.
    pub y: f32,

    pub text: String,
    pub font_family: FontFamily,

    /// Font size in points.
    pub font_size: f32,

    pub color: Color,
    pub bold: bool,
    pub italic: bool,

    /// 0.0 (transparent) to 1.0 (opaque).
    pub opacity: f32,

    /// Clockwise rotation in degrees.
    pub rotation: f32,

    /// Transient UI state, not persisted across save/export.
    #[serde(skip)]
    pub selected: bool,

    /// Box of the text run this element covers, when editing in place. The
    /// serializer paints an opaque patch over it before drawing the new text.
    pub original_rect: Option<NormRect>,

    /// Patch color used with `original_rect`.
    pub background_color: Color,

    pub text_align: TextAlign,

    /// Horizontal stretch approximating the covered run's width when the
    /// replacement text's natural width differs. 1.0 = no stretch.
    pub horizontal_scaling: f32,
}

impl TextElement {
    /// Create an element with default typography at the given center point.
    pub fn new(page_number: u32, x: f32, y: f32, text: impl Into<String>) -> Self {
        let center = NormPoint::clamped(x, y);
        Self {
            id: ElementId::new(),
            page_number,
            x: center.x,
            y: center.y,
            text: text.into(),
            font_family: FontFamily::Helvetica,
            font_size: 16.0,
            color: Color::BLACK,
            bold: false,
            italic: false,
            opacity: 1.0,
            rotation: 0.0,
            selected: false,
            original_rect: None,
            background_color: Color::WHITE,
            text_align: TextAlign::Left,
            horizontal_scaling: 1.0,
        }
    }

    /// The standard base font this element renders with.
    pub fn base_font(&self) -> &'static str {
        self.font_family.base_font(self.bold, self.italic)
    }

    /// Move the center, clamping into page bounds.
    pub fn move_to(&mut self, x: f32, y: f32) {
        let center = NormPoint::clamped(x, y);
        self.x = center.x;
        self.y = center.y;
    }

    /// Estimated bounding box in normalized space, for hit-testing.
    ///
    /// Edit-mode elements use the covered run's box; free elements use the
    /// average-advance width estimate centered on the anchor.
    pub fn estimated_box(&self, page: PageSize) -> NormRect {
        if let Some(rect) = self.original_rect {
            return rect;
        }
        if page.width_pt <= 0.0 || page.height_pt <= 0.0 {
            return NormRect::new(self.x, self.y, 0.0, 0.0);
        }

        let width_pt =
            self.font_family.text_width_pt(&self.text, self.font_size) * self.horizontal_scaling;
        let width = width_pt / page.width_pt * 100.0;
        let height = self.font_size / page.height_pt * 100.0;

        NormRect::new(self.x - width / 2.0, self.y - height / 2.0, width, height)
    }

    /// Whether a normalized point falls on this element, within `tolerance`
    /// percent on every side.
    pub fn hit_test(&self, point: NormPoint, page: PageSize, tolerance: f32) -> bool {
        self.estimated_box(page).expanded(tolerance).contains(point)
    }
}

/// Partial update applied through the store
///
/// Absent fields leave the element untouched, so UI controls can patch a
/// single property without reading the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementPatch {
    pub text: Option<String>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub font_family: Option<FontFamily>,
    pub font_size: Option<f32>,
    pub color: Option<Color>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub opacity: Option<f32>,
    pub rotation: Option<f32>,
    pub original_rect: Option<NormRect>,
    pub background_color: Option<Color>,
    pub text_align: Option<TextAlign>,
    pub horizontal_scaling: Option<f32>,
}

impl ElementPatch {
    pub fn apply(&self, element: &mut TextElement) {
        if let Some(text) = &self.text {
            element.text = text.clone();
        }
        if self.x.is_some() || self.y.is_some() {
            element.move_to(self.x.unwrap_or(element.x), self.y.unwrap_or(element.y));
        }
        if let Some(font_family) = self.font_family {
            element.font_family = font_family;
        }
        if let Some(font_size) = self.font_size {
            element.font_size = font_size.max(1.0);
        }
        if let Some(color) = self.color {
            element.color = color;
        }
        if let Some(bold) = self.bold {
            element.bold = bold;
        }
        if let Some(italic) = self.italic {
            element.italic = italic;
        }
        if let Some(opacity) = self.opacity {
            element.opacity = opacity.clamp(0.0, 1.0);
        }
        if let Some(rotation) = self.rotation {
            element.rotation = rotation;
        }
        if let Some(rect) = self.original_rect {
            element.original_rect = Some(rect);
        }
        if let Some(background_color) = self.background_color {
            element.background_color = background_color;
        }
        if let Some(text_align) = self.text_align {
            element.text_align = text_align;
        }
        if let Some(horizontal_scaling) = self.horizontal_scaling {
            element.horizontal_scaling = horizontal_scaling.max(0.01);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETTER: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

    #[test]
    fn new_element_clamps_center_into_page_bounds() {
        let element = TextElement::new(1, 120.0, -5.0, "clamped");
        assert_eq!(element.x, 100.0);
        assert_eq!(element.y, 0.0);
    }

    #[test]
    fn base_font_resolution_covers_all_combinations() {
        let mut element = TextElement::new(1, 50.0, 50.0, "t");
        assert_eq!(element.base_font(), "Helvetica");

        element.bold = true;
        element.italic = true;
        assert_eq!(element.base_font(), "Helvetica-BoldOblique");

        element.font_family = FontFamily::Times;
        assert_eq!(element.base_font(), "Times-BoldItalic");

        element.bold = false;
        element.italic = false;
        assert_eq!(element.base_font(), "Times-Roman");
    }

    #[test]
    fn family_hint_matching() {
        assert_eq!(FontFamily::from_name_hint("Times-Bold"), FontFamily::Times);
        assert_eq!(FontFamily::from_name_hint("CourierNewPSMT"), FontFamily::Courier);
        assert_eq!(FontFamily::from_name_hint("Arial-BoldMT"), FontFamily::Helvetica);
    }

    #[test]
    fn estimated_box_is_centered_on_anchor() {
        let element = TextElement::new(1, 50.0, 50.0, "abcd");
        let bbox = element.estimated_box(LETTER);

        assert!((bbox.center().x - 50.0).abs() < 0.01);
        assert!((bbox.center().y - 50.0).abs() < 0.01);
        assert!(bbox.width > 0.0);
    }

    #[test]
    fn edit_mode_element_hit_tests_against_original_rect() {
        let mut element = TextElement::new(1, 50.0, 50.0, "covered");
        element.original_rect = Some(NormRect::new(10.0, 10.0, 20.0, 3.0));

        assert!(element.hit_test(NormPoint::clamped(15.0, 11.0), LETTER, 1.0));
        assert!(!element.hit_test(NormPoint::clamped(50.0, 50.0), LETTER, 1.0));
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let mut element = TextElement::new(1, 50.0, 50.0, "before");
        let patch = ElementPatch {
            font_size: Some(24.0),
            bold: Some(true),
            ..ElementPatch::default()
        };
        patch.apply(&mut element);

        assert_eq!(element.font_size, 24.0);
        assert!(element.bold);
        assert_eq!(element.text, "before");
        assert_eq!(element.x, 50.0);
    }

    #[test]
    fn patch_clamps_position_and_opacity() {
        let mut element = TextElement::new(1, 50.0, 50.0, "t");
        let patch = ElementPatch {
            x: Some(150.0),
            opacity: Some(2.0),
            ..ElementPatch::default()
        };
        patch.apply(&mut element);

        assert_eq!(element.x, 100.0);
        assert_eq!(element.opacity, 1.0);
    }
}
