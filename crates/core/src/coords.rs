//! Coordinate mapping between screen, normalized, and document space
//!
//! Three spaces are in play: rendered canvas pixels (scale- and DPI-
//! dependent), normalized page space (percent of page width/height, top-left
//! origin), and absolute document space (points, bottom-left origin, the
//! output format's convention). Everything here is a pure function of its
//! inputs; the same transforms run during interactive editing and during
//! batch serialization.

use crate::element::{NormPoint, NormRect};
use pdf_engine::{PageSize, PdfPoint, PdfRect};

/// Display rotation of a page, quarter turns clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageRotation {
    #[default]
    None,
    Quarter,
    Half,
    ThreeQuarter,
}

impl PageRotation {
    /// Snap arbitrary degrees onto a quarter turn; anything that is not a
    /// right angle maps to no rotation.
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => PageRotation::Quarter,
            180 => PageRotation::Half,
            270 => PageRotation::ThreeQuarter,
            _ => PageRotation::None,
        }
    }

    pub fn degrees(&self) -> i32 {
        match self {
            PageRotation::None => 0,
            PageRotation::Quarter => 90,
            PageRotation::Half => 180,
            PageRotation::ThreeQuarter => 270,
        }
    }
}

/// A point on the rendered canvas, in pixels from its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

/// Geometry of the rendered canvas for one page.
///
/// `width_px`/`height_px` are the canvas dimensions as displayed, i.e. already
/// swapped for quarter rotations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageViewport {
    pub width_px: f32,
    pub height_px: f32,
    pub rotation: PageRotation,
}

impl PageViewport {
    pub fn new(width_px: f32, height_px: f32) -> Self {
        Self { width_px, height_px, rotation: PageRotation::None }
    }

    pub fn with_rotation(width_px: f32, height_px: f32, rotation: PageRotation) -> Self {
        Self { width_px, height_px, rotation }
    }
}

/// Canvas pixels to normalized page space, folding out the display rotation.
///
/// A point recorded while the page was displayed rotated maps to the same
/// unrotated page location regardless of later redisplay orientation.
pub fn to_normalized(point: ScreenPoint, viewport: &PageViewport) -> NormPoint {
    if viewport.width_px <= 0.0 || viewport.height_px <= 0.0 {
        return NormPoint::clamped(0.0, 0.0);
    }

    let sx = point.x / viewport.width_px;
    let sy = point.y / viewport.height_px;

    let (u, v) = match viewport.rotation {
        PageRotation::None => (sx, sy),
        PageRotation::Quarter => (sy, 1.0 - sx),
        PageRotation::Half => (1.0 - sx, 1.0 - sy),
        PageRotation::ThreeQuarter => (1.0 - sy, sx),
    };

    NormPoint::clamped(u * 100.0, v * 100.0)
}

/// Normalized page space to canvas pixels; inverse of [`to_normalized`].
pub fn to_screen(point: NormPoint, viewport: &PageViewport) -> ScreenPoint {
    let u = point.x / 100.0;
    let v = point.y / 100.0;

    let (sx, sy) = match viewport.rotation {
        PageRotation::None => (u, v),
        PageRotation::Quarter => (1.0 - v, u),
        PageRotation::Half => (1.0 - u, 1.0 - v),
        PageRotation::ThreeQuarter => (v, 1.0 - u),
    };

    ScreenPoint { x: sx * viewport.width_px, y: sy * viewport.height_px }
}

/// Normalized page space to absolute document space (points, bottom-left
/// origin, so the vertical axis flips).
pub fn to_absolute(point: NormPoint, page: PageSize) -> PdfPoint {
    PdfPoint {
        x: point.x / 100.0 * page.width_pt,
        y: (1.0 - point.y / 100.0) * page.height_pt,
    }
}

/// Absolute document space back to normalized page space, for hit-testing.
pub fn from_absolute(point: PdfPoint, page: PageSize) -> NormPoint {
    if page.width_pt <= 0.0 || page.height_pt <= 0.0 {
        return NormPoint::clamped(0.0, 0.0);
    }

    NormPoint::clamped(
        point.x / page.width_pt * 100.0,
        (1.0 - point.y / page.height_pt) * 100.0,
    )
}

/// A top-left-anchored normalized rectangle to a bottom-left-anchored
/// absolute one.
pub fn rect_to_absolute(rect: NormRect, page: PageSize) -> PdfRect {
    let width = rect.width / 100.0 * page.width_pt;
    let height = rect.height / 100.0 * page.height_pt;

    PdfRect {
        x: rect.x / 100.0 * page.width_pt,
        y: (1.0 - (rect.y + rect.height) / 100.0) * page.height_pt,
        width,
        height,
    }
}
