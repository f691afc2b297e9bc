//! Flattening live edit state onto the source document
//!
//! The terminal step: walks every page in ascending order and draws its
//! elements in creation order, so repeated exports of unchanged state stay
//! reproducible wherever the underlying writer is deterministic. Export only
//! reads the store; a failed export leaves the model untouched.

use crate::coords;
use crate::element::{NormPoint, TextAlign, TextElement};
use crate::store::ElementStore;
use pdf_engine::{BackendError, PageSize, PdfBackend, PdfPoint, TextDrawStyle};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("parse-failed: {0}")]
    ParseFailed(String),
    #[error("font-unavailable: {0}")]
    FontUnavailable(String),
    #[error("write-failed: {0}")]
    WriteFailed(String),
}

impl From<BackendError> for ExportError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Parse(_) | BackendError::EncryptedUnsupported => {
                ExportError::ParseFailed(err.to_string())
            }
            BackendError::UnsupportedFont(_) => ExportError::FontUnavailable(err.to_string()),
            _ => ExportError::WriteFailed(err.to_string()),
        }
    }
}

/// Map Cyrillic onto Latin, one character at a time. `None` for anything
/// outside the Cyrillic alphabet.
fn transliterate_cyrillic(c: char) -> Option<&'static str> {
    Some(match c {
        'а' => "a", 'б' => "b", 'в' => "v", 'г' => "g", 'д' => "d",
        'е' | 'ё' => "e", 'ж' => "zh", 'з' => "z", 'и' | 'й' => "i",
        'к' => "k", 'л' => "l", 'м' => "m", 'н' => "n", 'о' => "o",
        'п' => "p", 'р' => "r", 'с' => "s", 'т' => "t", 'у' => "u",
        'ф' => "f", 'х' => "kh", 'ц' => "ts", 'ч' => "ch", 'ш' => "sh",
        'щ' => "shch", 'ъ' | 'ь' => "", 'ы' => "y", 'э' => "e",
        'ю' => "yu", 'я' => "ya",
        'А' => "A", 'Б' => "B", 'В' => "V", 'Г' => "G", 'Д' => "D",
        'Е' | 'Ё' => "E", 'Ж' => "Zh", 'З' => "Z", 'И' | 'Й' => "I",
        'К' => "K", 'Л' => "L", 'М' => "M", 'Н' => "N", 'О' => "O",
        'П' => "P", 'Р' => "R", 'С' => "S", 'Т' => "T", 'У' => "U",
        'Ф' => "F", 'Х' => "Kh", 'Ц' => "Ts", 'Ч' => "Ch", 'Ш' => "Sh",
        'Щ' => "Shch", 'Ъ' | 'Ь' => "", 'Ы' => "Y", 'Э' => "E",
        'Ю' => "Yu", 'Я' => "Ya",
        _ => return None,
    })
}

/// Rewrite text the standard fonts cannot cover. The degradation is logged;
/// characters are never silently dropped.
fn encodable_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut transliterated = 0usize;

    for c in text.chars() {
        match transliterate_cyrillic(c) {
            Some(mapped) => {
                out.push_str(mapped);
                transliterated += 1;
            }
            None => out.push(c),
        }
    }

    if transliterated > 0 {
        log::warn!(
            "transliterated {transliterated} Cyrillic character(s); no embeddable font covers them"
        );
    }

    out
}

/// Baseline origin for an element's text in absolute document space.
///
/// Edit-mode elements align inside the covered run's box; free elements
/// center their estimated box on the anchor point.
fn text_origin(element: &TextElement, text: &str, page: PageSize) -> PdfPoint {
    let width_pt =
        element.font_family.text_width_pt(text, element.font_size) * element.horizontal_scaling;

    if let Some(rect) = element.original_rect {
        let patch = coords::rect_to_absolute(rect, page);
        let x = match element.text_align {
            TextAlign::Left => patch.x,
            TextAlign::Center => patch.x + (patch.width - width_pt) / 2.0,
            TextAlign::Right => patch.x + patch.width - width_pt,
        };
        // Baseline sits a quarter of the patch height above its bottom edge.
        PdfPoint { x, y: patch.y + patch.height * 0.25 }
    } else {
        let center = coords::to_absolute(NormPoint::clamped(element.x, element.y), page);
        PdfPoint {
            x: center.x - width_pt / 2.0,
            y: center.y - element.font_size * 0.35,
        }
    }
}

fn draw_style(element: &TextElement) -> TextDrawStyle {
    TextDrawStyle {
        base_font: element.base_font().to_owned(),
        size_pt: element.font_size,
        color: element.color.to_normalized(),
        opacity: element.opacity.clamp(0.0, 1.0),
        rotation_deg: element.rotation,
        horizontal_scaling: element.horizontal_scaling,
    }
}

/// Flatten the store onto a fresh copy of `source_bytes`.
pub(crate) fn flatten_elements<B: PdfBackend>(
    backend: &mut B,
    source_bytes: &[u8],
    store: &ElementStore,
) -> Result<Vec<u8>, ExportError> {
    let handle = backend.open(source_bytes.into())?;

    let result = (|| {
        let page_count = backend.page_count(handle)?;
        let output = backend.begin_output(handle)?;

        // Elements outside the page range fall out of the walk below; make
        // the omission visible instead of silent.
        for element in store.elements() {
            if element.page_number == 0 || element.page_number > page_count {
                log::warn!(
                    "skipping element {:?}: page {} outside 1..={page_count}",
                    element.id,
                    element.page_number
                );
            }
        }

        for page_number in 1..=page_count {
            let elements = store.page_elements(page_number);
            if elements.is_empty() {
                continue;
            }

            let page = backend.page_size(handle, page_number)?;
            for element in elements {
                if let Some(rect) = element.original_rect {
                    backend.draw_filled_rect(
                        output,
                        page_number,
                        coords::rect_to_absolute(rect, page),
                        element.background_color.to_normalized(),
                    )?;
                }

                let text = encodable_text(&element.text);
                backend.draw_text(
                    output,
                    page_number,
                    text_origin(element, &text, page),
                    &text,
                    &draw_style(element),
                )?;
            }
        }

        backend.finish_output(output)
    })();

    let _ = backend.close(handle);
    result.map_err(ExportError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{FontFamily, NormRect};

    const LETTER: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

    #[test]
    fn cyrillic_is_transliterated_not_dropped() {
        assert_eq!(encodable_text("Привет"), "Privet");
        assert_eq!(encodable_text("Щука"), "Shchuka");
        assert_eq!(encodable_text("подъезд"), "podezd");
    }

    #[test]
    fn latin_text_passes_through_unchanged() {
        assert_eq!(encodable_text("Hello, world"), "Hello, world");
        assert_eq!(encodable_text("café"), "café");
    }

    #[test]
    fn free_element_text_centers_on_the_anchor() {
        let element = TextElement::new(1, 50.0, 50.0, "mm");
        let origin = text_origin(&element, &element.text, LETTER);

        // Two glyphs at 16pt Helvetica estimate to 16pt total width.
        assert!((origin.x - (306.0 - 8.0)).abs() < 0.1);
        assert!(origin.y < 396.0);
    }

    #[test]
    fn edit_mode_text_aligns_inside_the_patch() {
        let mut element = TextElement::new(1, 50.0, 50.0, "word");
        element.original_rect = Some(NormRect::new(0.0, 0.0, 50.0, 10.0));
        element.font_family = FontFamily::Courier;

        element.text_align = TextAlign::Left;
        let left = text_origin(&element, &element.text, LETTER);
        assert!((left.x - 0.0).abs() < 0.1);

        element.text_align = TextAlign::Right;
        let right = text_origin(&element, &element.text, LETTER);
        assert!(right.x > left.x);
        assert!((right.x + element.font_family.text_width_pt("word", 16.0) - 306.0).abs() < 0.1);
    }

    #[test]
    fn backend_errors_map_onto_distinguishable_causes() {
        let parse: ExportError = BackendError::EncryptedUnsupported.into();
        assert!(matches!(parse, ExportError::ParseFailed(_)));

        let font: ExportError = BackendError::UnsupportedFont("Comic Sans".to_owned()).into();
        assert!(matches!(font, ExportError::FontUnavailable(_)));

        let write: ExportError = BackendError::Write("disk full".to_owned()).into();
        assert!(matches!(write, ExportError::WriteFailed(_)));
    }
}
