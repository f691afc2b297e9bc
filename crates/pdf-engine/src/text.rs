//! Text-run extraction from page content streams
//!
//! Walks the text-positioning subset of the content stream (`Tf`, `Tm`, `Td`,
//! `TD`, `TL`, `T*`, `Tj`, `TJ`, `'`, `"`) and produces positioned runs in
//! normalized page space. Glyph widths use a per-font average advance, so run
//! boxes are approximations anchored at the baseline.

use crate::{BackendResult, PageSize, PageTextRun, RunBox};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use std::collections::HashMap;

/// Average glyph advance as a fraction of the font size.
fn avg_advance(base_font: &str) -> f32 {
    if base_font.starts_with("Courier") {
        0.6
    } else {
        0.5
    }
}

fn is_bold(base_font: &str) -> bool {
    base_font.to_lowercase().contains("bold")
}

fn is_italic(base_font: &str) -> bool {
    let lower = base_font.to_lowercase();
    lower.contains("italic") || lower.contains("oblique")
}

/// Map a page's font resource names to their BaseFont names.
fn font_map(doc: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, String> {
    let mut map = HashMap::new();

    let Ok(page_dict) = doc.get_dictionary(page_id) else {
        return map;
    };

    let resources = match page_dict.get(b"Resources") {
        Ok(Object::Dictionary(dict)) => Some(dict.clone()),
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).ok().cloned(),
        _ => None,
    };
    let Some(resources) = resources else {
        return map;
    };

    let fonts = match resources.get(b"Font") {
        Ok(Object::Dictionary(dict)) => Some(dict.clone()),
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).ok().cloned(),
        _ => None,
    };
    let Some(fonts) = fonts else {
        return map;
    };

    for (name, value) in fonts.iter() {
        let font_dict = match value {
            Object::Dictionary(dict) => Some(dict.clone()),
            Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
            _ => None,
        };
        if let Some(font_dict) = font_dict {
            if let Ok(base) = font_dict.get(b"BaseFont").and_then(|obj| obj.as_name()) {
                map.insert(name.clone(), String::from_utf8_lossy(base).into_owned());
            }
        }
    }

    map
}

/// PDF strings in the text operators we emit and consume are single-byte
/// encoded; map them through Latin-1 so byte values survive as characters.
fn decode_pdf_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

struct TextCursor {
    base_font: String,
    declared_size: f32,
    leading: f32,
    scale_x: f32,
    scale_y: f32,
    line_x: f32,
    line_y: f32,
    cursor_x: f32,
}

impl TextCursor {
    fn new() -> Self {
        Self {
            base_font: String::new(),
            declared_size: 0.0,
            leading: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            line_x: 0.0,
            line_y: 0.0,
            cursor_x: 0.0,
        }
    }

    fn effective_size(&self) -> f32 {
        self.declared_size * self.scale_y
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.line_x += tx * self.scale_x;
        self.line_y += ty * self.scale_y;
        self.cursor_x = self.line_x;
    }

    fn advance_for(&self, text: &str) -> f32 {
        avg_advance(&self.base_font) * self.declared_size * self.scale_x * text.chars().count() as f32
    }
}

pub(crate) fn extract_runs(
    doc: &Document,
    page_id: ObjectId,
    page_size: PageSize,
) -> BackendResult<Vec<PageTextRun>> {
    let fonts = font_map(doc, page_id);
    let content_data = doc.get_page_content(page_id)?;
    let content = Content::decode(&content_data)?;

    let mut runs = Vec::new();
    let mut cursor = TextCursor::new();

    let mut emit = |cursor: &TextCursor, text: String, start_x: f32, width: f32| {
        if text.trim().is_empty() || page_size.width_pt <= 0.0 || page_size.height_pt <= 0.0 {
            return;
        }
        let size = cursor.effective_size();
        let bbox = RunBox {
            x: (start_x / page_size.width_pt * 100.0).clamp(0.0, 100.0),
            y: ((1.0 - (cursor.line_y + size) / page_size.height_pt) * 100.0).clamp(0.0, 100.0),
            width: (width.max(0.0) / page_size.width_pt * 100.0).min(100.0),
            height: (size / page_size.height_pt * 100.0).min(100.0),
        };
        runs.push(PageTextRun {
            text,
            bbox,
            font_size: size,
            font_name: cursor.base_font.clone(),
            bold: is_bold(&cursor.base_font),
            italic: is_italic(&cursor.base_font),
        });
    };

    for op in &content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => {
                // Font and leading are graphics state; only the matrices reset.
                cursor.scale_x = 1.0;
                cursor.scale_y = 1.0;
                cursor.line_x = 0.0;
                cursor.line_y = 0.0;
                cursor.cursor_x = 0.0;
            }
            "Tf" => {
                if operands.len() == 2 {
                    if let (Ok(name), Ok(size)) = (operands[0].as_name(), operands[1].as_float()) {
                        cursor.base_font = fonts
                            .get(name)
                            .cloned()
                            .unwrap_or_else(|| String::from_utf8_lossy(name).into_owned());
                        cursor.declared_size = size;
                    }
                }
            }
            "TL" => {
                if let Some(Ok(leading)) = operands.first().map(|o| o.as_float()) {
                    cursor.leading = leading;
                }
            }
            "Tm" => {
                if operands.len() == 6 {
                    let values: Vec<f32> =
                        operands.iter().filter_map(|o| o.as_float().ok()).collect();
                    if values.len() == 6 {
                        let [a, b, c, d, e, f] =
                            [values[0], values[1], values[2], values[3], values[4], values[5]];
                        cursor.scale_x = (a * a + b * b).sqrt().max(f32::EPSILON);
                        cursor.scale_y = (c * c + d * d).sqrt().max(f32::EPSILON);
                        cursor.line_x = e;
                        cursor.line_y = f;
                        cursor.cursor_x = e;
                    }
                }
            }
            "Td" => {
                if operands.len() == 2 {
                    if let (Ok(tx), Ok(ty)) = (operands[0].as_float(), operands[1].as_float()) {
                        cursor.translate_line(tx, ty);
                    }
                }
            }
            "TD" => {
                if operands.len() == 2 {
                    if let (Ok(tx), Ok(ty)) = (operands[0].as_float(), operands[1].as_float()) {
                        cursor.leading = -ty;
                        cursor.translate_line(tx, ty);
                    }
                }
            }
            "T*" => {
                let leading = cursor.leading;
                cursor.translate_line(0.0, -leading);
            }
            "Tj" | "'" | "\"" => {
                if op.operator.as_str() != "Tj" {
                    let leading = cursor.leading;
                    cursor.translate_line(0.0, -leading);
                }
                // The string is the last operand for all three forms.
                if let Some(Object::String(bytes, _)) = operands.last() {
                    let text = decode_pdf_string(bytes);
                    let width = cursor.advance_for(&text);
                    emit(&cursor, text, cursor.cursor_x, width);
                    cursor.cursor_x += width;
                }
            }
            "TJ" => {
                if let Some(Ok(items)) = operands.first().map(|o| o.as_array()) {
                    let start_x = cursor.cursor_x;
                    let mut text = String::new();
                    for item in items {
                        match item {
                            Object::String(bytes, _) => {
                                let piece = decode_pdf_string(bytes);
                                cursor.cursor_x += cursor.advance_for(&piece);
                                text.push_str(&piece);
                            }
                            other => {
                                if let Ok(adjust) = other.as_float() {
                                    cursor.cursor_x -=
                                        adjust / 1000.0 * cursor.declared_size * cursor.scale_x;
                                }
                            }
                        }
                    }
                    let width = cursor.cursor_x - start_x;
                    emit(&cursor, text, start_x, width);
                }
            }
            _ => {}
        }
    }

    Ok(runs)
}
