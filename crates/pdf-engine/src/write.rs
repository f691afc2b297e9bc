//! Output document assembly
//!
//! Collects draw operations per page and flattens them into appended content
//! streams on a copy of the source document. Fonts are restricted to the 14
//! standard base fonts with WinAnsi encoding; opacity goes through ExtGState
//! resources the same way viewers expect (`/OvGn gs`).

use crate::{BackendError, BackendResult, PdfPoint, PdfRect, TextDrawStyle};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// The 14 standard PDF base fonts every conforming reader provides.
pub const STANDARD_FONTS: [&str; 14] = [
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Helvetica-BoldOblique",
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Symbol",
    "ZapfDingbats",
];

/// WinAnsi code for a character, `None` when the encoding has no slot for it.
fn winansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match c {
        _ if code < 0x80 => Some(code as u8),
        '\u{20AC}' => Some(0x80),
        '\u{201A}' => Some(0x82),
        '\u{0192}' => Some(0x83),
        '\u{201E}' => Some(0x84),
        '\u{2026}' => Some(0x85),
        '\u{2020}' => Some(0x86),
        '\u{2021}' => Some(0x87),
        '\u{02C6}' => Some(0x88),
        '\u{2030}' => Some(0x89),
        '\u{0160}' => Some(0x8A),
        '\u{2039}' => Some(0x8B),
        '\u{0152}' => Some(0x8C),
        '\u{017D}' => Some(0x8E),
        '\u{2018}' => Some(0x91),
        '\u{2019}' => Some(0x92),
        '\u{201C}' => Some(0x93),
        '\u{201D}' => Some(0x94),
        '\u{2022}' => Some(0x95),
        '\u{2013}' => Some(0x96),
        '\u{2014}' => Some(0x97),
        '\u{02DC}' => Some(0x98),
        '\u{2122}' => Some(0x99),
        '\u{0161}' => Some(0x9A),
        '\u{203A}' => Some(0x9B),
        '\u{0153}' => Some(0x9C),
        '\u{017E}' => Some(0x9E),
        '\u{0178}' => Some(0x9F),
        _ if (0xA0..=0xFF).contains(&code) => Some(code as u8),
        _ => None,
    }
}

/// Encode text to WinAnsi bytes, substituting `?` for uncovered characters.
fn encode_winansi(text: &str) -> Vec<u8> {
    let mut unmapped = 0usize;
    let bytes = text
        .chars()
        .map(|c| {
            winansi_byte(c).unwrap_or_else(|| {
                unmapped += 1;
                b'?'
            })
        })
        .collect();

    if unmapped > 0 {
        log::warn!("{unmapped} character(s) outside WinAnsi coverage were replaced with '?'");
    }

    bytes
}

#[derive(Default)]
struct PageBatch {
    ops: Vec<Operation>,
    fonts: BTreeSet<String>,
    gstates: BTreeSet<String>,
}

pub(crate) struct OutputDoc {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
    batches: BTreeMap<u32, PageBatch>,
    /// BaseFont name -> (resource name, font object).
    fonts: HashMap<String, (String, ObjectId)>,
    /// Alpha in per-mille -> (resource name, ExtGState object).
    gstates: HashMap<u16, (String, ObjectId)>,
}

impl OutputDoc {
    pub(crate) fn from_bytes(bytes: &[u8]) -> BackendResult<Self> {
        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();

        Ok(Self {
            doc,
            pages,
            batches: BTreeMap::new(),
            fonts: HashMap::new(),
            gstates: HashMap::new(),
        })
    }

    fn page_id(&self, page_number: u32) -> BackendResult<ObjectId> {
        self.pages.get(&page_number).copied().ok_or(BackendError::PageOutOfRange {
            page: page_number,
            page_count: self.pages.len() as u32,
        })
    }

    fn font_resource(&mut self, base_font: &str) -> BackendResult<String> {
        if !STANDARD_FONTS.contains(&base_font) {
            return Err(BackendError::UnsupportedFont(base_font.to_owned()));
        }

        if let Some((name, _)) = self.fonts.get(base_font) {
            return Ok(name.clone());
        }

        let name = format!("OvF{}", self.fonts.len() + 1);
        let mut font_dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
        };
        // Symbolic fonts carry their own built-in encodings.
        if base_font != "Symbol" && base_font != "ZapfDingbats" {
            font_dict.set("Encoding", "WinAnsiEncoding");
        }
        let font_id = self.doc.add_object(font_dict);
        self.fonts.insert(base_font.to_owned(), (name.clone(), font_id));

        Ok(name)
    }

    fn gstate_resource(&mut self, opacity: f32) -> String {
        let key = (opacity.clamp(0.0, 1.0) * 1000.0).round() as u16;

        if let Some((name, _)) = self.gstates.get(&key) {
            return name.clone();
        }

        let name = format!("OvG{}", self.gstates.len() + 1);
        let alpha = key as f32 / 1000.0;
        let gs_id = self.doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => alpha,
            "CA" => alpha,
        });
        self.gstates.insert(key, (name.clone(), gs_id));

        name
    }

    pub(crate) fn push_filled_rect(
        &mut self,
        page_number: u32,
        rect: PdfRect,
        color: [f32; 3],
    ) -> BackendResult<()> {
        self.page_id(page_number)?;

        let batch = self.batches.entry(page_number).or_default();
        batch.ops.push(Operation::new("q", vec![]));
        batch.ops.push(Operation::new(
            "rg",
            vec![color[0].into(), color[1].into(), color[2].into()],
        ));
        batch.ops.push(Operation::new(
            "re",
            vec![rect.x.into(), rect.y.into(), rect.width.into(), rect.height.into()],
        ));
        batch.ops.push(Operation::new("f", vec![]));
        batch.ops.push(Operation::new("Q", vec![]));

        Ok(())
    }

    pub(crate) fn push_text(
        &mut self,
        page_number: u32,
        origin: PdfPoint,
        text: &str,
        style: &TextDrawStyle,
    ) -> BackendResult<()> {
        self.page_id(page_number)?;

        let font_name = self.font_resource(&style.base_font)?;
        let gs_name = (style.opacity < 1.0).then(|| self.gstate_resource(style.opacity));
        let encoded = encode_winansi(text);

        // Element rotation is clockwise on screen; PDF space has y up.
        let theta = -style.rotation_deg.to_radians();
        let (sin, cos) = theta.sin_cos();

        let batch = self.batches.entry(page_number).or_default();
        batch.ops.push(Operation::new("q", vec![]));
        if let Some(gs_name) = &gs_name {
            batch.gstates.insert(gs_name.clone());
            batch.ops.push(Operation::new("gs", vec![gs_name.as_str().into()]));
        }
        batch.ops.push(Operation::new("BT", vec![]));
        batch.fonts.insert(font_name.clone());
        batch
            .ops
            .push(Operation::new("Tf", vec![font_name.as_str().into(), style.size_pt.into()]));
        if (style.horizontal_scaling - 1.0).abs() > 1e-3 {
            batch
                .ops
                .push(Operation::new("Tz", vec![(style.horizontal_scaling * 100.0).into()]));
        }
        batch.ops.push(Operation::new(
            "Tm",
            vec![
                cos.into(),
                sin.into(),
                (-sin).into(),
                cos.into(),
                origin.x.into(),
                origin.y.into(),
            ],
        ));
        batch.ops.push(Operation::new(
            "rg",
            vec![style.color[0].into(), style.color[1].into(), style.color[2].into()],
        ));
        batch.ops.push(Operation::new("Tj", vec![Object::String(encoded, lopdf::StringFormat::Literal)]));
        batch.ops.push(Operation::new("ET", vec![]));
        batch.ops.push(Operation::new("Q", vec![]));

        Ok(())
    }

    /// Resolve a dictionary-valued entry that may be inline or a reference.
    fn resolve_dict(doc: &Document, value: Option<&Object>) -> Dictionary {
        match value {
            Some(Object::Dictionary(dict)) => dict.clone(),
            Some(Object::Reference(id)) => doc.get_dictionary(*id).cloned().unwrap_or_default(),
            _ => Dictionary::new(),
        }
    }

    fn merged_resources(&self, page_id: ObjectId, batch: &PageBatch) -> Dictionary {
        let page_dict = self.doc.get_dictionary(page_id).cloned().unwrap_or_default();
        let mut resources = Self::resolve_dict(&self.doc, page_dict.get(b"Resources").ok());

        if !batch.fonts.is_empty() {
            let mut font_dict = Self::resolve_dict(&self.doc, resources.get(b"Font").ok());
            for (_, (name, id)) in self.fonts.iter() {
                if batch.fonts.contains(name) {
                    font_dict.set(name.as_bytes(), Object::Reference(*id));
                }
            }
            resources.set("Font", Object::Dictionary(font_dict));
        }

        if !batch.gstates.is_empty() {
            let mut gs_dict = Self::resolve_dict(&self.doc, resources.get(b"ExtGState").ok());
            for (_, (name, id)) in self.gstates.iter() {
                if batch.gstates.contains(name) {
                    gs_dict.set(name.as_bytes(), Object::Reference(*id));
                }
            }
            resources.set("ExtGState", Object::Dictionary(gs_dict));
        }

        resources
    }

    pub(crate) fn serialize(mut self) -> BackendResult<Vec<u8>> {
        let batches = std::mem::take(&mut self.batches);

        for (page_number, batch) in batches {
            if batch.ops.is_empty() {
                continue;
            }

            let page_id = self.page_id(page_number)?;
            let resources = self.merged_resources(page_id, &batch);
            let encoded = Content { operations: batch.ops }
                .encode()
                .map_err(|e| BackendError::Write(e.to_string()))?;
            let stream_id = self.doc.add_object(Stream::new(dictionary! {}, encoded));

            let page_dict = self
                .doc
                .get_object_mut(page_id)
                .and_then(|obj| obj.as_dict_mut())
                .map_err(|e| BackendError::Write(e.to_string()))?;

            let contents = match page_dict.get(b"Contents").ok().cloned() {
                Some(Object::Reference(existing)) => {
                    Object::Array(vec![Object::Reference(existing), Object::Reference(stream_id)])
                }
                Some(Object::Array(mut items)) => {
                    items.push(Object::Reference(stream_id));
                    Object::Array(items)
                }
                _ => Object::Reference(stream_id),
            };
            page_dict.set("Contents", contents);
            page_dict.set("Resources", Object::Dictionary(resources));
        }

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes).map_err(|e| BackendError::Write(e.to_string()))?;

        Ok(bytes)
    }
}
