//! Narrow view of a PDF file: pages, fonts, content operations and page boxes.
//!
//! The text extractor in [`super::pdf`] only talks to [`PdfBackend`], so it can
//! be driven by a scripted backend in tests.

use std::collections::BTreeMap;

use lopdf::content::Content;

use crate::OutlineError;

/// `lopdf::ObjectId` without the lopdf type: (object number, generation).
pub type PageId = (u32, u16);

/// A font entry from a page's resource dictionary.
#[derive(Debug, Clone)]
pub struct FontResource {
    /// Resource key used by `Tf`, e.g. `b"F1"`.
    pub key: Vec<u8>,
    pub base_font: Option<String>,
}

/// Operand of a content-stream operation, detached from lopdf.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<Operand>),
    Other,
}

impl Operand {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Operand::Integer(i) => Some(*i as f32),
            Operand::Real(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<&lopdf::Object> for Operand {
    fn from(obj: &lopdf::Object) -> Self {
        match obj {
            lopdf::Object::Null => Operand::Null,
            lopdf::Object::Boolean(b) => Operand::Bool(*b),
            lopdf::Object::Integer(i) => Operand::Integer(*i),
            lopdf::Object::Real(f) => Operand::Real(*f),
            lopdf::Object::Name(n) => Operand::Name(n.clone()),
            lopdf::Object::String(s, _) => Operand::Str(s.clone()),
            lopdf::Object::Array(items) => {
                Operand::Array(items.iter().map(Operand::from).collect())
            }
            _ => Operand::Other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub operator: String,
    pub operands: Vec<Operand>,
}

/// Page MediaBox in PDF user space (origin bottom-left, y up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl PageBox {
    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }
}

impl Default for PageBox {
    fn default() -> Self {
        Self {
            llx: 0.0,
            lly: 0.0,
            urx: 612.0,
            ury: 792.0,
        }
    }
}

/// Decode PDF string bytes without font information.
///
/// UTF-16BE with a byte-order mark first, then UTF-8, then Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = payload
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

pub trait PdfBackend {
    /// 1-based page number to page object.
    fn pages(&self) -> BTreeMap<u32, PageId>;

    fn page_fonts(&self, page: PageId) -> Result<Vec<FontResource>, OutlineError>;

    fn page_box(&self, page: PageId) -> Result<PageBox, OutlineError>;

    /// Decoded content-stream operations of a page.
    fn page_operations(&self, page: PageId) -> Result<Vec<Operation>, OutlineError>;

    /// Decode the bytes of a text-showing operand drawn with `font_key`.
    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String;
}

pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    pub fn load_bytes(data: &[u8]) -> Result<Self, OutlineError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| OutlineError::Parse(e.to_string()))?;
        if doc.is_encrypted() {
            return Err(OutlineError::Encrypted);
        }
        Ok(Self { doc })
    }

    /// MediaBox of a page dictionary, inherited from the page tree when the
    /// page itself has none.
    fn media_box(&self, dict: &lopdf::Dictionary) -> Option<Vec<f32>> {
        if let Ok(obj) = dict.get(b"MediaBox") {
            let resolved = match obj {
                lopdf::Object::Reference(id) => self.doc.get_object(*id).ok()?,
                other => other,
            };
            if let Ok(items) = resolved.as_array() {
                return items.iter().map(|o| self.number(o)).collect();
            }
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        let parent = self.doc.get_object(parent).ok()?.as_dict().ok()?;
        self.media_box(parent)
    }

    fn number(&self, obj: &lopdf::Object) -> Option<f32> {
        match obj {
            lopdf::Object::Integer(i) => Some(*i as f32),
            lopdf::Object::Real(f) => Some(*f),
            lopdf::Object::Reference(id) => self.number(self.doc.get_object(*id).ok()?),
            _ => None,
        }
    }

    fn font_encoding(&self, page: PageId, font_key: &[u8]) -> Option<String> {
        let fonts = self.doc.get_page_fonts(page).ok()?;
        match fonts.get(font_key)?.get(b"Encoding").ok()? {
            lopdf::Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        }
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<FontResource>, OutlineError> {
        let fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| OutlineError::Parse(format!("cannot get page fonts: {e}")))?;

        let name_of = |dict: &lopdf::Dictionary, key: &[u8]| {
            dict.get(key)
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).into_owned())
        };

        Ok(fonts
            .iter()
            .map(|(key, dict)| FontResource {
                key: key.clone(),
                base_font: name_of(*dict, b"BaseFont"),
            })
            .collect())
    }

    fn page_box(&self, page: PageId) -> Result<PageBox, OutlineError> {
        let dict = self
            .doc
            .get_object(page)
            .and_then(|o| o.as_dict())
            .map_err(|e| OutlineError::Parse(format!("cannot read page dictionary: {e}")))?;
        match self.media_box(dict).as_deref() {
            Some([llx, lly, urx, ury, ..]) => Ok(PageBox {
                llx: *llx,
                lly: *lly,
                urx: *urx,
                ury: *ury,
            }),
            _ => Err(OutlineError::Parse("page has no usable MediaBox".into())),
        }
    }

    fn page_operations(&self, page: PageId) -> Result<Vec<Operation>, OutlineError> {
        let data = self
            .doc
            .get_page_content(page)
            .map_err(|e| OutlineError::Parse(format!("cannot get page content: {e}")))?;
        let content = Content::decode(&data)
            .map_err(|e| OutlineError::Parse(format!("content stream decode error: {e}")))?;
        Ok(content
            .operations
            .into_iter()
            .map(|op| Operation {
                operands: op.operands.iter().map(Operand::from).collect(),
                operator: op.operator,
            })
            .collect())
    }

    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String {
        // Identity-encoded composite fonts mostly carry 2-byte Unicode codes.
        let identity = self
            .font_encoding(page, font_key)
            .is_some_and(|enc| enc.contains("Identity"));
        if identity && !bytes.is_empty() && bytes.len() % 2 == 0 {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            let decoded = String::from_utf16_lossy(&units);
            if decoded.chars().any(|c| c != '\u{FFFD}' && c != '\0') {
                return decoded;
            }
        }
        decode_text_simple(bytes)
    }
}
