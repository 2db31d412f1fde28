//! PDF text and metadata extraction.

use crate::Result;
use lopdf::{Dictionary, Document, Object};
use serde::Serialize;
use tracing::debug;

/// Document information dictionary fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PdfMetadata {
    /// `/Title`
    pub title: String,
    /// `/Author`
    pub author: String,
    /// `/Subject`
    pub subject: String,
    /// `/Creator`
    pub creator: String,
    /// Page count of the whole document.
    pub total_pages: usize,
}

/// Extracted document content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfContent {
    /// Document metadata.
    pub metadata: PdfMetadata,
    /// Text of the leading pages, in page order.
    pub pages: Vec<String>,
}

/// Parses PDF bytes. Parsing is CPU-bound and synchronous.
pub trait PdfReader: Send + Sync {
    /// Read metadata and the text of at most `max_pages` leading pages.
    fn read(&self, bytes: &[u8], max_pages: usize) -> Result<PdfContent>;
}

/// [`PdfReader`] backed by `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfReader;

impl PdfReader for LopdfReader {
    fn read(&self, bytes: &[u8], max_pages: usize) -> Result<PdfContent> {
        let doc = Document::load_mem(bytes)?;
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

        let info = info_dictionary(&doc);
        let field = |key: &[u8]| info.map(|d| text_field(&doc, d, key)).unwrap_or_default();
        let metadata = PdfMetadata {
            title: field(b"Title"),
            author: field(b"Author"),
            subject: field(b"Subject"),
            creator: field(b"Creator"),
            total_pages: page_numbers.len(),
        };

        let pages = page_numbers
            .iter()
            .take(max_pages)
            .map(|&number| {
                // A page whose content cannot be decoded yields empty text.
                doc.extract_text(&[number]).unwrap_or_else(|e| {
                    debug!(page = number, "text extraction failed: {e}");
                    String::new()
                })
            })
            .collect();

        Ok(PdfContent { metadata, pages })
    }
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    let info = doc.trailer.get(b"Info").ok()?;
    let (_, object) = doc.dereference(info).ok()?;
    object.as_dict().ok()
}

fn text_field(doc: &Document, dict: &Dictionary, key: &[u8]) -> String {
    dict.get(key)
        .ok()
        .and_then(|obj| doc.dereference(obj).ok())
        .and_then(|(_, obj)| match obj {
            Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
            _ => None,
        })
        .unwrap_or_default()
}

/// Decode a PDF text string: UTF-16BE when it carries a byte-order mark,
/// otherwise one byte per character.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}
