//! Format extractors: raw document bytes to plain text.
//!
//! Each supported [`ContentType`] has one [`FormatExtractor`] with a single
//! capability, `extract_text`. Extraction yields *logical units* of text:
//! most formats produce one unit for the whole document, tabular data
//! produces one unit per row. Each unit is chunked and embedded on its own.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, warn};

use crate::document::{ContentType, Document};
use crate::error::{DocqaError, Result};

/// Converts one document format into logical units of plain text.
pub trait FormatExtractor: Send + Sync {
    /// Extract the text content of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`DocqaError::Extraction`] when the bytes cannot be parsed as
    /// the format this extractor handles. The caller records the document as
    /// skipped and continues with the rest of the batch.
    fn extract_text(&self, bytes: &[u8]) -> Result<Vec<String>>;
}

/// Extract a document's text using the extractor for its declared type.
///
/// # Errors
///
/// Returns [`DocqaError::UnsupportedFormat`] when no extractor handles the
/// declared MIME type, or the extractor's own [`DocqaError::Extraction`].
pub fn extract(document: &Document) -> Result<Vec<String>> {
    let Some(content_type) = document.content_type() else {
        return Err(DocqaError::UnsupportedFormat { mime_type: document.mime_type.clone() });
    };
    let extractor: &dyn FormatExtractor = match content_type {
        ContentType::PlainText => &PlainTextExtractor,
        ContentType::Pdf => &PdfExtractor,
        ContentType::Csv => &CsvExtractor,
        ContentType::SlideDeck => &SlideDeckExtractor,
    };
    extractor.extract_text(&document.bytes)
}

/// Decodes the byte stream as UTF-8.
pub struct PlainTextExtractor;

impl FormatExtractor for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let text = String::from_utf8(bytes.to_vec()).map_err(|e| DocqaError::Extraction {
            format: "text",
            message: e.to_string(),
        })?;
        Ok(vec![text])
    }
}

/// Concatenates page-level text across all pages of a PDF.
///
/// Pages are extracted one at a time; when a page resists the per-page path,
/// or the document yields no text at all, the whole document is re-extracted
/// through an alternate layout-aware path.
pub struct PdfExtractor;

impl FormatExtractor for PdfExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| DocqaError::Extraction {
            format: "pdf",
            message: e.to_string(),
        })?;

        let mut text = String::new();
        let mut failed_pages = 0usize;
        for (page_number, _) in doc.get_pages() {
            match doc.extract_text(&[page_number]) {
                Ok(page_text) => text.push_str(&page_text),
                Err(e) => {
                    failed_pages += 1;
                    warn!(page = page_number, error = %e, "page text extraction failed");
                }
            }
        }

        if failed_pages > 0 || text.trim().is_empty() {
            match pdf_extract::extract_text_from_mem(bytes) {
                Ok(whole) if !whole.trim().is_empty() => {
                    debug!(failed_pages, "using alternate whole-document pdf extraction");
                    text = whole;
                }
                Ok(_) => {}
                Err(e) if text.trim().is_empty() => {
                    return Err(DocqaError::Extraction { format: "pdf", message: e.to_string() });
                }
                Err(e) => debug!(error = %e, "alternate pdf extraction failed, keeping per-page text"),
            }
        }

        Ok(vec![text])
    }
}

/// Joins each row's column values as whitespace-separated text.
///
/// The first row is treated as a header and not emitted. Every remaining
/// row becomes one logical unit, so rows are embedded independently.
pub struct CsvExtractor;

impl FormatExtractor for CsvExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| DocqaError::Extraction {
                format: "csv",
                message: e.to_string(),
            })?;
            let row = record.iter().collect::<Vec<_>>().join(" ");
            if !row.trim().is_empty() {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

/// Concatenates the text runs of every shape across every slide of a PPTX.
///
/// A PPTX archive stores each slide as `ppt/slides/slideN.xml`; shape text
/// lives in `<a:t>` elements. Slides are read in presentation order.
pub struct SlideDeckExtractor;

impl FormatExtractor for SlideDeckExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let map_err = |e: &dyn std::fmt::Display| DocqaError::Extraction {
            format: "slide-deck",
            message: e.to_string(),
        };

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| map_err(&e))?;

        let mut slide_names: Vec<String> = archive
            .file_names()
            .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
            .map(str::to_string)
            .collect();
        slide_names.sort_by_key(|name| slide_number(name));

        let mut text = String::new();
        for name in slide_names {
            let mut xml = String::new();
            archive
                .by_name(&name)
                .map_err(|e| map_err(&e))?
                .read_to_string(&mut xml)
                .map_err(|e| map_err(&e))?;
            text.push_str(&slide_text(&xml)?);
        }
        Ok(vec![text])
    }
}

/// Numeric component of a slide entry name, for presentation ordering.
fn slide_number(name: &str) -> u32 {
    name.chars().filter(|c| c.is_ascii_digit()).collect::<String>().parse().unwrap_or(0)
}

/// Collect the content of every `<a:t>` text run in one slide's XML.
fn slide_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text_run = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"a:t" => in_text_run = true,
            Ok(Event::End(e)) if e.name().as_ref() == b"a:t" => in_text_run = false,
            Ok(Event::Text(t)) if in_text_run => {
                let run = t.unescape().map_err(|e| DocqaError::Extraction {
                    format: "slide-deck",
                    message: e.to_string(),
                })?;
                out.push_str(&run);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DocqaError::Extraction {
                    format: "slide-deck",
                    message: e.to_string(),
                });
            }
            _ => {}
        }
    }
    Ok(out)
}
