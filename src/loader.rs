//! Document loading and text extraction.
//!
//! Dispatches on file extension and returns loader segments ready for the
//! chunker. Plain-text formats yield a single segment; PDFs yield one
//! segment per page (with a `page` metadata entry) when page breaks are
//! present in the extracted text; DOCX files are unpacked and their `w:t`
//! text runs collected paragraph by paragraph.
//!
//! Unsupported extensions fail fast with [`RagError::UnsupportedFormat`]
//! before any chunk is produced.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde_json::json;
use tracing::debug;

use crate::document::{DocumentSegment, Metadata};
use crate::error::{RagError, Result};

/// Upper bound on the decompressed size of a DOCX XML part.
const MAX_DOCX_XML_BYTES: u64 = 50 * 1024 * 1024;

/// Load a document file and extract its text as ordered segments.
///
/// Supported extensions: `txt`, `md`, `pdf`, `docx` (case-insensitive).
///
/// # Errors
///
/// - [`RagError::UnsupportedFormat`] for any other extension.
/// - [`RagError::Load`] when the file cannot be read or its text cannot be
///   extracted.
pub fn load_document(path: &Path) -> Result<Vec<DocumentSegment>> {
    let extension =
        path.extension().and_then(|ext| ext.to_str()).map(str::to_lowercase).unwrap_or_default();

    let segments = match extension.as_str() {
        "txt" | "md" => load_text(path)?,
        "pdf" => load_pdf(path)?,
        "docx" => load_docx(path)?,
        _ => return Err(RagError::UnsupportedFormat(extension)),
    };

    debug!(path = %path.display(), segment_count = segments.len(), "loaded document");
    Ok(segments)
}

fn load_err(path: &Path, message: impl ToString) -> RagError {
    RagError::Load { path: path.display().to_string(), message: message.to_string() }
}

fn load_text(path: &Path) -> Result<Vec<DocumentSegment>> {
    let text = fs::read_to_string(path).map_err(|e| load_err(path, e))?;
    Ok(vec![DocumentSegment::new(text)])
}

/// PDF extraction emits form feeds between pages; split on them so each
/// page becomes its own segment with 1-based `page` provenance. A PDF whose
/// extracted text carries no page breaks stays a single segment without a
/// `page` entry.
fn load_pdf(path: &Path) -> Result<Vec<DocumentSegment>> {
    let bytes = fs::read(path).map_err(|e| load_err(path, e))?;
    let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| load_err(path, e))?;

    let pages: Vec<&str> = text.split('\u{c}').collect();
    if pages.len() == 1 {
        return Ok(vec![DocumentSegment::new(text)]);
    }

    Ok(pages
        .into_iter()
        .enumerate()
        .filter(|(_, page_text)| !page_text.trim().is_empty())
        .map(|(i, page_text)| {
            let mut metadata = Metadata::new();
            metadata.insert("page".to_string(), json!(i as i64 + 1));
            DocumentSegment { text: page_text.to_string(), metadata }
        })
        .collect())
}

/// DOCX is a ZIP archive; the document body lives in `word/document.xml`.
/// Text is carried by `w:t` elements, one or more per `w:p` paragraph.
fn load_docx(path: &Path) -> Result<Vec<DocumentSegment>> {
    let bytes = fs::read(path).map_err(|e| load_err(path, e))?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.as_slice()))
        .map_err(|e| load_err(path, e))?;

    let mut document_xml = Vec::new();
    {
        let entry = archive.by_name("word/document.xml").map_err(|e| load_err(path, e))?;
        entry
            .take(MAX_DOCX_XML_BYTES)
            .read_to_end(&mut document_xml)
            .map_err(|e| load_err(path, e))?;
    }
    if document_xml.len() as u64 >= MAX_DOCX_XML_BYTES {
        return Err(load_err(path, "word/document.xml exceeds size limit"));
    }

    let text = docx_body_text(&document_xml).map_err(|message| load_err(path, message))?;
    Ok(vec![DocumentSegment::new(text)])
}

fn docx_body_text(xml: &[u8]) -> std::result::Result<String, String> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text_run = true,
            Ok(Event::Text(t)) if in_text_run => {
                out.push_str(t.unescape().map_err(|e| e.to_string())?.as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                // Paragraph boundaries become newlines so the chunker can
                // split on sentence and paragraph structure.
                b"p" if !out.is_empty() && !out.ends_with('\n') => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}
