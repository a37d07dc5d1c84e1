use std::collections::HashMap;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::ConversionOptions;
use crate::services::ocr::OcrService;

/// Failures raised by an engine implementation. They never cross the
/// invocation adapter: the adapter flattens them into the request-level
/// conversion error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("document could not be parsed: {0}")]
    Parse(#[from] lopdf::Error),

    #[error("text extraction failed: {0}")]
    Extraction(String),
}

#[derive(Debug, Clone)]
pub struct ConversionMetadata {
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub ocr_used: bool,
}

/// What one successful conversion produces: Markdown text, named binary
/// image assets, and document metadata.
#[derive(Debug)]
pub struct ConversionOutput {
    pub markdown: String,
    pub images: HashMap<String, Vec<u8>>,
    pub metadata: ConversionMetadata,
}

/// The conversion engine boundary. Implementations must be safe to call
/// from concurrent requests; the handle itself is shared read-only.
pub trait ConversionEngine: Send + Sync {
    fn convert(
        &self,
        document: &Path,
        options: &ConversionOptions,
    ) -> Result<ConversionOutput, EngineError>;

    fn is_available(&self) -> bool {
        true
    }
}

/// The built-in engine: `lopdf` for document structure and embedded images,
/// `pdf-extract` for text, with a Tesseract OCR pass for scanned documents.
pub struct PdfEngine {
    ocr: OcrService,
}

impl PdfEngine {
    /// Load the engine once at process start. Capabilities discovered here
    /// (the OCR probe) are fixed for the lifetime of the process.
    pub fn load() -> anyhow::Result<Self> {
        let ocr = OcrService::probe();
        info!(
            ocr_available = ocr.is_available(),
            "conversion engine loaded"
        );
        Ok(Self { ocr })
    }
}

impl ConversionEngine for PdfEngine {
    fn convert(
        &self,
        document: &Path,
        options: &ConversionOptions,
    ) -> Result<ConversionOutput, EngineError> {
        let bytes = std::fs::read(document)?;
        let mut doc = Document::load_mem(&bytes)?;

        let total_pages = doc.get_pages().len();
        let page_count = match options.max_pages {
            Some(limit) => total_pages.min(limit as usize),
            None => total_pages,
        };

        // Apply the page limit by pruning trailing pages before extraction,
        // so text, images, and the reported count all agree.
        let bytes = if page_count < total_pages {
            let dropped: Vec<u32> = (page_count as u32 + 1..=total_pages as u32).collect();
            doc.delete_pages(&dropped);
            let mut pruned = Vec::new();
            doc.save_to(&mut pruned)
                .map_err(|err| EngineError::Extraction(err.to_string()))?;
            debug!(
                total_pages,
                page_count, "pruned document to the requested page limit"
            );
            pruned
        } else {
            bytes
        };

        let text = if options.paginate_output {
            let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
                .map_err(|err| EngineError::Extraction(err.to_string()))?;
            pages
                .iter()
                .map(|page| page.trim())
                .collect::<Vec<_>>()
                .join("\n\n---\n\n")
        } else {
            pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|err| EngineError::Extraction(err.to_string()))?
                .trim()
                .to_string()
        };

        let wants_ocr =
            options.force_ocr || (text.is_empty() && OcrService::looks_scanned(&bytes));
        let run_ocr = wants_ocr && self.ocr.is_available();

        let embedded = if options.extract_images || run_ocr {
            extract_embedded_images(&doc)
        } else {
            HashMap::new()
        };

        let (markdown, ocr_used) = if run_ocr {
            let workdir = document.parent().unwrap_or_else(|| Path::new("."));
            match self.ocr.recognize(&embedded, &options.languages, workdir) {
                Ok(recognized) if !recognized.trim().is_empty() => {
                    (recognized.trim().to_string(), true)
                }
                Ok(_) => (text, false),
                Err(err) => {
                    warn!(error = %err, "OCR pass failed, keeping extracted text");
                    (text, false)
                }
            }
        } else {
            (text, false)
        };

        let images = if options.extract_images {
            embedded
        } else {
            HashMap::new()
        };

        let metadata = ConversionMetadata {
            page_count,
            title: info_string(&doc, b"Title"),
            author: info_string(&doc, b"Author"),
            ocr_used,
        };

        debug!(
            page_count = metadata.page_count,
            images = images.len(),
            markdown_len = markdown.len(),
            ocr_used,
            "document converted"
        );

        Ok(ConversionOutput {
            markdown,
            images,
            metadata,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Collect the embedded image XObjects of every page, keyed
/// `page_<n>_<name>`. Only DCT-encoded (JPEG) streams are returned since
/// those are directly decodable; other filters are skipped.
fn extract_embedded_images(doc: &Document) -> HashMap<String, Vec<u8>> {
    let mut images = HashMap::new();
    for (page_no, page_id) in doc.get_pages() {
        for (name, object_id) in page_xobjects(doc, page_id) {
            let Ok(object) = doc.get_object(object_id) else {
                continue;
            };
            let Object::Stream(ref stream) = *object else {
                continue;
            };
            let is_image = stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .map(|subtype| subtype == b"Image")
                .unwrap_or(false);
            if !is_image || !has_dct_filter(&stream.dict) {
                continue;
            }
            images.insert(format!("page_{}_{}", page_no, name), stream.content.clone());
        }
    }
    images
}

/// Resolve the XObject entries reachable from a page's resources.
fn page_xobjects(doc: &Document, page_id: ObjectId) -> Vec<(String, ObjectId)> {
    let (direct, referenced) = doc.get_page_resources(page_id);

    let mut resource_dicts: Vec<&Dictionary> = Vec::new();
    if let Some(dict) = direct {
        resource_dicts.push(dict);
    }
    for id in referenced {
        if let Ok(dict) = doc.get_object(id).and_then(Object::as_dict) {
            resource_dicts.push(dict);
        }
    }

    let mut found = Vec::new();
    for resources in resource_dicts {
        let Ok(xobjects) = resources
            .get(b"XObject")
            .and_then(|entry| resolve(doc, entry))
            .and_then(Object::as_dict)
        else {
            continue;
        };
        for (name, entry) in xobjects.iter() {
            if let Ok(id) = entry.as_reference() {
                found.push((String::from_utf8_lossy(name).into_owned(), id));
            }
        }
    }
    found
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> lopdf::Result<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id),
        other => Ok(other),
    }
}

fn has_dct_filter(dict: &Dictionary) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == b"DCTDecode",
        Ok(Object::Array(filters)) => filters
            .iter()
            .any(|f| f.as_name().map(|n| n == b"DCTDecode").unwrap_or(false)),
        _ => false,
    }
}

/// Read a text entry from the document's Info dictionary, handling the
/// UTF-16BE encoding PDF producers commonly use.
fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info = doc.trailer.get(b"Info").ok()?;
    let dict = resolve(doc, info).ok()?.as_dict().ok()?;
    let raw = dict.get(key).ok()?.as_str().ok()?;

    let text = if raw.starts_with(&[0xFE, 0xFF]) {
        decode_utf16_be(&raw[2..])
    } else {
        String::from_utf8_lossy(raw).into_owned()
    };

    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn decode_utf16_be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    char::decode_utf16(units)
        .filter_map(Result::ok)
        .filter(|c| *c != '\0')
        .collect()
}
