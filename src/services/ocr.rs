use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Tesseract OCR is not installed on this system")]
    Unavailable,

    #[error("document has no embedded page images to recognize")]
    NoImages,

    #[error("failed to write OCR input: {0}")]
    Io(#[from] std::io::Error),

    #[error("tesseract failed: {0}")]
    Failed(String),
}

/// OCR pass over a document's embedded page images, backed by the system
/// `tesseract` binary. Availability is probed once at engine load.
pub struct OcrService {
    tesseract_available: bool,
}

impl OcrService {
    pub fn probe() -> Self {
        let tesseract_available = Self::tesseract_available();
        if !tesseract_available {
            info!("tesseract not found on PATH, OCR pass disabled");
        }
        Self {
            tesseract_available,
        }
    }

    pub fn is_available(&self) -> bool {
        self.tesseract_available
    }

    /// Recognize text across the given page images. Images are materialized
    /// under `workdir` (the request's staging scope, so they are removed with
    /// it) and fed to tesseract one by one in name order.
    pub fn recognize(
        &self,
        images: &HashMap<String, Vec<u8>>,
        languages: &BTreeSet<String>,
        workdir: &Path,
    ) -> Result<String, OcrError> {
        if !self.tesseract_available {
            return Err(OcrError::Unavailable);
        }
        if images.is_empty() {
            return Err(OcrError::NoImages);
        }

        let langs = Self::tesseract_languages(languages);
        debug!(images = images.len(), langs = %langs, "starting OCR pass");

        let ordered: BTreeMap<_, _> = images.iter().collect();
        let mut pages = Vec::new();
        let mut last_error = None;
        for (name, bytes) in ordered {
            let input = workdir.join(format!("ocr_{}", name));
            fs::write(&input, bytes)?;
            match self.run_tesseract(&input, &langs) {
                Ok(text) => {
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        pages.push(text);
                    }
                }
                Err(err) => {
                    warn!(image = %name, error = %err, "tesseract failed on page image");
                    last_error = Some(err);
                }
            }
        }

        if pages.is_empty() {
            return Err(last_error.unwrap_or(OcrError::NoImages));
        }
        Ok(pages.join("\n\n"))
    }

    fn run_tesseract(&self, image: &Path, langs: &str) -> Result<String, OcrError> {
        let output = Command::new("tesseract")
            .arg(image)
            .arg("stdout")
            .args(["-l", langs])
            .output()?;
        if !output.status.success() {
            return Err(OcrError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Map request language codes to tesseract's ISO 639-3 model names.
    /// Unknown codes are passed through unchanged.
    fn tesseract_languages(languages: &BTreeSet<String>) -> String {
        languages
            .iter()
            .map(|code| match code.as_str() {
                "en" => "eng",
                "de" => "deu",
                "fr" => "fra",
                "es" => "spa",
                "it" => "ita",
                "pt" => "por",
                "nl" => "nld",
                "ru" => "rus",
                "zh" => "chi_sim",
                "ja" => "jpn",
                other => other,
            })
            .collect::<Vec<_>>()
            .join("+")
    }

    pub fn tesseract_available() -> bool {
        Command::new("tesseract")
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Heuristic for scanned documents: image-compression markers dominate
    /// text markers. Used to gate the OCR pass when direct extraction finds
    /// no text.
    pub fn looks_scanned(pdf_bytes: &[u8]) -> bool {
        let haystack = String::from_utf8_lossy(pdf_bytes);

        let image_markers = ["/Image", "/DCTDecode", "/CCITTFaxDecode", "/JBIG2Decode"];
        let image_count: usize = image_markers
            .iter()
            .map(|marker| haystack.matches(marker).count())
            .sum();

        let text_markers = ["/Font", "BT", "ET"];
        let text_count: usize = text_markers
            .iter()
            .map(|marker| haystack.matches(marker).count())
            .sum();

        image_count > 0 && (text_count == 0 || image_count > text_count * 2)
    }
}
