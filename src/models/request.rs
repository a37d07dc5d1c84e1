use std::collections::{BTreeSet, HashMap};

/// The raw payload of the `file` multipart part together with its
/// client-supplied filename.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(filename: String, bytes: Vec<u8>) -> Self {
        Self { filename, bytes }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Declared-extension check. The filename decides; content is never
    /// inspected before validation passes.
    pub fn is_pdf(&self) -> bool {
        self.filename.to_ascii_lowercase().ends_with(".pdf")
    }
}

/// Conversion parameters resolved from the request's form fields.
///
/// Resolution is total: a malformed or missing field falls back to its
/// default instead of failing the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Upper bound on converted pages. `None` converts the whole document.
    pub max_pages: Option<u32>,
    /// Language hints for the OCR pass. Defaults to `{"en"}`.
    pub languages: BTreeSet<String>,
    pub force_ocr: bool,
    pub paginate_output: bool,
    pub extract_images: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            max_pages: None,
            languages: BTreeSet::from(["en".to_string()]),
            force_ocr: false,
            paginate_output: false,
            extract_images: true,
        }
    }
}

impl ConversionOptions {
    /// Resolve options from the non-file multipart fields.
    ///
    /// | field          | rule                                  | default |
    /// |----------------|---------------------------------------|---------|
    /// | max_pages      | integer ≥ 1, anything else ignored    | none    |
    /// | langs          | comma-separated language codes        | {"en"}  |
    /// | force_ocr      | case-insensitive "true"               | false   |
    /// | paginate       | case-insensitive "true"               | false   |
    /// | extract_images | case-insensitive "true"               | true    |
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let defaults = Self::default();

        let max_pages = fields
            .get("max_pages")
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|n| *n > 0);

        let languages = fields
            .get("langs")
            .map(|raw| parse_languages(raw))
            .filter(|langs| !langs.is_empty())
            .unwrap_or(defaults.languages);

        Self {
            max_pages,
            languages,
            force_ocr: parse_flag(fields, "force_ocr", defaults.force_ocr),
            paginate_output: parse_flag(fields, "paginate", defaults.paginate_output),
            extract_images: parse_flag(fields, "extract_images", defaults.extract_images),
        }
    }
}

fn parse_languages(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|code| code.trim().to_ascii_lowercase())
        .filter(|code| !code.is_empty())
        .collect()
}

fn parse_flag(fields: &HashMap<String, String>, key: &str, default: bool) -> bool {
    match fields.get(key) {
        Some(value) => value.trim().eq_ignore_ascii_case("true"),
        None => default,
    }
}
