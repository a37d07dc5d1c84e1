pub mod convert;
pub mod encode;
pub mod engine;
pub mod ocr;
pub mod staging;

pub use engine::{ConversionEngine, ConversionMetadata, ConversionOutput, EngineError, PdfEngine};
pub use ocr::OcrService;
pub use staging::StagingScope;
