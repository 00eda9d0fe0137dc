pub mod pipeline;
pub mod recognizer;
pub mod types;

pub use pipeline::{PassOutcome, PipelineError, ScanPipeline, Source};
pub use recognizer::{split_lines, MockRecognizer, OcrBackend, OcrError, TextPassthrough};
pub use types::{BatchReport, ImageReport};
