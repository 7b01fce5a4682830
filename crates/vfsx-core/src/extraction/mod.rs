//! Extraction of matched archive entries into a target root.

pub mod engine;
pub mod stream;

pub use engine::Extraction;
pub use engine::ExtractionEngine;
