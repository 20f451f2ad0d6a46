//! Image preprocessing for OCR
//!
//! Turns a decoded color image into a black/white image that Tesseract reads reliably.

pub mod pipeline;
pub mod steps;

pub use pipeline::{PreprocessingResult, Preprocessor, StepTiming};
