use crate::context::RequestContext;
use crate::error::ExtractError;
use image::GrayImage;

/// Page segmentation mode 6: assume a single uniform block of text
pub const PAGE_SEG_MODE: u8 = 6;

/// OCR engine mode 3: default, based on what is available
pub const ENGINE_MODE: u8 = 3;

/// The one language profile recognition runs with
pub const LANGUAGE: &str = "eng";

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "tesseract", "leptess")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize the text of a binarized image, line breaks preserved
    ///
    /// Must return [`ExtractError::EngineUnavailable`] when the engine itself
    /// cannot be found or started, and [`ExtractError::EngineFailed`] for any
    /// other failure.
    fn recognize(&self, image: &GrayImage, ctx: &RequestContext) -> Result<String, ExtractError>;
}
