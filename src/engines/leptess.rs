//! Leptess/Tesseract engine implementation
//!
//! Statically linked Tesseract via the tesseract-static crate, for hosts where
//! the tesseract executable cannot be installed.
//! Downloads tessdata (training data) automatically on first use.

use crate::config::EngineConfig;
use crate::context::RequestContext;
use crate::engine::{OcrEngine, LANGUAGE, PAGE_SEG_MODE};
use crate::error::ExtractError;
use image::GrayImage;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tesseract_static::tesseract::Tesseract;

/// Tesseract OCR Engine
pub struct LeptessEngine {
    /// Path to tessdata directory
    tessdata_path: String,
}

impl LeptessEngine {
    /// Create a new Tesseract-based OCR engine
    pub fn new(config: &EngineConfig) -> Result<Self, ExtractError> {
        let tessdata_path = match &config.tessdata_path {
            Some(path) => path.clone(),
            None => ensure_tessdata_available(LANGUAGE)?,
        };

        // Validate that tessdata is accessible by doing a test initialization
        let test_tess = Tesseract::new(Some(&tessdata_path), Some(LANGUAGE)).map_err(|e| {
            ExtractError::EngineUnavailable(format!("Failed to initialize Tesseract: {}", e))
        })?;
        drop(test_tess);

        tracing::info!("Leptess engine initialized (tessdata: {})", tessdata_path);

        Ok(Self { tessdata_path })
    }
}

impl OcrEngine for LeptessEngine {
    fn name(&self) -> &'static str {
        "leptess"
    }

    fn description(&self) -> &'static str {
        "Statically linked Tesseract OCR engine"
    }

    fn recognize(&self, image: &GrayImage, ctx: &RequestContext) -> Result<String, ExtractError> {
        let (width, height) = image.dimensions();

        // BMP is always supported by leptonica
        let mut bmp_data = Vec::new();
        image
            .write_to(
                &mut std::io::Cursor::new(&mut bmp_data),
                image::ImageFormat::Bmp,
            )
            .map_err(|e| ExtractError::Internal(format!("Failed to convert to BMP: {}", e)))?;

        tracing::info!(
            request_id = %ctx.request_id,
            "Starting Tesseract OCR ({}x{}, BMP size: {} bytes)",
            width,
            height,
            bmp_data.len()
        );

        let tess = Tesseract::new(Some(&self.tessdata_path), Some(LANGUAGE)).map_err(|e| {
            ExtractError::EngineUnavailable(format!("Failed to create Tesseract: {}", e))
        })?;

        let mut tess = tess
            .set_variable("tessedit_pageseg_mode", &PAGE_SEG_MODE.to_string())
            .map_err(|e| ExtractError::EngineFailed(format!("Failed to set PSM: {}", e)))?
            .set_image_from_mem(&bmp_data)
            .map_err(|e| {
                ExtractError::EngineFailed(format!(
                    "Failed to set image ({}x{}, {} bytes): {}",
                    width,
                    height,
                    bmp_data.len(),
                    e
                ))
            })?
            .recognize()
            .map_err(|e| ExtractError::EngineFailed(format!("Failed to recognize text: {}", e)))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractError::EngineFailed(format!("Failed to get text: {}", e)))?;

        tracing::info!(request_id = %ctx.request_id, "Tesseract OCR completed");

        Ok(text.trim().to_string())
    }
}

// ============================================================================
// Tessdata download helpers
// ============================================================================

/// Ensure tessdata is available, downloading if needed
fn ensure_tessdata_available(language: &str) -> Result<String, ExtractError> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("label-ocr")
        .join("tessdata");

    std::fs::create_dir_all(&cache_dir).map_err(|e| {
        ExtractError::EngineUnavailable(format!("Failed to create tessdata directory: {}", e))
    })?;

    let traineddata_path = cache_dir.join(format!("{}.traineddata", language));

    if !traineddata_path.exists() {
        let url = tessdata_url(language);
        tracing::info!(
            "Downloading tessdata for '{}' (this may take a moment)...",
            language
        );
        download_file(&url, &traineddata_path)?;
        tracing::info!("Downloaded tessdata to {:?}", traineddata_path);
    } else {
        tracing::info!("Using cached tessdata from {:?}", cache_dir);
    }

    // Tesseract expects the directory, not the file
    cache_dir
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| ExtractError::EngineUnavailable("Invalid tessdata path".to_string()))
}

fn tessdata_url(language: &str) -> String {
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}

fn download_file(url: &str, path: &Path) -> Result<(), ExtractError> {
    let response = ureq::get(url).call().map_err(|e| {
        ExtractError::EngineUnavailable(format!("Failed to download tessdata: {}", e))
    })?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        ExtractError::EngineUnavailable(format!("Failed to read tessdata response: {}", e))
    })?;

    let mut file = File::create(path).map_err(|e| {
        ExtractError::EngineUnavailable(format!("Failed to create tessdata file: {}", e))
    })?;

    file.write_all(&buffer).map_err(|e| {
        ExtractError::EngineUnavailable(format!("Failed to write tessdata file: {}", e))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tessdata_url_uses_fast_models() {
        assert_eq!(
            tessdata_url("eng"),
            "https://github.com/tesseract-ocr/tessdata_fast/raw/main/eng.traineddata"
        );
    }
}
