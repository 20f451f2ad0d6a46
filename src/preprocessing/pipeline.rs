use crate::context::RequestContext;
use crate::error::ExtractError;
use image::{GrayImage, RgbImage};
use serde::Serialize;
use std::time::Instant;

use super::steps;

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Binarized image (not serialized)
    #[serde(skip)]
    pub image: GrayImage,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Fixed binarization recipe: grayscale, 5x5 Gaussian blur, Otsu threshold
#[derive(Debug, Default, Clone, Copy)]
pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Binarize a decoded image
    pub fn process(
        &self,
        image: RgbImage,
        ctx: &RequestContext,
    ) -> Result<PreprocessingResult, ExtractError> {
        if image.width() == 0 || image.height() == 0 {
            tracing::error!(request_id = %ctx.request_id, "Preprocessing failed: empty image");
            return Err(ExtractError::PreprocessingFailed(
                "image has no pixels".to_string(),
            ));
        }

        tracing::info!(request_id = %ctx.request_id, "Starting image preprocessing pipeline");
        let start = Instant::now();
        let mut steps_timing = Vec::new();

        let gray = self.run_step("grayscale", image, &mut steps_timing, steps::grayscale::apply)?;
        let blurred = self.run_step("blur", gray, &mut steps_timing, steps::blur::apply)?;
        let binarized =
            self.run_step("threshold", blurred, &mut steps_timing, steps::threshold::apply)?;

        let total_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            request_id = %ctx.request_id,
            "Preprocessing complete in {}ms",
            total_time_ms
        );

        Ok(PreprocessingResult {
            image: binarized,
            total_time_ms,
            steps: steps_timing,
        })
    }

    fn run_step<I, O, F>(
        &self,
        name: &str,
        img: I,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<O, ExtractError>
    where
        F: FnOnce(I) -> Result<O, ExtractError>,
    {
        let step_start = Instant::now();
        let result = step_fn(img)?;
        let time_ms = step_start.elapsed().as_millis() as u64;
        tracing::debug!("Applied {} in {}ms", name, time_ms);
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms,
        });
        Ok(result)
    }
}
