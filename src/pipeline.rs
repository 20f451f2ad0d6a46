//! End-to-end extraction: load, binarize, recognize, select the target line
//!
//! The pipeline knows nothing about how it was invoked. Front ends build a
//! [`RequestContext`], hand over the raw bytes and render whatever comes back.

use crate::context::RequestContext;
use crate::engine::OcrEngine;
use crate::error::ExtractError;
use crate::extraction::{LineExtractor, MatchTier};
use crate::loader;
use crate::preprocessing::{PreprocessingResult, Preprocessor, StepTiming};
use chrono::{DateTime, Local};
use image::GrayImage;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// The engine does not report line confidence with the configured output mode
pub const CONFIDENCE_PLACEHOLDER: &str =
    "N/A (Tesseract requires advanced config to report line confidence)";

/// The downloadable result of one successful run
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub request_id: String,
    pub timestamp: DateTime<Local>,
    pub file_name: String,
    pub target_pattern: String,
    pub extracted_text: String,
    pub match_tier: MatchTier,
    /// Seconds from the end of decoding through line selection
    ///
    /// Excludes decoding and any inspection hook passed to
    /// [`ExtractionPipeline::run_with`].
    pub processing_time_seconds: f64,
    pub confidence_score: String,
}

/// Preprocessing summary without the image itself
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingSummary {
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Everything a front end may want to show
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub report: ExtractionReport,
    pub raw_text: String,
    pub preprocessing: PreprocessingSummary,
}

pub struct ExtractionPipeline {
    preprocessor: Preprocessor,
    engine: Arc<dyn OcrEngine>,
    extractor: LineExtractor,
}

impl ExtractionPipeline {
    pub fn new(engine: Arc<dyn OcrEngine>, extractor: LineExtractor) -> Self {
        Self {
            preprocessor: Preprocessor::new(),
            engine,
            extractor,
        }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn extractor(&self) -> &LineExtractor {
        &self.extractor
    }

    /// Run all four stages on one uploaded image
    pub fn run(&self, bytes: &[u8], ctx: &RequestContext) -> Result<PipelineOutput, ExtractError> {
        self.run_with(bytes, ctx, |_| Ok(()))
    }

    /// Like [`run`](Self::run), handing the binarized image to `inspect`
    /// before recognition
    ///
    /// An error from `inspect` stops the run before the engine is called.
    pub fn run_with<F>(
        &self,
        bytes: &[u8],
        ctx: &RequestContext,
        inspect: F,
    ) -> Result<PipelineOutput, ExtractError>
    where
        F: FnOnce(&GrayImage) -> Result<(), ExtractError>,
    {
        let span = tracing::info_span!(
            "pipeline",
            request_id = %ctx.request_id,
            file_name = %ctx.file_name
        );
        let _guard = span.enter();

        let decoded = loader::load(bytes, ctx)?;

        let start = Instant::now();

        let preprocessed: PreprocessingResult = self.preprocessor.process(decoded, ctx)?;

        let inspect_start = Instant::now();
        inspect(&preprocessed.image)?;
        let inspect_time = inspect_start.elapsed();

        let raw_text = self.engine.recognize(&preprocessed.image, ctx)?;
        let found = self.extractor.extract(&raw_text, ctx)?;

        let processing_time_seconds = start.elapsed().saturating_sub(inspect_time).as_secs_f64();
        tracing::info!(
            request_id = %ctx.request_id,
            "Processing complete in {:.2} seconds",
            processing_time_seconds
        );

        Ok(PipelineOutput {
            report: ExtractionReport {
                request_id: ctx.request_id.to_string(),
                timestamp: Local::now(),
                file_name: ctx.file_name.clone(),
                target_pattern: found.tier.pattern().to_string(),
                extracted_text: found.line,
                match_tier: found.tier,
                processing_time_seconds,
                confidence_score: CONFIDENCE_PLACEHOLDER.to_string(),
            },
            raw_text,
            preprocessing: PreprocessingSummary {
                total_time_ms: preprocessed.total_time_ms,
                steps: preprocessed.steps,
            },
        })
    }

    /// Run on a blocking thread so a slow engine does not stall the runtime
    pub async fn run_blocking(
        self: Arc<Self>,
        bytes: Vec<u8>,
        ctx: RequestContext,
    ) -> Result<PipelineOutput, ExtractError> {
        let span = tracing::Span::current();
        tokio::task::spawn_blocking(move || span.in_scope(|| self.run(&bytes, &ctx)))
            .await
            .map_err(|e| ExtractError::Internal(format!("Pipeline task failed: {}", e)))?
    }
}

/// Save a binarized image for inspection
pub fn save_preprocessed(image: &GrayImage, path: &std::path::Path) -> Result<(), ExtractError> {
    image
        .save(path)
        .map_err(|e| ExtractError::Internal(format!("Failed to save {}: {}", path.display(), e)))
}
