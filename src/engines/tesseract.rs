//! Tesseract command-line engine
//!
//! Runs a separately installed `tesseract` executable on a temporary PNG and
//! reads the recognized text from stdout.

use crate::config::EngineConfig;
use crate::context::RequestContext;
use crate::engine::{OcrEngine, ENGINE_MODE, LANGUAGE, PAGE_SEG_MODE};
use crate::error::ExtractError;
use image::GrayImage;
use std::io::ErrorKind;
use std::process::Command;

pub struct TesseractCliEngine {
    /// Executable to invoke
    command: String,
    /// Optional tessdata directory passed as `--tessdata-dir`
    tessdata_path: Option<String>,
}

impl TesseractCliEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            command: config.tesseract_cmd.clone(),
            tessdata_path: config.tessdata_path.clone(),
        }
    }

    /// Ask the executable for its version
    ///
    /// Returns `EngineUnavailable` when it cannot be spawned.
    pub fn probe(&self) -> Result<String, ExtractError> {
        let output = Command::new(&self.command)
            .arg("--version")
            .output()
            .map_err(|e| self.spawn_error(e))?;

        // Older releases print the version banner on stderr
        let banner = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&banner)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    fn build_command(&self, input: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg(input).arg("stdout");
        if let Some(dir) = &self.tessdata_path {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.args(["--psm", &PAGE_SEG_MODE.to_string()])
            .args(["--oem", &ENGINE_MODE.to_string()])
            .args(["-l", LANGUAGE]);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> ExtractError {
        if e.kind() == ErrorKind::NotFound {
            ExtractError::EngineUnavailable(format!(
                "'{}' is not installed or not on PATH",
                self.command
            ))
        } else {
            ExtractError::EngineFailed(format!("Failed to start '{}': {}", self.command, e))
        }
    }
}

impl OcrEngine for TesseractCliEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR via the system tesseract executable"
    }

    fn recognize(&self, image: &GrayImage, ctx: &RequestContext) -> Result<String, ExtractError> {
        let temp_file = tempfile::Builder::new()
            .prefix("label-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| ExtractError::Internal(format!("Failed to create temp file: {}", e)))?;

        image
            .save_with_format(temp_file.path(), image::ImageFormat::Png)
            .map_err(|e| ExtractError::Internal(format!("Failed to write temp file: {}", e)))?;

        tracing::info!(
            request_id = %ctx.request_id,
            "Starting Tesseract OCR ({}x{})",
            image.width(),
            image.height()
        );

        let output = self
            .build_command(temp_file.path())
            .output()
            .map_err(|e| {
                let err = self.spawn_error(e);
                if matches!(err, ExtractError::EngineUnavailable(_)) {
                    tracing::error!(
                        request_id = %ctx.request_id,
                        "Tesseract not found. Please ensure it is installed and configured."
                    );
                }
                err
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(
                request_id = %ctx.request_id,
                "Tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            );
            return Err(ExtractError::EngineFailed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|e| ExtractError::EngineFailed(format!("Output is not UTF-8: {}", e)))?;

        tracing::info!(
            request_id = %ctx.request_id,
            "Tesseract OCR completed ({} lines)",
            text.trim().lines().count()
        );

        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(command: &str, tessdata_path: Option<&str>) -> TesseractCliEngine {
        TesseractCliEngine::new(&EngineConfig {
            engine: None,
            tesseract_cmd: command.to_string(),
            tessdata_path: tessdata_path.map(str::to_string),
        })
    }

    #[test]
    fn test_command_uses_fixed_profile() {
        let engine = engine("tesseract", Some("/opt/tessdata"));
        let cmd = engine.build_command(std::path::Path::new("/tmp/in.png"));
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec![
                "/tmp/in.png",
                "stdout",
                "--tessdata-dir",
                "/opt/tessdata",
                "--psm",
                "6",
                "--oem",
                "3",
                "-l",
                "eng"
            ]
        );
    }

    #[test]
    fn test_missing_executable_is_unavailable() {
        let engine = engine("label-ocr-no-such-tesseract", None);
        let ctx = RequestContext::new("label.png");
        let image = GrayImage::from_pixel(4, 4, image::Luma([255]));

        let result = engine.recognize(&image, &ctx);
        assert!(matches!(result, Err(ExtractError::EngineUnavailable(_))));

        assert!(matches!(engine.probe(), Err(ExtractError::EngineUnavailable(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_executable_is_engine_failure() {
        // `false` starts fine and exits 1 regardless of its arguments
        let engine = engine("false", None);
        let ctx = RequestContext::new("label.png");
        let image = GrayImage::from_pixel(4, 4, image::Luma([255]));

        let result = engine.recognize(&image, &ctx);
        assert!(
            matches!(result, Err(ExtractError::EngineFailed(_))),
            "got {:?}",
            result
        );
    }
}
