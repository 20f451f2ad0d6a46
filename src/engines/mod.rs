//! OCR engine implementations
//!
//! This module contains implementations of the OcrEngine trait for different
//! Tesseract backends. The command-line engine is always built; the statically
//! linked one is behind the `engine-leptess` feature.

#[cfg(feature = "engine-leptess")]
pub mod leptess;

pub mod tesseract;

use crate::config::EngineConfig;
use crate::engine::OcrEngine;
use crate::error::ExtractError;
use std::sync::Arc;

/// Information about an available engine
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
}

/// Registry of available OCR engines
pub struct EngineRegistry {
    engines: Vec<Arc<dyn OcrEngine>>,
    default_engine: String,
}

impl EngineRegistry {
    /// Create a new engine registry with all available engines initialized
    pub fn new(config: &EngineConfig) -> Result<Self, ExtractError> {
        let mut engines: Vec<Arc<dyn OcrEngine>> = Vec::new();

        tracing::info!("Initializing tesseract engine...");
        let cli_engine = tesseract::TesseractCliEngine::new(config);
        match cli_engine.probe() {
            Ok(version) => tracing::info!("Found {} ({})", config.tesseract_cmd, version),
            Err(e) => tracing::warn!("{}; OCR requests will fail until it is installed", e),
        }
        engines.push(Arc::new(cli_engine));

        #[cfg(feature = "engine-leptess")]
        {
            tracing::info!("Initializing leptess engine...");
            match leptess::LeptessEngine::new(config) {
                Ok(engine) => engines.push(Arc::new(engine)),
                Err(e) => tracing::warn!("Leptess engine disabled: {}", e),
            }
        }

        let default_engine = match &config.engine {
            Some(name) if engines.iter().any(|e| e.name() == name) => name.clone(),
            Some(name) => {
                return Err(ExtractError::EngineUnavailable(format!(
                    "Unknown engine '{}' (available: {})",
                    name,
                    engines
                        .iter()
                        .map(|e| e.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                )))
            }
            None => engines[0].name().to_string(),
        };

        Ok(Self {
            engines,
            default_engine,
        })
    }

    /// Get an engine by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn OcrEngine>> {
        self.engines.iter().find(|e| e.name() == name).cloned()
    }

    /// Get the default engine
    pub fn default(&self) -> Option<Arc<dyn OcrEngine>> {
        self.get(&self.default_engine)
    }

    /// Get the default engine name
    pub fn default_name(&self) -> &str {
        &self.default_engine
    }

    /// Get info about all available engines
    pub fn info(&self) -> Vec<EngineInfo> {
        self.engines
            .iter()
            .map(|e| EngineInfo {
                name: e.name(),
                description: e.description(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(engine: Option<&str>) -> EngineConfig {
        EngineConfig {
            engine: engine.map(str::to_string),
            tesseract_cmd: "label-ocr-no-such-tesseract".to_string(),
            tessdata_path: None,
        }
    }

    #[test]
    fn test_defaults_to_tesseract_cli() {
        let registry = EngineRegistry::new(&config(None)).unwrap();
        assert_eq!(registry.default_name(), "tesseract");
        assert_eq!(registry.default().unwrap().name(), "tesseract");
        assert!(registry.info().iter().any(|e| e.name == "tesseract"));
    }

    #[test]
    fn test_missing_executable_does_not_prevent_startup() {
        assert!(EngineRegistry::new(&config(Some("tesseract"))).is_ok());
    }

    #[test]
    fn test_unknown_engine_is_rejected() {
        let result = EngineRegistry::new(&config(Some("paddle")));
        assert!(matches!(result, Err(ExtractError::EngineUnavailable(_))));
    }
}
