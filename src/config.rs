use crate::extraction::MatchPolicy;
use crate::{EngineArgs, ServeArgs};

/// OCR engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine to use; the first available one when unset
    pub engine: Option<String>,
    pub tesseract_cmd: String,
    pub tessdata_path: Option<String>,
}

/// Pipeline configuration shared by every front end
#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,
    pub match_policy: MatchPolicy,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
}

impl From<EngineArgs> for Config {
    fn from(args: EngineArgs) -> Self {
        Self {
            engine: EngineConfig {
                engine: args.engine,
                tesseract_cmd: args.tesseract_cmd,
                tessdata_path: args.tessdata_path,
            },
            match_policy: args.match_policy,
        }
    }
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
        }
    }
}
