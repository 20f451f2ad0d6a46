use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod context;
mod engine;
mod engines;
mod error;
mod extraction;
mod loader;
mod pipeline;
mod preprocessing;
mod server;

use extraction::MatchPolicy;

#[derive(Parser, Debug)]
#[command(name = "label-ocr")]
#[command(about = "Extract the _1_ identifier line from shipping-label images")]
#[command(version)]
pub struct Args {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Args, Debug)]
pub struct EngineArgs {
    /// OCR engine to use (defaults to the first available)
    #[arg(long, env = "OCR_ENGINE", global = true)]
    pub engine: Option<String>,

    /// Tesseract executable to invoke
    #[arg(long, env = "TESSERACT_CMD", default_value = "tesseract", global = true)]
    pub tesseract_cmd: String,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, env = "TESSDATA_PREFIX", global = true)]
    pub tessdata_path: Option<String>,

    /// Whether a line with only the `_1_` marker is an acceptable result
    #[arg(
        long,
        env = "OCR_MATCH_POLICY",
        value_enum,
        default_value_t = MatchPolicy::AllowFallback,
        global = true
    )]
    pub match_policy: MatchPolicy,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the extraction pipeline over HTTP
    Serve(ServeArgs),
    /// Run the extraction pipeline once on a local image
    Extract(ExtractArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Host address to bind to
    #[arg(long, env = "OCR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "OCR_PORT", default_value = "9292")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 10MB)
    #[arg(long, env = "OCR_MAX_FILE_SIZE", default_value = "10485760")]
    pub max_file_size: usize,
}

#[derive(clap::Args, Debug)]
pub struct ExtractArgs {
    /// Shipping-label image (PNG or JPEG)
    pub file: PathBuf,

    /// Also write the JSON result to this path
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Save the binarized image that was handed to the OCR engine
    #[arg(long)]
    pub save_preprocessed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = config::Config::from(args.engine);

    tracing::info!("Starting label-ocr v{}", env!("CARGO_PKG_VERSION"));

    let registry = engines::EngineRegistry::new(&config.engine)?;
    for info in registry.info() {
        tracing::debug!("Engine available: {} ({})", info.name, info.description);
    }
    let engine = registry
        .default()
        .ok_or_else(|| anyhow::anyhow!("No OCR engine available"))?;
    tracing::info!(
        "Using {} engine, {} match policy",
        registry.default_name(),
        config.match_policy.as_str()
    );

    let pipeline = pipeline::ExtractionPipeline::new(
        engine,
        extraction::LineExtractor::new(config.match_policy),
    );

    match args.command {
        Command::Serve(serve_args) => {
            let server_config = config::ServerConfig::from(serve_args);
            tracing::info!("Binding to {}:{}", server_config.host, server_config.port);
            server::run(pipeline, server_config).await
        }
        Command::Extract(extract_args) => {
            tokio::task::spawn_blocking(move || extract_file(&pipeline, &extract_args)).await?
        }
    }
}

/// One-shot extraction of a local file, printing the report as JSON
fn extract_file(
    pipeline: &pipeline::ExtractionPipeline,
    args: &ExtractArgs,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", args.file.display(), e))?;

    let file_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());
    let ctx = context::RequestContext::new(file_name);

    let output = pipeline.run_with(&bytes, &ctx, |image| {
        if let Some(path) = &args.save_preprocessed {
            pipeline::save_preprocessed(image, path)?;
            tracing::info!("Saved preprocessed image to {}", path.display());
        }
        Ok(())
    })?;
    tracing::debug!("Raw OCR output:\n{}", output.raw_text);

    let json = serde_json::to_string_pretty(&output.report)?;
    println!("{}", json);

    if let Some(path) = &args.output {
        std::fs::write(path, &json)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;
        tracing::info!("Wrote result to {}", path.display());
    }

    Ok(())
}
