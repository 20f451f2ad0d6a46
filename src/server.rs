use crate::config::ServerConfig;
use crate::context::RequestContext;
use crate::error::ExtractError;
use crate::pipeline::{ExtractionPipeline, ExtractionReport, PreprocessingSummary};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Content types accepted for upload
const SUPPORTED_FORMATS: [&str; 2] = ["image/png", "image/jpeg"];

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ExtractionPipeline>,
    pub config: Arc<ServerConfig>,
}

/// Extraction response: the downloadable report plus diagnostics
#[derive(Serialize)]
pub struct ExtractResponse {
    #[serde(flatten)]
    pub report: ExtractionReport,
    pub raw_text: String,
    pub preprocessing: PreprocessingSummary,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub engine: String,
    pub match_policy: String,
    pub supported_formats: Vec<String>,
    pub language: String,
    pub max_file_size_bytes: usize,
}

/// Run the HTTP server
pub async fn run(pipeline: ExtractionPipeline, config: ServerConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);

    let state = AppState {
        pipeline: Arc::new(pipeline),
        config: Arc::new(config),
    };

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    // Leave room for the multipart envelope around the file itself
    let body_limit = state.config.max_file_size + 64 * 1024;

    Router::new()
        .route("/extract", post(handle_extract))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle extraction requests
async fn handle_extract(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, ExtractError> {
    let mut file_data: Option<Bytes> = None;
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;

    let max = state.config.max_file_size;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "Failed to parse multipart", max))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            file_name = field.file_name().map(|s| s.to_string());
            content_type = field.content_type().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, "Failed to read file data", max))?,
            );
        }
    }

    let data = file_data.ok_or(ExtractError::MissingFile)?;

    if data.len() > max {
        tracing::warn!("Rejected upload of {} bytes (max: {})", data.len(), max);
        return Err(ExtractError::ImageTooLarge { max });
    }

    // The loader sniffs the real format; the declared type is only advisory
    let mime = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
    if !SUPPORTED_FORMATS.contains(&mime.as_str()) {
        tracing::warn!("Received file with content type: {}", mime);
    }

    let ctx = RequestContext::new(file_name.unwrap_or_else(|| "upload".to_string()));
    tracing::info!(
        request_id = %ctx.request_id,
        "Received {} ({} bytes)",
        ctx.file_name,
        data.len()
    );

    let output = state
        .pipeline
        .clone()
        .run_blocking(data.to_vec(), ctx)
        .await?;

    Ok(Json(ExtractResponse {
        report: output.report,
        raw_text: output.raw_text,
        preprocessing: output.preprocessing,
    }))
}

/// Body-limit overruns surface while streaming the multipart body
fn multipart_error(e: MultipartError, context: &str, max: usize) -> ExtractError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!("Upload exceeded the body limit: {}", e);
        ExtractError::ImageTooLarge { max }
    } else {
        ExtractError::InvalidRequest(format!("{}: {}", context, e))
    }
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: state.pipeline.engine_name().to_string(),
        match_policy: state.pipeline.extractor().policy().as_str().to_string(),
        supported_formats: SUPPORTED_FORMATS.iter().map(|s| s.to_string()).collect(),
        language: crate::engine::LANGUAGE.to_string(),
        max_file_size_bytes: state.config.max_file_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{LineExtractor, MatchPolicy};
    use crate::pipeline::tests::{png_bytes, FakeEngine};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    const BOUNDARY: &str = "label-ocr-test-boundary";

    fn app(text: &str, max_file_size: usize) -> Router {
        app_with_engine(FakeEngine::returning(text), max_file_size)
    }

    fn app_with_engine(engine: FakeEngine, max_file_size: usize) -> Router {
        let pipeline = ExtractionPipeline::new(
            Arc::new(engine),
            LineExtractor::new(MatchPolicy::AllowFallback),
        );
        router(AppState {
            pipeline: Arc::new(pipeline),
            config: Arc::new(ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                max_file_size,
            }),
        })
    }

    fn multipart_body(field: &str, file_name: &str, mime: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {mime}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn extract_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/extract")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app("", 1024)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_info_reports_engine_and_policy() {
        let response = app("", 1024)
            .oneshot(Request::get("/info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = json_body(response).await;
        assert_eq!(json["engine"], "fake");
        assert_eq!(json["match_policy"], "allow-fallback");
        assert_eq!(json["language"], "eng");
    }

    #[tokio::test]
    async fn test_extract_returns_report() {
        let body = multipart_body("file", "label.png", "image/png", &png_bytes());
        let response = app("SHIP TO\n163233702292313922_1_lWV\n", 1 << 20)
            .oneshot(extract_request(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["extracted_text"], "163233702292313922_1_lWV");
        assert_eq!(json["file_name"], "label.png");
        assert_eq!(json["match_tier"], "fallback");
        assert!(json["raw_text"].as_str().unwrap().starts_with("SHIP TO"));
        assert_eq!(json["preprocessing"]["steps"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_file_is_bad_request() {
        let body = multipart_body("other", "label.png", "image/png", &png_bytes());
        let response = app("1_1_1", 1 << 20)
            .oneshot(extract_request(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "MISSING_FILE");
    }

    #[tokio::test]
    async fn test_text_upload_is_unsupported() {
        let body = multipart_body("file", "notes.png", "image/png", b"not an image at all");
        let response = app("1_1_1", 1 << 20)
            .oneshot(extract_request(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(json_body(response).await["code"], "UNSUPPORTED_FORMAT");
    }

    #[tokio::test]
    async fn test_no_match_is_unprocessable() {
        let body = multipart_body("file", "label.png", "image/png", &png_bytes());
        let response = app("nothing useful here", 1 << 20)
            .oneshot(extract_request(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["code"], "NO_MATCH");
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let data = png_bytes();
        let body = multipart_body("file", "label.png", "image/png", &data);
        let response = app("1_1_1", data.len() - 1)
            .oneshot(extract_request(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(response).await["code"], "IMAGE_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_upload_far_beyond_body_limit_is_too_large() {
        // 200 KiB against a 1 KiB limit overruns the body limit mid-parse
        let data = vec![0u8; 200 * 1024];
        let body = multipart_body("file", "label.png", "image/png", &data);
        let response = app("1_1_1", 1024)
            .oneshot(extract_request(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(response).await["code"], "IMAGE_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_engine_failure_is_internal_error() {
        let engine = FakeEngine::failing(|| ExtractError::EngineFailed("exit status 1".to_string()));
        let body = multipart_body("file", "label.png", "image/png", &png_bytes());
        let response = app_with_engine(engine, 1 << 20)
            .oneshot(extract_request(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["code"], "ENGINE_FAILED");
    }
}
