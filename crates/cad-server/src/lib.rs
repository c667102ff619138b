use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use cad_ai::{
    GeminiClient, GeminiConfig, LanguageModel, ModelError, ModelPipeline, PipelineError,
    PipelineOutput, STL_FILE_NAME,
};
use cad_mesh::PreviewConfig;
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use http::{HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

const INDEX_HTML: &str = include_str!("index.html");

type BoxedModel = Box<dyn LanguageModel + Send>;
type ModelFactory = dyn Fn() -> Result<BoxedModel, ModelError> + Send + Sync;

/// Shared, immutable server state. Each request gets a fresh model client.
#[derive(Clone)]
pub struct AppState {
    model_factory: Arc<ModelFactory>,
    preview: PreviewConfig,
}

impl AppState {
    pub fn new<F>(model_factory: F) -> Self
    where
        F: Fn() -> Result<BoxedModel, ModelError> + Send + Sync + 'static,
    {
        Self {
            model_factory: Arc::new(model_factory),
            preview: PreviewConfig::default(),
        }
    }

    /// State backed by the hosted Gemini API.
    pub fn gemini(config: GeminiConfig) -> Self {
        Self::new(move || Ok(Box::new(GeminiClient::new(config.clone())?) as BoxedModel))
    }

    pub fn with_preview_config(mut self, preview: PreviewConfig) -> Self {
        self.preview = preview;
        self
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/generate", post(generate))
        .route("/generate/stl", post(generate_stl))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GenerateResponse {
    raw_response: String,
    warnings: Vec<String>,
    triangle_count: usize,
    file_name: String,
    stl_base64: String,
    preview_png_base64: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    raw_response: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
    raw_response: Option<String>,
    warnings: Vec<String>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            raw_response: None,
            warnings: Vec::new(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::EmptyInput
            | PipelineError::EmptyResponse
            | PipelineError::MalformedResponse { .. } => StatusCode::BAD_REQUEST,
            PipelineError::NoValidShapes { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::Model(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Preview(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Self {
            status,
            message: err.to_string(),
            raw_response: err.raw_response().map(str::to_string),
            warnings: err.warnings().iter().map(ToString::to_string).collect(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
                raw_response: self.raw_response,
                warnings: self.warnings,
            }),
        )
            .into_response()
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, ApiError> {
    let request: GenerateRequest = parse_json(&body)?;
    let output = run_pipeline(&state, request.prompt).await?;

    Ok(Json(GenerateResponse {
        triangle_count: output.mesh.triangle_count(),
        warnings: output.warnings.iter().map(ToString::to_string).collect(),
        file_name: STL_FILE_NAME.to_string(),
        stl_base64: BASE64_ENGINE.encode(&output.stl),
        preview_png_base64: BASE64_ENGINE.encode(&output.preview_png),
        raw_response: output.raw_response,
    }))
}

async fn generate_stl(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request: GenerateRequest = parse_json(&body)?;
    let output = run_pipeline(&state, request.prompt).await?;

    let mut response = Response::new(Body::from(output.stl));
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"model.stl\""),
    );
    Ok(response)
}

/// Runs the blocking pipeline off the async executor.
async fn run_pipeline(state: &AppState, prompt: String) -> Result<PipelineOutput, ApiError> {
    if prompt.trim().is_empty() {
        return Err(PipelineError::EmptyInput.into());
    }

    let factory = Arc::clone(&state.model_factory);
    let preview = state.preview.clone();

    let result = tokio::task::spawn_blocking(move || {
        let model = (*factory)().map_err(PipelineError::from)?;
        ModelPipeline::new(model)
            .with_preview_config(preview)
            .run(&prompt)
    })
    .await
    .map_err(|err| ApiError::internal(format!("generation task failed: {err}")))?;

    result.map_err(|err| {
        log::warn!("generation failed: {err}");
        ApiError::from(err)
    })
}

fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("request body is required"));
    }

    serde_json::from_slice(body)
        .map_err(|err| ApiError::bad_request(format!("invalid JSON body: {err}")))
}
