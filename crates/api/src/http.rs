/// HTTP API server implementation
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use synth_core::{CompileResponse, ContractFamily, Error, Feature, GeneratedContract, GenerationRequest};
use synth_pipeline::ContractPipeline;
use synth_solidity::compiler::CompileRequest;

/// State shared by every handler
#[derive(Clone)]
pub struct ApiState {
    pipeline: Arc<ContractPipeline>,
}

impl ApiState {
    pub fn new(pipeline: Arc<ContractPipeline>) -> Self {
        Self { pipeline }
    }
}

/// Build the API router
pub fn router(state: ApiState, cors_enabled: bool) -> Router {
    let app = Router::new()
        .route("/api/contracts/generate", post(generate_contract))
        .route("/api/contracts/compile", post(compile_contract))
        .route("/api/ai/analyze-contract", post(analyze_contract))
        .route("/api/ai/generate-contract", post(generate_with_model))
        .route("/api/features", get(list_features))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http());

    let app = if cors_enabled {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        app
    };

    app.with_state(state)
}

/// API Error type
#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Pipeline(Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Pipeline(err)
    }
}

fn error_to_status_code(err: &Error) -> StatusCode {
    match err {
        Error::UnknownFamily(_)
        | Error::InvalidRequest(_)
        | Error::ValidationFailed(_)
        | Error::ContractNotFound(_)
        | Error::Parse(_) => StatusCode::BAD_REQUEST,
        Error::CompilationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Error::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::CompilationTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": message })),
            )
                .into_response(),
            ApiError::Pipeline(err) => {
                let status = error_to_status_code(&err);
                if status.is_server_error() {
                    error!(error = %err, "Request failed");
                }
                let errors = err.diagnostics();
                (
                    status,
                    Json(json!({ "success": false, "error": err.to_string(), "errors": errors })),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    success: bool,
    source_code: String,
    contract_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ignored_features: Vec<String>,
}

async fn generate_contract(
    State(state): State<ApiState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(request) = payload?;
    let ignored_features = request.ignored_features();
    let composed = state.pipeline.generate(request)?;

    Ok(Json(GenerateResponse {
        success: true,
        contract_name: composed.contract_name().to_string(),
        source_code: composed.source,
        ignored_features,
    }))
}

async fn compile_contract(
    State(state): State<ApiState>,
    payload: Result<Json<CompileRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    if request.contract_name.trim().is_empty() || request.source_code.trim().is_empty() {
        return Err(ApiError::BadRequest("Contract name and source code are required".to_string()));
    }

    let response = match state.pipeline.compile(request).await {
        Ok(artifact) => (StatusCode::OK, Json(CompileResponse::from_result(Ok(artifact)))),
        Err(err) => {
            let status = error_to_status_code(&err);
            debug!(error = %err, status = status.as_u16(), "Compilation rejected");
            (status, Json(CompileResponse::from_result(Err(err))))
        }
    };

    Ok(response.into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    #[serde(default)]
    prompt: String,
    #[serde(default, alias = "currentConfig")]
    current_context: Option<Value>,
}

async fn analyze_contract(
    State(state): State<ApiState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    if request.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("Prompt is required".to_string()));
    }

    let interpretation = state
        .pipeline
        .interpret(&request.prompt, request.current_context.as_ref())
        .await;

    Ok(Json(json!({
        "success": true,
        "suggestion": interpretation.suggestion,
        "source": interpretation.provenance,
    })))
}

#[derive(Debug, Deserialize)]
struct AuthorRequest {
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    context: Option<Value>,
}

#[derive(Debug, Serialize)]
struct AuthorResponse {
    success: bool,
    #[serde(flatten)]
    contract: GeneratedContract,
}

async fn generate_with_model(
    State(state): State<ApiState>,
    payload: Result<Json<AuthorRequest>, JsonRejection>,
) -> Result<Json<AuthorResponse>, ApiError> {
    let Json(request) = payload?;
    if request.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("Prompt is required".to_string()));
    }

    let contract = state
        .pipeline
        .generate_source(&request.prompt, request.context.as_ref())
        .await?;

    Ok(Json(AuthorResponse { success: true, contract }))
}

#[derive(Debug, Deserialize)]
struct FeatureQuery {
    family: Option<String>,
}

#[derive(Debug, Serialize)]
struct FeatureInfo {
    id: &'static str,
    description: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FamilyFeatures {
    family: ContractFamily,
    display_name: &'static str,
    template_available: bool,
    features: Vec<FeatureInfo>,
}

async fn list_features(
    State(state): State<ApiState>,
    Query(query): Query<FeatureQuery>,
) -> Result<Json<Vec<FamilyFeatures>>, ApiError> {
    let families = match query.family.as_deref() {
        Some(family) => vec![family.parse::<ContractFamily>()?],
        None => ContractFamily::ALL.to_vec(),
    };
    let supported = state.pipeline.composer().supported_families();

    let listing = families
        .into_iter()
        .map(|family| FamilyFeatures {
            family,
            display_name: family.display_name(),
            template_available: supported.contains(&family),
            features: family
                .allowed_features()
                .iter()
                .map(|feature: &Feature| FeatureInfo {
                    id: feature.as_str(),
                    description: feature.description(),
                })
                .collect(),
        })
        .collect();

    Ok(Json(listing))
}

async fn health_check(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "healthy": true,
        "version": env!("CARGO_PKG_VERSION"),
        "compilerReady": state.pipeline.compiler().context().is_ready(),
        "modelAvailable": state.pipeline.interpreter().model_available(),
    }))
}
