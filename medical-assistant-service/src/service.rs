use assistant_flow::{
    ConversationRunner, Request, StorageError, interpreter::EMPTY_QUESTION_GUIDANCE,
};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::{
    assistant::{build_request_router, create_conversation_runner, create_session_storage},
    config::AssistantConfig,
    models::{
        ContextUpdate, ExchangeResponse, PrescriptionUpload, QuestionRequest, RouteRequest,
        RouteResponse, SessionResponse, decode_image,
    },
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn storage_error(e: StorageError) -> ApiError {
    match e {
        StorageError::SessionNotFound(id) => not_found_error("Session not found", &id),
        other => {
            error!("Session storage failed: {}", other);
            internal_error("Session storage failed", &other.to_string())
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub runner: ConversationRunner,
}

pub fn create_app(config: &AssistantConfig) -> Router {
    let router = build_request_router(config);
    let runner = create_conversation_runner(router, create_session_storage());
    build_router(AppState { runner })
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/assistant/route", post(route_request))
        .route("/assistant/sessions", post(create_session))
        .route(
            "/assistant/sessions/{session_id}",
            get(get_session).delete(end_session),
        )
        .route(
            "/assistant/sessions/{session_id}/prescription",
            post(upload_prescription),
        )
        .route(
            "/assistant/sessions/{session_id}/context",
            put(update_context),
        )
        .route(
            "/assistant/sessions/{session_id}/messages",
            post(ask_question),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Smart Medical Assistant",
        "version": "0.1.0",
        "description": "Prescription OCR and chat, plus nearby medical service search",
        "endpoints": {
            "POST /assistant/route": "Route a single request (image or text) without a session",
            "POST /assistant/sessions": "Start a conversation",
            "GET /assistant/sessions/{session_id}": "Get prescription context and chat history",
            "DELETE /assistant/sessions/{session_id}": "End a conversation and discard its data",
            "POST /assistant/sessions/{session_id}/prescription": "Upload a prescription image",
            "PUT /assistant/sessions/{session_id}/context": "Edit the extracted prescription text",
            "POST /assistant/sessions/{session_id}/messages": "Ask about medicines or find a doctor",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn route_request(
    State(state): State<AppState>,
    Json(request): Json<RouteRequest>,
) -> ApiResult<RouteResponse> {
    let image = match request.image_base64.as_deref() {
        Some(encoded) => Some(
            decode_image(encoded, request.media_type.as_deref())
                .map_err(|_| bad_request_error("image_base64 is not valid base64"))?,
        ),
        None => None,
    };

    let outcome = state
        .runner
        .router()
        .route(Request::from_parts(image, request.text, request.prior_context))
        .await;

    info!(route = %outcome.route, success = outcome.is_success(), "Stateless request routed");
    Ok(Json(RouteResponse::from(&outcome)))
}

async fn create_session(State(state): State<AppState>) -> ApiResult<Value> {
    let session = state.runner.start().await.map_err(storage_error)?;
    Ok(Json(json!({
        "session_id": session.id,
        "status": "started",
        "message": "Upload a prescription to analyze, chat, or find nearby doctors."
    })))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = state
        .runner
        .session(&session_id)
        .await
        .map_err(storage_error)?;
    Ok(Json(SessionResponse::from(session)))
}

async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    state.runner.end(&session_id).await.map_err(storage_error)?;
    Ok(Json(json!({
        "session_id": session_id,
        "status": "ended"
    })))
}

async fn upload_prescription(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(upload): Json<PrescriptionUpload>,
) -> ApiResult<ExchangeResponse> {
    info!("Prescription upload for session: {}", session_id);

    let image = decode_image(&upload.image_base64, upload.media_type.as_deref())
        .map_err(|_| bad_request_error("image_base64 is not valid base64"))?;
    if image.is_empty() {
        return Err(bad_request_error("Prescription image is required"));
    }

    let outcome = state
        .runner
        .upload(&session_id, image)
        .await
        .map_err(storage_error)?;

    Ok(Json(ExchangeResponse {
        session_id,
        outcome: RouteResponse::from(&outcome),
    }))
}

async fn update_context(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(update): Json<ContextUpdate>,
) -> ApiResult<SessionResponse> {
    let session = state
        .runner
        .edit_context(&session_id, &update.text)
        .await
        .map_err(storage_error)?;
    Ok(Json(SessionResponse::from(session)))
}

async fn ask_question(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<QuestionRequest>,
) -> ApiResult<ExchangeResponse> {
    if request.question.trim().is_empty() {
        return Err(bad_request_error(EMPTY_QUESTION_GUIDANCE));
    }

    let outcome = state
        .runner
        .ask(&session_id, &request.question)
        .await
        .map_err(storage_error)?;

    Ok(Json(ExchangeResponse {
        session_id,
        outcome: RouteResponse::from(&outcome),
    }))
}
