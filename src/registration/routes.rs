//! REST endpoints exposing the dashboard to registration pages.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::error::{Error, ProgressError};

use super::catalog::UserType;
use super::dashboard::Dashboard;

/// Shared state for registration routes.
#[derive(Clone)]
pub struct RegistrationRouteState {
    pub dashboard: Arc<Dashboard>,
}

/// Error wrapper mapping engine errors onto HTTP statuses.
struct ApiError(Error);

impl<E: Into<Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            e if e.is_auth_required() => StatusCode::UNAUTHORIZED,
            Error::Config(_) => StatusCode::BAD_REQUEST,
            Error::Source(_) => StatusCode::BAD_GATEWAY,
            Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Progress(ProgressError::NotInitialized) => StatusCode::CONFLICT,
            Error::Progress(ProgressError::InvalidStage { .. }) => StatusCode::NOT_FOUND,
            Error::Progress(ProgressError::StageLocked { .. }) => StatusCode::FORBIDDEN,
        };
        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

/// POST /api/registration/{user_type}/initialize
async fn initialize(
    State(state): State<RegistrationRouteState>,
    Path(user_type): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_type: UserType = user_type.parse()?;
    Ok(Json(state.dashboard.initialize(user_type).await?))
}

/// GET /api/registration/state
async fn get_state(State(state): State<RegistrationRouteState>) -> impl IntoResponse {
    Json(state.dashboard.state().await)
}

/// POST /api/registration/stages/{stage_id}
///
/// Body is the submitted stage data.
async fn submit_stage(
    State(state): State<RegistrationRouteState>,
    Path(stage_id): Path<u32>,
    Json(data): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.dashboard.update_stage_data(stage_id, data).await?))
}

/// POST /api/registration/stages/{stage_id}/goto
async fn go_to_stage(
    State(state): State<RegistrationRouteState>,
    Path(stage_id): Path<u32>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.dashboard.go_to_stage(stage_id).await?))
}

/// PUT /api/registration/stages/{stage_id}/draft
///
/// Accepted immediately; the write itself is debounced.
async fn save_draft(
    State(state): State<RegistrationRouteState>,
    Path(stage_id): Path<u32>,
    Json(data): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.dashboard.auto_save(stage_id, data).await?;
    Ok((StatusCode::ACCEPTED, Json(view)))
}

/// GET /api/registration/stages/{stage_id}/draft
async fn load_draft(
    State(state): State<RegistrationRouteState>,
    Path(stage_id): Path<u32>,
) -> Response {
    match state.dashboard.load_draft(stage_id).await {
        Some(draft) => Json(draft).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("No draft for stage {stage_id}")})),
        )
            .into_response(),
    }
}

/// GET /api/registration/stages/{stage_id}/authorize
async fn authorize(
    State(state): State<RegistrationRouteState>,
    Path(stage_id): Path<u32>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.dashboard.authorize(stage_id).await?))
}

/// Build the registration REST routes.
pub fn registration_routes(dashboard: Arc<Dashboard>) -> Router {
    let state = RegistrationRouteState { dashboard };
    Router::new()
        .route("/api/registration/{user_type}/initialize", post(initialize))
        .route("/api/registration/state", get(get_state))
        .route("/api/registration/stages/{stage_id}", post(submit_stage))
        .route("/api/registration/stages/{stage_id}/goto", post(go_to_stage))
        .route(
            "/api/registration/stages/{stage_id}/draft",
            get(load_draft).put(save_draft),
        )
        .route(
            "/api/registration/stages/{stage_id}/authorize",
            get(authorize),
        )
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}
