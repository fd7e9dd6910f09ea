// handlers.rs

use crate::{
    commands::PlugCommand,
    config::PlugSettings,
    docs::ApiDoc,
    error::AppError,
    events::HostEventKind,
    models::{AppState, CommandRequest, CommandResponse, HostEvent, PlugStateView},
    utils,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub const COMMAND_PATH: &str = "/api/plugin/tapo_p110";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(COMMAND_PATH, post(handle_command))
        .route("/api/events", post(handle_event))
        .route("/api/settings", get(get_settings).put(put_settings))
        .route("/api/state", get(plug_state))
        .route("/health", get(health))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs one plug command. Device failures come back as `false`/`null`.
#[utoipa::path(
    post,
    path = "/api/plugin/tapo_p110",
    request_body = CommandRequest,
    responses(
        (status = 200, description = "Command result", body = CommandResponse),
        (status = 400, description = "Unknown command")
    )
)]
pub async fn handle_command(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, AppError> {
    let command: PlugCommand = request.command.parse()?;
    Ok(Json(command.execute(&state.plug).await))
}

#[utoipa::path(
    post,
    path = "/api/events",
    request_body = HostEvent,
    responses((status = 202, description = "Event accepted"))
)]
pub async fn handle_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<HostEvent>,
) -> impl IntoResponse {
    let kind = HostEventKind::from(event.event.as_str());
    let handled = state.events.publish(&kind, event.payload);
    info!(event = %kind, handled, "Host event received");
    (
        StatusCode::ACCEPTED,
        Json(json!({ "event": event.event, "handled": handled })),
    )
}

#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Current settings without the password", body = PlugSettings)
    )
)]
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<PlugSettings> {
    Json(state.settings.snapshot().await)
}

/// Replaces the settings and drops the device session so the next call
/// reconnects with them. Leaving out `password` keeps the stored one.
#[utoipa::path(
    put,
    path = "/api/settings",
    request_body = PlugSettings,
    responses(
        (status = 200, description = "Saved settings without the password", body = PlugSettings),
        (status = 422, description = "Invalid settings")
    )
)]
pub async fn put_settings(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<PlugSettings>, AppError> {
    let current = state.settings.snapshot().await;
    let updated = utils::merge_settings(body, &current)?;
    state.settings.replace(updated.clone()).await?;
    state.plug.disconnect().await;
    info!(address = %updated.device_ip, "Settings saved, device session reset");
    Ok(Json(updated))
}

#[utoipa::path(
    get,
    path = "/api/state",
    responses((status = 200, description = "Cached readings", body = PlugStateView))
)]
pub async fn plug_state(State(state): State<Arc<AppState>>) -> Json<PlugStateView> {
    Json(state.plug.state().await)
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
