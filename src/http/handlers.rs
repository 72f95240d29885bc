//! Instance endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::admission::{Admission, Status};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::lifecycle::instance::DownNotice;
use crate::load_balancer::CycleReport;
use crate::loadgen::random_payload;

fn payload_or_random(body: String, len: usize) -> String {
    if body.is_empty() {
        random_payload(len)
    } else {
        body
    }
}

/// `POST /requests`
pub async fn accept_request(State(state): State<AppState>, body: String) -> Result<Admission, ApiError> {
    let payload = payload_or_random(body, state.payload_len);
    Ok(state.governor.accept(payload).await?)
}

/// `GET /status`
pub async fn get_status(State(state): State<AppState>) -> Json<Status> {
    Json(state.governor.status())
}

/// `GET /health`
pub async fn get_health(State(state): State<AppState>) -> impl IntoResponse {
    if state.governor.is_healthy() {
        (StatusCode::OK, Json(json!({ "status": "UP" })))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "DOWN" })))
    }
}

#[derive(Debug, Deserialize)]
pub struct DownNotification {
    pub identity: String,
}

#[derive(Debug, Serialize)]
pub struct DownAck {
    pub result: DownNotice,
}

/// `POST /notify-down`
pub async fn notify_down(
    State(state): State<AppState>,
    Json(notification): Json<DownNotification>,
) -> Json<DownAck> {
    let result = state.governor.notify_peer_down(&notification.identity);
    Json(DownAck { result })
}

#[derive(Debug, Deserialize)]
pub struct DrawQuery {
    #[serde(default)]
    pub attempt: u32,
}

/// `GET /peer-draw?attempt=`
pub async fn peer_draw(State(state): State<AppState>, Query(query): Query<DrawQuery>) -> Json<u8> {
    Json(state.governor.provide_draw(query.attempt))
}

/// `POST /replica-intake`
pub async fn replica_intake(State(state): State<AppState>, body: String) -> Result<Admission, ApiError> {
    Ok(state.governor.receive_replicated(body)?)
}

#[derive(Debug, Deserialize)]
pub struct AliveQuery {
    pub alive: bool,
}

/// `POST /alive?alive=`
pub async fn set_alive(State(state): State<AppState>, Query(query): Query<AliveQuery>) -> impl IntoResponse {
    let previous = state.governor.set_alive(query.alive);
    Json(json!({ "alive": query.alive, "previous": previous }))
}

/// `POST /loadbalancer`
pub async fn load_balancer(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<CycleReport>, StatusCode> {
    let cycler = state.cycler.as_ref().ok_or(StatusCode::NOT_FOUND)?;
    let payload = payload_or_random(body, state.payload_len);
    Ok(Json(cycler.handle_request(&payload).await))
}
