use axum::{extract::State, Json};
use serde::Serialize;

use crate::admission::Status;
use crate::http::server::AppState;
use crate::load_balancer::WorkerView;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    #[serde(flatten)]
    pub instance: Status,
    pub restart_pending: bool,
    pub arbitration_rounds: u64,
    pub last_provided_draw: u8,
}

#[derive(Serialize)]
pub struct PeerStatus {
    pub identity: String,
    pub address: String,
    pub alive: bool,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let governor = &state.governor;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        instance: governor.status(),
        restart_pending: governor.lifecycle().restart_pending(),
        arbitration_rounds: governor.arbiter().rounds(),
        last_provided_draw: governor.arbiter().last_provided(),
    })
}

pub async fn get_peers(State(state): State<AppState>) -> Json<Vec<PeerStatus>> {
    let peers = state
        .governor
        .peers()
        .all()
        .iter()
        .map(|p| PeerStatus {
            identity: p.identity.clone(),
            address: p.base_url.to_string(),
            alive: p.is_alive(),
        })
        .collect();
    Json(peers)
}

pub async fn get_workers(State(state): State<AppState>) -> Json<Vec<WorkerView>> {
    let workers = state
        .cycler
        .as_ref()
        .map(|c| c.pool().views())
        .unwrap_or_default();
    Json(workers)
}
