//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router over the coordination core
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::admission::RequestGovernor;
use crate::config::{AdminConfig, NodeConfig};
use crate::http::handlers;
use crate::http::request::{make_span, propagate_request_id, set_request_id};
use crate::load_balancer::LoadBalancerCycler;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub governor: Arc<RequestGovernor>,
    pub cycler: Option<Arc<LoadBalancerCycler>>,
    pub admin: AdminConfig,
    pub payload_len: usize,
}

/// HTTP server for one instance.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &NodeConfig, state: AppState) -> Self {
        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &NodeConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/requests", post(handlers::accept_request))
            .route("/status", get(handlers::get_status))
            .route("/health", get(handlers::get_health))
            .route("/notify-down", post(handlers::notify_down))
            .route("/peer-draw", get(handlers::peer_draw))
            .route("/replica-intake", post(handlers::replica_intake))
            .route("/alive", post(handlers::set_alive))
            .route("/loadbalancer", post(handlers::load_balancer))
            .with_state(state.clone());

        if state.admin.enabled {
            router = router.merge(setup_admin_router(state));
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(config.listener.request_timeout_secs)))
            .layer(propagate_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(set_request_id())
    }

    /// The router, for in-process serving.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
