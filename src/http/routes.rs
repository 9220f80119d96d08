//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Upper bound for plain HTTP requests; socket sessions outlive it
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/hosts", get(hosts_handler))
        .route("/ws", get(ws_handler))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.client_origin))
        .with_state(state)
}

/// CORS for comma-separated origins; `*` allows any
fn cors_layer(client_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return cors.allow_origin(Any);
    }
    let allowed_origins: Vec<HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    cors.allow_origin(allowed_origins)
}

#[derive(Debug, Serialize, PartialEq)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub hosts: usize,
    pub players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        hosts: state.hosts.active_hosts(),
        players: state.hosts.total_players(),
    })
}

#[derive(Debug, Serialize, PartialEq)]
pub struct HostsResponse {
    pub primary: String,
    pub hosts: Vec<String>,
}

async fn hosts_handler(State(state): State<AppState>) -> Json<HostsResponse> {
    let mut hosts = state.hosts.ids();
    hosts.sort();
    Json(HostsResponse {
        primary: state.primary_host.clone(),
        hosts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state() -> AppState {
        let config = Config::from_lookup(|key| match key {
            "IDEAL_BOAT_COUNT" => Some("1".to_string()),
            "WORLD_SEED" => Some("3".to_string()),
            _ => None,
        })
        .unwrap();
        AppState::new(config).unwrap().0
    }

    #[tokio::test]
    async fn test_health_counts_hosts() {
        let Json(health) = health_handler(State(state())).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.hosts, 1);
        assert_eq!(health.players, 0);
    }

    #[tokio::test]
    async fn test_hosts_lists_primary() {
        let state = state();
        let primary = state.primary_host.clone();
        let Json(hosts) = hosts_handler(State(state)).await;
        assert!(primary.ends_with("_wave_morph"));
        assert_eq!(hosts.hosts, vec![primary.clone()]);
        assert_eq!(hosts.primary, primary);
    }

    #[tokio::test]
    async fn test_router_serves_health_and_unknown_routes_404() {
        let router = build_router(state());
        let response = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
