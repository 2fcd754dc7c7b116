//! Read-only HTTP surface over the aggregate store

use {
    crate::{
        aggregator::MintAggregator,
        rate_limit::{RateLimiter, RATE_LIMIT_MESSAGE},
    },
    axum::{
        extract::{ConnectInfo, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::get,
        Json, Router,
    },
    std::{net::SocketAddr, sync::Arc},
    tokio::{net::TcpListener, sync::RwLock},
};

/// Shared handles for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregates: Arc<RwLock<MintAggregator>>,
    pub limiter: Arc<RateLimiter>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/mintEvents", get(mint_events))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve until the listener fails. Ingestion keeps running regardless of
/// what happens on the read side.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("🌐 Query service listening on {}", addr);
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

/// The full current aggregate, sorted by primary amount descending.
async fn mint_events(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
) -> Response {
    if !state.limiter.allow(client.ip()) {
        return (StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_MESSAGE).into_response();
    }

    let snapshot = state.aggregates.read().await.snapshot();
    Json(snapshot).into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"ok": true}))
}
