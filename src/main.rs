//! # R-Logic — Position Sizing & Trade Planning Backend
//!
//! ```text
//!  ┌─────────────┐  POST /api/plan/preview     ┌─────────────────────────────┐
//!  │  Dashboard  │ ─────────────────────────▶ │ AppState                    │
//!  │  (UI form)  │  POST /api/positions        │ ├─ positions (book) 📌      │
//!  └─────────────┘  DELETE /api/positions/:id  │ ├─ settings ⚙️              │
//!                                              │ ├─ calc / refresh counters  │
//!  ┌─────────────┐  GET /quote/{symbol}        │ └─ broadcast_tx ──────────┐ │
//!  │ Quote       │ ◀───────────────────────── │                            │ │
//!  │ Provider    │  (per refresh pass)         └────────────────────────────┘ │
//!  └─────────────┘                                                            │
//!  ┌─────────────┐  ws://host/ws/monitor  ◀────────────────────────────────── ┘
//!  │  Dashboard  │  GET  /api/positions/live   (P/L + R-multiple per row)
//!  └─────────────┘  GET  /api/monitor/stats
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod auth;
#[cfg(feature = "postgres")]
mod db;
mod engine;
mod error;
mod events;
mod models;
mod routes;
mod state;

use auth::require_api_key;
use routes::{
    monitor::{get_stats, health_check, ws_monitor},
    plan::preview_plan,
    positions::{clear_positions, delete_position, list_positions, live_positions, record_position},
    settings::{get_settings, update_settings},
};
use state::{AppState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env ──────────────────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ─────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("rlogic=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════════════════╗
  ║             R-LOGIC — Position Sizing Backend         ║
  ║      Planner · Book · Live Monitor · Settings         ║
  ╚═══════════════════════════════════════════════════════╝"#);

    // ── 3. Shared state ───────────────────────────────────────────────────────
    let app_state = AppState::new();

    // ── 4. PostgreSQL mirror (optional) ───────────────────────────────────────
    #[cfg(feature = "postgres")]
    let app_state = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = db::init_pool(&url).await?;
            let stored = db::load_positions(&pool).await?;
            info!(count = stored.len(), "📥 Position book seeded from PostgreSQL");
            *app_state.positions.write().await = stored;
            app_state.with_pool(pool)
        }
        Err(_) => {
            info!("DATABASE_URL not set — running with in-memory book only");
            app_state
        }
    };

    let state: SharedState = Arc::new(app_state);

    // ── 5. Router ─────────────────────────────────────────────────────────────
    let app = build_router(state);

    // ── 6. Bind & Serve ───────────────────────────────────────────────────────
    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;

    info!(?addr, "🚀 R-Logic server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// ประกอบ Router ทั้งระบบ — แยกออกมาเพื่อให้ Test ยิงผ่าน `oneshot` ได้
fn build_router(state: SharedState) -> Router {
    // ── CORS ──────────────────────────────────────────────────────────────────
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Planner ───────────────────────────────────────────────────────────
        .route("/api/plan/preview",    post(preview_plan))
        // ── Position Book ─────────────────────────────────────────────────────
        .route("/api/positions",       post(record_position))
        .route("/api/positions",       get(list_positions))
        .route("/api/positions",       delete(clear_positions))
        .route("/api/positions/live",  get(live_positions))
        .route("/api/positions/:id",   delete(delete_position))
        // ── Settings ──────────────────────────────────────────────────────────
        .route("/api/settings",        get(get_settings))
        .route("/api/settings",        put(update_settings))
        // ── Monitor Loop ──────────────────────────────────────────────────────
        .route("/ws/monitor",          get(ws_monitor))
        .route("/api/monitor/stats",   get(get_stats))
        .route("/api/health",          get(health_check))
        // ── Middleware ────────────────────────────────────────────────────────
        .layer(axum::middleware::from_fn(require_api_key))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::util::ServiceExt;

    fn json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_and_stats_answer() {
        let app = build_router(state::build_state());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/api/monitor/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn record_then_list_through_the_router() {
        let app = build_router(state::build_state());

        let body = r#"{"ticker":"AAPL","entry_price":150.0,"budget":10000.0,
                       "risk_percent":5.0,"reward_ratio":3.0}"#;
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/positions", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(Request::builder().uri("/api/positions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn preview_with_insufficient_input_is_still_ok() {
        let app = build_router(state::build_state());

        let body = r#"{"ticker":"AAPL","entry_price":0.0,"reward_ratio":3.0}"#;
        let response = app
            .oneshot(json_request(Method::POST, "/api/plan/preview", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn deleting_unknown_position_is_404() {
        let app = build_router(state::build_state());

        let uri = format!("/api/positions/{}", uuid::Uuid::new_v4());
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
