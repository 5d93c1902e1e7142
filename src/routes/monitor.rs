//! # routes::monitor
//!
//! **Monitor Loop** — Endpoints สำหรับ Dashboard
//!
//! ## Endpoints
//!
//! | Method    | Path                 | Description                          |
//! |-----------|----------------------|--------------------------------------|
//! | GET (WS)  | `/ws/monitor`        | WebSocket real-time event stream     |
//! | GET       | `/api/monitor/stats` | calc_count, refresh_count, book size |
//! | GET       | `/api/health`        | Liveness (ไม่ต้อง Auth)              |

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    Json,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::{debug, info};

use crate::{engine::monitor, events::WsEvent, state::SharedState};

// ─── WebSocket Handler ────────────────────────────────────────────────────────

/// Upgrade HTTP → WebSocket แล้ว subscribe broadcast channel
///
/// Dashboard ต่อที่ `ws://localhost:3000/ws/monitor`
/// ทุก WsEvent จะถูกส่งมาเป็น JSON text frame
pub async fn ws_monitor(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: SharedState) {
    let mut rx = state.broadcast_tx.subscribe();
    let (mut sender, mut receiver) = socket.split();

    info!("🔌 WebSocket client connected");

    // ── ส่ง Snapshot ปัจจุบันทันทีที่ต่อ ─────────────────────────────────────
    let snapshot = {
        let positions = state.book_snapshot().await;
        let settings  = { *state.settings.read().await };
        let calcs     = state.calc_count.load(Ordering::Relaxed);
        let refreshes = state.refresh_count.load(Ordering::Relaxed);

        json!({
            "event":           "SNAPSHOT",
            "positions":       positions,
            "total_open_risk": monitor::total_open_risk(&positions),
            "settings":        settings,
            "calc_count":      calcs,
            "refresh_count":   refreshes,
        })
        .to_string()
    };

    if sender.send(Message::Text(snapshot.into())).await.is_err() {
        return; // Client ปิดก่อน snapshot ส่งได้
    }

    // ── Event Loop ────────────────────────────────────────────────────────────
    loop {
        tokio::select! {
            // รับ Event จาก broadcast channel → ส่งต่อไป WebSocket client
            result = rx.recv() => {
                match result {
                    Ok(json_str) => {
                        if sender.send(Message::Text(json_str.into())).await.is_err() {
                            break; // Client disconnect
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        // Client read ช้าเกินไป — บาง Event ถูก skip
                        debug!("WS client lagged, skipped {n} events");
                    }
                    Err(_) => break, // Channel closed
                }
            }

            // รับ Message จาก Client (Ping / Close)
            result = receiver.next() => {
                match result {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    _ => {} // Text/Binary from client — ignored for now
                }
            }
        }
    }

    info!("🔌 WebSocket client disconnected");
}

// ─── REST Monitoring Endpoints ────────────────────────────────────────────────

/// GET /api/monitor/stats — สถิติ Server
pub async fn get_stats(
    State(state): State<SharedState>,
) -> impl IntoResponse {
    let calc_count     = state.calc_count.load(Ordering::Relaxed);
    let refresh_count  = state.refresh_count.load(Ordering::Relaxed);
    let book           = state.book_snapshot().await;
    let position_count = book.len();

    // Broadcast stats event ไปด้วยทุกครั้งที่มีคน poll
    state.broadcast(&WsEvent::ServerStats {
        calc_count,
        refresh_count,
        position_count,
    });

    Json(json!({
        "ok":              true,
        "calc_count":      calc_count,
        "refresh_count":   refresh_count,
        "position_count":  position_count,
        "total_open_risk": monitor::total_open_risk(&book),
    }))
}

/// GET /api/health — Liveness probe (auth-exempt)
pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    let position_count = state.book_snapshot().await.len();

    Json(json!({
        "ok":             true,
        "service":        "rlogic",
        "position_count": position_count,
    }))
}
