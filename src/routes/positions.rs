//! # routes::positions
//!
//! **Position Book API** — record, list, live refresh, delete
//!
//! | Method | Path                  | Description                               |
//! |--------|-----------------------|-------------------------------------------|
//! | POST   | `/api/positions`      | คำนวณ + validate + บันทึก Position ใหม่   |
//! | GET    | `/api/positions`      | Book ดิบ + total open risk                |
//! | GET    | `/api/positions/live` | Book + ราคาสด + unrealized P/L + R        |
//! | DELETE | `/api/positions/:id`  | ลบ Position ตัวเดียว                      |
//! | DELETE | `/api/positions`      | ล้าง Book ทั้งหมด                         |

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    engine::{monitor, quotes},
    error::AppError,
    events::WsEvent,
    models::{PlanRequest, Position},
    routes::plan::resolve_plan,
    state::SharedState,
};

// ─── POST /api/positions ──────────────────────────────────────────────────────

/// **Record action** — คำนวณ sizing ฝั่ง Server เสมอ (ไม่เชื่อตัวเลขจาก
/// Client) แล้วถึงบันทึกเข้า Book
pub async fn record_position(
    State(state): State<SharedState>,
    Json(request): Json<PlanRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.calc_count.fetch_add(1, Ordering::Relaxed);

    // ── 1. Validate trade idea ───────────────────────────────────────────────
    let ticker = request.normalized_ticker();
    if ticker.is_empty() {
        return Err(AppError::BadRequest("ticker must not be empty".into()));
    }

    let settings = { *state.settings.read().await };
    let risk_percent = request.risk_percent.unwrap_or(settings.default_risk_pct);
    if !risk_percent.is_finite() || risk_percent <= 0.0 || risk_percent > 100.0 {
        return Err(AppError::BadRequest(format!(
            "risk_percent must be in (0, 100], got {risk_percent}"
        )));
    }

    if !request.reward_ratio.is_finite() || request.reward_ratio <= 0.0 {
        return Err(AppError::BadRequest(format!(
            "reward_ratio must be positive, got {}", request.reward_ratio
        )));
    }

    if let Some(stop) = request.stop_loss {
        if stop >= request.entry_price {
            return Err(AppError::BadRequest(
                "stop-loss must be below entry price".into(),
            ));
        }
    }

    // ── 2. Size ───────────────────────────────────────────────────────────────
    let breakdown = resolve_plan(&request, &settings).ok_or_else(|| {
        AppError::BadRequest(
            "insufficient input: entry price and budget must be positive".into(),
        )
    })?;

    // Position 0 หุ้นไม่มีความหมายใน Book — reject ตรงนี้ (preview ยังคืนได้)
    if breakdown.shares == 0 {
        return Err(AppError::BadRequest(
            "computed share count is zero — raise the budget or widen the risk".into(),
        ));
    }

    // ── 3. Build record ───────────────────────────────────────────────────────
    if state.has_position_for(&ticker).await {
        // อนุญาต — Book รองรับหลาย lot ต่อ ticker แค่บอกไว้ใน log
        info!(ticker = %ticker, "Ticker already in book — recording an additional lot");
    }

    let owner = request.owner.clone().unwrap_or_else(|| "local".to_string());
    let position = Position::from_breakdown(ticker, request.entry_price, &breakdown, owner);

    // ── 4. Append to book + mirror ────────────────────────────────────────────
    state.push_position(position.clone()).await;

    #[cfg(feature = "postgres")]
    crate::db::mirror_insert(&state, &position).await;

    // ── 5. Broadcast ──────────────────────────────────────────────────────────
    state.broadcast(&WsEvent::PositionRecorded {
        position: Box::new(position.clone()),
    });

    info!(
        position_id = %position.position_id,
        ticker      = %position.ticker,
        quantity    = position.quantity,
        risk        = position.risk_amount,
        "📌 [BOOK] Position recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "ok":       true,
            "position": position,
            "message":  "Position recorded — Monitor Loop will pick it up.",
        })),
    ))
}

// ─── GET /api/positions ───────────────────────────────────────────────────────

/// ดู Book ดิบ (ไม่มีการยิง Quote)
pub async fn list_positions(
    State(state): State<SharedState>,
) -> impl IntoResponse {
    let book = state.book_snapshot().await;
    let total_open_risk = monitor::total_open_risk(&book);

    Json(json!({
        "ok":              true,
        "count":           book.len(),
        "total_open_risk": total_open_risk,
        "positions":       book,
    }))
}

// ─── GET /api/positions/live ──────────────────────────────────────────────────

/// **Refresh pass** — ดึงราคาหนึ่งครั้งต่อ ticker แล้วประเมินทุก Position
///
/// Quote fetch ล้มเหลว = แถวนั้นเป็น placeholder (`null` ทุกฟิลด์ live)
/// ไม่มี retry — รอรอบถัดไป
pub async fn live_positions(
    State(state): State<SharedState>,
) -> impl IntoResponse {
    state.refresh_count.fetch_add(1, Ordering::Relaxed);

    let book = state.book_snapshot().await;

    // ── ราคาต่อ ticker — fetch ครั้งเดียวต่อรอบ ทิ้งทันทีที่จบรอบ ──────────────
    let mut prices: HashMap<String, Option<f64>> = HashMap::new();
    for position in &book {
        if prices.contains_key(&position.ticker) {
            continue;
        }
        let price = match quotes::fetch_quote(
            &state.http_client,
            &state.quote_base_url,
            &position.ticker,
        )
        .await
        {
            Ok(quote) => Some(quote.price),
            Err(e) => {
                warn!(ticker = %position.ticker, error = %e, "Quote unavailable — placeholder row");
                None
            }
        };
        prices.insert(position.ticker.clone(), price);
    }

    // ── ประเมินทีละตัวด้วยราคาที่ได้ ──────────────────────────────────────────
    let total_open_risk = monitor::total_open_risk(&book);
    let snapshots: Vec<_> = book
        .into_iter()
        .map(|position| {
            let price = prices.get(&position.ticker).copied().flatten();
            monitor::snapshot(position, price)
        })
        .collect();

    let priced_count        = snapshots.iter().filter(|s| s.quote_price.is_some()).count();
    let total_unrealized_pl = monitor::total_unrealized_pl(&snapshots);

    state.broadcast(&WsEvent::BookRefreshed {
        position_count: snapshots.len(),
        priced_count,
        total_open_risk,
        total_unrealized_pl,
    });

    Json(json!({
        "ok":                  true,
        "count":               snapshots.len(),
        "priced_count":        priced_count,
        "total_open_risk":     total_open_risk,
        "total_unrealized_pl": total_unrealized_pl,
        "positions":           snapshots,
    }))
}

// ─── DELETE /api/positions/:id ────────────────────────────────────────────────

/// ลบ Position ตัวเดียวตาม id
pub async fn delete_position(
    State(state): State<SharedState>,
    Path(position_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let removed = state
        .remove_position(position_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No position with id {position_id}")))?;

    #[cfg(feature = "postgres")]
    crate::db::mirror_delete(&state, position_id).await;

    state.broadcast(&WsEvent::PositionDeleted {
        position_id,
        ticker: removed.ticker.clone(),
    });

    info!(
        position_id = %position_id,
        ticker      = %removed.ticker,
        "🗑️ [BOOK] Position deleted"
    );

    Ok(Json(json!({
        "ok":      true,
        "deleted": removed,
    })))
}

// ─── DELETE /api/positions ────────────────────────────────────────────────────

/// ล้าง Book ทั้งหมด (ปุ่ม "เริ่มใหม่" ของ Dashboard)
pub async fn clear_positions(
    State(state): State<SharedState>,
) -> impl IntoResponse {
    let removed = state.clear_positions().await;

    #[cfg(feature = "postgres")]
    crate::db::mirror_clear(&state).await;

    state.broadcast(&WsEvent::PositionsCleared { removed });

    info!(removed, "🗑️ [BOOK] Book cleared");

    Json(json!({
        "ok":      true,
        "removed": removed,
        "message": format!("Cleared {removed} position(s) from the book."),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(ticker: &str, entry: f64) -> PlanRequest {
        PlanRequest {
            ticker: ticker.into(),
            entry_price: entry,
            budget: Some(10_000.0),
            risk_percent: Some(5.0),
            reward_ratio: 3.0,
            stop_loss: None,
            owner: None,
        }
    }

    #[tokio::test]
    async fn record_appends_and_uppercases() {
        let state = crate::state::build_state();

        let response = record_position(State(state.clone()), Json(request("aapl", 150.0)))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let book = state.book_snapshot().await;
        assert_eq!(book.len(), 1);
        assert_eq!(book[0].ticker, "AAPL");
        assert_eq!(book[0].quantity, 66);
        assert!(book[0].stop_loss < book[0].entry_price);
        assert!(book[0].entry_price < book[0].target_price);
    }

    #[tokio::test]
    async fn record_rejects_bad_ideas() {
        let state = crate::state::build_state();

        // Ticker ว่าง
        let err = record_position(State(state.clone()), Json(request("  ", 150.0)))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::BadRequest(_)));

        // Risk เกินช่วง
        let mut bad_risk = request("AAPL", 150.0);
        bad_risk.risk_percent = Some(150.0);
        let err = record_position(State(state.clone()), Json(bad_risk)).await.err().unwrap();
        assert!(matches!(err, AppError::BadRequest(_)));

        // Stop อยู่เหนือ entry
        let mut bad_stop = request("AAPL", 150.0);
        bad_stop.stop_loss = Some(151.0);
        let err = record_position(State(state.clone()), Json(bad_stop)).await.err().unwrap();
        assert!(matches!(err, AppError::BadRequest(_)));

        // Entry เป็นศูนย์ → insufficient input
        let err = record_position(State(state.clone()), Json(request("AAPL", 0.0)))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::BadRequest(_)));

        assert!(state.book_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn delete_missing_position_is_not_found() {
        let state = crate::state::build_state();
        let err = delete_position(State(state), Path(Uuid::new_v4())).await.err().unwrap();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn live_refresh_uses_mock_quotes() {
        // QUOTE_BASE_URL ไม่ได้ตั้งใน test env → state ใช้ "mock" (ราคา 100)
        let state = crate::state::build_state();
        assert_eq!(state.quote_base_url, "mock");

        record_position(State(state.clone()), Json(request("AAPL", 80.0)))
            .await
            .unwrap();

        let response = live_positions(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.refresh_count.load(Ordering::Relaxed), 1);
    }
}
