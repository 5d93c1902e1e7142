//! # routes::plan
//!
//! Axum route handlers สำหรับ Planner (preview — คำนวณอย่างเดียว ไม่บันทึก)
//!
//! | Method | Path                | Description                          |
//! |--------|---------------------|--------------------------------------|
//! | POST   | `/api/plan/preview` | คำนวณ sizing จาก trade idea หนึ่งตัว |

use axum::{
    extract::State,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::debug;

use crate::{
    engine::sizer,
    models::{PlanRequest, PlannerSettings, SizingBreakdown},
    state::SharedState,
};

// ─── Plan Resolution ──────────────────────────────────────────────────────────

/// เติมค่าที่ขาดจาก Settings แล้วเลือกสูตรตามว่ามี stop_loss มาไหม
///
/// `None` = insufficient input (ไม่ใช่ error — caller ตัดสินใจเองว่าจะ
/// ตอบ null หรือ reject)
pub(crate) fn resolve_plan(
    request: &PlanRequest,
    settings: &PlannerSettings,
) -> Option<SizingBreakdown> {
    let budget       = request.budget.unwrap_or(settings.equity);
    let risk_percent = request.risk_percent.unwrap_or(settings.default_risk_pct);

    match request.stop_loss {
        // Stop ผู้ใช้กำหนดเอง → risk-capped + commission/slippage
        Some(stop) => sizer::size_from_stop(
            request.entry_price,
            stop,
            budget,
            risk_percent,
            request.reward_ratio,
            settings.commission,
            settings.slippage,
        ),
        // Stop คำนวณจาก risk % → budget-capped
        None => sizer::size(
            request.entry_price,
            budget,
            risk_percent,
            request.reward_ratio,
        ),
    }
}

// ─── POST /api/plan/preview ───────────────────────────────────────────────────

/// คำนวณ sizing หนึ่งรอบ — ไม่มีการแตะ Book
///
/// Input ไม่พอคำนวณ = `result: null` + reason (HTTP 200) — ไม่ใช่ error
pub async fn preview_plan(
    State(state): State<SharedState>,
    Json(request): Json<PlanRequest>,
) -> impl IntoResponse {
    state.calc_count.fetch_add(1, Ordering::Relaxed);

    let settings = { *state.settings.read().await };

    match resolve_plan(&request, &settings) {
        Some(breakdown) => Json(json!({
            "ok":     true,
            "ticker": request.normalized_ticker(),
            "result": breakdown,
        })),
        None => {
            debug!(
                ticker = %request.ticker,
                entry  = request.entry_price,
                "Preview with insufficient input — returning null result"
            );
            Json(json!({
                "ok":     true,
                "ticker": request.normalized_ticker(),
                "result": null,
                "reason": "insufficient input: entry price and budget must be positive \
                           (and stop-loss below entry price)",
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(entry: f64, budget: Option<f64>) -> PlanRequest {
        PlanRequest {
            ticker: "aapl".into(),
            entry_price: entry,
            budget,
            risk_percent: Some(5.0),
            reward_ratio: 3.0,
            stop_loss: None,
            owner: None,
        }
    }

    #[test]
    fn resolve_falls_back_to_settings_equity() {
        let settings = PlannerSettings { equity: 10_000.0, ..Default::default() };

        let explicit = resolve_plan(&request(150.0, Some(10_000.0)), &settings).unwrap();
        let fallback = resolve_plan(&request(150.0, None), &settings).unwrap();
        assert_eq!(explicit, fallback);
        assert_eq!(fallback.shares, 66);
    }

    #[test]
    fn resolve_switches_policy_on_explicit_stop() {
        let settings = PlannerSettings {
            equity: 10_000.0,
            default_risk_pct: 1.0,
            commission: 5.0,
            slippage: 0.01,
        };
        let mut req = request(150.0, None);
        req.risk_percent = None;
        req.reward_ratio = 2.0;
        req.stop_loss = Some(145.0);

        let b = resolve_plan(&req, &settings).unwrap();
        assert_eq!(b.shares, 18);          // (100 - 5) / 5.01
        assert_eq!(b.stop_loss, 145.0);    // stop ตามที่ผู้ใช้เลือก ไม่ derive ใหม่
    }

    #[test]
    fn resolve_yields_none_on_missing_budget() {
        let settings = PlannerSettings { equity: 0.0, ..Default::default() };
        assert!(resolve_plan(&request(150.0, None), &settings).is_none());
    }

    #[tokio::test]
    async fn preview_counts_calculations() {
        let state = crate::state::build_state();
        let _ = preview_plan(State(state.clone()), Json(request(150.0, Some(10_000.0)))).await;
        let _ = preview_plan(State(state.clone()), Json(request(0.0, None))).await;
        assert_eq!(state.calc_count.load(Ordering::Relaxed), 2);
    }
}
