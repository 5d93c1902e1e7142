//! # routes::settings
//!
//! Planner Settings API
//!
//! | Method | Path            | Description                       |
//! |--------|-----------------|-----------------------------------|
//! | GET    | `/api/settings` | ดูค่า Global ปัจจุบัน             |
//! | PUT    | `/api/settings` | แก้บางฟิลด์ (ฟิลด์อื่นคงเดิม)     |

use axum::{
    extract::State,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;

use crate::{
    error::AppError,
    events::WsEvent,
    models::SettingsPatch,
    state::SharedState,
};

/// GET /api/settings — ค่า Global ปัจจุบัน
pub async fn get_settings(
    State(state): State<SharedState>,
) -> impl IntoResponse {
    let settings = { *state.settings.read().await };
    Json(json!({ "ok": true, "settings": settings }))
}

/// PUT /api/settings — partial update, validate ก่อนเขียนจริง
pub async fn update_settings(
    State(state): State<SharedState>,
    Json(patch): Json<SettingsPatch>,
) -> Result<impl IntoResponse, AppError> {
    let current = { *state.settings.read().await };
    let merged = patch.apply(current);

    // ── Validate ──────────────────────────────────────────────────────────────
    if !merged.equity.is_finite() || merged.equity <= 0.0 {
        return Err(AppError::BadRequest(format!(
            "equity must be positive, got {}", merged.equity
        )));
    }
    if !merged.default_risk_pct.is_finite()
        || merged.default_risk_pct <= 0.0
        || merged.default_risk_pct > 100.0
    {
        return Err(AppError::BadRequest(format!(
            "default_risk_pct must be in (0, 100], got {}", merged.default_risk_pct
        )));
    }
    if !merged.commission.is_finite() || merged.commission < 0.0 {
        return Err(AppError::BadRequest(format!(
            "commission must be non-negative, got {}", merged.commission
        )));
    }
    if !merged.slippage.is_finite() || merged.slippage < 0.0 {
        return Err(AppError::BadRequest(format!(
            "slippage must be non-negative, got {}", merged.slippage
        )));
    }

    // ── Commit ────────────────────────────────────────────────────────────────
    {
        let mut guard = state.settings.write().await;
        *guard = merged;
    }

    state.broadcast(&WsEvent::SettingsUpdated { settings: merged });

    info!(
        equity     = merged.equity,
        risk_pct   = merged.default_risk_pct,
        commission = merged.commission,
        slippage   = merged.slippage,
        "⚙️ [SETTINGS] Updated"
    );

    Ok(Json(json!({ "ok": true, "settings": merged })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn patch_updates_only_given_fields() {
        let state = crate::state::build_state();

        let patch = SettingsPatch { equity: Some(50_000.0), ..Default::default() };
        update_settings(State(state.clone()), Json(patch)).await.unwrap();

        let settings = *state.settings.read().await;
        assert_eq!(settings.equity, 50_000.0);
        assert_eq!(settings.commission, 5.0); // ค่าเดิมคงอยู่
    }

    #[tokio::test]
    async fn invalid_patch_leaves_settings_untouched() {
        let state = crate::state::build_state();
        let before = *state.settings.read().await;

        let patch = SettingsPatch { default_risk_pct: Some(0.0), ..Default::default() };
        let err = update_settings(State(state.clone()), Json(patch)).await.err().unwrap();
        assert!(matches!(err, AppError::BadRequest(_)));

        assert_eq!(*state.settings.read().await, before);
    }
}
