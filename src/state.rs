//! # state
//!
//! AppState — Position Book, Planner Settings, WebSocket Broadcast Channel
//! และ shared HTTP Client
//!
//! Book เป็น state เดียวที่ mutable: สร้างด้วย record, หายด้วย delete,
//! ไม่มี update-in-place (เปลี่ยนแผน = ลบแล้ว record ใหม่)

use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::models::{PlannerSettings, Position};

// ─── AppState ─────────────────────────────────────────────────────────────────

/// Top-level shared state injected into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    // ── Position Book ─────────────────────────────────────────────────────────
    /// ทุก Position ที่ record ไว้ เรียงเก่า → ใหม่
    /// แหล่งความจริงหลักคือ in-memory — PostgreSQL เป็นกระจกเงา (ถ้าเปิด feature)
    pub positions: Arc<RwLock<Vec<Position>>>,

    // ── Planner Settings ──────────────────────────────────────────────────────
    /// ค่า Global: equity, default risk %, commission, slippage
    pub settings: Arc<RwLock<PlannerSettings>>,

    // ── Monitor / WebSocket ───────────────────────────────────────────────────
    /// Broadcast channel สำหรับส่ง Event ไปยัง WebSocket clients
    /// ใช้ String (pre-serialized JSON) เพื่อหลีกเลี่ยง Clone constraints
    pub broadcast_tx: broadcast::Sender<String>,

    // ── HTTP Client ───────────────────────────────────────────────────────────
    /// reqwest Client ที่ share กันทั้งระบบ (thread-safe, connection pooling)
    pub http_client: reqwest::Client,

    /// Base URL ของ Quote Provider — `"mock"` = dev mode
    pub quote_base_url: String,

    // ── Metrics ───────────────────────────────────────────────────────────────
    pub calc_count:    Arc<std::sync::atomic::AtomicU64>,
    pub refresh_count: Arc<std::sync::atomic::AtomicU64>,

    // ── Database (optional) ───────────────────────────────────────────────────
    #[cfg(feature = "postgres")]
    pub pool: Option<sqlx::PgPool>,
}

impl AppState {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(256);

        Self {
            positions:      Arc::new(RwLock::new(Vec::new())),
            settings:       Arc::new(RwLock::new(PlannerSettings::from_env())),
            broadcast_tx,
            http_client:    reqwest::Client::new(),
            quote_base_url: std::env::var("QUOTE_BASE_URL")
                .unwrap_or_else(|_| "mock".to_string()),
            calc_count:     Arc::new(std::sync::atomic::AtomicU64::new(0)),
            refresh_count:  Arc::new(std::sync::atomic::AtomicU64::new(0)),
            #[cfg(feature = "postgres")]
            pool:           None,
        }
    }

    /// Attach a PostgreSQL pool (เรียกครั้งเดียวตอน Startup)
    #[cfg(feature = "postgres")]
    pub fn with_pool(mut self, pool: sqlx::PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    // ── Helper Methods ────────────────────────────────────────────────────────

    /// Broadcast WsEvent ไปยัง WebSocket clients ทั้งหมด
    /// ไม่ panic ถ้าไม่มี listener (ปลอดภัยสำหรับ headless mode)
    pub fn broadcast(&self, event: &crate::events::WsEvent) {
        // Err เกิดขึ้นเมื่อไม่มี receiver — ไม่ใช่ error จริงๆ
        let _ = self.broadcast_tx.send(event.to_json());
    }

    /// เพิ่ม Position เข้า Book
    pub async fn push_position(&self, position: Position) {
        let mut book = self.positions.write().await;
        book.push(position);
    }

    /// ลบ Position ตาม id — คืนตัวที่ลบ, `None` ถ้าไม่พบ
    pub async fn remove_position(&self, position_id: Uuid) -> Option<Position> {
        let mut book = self.positions.write().await;
        let index = book.iter().position(|p| p.position_id == position_id)?;
        Some(book.remove(index))
    }

    /// ล้าง Book ทั้งหมด — คืนจำนวนที่ลบไป
    pub async fn clear_positions(&self) -> usize {
        let mut book = self.positions.write().await;
        let removed = book.len();
        book.clear();
        removed
    }

    /// เช็คว่ามี Position ของ ticker นี้อยู่ใน Book ไหม
    pub async fn has_position_for(&self, ticker: &str) -> bool {
        let book = self.positions.read().await;
        book.iter().any(|p| p.ticker == ticker)
    }

    /// Clone Book ออกมาทั้งก้อน (ปล่อย lock ทันที)
    pub async fn book_snapshot(&self) -> Vec<Position> {
        let book = self.positions.read().await;
        book.clone()
    }
}

impl Default for AppState {
    fn default() -> Self { Self::new() }
}

/// Convenience type alias
pub type SharedState = Arc<AppState>;

pub fn build_state() -> SharedState {
    Arc::new(AppState::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SizingBreakdown;

    fn sample_position(ticker: &str) -> Position {
        let breakdown = SizingBreakdown {
            risk_amount:   100.0,
            shares:        10,
            stop_loss:     90.0,
            target_price:  120.0,
            profit_amount: 200.0,
            total_cost:    1000.0,
        };
        Position::from_breakdown(ticker.into(), 100.0, &breakdown, "local".into())
    }

    #[tokio::test]
    async fn push_remove_clear_lifecycle() {
        let state = AppState::new();

        let p = sample_position("AAPL");
        let id = p.position_id;
        state.push_position(p).await;
        state.push_position(sample_position("MSFT")).await;

        assert!(state.has_position_for("AAPL").await);
        assert_eq!(state.book_snapshot().await.len(), 2);

        let removed = state.remove_position(id).await.unwrap();
        assert_eq!(removed.ticker, "AAPL");
        assert!(!state.has_position_for("AAPL").await);

        // ลบซ้ำ → None
        assert!(state.remove_position(id).await.is_none());

        assert_eq!(state.clear_positions().await, 1);
        assert!(state.book_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn broadcast_without_listeners_does_not_panic() {
        let state = AppState::new();
        state.broadcast(&crate::events::WsEvent::PositionsCleared { removed: 0 });
    }
}
