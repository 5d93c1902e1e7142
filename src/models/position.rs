//! # models::position
//!
//! Defines structs for the **position book** — the list of recorded open
//! positions the Monitor Loop redisplays with live P/L.
//!
//! ## Why two structs?
//! `Position`         = สิ่งที่ persist จริง (สร้างครั้งเดียว ไม่แก้ไข ลบได้อย่างเดียว)
//! `PositionSnapshot` = `Position` + ราคาล่าสุด + P/L ที่คำนวณสดต่อ Refresh

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::SizingBreakdown;

// ─── Position ─────────────────────────────────────────────────────────────────

/// One recorded position.
///
/// สร้างตอนกด "record" เท่านั้น หลังจากนั้นห้ามแก้ไข —
/// เปลี่ยนแผน = ลบแล้วบันทึกใหม่
///
/// Invariant (ตรวจตอน record): `stop_loss < entry_price < target_price`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// ID ภายในของ Position นี้
    pub position_id: Uuid,
    pub ticker: String,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub target_price: f64,
    pub quantity: u64,
    /// เงินที่เสี่ยงจริงถ้าโดน Stop (1R)
    pub risk_amount: f64,
    /// ทุนที่ใช้เปิด Position (`quantity * entry_price`)
    pub total_cost: f64,
    /// Owner identity — ระบบ Auth จริงอยู่นอก Backend นี้
    pub owner: String,
    pub purchase_date: DateTime<Utc>,
}

impl Position {
    /// Assemble a new record from a validated sizing result.
    pub fn from_breakdown(
        ticker: String,
        entry_price: f64,
        breakdown: &SizingBreakdown,
        owner: String,
    ) -> Self {
        Self {
            position_id: Uuid::new_v4(),
            ticker,
            entry_price,
            stop_loss:    breakdown.stop_loss,
            target_price: breakdown.target_price,
            quantity:     breakdown.shares,
            risk_amount:  breakdown.risk_amount,
            total_cost:   breakdown.total_cost,
            owner,
            purchase_date: Utc::now(),
        }
    }

    /// Distance from entry to stop — the per-share risk this position was
    /// sized against. 0.0 for a degenerate stop equal to entry.
    #[inline]
    pub fn risk_per_share(&self) -> f64 {
        self.entry_price - self.stop_loss
    }
}

// ─── PositionSnapshot ─────────────────────────────────────────────────────────

/// One row of the live dashboard: the stored record plus whatever the last
/// refresh pass could compute for it.
///
/// `None` ทั้งสามฟิลด์ = Quote fetch ล้มเหลว → Dashboard แสดง placeholder
/// (ห้ามเรียก LiveMonitor ด้วยราคาที่ไม่มีจริง)
#[derive(Debug, Clone, Serialize)]
pub struct PositionSnapshot {
    pub position: Position,
    /// Last fetched price, if the provider answered this pass.
    pub quote_price: Option<f64>,
    /// `(quote_price - entry) * quantity`
    pub unrealized_pl: Option<f64>,
    /// Unrealized move expressed in R units.
    pub current_r: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breakdown() -> SizingBreakdown {
        SizingBreakdown {
            risk_amount:   500.0,
            shares:        66,
            stop_loss:     142.5,
            target_price:  172.5,
            profit_amount: 1500.0,
            total_cost:    9900.0,
        }
    }

    #[test]
    fn from_breakdown_copies_levels_and_stamps_identity() {
        let p = Position::from_breakdown("AAPL".into(), 150.0, &breakdown(), "local".into());

        assert_eq!(p.ticker, "AAPL");
        assert_eq!(p.quantity, 66);
        assert_eq!(p.stop_loss, 142.5);
        assert_eq!(p.target_price, 172.5);
        assert_eq!(p.risk_amount, 500.0);
        assert!(!p.position_id.is_nil());
        assert!(p.stop_loss < p.entry_price && p.entry_price < p.target_price);
    }

    #[test]
    fn risk_per_share_is_stop_distance() {
        let p = Position::from_breakdown("AAPL".into(), 150.0, &breakdown(), "local".into());
        assert!((p.risk_per_share() - 7.5).abs() < 1e-9);
    }
}
