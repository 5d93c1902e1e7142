//! # db — PostgreSQL Mirror Layer
//!
//! ใช้ `sqlx` สำหรับ async PostgreSQL — Book ใน memory เป็นแหล่งความจริงหลัก
//! ตารางนี้เป็นกระจกเงา: insert ตอน record, delete ตอนลบ, seed กลับตอน Startup
//!
//! Mirror ล้มเหลว = log + ทำงานต่อ — ไม่มี retry, Book ไม่สะดุด
//!
//! ## Setup
//! 1. ติดตั้ง PostgreSQL และสร้าง database
//! 2. ตั้ง `DATABASE_URL` ใน `.env`
//! 3. `cargo run --features postgres`

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::Position;
use crate::state::AppState;

// ─── Pool Init ────────────────────────────────────────────────────────────────

/// สร้าง PgPool และ run migration
pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    run_migrations(&pool).await?;

    info!("✅ PostgreSQL connected and migrations applied");
    Ok(pool)
}

async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    // Embedded migration SQL
    sqlx::query(include_str!("../migrations/001_init.sql"))
        .execute(pool)
        .await
        .context("Failed to run migration 001_init.sql")?;

    Ok(())
}

// ─── Positions ────────────────────────────────────────────────────────────────

/// บันทึก Position ลง PostgreSQL
pub async fn insert_position(pool: &PgPool, position: &Position) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO positions
          (position_id, ticker, entry_price, stop_loss, target_price,
           quantity, risk_amount, total_cost, owner, purchase_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (position_id) DO NOTHING
        "#,
    )
    .bind(position.position_id)
    .bind(&position.ticker)
    .bind(position.entry_price)
    .bind(position.stop_loss)
    .bind(position.target_price)
    .bind(position.quantity as i64)
    .bind(position.risk_amount)
    .bind(position.total_cost)
    .bind(&position.owner)
    .bind(position.purchase_date)
    .execute(pool)
    .await
    .context("insert_position failed")?;

    Ok(())
}

/// ลบ Position ออกจาก PostgreSQL
pub async fn delete_position(pool: &PgPool, position_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM positions WHERE position_id = $1")
        .bind(position_id)
        .execute(pool)
        .await
        .context("delete_position failed")?;

    Ok(())
}

/// ล้างตารางทั้งหมด (คู่กับปุ่ม clear ของ Dashboard)
pub async fn clear_positions(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM positions")
        .execute(pool)
        .await
        .context("clear_positions failed")?;

    Ok(())
}

/// โหลด Book ทั้งหมดเพื่อ seed in-memory state ตอน Startup (เก่า → ใหม่)
pub async fn load_positions(pool: &PgPool) -> anyhow::Result<Vec<Position>> {
    let rows = sqlx::query_as::<_, PositionRow>(
        r#"
        SELECT position_id, ticker, entry_price, stop_loss, target_price,
               quantity, risk_amount, total_cost, owner, purchase_date
        FROM positions
        ORDER BY purchase_date ASC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("load_positions failed")?;

    Ok(rows.into_iter().map(Position::from).collect())
}

#[derive(sqlx::FromRow)]
struct PositionRow {
    position_id:   Uuid,
    ticker:        String,
    entry_price:   f64,
    stop_loss:     f64,
    target_price:  f64,
    quantity:      i64,
    risk_amount:   f64,
    total_cost:    f64,
    owner:         String,
    purchase_date: chrono::DateTime<chrono::Utc>,
}

impl From<PositionRow> for Position {
    fn from(row: PositionRow) -> Self {
        Position {
            position_id:   row.position_id,
            ticker:        row.ticker,
            entry_price:   row.entry_price,
            stop_loss:     row.stop_loss,
            target_price:  row.target_price,
            quantity:      row.quantity.max(0) as u64,
            risk_amount:   row.risk_amount,
            total_cost:    row.total_cost,
            owner:         row.owner,
            purchase_date: row.purchase_date,
        }
    }
}

// ─── Mirror Helpers (best-effort, ไม่ block Book) ─────────────────────────────

pub async fn mirror_insert(state: &AppState, position: &Position) {
    let Some(pool) = &state.pool else { return };
    if let Err(e) = insert_position(pool, position).await {
        warn!(
            position_id = %position.position_id,
            error = %e,
            "⚠️ PostgreSQL mirror insert failed — book stays in-memory"
        );
    }
}

pub async fn mirror_delete(state: &AppState, position_id: Uuid) {
    let Some(pool) = &state.pool else { return };
    if let Err(e) = delete_position(pool, position_id).await {
        warn!(position_id = %position_id, error = %e, "⚠️ PostgreSQL mirror delete failed");
    }
}

pub async fn mirror_clear(state: &AppState) {
    let Some(pool) = &state.pool else { return };
    if let Err(e) = clear_positions(pool).await {
        warn!(error = %e, "⚠️ PostgreSQL mirror clear failed");
    }
}
