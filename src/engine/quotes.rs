//! # engine::quotes
//!
//! **Quote Fetcher** — ดึงราคาสดจาก Quote Provider ผ่าน HTTP
//!
//! ## Provider API Contract
//! Provider ต้องรับ GET `/quote/{symbol}` และคืน JSON:
//! ```json
//! { "symbol": "AAPL", "price": 187.32, "time": "2024-05-01T13:30:00Z" }
//! ```
//!
//! ล้มเหลว = ล้มเหลว — ไม่มี retry, ไม่มี cache ข้ามรอบ. Caller แสดง
//! placeholder แล้วรอ Refresh ถัดไป

use tracing::{error, info, warn};

use crate::error::AppError;
use crate::models::LiveQuote;

/// Price the mock provider answers for every symbol (dev mode).
const MOCK_PRICE: f64 = 100.0;

// ─── Fetch One Quote ──────────────────────────────────────────────────────────

/// Fetch the current price for one symbol.
///
/// คืน `LiveQuote` ถ้าสำเร็จ, `AppError::QuoteError` ถ้าล้มเหลว
pub async fn fetch_quote(
    client: &reqwest::Client,
    quote_base_url: &str,
    symbol: &str,
) -> Result<LiveQuote, AppError> {
    if quote_base_url == "mock" {
        info!(symbol, "🎭 [QUOTES] Running in MOCK mode — simulating provider");
        return Ok(LiveQuote {
            symbol: symbol.to_string(),
            price:  MOCK_PRICE,
            time:   None,
        });
    }

    let url = format!("{quote_base_url}/quote/{symbol}");

    // ── HTTP GET ──────────────────────────────────────────────────────────────
    let response = client
        .get(&url)
        .timeout(std::time::Duration::from_secs(5))   // ห้ามรอนานกว่า 5 วิ
        .send()
        .await
        .map_err(|e| {
            error!(symbol, error = %e, "Quote provider unreachable");
            AppError::QuoteError(format!("Quote provider unreachable: {e}"))
        })?;

    // ── HTTP Status ───────────────────────────────────────────────────────────
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!(symbol, http_status = %status, body = %body, "Quote provider returned HTTP error");
        return Err(AppError::QuoteError(
            format!("Quote provider HTTP {status}: {body}")
        ));
    }

    // ── Parse Response ────────────────────────────────────────────────────────
    let quote: LiveQuote = response
        .json()
        .await
        .map_err(|e| {
            error!(symbol, error = %e, "Quote response parse failed");
            AppError::QuoteError(format!("Quote response parse error: {e}"))
        })?;

    // ── Sanity check ──────────────────────────────────────────────────────────
    // ราคา 0 / ติดลบ / NaN ใช้คำนวณ P/L ไม่ได้ — ถือว่า fetch ล้มเหลว
    if !quote.price.is_finite() || quote.price <= 0.0 {
        let msg = format!("Quote provider returned unusable price: {}", quote.price);
        warn!(symbol, "{msg}");
        return Err(AppError::QuoteError(msg));
    }

    Ok(quote)
}
