//! # models::quote
//!
//! Defines [`LiveQuote`], the price payload the remote quote provider returns
//! for one symbol.
//!
//! Fetched, never stored: a quote lives exactly as long as the refresh pass
//! that requested it. No price history is retained anywhere in this backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single live price for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveQuote {
    /// The symbol this price belongs to, e.g. `"AAPL"`.
    pub symbol: String,

    /// Last traded / mid price at fetch time.
    pub price: f64,

    /// Provider-side timestamp, if the provider sends one.
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}
