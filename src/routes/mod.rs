//! # routes
//!
//! Axum handlers แยกตาม Loop: plan (Planner), positions (Book),
//! settings, monitor (Dashboard)

pub mod monitor;
pub mod plan;
pub mod positions;
pub mod settings;
