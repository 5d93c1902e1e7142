//! # models
//!
//! Value types ทั้งหมดของระบบ — flat, `Clone`-cheap, serde ตรงไปตรงมา

pub mod plan;
pub mod position;
pub mod quote;
pub mod settings;

pub use plan::{PlanRequest, SizingBreakdown};
pub use position::{Position, PositionSnapshot};
pub use quote::LiveQuote;
pub use settings::{PlannerSettings, SettingsPatch};
