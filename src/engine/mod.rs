//! # engine
//!
//! แกนคำนวณของ R-Logic — sizer และ monitor เป็น pure function ล้วน,
//! quotes เป็น I/O ชั้นเดียวที่ engine แตะ

pub mod monitor;
pub mod quotes;
pub mod sizer;
