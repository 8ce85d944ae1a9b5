//! Storage module for HostWarden
//!
//! - `json`: JSON - 범용 파일 저장/로드 (원자적 저장)

mod json;

// JSON Storage (범용)
pub use json::{JsonStore, APP_DIR};
