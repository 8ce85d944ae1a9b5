//! # warden-foundation
//!
//! Foundation layer for HostWarden:
//! - Permission: 역할/권한 모델 + 사용자 레지스트리 (PermissionRegistry)
//! - Storage: JsonStore (원자적 저장)
//! - Config: 통합 설정 (WardenConfig)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Request Gate (Layer3)                                  │
//! │        │  principal id                                  │
//! │        ▼                                                │
//! │  PermissionRegistry ── Role ── CapabilitySet            │
//! │        │                                                │
//! │        ▼                                                │
//! │  JsonStore (users.json, config.json)                    │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod permission;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{WardenConfig, WARDEN_CONFIG_FILE};

// ============================================================================
// Permission (권한 시스템)
// ============================================================================
pub use permission::{
    Capability, CapabilitySet, PermissionRegistry, Role, UserRecord, USERS_FILE,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::JsonStore;
