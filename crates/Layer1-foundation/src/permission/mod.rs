//! Permission system for HostWarden
//!
//! - `types`: Role, Capability, CapabilitySet, UserRecord
//! - `registry`: 사용자 테이블 관리 + JSON 저장 (PermissionRegistry)
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use warden_foundation::permission::{Capability, PermissionRegistry, Role};
//!
//! let registry = PermissionRegistry::open(&path, "123456")?;
//! registry.add_user("777", "alice", Role::Admin)?;
//!
//! match registry.capabilities("777") {
//!     Some(caps) if caps.allows(Capability::ExecuteCommands) => { /* 실행 */ }
//!     Some(_) => { /* 권한 부족 */ }
//!     None => { /* 미등록 */ }
//! }
//! ```

mod registry;
mod types;

pub use registry::{PermissionRegistry, USERS_FILE};
pub use types::{Capability, CapabilitySet, Role, UserRecord};
