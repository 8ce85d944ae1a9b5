//! Config - 통합 설정 관리
//!
//! - `warden.rs` - WardenConfig 통합 설정 (파일 + 환경 변수)

mod warden;

pub use warden::{
    WardenConfig, ENV_ALLOWED_GROUP, ENV_DENYLIST, ENV_MAX_RETRIES, ENV_OWNER_ID, ENV_TOKEN,
    ENV_USERS_FILE, WARDEN_CONFIG_FILE,
};
