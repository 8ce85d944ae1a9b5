//! Alert module - 리소스/보안 알림
//!
//! - `AlertEngine`: 카테고리별 규칙(활성화, 임계값, 쿨다운)과 점검
//! - `ResourceProbe`: CPU/메모리/디스크 사용률 샘플 소스
//!
//! 점검 한 번에 최대 하나의 알림만 반환한다 (cpu → memory → disk 순서).

mod engine;
mod probe;
mod types;

pub use engine::{AlertEngine, DEFAULT_COOLDOWN, DEFAULT_THRESHOLD};
pub use probe::{ResourceProbe, StaticProbe, SysinfoProbe};
pub use types::{Alert, AlertCategory, AlertRule, Severity, UnknownCategory};
