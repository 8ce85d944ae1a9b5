//! warden-core: Core Runtime for HostWarden
//!
//! Layer2 - 호스트에서 실제로 일을 하는 레이어
//!
//! # 주요 모듈
//!
//! - `executor`: 셸 명령 실행 (denylist, 작업 디렉토리 커서, 출력 상한)
//! - `alert`: 리소스/보안 알림 엔진 (임계값, 쿨다운)
//! - `system`: 호스트 정보 스냅샷 (`sysinfo`)
//!
//! # 사용 예시
//!
//! ```ignore
//! use warden_core::{AlertEngine, CommandExecutor, ExecutorConfig};
//!
//! let executor = CommandExecutor::from_current_dir(ExecutorConfig {
//!     denylist: vec!["shutdown".into()],
//!     ..Default::default()
//! })?;
//! let output = executor.execute("ls -la").await?;
//!
//! let alerts = AlertEngine::new(Duration::from_secs(300));
//! if let Some(alert) = alerts.check_system_resources() {
//!     println!("{}", alert.render());
//! }
//! ```

pub mod alert;
pub mod executor;
pub mod system;

// Re-exports: Executor
pub use executor::{
    strip_ansi, truncate_middle, CommandExecutor, CommandOutput, ExecError, ExecutorConfig,
    ELISION_MARKER,
};

// Re-exports: Alert
pub use alert::{
    Alert, AlertCategory, AlertEngine, AlertRule, ResourceProbe, Severity, StaticProbe,
    SysinfoProbe,
};

// Re-exports: System
pub use system::{DiskSnapshot, NetworkSnapshot, ProcessSnapshot, SystemSnapshot};
