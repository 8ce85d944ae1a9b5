//! warden-gate: Request pipeline for HostWarden
//!
//! Layer3 - 메시징 채널과 코어 사이의 경계
//!
//! # 주요 모듈
//!
//! - `transport`: 메시징 채널 추상화 (`Transport`, `InboundMessage`)
//! - `delivery`: 재시도가 붙은 send/edit
//! - `gate`: 인증 → 인가 → 확인 메시지 → 처리기 → 응답 (`RequestGate`)
//! - `commands`: 명령 이름과 필요한 권한
//! - `dispatch`: 명령별 처리기 (`Dispatcher`)
//! - `session`: 터미널 모드, 환영 메시지 플래그
//! - `monitor`: 주기적 리소스 알림 작업 (`AlertMonitor`)
//!
//! # 사용 예시
//!
//! ```ignore
//! let delivery = Arc::new(Delivery::new(transport, RetryPolicy::default()));
//! let dispatcher = Arc::new(Dispatcher::new(session, registry.clone(), alerts.clone(), bounds));
//! let gate = RequestGate::new(registry, alerts, delivery, dispatcher, GateConfig::default());
//!
//! match gate.handle(message).await {
//!     GateOutcome::Delivered => {}
//!     GateOutcome::Denied(reason) => tracing::warn!("denied: {}", reason),
//!     GateOutcome::Failed(msg) => tracing::error!("failed: {}", msg),
//! }
//! ```

pub mod commands;
pub mod delivery;
pub mod dispatch;
pub mod gate;
pub mod handler;
pub mod monitor;
pub mod session;
pub mod transport;

pub use commands::Command;
pub use delivery::{Delivery, RetryPolicy};
pub use dispatch::{help_text, Dispatcher, OutputBounds};
pub use gate::{GateConfig, GateOutcome, RequestGate};
pub use handler::{Handler, HandlerError, HandlerReply, RequestContext};
pub use monitor::AlertMonitor;
pub use session::SessionContext;
pub use transport::{InboundMessage, MessageHandle, Transport, TransportError};
