//! Session context - 프로세스 단위 세션 상태
//!
//! 작업 디렉토리 커서는 executor가 소유하고, 터미널 모드와 환영 메시지 플래그는
//! 원자 변수로 둔다.

use crate::commands::HELP_ENTRIES;
use crate::delivery::Delivery;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use warden_core::CommandExecutor;

pub struct SessionContext {
    executor: Arc<CommandExecutor>,
    terminal_mode: AtomicBool,
    welcome_sent: AtomicBool,
}

impl SessionContext {
    pub fn new(executor: Arc<CommandExecutor>) -> Self {
        Self {
            executor,
            terminal_mode: AtomicBool::new(false),
            welcome_sent: AtomicBool::new(false),
        }
    }

    pub fn executor(&self) -> &Arc<CommandExecutor> {
        &self.executor
    }

    pub fn terminal_mode(&self) -> bool {
        self.terminal_mode.load(Ordering::SeqCst)
    }

    pub fn set_terminal_mode(&self, enabled: bool) {
        self.terminal_mode.store(enabled, Ordering::SeqCst);
        info!(
            "Terminal mode {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    /// Send the startup message once per process
    ///
    /// 실패하면 플래그를 되돌려 다음 호출에서 다시 시도할 수 있다.
    pub async fn send_welcome(&self, delivery: &Delivery, chat_id: &str) -> bool {
        if self.welcome_sent.swap(true, Ordering::SeqCst) {
            return false;
        }
        if delivery.notify(chat_id, &welcome_text()).await {
            info!("Welcome message sent");
            true
        } else {
            self.welcome_sent.store(false, Ordering::SeqCst);
            false
        }
    }
}

fn welcome_text() -> String {
    let mut text = String::from("HostWarden started\n\nReady to receive commands.\n");
    for (name, usage, description) in HELP_ENTRIES {
        if matches!(*name, "run" | "exit" | "info" | "ps" | "net" | "disk") {
            text.push_str(&format!("\n{} - {}", usage, description));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::ExecutorConfig;

    #[test]
    fn test_terminal_mode_toggle() {
        let executor = Arc::new(CommandExecutor::new(
            ExecutorConfig::default(),
            std::env::temp_dir(),
        ));
        let session = SessionContext::new(executor);
        assert!(!session.terminal_mode());
        session.set_terminal_mode(true);
        assert!(session.terminal_mode());
    }

    #[test]
    fn test_welcome_lists_terminal_commands() {
        let text = welcome_text();
        assert!(text.contains("/run"));
        assert!(text.contains("/disk"));
        assert!(!text.contains("/adduser"));
    }
}
