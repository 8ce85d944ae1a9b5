//! Alert Monitor - 주기적 리소스 점검 백그라운드 작업
//!
//! 명시적 취소로만 끝난다. `shutdown()`은 취소 후 작업이 끝날 때까지 기다리므로
//! 호출 이후에는 전송 계층을 정리해도 알림이 쓰이지 않는다.

use crate::delivery::Delivery;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use warden_core::AlertEngine;

pub struct AlertMonitor {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl AlertMonitor {
    /// Start the check loop; alerts go to `chat_id`
    pub fn spawn(
        engine: Arc<AlertEngine>,
        delivery: Arc<Delivery>,
        chat_id: String,
        interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Alert monitor started (every {:?})", interval);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = timer.tick() => {}
                }

                let check = Arc::clone(&engine);
                let alert = match tokio::task::spawn_blocking(move || check.check_system_resources())
                    .await
                {
                    Ok(alert) => alert,
                    Err(e) => {
                        error!("Resource check failed: {}", e);
                        continue;
                    }
                };

                let Some(alert) = alert else {
                    debug!("Completed resource check cycle");
                    continue;
                };

                let text = alert.render();
                tokio::select! {
                    _ = token.cancelled() => break,
                    delivered = delivery.notify(&chat_id, &text) => {
                        if !delivered {
                            warn!("{} alert dropped", alert.category);
                        }
                    }
                }
            }

            info!("Alert monitor stopped");
        });

        Self { cancel, handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Cancel the loop and wait for it to exit
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                error!("Alert monitor panicked: {}", e);
            }
        }
    }
}
