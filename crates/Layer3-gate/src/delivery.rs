//! Delivery - 재시도가 붙은 전송 프리미티브
//!
//! 게이트와 알림 모니터가 같은 경로를 사용한다.
//! 일시적 실패만 재시도하며 재시도 사이 대기는 `tokio::time::sleep`이다.

use crate::transport::{MessageHandle, Transport, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per operation (at least 1)
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Transport wrapper with bounded retry
pub struct Delivery {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl Delivery {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy: RetryPolicy {
                max_retries: policy.max_retries.max(1),
                ..policy
            },
        }
    }

    /// Send, retrying transient failures
    pub async fn send(&self, chat_id: &str, text: &str) -> Result<MessageHandle, TransportError> {
        let mut attempt = 1;
        loop {
            match self.transport.send(chat_id, text).await {
                Ok(handle) => return Ok(handle),
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    debug!(
                        "send to {} failed (attempt {}/{}): {}",
                        chat_id, attempt, self.policy.max_retries, e
                    );
                    attempt += 1;
                    tokio::time::sleep(self.policy.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Edit, retrying transient failures
    ///
    /// `BadRequest` (메시지가 사라진 경우) 는 새 메시지 전송으로 대체한다.
    /// 반환값은 최종 텍스트가 담긴 메시지 핸들이다.
    pub async fn edit(
        &self,
        handle: &MessageHandle,
        text: &str,
    ) -> Result<MessageHandle, TransportError> {
        let mut attempt = 1;
        loop {
            match self.transport.edit(handle, text).await {
                Ok(()) => return Ok(handle.clone()),
                Err(TransportError::BadRequest(reason)) => {
                    warn!(
                        "edit of message {} rejected ({}), sending new message",
                        handle.message_id, reason
                    );
                    return self.send(&handle.chat_id, text).await;
                }
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    debug!(
                        "edit of message {} failed (attempt {}/{}): {}",
                        handle.message_id, attempt, self.policy.max_retries, e
                    );
                    attempt += 1;
                    tokio::time::sleep(self.policy.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Best-effort send, a final failure is logged and swallowed
    pub async fn notify(&self, chat_id: &str, text: &str) -> bool {
        match self.send(chat_id, text).await {
            Ok(_) => true,
            Err(e) => {
                warn!("notification to {} not delivered: {}", chat_id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Fails the first `failures` sends/edits with the given error
    struct FlakyTransport {
        failures: AtomicU32,
        error: TransportError,
        sent: Mutex<Vec<String>>,
        edit_calls: AtomicU32,
    }

    impl FlakyTransport {
        fn new(failures: u32, error: TransportError) -> Self {
            Self {
                failures: AtomicU32::new(failures),
                error,
                sent: Mutex::new(Vec::new()),
                edit_calls: AtomicU32::new(0),
            }
        }

        fn fail(&self) -> Option<TransportError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                Some(self.error.clone())
            } else {
                None
            }
        }
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn send(&self, chat_id: &str, text: &str) -> Result<MessageHandle, TransportError> {
            if let Some(e) = self.fail() {
                return Err(e);
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(text.to_string());
            Ok(MessageHandle::new(chat_id, sent.len().to_string()))
        }

        async fn edit(&self, _handle: &MessageHandle, _text: &str) -> Result<(), TransportError> {
            self.edit_calls.fetch_add(1, Ordering::SeqCst);
            match self.fail() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        async fn delete(&self, _handle: &MessageHandle) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn delivery(transport: Arc<FlakyTransport>, max_retries: u32) -> Delivery {
        Delivery::new(
            transport,
            RetryPolicy {
                max_retries,
                backoff: Duration::from_millis(1),
            },
        )
    }

    #[tokio::test]
    async fn test_send_retries_transient() {
        let transport = Arc::new(FlakyTransport::new(2, TransportError::Timeout("t".into())));
        let delivery = delivery(transport.clone(), 3);

        assert!(delivery.send("1", "hello").await.is_ok());
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_send_gives_up_after_max_retries() {
        let transport = Arc::new(FlakyTransport::new(3, TransportError::Timeout("t".into())));
        let delivery = delivery(transport.clone(), 3);

        let result = delivery.send("1", "hello").await;
        assert!(matches!(result, Err(TransportError::Timeout(_))));
        assert_eq!(transport.failures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_send_does_not_retry_closed() {
        let transport = Arc::new(FlakyTransport::new(1, TransportError::Closed));
        let delivery = delivery(transport.clone(), 3);

        assert_eq!(delivery.send("1", "x").await, Err(TransportError::Closed));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_bad_request_falls_back_to_send() {
        let transport = Arc::new(FlakyTransport::new(1, TransportError::BadRequest("gone".into())));
        let delivery = delivery(transport.clone(), 3);

        let handle = MessageHandle::new("1", "7");
        let new_handle = delivery.edit(&handle, "final").await.unwrap();
        assert_ne!(new_handle, handle);
        assert_eq!(*transport.sent.lock().unwrap(), vec!["final".to_string()]);
        assert_eq!(transport.edit_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_edit_retries_transient() {
        let transport = Arc::new(FlakyTransport::new(1, TransportError::Timeout("t".into())));
        let delivery = delivery(transport.clone(), 3);

        let handle = MessageHandle::new("1", "7");
        assert_eq!(delivery.edit(&handle, "final").await.unwrap(), handle);
        assert_eq!(transport.edit_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_notify_swallows_failure() {
        let transport = Arc::new(FlakyTransport::new(5, TransportError::Timeout("t".into())));
        let delivery = delivery(transport, 2);
        assert!(!delivery.notify("1", "alert").await);
    }
}
