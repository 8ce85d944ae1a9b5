//! Request Gate - 인바운드 요청 하나를 끝까지 책임지는 래퍼
//!
//! ```text
//! Received ─► Authenticated ─► Authorized ─► Acknowledged ─► Executing ─► Delivered
//!    │              │               │                            │
//!    └─ Denied ◄────┴───────────────┘                            └─► Failed (message)
//! ```
//!
//! 모든 경로는 `GateOutcome` 하나로 끝난다. 처리기의 패닉도 경계에서 잡는다.

use crate::commands::Command;
use crate::delivery::Delivery;
use crate::handler::{Handler, HandlerError, HandlerReply, RequestContext};
use crate::transport::{InboundMessage, MessageHandle};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;
use warden_core::{truncate_middle, AlertEngine};
use warden_foundation::PermissionRegistry;

pub const ACCESS_DENIED: &str = "Access denied";
pub const PROCESSING: &str = "Processing your request...";
pub const TIMEOUT_ERROR: &str = "Error: request timed out. Please try again.";
pub const CONNECTION_ERROR: &str = "Connection error. Please try again.";

/// Terminal state of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Rejected before the handler ran
    Denied(String),
    /// Handler reply delivered
    Delivered,
    /// Handler or delivery failed, the message is what the caller was shown
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Handler attempts on transient failure (at least 1)
    pub max_retries: u32,
    /// Group chat accepted besides private chats
    pub allowed_group: Option<String>,
    pub output_limit: usize,
    pub output_keep: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            allowed_group: None,
            output_limit: 4000,
            output_keep: 1500,
        }
    }
}

/// Result of running the handler
enum Completion {
    Replied(HandlerReply),
    Failed(String),
}

pub struct RequestGate {
    registry: Arc<PermissionRegistry>,
    alerts: Arc<AlertEngine>,
    delivery: Arc<Delivery>,
    handler: Arc<dyn Handler>,
    config: GateConfig,
}

impl RequestGate {
    pub fn new(
        registry: Arc<PermissionRegistry>,
        alerts: Arc<AlertEngine>,
        delivery: Arc<Delivery>,
        handler: Arc<dyn Handler>,
        config: GateConfig,
    ) -> Self {
        Self {
            registry,
            alerts,
            delivery,
            handler,
            config: GateConfig {
                max_retries: config.max_retries.max(1),
                ..config
            },
        }
    }

    /// Run one inbound message through the gate
    pub async fn handle(&self, message: InboundMessage) -> GateOutcome {
        let request_id = Uuid::new_v4();
        let span = info_span!("request", id = %request_id, principal = %message.sender_id);
        self.process(request_id, message).instrument(span).await
    }

    async fn process(&self, request_id: Uuid, message: InboundMessage) -> GateOutcome {
        // 1. Allowed chat
        if let Some(group) = &self.config.allowed_group {
            if &message.chat_id != group && !message.is_private() {
                warn!("Message from chat {} is not allowed", message.chat_id);
                self.reply(&message, ACCESS_DENIED).await;
                return GateOutcome::Denied(format!("chat {} is not allowed", message.chat_id));
            }
        }

        // 2. Authenticate
        let Some(principal) = self.registry.get_user(&message.sender_id) else {
            warn!(
                "Access denied - user {} ({})",
                message.sender_name, message.sender_id
            );
            if let Some(alert) = self
                .alerts
                .check_unauthorized_access(&message.sender_id, &message.sender_name)
            {
                self.notify_owner(&alert.render()).await;
            }
            self.reply(&message, ACCESS_DENIED).await;
            return GateOutcome::Denied("unregistered principal".to_string());
        };

        // 3. Authorize
        let capabilities = principal.role.capabilities();
        let (command, args) = Command::parse(&message);
        if let Some(required) = command.required_capability() {
            if !capabilities.allows(required) {
                let reason = format!("{} requires {}", command.name(), required);
                warn!("Access denied - {} ({}): {}", principal.display_name, principal.role, reason);
                self.reply(&message, &format!("{}: {}", ACCESS_DENIED, reason))
                    .await;
                return GateOutcome::Denied(reason);
            }
        }
        info!(
            "/{} by {} ({})",
            command.name(),
            principal.display_name,
            principal.role
        );

        // 4. Acknowledge
        let placeholder = match self.delivery.send(&message.chat_id, PROCESSING).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Placeholder not delivered, replying directly: {}", e);
                None
            }
        };

        // 5. Execute
        let ctx = RequestContext {
            request_id,
            message: message.clone(),
            principal,
            capabilities,
            command,
            args,
            delivery: Arc::clone(&self.delivery),
        };
        let completion = self.run_handler(&ctx).await;

        // 6. Deliver
        let mut performed = false;
        let outcome = match completion {
            Completion::Replied(reply) => {
                performed = reply.performed;
                if self.deliver(&message, placeholder.as_ref(), &reply.text).await {
                    GateOutcome::Delivered
                } else {
                    GateOutcome::Failed(CONNECTION_ERROR.to_string())
                }
            }
            Completion::Failed(text) => {
                if !self.deliver(&message, placeholder.as_ref(), &text).await {
                    warn!("Error reply not delivered: {}", text);
                }
                GateOutcome::Failed(text)
            }
        };

        // 7. Owner notification (실제로 수행된 민감한 명령만)
        if performed
            && ctx.command.is_sensitive()
            && !self.registry.is_owner(&ctx.principal.principal_id)
        {
            let text = format!(
                "{} ({}, {}) ran: {}",
                ctx.principal.display_name,
                ctx.principal.principal_id,
                ctx.principal.role,
                message.text.trim()
            );
            self.notify_owner(&text).await;
        }

        debug!("Request finished: {:?}", outcome);
        outcome
    }

    /// Invoke the handler, re-running it on transient failure
    async fn run_handler(&self, ctx: &RequestContext) -> Completion {
        let mut attempt = 1;
        loop {
            let result = AssertUnwindSafe(self.handler.handle(ctx))
                .catch_unwind()
                .await;

            match result {
                Ok(Ok(reply)) => return Completion::Replied(reply),
                Ok(Err(HandlerError::Transient(e))) if attempt < self.config.max_retries => {
                    debug!(
                        "Handler hit transient failure (attempt {}/{}): {}",
                        attempt, self.config.max_retries, e
                    );
                    attempt += 1;
                }
                Ok(Err(HandlerError::Transient(e))) => {
                    error!("Handler timed out after {} attempts: {}", attempt, e);
                    return Completion::Failed(TIMEOUT_ERROR.to_string());
                }
                Ok(Err(HandlerError::Failed(e))) => {
                    error!("Handler failed: {:#}", e);
                    return Completion::Failed(format!("Error: {}", e));
                }
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    error!("Handler panicked: {}", reason);
                    return Completion::Failed(format!("Error: {}", reason));
                }
            }
        }
    }

    /// Put the final text in front of the caller
    ///
    /// 플레이스홀더가 있으면 편집하고, 없으면 새로 보낸다. 전송이 끝내 실패하면
    /// 연결 오류 메시지를 한 번 더 시도한다.
    async fn deliver(
        &self,
        message: &InboundMessage,
        placeholder: Option<&MessageHandle>,
        text: &str,
    ) -> bool {
        let text = truncate_middle(text, self.config.output_limit, self.config.output_keep);
        let result = match placeholder {
            Some(handle) => self.delivery.edit(handle, &text).await,
            None => self.delivery.send(&message.chat_id, &text).await,
        };

        match result {
            Ok(_) => true,
            Err(e) => {
                error!("Reply not delivered: {}", e);
                self.reply(message, CONNECTION_ERROR).await;
                false
            }
        }
    }

    /// Best-effort reply in the request's chat
    async fn reply(&self, message: &InboundMessage, text: &str) {
        self.delivery.notify(&message.chat_id, text).await;
    }

    async fn notify_owner(&self, text: &str) {
        let owner = self.registry.owner_id().to_string();
        self.delivery.notify(&owner, text).await;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
