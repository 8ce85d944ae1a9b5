//! Handler contract - 게이트가 감싸는 요청 처리기

use crate::commands::Command;
use crate::delivery::Delivery;
use crate::transport::{InboundMessage, TransportError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use warden_foundation::{CapabilitySet, UserRecord};

/// Handler failure
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Transient delivery failure inside the handler, the gate re-runs the handler
    #[error("{0}")]
    Transient(TransportError),

    /// Any other failure, surfaced to the caller as an error message
    #[error("{0}")]
    Failed(#[from] anyhow::Error),
}

impl From<TransportError> for HandlerError {
    fn from(e: TransportError) -> Self {
        if e.is_transient() {
            Self::Transient(e)
        } else {
            Self::Failed(anyhow::Error::new(e))
        }
    }
}

impl From<warden_foundation::Error> for HandlerError {
    fn from(e: warden_foundation::Error) -> Self {
        Self::Failed(anyhow::Error::new(e))
    }
}

/// Everything a handler sees about one authorized request
#[derive(Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub message: InboundMessage,
    pub principal: UserRecord,
    pub capabilities: CapabilitySet,
    pub command: Command,
    pub args: Vec<String>,
    pub delivery: Arc<Delivery>,
}

/// Reply text and whether the requested operation took effect
///
/// `performed`가 true인 민감한 명령만 owner 감사 알림 대상이다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerReply {
    pub text: String,
    pub performed: bool,
}

impl HandlerReply {
    /// Operation ran
    pub fn performed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            performed: true,
        }
    }

    /// Informational reply, nothing changed (usage, refusal, read-only query)
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            performed: false,
        }
    }
}

/// Produces the final reply for an authorized request
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &RequestContext) -> Result<HandlerReply, HandlerError>;
}
