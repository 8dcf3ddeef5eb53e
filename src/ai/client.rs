use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::session::SessionId;

// ============================================
// Error Types
// ============================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChatError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("webhook returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("undecodable reply: {0}")]
    Decode(String),

    #[error("reply has no output")]
    MissingOutput,
}

impl ChatError {
    /// Failures where the request never produced a usable response.
    pub fn is_transport(&self) -> bool {
        matches!(self, ChatError::Transport(_) | ChatError::Status { .. })
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Decode(err.to_string())
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

// ============================================
// Wire Request
// ============================================

/// Body posted to the webhook. Exactly these two fields go over the wire.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WebhookRequest {
    pub message: String,
    pub sessionid: String,
}

impl WebhookRequest {
    pub fn new(message: impl Into<String>, session: &SessionId) -> Self {
        Self {
            message: message.into(),
            sessionid: session.as_str().to_string(),
        }
    }
}

// ============================================
// Backend Seam
// ============================================

/// One request/response exchange with the remote assistant.
///
/// Implementations make a single attempt and never retry.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, request: &WebhookRequest) -> ChatResult<String>;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn send(&self, request: &WebhookRequest) -> ChatResult<String> {
        (**self).send(request).await
    }
}
