//! Remote answering service
//!
//! The core never talks HTTP directly. Every remote operation goes through
//! [`DocChatBackend`], so the session controller and query pipeline can be
//! driven by [`HttpBackend`] in production and by an in-memory backend in tests.

mod http;

pub use http::HttpBackend;

use crate::i18n::Language;
use crate::types::{ChatMessage, HistorySummary, SessionInfo, UploadReceipt};
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Connection failure or timeout.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("server returned {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },

    /// The server answered but reported `success: false`.
    #[error("request rejected{}", detail_suffix(.detail))]
    Rejected { detail: Option<String> },

    #[error("malformed response: {0}")]
    Decode(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

impl RemoteError {
    /// Human-readable detail supplied by the server, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            RemoteError::Status { detail, .. } | RemoteError::Rejected { detail } => {
                detail.as_deref().filter(|d| !d.trim().is_empty())
            }
            RemoteError::Transport(_) | RemoteError::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Decode(err.to_string())
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Body of a grounded question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    pub query: String,
    pub session_id: String,
    pub document_ids: Vec<String>,
    pub language: Language,
}

#[async_trait]
pub trait DocChatBackend: Send + Sync {
    /// Returns the new server-issued session id.
    async fn create_session(&self) -> RemoteResult<String>;

    async fn fetch_session(&self, session_id: &str) -> RemoteResult<SessionInfo>;

    async fn attach_document(
        &self,
        session_id: &str,
        document_id: &str,
        document_name: &str,
    ) -> RemoteResult<()>;

    /// Returns the answer text.
    async fn query(&self, request: &QueryRequest) -> RemoteResult<String>;

    async fn fetch_history(&self, session_id: &str) -> RemoteResult<Vec<ChatMessage>>;

    async fn clear_history(&self, session_id: &str) -> RemoteResult<()>;

    async fn list_histories(&self) -> RemoteResult<Vec<HistorySummary>>;

    async fn upload_document(&self, bytes: Vec<u8>, filename: &str)
    -> RemoteResult<UploadReceipt>;
}
