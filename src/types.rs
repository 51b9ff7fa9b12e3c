use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A source document attached to a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,
    pub document_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,
}

impl Document {
    pub fn new(document_id: impl Into<String>, document_name: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            document_name: document_name.into(),
            added_at: None,
        }
    }
}

/// Server view of a session. Timestamps are kept exactly as the server sent them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One row of the server's history listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub session_id: String,
    #[serde(default)]
    pub document_ids: Vec<String>,
    #[serde(default)]
    pub message_count: usize,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadReceipt {
    pub document_id: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn session_info_tolerates_missing_fields() {
        let info: SessionInfo = serde_json::from_str(r#"{"session_id":"s1"}"#).unwrap();
        assert_eq!(info.session_id, "s1");
        assert!(info.documents.is_empty());
        assert!(info.created_at.is_none());
    }

    #[test]
    fn document_keeps_server_timestamp() {
        let doc: Document = serde_json::from_str(
            r#"{"document_id":"d1","document_name":"notes.pdf","added_at":"2024-05-01T10:00:00.123456"}"#,
        )
        .unwrap();
        assert_eq!(doc.added_at.as_deref(), Some("2024-05-01T10:00:00.123456"));
    }
}
