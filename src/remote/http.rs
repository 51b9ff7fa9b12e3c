use super::{DocChatBackend, QueryRequest, RemoteError, RemoteResult};
use crate::types::{ChatMessage, HistorySummary, SessionInfo, UploadReceipt};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url, multipart};
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use std::time::Duration;
use tracing::debug;

/// REST client for the answering service.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

// Response shapes. Every body also carries `success`, checked separately.
#[derive(Deserialize)]
struct Outcome {
    success: Option<bool>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct CreateSessionBody {
    session_id: String,
}

#[derive(Deserialize)]
struct FetchSessionBody {
    session: Option<SessionInfo>,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    response: String,
}

#[derive(Deserialize)]
struct HistoryBody {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct HistoriesBody {
    #[serde(default)]
    histories: Vec<HistorySummary>,
}

#[derive(Deserialize)]
struct UploadBody {
    document_id: String,
    #[serde(default)]
    message: String,
}

#[derive(serde::Serialize)]
struct AttachRequest<'a> {
    document_id: &'a str,
    document_name: &'a str,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> RemoteResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RemoteError::Transport(format!("invalid base url {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::Transport(format!(
                "base url cannot carry a path: {base_url}"
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Joins `segments` onto the base url, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> RemoteResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, "remote call finished");
        decode_body(status, &body)
    }
}

/// Turns a raw response into `T`, honouring HTTP status and the `success` flag.
fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> RemoteResult<T> {
    if !status.is_success() {
        return Err(RemoteError::Status {
            status: status.as_u16(),
            detail: extract_detail(body),
        });
    }

    let outcome: Outcome = serde_json::from_str(body)?;
    if outcome.success == Some(false) {
        return Err(RemoteError::Rejected {
            detail: outcome.detail.as_ref().and_then(detail_text),
        });
    }

    Ok(serde_json::from_str(body)?)
}

/// FastAPI error bodies carry `detail` as a string, or as a list of
/// validation errors each with a `msg`.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    detail_text(value.get("detail")?)
}

fn detail_text(detail: &serde_json::Value) -> Option<String> {
    match detail {
        serde_json::Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

#[async_trait]
impl DocChatBackend for HttpBackend {
    async fn create_session(&self) -> RemoteResult<String> {
        let url = self.endpoint(&["api", "chat", "session"]);
        let body: CreateSessionBody = self.send(self.client.post(url)).await?;
        Ok(body.session_id)
    }

    async fn fetch_session(&self, session_id: &str) -> RemoteResult<SessionInfo> {
        let url = self.endpoint(&["api", "chat", "session", session_id]);
        let body: FetchSessionBody = self.send(self.client.get(url)).await?;
        body.session.ok_or(RemoteError::Rejected {
            detail: Some(format!("session {session_id} not found")),
        })
    }

    async fn attach_document(
        &self,
        session_id: &str,
        document_id: &str,
        document_name: &str,
    ) -> RemoteResult<()> {
        let url = self.endpoint(&["api", "chat", "session", session_id, "documents"]);
        let request = self.client.post(url).json(&AttachRequest {
            document_id,
            document_name,
        });
        let _: IgnoredAny = self.send(request).await?;
        Ok(())
    }

    async fn query(&self, request: &QueryRequest) -> RemoteResult<String> {
        let url = self.endpoint(&["api", "chat", "query"]);
        let body: QueryBody = self.send(self.client.post(url).json(request)).await?;
        Ok(body.response)
    }

    async fn fetch_history(&self, session_id: &str) -> RemoteResult<Vec<ChatMessage>> {
        let url = self.endpoint(&["api", "chat", "history", session_id]);
        let body: HistoryBody = self.send(self.client.get(url)).await?;
        Ok(body.messages)
    }

    async fn clear_history(&self, session_id: &str) -> RemoteResult<()> {
        let url = self.endpoint(&["api", "chat", "history", session_id]);
        let _: IgnoredAny = self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn list_histories(&self) -> RemoteResult<Vec<HistorySummary>> {
        let url = self.endpoint(&["api", "chat", "histories"]);
        let body: HistoriesBody = self.send(self.client.get(url)).await?;
        Ok(body.histories)
    }

    async fn upload_document(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> RemoteResult<UploadReceipt> {
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new().part("file", part);
        let url = self.endpoint(&["api", "documents", "upload"]);
        debug!(%url, filename, "uploading document");

        let body: UploadBody = self.send(self.client.post(url).multipart(form)).await?;
        Ok(UploadReceipt {
            document_id: body.document_id,
            message: body.message,
        })
    }
}
