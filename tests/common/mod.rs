//! Scripted in-memory answering service for driving the controller in tests.
#![allow(dead_code)]

use async_trait::async_trait;
use docent::{
    ChatMessage, DocChatBackend, Document, HistorySummary, QueryRequest, RemoteError,
    RemoteResult, SessionController, SessionInfo, UploadReceipt,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Default)]
struct Script {
    next_id: usize,
    create_results: VecDeque<RemoteResult<String>>,
    sessions: HashMap<String, SessionInfo>,
    histories: HashMap<String, Vec<ChatMessage>>,
    unreachable_sessions: HashSet<String>,
    unreachable_histories: HashSet<String>,
    attach_failure: Option<RemoteError>,
    clear_failure: Option<RemoteError>,
    answers: VecDeque<RemoteResult<String>>,
    queries: Vec<QueryRequest>,
    calls: Vec<&'static str>,
    /// Calls that park on the gate until it is notified.
    held: HashSet<&'static str>,
}

pub struct ScriptedBackend {
    script: Mutex<Script>,
    /// Signalled each time a held call reaches the backend.
    entered: Arc<Notify>,
    gate: Arc<Notify>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            entered: Arc::new(Notify::new()),
            gate: Arc::new(Notify::new()),
        }
    }

    /// A backend whose queries block until the returned gate is notified.
    pub fn gated() -> (Self, Arc<Notify>) {
        let backend = Self::new();
        backend.hold("query");
        let gate = backend.gate();
        (backend, gate)
    }

    /// Makes `call` wait on the gate from now on.
    pub fn hold(&self, call: &'static str) {
        self.script.lock().unwrap().held.insert(call);
    }

    /// Lets later `call`s through; calls already parked keep waiting.
    pub fn release(&self, call: &'static str) {
        self.script.lock().unwrap().held.remove(call);
    }

    pub fn gate(&self) -> Arc<Notify> {
        Arc::clone(&self.gate)
    }

    pub fn with_session(self, info: SessionInfo, history: Vec<ChatMessage>) -> Self {
        {
            let mut script = self.script.lock().unwrap();
            script.histories.insert(info.session_id.clone(), history);
            script.sessions.insert(info.session_id.clone(), info);
        }
        self
    }

    /// The next `create_session` returns `result` instead of a fresh id.
    pub fn script_create(&self, result: RemoteResult<String>) {
        self.script.lock().unwrap().create_results.push_back(result);
    }

    pub fn make_session_unreachable(&self, session_id: &str) {
        self.script
            .lock()
            .unwrap()
            .unreachable_sessions
            .insert(session_id.to_string());
    }

    pub fn make_history_unreachable(&self, session_id: &str) {
        self.script
            .lock()
            .unwrap()
            .unreachable_histories
            .insert(session_id.to_string());
    }

    pub fn fail_next_attach(&self, err: RemoteError) {
        self.script.lock().unwrap().attach_failure = Some(err);
    }

    pub fn fail_next_clear(&self, err: RemoteError) {
        self.script.lock().unwrap().clear_failure = Some(err);
    }

    pub fn push_answer(&self, answer: RemoteResult<String>) {
        self.script.lock().unwrap().answers.push_back(answer);
    }

    pub fn entered(&self) -> Arc<Notify> {
        Arc::clone(&self.entered)
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls().iter().filter(|call| **call == name).count()
    }

    pub fn queries(&self) -> Vec<QueryRequest> {
        self.script.lock().unwrap().queries.clone()
    }

    pub fn remote_history(&self, session_id: &str) -> Option<Vec<ChatMessage>> {
        self.script.lock().unwrap().histories.get(session_id).cloned()
    }

    fn record(&self, call: &'static str) {
        self.script.lock().unwrap().calls.push(call);
    }

    async fn pass_gate(&self, call: &'static str) {
        let held = self.script.lock().unwrap().held.contains(call);
        if held {
            self.entered.notify_one();
            self.gate.notified().await;
        }
    }
}

fn not_found(session_id: &str) -> RemoteError {
    RemoteError::Status {
        status: 404,
        detail: Some(format!("Session {session_id} not found")),
    }
}

#[async_trait]
impl DocChatBackend for ScriptedBackend {
    async fn create_session(&self) -> RemoteResult<String> {
        self.record("create_session");
        let mut script = self.script.lock().unwrap();
        if let Some(result) = script.create_results.pop_front() {
            return result;
        }
        script.next_id += 1;
        let id = format!("s-{}", script.next_id);
        script
            .sessions
            .entry(id.clone())
            .or_insert_with(|| session_info(&id, vec![]));
        Ok(id)
    }

    async fn fetch_session(&self, session_id: &str) -> RemoteResult<SessionInfo> {
        self.record("fetch_session");
        self.pass_gate("fetch_session").await;
        let script = self.script.lock().unwrap();
        if script.unreachable_sessions.contains(session_id) {
            return Err(RemoteError::Transport("connection reset".into()));
        }
        script
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| not_found(session_id))
    }

    async fn attach_document(
        &self,
        session_id: &str,
        document_id: &str,
        document_name: &str,
    ) -> RemoteResult<()> {
        self.record("attach_document");
        self.pass_gate("attach_document").await;
        let mut script = self.script.lock().unwrap();
        if let Some(err) = script.attach_failure.take() {
            return Err(err);
        }
        let session = script
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| not_found(session_id))?;
        if !session.documents.iter().any(|d| d.document_id == document_id) {
            session.documents.push(doc(document_id, document_name));
        }
        Ok(())
    }

    async fn query(&self, request: &QueryRequest) -> RemoteResult<String> {
        self.record("query");
        self.script.lock().unwrap().queries.push(request.clone());
        self.pass_gate("query").await;

        let mut script = self.script.lock().unwrap();
        let answer = script
            .answers
            .pop_front()
            .unwrap_or_else(|| Ok(format!("answer to {}", request.query)));
        if let Ok(text) = &answer {
            let history = script
                .histories
                .entry(request.session_id.clone())
                .or_default();
            history.push(ChatMessage::user(request.query.clone()));
            history.push(ChatMessage::assistant(text.clone()));
        }
        answer
    }

    async fn fetch_history(&self, session_id: &str) -> RemoteResult<Vec<ChatMessage>> {
        self.record("fetch_history");
        let script = self.script.lock().unwrap();
        if script.unreachable_histories.contains(session_id) {
            return Err(RemoteError::Transport("timed out".into()));
        }
        Ok(script.histories.get(session_id).cloned().unwrap_or_default())
    }

    async fn clear_history(&self, session_id: &str) -> RemoteResult<()> {
        self.record("clear_history");
        self.pass_gate("clear_history").await;
        let mut script = self.script.lock().unwrap();
        if let Some(err) = script.clear_failure.take() {
            return Err(err);
        }
        script.histories.remove(session_id);
        Ok(())
    }

    async fn list_histories(&self) -> RemoteResult<Vec<HistorySummary>> {
        self.record("list_histories");
        let script = self.script.lock().unwrap();
        let mut histories: Vec<HistorySummary> = script
            .histories
            .iter()
            .map(|(session_id, messages)| HistorySummary {
                session_id: session_id.clone(),
                document_ids: script
                    .sessions
                    .get(session_id)
                    .map(|s| s.documents.iter().map(|d| d.document_id.clone()).collect())
                    .unwrap_or_default(),
                message_count: messages.len(),
                created_at: None,
                updated_at: None,
            })
            .collect();
        histories.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        Ok(histories)
    }

    async fn upload_document(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> RemoteResult<UploadReceipt> {
        self.record("upload_document");
        if bytes.is_empty() {
            return Err(RemoteError::Status {
                status: 400,
                detail: Some("Empty file".into()),
            });
        }
        Ok(UploadReceipt {
            document_id: format!("doc-{filename}"),
            message: format!("Processed {} bytes", bytes.len()),
        })
    }
}

// ============================================
// Fixtures
// ============================================

pub fn doc(id: &str, name: &str) -> Document {
    Document::new(id, name)
}

pub fn session_info(id: &str, documents: Vec<Document>) -> SessionInfo {
    SessionInfo {
        session_id: id.to_string(),
        documents,
        created_at: Some("2024-05-01T09:00:00".into()),
        updated_at: Some("2024-05-01T09:30:00".into()),
    }
}

/// A controller that has completed `start()` against `backend`.
pub async fn started(backend: &Arc<ScriptedBackend>) -> SessionController {
    let controller = SessionController::new(backend.clone());
    controller.start().await.expect("start should succeed");
    controller
}

/// A started controller whose session already holds `documents`.
pub async fn started_with_documents(
    backend: &Arc<ScriptedBackend>,
    documents: &[(&str, &str)],
) -> SessionController {
    let controller = started(backend).await;
    for (id, name) in documents {
        controller
            .attach_document(id, name)
            .await
            .expect("attach should succeed");
    }
    controller
}
