//! Session lifecycle and the state it owns.
//!
//! [`SessionController`] walks `Uninitialized → Initializing → Ready` and
//! `Ready → Switching → Ready`. Everything the client knows about the active
//! session lives in one [`ChatState`] shared with the [`QueryPipeline`]. The
//! lock around it is only held between awaits, never across one.

use crate::conversation::{ConversationStore, Snapshot};
use crate::error::SessionError;
use crate::query::QueryPipeline;
use crate::registry::DocumentRegistry;
use crate::remote::{DocChatBackend, RemoteResult};
use crate::selection::{SelectionModel, Toggle};
use crate::types::{ChatMessage, Document, HistorySummary, SessionInfo, UploadReceipt};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Ready,
    Switching,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionPhase::Uninitialized => "uninitialized",
            SessionPhase::Initializing => "initializing",
            SessionPhase::Ready => "ready",
            SessionPhase::Switching => "switching",
        };
        f.write_str(label)
    }
}

/// Identity of the active session. Its documents live in the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Session {
    fn new(session_id: String) -> Self {
        Self {
            session_id,
            created_at: None,
            updated_at: None,
        }
    }

    fn from_info(info: &SessionInfo) -> Self {
        Self {
            session_id: info.session_id.clone(),
            created_at: info.created_at.clone(),
            updated_at: info.updated_at.clone(),
        }
    }
}

// ============================================
// Shared state
// ============================================

#[derive(Debug)]
pub(crate) struct ChatState {
    pub(crate) phase: SessionPhase,
    pub(crate) session: Option<Session>,
    pub(crate) registry: DocumentRegistry,
    pub(crate) selection: SelectionModel,
    pub(crate) conversation: ConversationStore,
    /// Sessions with a query still awaiting its answer.
    pub(crate) in_flight: HashSet<String>,
}

impl ChatState {
    fn new() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            session: None,
            registry: DocumentRegistry::new(),
            selection: SelectionModel::new(),
            conversation: ConversationStore::new(),
            in_flight: HashSet::new(),
        }
    }

    pub(crate) fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }

    fn reconcile_selection(&mut self) {
        let ids = self.registry.ids();
        self.selection.reconcile(&ids);
    }

    /// Replaces identity, documents, selection and history in one step.
    fn install(&mut self, loaded: LoadedSession) {
        self.session = Some(loaded.session);
        self.registry.replace_all(loaded.documents);
        self.selection = SelectionModel::new();
        self.reconcile_selection();
        self.conversation.replace_all(loaded.messages);
    }
}

pub(crate) type SharedState = Arc<Mutex<ChatState>>;

/// No code path panics while holding the lock, so a poisoned state is still consistent.
pub(crate) fn lock(state: &SharedState) -> MutexGuard<'_, ChatState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

struct LoadedSession {
    session: Session,
    documents: Vec<Document>,
    messages: Vec<ChatMessage>,
}

fn now_rfc3339() -> Option<String> {
    OffsetDateTime::now_utc().format(&Rfc3339).ok()
}

// ============================================
// Controller
// ============================================

pub struct SessionController {
    backend: Arc<dyn DocChatBackend>,
    state: SharedState,
}

impl SessionController {
    pub fn new(backend: Arc<dyn DocChatBackend>) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(ChatState::new())),
        }
    }

    /// A pipeline that submits queries against this controller's session.
    pub fn query_pipeline(&self) -> QueryPipeline {
        QueryPipeline::new(Arc::clone(&self.backend), Arc::clone(&self.state))
    }

    pub fn phase(&self) -> SessionPhase {
        lock(&self.state).phase
    }

    pub fn session(&self) -> Option<Session> {
        lock(&self.state).session.clone()
    }

    pub fn session_id(&self) -> Option<String> {
        lock(&self.state).session_id().map(str::to_string)
    }

    pub fn documents(&self) -> Vec<Document> {
        lock(&self.state).registry.list().to_vec()
    }

    pub fn selected(&self) -> Vec<String> {
        lock(&self.state).selection.selected().to_vec()
    }

    pub fn messages(&self) -> Snapshot {
        lock(&self.state).conversation.snapshot()
    }

    pub fn export_transcript(&self) -> Option<String> {
        lock(&self.state).conversation.export_transcript()
    }

    /// Enters `next` if the controller is currently in `expected`.
    fn transition(
        &self,
        operation: &'static str,
        expected: SessionPhase,
        next: SessionPhase,
    ) -> Result<(), SessionError> {
        let mut state = lock(&self.state);
        if state.phase != expected {
            return Err(SessionError::InvalidState {
                operation,
                phase: state.phase,
            });
        }
        debug!(from = %state.phase, to = %next, operation, "session phase change");
        state.phase = next;
        Ok(())
    }

    fn set_phase(&self, phase: SessionPhase) {
        lock(&self.state).phase = phase;
    }

    /// Current session id, provided the controller is ready.
    fn ready_session_id(&self, operation: &'static str) -> Result<String, SessionError> {
        let state = lock(&self.state);
        match (state.phase, state.session_id()) {
            (SessionPhase::Ready, Some(id)) => Ok(id.to_string()),
            (phase, _) => Err(SessionError::InvalidState { operation, phase }),
        }
    }

    async fn load_session(&self, session_id: &str) -> RemoteResult<LoadedSession> {
        let info = self.backend.fetch_session(session_id).await?;
        let messages = self.backend.fetch_history(session_id).await?;
        Ok(LoadedSession {
            session: Session::from_info(&info),
            documents: info.documents,
            messages,
        })
    }

    // ============================================
    // Lifecycle
    // ============================================

    /// Creates a fresh remote session and hydrates whatever it already holds.
    pub async fn start(&self) -> Result<String, SessionError> {
        self.transition("start", SessionPhase::Uninitialized, SessionPhase::Initializing)?;

        let session_id = match self.backend.create_session().await {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, "session create failed");
                self.set_phase(SessionPhase::Uninitialized);
                return Err(SessionError::Initialization(err));
            }
        };
        info!(session_id, "session created");

        let mut loaded = LoadedSession {
            session: Session::new(session_id.clone()),
            documents: Vec::new(),
            messages: Vec::new(),
        };
        match self.backend.fetch_session(&session_id).await {
            Ok(info) => {
                loaded.session = Session::from_info(&info);
                loaded.session.session_id = session_id.clone();
                loaded.documents = info.documents;
            }
            Err(err) => debug!(error = %err, "no documents to hydrate"),
        }
        match self.backend.fetch_history(&session_id).await {
            Ok(messages) => loaded.messages = messages,
            Err(err) => debug!(error = %err, "no history to hydrate"),
        }

        let mut state = lock(&self.state);
        state.install(loaded);
        state.phase = SessionPhase::Ready;
        Ok(session_id)
    }

    /// Picks up an existing remote session by id instead of creating one.
    pub async fn resume(&self, session_id: &str) -> Result<(), SessionError> {
        self.transition("resume", SessionPhase::Uninitialized, SessionPhase::Initializing)?;

        match self.load_session(session_id).await {
            Ok(loaded) => {
                info!(session_id, documents = loaded.documents.len(), "session resumed");
                let mut state = lock(&self.state);
                state.install(loaded);
                state.phase = SessionPhase::Ready;
                Ok(())
            }
            Err(err) => {
                warn!(session_id, error = %err, "session resume failed");
                self.set_phase(SessionPhase::Uninitialized);
                Err(SessionError::Initialization(err))
            }
        }
    }

    pub async fn switch_to(&self, session_id: &str) -> Result<(), SessionError> {
        self.transition("switch_to", SessionPhase::Ready, SessionPhase::Switching)?;
        info!(session_id, "switching session");

        match self.load_session(session_id).await {
            Ok(loaded) => {
                let mut state = lock(&self.state);
                state.install(loaded);
                state.phase = SessionPhase::Ready;
                Ok(())
            }
            Err(err) => {
                warn!(session_id, error = %err, "switch failed, keeping current session");
                self.set_phase(SessionPhase::Ready);
                Err(SessionError::Switch(err))
            }
        }
    }

    // ============================================
    // Documents
    // ============================================

    pub async fn attach_document(
        &self,
        document_id: &str,
        document_name: &str,
    ) -> Result<(), SessionError> {
        let session_id = self.ready_session_id("attach_document")?;

        if let Err(err) = self
            .backend
            .attach_document(&session_id, document_id, document_name)
            .await
        {
            warn!(document_id, error = %err, "attach rejected");
            return Err(SessionError::Attach(err));
        }

        let mut state = lock(&self.state);
        if state.session_id() != Some(session_id.as_str()) {
            return Err(SessionError::SessionChanged);
        }
        let document = Document {
            document_id: document_id.to_string(),
            document_name: document_name.to_string(),
            added_at: now_rfc3339(),
        };
        if state.registry.add(document) {
            info!(document_id, "document attached");
        }
        state.reconcile_selection();
        Ok(())
    }

    /// Uploads a file and attaches the resulting document to the session.
    pub async fn upload_document(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<UploadReceipt, SessionError> {
        self.ready_session_id("upload_document")?;

        let receipt = self
            .backend
            .upload_document(bytes, filename)
            .await
            .map_err(SessionError::Upload)?;
        debug!(document_id = %receipt.document_id, "upload accepted");

        self.attach_document(&receipt.document_id, filename).await?;
        Ok(receipt)
    }

    /// Drops a document from the local view. The server keeps it attached.
    pub fn remove_document(&self, document_id: &str) -> bool {
        let mut state = lock(&self.state);
        let removed = state.registry.remove(document_id);
        if removed {
            state.reconcile_selection();
        }
        removed
    }

    /// Flips a document in or out of the selection. Unknown ids are ignored.
    pub fn toggle_document(&self, document_id: &str) -> Option<Toggle> {
        let mut state = lock(&self.state);
        if !state.registry.contains(document_id) {
            return None;
        }
        let outcome = state.selection.toggle(document_id);
        if outcome == Toggle::Protected {
            debug!(document_id, "last selected document stays selected");
        }
        Some(outcome)
    }

    // ============================================
    // History
    // ============================================

    /// Clears history remotely, then locally. The local log survives a remote failure.
    pub async fn clear_history(&self) -> Result<(), SessionError> {
        let session_id = self.ready_session_id("clear_history")?;

        self.backend
            .clear_history(&session_id)
            .await
            .map_err(SessionError::Clear)?;

        let mut state = lock(&self.state);
        if state.session_id() != Some(session_id.as_str()) {
            return Err(SessionError::SessionChanged);
        }
        state.conversation.clear();
        info!(session_id, "history cleared");
        Ok(())
    }

    pub async fn list_histories(&self) -> Result<Vec<HistorySummary>, SessionError> {
        self.backend
            .list_histories()
            .await
            .map_err(SessionError::Remote)
    }
}
