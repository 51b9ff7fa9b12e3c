use crate::i18n::{self, Language, QuickAction};
use crate::remote::{DocChatBackend, QueryRequest};
use crate::session::{SessionPhase, SharedState, lock};
use crate::types::ChatMessage;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Blank or whitespace-only text.
    Empty,
    /// No session, or a session load is still running.
    NotReady,
    /// A query for this session is still awaiting its answer.
    Busy,
}

/// What happened to a submission. Failures are conversation turns, not errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing was recorded and nothing was sent.
    Rejected(RejectReason),
    /// No document selected; answered locally without a network call.
    NoSelection,
    Answered,
    /// The remote call failed and the failure was recorded as an assistant turn.
    Failed,
    /// The answer arrived after the session changed and was dropped.
    Discarded,
}

/// Releases a session's in-flight tag when the query finishes or its future is dropped.
struct InFlight {
    state: SharedState,
    session_id: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        lock(&self.state).in_flight.remove(&self.session_id);
    }
}

/// Turns user utterances into grounded queries against the active session.
#[derive(Clone)]
pub struct QueryPipeline {
    backend: Arc<dyn DocChatBackend>,
    state: SharedState,
}

impl QueryPipeline {
    pub(crate) fn new(backend: Arc<dyn DocChatBackend>, state: SharedState) -> Self {
        Self { backend, state }
    }

    pub async fn submit(&self, text: &str, language: Language) -> SubmitOutcome {
        let query = text.trim();
        if query.is_empty() {
            return SubmitOutcome::Rejected(RejectReason::Empty);
        }

        let request = {
            let mut state = lock(&self.state);
            if state.phase != SessionPhase::Ready {
                return SubmitOutcome::Rejected(RejectReason::NotReady);
            }
            let Some(session_id) = state.session_id().map(str::to_string) else {
                return SubmitOutcome::Rejected(RejectReason::NotReady);
            };
            if state.in_flight.contains(&session_id) {
                debug!(session_id, "query already in flight");
                return SubmitOutcome::Rejected(RejectReason::Busy);
            }

            state.conversation.append(ChatMessage::user(query));

            if state.selection.is_empty() {
                state
                    .conversation
                    .append(ChatMessage::assistant(i18n::no_selection_notice(language)));
                return SubmitOutcome::NoSelection;
            }

            state.in_flight.insert(session_id.clone());
            QueryRequest {
                query: query.to_string(),
                session_id,
                document_ids: state.selection.selected().to_vec(),
                language,
            }
        };

        info!(
            session_id = %request.session_id,
            documents = request.document_ids.len(),
            %language,
            "submitting query"
        );
        let in_flight = InFlight {
            state: Arc::clone(&self.state),
            session_id: request.session_id.clone(),
        };
        let result = self.backend.query(&request).await;
        drop(in_flight);

        let mut state = lock(&self.state);
        if state.session_id() != Some(request.session_id.as_str()) {
            debug!(session_id = %request.session_id, "dropping answer for inactive session");
            return SubmitOutcome::Discarded;
        }

        match result {
            Ok(answer) => {
                state.conversation.append(ChatMessage::assistant(answer));
                SubmitOutcome::Answered
            }
            Err(err) => {
                warn!(error = %err, "query failed");
                let text = err
                    .detail()
                    .map(str::to_string)
                    .unwrap_or_else(|| i18n::generic_failure(language).to_string());
                state.conversation.append(ChatMessage::assistant(text));
                SubmitOutcome::Failed
            }
        }
    }

    /// Whether a query for the active session is awaiting its answer.
    pub fn is_busy(&self) -> bool {
        let state = lock(&self.state);
        state
            .session_id()
            .is_some_and(|id| state.in_flight.contains(id))
    }

    pub fn suggested_questions(&self, language: Language) -> &'static [&'static str] {
        i18n::suggested_questions(language)
    }

    pub fn quick_actions(&self, language: Language) -> &'static [QuickAction] {
        i18n::quick_actions(language)
    }
}
