//! Client-side orchestration for chatting with uploaded documents.
//!
//! A [`SessionController`] owns the active session, its documents, the
//! document selection and the message log. A [`QueryPipeline`] obtained from
//! it turns user questions into grounded queries. Both talk to the answering
//! service through the [`DocChatBackend`] trait.

pub mod config;
pub mod conversation;
pub mod error;
pub mod i18n;
pub mod query;
pub mod registry;
pub mod remote;
pub mod repl;
pub mod selection;
pub mod session;
pub mod types;

pub use config::Config;
pub use conversation::{ConversationStore, Snapshot};
pub use error::SessionError;
pub use i18n::Language;
pub use query::{QueryPipeline, RejectReason, SubmitOutcome};
pub use registry::DocumentRegistry;
pub use remote::{DocChatBackend, HttpBackend, QueryRequest, RemoteError, RemoteResult};
pub use selection::{SelectionModel, Toggle};
pub use session::{Session, SessionController, SessionPhase};
pub use types::{ChatMessage, Document, HistorySummary, Role, SessionInfo, UploadReceipt};
