use crate::remote::RemoteError;
use crate::session::SessionPhase;

/// Failures the session controller hands back to its caller.
///
/// Query failures never show up here; the query pipeline renders them as
/// assistant turns instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("could not initialize session: {0}")]
    Initialization(RemoteError),

    #[error("could not attach document: {0}")]
    Attach(RemoteError),

    #[error("could not upload document: {0}")]
    Upload(RemoteError),

    #[error("could not switch session: {0}")]
    Switch(RemoteError),

    #[error("could not clear history: {0}")]
    Clear(RemoteError),

    #[error("remote call failed: {0}")]
    Remote(RemoteError),

    #[error("{operation} is not allowed while {phase}")]
    InvalidState {
        operation: &'static str,
        phase: SessionPhase,
    },

    #[error("active session changed while the request was in flight")]
    SessionChanged,
}

impl SessionError {
    /// The underlying remote failure, if there was one.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            SessionError::Initialization(err)
            | SessionError::Attach(err)
            | SessionError::Upload(err)
            | SessionError::Switch(err)
            | SessionError::Clear(err)
            | SessionError::Remote(err) => Some(err),
            SessionError::InvalidState { .. } | SessionError::SessionChanged => None,
        }
    }
}
