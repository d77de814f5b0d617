use reqwest::StatusCode;
use searoute_core::InputError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected locally; nothing was sent.
    #[error(transparent)]
    Input(#[from] InputError),

    /// Route generation answered with a non-success status.
    #[error("no sea route found (status {status})")]
    NoRouteFound { status: StatusCode },

    /// The save did not commit. The server's prior version is unchanged and
    /// the pending save can be retried.
    #[error("save failed (status {status}): {message}")]
    SaveFailed { status: StatusCode, message: String },

    #[error("segment {segment_id} not found")]
    NotFound { segment_id: String },

    #[error("unexpected response (status {status}): {message}")]
    Unexpected { status: StatusCode, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// Whether resubmitting the same request could succeed.
    ///
    /// Transport errors count even when the server may have committed:
    /// retries go through the same [`crate::PendingSave`], whose request id
    /// makes the server replay the stored version instead of adding one.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::SaveFailed { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}
