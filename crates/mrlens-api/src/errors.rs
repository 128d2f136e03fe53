/// Failure while retrieving projects or merge requests.
///
/// Always recoverable: callers keep their last good snapshot and retry on the
/// next poll.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} responded with status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl FetchError {
    pub fn endpoint(&self) -> &str {
        match self {
            FetchError::Transport { endpoint, .. }
            | FetchError::Status { endpoint, .. }
            | FetchError::Decode { endpoint, .. } => endpoint,
        }
    }
}

/// Failure of a user triggered, backend mutating request. Never retried.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} responded with status {status}: {detail}")]
    Status {
        endpoint: String,
        status: u16,
        detail: String,
    },
}

pub(crate) fn transport_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".into()
    } else if err.is_connect() {
        "failed to connect to server".into()
    } else {
        err.to_string()
    }
}
