//! Client error taxonomy.
//!
//! ERROR HANDLING
//! ==============
//! Recoverable failures (token decode, proactive refresh) are absorbed where
//! they happen and never reach this type. Everything here is something the
//! calling component has to deal with: a terminal auth failure after session
//! teardown, or a non-401 response passed through unchanged.

use serde_json::Value;

use crate::storage::StorageError;
use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status.
    #[error("request failed with status {status}")]
    Status { status: u16, body: Value },

    /// Login succeeded at the HTTP level but lacked a token or user.
    #[error("Invalid login response structure")]
    InvalidLoginResponse,

    /// A refresh response carried no access token under any known field.
    #[error("refresh response did not contain an access token")]
    MissingAccessToken,

    /// A refresh this request was queued behind did not produce a token.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// The server returned `{ success: false }`.
    #[error("api error: {0}")]
    Api(String),

    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status for `Status` errors.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Sentence suitable for showing to an end user.
    ///
    /// Server-provided `message`/`error` strings win over the generic status
    /// text so validation details survive.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { status, body } => server_message(body)
                .map_or_else(|| status_message(*status).to_owned(), str::to_owned),
            Self::Api(message) => message.clone(),
            Self::Transport(_) => "Unable to reach the server. Check your connection and try again.".to_owned(),
            Self::RefreshFailed(_) => "Your session has expired. Please sign in again.".to_owned(),
            Self::InvalidLoginResponse => {
                "Sign-in failed: the server sent an unexpected response. Please try again.".to_owned()
            }
            other => other.to_string(),
        }
    }
}

fn server_message(body: &Value) -> Option<&str> {
    ["message", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .filter(|message| !message.is_empty())
}

/// Map an HTTP status code to the message shown for it.
#[must_use]
pub fn status_message(status: u16) -> &'static str {
    match status {
        400 => "The request was invalid. Please check your input.",
        401 => "Your session has expired. Please sign in again.",
        403 => "You do not have permission to perform this action.",
        404 => "The requested resource was not found.",
        409 => "This record was changed by someone else. Reload and try again.",
        422 => "Some fields failed validation.",
        429 => "Too many requests. Please wait a moment and try again.",
        500 => "The server encountered an error. Please try again later.",
        502 | 504 => "The server is not responding. Please try again later.",
        503 => "The service is temporarily unavailable.",
        _ => "An unexpected error occurred.",
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
