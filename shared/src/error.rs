use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a page fetch collaborator.
///
/// `Cancelled` means the request was superseded and is never shown to the user.
/// Every other kind is recoverable: the controller turns it into
/// [`user_facing_message`](Self::user_facing_message) and keeps its last good state.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum NetworkError {
    #[error("request was cancelled")]
    Cancelled,

    #[error("request was not authorized")]
    Unauthorized,

    #[error("server returned an invalid response")]
    InvalidResponse,

    #[error("failed to decode response body")]
    DecodingFailed,

    #[error("server error: {0}")]
    ServerError(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl NetworkError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::Unauthorized => "AUTH_ERROR",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::DecodingFailed => "DESERIALIZATION_ERROR",
            Self::ServerError(_) => "SERVER_ERROR",
            Self::Transport(_) => "NETWORK_ERROR",
        }
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self {
            Self::Cancelled => String::new(),
            Self::Unauthorized => "Your session has expired. Please sign in again.".into(),
            Self::InvalidResponse => {
                "The server sent an unexpected response. Please try again.".into()
            }
            Self::DecodingFailed => {
                "A data error occurred. Please contact support if this persists.".into()
            }
            Self::ServerError(message) if !message.trim().is_empty() => message.clone(),
            Self::ServerError(_) => {
                "An unexpected error occurred. Please try again or contact support.".into()
            }
            Self::Transport(_) => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
        }
    }

    /// Maps a non-success HTTP status to an error, preferring the server's own message.
    #[must_use]
    pub fn from_http_status(status: u16, body: Option<&[u8]>) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            _ => {
                let message = body
                    .and_then(|b| serde_json::from_slice::<ApiErrorResponse>(b).ok())
                    .map(|e| e.message)
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| format!("HTTP error: {status}"));
                Self::ServerError(message)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    message: String,
}

pub type FetchResult<T> = Result<T, NetworkError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("page_size must be between 1 and {max}, got {value}")]
    PageSizeOutOfRange { value: u32, max: u32 },

    #[error("search_debounce_ms must be at most {max}, got {value}")]
    DebounceTooLong { value: u64, max: u64 },

    #[error("default sort field cannot be empty")]
    EmptySortField,
}
