use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Unauthorized - token may be expired")]
    Unauthorized { detail: Option<String> },

    #[error("Access denied: {}", detail.as_deref().unwrap_or("forbidden"))]
    Forbidden { detail: Option<String> },

    #[error("Resource not found: {}", detail.as_deref().unwrap_or("not found"))]
    NotFound { detail: Option<String> },

    #[error("Server error ({status}): {body}")]
    Server {
        status: u16,
        detail: Option<String>,
        body: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Error body shape of the remote API: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// The server-supplied `detail` message, when the body carries a string one.
    pub fn detail_from_body(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        match parsed.detail {
            serde_json::Value::String(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = Self::detail_from_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized { detail },
            403 => ApiError::Forbidden { detail },
            404 => ApiError::NotFound { detail },
            code => ApiError::Server {
                status: code,
                detail,
                body: Self::truncate_body(body),
            },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Forbidden { .. } => Some(403),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Network(_)
            | ApiError::Timeout
            | ApiError::InvalidResponse(_)
            | ApiError::InvalidRequest(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Server-supplied message for status failures, if the server sent one.
    pub fn server_detail(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { detail }
            | ApiError::Forbidden { detail }
            | ApiError::NotFound { detail }
            | ApiError::Server { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Message shown to the user: the server detail when there is one, else
    /// the transport-level description of the failure.
    pub fn user_message(&self) -> String {
        if let Some(detail) = self.server_detail() {
            return detail.to_string();
        }
        match self {
            ApiError::Timeout => "Request timed out. Please try again.".to_string(),
            ApiError::Network(m) if !m.is_empty() => m.clone(),
            ApiError::InvalidResponse(m) if !m.is_empty() => m.clone(),
            ApiError::InvalidRequest(m) if !m.is_empty() => self.to_string(),
            other => match other.status() {
                Some(status) => format!("Request failed with status code {}", status),
                None => "Request failed".to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::InvalidResponse(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}
