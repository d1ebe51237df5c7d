use std::time::Duration;

/// Domain-level error for calendar operations.
///
/// These never travel on the JSON-RPC error channel; the tool layer renders
/// them into a tool result marked `isError: true`.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("authentication required: {message}. Re-authorize at {reauth_url}")]
    AuthRequired { message: String, reauth_url: String },

    #[error("calendar API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("calendar API call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CalendarError {
    /// Shorthand for an [`CalendarError::InvalidArgument`] with a formatted message.
    pub fn invalid(msg: impl Into<String>) -> Self {
        CalendarError::InvalidArgument(msg.into())
    }

    /// Stable machine-readable tag, surfaced next to the human message.
    pub fn kind(&self) -> &'static str {
        match self {
            CalendarError::NotFound(_) => "not_found",
            CalendarError::InvalidArgument(_) => "invalid_argument",
            CalendarError::AuthRequired { .. } => "auth_required",
            CalendarError::Upstream { .. } => "upstream",
            CalendarError::Timeout(_) => "timeout",
            CalendarError::Http(_) => "http",
            CalendarError::Internal(_) => "internal",
        }
    }

    /// Log the error at a level matching its cause.
    pub fn log(&self, tool: &str) {
        match self {
            CalendarError::NotFound(_) | CalendarError::InvalidArgument(_) => {
                tracing::info!(tool, error = %self, "Tool call rejected")
            }
            CalendarError::AuthRequired { .. } => {
                tracing::warn!(tool, "Calendar credentials missing or expired")
            }
            _ => tracing::error!(tool, error = %self, "Tool call failed"),
        }
    }
}

/// Convenience alias for calendar operations.
pub type CalendarResult<T> = Result<T, CalendarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_required_message_carries_url() {
        let err = CalendarError::AuthRequired {
            message: "token expired".to_string(),
            reauth_url: "https://accounts.example.com/auth".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("token expired"));
        assert!(text.contains("https://accounts.example.com/auth"));
        assert_eq!(err.kind(), "auth_required");
    }

    #[test]
    fn test_timeout_message() {
        let err = CalendarError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "calendar API call timed out after 30s");
        assert_eq!(err.kind(), "timeout");
    }

    #[test]
    fn test_invalid_shorthand() {
        let err = CalendarError::invalid("start_time must precede end_time");
        assert!(matches!(err, CalendarError::InvalidArgument(_)));
        assert_eq!(
            err.to_string(),
            "invalid argument: start_time must precede end_time"
        );
    }
}
