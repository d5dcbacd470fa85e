use thiserror::Error;

/// Failures surfaced by token acquisition and caching.
///
/// Every variant leaves the cached token untouched.
#[derive(Error, Debug)]
pub enum TokenError {
    /// A required setting is absent or unusable. Needs operator action.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The authentication endpoint could not be reached (DNS, refused, reset, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("authentication failed: {status} {reason}")]
    Authentication { status: u16, reason: String },

    /// The endpoint answered 2xx but the body or the token broke the contract.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TokenError {
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        TokenError::Authentication {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_owned(),
        }
    }

    /// Transport failures and 5xx answers may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            TokenError::Transport(_) => true,
            TokenError::Authentication { status, .. } => (500..=599).contains(status),
            TokenError::Configuration(_) | TokenError::Protocol(_) => false,
        }
    }

    /// Short label used for the failure metric.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Configuration(_) => "configuration",
            TokenError::Transport(_) => "transport",
            TokenError::Authentication { .. } => "authentication",
            TokenError::Protocol(_) => "protocol",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TokenError;

    #[test]
    fn authentication_message_carries_status_and_reason() {
        let err = TokenError::from_status(reqwest::StatusCode::UNAUTHORIZED);
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("Unauthorized"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_errors_are_retryable() {
        let err = TokenError::from_status(reqwest::StatusCode::BAD_GATEWAY);
        assert!(err.is_retryable());
        assert!(!TokenError::Protocol("no id_token".into()).is_retryable());
        assert!(!TokenError::Configuration("missing".into()).is_retryable());
    }
}
