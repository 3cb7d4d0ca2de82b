use thiserror::Error;

/// Outcome of a failed refresh-token exchange.
///
/// Cloned once per queued request, so every request waiting on the same
/// refresh is rejected with the same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("token refresh failed{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
pub struct RefreshFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl RefreshFailure {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn abandoned() -> Self {
        Self::new(None, "token refresh was abandoned before completing")
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unauthorized request to {path}")]
    Unauthorized { path: String },

    #[error("Session expired: {0}")]
    SessionExpired(#[from] RefreshFailure),

    #[error("Resource not found: {path}")]
    NotFound { path: String },

    #[error("Server responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Authentication,
    NotFound,
    Server,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::Http(_) => ErrorCategory::Network,
            ClientError::Unauthorized { .. } | ClientError::SessionExpired(_) => {
                ErrorCategory::Authentication
            }
            ClientError::NotFound { .. } => ErrorCategory::NotFound,
            ClientError::Status { .. } => ErrorCategory::Server,
            ClientError::ConfigValidationError { .. }
            | ClientError::InvalidConfigValueError { .. }
            | ClientError::MissingConfigError { .. }
            | ClientError::Url(_) => ErrorCategory::Configuration,
            ClientError::Serialization(_)
            | ClientError::Csv(_)
            | ClientError::ValidationError { .. } => ErrorCategory::Data,
            ClientError::Io(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ClientError::NotFound { .. } => ErrorSeverity::Low,
            ClientError::Http(_) | ClientError::Status { .. } => ErrorSeverity::Medium,
            ClientError::Unauthorized { .. }
            | ClientError::SessionExpired(_)
            | ClientError::Serialization(_)
            | ClientError::Csv(_)
            | ClientError::ValidationError { .. } => ErrorSeverity::High,
            ClientError::ConfigValidationError { .. }
            | ClientError::InvalidConfigValueError { .. }
            | ClientError::MissingConfigError { .. }
            | ClientError::Url(_)
            | ClientError::Io(_) => ErrorSeverity::Critical,
        }
    }

    /// True when the caller should drop its tokens and ask for a new login.
    pub fn is_session_expired(&self) -> bool {
        matches!(
            self,
            ClientError::SessionExpired(_) | ClientError::Unauthorized { .. }
        )
    }

    /// True only when a refresh attempt was rejected, so the stored tokens
    /// are known to be dead. A bare 401 leaves them in place.
    pub fn clears_session(&self) -> bool {
        matches!(self, ClientError::SessionExpired(_))
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Server => {
                "Failed to load, try again later.".to_string()
            }
            ErrorCategory::Authentication => {
                "Your session has expired. Please log in again.".to_string()
            }
            ErrorCategory::NotFound => "Nothing was found at this address.".to_string(),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Data => format!("Unexpected data: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check your network connection and the API base URL",
            ErrorCategory::Server => "The service may be temporarily unavailable; retry later",
            ErrorCategory::Authentication => "Run `docfinder login` to start a new session",
            ErrorCategory::NotFound => "Check the slug or identifier you passed",
            ErrorCategory::Configuration => "Review the configuration file and command-line flags",
            ErrorCategory::Data => "Check the input values; report the issue if it persists",
            ErrorCategory::System => "Check file permissions for the session and config files",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_failure_display() {
        let failure = RefreshFailure::new(Some(401), "token_not_valid");
        assert_eq!(failure.to_string(), "token refresh failed (401): token_not_valid");

        let failure = RefreshFailure::new(None, "no refresh token stored");
        assert_eq!(failure.to_string(), "token refresh failed: no refresh token stored");
    }

    #[test]
    fn test_session_errors_are_authentication() {
        let err: ClientError = RefreshFailure::abandoned().into();
        assert_eq!(err.category(), ErrorCategory::Authentication);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.is_session_expired());
        assert!(err.clears_session());
    }

    #[test]
    fn test_plain_unauthorized_keeps_session() {
        let err = ClientError::Unauthorized {
            path: "/cities/".to_string(),
        };
        assert!(err.is_session_expired());
        assert!(!err.clears_session());
    }

    #[test]
    fn test_status_error_is_banner_message() {
        let err = ClientError::Status {
            status: 503,
            body: "maintenance".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Server);
        assert_eq!(err.user_friendly_message(), "Failed to load, try again later.");
        assert!(!err.is_session_expired());
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = ClientError::MissingConfigError {
            field: "api.base_url".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.to_string(), "Missing required configuration: api.base_url");
    }
}
