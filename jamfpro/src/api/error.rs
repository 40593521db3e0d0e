use thiserror::Error;

use super::common::ApiErrorDetails;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        #[source]
        details: Option<Box<ApiErrorDetails>>,
    },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("Authentication failed (HTTP {status}): {message}")]
    AuthError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    /// HTTP status for errors the server answered with. A lookup that
    /// matched nothing reports 404.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ApiError { status, .. } | ApiError::AuthError { status, .. } => Some(*status),
            ApiError::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// Structured errors carry a status code and are not worth retrying
    pub fn is_structured(&self) -> bool {
        self.status().is_some()
    }

    /// Transport, timeout and decoding failures may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::RequestError(_) | ApiError::ParseError(_) | ApiError::Timeout(_)
        )
    }

    /// Diagnostic detail: `API Error (Code: <status>): <message>` for
    /// structured errors, the error text otherwise
    pub fn detail(&self) -> String {
        match self {
            ApiError::ApiError {
                status, message, ..
            }
            | ApiError::AuthError { status, message } => {
                format!("API Error (Code: {}): {}", status, message)
            }
            ApiError::NotFound { .. } => format!("API Error (Code: 404): {}", self),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let api = ApiError::ApiError {
            status: 409,
            message: "Duplicate name".to_string(),
            details: None,
        };
        assert!(api.is_structured());
        assert!(!api.is_transient());
        assert_eq!(api.detail(), "API Error (Code: 409): Duplicate name");

        let missing = ApiError::NotFound {
            kind: "Department",
            name: "Engineering".to_string(),
        };
        assert_eq!(missing.status(), Some(404));
        assert_eq!(
            missing.detail(),
            "API Error (Code: 404): Department 'Engineering' not found"
        );

        let timeout = ApiError::Timeout(60);
        assert!(!timeout.is_structured());
        assert!(timeout.is_transient());
        assert_eq!(timeout.detail(), "Request timeout after 60 seconds");

        let config = ApiError::InvalidConfig("bad url".to_string());
        assert!(!config.is_structured());
        assert!(!config.is_transient());
    }
}
