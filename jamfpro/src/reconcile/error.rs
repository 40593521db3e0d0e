use std::time::Duration;

use thiserror::Error;
use tfplug::{Diagnostic, RetryFailure};

use super::lookup::LookupFailure;
use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid ID '{raw}': {reason}")]
    InvalidId { raw: String, reason: String },

    #[error("{0}")]
    Construct(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Lookup(#[from] LookupFailure),

    #[error("timed out after {elapsed:?}")]
    Timeout {
        elapsed: Duration,
        last: Option<String>,
    },

    #[error("operation cancelled")]
    Cancelled { last: Option<String> },
}

impl ReconcileError {
    /// Remote entity is gone: every lookup answered 404
    pub fn is_not_found(&self) -> bool {
        match self {
            ReconcileError::Lookup(failure) => failure.is_not_found(),
            ReconcileError::Api(e) => e.status() == Some(404),
            _ => false,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ReconcileError::Api(e) => e.detail(),
            ReconcileError::Lookup(failure) => failure.detail(),
            ReconcileError::Timeout { elapsed, last } => with_last_error(
                format!("Operation timed out after {:.1}s", elapsed.as_secs_f64()),
                last,
            ),
            ReconcileError::Cancelled { last } => {
                with_last_error("Operation cancelled".to_string(), last)
            }
            other => other.to_string(),
        }
    }

    /// Error diagnostic naming the action and the resource
    pub fn to_diagnostic(&self, action: &str, kind: &str, name: &str) -> Diagnostic {
        let name = if name.is_empty() { "unknown" } else { name };
        Diagnostic::error(
            format!("Failed to {} Jamf Pro {} '{}'", action, kind, name),
            self.detail(),
        )
    }
}

fn with_last_error(message: String, last: &Option<String>) -> String {
    match last {
        Some(last) => format!("{}; last error: {}", message, last),
        None => message,
    }
}

impl<E> From<RetryFailure<E>> for ReconcileError
where
    E: Into<ReconcileError>,
{
    fn from(failure: RetryFailure<E>) -> Self {
        match failure {
            RetryFailure::Failed(e) => e.into(),
            RetryFailure::Timeout { elapsed, last } => ReconcileError::Timeout {
                elapsed,
                last: last.map(|e| e.into().detail()),
            },
            RetryFailure::Cancelled { last } => ReconcileError::Cancelled {
                last: last.map(|e| e.into().detail()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict() -> ApiError {
        ApiError::ApiError {
            status: 409,
            message: "Name already in use".to_string(),
            details: None,
        }
    }

    #[test]
    fn diagnostic_names_action_and_resource() {
        let diag = ReconcileError::from(conflict()).to_diagnostic("create", "Department", "Engineering");

        assert!(diag.is_error());
        assert_eq!(diag.summary, "Failed to create Jamf Pro Department 'Engineering'");
        assert_eq!(diag.detail, "API Error (Code: 409): Name already in use");
    }

    #[test]
    fn unnamed_resource_is_reported_as_unknown() {
        let diag = ReconcileError::Construct("group 'Ops' does not exist".to_string())
            .to_diagnostic("update", "Account", "");

        assert_eq!(diag.summary, "Failed to update Jamf Pro Account 'unknown'");
        assert_eq!(diag.detail, "group 'Ops' does not exist");
    }

    #[test]
    fn timeout_keeps_last_error() {
        let failure: RetryFailure<ApiError> = RetryFailure::Timeout {
            elapsed: Duration::from_millis(1500),
            last: Some(ApiError::Timeout(30)),
        };

        let err = ReconcileError::from(failure);
        assert_eq!(
            err.detail(),
            "Operation timed out after 1.5s; last error: Request timeout after 30 seconds"
        );
    }

    #[test]
    fn failed_retry_unwraps_the_error() {
        let err = ReconcileError::from(RetryFailure::Failed(conflict()));
        assert!(matches!(err, ReconcileError::Api(ApiError::ApiError { status: 409, .. })));
        assert!(!err.is_not_found());
    }
}
