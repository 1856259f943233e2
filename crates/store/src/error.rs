//! Store-specific error types with retryability classification.
//!
//! Two tiers, in the manner of the workspace error taxonomy:
//! - **Transport errors**: connection failures, timeouts
//! - **API errors**: the backend answered and said no
//!
//! Transport failures and 5xx responses are retryable; everything else
//! requires corrective action first.

use snafu::{Location, Snafu};

/// Store error types with context-rich messages.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    /// HTTP transport failure (connect, timeout, TLS).
    #[snafu(display("Transport error at {location}: {source}"))]
    Http {
        /// Underlying transport error.
        source: reqwest::Error,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// The backend answered with an error status.
    #[snafu(display("Backend rejected the request (status={status}): {message}"))]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the backend body.
        message: String,
    },

    /// Unique-constraint violation (duplicate email).
    #[snafu(display("Conflict: {message}"))]
    Conflict {
        /// Conflict description.
        message: String,
    },

    /// The referenced record does not exist.
    #[snafu(display("Not found: {entity}"))]
    NotFound {
        /// Description of the missing record.
        entity: String,
    },

    /// Response body did not match the expected shape.
    #[snafu(display("Serialization error at {location}: {message}"))]
    Serialization {
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// Configuration validation error.
    #[snafu(display("Configuration error: {message}"))]
    Config {
        /// Error description.
        message: String,
    },

    /// Transient unavailability (injected by the test fake, or synthesized
    /// from backend maintenance responses).
    #[snafu(display("Store unavailable: {message}"))]
    Unavailable {
        /// Unavailability reason.
        message: String,
    },
}

impl StoreError {
    /// Returns true if the error is transient and the operation may be retried.
    ///
    /// Retryable: transport failures, injected unavailability, and 5xx
    /// responses. Non-retryable: 4xx rejections, conflicts, not-found,
    /// serialization and configuration errors.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { .. } | Self::Unavailable { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Conflict { .. }
            | Self::NotFound { .. }
            | Self::Serialization { .. }
            | Self::Config { .. } => false,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(source: reqwest::Error) -> Self {
        Self::Http { source, location: Location::default() }
    }
}

impl From<StoreError> for anaokulu_types::AdminError {
    #[track_caller]
    fn from(err: StoreError) -> Self {
        let loc = std::panic::Location::caller();
        let retryable = err.is_retryable();
        anaokulu_types::AdminError::Store {
            message: err.to_string(),
            retryable,
            location: snafu::Location::new(loc.file(), loc.line(), loc.column()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use anaokulu_types::ErrorCode;

    use super::*;

    #[test]
    fn test_api_5xx_retryable() {
        let err = StoreError::Api { status: 503, message: "maintenance".to_string() };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_api_4xx_not_retryable() {
        let err = StoreError::Api { status: 403, message: "forbidden".to_string() };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_conflict_not_retryable() {
        let err = StoreError::Conflict { message: "email already registered".to_string() };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unavailable_retryable() {
        let err = StoreError::Unavailable { message: "injected".to_string() };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_admin_error_conversion_keeps_retryability() {
        let transient: anaokulu_types::AdminError =
            StoreError::Unavailable { message: "injected".to_string() }.into();
        assert_eq!(transient.code(), ErrorCode::StoreUnavailable);

        let rejected: anaokulu_types::AdminError =
            StoreError::NotFound { entity: "profile".to_string() }.into();
        assert_eq!(rejected.code(), ErrorCode::StoreRequest);
    }

    #[test]
    fn test_display_includes_status() {
        let err = StoreError::Api { status: 422, message: "invalid payload".to_string() };
        assert!(err.to_string().contains("422"));
        assert!(err.to_string().contains("invalid payload"));
    }
}
