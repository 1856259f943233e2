//! Error types for the anaokulu back office using snafu.
//!
//! The taxonomy follows the workflow's failure origins rather than exception
//! classes:
//! - Validation errors (pre-network, never partially applied)
//! - Store errors (transport and API failures from the backend service)
//! - Workflow errors (account creation, status update, notification)
//! - Lookup and terminal-state errors (not-found, already-processed,
//!   already-verified)
//!
//! Each variant maps to an [`ErrorCode`] with a unique numeric identifier,
//! retryability classification, and suggested recovery action.

use core::fmt;

use snafu::{Location, Snafu};

use crate::{
    types::{ApplicationId, ApplicationStatus},
    validation::ValidationError,
};

/// Unified result type for back-office operations.
pub type Result<T, E = AdminError> = std::result::Result<T, E>;

/// Machine-readable error codes for programmatic error handling.
///
/// Each [`AdminError`] variant maps to a unique numeric code. Codes are
/// organized into ranges:
///
/// | Range     | Domain            | Examples                                |
/// |-----------|-------------------|------------------------------------------|
/// | 1000–1099 | Validation        | Malformed email                          |
/// | 2000–2099 | Store             | Backend unreachable, rejected request    |
/// | 3000–3099 | Workflow          | Account creation, status update, email   |
/// | 3100–3199 | Lookup / state    | Not found, already processed/verified    |
/// | 3200–3299 | Internal          | Invariant violation                      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // --- Validation errors (1000–1099) ---
    /// Input failed shape validation before any network call.
    ValidationFailed = 1000,

    // --- Store errors (2000–2099) ---
    /// Backend service temporarily unreachable.
    StoreUnavailable = 2000,
    /// Backend rejected the request (non-transient).
    StoreRequest = 2001,

    // --- Workflow errors (3000–3099) ---
    /// Identity creation failed; the application was left pending.
    AccountCreation = 3000,
    /// Status write failed after the account was created.
    StatusUpdate = 3001,
    /// Transactional email dispatch failed.
    Notification = 3002,

    // --- Lookup / state errors (3100–3199) ---
    /// No record matches the given email or id.
    NotFound = 3100,
    /// The application already reached a terminal status.
    AlreadyProcessed = 3101,
    /// The email address is already confirmed.
    AlreadyVerified = 3102,

    // --- Internal errors (3200–3299) ---
    /// Unexpected state or invariant violation.
    Internal = 3200,
}

impl ErrorCode {
    /// Returns the numeric code value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Converts a numeric code to an `ErrorCode`, returning `None` for unknown values.
    #[must_use]
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1000 => Some(Self::ValidationFailed),
            2000 => Some(Self::StoreUnavailable),
            2001 => Some(Self::StoreRequest),
            3000 => Some(Self::AccountCreation),
            3001 => Some(Self::StatusUpdate),
            3002 => Some(Self::Notification),
            3100 => Some(Self::NotFound),
            3101 => Some(Self::AlreadyProcessed),
            3102 => Some(Self::AlreadyVerified),
            3200 => Some(Self::Internal),
            _ => None,
        }
    }

    /// Whether this error is retryable.
    ///
    /// Retryable errors may succeed on a subsequent attempt. Non-retryable
    /// errors require corrective action (or none at all, for the benign
    /// terminal-state codes) before retrying.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::StoreUnavailable | Self::Notification)
    }

    /// Suggested recovery action for this error code.
    ///
    /// Returns a human-readable string describing what the operator should do.
    /// This guidance is stable and safe to display in the admin UI.
    #[must_use]
    pub const fn suggested_action(self) -> &'static str {
        match self {
            Self::ValidationFailed => {
                "Correct the email address on the application and retry. No account was created."
            },
            Self::StoreUnavailable => {
                "Retry after a short delay. The backend service may be briefly unreachable."
            },
            Self::StoreRequest => {
                "Inspect the backend response. The request needs correction before retrying."
            },
            Self::AccountCreation => {
                "Check whether an account already exists for this email, then run the consistency audit."
            },
            Self::StatusUpdate => {
                "The account exists but the application row was not updated. Run the auto-fix to converge."
            },
            Self::Notification => {
                "The account and status are correct. Resend the email from the verification panel."
            },
            Self::NotFound => "Verify the email or id refers to an existing record.",
            Self::AlreadyProcessed => {
                "No action needed. The application already reached a terminal status."
            },
            Self::AlreadyVerified => "No action needed. The address is already confirmed.",
            Self::Internal => {
                "Unexpected state or invariant violation. Collect context and report as an issue."
            },
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Top-level error type for back-office operations.
///
/// Every public engine operation returns this; nothing panics across the
/// engine boundary, so the admin surface can render any failure as a
/// notification.
///
/// # Recovery Guide
///
/// | Variant            | Retryable | Recovery Action                                   |
/// | ------------------ | --------- | ------------------------------------------------- |
/// | `Validation`       | No        | Fix the input; nothing was applied                |
/// | `Store`            | Maybe     | Retry transport failures; inspect API rejections  |
/// | `AccountCreation`  | No        | Check for an existing account, then audit         |
/// | `StatusUpdate`     | No        | Known divergence class; auto-fix converges it     |
/// | `Notification`     | Yes       | Core state is correct; resend the email           |
/// | `NotFound`         | No        | Verify the email/id                               |
/// | `AlreadyProcessed` | No        | Benign no-op; application is terminal             |
/// | `AlreadyVerified`  | No        | Benign no-op; address already confirmed           |
/// | `Internal`         | No        | Report as issue with context                      |
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum AdminError {
    /// Input failed shape validation before any network call.
    ///
    /// **Recovery**: Not retryable. Nothing was applied; fix the input.
    #[snafu(display("Validation failed: {source}"))]
    #[snafu(context(false))]
    Validation {
        /// The violated constraint.
        source: ValidationError,
    },

    /// Store-layer error (transport failure or backend rejection).
    ///
    /// **Recovery**: Retryable when the underlying failure was transient
    /// (`retryable` is carried from the store layer's classification).
    #[snafu(display("Store error at {location}: {message}"))]
    Store {
        /// Error description from the store layer.
        message: String,
        /// Whether the store layer classified the failure as transient.
        retryable: bool,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// Identity creation failed (duplicate email, weak password, transport).
    ///
    /// **Recovery**: Not retryable as-is. The application is still pending and
    /// no partial state exists. A duplicate email means an account already
    /// exists — the consistency audit classifies that case.
    #[snafu(display("Account creation failed for {email}: {message}"))]
    AccountCreation {
        /// The email the account was being created for.
        email: String,
        /// Failure description.
        message: String,
    },

    /// The `applications.status` write failed after the account was created.
    ///
    /// **Recovery**: Not rolled back. This is the `user_exists_pending`
    /// divergence class; the auditor detects and repairs it.
    #[snafu(display("Status update failed for {application_id}: {message}"))]
    StatusUpdate {
        /// The application whose status write failed.
        application_id: ApplicationId,
        /// Failure description.
        message: String,
    },

    /// Transactional email dispatch failed.
    ///
    /// **Recovery**: Retryable. The core state (account + status) is already
    /// correct; trigger a resend.
    #[snafu(display("Email dispatch failed for {email}: {message}"))]
    Notification {
        /// Intended recipient.
        email: String,
        /// Failure description.
        message: String,
    },

    /// No record matches the given email or id.
    ///
    /// **Recovery**: Not retryable. Verify the reference.
    #[snafu(display("Not found: {entity}"))]
    NotFound {
        /// Description of the missing record.
        entity: String,
    },

    /// The application already reached a terminal status.
    ///
    /// **Recovery**: Benign no-op failure with an explanatory message; not a
    /// crash and not retried.
    #[snafu(display("Application {application_id} is already {status}"))]
    AlreadyProcessed {
        /// The application in a terminal state.
        application_id: ApplicationId,
        /// Its current status.
        status: ApplicationStatus,
    },

    /// The email address is already confirmed.
    ///
    /// **Recovery**: Benign no-op failure; the resend/override primitive is
    /// never invoked for it.
    #[snafu(display("Email {email} is already verified"))]
    AlreadyVerified {
        /// The confirmed address.
        email: String,
    },

    /// Internal error (unexpected state, invariant violation).
    ///
    /// **Recovery**: Not retryable. This indicates a bug; collect the error
    /// context and report as an issue.
    #[snafu(display("Internal error at {location}: {message}"))]
    Internal {
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },
}

impl AdminError {
    /// Returns the machine-readable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { .. } => ErrorCode::ValidationFailed,
            Self::Store { retryable, .. } => {
                if *retryable {
                    ErrorCode::StoreUnavailable
                } else {
                    ErrorCode::StoreRequest
                }
            },
            Self::AccountCreation { .. } => ErrorCode::AccountCreation,
            Self::StatusUpdate { .. } => ErrorCode::StatusUpdate,
            Self::Notification { .. } => ErrorCode::Notification,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::AlreadyProcessed { .. } => ErrorCode::AlreadyProcessed,
            Self::AlreadyVerified { .. } => ErrorCode::AlreadyVerified,
            Self::Internal { .. } => ErrorCode::Internal,
        }
    }

    /// Whether this error is retryable.
    ///
    /// Delegates to [`ErrorCode::is_retryable`] for consistency with the
    /// rendered error surface.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// Suggested recovery action for this error.
    ///
    /// Delegates to [`ErrorCode::suggested_action`].
    #[must_use]
    pub const fn suggested_action(&self) -> &'static str {
        self.code().suggested_action()
    }

    /// Whether this failure is a benign no-op (terminal-state guard) rather
    /// than something going wrong.
    #[must_use]
    pub const fn is_benign(&self) -> bool {
        matches!(self, Self::AlreadyProcessed { .. } | Self::AlreadyVerified { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashSet;

    use uuid::Uuid;

    use super::*;

    /// Returns all ErrorCode variants.
    fn all_error_codes() -> Vec<ErrorCode> {
        vec![
            ErrorCode::ValidationFailed,
            ErrorCode::StoreUnavailable,
            ErrorCode::StoreRequest,
            ErrorCode::AccountCreation,
            ErrorCode::StatusUpdate,
            ErrorCode::Notification,
            ErrorCode::NotFound,
            ErrorCode::AlreadyProcessed,
            ErrorCode::AlreadyVerified,
            ErrorCode::Internal,
        ]
    }

    #[test]
    fn test_error_code_numeric_uniqueness() {
        let mut seen = HashSet::new();
        for code in all_error_codes() {
            let numeric = code.as_u16();
            assert!(seen.insert(numeric), "Duplicate error code: {numeric} for {code:?}");
        }
    }

    #[test]
    fn test_error_code_round_trip() {
        for code in all_error_codes() {
            assert_eq!(ErrorCode::from_u16(code.as_u16()), Some(code));
        }
    }

    #[test]
    fn test_error_code_unknown_value_returns_none() {
        assert_eq!(ErrorCode::from_u16(0), None);
        assert_eq!(ErrorCode::from_u16(1500), None);
        assert_eq!(ErrorCode::from_u16(9999), None);
    }

    #[test]
    fn test_validation_codes_in_range() {
        let n = ErrorCode::ValidationFailed.as_u16();
        assert!((1000..2000).contains(&n));
    }

    #[test]
    fn test_store_codes_in_range() {
        for code in [ErrorCode::StoreUnavailable, ErrorCode::StoreRequest] {
            assert!((2000..3000).contains(&code.as_u16()));
        }
    }

    #[test]
    fn test_workflow_codes_in_range() {
        for code in [
            ErrorCode::AccountCreation,
            ErrorCode::StatusUpdate,
            ErrorCode::Notification,
            ErrorCode::NotFound,
            ErrorCode::AlreadyProcessed,
            ErrorCode::AlreadyVerified,
            ErrorCode::Internal,
        ] {
            assert!((3000..4000).contains(&code.as_u16()));
        }
    }

    #[test]
    fn test_retryable_codes() {
        assert!(ErrorCode::StoreUnavailable.is_retryable());
        assert!(ErrorCode::Notification.is_retryable());
    }

    #[test]
    fn test_non_retryable_codes() {
        for code in [
            ErrorCode::ValidationFailed,
            ErrorCode::StoreRequest,
            ErrorCode::AccountCreation,
            ErrorCode::StatusUpdate,
            ErrorCode::NotFound,
            ErrorCode::AlreadyProcessed,
            ErrorCode::AlreadyVerified,
            ErrorCode::Internal,
        ] {
            assert!(!code.is_retryable(), "{code:?} should not be retryable");
        }
    }

    #[test]
    fn test_suggested_action_non_empty() {
        for code in all_error_codes() {
            assert!(!code.suggested_action().is_empty(), "{code:?} has empty suggested_action");
        }
    }

    #[test]
    fn test_validation_error_converts() {
        let source = ValidationError {
            field: "email".to_string(),
            constraint: "must contain an '@'".to_string(),
        };
        let err: AdminError = source.into();
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert!(err.to_string().contains("must contain an '@'"));
    }

    #[test]
    fn test_store_error_code_follows_retryability() {
        let transient = AdminError::Store {
            message: "connect timeout".to_string(),
            retryable: true,
            location: snafu::Location::new("test.rs", 1, 1),
        };
        assert_eq!(transient.code(), ErrorCode::StoreUnavailable);
        assert!(transient.is_retryable());

        let rejected = AdminError::Store {
            message: "permission denied".to_string(),
            retryable: false,
            location: snafu::Location::new("test.rs", 1, 1),
        };
        assert_eq!(rejected.code(), ErrorCode::StoreRequest);
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn test_already_processed_display() {
        let id = ApplicationId::new(Uuid::nil());
        let err = AdminError::AlreadyProcessed {
            application_id: id,
            status: ApplicationStatus::Approved,
        };
        assert_eq!(err.to_string(), format!("Application {id} is already approved"));
        assert!(err.is_benign());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_already_verified_is_benign() {
        let err = AdminError::AlreadyVerified { email: "a@x.com".to_string() };
        assert!(err.is_benign());
        assert_eq!(err.code(), ErrorCode::AlreadyVerified);
    }

    #[test]
    fn test_notification_retryable() {
        let err = AdminError::Notification {
            email: "a@x.com".to_string(),
            message: "smtp relay refused".to_string(),
        };
        assert!(err.is_retryable());
        assert!(!err.is_benign());
    }

    #[test]
    fn test_suggested_action_delegates_to_code() {
        let err = AdminError::NotFound { entity: "identity for a@x.com".to_string() };
        assert_eq!(err.suggested_action(), ErrorCode::NotFound.suggested_action());
    }
}
