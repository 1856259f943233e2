//! Approval workflow and reconciliation engines for the anaokulu back office.
//!
//! Three engines share one store backend:
//!
//! - [`ApprovalEngine`] turns a pending application into a provisioned
//!   account, or fails safely leaving the application untouched.
//! - [`ConsistencyAuditor`] computes a divergence report across the three
//!   collections and auto-repairs the fixable subset.
//! - [`VerificationAuditor`] partitions identities by email confirmation
//!   state and orchestrates confirmation resends.
//!
//! [`AuditJob`] wraps the consistency auditor in an interval-driven
//! background task for deployments that want convergence without an admin
//! clicking refresh.
//!
//! ## Consistency Model
//!
//! The approval workflow executes its steps as independent network calls with
//! no distributed transaction; a failure mid-way leaves the collections in
//! one of the enumerated divergence classes rather than rolling back. The
//! auditors exist precisely because of that: this is a reconcile-later
//! design, not a prevention design. Two admins approving the same application
//! concurrently is not guarded client-side; the identity store's
//! duplicate-email conflict is the only backstop.

pub mod approval;
pub mod audit_job;
pub mod consistency;
pub mod verification;

pub use approval::ApprovalEngine;
pub use audit_job::AuditJob;
pub use consistency::ConsistencyAuditor;
pub use verification::VerificationAuditor;

/// Where the transactional email links land the user.
#[derive(Debug, Clone)]
pub struct RedirectConfig {
    /// Target of the credential-setup link (account creation and password
    /// reset emails).
    pub password_setup_url: String,
    /// Target of the confirmation link in resent signup emails.
    pub login_url: String,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            password_setup_url: "/auth/set-veli-password".to_string(),
            login_url: "/auth/login".to_string(),
        }
    }
}
