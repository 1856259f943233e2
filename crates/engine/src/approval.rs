//! Application approval and rejection workflow.
//!
//! `approve` executes six steps in strict sequence, each a separate network
//! call against the external stores. There is no transaction wrapping them:
//! a failure after account creation leaves a known divergence that the
//! consistency auditor detects and repairs, which is cheaper and simpler than
//! a rollback protocol the backend does not support.
//!
//! Step map and failure policy:
//!
//! | Step | Call                          | On failure                       |
//! |------|-------------------------------|----------------------------------|
//! | 1    | normalize + validate email    | abort, application stays pending |
//! | 2    | persist normalized email      | log and continue                 |
//! | 3    | create identity               | abort, nothing was created       |
//! | 4    | patch profile name            | log and continue                 |
//! | 5    | set status approved           | abort, auditor repairs later     |
//! | 6    | send credential-setup email   | log, report `email_sent: false`  |

use std::sync::Arc;

use rand::{Rng, distributions::Alphanumeric};
use tracing::{debug, info, warn};

use anaokulu_store::Backend;
use anaokulu_types::{
    AdminError, Application, ApplicationStatus, ApprovalOutcome, IdentityMetadata, NewIdentity,
    Result, Role, error::AlreadyProcessedSnafu, normalize_email, validate_email,
};
use snafu::ensure;

use crate::RedirectConfig;

/// Length of the generated temporary password.
///
/// 32 alphanumeric characters ≈ 190 bits of entropy; the user never sees it
/// and replaces it through the emailed credential-setup link.
const TEMP_PASSWORD_LEN: usize = 32;

/// Transitions pending applications into provisioned accounts.
pub struct ApprovalEngine<B> {
    store: Arc<B>,
    redirects: RedirectConfig,
}

impl<B: Backend> ApprovalEngine<B> {
    /// Creates an engine over the given store backend.
    pub fn new(store: Arc<B>, redirects: RedirectConfig) -> Self {
        Self { store, redirects }
    }

    /// Approves a pending application: creates the account, patches the
    /// profile, transitions the status, and dispatches the credential email.
    ///
    /// On success exactly one new identity and profile exist, the application
    /// is `Approved`, and `email_sent` reports whether the credential email
    /// went out. On failure the application is left in a state the
    /// consistency auditor can classify.
    ///
    /// # Errors
    ///
    /// - [`AdminError::AlreadyProcessed`] if the application is not pending
    /// - [`AdminError::Validation`] if the email fails shape validation
    /// - [`AdminError::AccountCreation`] if the identity store rejects the
    ///   account (duplicate email included)
    /// - [`AdminError::StatusUpdate`] if the status write fails after the
    ///   account exists
    pub async fn approve(&self, application: &Application) -> Result<ApprovalOutcome> {
        ensure!(
            application.status == ApplicationStatus::Pending,
            AlreadyProcessedSnafu { application_id: application.id, status: application.status }
        );

        // Step 1: normalize and validate before any network call
        let email = normalize_email(&application.email);
        validate_email(&email)?;

        // Step 2: best-effort persistence of the normalized form
        if email != application.email {
            if let Err(e) = self.store.update_application_email(application.id, &email).await {
                warn!(
                    application_id = %application.id,
                    error = %e,
                    "Failed to persist normalized email, continuing with in-memory value"
                );
            }
        }

        // Step 3: create the account; the confirmation email issued here
        // redirects to the credential-setup page
        let request = NewIdentity {
            email: email.clone(),
            password: generate_temp_password(),
            metadata: IdentityMetadata {
                full_name: application.name.clone(),
                role: Role::Parent,
            },
            redirect_to: self.redirects.password_setup_url.clone(),
        };
        let identity = self.store.create_identity(request).await.map_err(|e| {
            AdminError::AccountCreation { email: email.clone(), message: e.to_string() }
        })?;
        info!(
            application_id = %application.id,
            identity_id = %identity.id,
            "Identity created"
        );

        // Step 4: the store's auto-created profile does not carry the display
        // name; patch it. The missing_profile_name audit class covers a
        // failure here.
        if let Err(e) = self.store.update_profile_name(identity.id, &application.name).await {
            warn!(identity_id = %identity.id, error = %e, "Failed to patch profile name");
        }

        // Step 5: the one partial failure that strands an account behind a
        // pending application (user_exists_pending)
        self.store
            .update_application_status(application.id, ApplicationStatus::Approved)
            .await
            .map_err(|e| AdminError::StatusUpdate {
                application_id: application.id,
                message: e.to_string(),
            })?;

        // Step 6: credential-setup email; core state is already correct, so
        // a failure is reported, never rolled back
        let email_sent = match self
            .store
            .send_password_reset(&email, &self.redirects.password_setup_url)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(email = %email, error = %e, "Credential-setup email failed, resend manually");
                false
            },
        };

        info!(
            application_id = %application.id,
            identity_id = %identity.id,
            email_sent,
            "Application approved"
        );

        Ok(ApprovalOutcome { identity_id: identity.id, email, email_sent })
    }

    /// Rejects a pending application. No account is created.
    ///
    /// Re-rejecting an already-rejected application is a successful no-op;
    /// rejecting an approved one fails with
    /// [`AdminError::AlreadyProcessed`].
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::StatusUpdate`] if the status write fails.
    pub async fn reject(&self, application: &Application) -> Result<()> {
        match application.status {
            ApplicationStatus::Rejected => {
                debug!(application_id = %application.id, "Already rejected, treating as no-op");
                Ok(())
            },
            ApplicationStatus::Approved => AlreadyProcessedSnafu {
                application_id: application.id,
                status: application.status,
            }
            .fail(),
            ApplicationStatus::Pending => {
                self.store
                    .update_application_status(application.id, ApplicationStatus::Rejected)
                    .await
                    .map_err(|e| AdminError::StatusUpdate {
                        application_id: application.id,
                        message: e.to_string(),
                    })?;
                info!(application_id = %application.id, "Application rejected");
                Ok(())
            },
        }
    }
}

/// Generates a high-entropy temporary password.
fn generate_temp_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_PASSWORD_LEN)
        .map(char::from)
        .collect()
}
