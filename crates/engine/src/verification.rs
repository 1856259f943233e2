//! Email verification auditing and resend orchestration.
//!
//! The narrower companion to the consistency auditor, focused purely on the
//! unconfirmed-email condition: partition every identity by confirmation
//! state, resend confirmation emails with a guard against already-confirmed
//! addresses, and offer the manual admin override that stamps a confirmation
//! directly.
//!
//! Bulk resends pace themselves with a fixed inter-send delay as a courtesy
//! toward the transactional-email provider; this is deliberate pacing, not a
//! rate limiter with backoff.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use anaokulu_store::Backend;
use anaokulu_types::{
    AdminError, Identity, IdentityId, Profile, ResendDetail, ResendReport, Result,
    VerificationEntry, VerificationReport,
    error::{AlreadyVerifiedSnafu, NotFoundSnafu},
    normalize_email, validate_email,
};
use chrono::Utc;
use snafu::ensure;

use crate::RedirectConfig;

/// Fixed delay between sends in a bulk resend.
const DEFAULT_RESEND_PACING: Duration = Duration::from_secs(1);

/// Partitions identities by confirmation state and orchestrates resends.
pub struct VerificationAuditor<B> {
    store: Arc<B>,
    redirects: RedirectConfig,
    resend_pacing: Duration,
}

impl<B: Backend> VerificationAuditor<B> {
    /// Creates an auditor over the given store backend.
    pub fn new(store: Arc<B>, redirects: RedirectConfig) -> Self {
        Self { store, redirects, resend_pacing: DEFAULT_RESEND_PACING }
    }

    /// Overrides the inter-send delay of [`Self::resend_all`]. Primarily for
    /// tests.
    #[must_use]
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.resend_pacing = pacing;
        self
    }

    /// Partitions all identities into three disjoint sets: `invalid`
    /// (malformed address, checked first), `verified`, and `unverified`.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Store`] if identities or profiles cannot be
    /// loaded.
    pub async fn report(&self) -> Result<VerificationReport> {
        let identities = self.store.list_identities().await?;
        let profiles = self.store.list_profiles().await?;
        let profiles_by_id: HashMap<IdentityId, &Profile> =
            profiles.iter().map(|p| (p.id, p)).collect();

        let mut report = VerificationReport {
            generated_at: Utc::now(),
            verified: Vec::new(),
            unverified: Vec::new(),
            invalid: Vec::new(),
        };

        for identity in &identities {
            let entry = entry_for(identity, profiles_by_id.get(&identity.id).copied());
            if validate_email(&normalize_email(&identity.email)).is_err() {
                report.invalid.push(entry);
            } else if identity.is_confirmed() {
                report.verified.push(entry);
            } else {
                report.unverified.push(entry);
            }
        }

        Ok(report)
    }

    /// Resends the signup confirmation email to one address.
    ///
    /// The resend primitive is only invoked for an existing, well-formed,
    /// unconfirmed address; every other case fails before any email is sent.
    ///
    /// # Errors
    ///
    /// - [`AdminError::Validation`] if the address is malformed
    /// - [`AdminError::NotFound`] if no identity matches
    /// - [`AdminError::AlreadyVerified`] if the address is already confirmed
    ///   (benign guard, not a retryable state)
    /// - [`AdminError::Notification`] if the provider rejects the send
    pub async fn resend(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        validate_email(&email)?;

        let identity = self
            .store
            .find_identity_by_email(&email)
            .await?
            .ok_or_else(|| NotFoundSnafu { entity: format!("identity for {email}") }.build())?;

        ensure!(!identity.is_confirmed(), AlreadyVerifiedSnafu { email: email.clone() });

        self.store
            .resend_signup_confirmation(&email, &self.redirects.login_url)
            .await
            .map_err(|e| AdminError::Notification { email: email.clone(), message: e.to_string() })?;

        info!(email = %email, "Confirmation email resent");
        Ok(())
    }

    /// Resends the confirmation email to every unverified identity, pacing
    /// the sends. One recipient failing never stops the loop.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Store`] only when the initial report cannot be
    /// computed; per-recipient failures are recorded in the [`ResendReport`].
    pub async fn resend_all(&self) -> Result<ResendReport> {
        let unverified = self.report().await?.unverified;

        let mut report = ResendReport {
            total: unverified.len(),
            ..ResendReport::default()
        };

        for (index, entry) in unverified.iter().enumerate() {
            if index > 0 {
                sleep(self.resend_pacing).await;
            }
            match self.resend(&entry.email).await {
                Ok(()) => {
                    report.success += 1;
                    report.details.push(ResendDetail {
                        email: entry.email.clone(),
                        sent: true,
                        message: "Confirmation email sent".to_string(),
                    });
                },
                Err(e) => {
                    warn!(email = %entry.email, error = %e, "Resend failed, continuing");
                    report.failed += 1;
                    report.details.push(ResendDetail {
                        email: entry.email.clone(),
                        sent: false,
                        message: e.to_string(),
                    });
                },
            }
        }

        info!(
            total = report.total,
            success = report.success,
            failed = report.failed,
            "Bulk confirmation resend completed"
        );
        Ok(report)
    }

    /// Stamps an email confirmed without the user clicking anything.
    ///
    /// This bypasses a security control, so it is an explicit admin action
    /// and never part of the consistency auditor's auto-fix set.
    ///
    /// # Errors
    ///
    /// - [`AdminError::Validation`] if the address is malformed
    /// - [`AdminError::NotFound`] if no identity matches
    /// - [`AdminError::AlreadyVerified`] if the address is already confirmed
    pub async fn verify_manually(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        validate_email(&email)?;

        let identity = self
            .store
            .find_identity_by_email(&email)
            .await?
            .ok_or_else(|| NotFoundSnafu { entity: format!("identity for {email}") }.build())?;

        ensure!(!identity.is_confirmed(), AlreadyVerifiedSnafu { email: email.clone() });

        self.store.confirm_email(&email).await?;
        info!(email = %email, "Email confirmed by admin override");
        Ok(())
    }
}

/// Builds a report entry, preferring the profile's display data and falling
/// back to the identity metadata.
fn entry_for(identity: &Identity, profile: Option<&Profile>) -> VerificationEntry {
    let name = match profile {
        Some(profile) if !profile.name.trim().is_empty() => profile.name.clone(),
        _ => identity.metadata.full_name.clone(),
    };
    let role = profile.map_or_else(|| identity.metadata.role.clone(), |p| p.role.clone());
    VerificationEntry {
        email: identity.email.clone(),
        name,
        role,
        created_at: identity.created_at,
        email_confirmed_at: identity.email_confirmed_at,
    }
}
