//! Cross-collection consistency auditing and repair.
//!
//! The approval workflow's partial failures leave the three collections in
//! one of a closed set of divergence classes. This auditor loads all three
//! collections, joins applications to identities by normalized email and to
//! profiles by identity id, classifies every divergence, and repairs the
//! fixable subset with the same primitives the approval engine uses.
//!
//! Repairs run as an independent best-effort loop: one item failing never
//! aborts the rest, and a failed item is simply picked up again by the next
//! audit run. The full collections are loaded unpaginated, which is
//! acceptable at the hundreds-of-rows scale this system targets.

use std::{collections::HashMap, sync::Arc};

use tracing::{debug, info, warn};

use anaokulu_store::Backend;
use anaokulu_types::{
    AdminError, Application, ApplicationStatus, ConsistencyReport, FixDetail, FixReport, Identity,
    IdentityId, IdentityMetadata, Inconsistency, InconsistencyKind, NewIdentity, Profile, Result,
    Role, TableCounts, error::{InternalSnafu, NotFoundSnafu}, normalize_email, validate_email,
};

use crate::RedirectConfig;

/// Detects and repairs divergence across applications, identities, and
/// profiles.
pub struct ConsistencyAuditor<B> {
    store: Arc<B>,
    redirects: RedirectConfig,
}

impl<B: Backend> ConsistencyAuditor<B> {
    /// Creates an auditor over the given store backend.
    pub fn new(store: Arc<B>, redirects: RedirectConfig) -> Self {
        Self { store, redirects }
    }

    /// Computes the current set of inconsistencies.
    ///
    /// One application may yield several records; the checks are
    /// independent (an approved application with a malformed email reports
    /// both `approved_no_user` and `invalid_email_format`).
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Store`] if any collection cannot be loaded.
    pub async fn detect(&self) -> Result<Vec<Inconsistency>> {
        let (applications, identities, profiles) = self.load_collections().await?;
        Ok(scan(&applications, &identities, &profiles))
    }

    /// Wraps [`Self::detect`] with table row counts and severity tallies.
    /// Read-only; safe to call on every admin page load.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Store`] if any collection cannot be loaded.
    pub async fn report(&self) -> Result<ConsistencyReport> {
        let (applications, identities, profiles) = self.load_collections().await?;
        let inconsistencies = scan(&applications, &identities, &profiles);
        let table_counts = TableCounts {
            applications: applications.len(),
            identities: identities.len(),
            profiles: profiles.len(),
        };
        debug!(
            applications = table_counts.applications,
            identities = table_counts.identities,
            profiles = table_counts.profiles,
            found = inconsistencies.len(),
            "Consistency scan completed"
        );
        Ok(ConsistencyReport::new(table_counts, inconsistencies))
    }

    /// Repairs every fixable inconsistency in one best-effort pass.
    ///
    /// Failed items stay failed for this run; the next audit picks them up
    /// again. Non-fixable classes are never touched.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Store`] only when the initial detection scan
    /// cannot load the collections; per-item repair failures are reported in
    /// the [`FixReport`] instead.
    pub async fn fix_all(&self) -> Result<FixReport> {
        let (applications, identities, profiles) = self.load_collections().await?;
        let detected = scan(&applications, &identities, &profiles);

        let applications_by_email: HashMap<String, &Application> =
            applications.iter().map(|a| (normalize_email(&a.email), a)).collect();

        let mut report = FixReport::default();
        for item in detected.into_iter().filter(|i| i.fixable) {
            match self.fix_one(&item, &applications_by_email).await {
                Ok(message) => {
                    report.fixed += 1;
                    report.details.push(FixDetail {
                        kind: item.kind,
                        email: item.email,
                        repaired: true,
                        message,
                    });
                },
                Err(e) => {
                    warn!(kind = %item.kind, email = %item.email, error = %e, "Repair failed");
                    report.failed += 1;
                    report.details.push(FixDetail {
                        kind: item.kind,
                        email: item.email,
                        repaired: false,
                        message: e.to_string(),
                    });
                },
            }
        }

        info!(fixed = report.fixed, failed = report.failed, "Auto-fix pass completed");
        Ok(report)
    }

    /// Repairs a single detected item.
    async fn fix_one(
        &self,
        item: &Inconsistency,
        applications_by_email: &HashMap<String, &Application>,
    ) -> Result<String> {
        let email = normalize_email(&item.email);
        let application = applications_by_email
            .get(&email)
            .copied()
            .ok_or_else(|| NotFoundSnafu { entity: format!("application for {email}") }.build())?;

        match item.kind {
            InconsistencyKind::ApprovedNoUser => {
                // Re-run the account-creation path; a malformed email fails
                // this item alone, not the batch
                validate_email(&email)?;
                let request = NewIdentity {
                    email: email.clone(),
                    password: generate_repair_password(),
                    metadata: IdentityMetadata {
                        full_name: application.name.clone(),
                        role: Role::Parent,
                    },
                    redirect_to: self.redirects.password_setup_url.clone(),
                };
                let identity = self.store.create_identity(request).await.map_err(|e| {
                    AdminError::AccountCreation { email: email.clone(), message: e.to_string() }
                })?;
                if let Err(e) =
                    self.store.update_profile_name(identity.id, &application.name).await
                {
                    warn!(identity_id = %identity.id, error = %e, "Failed to patch profile name");
                }
                Ok(format!("Created account {} for {email}", identity.id))
            },

            InconsistencyKind::UserExistsPending => {
                self.store
                    .update_application_status(application.id, ApplicationStatus::Approved)
                    .await
                    .map_err(|e| AdminError::StatusUpdate {
                        application_id: application.id,
                        message: e.to_string(),
                    })?;
                Ok(format!("Marked application {} approved", application.id))
            },

            InconsistencyKind::MissingProfileName => {
                let identity = self
                    .store
                    .find_identity_by_email(&email)
                    .await?
                    .ok_or_else(|| {
                        NotFoundSnafu { entity: format!("identity for {email}") }.build()
                    })?;
                self.store.update_profile_name(identity.id, &application.name).await?;
                Ok(format!("Patched profile name for {email}"))
            },

            InconsistencyKind::EmailNotConfirmed | InconsistencyKind::InvalidEmailFormat => {
                // Filtered out by the caller; reaching here is a bug
                InternalSnafu { message: format!("{} is not auto-fixable", item.kind) }.fail()
            },
        }
    }

    async fn load_collections(&self) -> Result<(Vec<Application>, Vec<Identity>, Vec<Profile>)> {
        let applications = self.store.list_applications().await?;
        let identities = self.store.list_identities().await?;
        let profiles = self.store.list_profiles().await?;
        Ok((applications, identities, profiles))
    }
}

/// Pure classification pass over loaded collections.
fn scan(
    applications: &[Application],
    identities: &[Identity],
    profiles: &[Profile],
) -> Vec<Inconsistency> {
    let identities_by_email: HashMap<String, &Identity> =
        identities.iter().map(|i| (normalize_email(&i.email), i)).collect();
    let profiles_by_id: HashMap<IdentityId, &Profile> =
        profiles.iter().map(|p| (p.id, p)).collect();

    let mut found = Vec::new();

    for application in applications {
        let email = normalize_email(&application.email);

        if validate_email(&email).is_err() {
            found.push(Inconsistency::new(
                InconsistencyKind::InvalidEmailFormat,
                application.email.clone(),
                format!("Application {} has a malformed email address", application.id),
            ));
        }

        let identity = identities_by_email.get(&email).copied();

        match (application.status, identity) {
            (ApplicationStatus::Approved, None) => {
                found.push(Inconsistency::new(
                    InconsistencyKind::ApprovedNoUser,
                    application.email.clone(),
                    format!("Application {} is approved but no account exists", application.id),
                ));
            },
            (ApplicationStatus::Pending, Some(identity)) => {
                found.push(Inconsistency::new(
                    InconsistencyKind::UserExistsPending,
                    application.email.clone(),
                    format!(
                        "Account {} exists but application {} is still pending",
                        identity.id, application.id
                    ),
                ));
            },
            _ => {},
        }

        if let Some(identity) = identity {
            if identity.email_confirmed_at.is_none() {
                found.push(Inconsistency::new(
                    InconsistencyKind::EmailNotConfirmed,
                    application.email.clone(),
                    format!("Account {} has not confirmed its email", identity.id),
                ));
            }
            if let Some(profile) = profiles_by_id.get(&identity.id) {
                if profile.name.trim().is_empty() {
                    found.push(Inconsistency::new(
                        InconsistencyKind::MissingProfileName,
                        application.email.clone(),
                        format!("Profile {} is missing its display name", identity.id),
                    ));
                }
            }
        }
    }

    found
}

/// Temporary password for accounts recreated during repair; same contract as
/// the approval engine's (never surfaced to the user).
fn generate_repair_password() -> String {
    use rand::{Rng, distributions::Alphanumeric};
    rand::thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect()
}
