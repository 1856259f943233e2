//! In-memory store fake for engine testing.
//!
//! Provides a controllable implementation of both store traits without a real
//! backend:
//!
//! - **Seeding**: insert applications, identities, and profiles directly
//! - **Failure injection**: make the next N calls of one operation fail with
//!   [`StoreError::Unavailable`]
//! - **Email outbox**: every transactional email is recorded for assertions
//! - **Request counting**: per-operation counters for verification
//!
//! The fake reproduces one production quirk on purpose: creating an identity
//! auto-creates its profile with an *empty* display name (the real store's
//! trigger does not copy metadata), which is exactly what the approval
//! engine's profile-patch step compensates for.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use anaokulu_types::{
    Application, ApplicationId, ApplicationStatus, Identity, IdentityId, NewIdentity, Profile,
    Session,
};

use crate::{
    DirectoryStore, IdentityStore, Result,
    error::StoreError,
};

/// Operations that can be counted and failure-injected, one per trait method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// `list_applications`
    ListApplications,
    /// `get_application`
    GetApplication,
    /// `update_application_status`
    UpdateApplicationStatus,
    /// `update_application_email`
    UpdateApplicationEmail,
    /// `list_profiles`
    ListProfiles,
    /// `get_profile`
    GetProfile,
    /// `update_profile_name`
    UpdateProfileName,
    /// `set_profile_active`
    SetProfileActive,
    /// `create_identity`
    CreateIdentity,
    /// `list_identities`
    ListIdentities,
    /// `find_identity_by_email`
    FindIdentityByEmail,
    /// `send_password_reset`
    SendPasswordReset,
    /// `resend_signup_confirmation`
    ResendSignupConfirmation,
    /// `confirm_email`
    ConfirmEmail,
    /// `sign_in`
    SignIn,
    /// `set_session`
    SetSession,
}

/// Kind of transactional email recorded in the outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    /// Signup confirmation (initial or resent).
    SignupConfirmation,
    /// Password reset / credential setup.
    PasswordReset,
}

/// One transactional email the fake "sent".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    /// What kind of email.
    pub kind: EmailKind,
    /// Recipient address.
    pub to: String,
    /// Redirect target embedded in the email link.
    pub redirect_to: String,
}

/// Shared state behind the fake.
#[derive(Debug, Default)]
struct MemoryState {
    applications: HashMap<ApplicationId, Application>,
    identities: HashMap<IdentityId, Identity>,
    profiles: HashMap<IdentityId, Profile>,
    /// Passwords by email, for `sign_in`.
    passwords: HashMap<String, String>,
    /// Every transactional email, in dispatch order.
    outbox: Vec<SentEmail>,
    /// Last token pair adopted via `set_session`.
    session_tokens: Option<(String, String)>,
    /// Remaining injected failures per operation.
    failures: HashMap<StoreOp, usize>,
    /// Calls observed per operation (including failed ones).
    counts: HashMap<StoreOp, usize>,
}

/// In-memory implementation of [`DirectoryStore`] and [`IdentityStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Seeding and inspection
    // =========================================================================

    /// Seeds an application row.
    pub fn insert_application(&self, application: Application) {
        self.state.write().applications.insert(application.id, application);
    }

    /// Seeds an identity record without a profile (use
    /// [`Self::insert_profile`] when one is wanted).
    pub fn insert_identity(&self, identity: Identity) {
        self.state.write().identities.insert(identity.id, identity);
    }

    /// Seeds a profile row.
    pub fn insert_profile(&self, profile: Profile) {
        self.state.write().profiles.insert(profile.id, profile);
    }

    /// Returns a snapshot of one application.
    #[must_use]
    pub fn application(&self, id: ApplicationId) -> Option<Application> {
        self.state.read().applications.get(&id).cloned()
    }

    /// Returns a snapshot of the identity with the given email, if any.
    #[must_use]
    pub fn identity_by_email(&self, email: &str) -> Option<Identity> {
        self.state
            .read()
            .identities
            .values()
            .find(|i| i.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    /// Returns a snapshot of one profile.
    #[must_use]
    pub fn profile(&self, id: IdentityId) -> Option<Profile> {
        self.state.read().profiles.get(&id).cloned()
    }

    /// Returns every email the fake has "sent", in order.
    #[must_use]
    pub fn sent_emails(&self) -> Vec<SentEmail> {
        self.state.read().outbox.clone()
    }

    /// Makes the next `count` calls of `op` fail with
    /// [`StoreError::Unavailable`].
    pub fn inject_failures(&self, op: StoreOp, count: usize) {
        *self.state.write().failures.entry(op).or_insert(0) += count;
    }

    /// Number of calls observed for `op`, including injected failures.
    #[must_use]
    pub fn op_count(&self, op: StoreOp) -> usize {
        self.state.read().counts.get(&op).copied().unwrap_or(0)
    }

    /// Counts the call and consumes one injected failure if armed.
    fn record(&self, op: StoreOp) -> Result<()> {
        let mut state = self.state.write();
        *state.counts.entry(op).or_insert(0) += 1;
        if let Some(remaining) = state.failures.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Unavailable {
                    message: format!("injected failure for {op:?}"),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn list_applications(&self) -> Result<Vec<Application>> {
        self.record(StoreOp::ListApplications)?;
        Ok(self.state.read().applications.values().cloned().collect())
    }

    async fn get_application(&self, id: ApplicationId) -> Result<Option<Application>> {
        self.record(StoreOp::GetApplication)?;
        Ok(self.state.read().applications.get(&id).cloned())
    }

    async fn update_application_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<()> {
        self.record(StoreOp::UpdateApplicationStatus)?;
        let mut state = self.state.write();
        let application = state
            .applications
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound { entity: format!("application {id}") })?;
        application.status = status;
        Ok(())
    }

    async fn update_application_email(&self, id: ApplicationId, email: &str) -> Result<()> {
        self.record(StoreOp::UpdateApplicationEmail)?;
        let mut state = self.state.write();
        let application = state
            .applications
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound { entity: format!("application {id}") })?;
        application.email = email.to_string();
        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.record(StoreOp::ListProfiles)?;
        Ok(self.state.read().profiles.values().cloned().collect())
    }

    async fn get_profile(&self, id: IdentityId) -> Result<Option<Profile>> {
        self.record(StoreOp::GetProfile)?;
        Ok(self.state.read().profiles.get(&id).cloned())
    }

    async fn update_profile_name(&self, id: IdentityId, name: &str) -> Result<()> {
        self.record(StoreOp::UpdateProfileName)?;
        let mut state = self.state.write();
        let profile = state
            .profiles
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound { entity: format!("profile {id}") })?;
        profile.name = name.to_string();
        Ok(())
    }

    async fn set_profile_active(&self, id: IdentityId, active: bool) -> Result<()> {
        self.record(StoreOp::SetProfileActive)?;
        let mut state = self.state.write();
        let profile = state
            .profiles
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound { entity: format!("profile {id}") })?;
        profile.is_active = active;
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn create_identity(&self, request: NewIdentity) -> Result<Identity> {
        self.record(StoreOp::CreateIdentity)?;
        let mut state = self.state.write();

        if state.identities.values().any(|i| i.email.eq_ignore_ascii_case(&request.email)) {
            return Err(StoreError::Conflict {
                message: format!("email {} is already registered", request.email),
            });
        }

        let now = Utc::now();
        let identity = Identity {
            id: IdentityId::generate(),
            email: request.email.clone(),
            email_confirmed_at: None,
            created_at: now,
            metadata: request.metadata.clone(),
        };

        // The real store's trigger creates the profile from role metadata but
        // leaves the display name empty.
        let profile = Profile {
            id: identity.id,
            name: String::new(),
            role: request.metadata.role,
            is_active: true,
            created_at: now,
        };

        state.passwords.insert(request.email.clone(), request.password);
        state.outbox.push(SentEmail {
            kind: EmailKind::SignupConfirmation,
            to: request.email,
            redirect_to: request.redirect_to,
        });
        state.profiles.insert(profile.id, profile);
        state.identities.insert(identity.id, identity.clone());

        Ok(identity)
    }

    async fn list_identities(&self) -> Result<Vec<Identity>> {
        self.record(StoreOp::ListIdentities)?;
        Ok(self.state.read().identities.values().cloned().collect())
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>> {
        self.record(StoreOp::FindIdentityByEmail)?;
        Ok(self
            .state
            .read()
            .identities
            .values()
            .find(|i| i.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> Result<()> {
        self.record(StoreOp::SendPasswordReset)?;
        // The provider accepts the request whether or not the address has an
        // account, so the fake records unconditionally.
        self.state.write().outbox.push(SentEmail {
            kind: EmailKind::PasswordReset,
            to: email.to_string(),
            redirect_to: redirect_to.to_string(),
        });
        Ok(())
    }

    async fn resend_signup_confirmation(&self, email: &str, redirect_to: &str) -> Result<()> {
        self.record(StoreOp::ResendSignupConfirmation)?;
        let mut state = self.state.write();
        if !state.identities.values().any(|i| i.email.eq_ignore_ascii_case(email)) {
            return Err(StoreError::NotFound { entity: format!("identity for {email}") });
        }
        state.outbox.push(SentEmail {
            kind: EmailKind::SignupConfirmation,
            to: email.to_string(),
            redirect_to: redirect_to.to_string(),
        });
        Ok(())
    }

    async fn confirm_email(&self, email: &str) -> Result<()> {
        self.record(StoreOp::ConfirmEmail)?;
        let mut state = self.state.write();
        let identity = state
            .identities
            .values_mut()
            .find(|i| i.email.eq_ignore_ascii_case(email))
            .ok_or_else(|| StoreError::NotFound { entity: format!("identity for {email}") })?;
        identity.email_confirmed_at = Some(Utc::now());
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.record(StoreOp::SignIn)?;
        let state = self.state.read();

        let identity = state
            .identities
            .values()
            .find(|i| i.email.eq_ignore_ascii_case(email))
            .ok_or_else(|| StoreError::Api {
                status: 400,
                message: "invalid login credentials".to_string(),
            })?;

        if state.passwords.get(&identity.email).map(String::as_str) != Some(password) {
            return Err(StoreError::Api {
                status: 400,
                message: "invalid login credentials".to_string(),
            });
        }

        // An inactive profile gates login
        if let Some(profile) = state.profiles.get(&identity.id) {
            if !profile.is_active {
                return Err(StoreError::Api {
                    status: 403,
                    message: "account is deactivated".to_string(),
                });
            }
        }

        Ok(Session {
            access_token: format!("access-{}", identity.id.value()),
            refresh_token: format!("refresh-{}", identity.id.value()),
            user: identity.clone(),
        })
    }

    async fn set_session(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        self.record(StoreOp::SetSession)?;
        self.state.write().session_tokens =
            Some((access_token.to_string(), refresh_token.to_string()));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use anaokulu_types::{IdentityMetadata, Role};

    use super::*;

    fn new_identity(email: &str) -> NewIdentity {
        NewIdentity {
            email: email.to_string(),
            password: "temp-password-1234".to_string(),
            metadata: IdentityMetadata {
                full_name: "Ayşe Yılmaz".to_string(),
                role: Role::Parent,
            },
            redirect_to: "/auth/set-veli-password".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_identity_auto_creates_profile_without_name() {
        let store = MemoryStore::new();
        let identity = store.create_identity(new_identity("a@example.com")).await.unwrap();

        let profile = store.profile(identity.id).unwrap();
        assert_eq!(profile.name, "", "auto-created profile must not carry the display name");
        assert_eq!(profile.role, Role::Parent);
        assert!(profile.is_active);
    }

    #[tokio::test]
    async fn test_create_identity_sends_confirmation_with_redirect() {
        let store = MemoryStore::new();
        store.create_identity(new_identity("a@example.com")).await.unwrap();

        let emails = store.sent_emails();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].kind, EmailKind::SignupConfirmation);
        assert_eq!(emails[0].to, "a@example.com");
        assert_eq!(emails[0].redirect_to, "/auth/set-veli-password");
    }

    #[tokio::test]
    async fn test_create_identity_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_identity(new_identity("a@example.com")).await.unwrap();
        let err = store.create_identity(new_identity("A@Example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_injected_failure_consumed_once() {
        let store = MemoryStore::new();
        store.inject_failures(StoreOp::ListApplications, 1);

        let err = store.list_applications().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
        assert!(store.list_applications().await.is_ok());
        assert_eq!(store.op_count(StoreOp::ListApplications), 2);
    }

    #[tokio::test]
    async fn test_injection_targets_only_named_op() {
        let store = MemoryStore::new();
        store.inject_failures(StoreOp::UpdateApplicationStatus, 1);
        assert!(store.list_applications().await.is_ok());
    }

    #[tokio::test]
    async fn test_sign_in_with_created_credentials() {
        let store = MemoryStore::new();
        let request = new_identity("a@example.com");
        let password = request.password.clone();
        store.create_identity(request).await.unwrap();

        let session = store.sign_in("a@example.com", &password).await.unwrap();
        assert_eq!(session.user.email, "a@example.com");
        assert!(session.access_token.starts_with("access-"));
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password_rejected() {
        let store = MemoryStore::new();
        store.create_identity(new_identity("a@example.com")).await.unwrap();
        let err = store.sign_in("a@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_sign_in_inactive_profile_gated() {
        let store = MemoryStore::new();
        let request = new_identity("a@example.com");
        let password = request.password.clone();
        let identity = store.create_identity(request).await.unwrap();
        store.set_profile_active(identity.id, false).await.unwrap();

        let err = store.sign_in("a@example.com", &password).await.unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_confirm_email_stamps_timestamp() {
        let store = MemoryStore::new();
        store.create_identity(new_identity("a@example.com")).await.unwrap();
        store.confirm_email("a@example.com").await.unwrap();

        let identity = store.identity_by_email("a@example.com").unwrap();
        assert!(identity.email_confirmed_at.is_some());
    }

    #[tokio::test]
    async fn test_resend_requires_existing_identity() {
        let store = MemoryStore::new();
        let err =
            store.resend_signup_confirmation("ghost@example.com", "/auth/login").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_status_update_unknown_application() {
        let store = MemoryStore::new();
        let err = store
            .update_application_status(ApplicationId::generate(), ApplicationStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
