//! Store contract for the anaokulu back office.
//!
//! The backend-as-a-service owns all persistence: the `applications` and
//! `profiles` tables plus the identity store's user records. This crate
//! defines the contract the engines program against and two implementations:
//!
//! - [`MemoryStore`] — in-memory fake with failure injection and a recorded
//!   email outbox, for unit and integration tests
//! - [`RestStore`] — Supabase-style REST adapter (PostgREST tables + GoTrue
//!   auth endpoints)
//!
//! The traits are split along the backend's own seams: [`DirectoryStore`]
//! for relational tables, [`IdentityStore`] for the auth subsystem. The
//! [`Backend`] supertrait combines them so engines take a single generic
//! parameter; any type implementing both gets it for free.

pub mod config;
pub mod error;
pub mod memory;
pub mod rest;
mod retry;

use async_trait::async_trait;

use anaokulu_types::{
    Application, ApplicationId, ApplicationStatus, Identity, IdentityId, NewIdentity, Profile,
    Session,
};

pub use config::{RetryPolicy, StoreConfig};
pub use error::StoreError;
pub use memory::{EmailKind, MemoryStore, SentEmail, StoreOp};
pub use rest::RestStore;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Access to the relational tables (`applications`, `profiles`).
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Returns every application row.
    async fn list_applications(&self) -> Result<Vec<Application>>;

    /// Returns one application by id, or `None`.
    async fn get_application(&self, id: ApplicationId) -> Result<Option<Application>>;

    /// Writes a new lifecycle status onto an application row.
    async fn update_application_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<()>;

    /// Persists a normalized email back onto an application row.
    async fn update_application_email(&self, id: ApplicationId, email: &str) -> Result<()>;

    /// Returns every profile row.
    async fn list_profiles(&self) -> Result<Vec<Profile>>;

    /// Returns one profile by identity id, or `None`.
    async fn get_profile(&self, id: IdentityId) -> Result<Option<Profile>>;

    /// Patches a profile's display name.
    async fn update_profile_name(&self, id: IdentityId, name: &str) -> Result<()>;

    /// Toggles a profile's active flag (gates login).
    async fn set_profile_active(&self, id: IdentityId, active: bool) -> Result<()>;
}

/// Access to the identity store (accounts, sessions, transactional email).
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Creates an account. The store dispatches a confirmation email with the
    /// request's redirect target and auto-creates a profile from the role
    /// metadata (without copying the display name).
    ///
    /// A duplicate email yields [`StoreError::Conflict`].
    async fn create_identity(&self, request: NewIdentity) -> Result<Identity>;

    /// Returns every identity record.
    async fn list_identities(&self) -> Result<Vec<Identity>>;

    /// Looks up an identity by (normalized) email.
    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>>;

    /// Sends a password-reset email. Succeeds regardless of whether the
    /// address has an account (the provider does not reveal existence).
    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> Result<()>;

    /// Re-sends the signup confirmation email.
    async fn resend_signup_confirmation(&self, email: &str, redirect_to: &str) -> Result<()>;

    /// Stamps `email_confirmed_at` now, bypassing the user-click flow.
    /// Admin override path only.
    async fn confirm_email(&self, email: &str) -> Result<()>;

    /// Authenticates with email and password.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// Validates and adopts an existing token pair (redirect-handling flows).
    async fn set_session(&self, access_token: &str, refresh_token: &str) -> Result<()>;
}

/// Everything the engines need, in one bound.
pub trait Backend: DirectoryStore + IdentityStore {}

impl<T: DirectoryStore + IdentityStore> Backend for T {}
