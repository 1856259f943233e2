//! Fixture builders for the three stored collections.
//!
//! Every builder fills in sensible defaults so tests only spell out what they
//! assert on.

use chrono::Utc;

use anaokulu_types::{
    Application, ApplicationId, ApplicationStatus, Identity, IdentityId, IdentityMetadata,
    Profile, Role,
};

/// Builds an application with the given status.
#[must_use]
pub fn application(email: &str, name: &str, status: ApplicationStatus) -> Application {
    Application {
        id: ApplicationId::generate(),
        email: email.to_string(),
        name: name.to_string(),
        phone: "+90 532 000 00 00".to_string(),
        status,
        created_at: Utc::now(),
    }
}

/// Builds a `Pending` application.
#[must_use]
pub fn pending_application(email: &str, name: &str) -> Application {
    application(email, name, ApplicationStatus::Pending)
}

/// Builds an identity with parent role metadata; `confirmed` controls whether
/// `email_confirmed_at` is stamped.
#[must_use]
pub fn identity(email: &str, full_name: &str, confirmed: bool) -> Identity {
    Identity {
        id: IdentityId::generate(),
        email: email.to_string(),
        email_confirmed_at: confirmed.then(Utc::now),
        created_at: Utc::now(),
        metadata: IdentityMetadata { full_name: full_name.to_string(), role: Role::Parent },
    }
}

/// Builds an active parent profile keyed by the identity's id.
#[must_use]
pub fn profile_for(identity: &Identity, name: &str) -> Profile {
    Profile {
        id: identity.id,
        name: name.to_string(),
        role: Role::Parent,
        is_active: true,
        created_at: Utc::now(),
    }
}
