//! Core type definitions for the anaokulu back office.
//!
//! Covers the three externally stored collections (applications, identities,
//! profiles) plus the derived report types computed by the auditors. Status
//! and kind fields are closed enums so that illegal states are
//! unrepresentable; the backend's string columns map onto them via serde.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Identifier Types
// ============================================================================

/// Generates a newtype wrapper around a UUID for type-safe identifiers.
///
/// Each generated type provides:
/// - Standard derives: Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord
/// - Serde with `#[serde(transparent)]` for wire format compatibility
/// - `From<Uuid>` and `Into<Uuid>` conversions
/// - `Display` with a semantic prefix (e.g., `app:9f0c...`)
/// - `new()` constructor, `generate()` for fresh random ids, `value()` accessor
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $prefix:expr
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new identifier from a raw UUID.
            #[inline]
            pub const fn new(value: Uuid) -> Self {
                Self(value)
            }

            /// Generates a fresh random (v4) identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the raw UUID value.
            #[inline]
            pub const fn value(self) -> Uuid {
                self.0
            }
        }

        impl From<Uuid> for $name {
            #[inline]
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            #[inline]
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.parse::<Uuid>().map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for an enrollment application.
    ///
    /// Wraps a `Uuid` with compile-time type safety to prevent mixing with
    /// other identifier types.
    ///
    /// # Display
    ///
    /// Formats with `app:` prefix: `app:9f0c1f6e-...`.
    ApplicationId, "app"
);

define_id!(
    /// Unique identifier for an identity record (the auth subject).
    ///
    /// Profiles are keyed 1:1 by this id, so the same newtype is used for
    /// both.
    ///
    /// # Display
    ///
    /// Formats with `identity:` prefix: `identity:9f0c1f6e-...`.
    IdentityId, "identity"
);

// ============================================================================
// Applications
// ============================================================================

/// Lifecycle status of an enrollment application.
///
/// Transitions: `Pending → Approved` and `Pending → Rejected`. The terminal
/// states have no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    /// Awaiting an admin decision.
    #[default]
    Pending,
    /// Approved; an account has been (or is being) provisioned.
    Approved,
    /// Rejected; no account is created.
    Rejected,
}

impl ApplicationStatus {
    /// Whether this status has no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// An enrollment application, created by the public intake form.
///
/// Mutated only by the approval engine (status transitions, email
/// normalization) and never deleted in normal operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Unique application identifier.
    pub id: ApplicationId,
    /// Applicant email as entered; normalized on approval.
    pub email: String,
    /// Applicant display name.
    pub name: String,
    /// Contact phone number.
    pub phone: String,
    /// Current lifecycle status.
    pub status: ApplicationStatus,
    /// When the application was submitted.
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Roles
// ============================================================================

/// Authorization role attached to a provisioned account.
///
/// The backend stores roles as plain strings and admins can introduce new
/// ones, so unknown values round-trip through [`Role::Other`] instead of
/// failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Back-office administrator.
    Admin,
    /// Teaching staff.
    Teacher,
    /// Parent of an enrolled child.
    Parent,
    /// Any other role string the backend carries.
    Other(String),
}

impl Role {
    /// Returns the wire representation of this role.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::Teacher => "teacher",
            Self::Parent => "parent",
            Self::Other(s) => s,
        }
    }

    /// Parses a role from its wire representation.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "admin" => Self::Admin,
            "teacher" => Self::Teacher,
            "parent" => Self::Parent,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Parent
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

// ============================================================================
// Identities
// ============================================================================

/// Free-form metadata supplied when an identity is created.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdentityMetadata {
    /// Display name copied from the originating application.
    pub full_name: String,
    /// Intended role for the auto-created profile.
    pub role: Role,
}

/// An account record owned by the identity store.
///
/// Created exclusively as a side effect of approving an application.
/// `email_confirmed_at` is stamped by the store when the user clicks the
/// emailed confirmation link, or by the admin override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The auth subject, used as foreign key by profiles.
    pub id: IdentityId,
    /// Account email address.
    pub email: String,
    /// When the email was confirmed; `None` until confirmed.
    pub email_confirmed_at: Option<DateTime<Utc>>,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Metadata supplied at creation time.
    pub metadata: IdentityMetadata,
}

impl Identity {
    /// Whether the account's email has been confirmed.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

/// Request payload for creating a new identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    /// Normalized account email.
    pub email: String,
    /// Temporary password; never surfaced to the user.
    pub password: String,
    /// Display name and intended role.
    pub metadata: IdentityMetadata,
    /// Where the confirmation email should land the user.
    pub redirect_to: String,
}

/// An authenticated session issued by the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for API requests.
    pub access_token: String,
    /// Token used to mint a fresh access token.
    pub refresh_token: String,
    /// The authenticated identity.
    pub user: Identity,
}

// ============================================================================
// Profiles
// ============================================================================

/// Role and display metadata for a provisioned account, keyed 1:1 by
/// identity id.
///
/// Auto-created by the identity store when an identity is created with role
/// metadata; the auto-creation path does not copy the display name, which the
/// approval engine patches immediately after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// The owning identity's id.
    pub id: IdentityId,
    /// Display name; empty until patched.
    pub name: String,
    /// Authorization role.
    pub role: Role,
    /// Gates login; toggled by admin action.
    pub is_active: bool,
    /// Profile creation timestamp.
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Audit Types
// ============================================================================

/// Severity classification for a detected inconsistency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Data is missing or wrong in a way that blocks a user.
    High,
    /// Diverged but convergence is routine.
    Medium,
    /// Cosmetic; nothing is blocked.
    Low,
}

/// The closed set of divergence classes the auditor can report.
///
/// Every partial-failure mode of the approval workflow maps onto exactly one
/// of these; a new failure mode must not ship without a matching detection
/// rule here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyKind {
    /// Application is approved but no identity exists for its email.
    ApprovedNoUser,
    /// An identity exists but the application is still pending.
    UserExistsPending,
    /// The identity's email was never confirmed.
    EmailNotConfirmed,
    /// Identity and profile exist but the profile name is empty.
    MissingProfileName,
    /// The application email fails shape validation.
    InvalidEmailFormat,
}

impl InconsistencyKind {
    /// Severity assigned to this class.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::ApprovedNoUser | Self::InvalidEmailFormat => Severity::High,
            Self::UserExistsPending | Self::EmailNotConfirmed => Severity::Medium,
            Self::MissingProfileName => Severity::Low,
        }
    }

    /// Whether the auto-fix routine may repair this class.
    ///
    /// Unconfirmed emails require user action (or an explicit admin
    /// override), and malformed emails require manual correction, so neither
    /// is auto-fixable.
    #[must_use]
    pub const fn fixable(self) -> bool {
        matches!(
            self,
            Self::ApprovedNoUser | Self::UserExistsPending | Self::MissingProfileName
        )
    }
}

impl fmt::Display for InconsistencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ApprovedNoUser => "approved_no_user",
            Self::UserExistsPending => "user_exists_pending",
            Self::EmailNotConfirmed => "email_not_confirmed",
            Self::MissingProfileName => "missing_profile_name",
            Self::InvalidEmailFormat => "invalid_email_format",
        };
        write!(f, "{s}")
    }
}

/// A single detected divergence between the three collections.
///
/// Computed fresh on every audit run; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inconsistency {
    /// Divergence class.
    pub kind: InconsistencyKind,
    /// Subject email (as stored on the application).
    pub email: String,
    /// Human-readable description for the admin report.
    pub description: String,
    /// Severity derived from the kind.
    pub severity: Severity,
    /// Auto-fixability derived from the kind.
    pub fixable: bool,
}

impl Inconsistency {
    /// Builds an inconsistency record, deriving severity and fixability from
    /// the kind.
    #[must_use]
    pub fn new(kind: InconsistencyKind, email: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            email: email.into(),
            description: description.into(),
            severity: kind.severity(),
            fixable: kind.fixable(),
        }
    }
}

/// Row counts per source table at report time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableCounts {
    /// Rows in the applications table.
    pub applications: usize,
    /// Records in the identity store.
    pub identities: usize,
    /// Rows in the profiles table.
    pub profiles: usize,
}

/// Point-in-time consistency report across the three collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    /// When the report was computed.
    pub generated_at: DateTime<Utc>,
    /// Row counts per table.
    pub table_counts: TableCounts,
    /// Every detected divergence.
    pub inconsistencies: Vec<Inconsistency>,
    /// Count of high-severity items.
    pub high: usize,
    /// Count of medium-severity items.
    pub medium: usize,
    /// Count of low-severity items.
    pub low: usize,
    /// Count of auto-fixable items.
    pub fixable: usize,
}

impl ConsistencyReport {
    /// Builds a report, tallying severity and fixability counts.
    #[must_use]
    pub fn new(table_counts: TableCounts, inconsistencies: Vec<Inconsistency>) -> Self {
        let mut high = 0;
        let mut medium = 0;
        let mut low = 0;
        let mut fixable = 0;
        for item in &inconsistencies {
            match item.severity {
                Severity::High => high += 1,
                Severity::Medium => medium += 1,
                Severity::Low => low += 1,
            }
            if item.fixable {
                fixable += 1;
            }
        }
        Self {
            generated_at: Utc::now(),
            table_counts,
            inconsistencies,
            high,
            medium,
            low,
            fixable,
        }
    }

    /// Whether the three collections are fully consistent.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.inconsistencies.is_empty()
    }
}

/// Per-item outcome of an auto-fix pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixDetail {
    /// The divergence class that was attempted.
    pub kind: InconsistencyKind,
    /// Subject email.
    pub email: String,
    /// Whether the repair succeeded.
    pub repaired: bool,
    /// What happened, for the admin log.
    pub message: String,
}

/// Aggregate outcome of one auto-fix pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FixReport {
    /// Items repaired this pass.
    pub fixed: usize,
    /// Items that failed; they are retried by the next audit run.
    pub failed: usize,
    /// Per-item detail log.
    pub details: Vec<FixDetail>,
}

// ============================================================================
// Verification Report Types
// ============================================================================

/// One identity in a verification report partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationEntry {
    /// Account email.
    pub email: String,
    /// Display name (profile name, falling back to identity metadata).
    pub name: String,
    /// Authorization role.
    pub role: Role,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the email was confirmed, if ever.
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

/// Partition of all identities by email confirmation state.
///
/// The three sets are disjoint: malformed addresses land in `invalid`
/// regardless of confirmation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// When the report was computed.
    pub generated_at: DateTime<Utc>,
    /// Identities with a confirmed email.
    pub verified: Vec<VerificationEntry>,
    /// Identities with a well-formed but unconfirmed email.
    pub unverified: Vec<VerificationEntry>,
    /// Identities whose email fails shape validation.
    pub invalid: Vec<VerificationEntry>,
}

impl VerificationReport {
    /// Total identities covered by the report.
    #[must_use]
    pub fn total(&self) -> usize {
        self.verified.len() + self.unverified.len() + self.invalid.len()
    }
}

/// Per-recipient outcome of a bulk resend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendDetail {
    /// Recipient email.
    pub email: String,
    /// Whether the resend was dispatched.
    pub sent: bool,
    /// What happened, for the admin log.
    pub message: String,
}

/// Aggregate outcome of a bulk confirmation resend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResendReport {
    /// Recipients attempted.
    pub total: usize,
    /// Emails dispatched.
    pub success: usize,
    /// Recipients that failed; the loop never stops on them.
    pub failed: usize,
    /// Per-recipient detail log.
    pub details: Vec<ResendDetail>,
}

// ============================================================================
// Approval Outcome
// ============================================================================

/// Result of a successful approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    /// The newly provisioned identity.
    pub identity_id: IdentityId,
    /// The normalized email the account was created with.
    pub email: String,
    /// Whether the password-setup email was dispatched. `false` means the
    /// account and status are correct but the email needs a manual resend.
    pub email_sent: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_application_id_display() {
        let raw = Uuid::nil();
        let id = ApplicationId::new(raw);
        assert_eq!(id.to_string(), format!("app:{raw}"));
    }

    #[test]
    fn test_id_round_trip_through_str() {
        let id = IdentityId::generate();
        let parsed: IdentityId = id.value().to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = ApplicationId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.value()));
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&ApplicationStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
        let back: ApplicationStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(back, ApplicationStatus::Pending);
    }

    #[test]
    fn test_status_terminality() {
        assert!(!ApplicationStatus::Pending.is_terminal());
        assert!(ApplicationStatus::Approved.is_terminal());
        assert!(ApplicationStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_role_known_values() {
        assert_eq!(Role::from_name("parent"), Role::Parent);
        assert_eq!(Role::from_name("admin"), Role::Admin);
        assert_eq!(Role::from_name("teacher"), Role::Teacher);
    }

    #[test]
    fn test_role_unknown_value_round_trips() {
        let role = Role::from_name("accountant");
        assert_eq!(role, Role::Other("accountant".to_string()));
        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(json, "\"accountant\"");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, role);
    }

    #[test]
    fn test_role_serde_plain_string() {
        let json = serde_json::to_string(&Role::Parent).unwrap();
        assert_eq!(json, "\"parent\"");
    }

    #[test]
    fn test_kind_severity_table() {
        assert_eq!(InconsistencyKind::ApprovedNoUser.severity(), Severity::High);
        assert_eq!(InconsistencyKind::InvalidEmailFormat.severity(), Severity::High);
        assert_eq!(InconsistencyKind::UserExistsPending.severity(), Severity::Medium);
        assert_eq!(InconsistencyKind::EmailNotConfirmed.severity(), Severity::Medium);
        assert_eq!(InconsistencyKind::MissingProfileName.severity(), Severity::Low);
    }

    #[test]
    fn test_kind_fixability_table() {
        assert!(InconsistencyKind::ApprovedNoUser.fixable());
        assert!(InconsistencyKind::UserExistsPending.fixable());
        assert!(InconsistencyKind::MissingProfileName.fixable());
        assert!(!InconsistencyKind::EmailNotConfirmed.fixable());
        assert!(!InconsistencyKind::InvalidEmailFormat.fixable());
    }

    #[test]
    fn test_inconsistency_new_derives_fields() {
        let item = Inconsistency::new(
            InconsistencyKind::ApprovedNoUser,
            "orphan@example.com",
            "approved but no account",
        );
        assert_eq!(item.severity, Severity::High);
        assert!(item.fixable);
    }

    #[test]
    fn test_consistency_report_tallies() {
        let items = vec![
            Inconsistency::new(InconsistencyKind::ApprovedNoUser, "a@x.com", ""),
            Inconsistency::new(InconsistencyKind::EmailNotConfirmed, "b@x.com", ""),
            Inconsistency::new(InconsistencyKind::MissingProfileName, "c@x.com", ""),
        ];
        let report = ConsistencyReport::new(TableCounts::default(), items);
        assert_eq!(report.high, 1);
        assert_eq!(report.medium, 1);
        assert_eq!(report.low, 1);
        assert_eq!(report.fixable, 2);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_verification_report_total() {
        let entry = VerificationEntry {
            email: "a@x.com".to_string(),
            name: "A".to_string(),
            role: Role::Parent,
            created_at: Utc::now(),
            email_confirmed_at: None,
        };
        let report = VerificationReport {
            generated_at: Utc::now(),
            verified: vec![entry.clone()],
            unverified: vec![entry.clone(), entry],
            invalid: vec![],
        };
        assert_eq!(report.total(), 3);
    }
}
