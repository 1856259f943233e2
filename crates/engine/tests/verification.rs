//! Verification auditor tests: partitioning, resend guards, bulk resend,
//! and the manual override.

use std::{sync::Arc, time::Duration};

use anaokulu_engine::{RedirectConfig, VerificationAuditor};
use anaokulu_store::{EmailKind, MemoryStore, StoreOp};
use anaokulu_test_utils::fixtures;
use anaokulu_types::{AdminError, ErrorCode};

fn auditor(store: &Arc<MemoryStore>) -> VerificationAuditor<MemoryStore> {
    VerificationAuditor::new(store.clone(), RedirectConfig::default())
        .with_pacing(Duration::from_millis(1))
}

#[tokio::test]
async fn test_report_partitions_are_disjoint() {
    let store = Arc::new(MemoryStore::new());
    store.insert_identity(fixtures::identity("confirmed@example.com", "Confirmed", true));
    store.insert_identity(fixtures::identity("waiting@example.com", "Waiting", false));
    store.insert_identity(fixtures::identity("broken@@example", "Broken", false));

    let report = auditor(&store).report().await.unwrap();

    assert_eq!(report.verified.len(), 1);
    assert_eq!(report.verified[0].email, "confirmed@example.com");
    assert_eq!(report.unverified.len(), 1);
    assert_eq!(report.unverified[0].email, "waiting@example.com");
    assert_eq!(report.invalid.len(), 1);
    assert_eq!(report.invalid[0].email, "broken@@example");
    assert_eq!(report.total(), 3);
}

#[tokio::test]
async fn test_invalid_beats_confirmation_state() {
    // A malformed address lands in `invalid` even with a confirmation stamp
    let store = Arc::new(MemoryStore::new());
    store.insert_identity(fixtures::identity("broken@@example", "Broken", true));

    let report = auditor(&store).report().await.unwrap();
    assert!(report.verified.is_empty());
    assert_eq!(report.invalid.len(), 1);
}

#[tokio::test]
async fn test_report_uses_profile_display_data() {
    let store = Arc::new(MemoryStore::new());
    let identity = fixtures::identity("waiting@example.com", "Metadata Name", false);
    store.insert_identity(identity.clone());
    store.insert_profile(fixtures::profile_for(&identity, "Profile Name"));

    let report = auditor(&store).report().await.unwrap();
    assert_eq!(report.unverified[0].name, "Profile Name");
}

#[tokio::test]
async fn test_resend_to_unverified_address() {
    let store = Arc::new(MemoryStore::new());
    store.insert_identity(fixtures::identity("waiting@example.com", "Waiting", false));

    auditor(&store).resend("waiting@example.com").await.unwrap();

    let emails = store.sent_emails();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].kind, EmailKind::SignupConfirmation);
    assert_eq!(emails[0].to, "waiting@example.com");
    // Resends land the user on the login page
    assert_eq!(emails[0].redirect_to, "/auth/login");
}

#[tokio::test]
async fn test_resend_normalizes_lookup_email() {
    let store = Arc::new(MemoryStore::new());
    store.insert_identity(fixtures::identity("waiting@example.com", "Waiting", false));

    auditor(&store).resend("  Waiting@Example.COM ").await.unwrap();
    assert_eq!(store.sent_emails().len(), 1);
}

#[tokio::test]
async fn test_resend_guard_on_confirmed_address() {
    let store = Arc::new(MemoryStore::new());
    store.insert_identity(fixtures::identity("confirmed@example.com", "Confirmed", true));

    let err = auditor(&store).resend("confirmed@example.com").await.unwrap_err();

    assert!(matches!(err, AdminError::AlreadyVerified { .. }));
    assert!(err.is_benign());
    // The underlying resend primitive was never invoked
    assert_eq!(store.op_count(StoreOp::ResendSignupConfirmation), 0);
    assert!(store.sent_emails().is_empty());
}

#[tokio::test]
async fn test_resend_unknown_address() {
    let store = Arc::new(MemoryStore::new());
    let err = auditor(&store).resend("ghost@example.com").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn test_resend_malformed_address_fails_fast() {
    let store = Arc::new(MemoryStore::new());
    let err = auditor(&store).resend("nodomain").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationFailed);
    assert_eq!(store.op_count(StoreOp::FindIdentityByEmail), 0);
}

#[tokio::test]
async fn test_bulk_resend_covers_all_unverified() {
    let store = Arc::new(MemoryStore::new());
    store.insert_identity(fixtures::identity("one@example.com", "One", false));
    store.insert_identity(fixtures::identity("two@example.com", "Two", false));
    store.insert_identity(fixtures::identity("confirmed@example.com", "Confirmed", true));

    let report = auditor(&store).resend_all().await.unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.success, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(store.sent_emails().len(), 2);
}

#[tokio::test]
async fn test_bulk_resend_survives_individual_failure() {
    let store = Arc::new(MemoryStore::new());
    store.insert_identity(fixtures::identity("one@example.com", "One", false));
    store.insert_identity(fixtures::identity("two@example.com", "Two", false));
    store.inject_failures(StoreOp::ResendSignupConfirmation, 1);

    let report = auditor(&store).resend_all().await.unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.success, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.details.len(), 2);
    assert_eq!(report.details.iter().filter(|d| d.sent).count(), 1);
    // Both recipients were attempted despite the failure
    assert_eq!(store.op_count(StoreOp::ResendSignupConfirmation), 2);
}

#[tokio::test]
async fn test_bulk_resend_empty_set() {
    let store = Arc::new(MemoryStore::new());
    store.insert_identity(fixtures::identity("confirmed@example.com", "Confirmed", true));

    let report = auditor(&store).resend_all().await.unwrap();
    assert_eq!(report.total, 0);
    assert!(report.details.is_empty());
}

#[tokio::test]
async fn test_manual_verify_stamps_confirmation() {
    let store = Arc::new(MemoryStore::new());
    store.insert_identity(fixtures::identity("waiting@example.com", "Waiting", false));

    auditor(&store).verify_manually("waiting@example.com").await.unwrap();

    let identity = store.identity_by_email("waiting@example.com").unwrap();
    assert!(identity.email_confirmed_at.is_some());
}

#[tokio::test]
async fn test_manual_verify_guard_on_confirmed_address() {
    let store = Arc::new(MemoryStore::new());
    store.insert_identity(fixtures::identity("confirmed@example.com", "Confirmed", true));

    let err = auditor(&store).verify_manually("confirmed@example.com").await.unwrap_err();
    assert!(matches!(err, AdminError::AlreadyVerified { .. }));
    assert_eq!(store.op_count(StoreOp::ConfirmEmail), 0);
}

#[tokio::test]
async fn test_manual_verify_unknown_address() {
    let store = Arc::new(MemoryStore::new());
    let err = auditor(&store).verify_manually("ghost@example.com").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}
