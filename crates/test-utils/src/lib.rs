//! Shared test utilities for the anaokulu workspace.
//!
//! This crate provides common test helpers to reduce boilerplate across test
//! modules:
//!
//! - [`assert_eventually`] - Poll a condition until it's true or timeout
//! - [`fixtures`] - Builders for applications, identities, and profiles

#![deny(unsafe_code)]

mod assertions;
pub use assertions::assert_eventually;

pub mod fixtures;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use anaokulu_types::{ApplicationStatus, Role};

    use super::*;

    // ============================================
    // assert_eventually tests
    // ============================================

    #[tokio::test]
    async fn test_assert_eventually_immediate_success() {
        let result = assert_eventually(Duration::from_millis(100), || true).await;
        assert!(result, "immediately true condition should succeed");
    }

    #[tokio::test]
    async fn test_assert_eventually_delayed_success() {
        // Condition becomes true after a few iterations
        let counter = AtomicUsize::new(0);
        let result = assert_eventually(Duration::from_millis(500), || {
            let val = counter.fetch_add(1, Ordering::SeqCst);
            val >= 3 // Becomes true on 4th call
        })
        .await;
        assert!(result, "condition should eventually become true");
        assert!(counter.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test]
    async fn test_assert_eventually_timeout() {
        let result = assert_eventually(Duration::from_millis(50), || false).await;
        assert!(!result, "never-true condition should timeout");
    }

    // ============================================
    // Fixture tests
    // ============================================

    #[test]
    fn test_pending_application_defaults() {
        let app = fixtures::pending_application("new.parent@example.com", "Ayşe Yılmaz");
        assert_eq!(app.status, ApplicationStatus::Pending);
        assert_eq!(app.email, "new.parent@example.com");
        assert!(!app.phone.is_empty());
    }

    #[test]
    fn test_application_with_status() {
        let app = fixtures::application(
            "orphan@example.com",
            "Orphan",
            ApplicationStatus::Approved,
        );
        assert_eq!(app.status, ApplicationStatus::Approved);
    }

    #[test]
    fn test_identity_confirmation_flag() {
        let unconfirmed = fixtures::identity("a@example.com", "A", false);
        assert!(unconfirmed.email_confirmed_at.is_none());

        let confirmed = fixtures::identity("b@example.com", "B", true);
        assert!(confirmed.email_confirmed_at.is_some());
    }

    #[test]
    fn test_profile_for_identity() {
        let identity = fixtures::identity("a@example.com", "A", false);
        let profile = fixtures::profile_for(&identity, "A");
        assert_eq!(profile.id, identity.id);
        assert_eq!(profile.role, Role::Parent);
        assert!(profile.is_active);
    }

    #[test]
    fn test_fixture_ids_are_unique() {
        let a = fixtures::pending_application("a@example.com", "A");
        let b = fixtures::pending_application("b@example.com", "B");
        assert_ne!(a.id, b.id);
    }
}
