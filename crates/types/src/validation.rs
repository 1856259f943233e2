//! Input validation for applicant contact data.
//!
//! Email addresses arrive from a public intake form and are the join key
//! between all three collections, so every engine validates through the same
//! two functions here: [`normalize_email`] canonicalizes, [`validate_email`]
//! checks shape. The accepted shape is `local@domain.tld` with no whitespace,
//! matching what the intake form promises but does not enforce.

use std::fmt;

/// Validation error with structured context.
///
/// Contains the specific constraint that was violated and the field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the violated constraint.
    pub constraint: String,
}

impl ValidationError {
    fn email(constraint: impl Into<String>) -> Self {
        Self { field: "email".to_string(), constraint: constraint.into() }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

impl std::error::Error for ValidationError {}

/// Canonicalizes an email address: strips all whitespace (surrounding and
/// embedded) and lowercases.
///
/// Idempotent: normalizing an already-normalized address is a no-op.
#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase()
}

/// Validates an email address against the `local@domain.tld` shape.
///
/// The address must:
/// - Be non-empty and contain no whitespace
/// - Contain exactly one `@` with a non-empty local part
/// - Have a domain containing at least one `.` with non-empty labels
///
/// Call [`normalize_email`] first; validation does not normalize.
///
/// # Errors
///
/// Returns [`ValidationError`] naming the violated constraint.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::email("must not be empty"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::email("must not contain whitespace"));
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::email("must contain an '@'"));
    };
    if local.is_empty() {
        return Err(ValidationError::email("local part must not be empty"));
    }
    if domain.contains('@') {
        return Err(ValidationError::email("must contain exactly one '@'"));
    }
    if !domain.contains('.') {
        return Err(ValidationError::email("domain must contain a '.'"));
    }
    if domain.split('.').any(str::is_empty) {
        return Err(ValidationError::email("domain labels must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    // =========================================================================
    // normalize_email tests
    // =========================================================================

    #[test]
    fn test_normalize_trims_and_lowercases() {
        assert_eq!(normalize_email("  Ayse.Yilmaz@Example.COM  "), "ayse.yilmaz@example.com");
    }

    #[test]
    fn test_normalize_strips_embedded_whitespace() {
        assert_eq!(normalize_email("new . parent@exa mple.com"), "new.parent@example.com");
    }

    #[test]
    fn test_normalize_handles_tabs_and_newlines() {
        assert_eq!(normalize_email("a@b.c\n"), "a@b.c");
        assert_eq!(normalize_email("\ta@b.c"), "a@b.c");
    }

    #[test]
    fn test_normalize_empty_input() {
        assert_eq!(normalize_email(""), "");
        assert_eq!(normalize_email("   "), "");
    }

    // =========================================================================
    // validate_email tests
    // =========================================================================

    #[test]
    fn test_validate_valid_simple() {
        assert!(validate_email("new.parent@example.com").is_ok());
    }

    #[test]
    fn test_validate_valid_plus_tag() {
        assert!(validate_email("parent+2026@example.com").is_ok());
    }

    #[test]
    fn test_validate_valid_subdomain() {
        assert!(validate_email("a@mail.example.co").is_ok());
    }

    #[test]
    fn test_validate_empty() {
        let err = validate_email("").unwrap_err();
        assert_eq!(err.field, "email");
        assert!(err.constraint.contains("empty"));
    }

    #[test]
    fn test_validate_no_at_sign() {
        let err = validate_email("nodomain").unwrap_err();
        assert!(err.constraint.contains('@'));
    }

    #[test]
    fn test_validate_double_at() {
        let err = validate_email("bademail@@x").unwrap_err();
        assert!(err.constraint.contains("exactly one"));
    }

    #[test]
    fn test_validate_whitespace_rejected() {
        let err = validate_email("bad email@@x").unwrap_err();
        assert!(err.constraint.contains("whitespace"));
    }

    #[test]
    fn test_validate_empty_local_part() {
        let err = validate_email("@example.com").unwrap_err();
        assert!(err.constraint.contains("local part"));
    }

    #[test]
    fn test_validate_domain_without_dot() {
        let err = validate_email("a@localhost").unwrap_err();
        assert!(err.constraint.contains('.'));
    }

    #[test]
    fn test_validate_trailing_dot_in_domain() {
        let err = validate_email("a@example.").unwrap_err();
        assert!(err.constraint.contains("labels"));
    }

    #[test]
    fn test_validate_leading_dot_in_domain() {
        let err = validate_email("a@.example.com").unwrap_err();
        assert!(err.constraint.contains("labels"));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::email("must not be empty");
        assert_eq!(err.to_string(), "email: must not be empty");
    }

    proptest! {
        /// Normalization output never contains whitespace or uppercase, and
        /// normalizing twice equals normalizing once.
        #[test]
        fn prop_normalize_idempotent(raw in ".{0,64}") {
            let once = normalize_email(&raw);
            prop_assert!(!once.chars().any(char::is_whitespace));
            prop_assert!(!once.chars().any(char::is_uppercase));
            prop_assert_eq!(normalize_email(&once), once.clone());
        }

        /// Any address that validates contains exactly one '@' and a dotted
        /// domain.
        #[test]
        fn prop_validated_shape(raw in "[a-z0-9.+]{1,16}@[a-z0-9]{1,8}\\.[a-z]{2,6}") {
            prop_assert!(validate_email(&raw).is_ok());
        }
    }
}
