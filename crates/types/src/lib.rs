//! Core types, errors, and validation for the anaokulu back office.
//!
//! This crate provides the foundational types used throughout the workspace:
//! - Identifier newtypes (`ApplicationId`, `IdentityId`)
//! - Domain structures for applications, identities, and profiles
//! - Derived audit report types (inconsistencies, verification partitions)
//! - Email normalization and shape validation
//! - Error types using snafu

pub mod error;
pub mod types;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{AdminError, ErrorCode, Result};
pub use types::*;
pub use validation::{ValidationError, normalize_email, validate_email};
