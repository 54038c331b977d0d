//! Tenant identifier type.
//!
//! This module defines the [`TenantId`] type, the stable slug that names a
//! tenant in the central registry and from which its store name is derived.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum length of a tenant slug.
pub const MAX_TENANT_ID_LENGTH: usize = 63;

/// A stable tenant slug such as `acme` or `north-campus`.
///
/// Valid slugs start with a lowercase ASCII letter or digit, continue with
/// lowercase letters, digits, `-` or `_`, and are at most
/// [`MAX_TENANT_ID_LENGTH`] characters long.
///
/// # Examples
///
/// ```
/// use atrium_persistence::tenant::TenantId;
///
/// let tenant = TenantId::parse("acme").unwrap();
/// assert_eq!(tenant.as_str(), "acme");
/// assert!(TenantId::parse("Acme Corp").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a tenant ID without validating it.
    ///
    /// Use [`TenantId::parse`] for identifiers that come from outside the
    /// process.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parses and validates a tenant slug.
    pub fn parse(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if let Some(reason) = slug_violation(&id) {
            return Err(ValidationError::InvalidIdentifier {
                kind: "tenant id",
                value: id,
                reason: reason.to_string(),
            });
        }
        Ok(Self(id))
    }

    /// Returns the tenant ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the ID is a well-formed slug.
    pub fn is_valid(&self) -> bool {
        slug_violation(&self.0).is_none()
    }
}

fn slug_violation(id: &str) -> Option<&'static str> {
    let mut chars = id.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return Some("must not be empty"),
    };
    if id.len() > MAX_TENANT_ID_LENGTH {
        return Some("must be at most 63 characters");
    }
    if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
        return Some("must start with a lowercase letter or digit");
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_') {
        return Some("may only contain lowercase letters, digits, '-' and '_'");
    }
    None
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantId({})", self.0)
    }
}

impl FromStr for TenantId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TenantId::parse(s)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        TenantId::new(s)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
