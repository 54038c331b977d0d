//! Read scopes over the lifecycle envelope.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::envelope::LifecycleEnvelope;

/// Which records a read may see.
///
/// Every read path takes a scope argument; there is no implicit default, so
/// code that wants to look at trashed or hidden records has to say so.
///
/// ```
/// use atrium_persistence::lifecycle::{EntityLifecycleScope, LifecycleEnvelope};
///
/// let trashed = LifecycleEnvelope { trashed: true, ..Default::default() };
/// assert!(!EntityLifecycleScope::Default.matches(&trashed));
/// assert!(EntityLifecycleScope::TrashOnly.matches(&trashed));
/// assert!(EntityLifecycleScope::Unscoped.matches(&trashed));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityLifecycleScope {
    /// Neither hidden nor trashed.
    Default,
    /// Trashed, regardless of hidden.
    TrashOnly,
    /// No lifecycle filter.
    Unscoped,
}

impl EntityLifecycleScope {
    /// Returns `true` if a record with this envelope is inside the scope.
    pub fn matches(&self, envelope: &LifecycleEnvelope) -> bool {
        match self {
            EntityLifecycleScope::Default => !envelope.hidden && !envelope.trashed,
            EntityLifecycleScope::TrashOnly => envelope.trashed,
            EntityLifecycleScope::Unscoped => true,
        }
    }

    /// SQL predicate over the `hidden` / `trashed` columns.
    pub fn sql_predicate(&self) -> &'static str {
        match self {
            EntityLifecycleScope::Default => "hidden = 'n' AND trashed = 'n'",
            EntityLifecycleScope::TrashOnly => "trashed = 's'",
            EntityLifecycleScope::Unscoped => "1 = 1",
        }
    }
}

impl fmt::Display for EntityLifecycleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityLifecycleScope::Default => write!(f, "default"),
            EntityLifecycleScope::TrashOnly => write!(f, "trash_only"),
            EntityLifecycleScope::Unscoped => write!(f, "unscoped"),
        }
    }
}
