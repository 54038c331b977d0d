//! Audit stamping for lifecycle transitions.
//!
//! [`AuditTrailRecorder`] builds the [`AuditRecord`] that accompanies a flag
//! change. It is a pure function of its inputs, the request metadata and an
//! injectable [`Clock`]; it never writes anything itself.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};

use crate::error::{LifecycleError, StorageResult};
use crate::tenant::RequestMetadata;

use super::envelope::{AuditRecord, AuditVerb};

/// Source of the current time for audit stamps.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// System clock that uses the real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant. Useful in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The record being audited.
#[derive(Debug, Clone, Copy)]
pub struct AuditSubject<'a> {
    /// Table the record lives in.
    pub table: &'a str,
    /// Human-readable label of the record.
    pub label: &'a str,
}

/// Returns the trimmed actor id, or `ActorRequired` if it is missing or blank.
pub fn require_actor<'a>(actor: Option<&'a str>, operation: &'static str) -> StorageResult<&'a str> {
    match actor.map(str::trim) {
        Some(actor) if !actor.is_empty() => Ok(actor),
        _ => Err(LifecycleError::ActorRequired { operation }.into()),
    }
}

/// Capability: produce audit metadata for a flag change.
pub trait Auditable {
    /// Builds the audit record for setting `verb` on `subject`.
    fn stamp(
        &self,
        verb: AuditVerb,
        actor: Option<&str>,
        reason: Option<&str>,
        subject: AuditSubject<'_>,
        request: &RequestMetadata,
    ) -> StorageResult<AuditRecord>;
}

/// Builds audit records from the acting user, the request and a clock.
#[derive(Clone)]
pub struct AuditTrailRecorder {
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for AuditTrailRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditTrailRecorder").finish_non_exhaustive()
    }
}

impl Default for AuditTrailRecorder {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl AuditTrailRecorder {
    /// Creates a recorder with the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Auditable for AuditTrailRecorder {
    fn stamp(
        &self,
        verb: AuditVerb,
        actor: Option<&str>,
        reason: Option<&str>,
        subject: AuditSubject<'_>,
        request: &RequestMetadata,
    ) -> StorageResult<AuditRecord> {
        let actor = require_actor(actor, verb.operation())?;

        Ok(AuditRecord {
            verb,
            actor: actor.to_string(),
            timestamp: self.clock.now().trunc_subsecs(0),
            table: subject.table.to_string(),
            entity_label: subject.label.to_string(),
            ip: request.ip.clone(),
            reason: reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use chrono::TimeZone;

    fn recorder() -> AuditTrailRecorder {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        AuditTrailRecorder::new(Arc::new(FixedClock(at)))
    }

    fn subject() -> AuditSubject<'static> {
        AuditSubject {
            table: "clients",
            label: "Maria Souza",
        }
    }

    #[test]
    fn test_stamp_uses_clock_and_request() {
        let request = RequestMetadata::new().with_ip("192.0.2.10");
        let record = recorder()
            .stamp(AuditVerb::Trashed, Some("user-1"), Some(" moved away "), subject(), &request)
            .unwrap();

        assert_eq!(record.actor, "user-1");
        assert_eq!(record.timestamp, Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());
        assert_eq!(record.table, "clients");
        assert_eq!(record.entity_label, "Maria Souza");
        assert_eq!(record.ip.as_deref(), Some("192.0.2.10"));
        assert_eq!(record.reason.as_deref(), Some("moved away"));
    }

    #[test]
    fn test_stamp_is_deterministic() {
        let request = RequestMetadata::new();
        let recorder = recorder();
        let a = recorder
            .stamp(AuditVerb::Hidden, Some("u"), None, subject(), &request)
            .unwrap();
        let b = recorder
            .stamp(AuditVerb::Hidden, Some("u"), None, subject(), &request)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_stamp_requires_actor() {
        let request = RequestMetadata::new();
        for actor in [None, Some(""), Some("   ")] {
            let err = recorder()
                .stamp(AuditVerb::Trashed, actor, None, subject(), &request)
                .unwrap_err();
            assert!(matches!(
                err,
                StorageError::Lifecycle(LifecycleError::ActorRequired {
                    operation: "move to trash"
                })
            ));
        }
    }

    #[test]
    fn test_system_clock_truncates_subseconds() {
        let record = AuditTrailRecorder::default()
            .stamp(AuditVerb::Hidden, Some("u"), None, subject(), &RequestMetadata::new())
            .unwrap();
        assert_eq!(record.timestamp.timestamp_subsec_nanos(), 0);
    }
}
