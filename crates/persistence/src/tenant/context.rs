//! Request metadata carried alongside a tenant binding.
//!
//! [`RequestMetadata`] holds the ambient facts about the inbound request that
//! the audit trail records. It travels inside the bound store context rather
//! than living in any global.

use serde::{Deserialize, Serialize};

/// Facts about the inbound request that are not part of the tenant binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Client IP address, as reported by the edge.
    pub ip: Option<String>,
    /// Correlation ID for request tracing.
    pub correlation_id: Option<String>,
}

impl RequestMetadata {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the client IP address.
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Sets the correlation ID.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}
