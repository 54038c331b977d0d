//! Error types for the Atrium REST API.
//!
//! Every error renders as a JSON body `{"error": code, "message": text}`.
//!
//! # Error Mapping
//!
//! | Storage Error | HTTP Status | Code |
//! |--------------|-------------|------|
//! | Tenant `NotResolved` | 404 | tenant_not_resolved |
//! | Tenant `CentralDomainAccessDenied` | 403 | central_domain_access_denied |
//! | Tenant `CentralRouteDenied` | 403 | central_route_denied |
//! | Tenant `TenantSuspended` | 403 | tenant_suspended |
//! | Tenant `ConnectionUnavailable` | 503 | tenant_connection_unavailable |
//! | Lifecycle `EntityNotFound` | 404 | entity_not_found |
//! | Validation `UnknownEntity` | 404 | unknown_entity |
//! | Lifecycle `InvalidTransition` | 409 | invalid_lifecycle_transition |
//! | Lifecycle `TrashNotSupported` | 409 | trash_not_supported |
//! | Lifecycle `ActorRequired` | 400 | actor_required |
//! | Other validation errors | 400 | invalid_request |
//! | Backend errors | 500 | internal_error |

use std::fmt;

use atrium_persistence::error::{
    BackendError, LifecycleError, StorageError, TenantError, ValidationError,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, error};

/// The error type of every REST handler and extractor.
#[derive(Debug)]
pub enum RestError {
    /// The request host matches no registered domain (HTTP 404).
    TenantNotResolved {
        /// The host as received.
        host: String,
    },

    /// A tenant route was reached through a central domain (HTTP 403).
    CentralDomainAccessDenied {
        /// The central host.
        host: String,
    },

    /// An administrative route was reached through a tenant domain (HTTP 403).
    CentralRouteDenied {
        /// The requesting host.
        host: String,
    },

    /// The tenant exists but is not active (HTTP 403).
    TenantSuspended {
        /// The tenant id.
        tenant_id: String,
    },

    /// The tenant's store cannot be bound (HTTP 503).
    ConnectionUnavailable {
        /// Why binding failed.
        message: String,
    },

    /// A tenant, entity type, record or domain was not found (HTTP 404).
    NotFound {
        /// Machine readable error code.
        code: &'static str,
        /// Human readable message.
        message: String,
    },

    /// The request conflicts with the current state (HTTP 409).
    Conflict {
        /// Machine readable error code.
        code: &'static str,
        /// Human readable message.
        message: String,
    },

    /// A lifecycle operation was attempted without an acting user (HTTP 400).
    ActorRequired {
        /// The attempted operation.
        operation: &'static str,
    },

    /// Malformed input (HTTP 400).
    BadRequest {
        /// Error message.
        message: String,
    },

    /// Unexpected failure (HTTP 500).
    InternalError {
        /// Error message.
        message: String,
    },
}

impl RestError {
    /// The HTTP status this error renders with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestError::TenantNotResolved { .. } | RestError::NotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            RestError::CentralDomainAccessDenied { .. }
            | RestError::CentralRouteDenied { .. }
            | RestError::TenantSuspended { .. } => StatusCode::FORBIDDEN,
            RestError::ConnectionUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RestError::Conflict { .. } => StatusCode::CONFLICT,
            RestError::ActorRequired { .. } | RestError::BadRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            RestError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The machine readable code placed in the `error` field.
    pub fn error_code(&self) -> &'static str {
        match self {
            RestError::TenantNotResolved { .. } => "tenant_not_resolved",
            RestError::CentralDomainAccessDenied { .. } => "central_domain_access_denied",
            RestError::CentralRouteDenied { .. } => "central_route_denied",
            RestError::TenantSuspended { .. } => "tenant_suspended",
            RestError::ConnectionUnavailable { .. } => "tenant_connection_unavailable",
            RestError::NotFound { code, .. } | RestError::Conflict { code, .. } => *code,
            RestError::ActorRequired { .. } => "actor_required",
            RestError::BadRequest { .. } => "invalid_request",
            RestError::InternalError { .. } => "internal_error",
        }
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::TenantNotResolved { host } => {
                write!(f, "No tenant is registered for host '{}'", host)
            }
            RestError::CentralDomainAccessDenied { host } => {
                write!(f, "Host '{}' serves administrative routes only", host)
            }
            RestError::CentralRouteDenied { host } => {
                write!(f, "Host '{}' cannot serve administrative routes", host)
            }
            RestError::TenantSuspended { tenant_id } => {
                write!(f, "Tenant '{}' is suspended", tenant_id)
            }
            RestError::ConnectionUnavailable { message } => {
                write!(f, "Tenant store unavailable: {}", message)
            }
            RestError::NotFound { message, .. }
            | RestError::Conflict { message, .. }
            | RestError::BadRequest { message }
            | RestError::InternalError { message } => write!(f, "{}", message),
            RestError::ActorRequired { operation } => {
                write!(f, "An acting user (X-Actor-Id) is required to {}", operation)
            }
        }
    }
}

impl std::error::Error for RestError {}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = %status, error = %self, "Request failed");
        } else {
            debug!(status = %status, error = %self, "Request rejected");
        }

        let body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Result type for REST operations.
pub type RestResult<T> = Result<T, RestError>;

// ============================================================================
// Conversions from persistence errors
// ============================================================================

impl From<StorageError> for RestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Tenant(e) => e.into(),
            StorageError::Lifecycle(e) => e.into(),
            StorageError::Validation(e) => e.into(),
            StorageError::Backend(e) => e.into(),
        }
    }
}

impl From<TenantError> for RestError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::NotResolved { host } => RestError::TenantNotResolved { host },
            TenantError::CentralDomainAccessDenied { host } => {
                RestError::CentralDomainAccessDenied { host }
            }
            TenantError::CentralRouteDenied { host } => RestError::CentralRouteDenied { host },
            TenantError::TenantSuspended { tenant_id } => RestError::TenantSuspended {
                tenant_id: tenant_id.to_string(),
            },
            TenantError::ConnectionUnavailable { .. } => RestError::ConnectionUnavailable {
                message: err.to_string(),
            },
            TenantError::UnknownTenant { .. } => RestError::NotFound {
                code: "tenant_not_found",
                message: err.to_string(),
            },
            TenantError::DomainNotAttached { .. } => RestError::NotFound {
                code: "domain_not_attached",
                message: err.to_string(),
            },
            TenantError::AlreadyExists { .. } => RestError::Conflict {
                code: "tenant_already_exists",
                message: err.to_string(),
            },
            TenantError::DomainAlreadyAssigned { .. } => RestError::Conflict {
                code: "domain_already_assigned",
                message: err.to_string(),
            },
            TenantError::LastDomain { .. } => RestError::Conflict {
                code: "last_domain",
                message: err.to_string(),
            },
        }
    }
}

impl From<LifecycleError> for RestError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::EntityNotFound { .. } => RestError::NotFound {
                code: "entity_not_found",
                message: err.to_string(),
            },
            LifecycleError::EntityAlreadyExists { .. } => RestError::Conflict {
                code: "entity_already_exists",
                message: err.to_string(),
            },
            LifecycleError::InvalidTransition { .. } => RestError::Conflict {
                code: "invalid_lifecycle_transition",
                message: err.to_string(),
            },
            LifecycleError::TrashNotSupported { .. } => RestError::Conflict {
                code: "trash_not_supported",
                message: err.to_string(),
            },
            LifecycleError::ActorRequired { operation } => RestError::ActorRequired { operation },
        }
    }
}

impl From<ValidationError> for RestError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::UnknownEntity { .. } => RestError::NotFound {
                code: "unknown_entity",
                message: err.to_string(),
            },
            _ => RestError::BadRequest {
                message: err.to_string(),
            },
        }
    }
}

impl From<BackendError> for RestError {
    fn from(err: BackendError) -> Self {
        RestError::InternalError {
            message: err.to_string(),
        }
    }
}
