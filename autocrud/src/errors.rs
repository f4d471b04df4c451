//! # Error handling
//!
//! Two layers:
//!
//! - [`CrudError`] is what the registry, repository and app return. It keeps
//!   the full cause chain (storage errors, hook errors, mapping errors).
//! - [`ApiError`] is the HTTP boundary. It picks the status code, sends a
//!   sanitized message and logs the internal details with `tracing`.
//!
//! Status mapping used by the generated routes: not-found is 404, malformed
//! bodies and ids are 400, everything else is 500. Hook errors keep the
//! hook's own message in the response body; storage details never leave the
//! server.
//!
//! ## Logging
//!
//! ```rust,ignore
//! tracing_subscriber::fmt()
//!     .with_target(false)
//!     .compact()
//!     .init();
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::hooks::HookError;
use crate::registry::ParseError;
use crate::storage::StorageError;

/// Errors returned by the registry, repository and app.
#[derive(Debug, Error)]
pub enum CrudError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("no storage driver configured")]
    NoStorageConfigured,

    #[error("{entity} with id {id} not found")]
    NotFound { entity: String, id: String },

    #[error("entity `{entity}` declares no primary key")]
    NoPrimaryKey { entity: String },

    /// The entity's primary key value is missing or unset.
    #[error("entity `{entity}` has no usable primary key value")]
    InvalidKey { entity: String },

    #[error("failed to map `{entity}`: {source}")]
    Mapping {
        entity: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("route /{resource} is already registered by another entity")]
    DuplicateRoute { resource: String },

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CrudError {
    pub(crate) fn mapping(entity: &str, source: serde_json::Error) -> Self {
        Self::Mapping {
            entity: entity.to_string(),
            source,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// API error with automatic logging and sanitized responses.
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found
    NotFound {
        /// Resource type (e.g., "User")
        resource: String,
        id: Option<String>,
    },

    /// 400 Bad Request
    BadRequest { message: String },

    /// 500 Internal Server Error from a storage driver (details logged, not exposed)
    Storage {
        message: String,
        internal: StorageError,
    },

    /// 500 Internal Server Error
    Internal {
        /// User-facing message
        message: String,
        /// Logged, not sent to the user
        internal: Option<String>,
    },
}

impl ApiError {
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    /// Create a 400 Bad Request error
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ApiError::bad_request("Invalid ID"));
    /// ```
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// The storage error is logged but NOT sent to the user.
    #[must_use]
    pub fn storage(err: StorageError) -> Self {
        Self::Storage {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Storage { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Sanitized message sent in the response body.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with ID '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::BadRequest { message }
            | Self::Storage { message, .. }
            | Self::Internal { message, .. } => message.clone(),
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Storage { internal, .. } => {
                tracing::error!(error = ?internal, "Storage error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// Convert a [`CrudError`] to an [`ApiError`]
///
/// - `NotFound` → 404
/// - `Hook` → 500 carrying the hook's message
/// - `Storage` → 500, details logged only
/// - everything else → 500 with a generic message
impl From<CrudError> for ApiError {
    fn from(err: CrudError) -> Self {
        match err {
            CrudError::NotFound { entity, id } => Self::NotFound {
                resource: entity,
                id: Some(id),
            },
            CrudError::Hook(hook) => hook.into(),
            CrudError::Storage(storage) => Self::storage(storage),
            other => Self::Internal {
                message: "Internal server error".to_string(),
                internal: Some(other.to_string()),
            },
        }
    }
}

impl From<HookError> for ApiError {
    fn from(err: HookError) -> Self {
        Self::Internal {
            message: err.to_string(),
            internal: None,
        }
    }
}
