use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The application-wide error taxonomy. Validation, authentication and
/// ownership failures are produced directly by handlers and the auth gate;
/// collaborator failures (database, blob store) convert into the 500 branch
/// and are logged server-side while the client sees a generic body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input resolved at the controller boundary.
    #[error("{0}")]
    BadRequest(String),

    /// No token was presented.
    #[error("Unauthorized")]
    Unauthenticated,

    /// A token was presented but no live session backs it. "Expired" and
    /// "never existed" are deliberately indistinguishable to the caller.
    #[error("Session expired")]
    SessionExpired,

    /// Role or ownership mismatch.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Unique-email violation during registration.
    #[error("Email already in use")]
    EmailInUse,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Blob store failure that was not tolerable as a per-item skip.
    #[error("{0}")]
    Storage(String),

    /// Password hashing/verification failure. Treated as a dependency
    /// failure: it never reveals whether the credential was close.
    #[error("{0}")]
    Hashing(String),
}

impl ApiError {
    pub fn forbidden() -> Self {
        Self::Forbidden("Forbidden".to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated | Self::SessionExpired => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::EmailInUse => StatusCode::CONFLICT,
            Self::Database(_) | Self::Storage(_) | Self::Hashing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Unexpected collaborator failures are masked: diagnostic detail goes
        // to the log, the client gets a generic body.
        let body = match &self {
            Self::Database(e) => {
                tracing::error!(error = ?e, "database failure");
                json!({ "message": "Server Error" })
            }
            Self::Storage(msg) | Self::Hashing(msg) => {
                tracing::error!(error = %msg, "dependency failure");
                json!({ "message": "Server Error" })
            }
            Self::EmailInUse => json!({ "message": self.to_string(), "code": "EMAIL_IN_USE" }),
            _ => json!({ "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
