/// Error handling for the API server
///
/// Handlers return `ApiResult<T>`; every failure becomes a JSON body of the
/// form `{ "success": false, "error": "<code>", "message": "...",
/// "details": [...] }`. Internal errors are logged and replaced by a generic
/// message.
///
/// Domain errors from the shared crate convert with `?`:
///
/// | Source | Status |
/// |---|---|
/// | `StoreError::DuplicateKey` | 409 |
/// | `StoreError::Validation` | 400 with details |
/// | `InviteError::Expired` / `Invalid` | 401 |
/// | `InviteError::Suspended` | 403 |
/// | `InviteError::Delivery` | 500, message kept |
/// | `AdminLoginError::NotAllowListed` | 403 |
/// | `AdminLoginError::InvalidPassword` | 401 |

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use partnerdesk_shared::{
    auth::{admin::AdminLoginError, jwt::TokenError},
    invite::InviteError,
    models::account::ValidationFailure,
    store::StoreError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate email
    Conflict(String),

    /// Field validation failed (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// A downstream service failed after the request's write succeeded (500)
    ///
    /// The message is shown to the caller so the partial failure is visible.
    UpstreamFailure { message: String, reason: String },

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation (camelCase, as sent by the client)
    pub field: String,

    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,

    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Single-field validation failure
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UpstreamFailure { .. } | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::UpstreamFailure { message, reason } => {
                write!(f, "Upstream failure: {} ({})", message, reason)
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_code, message, details) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::ValidationError(errors) => (
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::UpstreamFailure { message, reason } => {
                tracing::error!(reason = %reason, "{}", message);
                ("upstream_failure", message, None)
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg, None),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// `phone_number` -> `phoneNumber`
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Malformed or mistyped JSON bodies are client errors, not 422s
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Convert request-body validation errors to API errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    ValidationErrorDetail::new(
                        camel_case(field),
                        error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| "Validation failed".to_string()),
                    )
                })
            })
            .collect();

        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

impl From<ValidationFailure> for ApiError {
    fn from(failure: ValidationFailure) -> Self {
        ApiError::invalid_field(failure.field, failure.message)
    }
}

/// Convert store errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(field) => {
                ApiError::Conflict(format!("An account with this {} already exists", field))
            }
            StoreError::Validation(failure) => failure.into(),
            StoreError::NotFound => ApiError::NotFound("Account not found".to_string()),
            StoreError::Password(e) => {
                ApiError::InternalError(format!("Password operation failed: {}", e))
            }
            StoreError::Database(msg) => ApiError::InternalError(msg),
        }
    }
}

/// Convert token creation errors to API errors
///
/// Verification errors are mapped where the token is read, since the
/// message depends on which token was presented.
impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Create(msg) => {
                ApiError::InternalError(format!("Token signing failed: {}", msg))
            }
            TokenError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            TokenError::Invalid(_) => ApiError::Unauthorized("Invalid token".to_string()),
        }
    }
}

/// Convert invite errors to API errors
impl From<InviteError> for ApiError {
    fn from(err: InviteError) -> Self {
        match err {
            InviteError::InvalidRole(_) => {
                ApiError::invalid_field("role", "Role must be one of partner, owner, manager")
            }
            InviteError::AlreadyExists => ApiError::Conflict(err.to_string()),
            InviteError::Expired | InviteError::Invalid => ApiError::Unauthorized(err.to_string()),
            InviteError::NotFound => ApiError::NotFound(err.to_string()),
            InviteError::Suspended => ApiError::Forbidden(err.to_string()),
            InviteError::Delivery { reason, .. } => ApiError::UpstreamFailure {
                message: "User created but email failed to send".to_string(),
                reason,
            },
            InviteError::Store(e) => e.into(),
            InviteError::Token(e) => e.into(),
        }
    }
}

/// Convert admin login errors to API errors
impl From<AdminLoginError> for ApiError {
    fn from(err: AdminLoginError) -> Self {
        match err {
            AdminLoginError::NotAllowListed => {
                ApiError::Forbidden("Not authorized as admin".to_string())
            }
            AdminLoginError::InvalidPassword => {
                ApiError::Unauthorized("Invalid password".to_string())
            }
            AdminLoginError::Store(e) => e.into(),
            AdminLoginError::Token(e) => e.into(),
        }
    }
}
