/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Signup, login, logout, profile and invite redemption
/// - `admin`: Admin login and partner management
///
/// Successful responses share one envelope:
///
/// ```json
/// { "success": true, "message": "...", "data": { ... } }
/// ```

pub mod admin;
pub mod auth;
pub mod health;

use crate::error::ApiError;
use axum::{
    extract::FromRequest,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// JSON body extractor whose rejections become [`ApiError::BadRequest`]
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Success envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: None,
        })
    }
}

/// Response that also sets (or clears) a cookie
pub fn with_cookie<T: Serialize>(
    status: StatusCode,
    cookie: String,
    body: Json<Envelope<T>>,
) -> Response {
    (status, [(header::SET_COOKIE, cookie)], body).into_response()
}
