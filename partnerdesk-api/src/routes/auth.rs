/// Account endpoints
///
/// # Endpoints
///
/// - `POST /signup`, `POST /signup/email` - Register with email and password
/// - `POST /signup/phone` - Register with a phone number and external auth id
/// - `POST /login` - Log in and receive the session cookie
/// - `POST /logout` - Clear the session cookie (session required)
/// - `GET /profile` - Current account's name and email (session required)
/// - `POST /setup-partner` - Redeem an invite token and set a password

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{with_cookie, Envelope, JsonBody},
};
use axum::{extract::State, http::StatusCode, response::Response, Extension, Json};
use partnerdesk_shared::{
    auth::{
        cookie::SESSION_COOKIE,
        middleware::CurrentAccount,
        password::validate_password_strength,
    },
    models::account::{normalize_email, Account, AccountStatus, NewAccount},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Email signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 3, max = 45, message = "Name must be between 3 and 45 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked with `validate_password_strength`
    pub password: String,
}

/// Phone signup request
///
/// The phone number format is checked by the account model.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PhoneSignupRequest {
    #[validate(length(min = 3, max = 45, message = "Name must be between 3 and 45 characters"))]
    pub name: String,

    pub phone_number: String,

    #[validate(length(min = 1, message = "External auth id is required"))]
    pub external_auth_id: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,

    pub password: String,
}

/// Invite redemption request
#[derive(Debug, Deserialize, Validate)]
pub struct SetupPartnerRequest {
    #[validate(length(min = 1, message = "Invite token is required"))]
    pub token: String,

    pub password: String,
}

/// Public profile fields returned by login and profile
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileData {
    pub name: String,
    pub email: Option<String>,
}

impl From<&Account> for ProfileData {
    fn from(account: &Account) -> Self {
        Self {
            name: account.name.clone(),
            email: account.email.clone(),
        }
    }
}

fn check_password_strength(password: &str) -> ApiResult<()> {
    validate_password_strength(password).map_err(|e| ApiError::invalid_field("password", e))
}

/// Issues a session for `account` and wraps `body` with its cookie
fn start_session<T: Serialize>(
    state: &AppState,
    account: &Account,
    status: StatusCode,
    body: Json<Envelope<T>>,
) -> ApiResult<Response> {
    let token = state.tokens.issue_session(account.id)?;
    let cookie = state
        .cookies
        .set(SESSION_COOKIE, &token, state.tokens.lifetimes().session);

    Ok(with_cookie(status, cookie, body))
}

/// Register with email and password
///
/// # Endpoint
///
/// ```text
/// POST /signup
/// Content-Type: application/json
///
/// { "name": "Ann", "email": "ann@x.com", "password": "Str0ng!Pass" }
/// ```
///
/// Responds `201` with the account and sets the session cookie.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, weak password, or email taken
/// - `409 Conflict`: Email claimed by a concurrent signup
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> ApiResult<Response> {
    req.validate()?;
    check_password_strength(&req.password)?;

    let email = normalize_email(&req.email);
    if state.store.find_by_email(&email).await?.is_some() {
        return Err(ApiError::BadRequest(
            "User with this email already exists".to_string(),
        ));
    }

    let account = state
        .store
        .create(NewAccount::with_email(&req.name, &email, &req.password))
        .await?;

    tracing::info!(account_id = %account.id, "Account registered with email");

    start_session(
        &state,
        &account,
        StatusCode::CREATED,
        Envelope::with_data("User saved successfully", account.clone()),
    )
}

/// Register with a phone number verified by an external provider
///
/// Responds `201` with the account and sets the session cookie.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Phone number or external auth id already registered
pub async fn signup_phone(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<PhoneSignupRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let phone_number = req.phone_number.trim();
    if state.store.find_by_phone(phone_number).await?.is_some() {
        return Err(ApiError::Conflict(
            "User with this phone number already exists".to_string(),
        ));
    }

    let account = state
        .store
        .create(NewAccount::with_phone(
            &req.name,
            phone_number,
            &req.external_auth_id,
        ))
        .await?;

    tracing::info!(account_id = %account.id, "Account registered with phone");

    start_session(
        &state,
        &account,
        StatusCode::CREATED,
        Envelope::with_data("User saved successfully", account.clone()),
    )
}

/// Log in with email and password
///
/// Unknown email and wrong password produce the same response.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid email or credentials
/// - `403 Forbidden`: Admin or suspended account
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let invalid = || ApiError::BadRequest("Invalid credentials".to_string());

    let account = state
        .store
        .find_by_email(&normalize_email(&req.email))
        .await?
        .ok_or_else(invalid)?;

    if !account.verify_password(&req.password) {
        tracing::debug!(account_id = %account.id, "Login rejected");
        return Err(invalid());
    }

    if account.is_admin() {
        return Err(ApiError::Forbidden(
            "Admin accounts must log in through the admin portal".to_string(),
        ));
    }
    if account.status == AccountStatus::Suspended {
        return Err(ApiError::Forbidden("Account is suspended".to_string()));
    }

    tracing::info!(account_id = %account.id, "Login successful");

    start_session(
        &state,
        &account,
        StatusCode::OK,
        Envelope::with_data("Login successful", ProfileData::from(&account)),
    )
}

/// Clear the session cookie
pub async fn logout(
    State(state): State<AppState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> Response {
    tracing::info!(account_id = %account.id, "Logout");

    with_cookie(
        StatusCode::OK,
        state.cookies.clear(SESSION_COOKIE),
        Envelope::message("Logout successfully"),
    )
}

/// Current account's profile
pub async fn profile(
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> Json<Envelope<ProfileData>> {
    Envelope::with_data("User profile fetched successfully", ProfileData::from(&account))
}

/// Redeem an invite and set the account password
///
/// # Endpoint
///
/// ```text
/// POST /setup-partner
/// Content-Type: application/json
///
/// { "token": "eyJ...", "password": "N3w!Password" }
/// ```
///
/// Responds `200` with the activated account and sets a session cookie
/// valid for the redemption session lifetime.
///
/// # Errors
///
/// - `400 Bad Request`: Missing token or weak password
/// - `401 Unauthorized`: Expired or invalid invite token
/// - `403 Forbidden`: The invited account has been suspended
/// - `404 Not Found`: The invited account no longer exists
pub async fn setup_partner(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SetupPartnerRequest>,
) -> ApiResult<Response> {
    req.validate()?;
    check_password_strength(&req.password)?;

    let redemption = state.invites.redeem(&req.token, &req.password).await?;

    let cookie = state.cookies.set(
        SESSION_COOKIE,
        &redemption.session_token,
        state.tokens.lifetimes().redemption_session,
    );

    Ok(with_cookie(
        StatusCode::OK,
        cookie,
        Envelope::with_data("Account activated successfully", redemption.account),
    ))
}
