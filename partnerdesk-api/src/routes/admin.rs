/// Admin endpoints
///
/// `POST /admin/login` is public; every other route sits behind the admin
/// guard, which reads the `adminToken` cookie and re-checks the account's
/// role on each request.
///
/// # Endpoints
///
/// - `POST /admin/login` - Allow-listed login, bootstraps the admin account
/// - `POST /admin/logout` - Clear the admin cookie
/// - `GET /admin/verify` - Check the admin session
/// - `POST /admin/account`, `POST /admin/accounts` - Search non-admin accounts
/// - `POST /admin/invite-partner` - Create a pending account and email an invite
/// - `GET /admin/partner/:id` - Fetch one account
/// - `PATCH /admin/partner/:id` - Partial update
/// - `PUT /admin/partner/:id` - Replace name, email and status

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{with_cookie, Envelope, JsonBody},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Extension, Json,
};
use partnerdesk_shared::{
    auth::{cookie::ADMIN_COOKIE, middleware::CurrentAccount},
    models::account::{Account, AccountRole, AccountStatus, AccountSummary, AccountUpdate},
    store::StoreError,
};
use serde::Deserialize;
use uuid::Uuid;

/// Admin login request
///
/// Fields are optional so a missing one gets a specific message.
#[derive(Debug, Default, Deserialize)]
pub struct AdminLoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Account search request
#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    /// Case-insensitive name or email fragment; absent lists everyone
    pub query: Option<String>,
}

/// Invite request
#[derive(Debug, Default, Deserialize)]
pub struct InviteRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// Partial partner update
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

/// Full partner update
#[derive(Debug, Deserialize)]
pub struct PartnerReplace {
    pub name: String,
    pub email: String,
    pub status: String,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_partner_id(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| ApiError::BadRequest("Invalid partner ID format".to_string()))
}

fn parse_role(role: &str) -> ApiResult<AccountRole> {
    Ok(role.trim().parse::<AccountRole>()?)
}

fn parse_status(status: &str) -> ApiResult<AccountStatus> {
    Ok(status.trim().parse::<AccountStatus>()?)
}

/// Applies `update` to the partner `id`, mapping a missing account to 404
async fn update_partner(state: &AppState, id: &str, update: AccountUpdate) -> ApiResult<Account> {
    let id = parse_partner_id(id)?;

    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    state.store.update(id, update).await.map_err(|e| match e {
        StoreError::NotFound => ApiError::NotFound("Partner not found".to_string()),
        other => other.into(),
    })
}

/// Admin login
///
/// The first login of an allow-listed email creates its admin account with
/// the supplied password. An existing account is promoted to admin once its
/// password checks out.
///
/// # Errors
///
/// - `400 Bad Request`: Missing email or password
/// - `401 Unauthorized`: Wrong password
/// - `403 Forbidden`: Email not on the allow-list
pub async fn admin_login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AdminLoginRequest>,
) -> ApiResult<Response> {
    let (Some(email), Some(password)) = (present(req.email), present(req.password)) else {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    };

    let session = state.admin.login(&email, &password).await?;
    tracing::info!(account_id = %session.account.id, "Admin logged in");

    let cookie = state
        .cookies
        .set(ADMIN_COOKIE, &session.token, state.tokens.lifetimes().admin);

    Ok(with_cookie(
        StatusCode::OK,
        cookie,
        Envelope::message("Admin logged in"),
    ))
}

pub async fn admin_logout(
    State(state): State<AppState>,
    Extension(CurrentAccount(admin)): Extension<CurrentAccount>,
) -> Response {
    tracing::info!(account_id = %admin.id, "Admin logged out");

    with_cookie(
        StatusCode::OK,
        state.cookies.clear(ADMIN_COOKIE),
        Envelope::message("Admin logged out"),
    )
}

/// Succeeds whenever the admin guard let the request through
pub async fn admin_verify(
    Extension(CurrentAccount(_)): Extension<CurrentAccount>,
) -> Json<Envelope<()>> {
    Envelope::message("Admin verified")
}

/// Lists non-admin accounts, newest first
///
/// The body is optional; `{"query": "ann"}` narrows the list to names or
/// emails containing the fragment.
pub async fn list_accounts(
    State(state): State<AppState>,
    body: Option<JsonBody<SearchRequest>>,
) -> ApiResult<Json<Envelope<Vec<AccountSummary>>>> {
    let query = body.and_then(|JsonBody(req)| req.query);

    let accounts = state.store.search(query.as_deref()).await?;
    let summaries = accounts.iter().map(Account::summary).collect();

    Ok(Envelope::with_data("Accounts fetched successfully", summaries))
}

/// Invite a partner
///
/// # Errors
///
/// - `400 Bad Request`: Missing field, unknown role, or admin role
/// - `409 Conflict`: Email already registered
/// - `500 Internal Server Error`: Account created but the email failed
pub async fn invite_partner(
    State(state): State<AppState>,
    Extension(CurrentAccount(admin)): Extension<CurrentAccount>,
    JsonBody(req): JsonBody<InviteRequest>,
) -> ApiResult<Json<Envelope<AccountSummary>>> {
    let (Some(name), Some(email), Some(role)) =
        (present(req.name), present(req.email), present(req.role))
    else {
        return Err(ApiError::BadRequest(
            "Email, role and name are required".to_string(),
        ));
    };

    let role = parse_role(&role)?;
    let account = state
        .invites
        .issue_invite(&admin, &name, &email, role)
        .await?;

    Ok(Envelope::with_data(
        "Invitation sent successfully",
        account.summary(),
    ))
}

pub async fn get_partner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<Account>>> {
    let id = parse_partner_id(&id)?;

    let partner = state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Partner not found".to_string()))?;

    Ok(Envelope::with_data("Partner fetched successfully", partner))
}

/// Partial update; omitted fields are left untouched
pub async fn patch_partner(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<PartnerPatch>,
) -> ApiResult<Json<Envelope<Account>>> {
    let update = AccountUpdate {
        name: req.name,
        email: req.email,
        phone_number: req.phone_number,
        role: req.role.as_deref().map(parse_role).transpose()?,
        status: req.status.as_deref().map(parse_status).transpose()?,
        ..Default::default()
    };

    let partner = update_partner(&state, &id, update).await?;
    tracing::info!(account_id = %partner.id, "Partner updated");

    Ok(Envelope::with_data("Partner updated successfully", partner))
}

/// Replaces name, email and status
pub async fn put_partner(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<PartnerReplace>,
) -> ApiResult<Json<Envelope<Account>>> {
    let update = AccountUpdate {
        name: Some(req.name),
        email: Some(req.email),
        status: Some(parse_status(&req.status)?),
        ..Default::default()
    };

    let partner = update_partner(&state, &id, update).await?;
    tracing::info!(account_id = %partner.id, "Partner replaced");

    Ok(Envelope::with_data("Partner updated successfully", partner))
}
