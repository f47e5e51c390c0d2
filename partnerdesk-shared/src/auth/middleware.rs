/// Session auth guards for axum
///
/// Two guards share one flow: read the credential cookie, verify the token,
/// load the account, attach it to the request as [`CurrentAccount`].
///
/// - [`require_session`]: `token` cookie, any role
/// - [`require_admin`]: `adminToken` cookie, role must be admin
///
/// A missing cookie, a token that fails verification, or a token naming an
/// account that no longer exists is `401`. An admin token resolving to a
/// non-admin account is `403`. Guards never modify the account.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Extension, Router};
/// use partnerdesk_shared::auth::jwt::{TokenLifetimes, TokenService};
/// use partnerdesk_shared::auth::middleware::{require_session, AuthGuard, CurrentAccount};
/// use partnerdesk_shared::store::memory::MemoryAccountStore;
///
/// async fn profile(Extension(CurrentAccount(account)): Extension<CurrentAccount>) -> String {
///     account.name
/// }
///
/// let guard = AuthGuard::new(
///     Arc::new(MemoryAccountStore::new()),
///     TokenService::new("a-secret-of-at-least-32-bytes-long", TokenLifetimes::default()),
/// );
///
/// let app: Router = Router::new()
///     .route("/profile", get(profile))
///     .layer(middleware::from_fn_with_state(guard, require_session));
/// ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::cookie::{read_cookie, ADMIN_COOKIE, SESSION_COOKIE};
use super::jwt::{TokenError, TokenService};
use crate::models::account::Account;
use crate::store::{AccountStore, StoreError};

/// Account resolved by a guard, stored in request extensions
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

/// Error type for the auth guards
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No credential cookie on the request
    #[error("Authentication required")]
    MissingCredentials,

    /// Token failed verification
    #[error("{0}")]
    InvalidToken(String),

    /// Token is valid but its account is gone
    #[error("Account no longer exists")]
    UnknownAccount,

    /// Authenticated, but not an admin
    #[error("Admin access required")]
    NotAdmin,

    /// Account lookup failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials
            | AuthError::InvalidToken(_)
            | AuthError::UnknownAccount => StatusCode::UNAUTHORIZED,
            AuthError::NotAdmin => StatusCode::FORBIDDEN,
            AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::InvalidToken("Session expired".to_string()),
            other => {
                tracing::debug!(error = %other, "Rejected session token");
                AuthError::InvalidToken("Invalid session".to_string())
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error, message) = match &self {
            AuthError::Store(e) => {
                tracing::error!(error = %e, "Account lookup failed in auth guard");
                ("internal_error", "An internal error occurred".to_string())
            }
            AuthError::NotAdmin => ("forbidden", self.to_string()),
            _ => ("unauthorized", self.to_string()),
        };

        let body = Json(json!({
            "success": false,
            "error": error,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Resolves credential cookies to accounts
#[derive(Clone)]
pub struct AuthGuard {
    store: Arc<dyn AccountStore>,
    tokens: TokenService,
}

impl AuthGuard {
    pub fn new(store: Arc<dyn AccountStore>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    /// Account behind the `token` session cookie
    pub async fn authenticate_session(&self, headers: &HeaderMap) -> Result<Account, AuthError> {
        let token = read_cookie(headers, SESSION_COOKIE).ok_or(AuthError::MissingCredentials)?;
        let claims = self.tokens.verify_session(&token)?;

        self.store
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::UnknownAccount)
    }

    /// Admin account behind the `adminToken` cookie
    pub async fn authenticate_admin(&self, headers: &HeaderMap) -> Result<Account, AuthError> {
        let token = read_cookie(headers, ADMIN_COOKIE).ok_or(AuthError::MissingCredentials)?;
        let claims = self.tokens.verify_admin(&token)?;

        let account = self
            .store
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::UnknownAccount)?;

        // Role is re-read from the store; the claim alone is not trusted
        if !account.is_admin() {
            tracing::warn!(account_id = %account.id, "Admin token presented by non-admin account");
            return Err(AuthError::NotAdmin);
        }

        Ok(account)
    }
}

impl std::fmt::Debug for AuthGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGuard")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

/// Session guard for `middleware::from_fn_with_state`
pub async fn require_session(
    State(guard): State<AuthGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let account = guard.authenticate_session(req.headers()).await?;
    req.extensions_mut().insert(CurrentAccount(account));

    Ok(next.run(req).await)
}

/// Admin guard for `middleware::from_fn_with_state`
pub async fn require_admin(
    State(guard): State<AuthGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let account = guard.authenticate_admin(req.headers()).await?;
    req.extensions_mut().insert(CurrentAccount(account));

    Ok(next.run(req).await)
}
