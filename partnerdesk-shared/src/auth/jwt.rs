/// Signed, time-limited tokens
///
/// Three token kinds share one HS256 secret:
///
/// - **Session**: `{sub}`, carried in the `token` cookie
/// - **Admin**: `{sub, email, role}`, carried in the `adminToken` cookie so a
///   browser can hold a regular and an admin session at the same time
/// - **Invite**: `{email, name, role}`, mailed to an invited partner and
///   redeemed once to activate the pending account
///
/// Every token also carries `iss`, `iat`, `nbf`, `exp` and a `kind` tag. A
/// token of one kind never verifies as another kind.
///
/// Verification distinguishes [`TokenError::Expired`] (signature valid but
/// past its lifetime) from [`TokenError::Invalid`] (tampered, wrong secret,
/// malformed or wrong kind) so callers can tell a user to request a fresh
/// invite rather than contact an admin.
///
/// # Example
///
/// ```
/// use partnerdesk_shared::auth::jwt::{TokenLifetimes, TokenService};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tokens = TokenService::new("a-secret-of-at-least-32-bytes-long", TokenLifetimes::default());
/// let account_id = Uuid::new_v4();
///
/// let token = tokens.issue_session(account_id)?;
/// let claims = tokens.verify_session(&token)?;
/// assert_eq!(claims.sub, account_id);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::models::account::{Account, AccountRole};

/// Issuer written into and required from every token
pub const ISSUER: &str = "partnerdesk";

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Signing failed
    #[error("Failed to create token: {0}")]
    Create(String),

    /// Signature is valid but the token is past its lifetime
    #[error("Token has expired")]
    Expired,

    /// Tampered, foreign, malformed or wrong-kind token
    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Token kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Session,
    Admin,
    Invite,
}

/// Lifetimes for each token kind
#[derive(Debug, Clone)]
pub struct TokenLifetimes {
    /// Regular login session
    pub session: Duration,

    /// Session issued right after an invite is redeemed
    pub redemption_session: Duration,

    /// Admin session
    pub admin: Duration,

    /// Invite link
    pub invite: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            session: Duration::days(1),
            redemption_session: Duration::days(5),
            admin: Duration::days(1),
            invite: Duration::days(5),
        }
    }
}

/// Registered claims shared by every token kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMeta {
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub kind: TokenKind,
}

impl TokenMeta {
    /// Stamps a token of `kind` valid from now for `lifetime`
    ///
    /// A negative lifetime produces an already-expired token.
    pub fn new(kind: TokenKind, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            kind,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Claims types that carry [`TokenMeta`]
pub trait Claims: Serialize + DeserializeOwned {
    /// Kind every token of this type must be tagged with
    const KIND: TokenKind;

    fn meta(&self) -> &TokenMeta;
}

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account ID
    pub sub: Uuid,

    #[serde(flatten)]
    pub meta: TokenMeta,
}

impl SessionClaims {
    pub fn new(account_id: Uuid, lifetime: Duration) -> Self {
        Self {
            sub: account_id,
            meta: TokenMeta::new(TokenKind::Session, lifetime),
        }
    }
}

impl Claims for SessionClaims {
    const KIND: TokenKind = TokenKind::Session;

    fn meta(&self) -> &TokenMeta {
        &self.meta
    }
}

/// Admin session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Account ID
    pub sub: Uuid,

    pub email: String,

    /// Always `admin` at issue time
    pub role: AccountRole,

    #[serde(flatten)]
    pub meta: TokenMeta,
}

impl AdminClaims {
    pub fn new(account_id: Uuid, email: String, lifetime: Duration) -> Self {
        Self {
            sub: account_id,
            email,
            role: AccountRole::Admin,
            meta: TokenMeta::new(TokenKind::Admin, lifetime),
        }
    }
}

impl Claims for AdminClaims {
    const KIND: TokenKind = TokenKind::Admin;

    fn meta(&self) -> &TokenMeta {
        &self.meta
    }
}

/// Invite token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteClaims {
    /// Email of the pending account
    pub email: String,

    pub name: String,

    pub role: AccountRole,

    #[serde(flatten)]
    pub meta: TokenMeta,
}

impl InviteClaims {
    pub fn new(email: String, name: String, role: AccountRole, lifetime: Duration) -> Self {
        Self {
            email,
            name,
            role,
            meta: TokenMeta::new(TokenKind::Invite, lifetime),
        }
    }
}

impl Claims for InviteClaims {
    const KIND: TokenKind = TokenKind::Invite;

    fn meta(&self) -> &TokenMeta {
        &self.meta
    }
}

/// Signs claims with HS256
pub fn create_token<C: Serialize>(claims: &C, secret: &str) -> Result<String, TokenError> {
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| TokenError::Create(e.to_string()))
}

/// Verifies signature, issuer, `nbf`, `exp` and kind, then returns the claims
///
/// No leeway is applied to `exp`.
pub fn validate_token<C: Claims>(token: &str, secret: &str) -> Result<C, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let data = decode::<C>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid(e.to_string()),
    })?;

    if data.claims.meta().kind != C::KIND {
        return Err(TokenError::Invalid(format!(
            "expected {:?} token, got {:?}",
            C::KIND,
            data.claims.meta().kind
        )));
    }

    Ok(data.claims)
}

/// Issues and verifies every token kind with one shared secret
#[derive(Clone)]
pub struct TokenService {
    secret: Arc<str>,
    lifetimes: TokenLifetimes,
}

impl TokenService {
    pub fn new(secret: impl Into<String>, lifetimes: TokenLifetimes) -> Self {
        Self {
            secret: Arc::from(secret.into()),
            lifetimes,
        }
    }

    pub fn lifetimes(&self) -> &TokenLifetimes {
        &self.lifetimes
    }

    /// Signs arbitrary claims with the service secret
    pub fn issue<C: Serialize>(&self, claims: &C) -> Result<String, TokenError> {
        create_token(claims, &self.secret)
    }

    pub fn issue_session(&self, account_id: Uuid) -> Result<String, TokenError> {
        self.issue(&SessionClaims::new(account_id, self.lifetimes.session))
    }

    /// Session issued on invite redemption; lives longer than a regular login
    pub fn issue_redemption_session(&self, account_id: Uuid) -> Result<String, TokenError> {
        self.issue(&SessionClaims::new(
            account_id,
            self.lifetimes.redemption_session,
        ))
    }

    pub fn issue_admin(&self, account: &Account) -> Result<String, TokenError> {
        let email = account.email.clone().unwrap_or_default();
        self.issue(&AdminClaims::new(account.id, email, self.lifetimes.admin))
    }

    pub fn issue_invite(
        &self,
        email: &str,
        name: &str,
        role: AccountRole,
    ) -> Result<String, TokenError> {
        self.issue(&InviteClaims::new(
            email.to_string(),
            name.to_string(),
            role,
            self.lifetimes.invite,
        ))
    }

    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, TokenError> {
        validate_token(token, &self.secret)
    }

    pub fn verify_admin(&self, token: &str) -> Result<AdminClaims, TokenError> {
        validate_token(token, &self.secret)
    }

    pub fn verify_invite(&self, token: &str) -> Result<InviteClaims, TokenError> {
        validate_token(token, &self.secret)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"<redacted>")
            .field("lifetimes", &self.lifetimes)
            .finish()
    }
}
