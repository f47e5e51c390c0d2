/// Invite lifecycle
///
/// ```text
/// [no account] --issue_invite--> [Inactive, invite_token set, no password]
/// [Inactive]   --redeem-------->  [Active, password set, invite_token cleared]
/// ```
///
/// Possession of a valid invite token, not a password, proves the right to
/// activate the account. Redemption is stateless: the token is verified on
/// its own signature and lifetime, so redeeming the same token twice simply
/// resets the password again and issues another session. A suspended
/// account is the exception: redemption is refused and the suspension stands.

use std::sync::Arc;

use crate::auth::jwt::{TokenError, TokenService};
use crate::mail::{invite_email, Mailer};
use crate::models::account::{
    normalize_email, Account, AccountRole, AccountStatus, AccountUpdate, NewAccount,
};
use crate::store::{AccountStore, StoreError, UniqueField};

/// Error type for invite issuance and redemption
#[derive(Debug, thiserror::Error)]
pub enum InviteError {
    #[error("Role `{0}` cannot be assigned through an invite")]
    InvalidRole(AccountRole),

    #[error("Email already registered")]
    AlreadyExists,

    #[error("Invite link has expired, please ask an admin for a new invite")]
    Expired,

    #[error("Invalid invite link, please contact an admin")]
    Invalid,

    #[error("No account found for this invite")]
    NotFound,

    /// Suspended accounts stay suspended until an admin lifts it
    #[error("Account is suspended, please contact an admin")]
    Suspended,

    /// The account exists but the invite email was not delivered
    #[error("User created but email failed to send")]
    Delivery { account: Box<Account>, reason: String },

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Token(TokenError),
}

impl From<StoreError> for InviteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(UniqueField::Email) => InviteError::AlreadyExists,
            other => InviteError::Store(other),
        }
    }
}

/// Result of a successful redemption
#[derive(Debug, Clone)]
pub struct Redemption {
    pub account: Account,

    /// Session token for immediate login
    pub session_token: String,
}

pub struct InviteManager {
    store: Arc<dyn AccountStore>,
    tokens: TokenService,
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
}

impl InviteManager {
    pub fn new(
        store: Arc<dyn AccountStore>,
        tokens: TokenService,
        mailer: Arc<dyn Mailer>,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            tokens,
            mailer,
            frontend_url: frontend_url.into(),
        }
    }

    /// Creates a pending account and mails its invite link
    ///
    /// The account is not rolled back when delivery fails; the caller gets
    /// [`InviteError::Delivery`] carrying the created account.
    pub async fn issue_invite(
        &self,
        admin: &Account,
        name: &str,
        email: &str,
        role: AccountRole,
    ) -> Result<Account, InviteError> {
        if !role.is_invitable() {
            return Err(InviteError::InvalidRole(role));
        }

        let email = normalize_email(email);
        let name = name.trim();

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(InviteError::AlreadyExists);
        }

        let token = self
            .tokens
            .issue_invite(&email, name, role)
            .map_err(InviteError::Token)?;

        // A concurrent invite for the same email loses here with AlreadyExists
        let account = self
            .store
            .create(NewAccount::invited(name, &email, role, token.clone()))
            .await?;

        tracing::info!(
            admin_id = %admin.id,
            account_id = %account.id,
            role = %role,
            "Partner invite issued"
        );

        let message = invite_email(&self.frontend_url, &email, name, role, &token);
        if let Err(e) = self.mailer.send(message).await {
            tracing::error!(account_id = %account.id, error = %e, "Invite email delivery failed");
            return Err(InviteError::Delivery {
                account: Box::new(account),
                reason: e.to_string(),
            });
        }

        Ok(account)
    }

    /// Activates the account named by `token` with `new_password`
    pub async fn redeem(&self, token: &str, new_password: &str) -> Result<Redemption, InviteError> {
        let claims = self.tokens.verify_invite(token).map_err(|e| match e {
            TokenError::Expired => InviteError::Expired,
            other => {
                tracing::debug!(error = %other, "Rejected invite token");
                InviteError::Invalid
            }
        })?;

        let account = self
            .store
            .find_by_email(&claims.email)
            .await?
            .ok_or(InviteError::NotFound)?;

        if account.status == AccountStatus::Suspended {
            tracing::warn!(account_id = %account.id, "Invite redeemed for a suspended account");
            return Err(InviteError::Suspended);
        }

        let account = self
            .store
            .update(
                account.id,
                AccountUpdate {
                    password: Some(new_password.to_string()),
                    status: Some(AccountStatus::Active),
                    invite_token: Some(None),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| match e {
                StoreError::NotFound => InviteError::NotFound,
                other => InviteError::from(other),
            })?;

        let session_token = self
            .tokens
            .issue_redemption_session(account.id)
            .map_err(InviteError::Token)?;

        tracing::info!(account_id = %account.id, "Invite redeemed");

        Ok(Redemption {
            account,
            session_token,
        })
    }
}

impl std::fmt::Debug for InviteManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InviteManager")
            .field("frontend_url", &self.frontend_url)
            .finish_non_exhaustive()
    }
}
