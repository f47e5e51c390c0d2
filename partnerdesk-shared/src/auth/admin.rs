/// Admin login with allow-list bootstrap
///
/// Only emails on the configured allow-list may log in as admin. The first
/// login for an allow-listed email creates the admin account with the
/// supplied password; an existing account is promoted to admin once its
/// password checks out.

use std::collections::HashSet;
use std::sync::Arc;

use super::jwt::{TokenError, TokenService};
use crate::models::account::{
    normalize_email, Account, AccountRole, AccountUpdate, NewAccount,
};
use crate::store::{AccountStore, StoreError};

/// Error type for admin login
#[derive(Debug, thiserror::Error)]
pub enum AdminLoginError {
    #[error("Access denied")]
    NotAllowListed,

    #[error("Invalid credentials")]
    InvalidPassword,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Successful admin login
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub account: Account,
    pub token: String,
}

#[derive(Clone)]
pub struct AdminBootstrap {
    allowed: Arc<HashSet<String>>,
    store: Arc<dyn AccountStore>,
    tokens: TokenService,
}

impl AdminBootstrap {
    pub fn new<I, S>(allowed: I, store: Arc<dyn AccountStore>, tokens: TokenService) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = allowed
            .into_iter()
            .map(|email| normalize_email(email.as_ref()))
            .filter(|email| !email.is_empty())
            .collect();

        Self {
            allowed: Arc::new(allowed),
            store,
            tokens,
        }
    }

    pub fn is_allowed(&self, email: &str) -> bool {
        self.allowed.contains(&normalize_email(email))
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AdminSession, AdminLoginError> {
        let email = normalize_email(email);

        if !self.allowed.contains(&email) {
            tracing::warn!(email = %email, "Admin login attempt from email outside allow-list");
            return Err(AdminLoginError::NotAllowListed);
        }

        let account = match self.store.find_by_email(&email).await? {
            None => {
                let account = self
                    .store
                    .create(NewAccount::bootstrap_admin(&email, password))
                    .await?;
                tracing::info!(account_id = %account.id, "Bootstrapped admin account");
                account
            }
            Some(account) => {
                if !account.verify_password(password) {
                    return Err(AdminLoginError::InvalidPassword);
                }

                if account.is_admin() {
                    account
                } else {
                    tracing::info!(
                        account_id = %account.id,
                        "Promoting allow-listed account to admin"
                    );
                    self.store
                        .update(
                            account.id,
                            AccountUpdate {
                                role: Some(AccountRole::Admin),
                                ..Default::default()
                            },
                        )
                        .await?
                }
            }
        };

        let token = self.tokens.issue_admin(&account)?;

        Ok(AdminSession { account, token })
    }
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("allowed", &self.allowed)
            .finish_non_exhaustive()
    }
}
