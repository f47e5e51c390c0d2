/// Credential store
///
/// [`AccountStore`] persists accounts, enforces sparse uniqueness of email,
/// phone number and external auth id, and runs field validators. Password
/// hashing is a side effect of persistence: drafts and updates carry
/// plaintext, and the store writes only the Argon2id hash.
///
/// # Backends
///
/// - [`postgres::PgAccountStore`]: production store over `sqlx`
/// - [`memory::MemoryAccountStore`]: in-process store for tests and local runs
///
/// # Example
///
/// ```
/// use partnerdesk_shared::models::account::NewAccount;
/// use partnerdesk_shared::store::{memory::MemoryAccountStore, AccountStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryAccountStore::new();
/// let account = store
///     .create(NewAccount::with_email("Ann", "ann@x.com", "Str0ng!Pass"))
///     .await?;
///
/// assert_ne!(account.password_hash.as_deref(), Some("Str0ng!Pass"));
/// assert!(account.verify_password("Str0ng!Pass"));
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::password::{self, PasswordError};
use crate::models::account::{Account, AccountUpdate, NewAccount, ValidationFailure};

/// Field guarded by a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    PhoneNumber,
    ExternalAuthId,
}

impl UniqueField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UniqueField::Email => "email",
            UniqueField::PhoneNumber => "phoneNumber",
            UniqueField::ExternalAuthId => "externalAuthId",
        }
    }
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another account already holds this value
    #[error("An account with this {0} already exists")]
    DuplicateKey(UniqueField),

    /// Field constraint violated
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    /// No account with the given ID
    #[error("Account not found")]
    NotFound,

    /// Password could not be hashed
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Backend failure
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                match db_err.constraint() {
                    Some(c) if c.contains("phone") => {
                        StoreError::DuplicateKey(UniqueField::PhoneNumber)
                    }
                    Some(c) if c.contains("external_auth") => {
                        StoreError::DuplicateKey(UniqueField::ExternalAuthId)
                    }
                    _ => StoreError::DuplicateKey(UniqueField::Email),
                }
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Persistence contract for accounts
///
/// Implementations provide per-account atomicity only; there are no
/// multi-account transactions.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Validates, hashes any plaintext password and inserts the account
    ///
    /// Fails with `DuplicateKey` if the email, phone number or external auth
    /// id is already claimed, including when a concurrent insert wins the race.
    async fn create(&self, draft: NewAccount) -> Result<Account, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Lookup by email; the argument is normalized first
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Account>, StoreError>;

    /// Applies a partial update, re-validating and re-hashing touched fields
    async fn update(&self, id: Uuid, changes: AccountUpdate) -> Result<Account, StoreError>;

    /// Non-admin accounts whose name or email contains `query`
    /// (case-insensitive), newest first; all non-admins for a blank query
    async fn search(&self, query: Option<&str>) -> Result<Vec<Account>, StoreError>;

    /// Cheap liveness check used by the health endpoint
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Validated draft with the plaintext password already replaced by its hash
pub(crate) struct PreparedAccount {
    pub draft: NewAccount,
    pub password_hash: Option<String>,
}

pub(crate) fn prepare_draft(mut draft: NewAccount) -> Result<PreparedAccount, StoreError> {
    draft.validate()?;

    let password_hash = draft
        .password
        .take()
        .map(|plain| password::hash_password(&plain))
        .transpose()?;

    Ok(PreparedAccount {
        draft,
        password_hash,
    })
}

/// Validated update with the plaintext password replaced by its hash
pub(crate) struct PreparedUpdate {
    pub changes: AccountUpdate,
    pub password_hash: Option<String>,
}

pub(crate) fn prepare_update(changes: AccountUpdate) -> Result<PreparedUpdate, StoreError> {
    let mut changes = changes.normalize();
    changes.validate()?;

    let password_hash = changes
        .password
        .take()
        .map(|plain| password::hash_password(&plain))
        .transpose()?;

    Ok(PreparedUpdate {
        changes,
        password_hash,
    })
}

/// Trimmed search term, or `None` when it would match everything
pub(crate) fn search_term(query: Option<&str>) -> Option<String> {
    query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase)
}
