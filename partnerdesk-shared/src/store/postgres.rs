/// PostgreSQL account store
///
/// Uniqueness is enforced by the `accounts_*_key` constraints, so a losing
/// concurrent insert surfaces as a unique violation and is mapped to
/// [`StoreError::DuplicateKey`] by the `From<sqlx::Error>` impl.
///
/// # Example
///
/// ```no_run
/// # use partnerdesk_shared::store::{postgres::PgAccountStore, AccountStore};
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store = PgAccountStore::new(pool);
/// let partners = store.search(Some("ann")).await?;
/// println!("{} matching partners", partners.len());
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{prepare_draft, prepare_update, search_term, AccountStore, StoreError};
use crate::models::account::{normalize_email, Account, AccountUpdate, NewAccount};

const ACCOUNT_COLUMNS: &str = "id, name, email, phone_number, external_auth_id, password_hash, \
     invite_token, role, status, invited_by_admin, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Escapes `LIKE` wildcards so user input matches literally
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create(&self, draft: NewAccount) -> Result<Account, StoreError> {
        let prepared = prepare_draft(draft)?;
        let draft = prepared.draft;

        let query = format!(
            r#"
            INSERT INTO accounts (name, email, phone_number, external_auth_id, password_hash,
                                  invite_token, role, status, invited_by_admin)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(draft.name)
            .bind(draft.email)
            .bind(draft.phone_number)
            .bind(draft.external_auth_id)
            .bind(prepared.password_hash)
            .bind(draft.invite_token)
            .bind(draft.role)
            .bind(draft.status)
            .bind(draft.invited_by_admin)
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!(account_id = %account.id, "Account created");
        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {} FROM accounts WHERE email = $1", ACCOUNT_COLUMNS);

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Account>, StoreError> {
        let query = format!(
            "SELECT {} FROM accounts WHERE phone_number = $1",
            ACCOUNT_COLUMNS
        );

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(phone_number.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn update(&self, id: Uuid, changes: AccountUpdate) -> Result<Account, StoreError> {
        let prepared = prepare_update(changes)?;
        let changes = prepared.changes;
        let password_hash = prepared.password_hash;

        // $1 is the id; every touched column takes the next placeholder
        let mut query = String::from("UPDATE accounts SET updated_at = NOW()");
        let mut bind_count = 1;

        let mut push = |column: &str, query: &mut String| {
            bind_count += 1;
            query.push_str(&format!(", {} = ${}", column, bind_count));
        };

        if changes.name.is_some() {
            push("name", &mut query);
        }
        if changes.email.is_some() {
            push("email", &mut query);
        }
        if changes.phone_number.is_some() {
            push("phone_number", &mut query);
        }
        if password_hash.is_some() {
            push("password_hash", &mut query);
        }
        if changes.invite_token.is_some() {
            push("invite_token", &mut query);
        }
        if changes.role.is_some() {
            push("role", &mut query);
        }
        if changes.status.is_some() {
            push("status", &mut query);
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", ACCOUNT_COLUMNS));

        let mut q = sqlx::query_as::<_, Account>(&query).bind(id);

        if let Some(name) = changes.name {
            q = q.bind(name);
        }
        if let Some(email) = changes.email {
            q = q.bind(email);
        }
        if let Some(phone) = changes.phone_number {
            q = q.bind(phone);
        }
        if let Some(hash) = password_hash {
            q = q.bind(hash);
        }
        if let Some(invite_token) = changes.invite_token {
            q = q.bind(invite_token);
        }
        if let Some(role) = changes.role {
            q = q.bind(role);
        }
        if let Some(status) = changes.status {
            q = q.bind(status);
        }

        q.fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn search(&self, query: Option<&str>) -> Result<Vec<Account>, StoreError> {
        let accounts = match search_term(query) {
            Some(term) => {
                let sql = format!(
                    r#"
                    SELECT {}
                    FROM accounts
                    WHERE role <> 'admin'
                      AND (name ILIKE $1 OR email ILIKE $1)
                    ORDER BY created_at DESC
                    "#,
                    ACCOUNT_COLUMNS
                );
                sqlx::query_as::<_, Account>(&sql)
                    .bind(like_pattern(&term))
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM accounts WHERE role <> 'admin' ORDER BY created_at DESC",
                    ACCOUNT_COLUMNS
                );
                sqlx::query_as::<_, Account>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(accounts)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
