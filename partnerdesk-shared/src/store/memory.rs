/// In-memory account store
///
/// Keeps accounts in a map behind a `tokio::sync::RwLock`. Uniqueness checks
/// and the insert/update that follows happen under the same write guard, so
/// two racing creates for one email produce exactly one account and one
/// `DuplicateKey`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{prepare_draft, prepare_update, search_term, AccountStore, StoreError, UniqueField};
use crate::models::account::{normalize_email, Account, AccountRole, AccountUpdate, NewAccount};

#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

/// First unique field of `candidate` already held by an account other than `skip`
fn conflicting_field(
    accounts: &HashMap<Uuid, Account>,
    skip: Option<Uuid>,
    email: Option<&str>,
    phone_number: Option<&str>,
    external_auth_id: Option<&str>,
) -> Option<UniqueField> {
    let others = || accounts.values().filter(move |a| Some(a.id) != skip);

    if let Some(email) = email {
        if others().any(|a| a.email.as_deref() == Some(email)) {
            return Some(UniqueField::Email);
        }
    }
    if let Some(phone) = phone_number {
        if others().any(|a| a.phone_number.as_deref() == Some(phone)) {
            return Some(UniqueField::PhoneNumber);
        }
    }
    if let Some(external) = external_auth_id {
        if others().any(|a| a.external_auth_id.as_deref() == Some(external)) {
            return Some(UniqueField::ExternalAuthId);
        }
    }
    None
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create(&self, draft: NewAccount) -> Result<Account, StoreError> {
        let prepared = prepare_draft(draft)?;
        let draft = prepared.draft;

        let mut accounts = self.accounts.write().await;

        if let Some(field) = conflicting_field(
            &accounts,
            None,
            draft.email.as_deref(),
            draft.phone_number.as_deref(),
            draft.external_auth_id.as_deref(),
        ) {
            return Err(StoreError::DuplicateKey(field));
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            name: draft.name,
            email: draft.email,
            phone_number: draft.phone_number,
            external_auth_id: draft.external_auth_id,
            password_hash: prepared.password_hash,
            invite_token: draft.invite_token,
            role: draft.role,
            status: draft.status,
            invited_by_admin: draft.invited_by_admin,
            created_at: now,
            updated_at: now,
        };

        accounts.insert(account.id, account.clone());
        tracing::debug!(account_id = %account.id, "Account created");

        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let email = normalize_email(email);
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.email.as_deref() == Some(email.as_str()))
            .cloned())
    }

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Account>, StoreError> {
        let phone_number = phone_number.trim();
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.phone_number.as_deref() == Some(phone_number))
            .cloned())
    }

    async fn update(&self, id: Uuid, changes: AccountUpdate) -> Result<Account, StoreError> {
        let prepared = prepare_update(changes)?;
        let changes = prepared.changes;

        let mut accounts = self.accounts.write().await;

        if !accounts.contains_key(&id) {
            return Err(StoreError::NotFound);
        }

        if let Some(field) = conflicting_field(
            &accounts,
            Some(id),
            changes.email.as_deref(),
            changes.phone_number.as_deref(),
            None,
        ) {
            return Err(StoreError::DuplicateKey(field));
        }

        let account = accounts.get_mut(&id).ok_or(StoreError::NotFound)?;

        if let Some(name) = changes.name {
            account.name = name;
        }
        if let Some(email) = changes.email {
            account.email = Some(email);
        }
        if let Some(phone) = changes.phone_number {
            account.phone_number = Some(phone);
        }
        if let Some(hash) = prepared.password_hash {
            account.password_hash = Some(hash);
        }
        if let Some(invite_token) = changes.invite_token {
            account.invite_token = invite_token;
        }
        if let Some(role) = changes.role {
            account.role = role;
        }
        if let Some(status) = changes.status {
            account.status = status;
        }
        account.updated_at = Utc::now();

        Ok(account.clone())
    }

    async fn search(&self, query: Option<&str>) -> Result<Vec<Account>, StoreError> {
        let term = search_term(query);

        let mut matches: Vec<Account> = self
            .accounts
            .read()
            .await
            .values()
            .filter(|a| a.role != AccountRole::Admin)
            .filter(|a| match &term {
                None => true,
                Some(term) => {
                    a.name.to_lowercase().contains(term.as_str())
                        || a.email
                            .as_deref()
                            .is_some_and(|e| e.contains(term.as_str()))
                }
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
