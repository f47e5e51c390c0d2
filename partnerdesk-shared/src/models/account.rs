/// Account model and field validation
///
/// Accounts are the only persisted entity. An account logs in through exactly
/// one path: email + password, phone number (with an external auth id), or it
/// is a pending admin invite that has not been redeemed yet.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE account_role AS ENUM ('partner', 'owner', 'manager', 'admin');
/// CREATE TYPE account_status AS ENUM ('Active', 'Inactive', 'Suspended');
///
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(45) NOT NULL,
///     email TEXT UNIQUE,
///     phone_number TEXT UNIQUE,
///     external_auth_id TEXT UNIQUE,
///     password_hash TEXT,
///     invite_token TEXT,
///     role account_role NOT NULL DEFAULT 'partner',
///     status account_status NOT NULL DEFAULT 'Active',
///     invited_by_admin BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Nullable `UNIQUE` columns give sparse uniqueness: any number of accounts
/// may lack an email or phone number.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::auth::password;

/// Minimum length of a display name (characters)
pub const NAME_MIN_LEN: usize = 3;

/// Maximum length of a display name (characters)
pub const NAME_MAX_LEN: usize = 45;

/// Minimum length of a stored plaintext password before hashing
pub const PASSWORD_MIN_LEN: usize = 6;

/// Account role
///
/// Closed set; unknown strings are rejected when parsing or deserializing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    /// Default, lowest-privilege role
    #[default]
    Partner,

    /// Partner business owner
    Owner,

    /// Partner business manager
    Manager,

    /// Back-office administrator
    Admin,
}

impl AccountRole {
    /// Converts role to its wire/database string
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Partner => "partner",
            AccountRole::Owner => "owner",
            AccountRole::Manager => "manager",
            AccountRole::Admin => "admin",
        }
    }

    /// Whether an admin may hand this role out through an invite
    pub fn is_invitable(&self) -> bool {
        !matches!(self, AccountRole::Admin)
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountRole {
    type Err = ValidationFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "partner" => Ok(AccountRole::Partner),
            "owner" => Ok(AccountRole::Owner),
            "manager" => Ok(AccountRole::Manager),
            "admin" => Ok(AccountRole::Admin),
            other => Err(ValidationFailure::new(
                "role",
                format!("`{}` is not a valid role", other),
            )),
        }
    }
}

/// Account lifecycle status
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "account_status")]
pub enum AccountStatus {
    /// Usable account
    #[default]
    Active,

    /// Admin-invited account waiting for redemption
    Inactive,

    /// Disabled by an admin
    Suspended,
}

impl AccountStatus {
    /// Converts status to its wire/database string
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "Active",
            AccountStatus::Inactive => "Inactive",
            AccountStatus::Suspended => "Suspended",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = ValidationFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(AccountStatus::Active),
            "Inactive" => Ok(AccountStatus::Inactive),
            "Suspended" => Ok(AccountStatus::Suspended),
            other => Err(ValidationFailure::new(
                "status",
                format!("`{}` is not a valid status", other),
            )),
        }
    }
}

/// A single field that failed validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationFailure {
    /// Field name as exposed over the API (camelCase)
    pub field: &'static str,

    /// Human-readable reason
    pub message: String,
}

impl ValidationFailure {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Account record
///
/// `password_hash` and `invite_token` are never serialized.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Database-assigned identifier
    pub id: Uuid,

    /// Display name, 3-45 characters
    pub name: String,

    /// Normalized (trimmed, lowercase) email address
    pub email: Option<String>,

    /// E.164 phone number
    pub phone_number: Option<String>,

    /// Identifier of a third-party phone-auth identity
    pub external_auth_id: Option<String>,

    /// Argon2id hash in PHC format
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    /// Outstanding invite token for accounts awaiting redemption
    #[serde(skip_serializing)]
    pub invite_token: Option<String>,

    pub role: AccountRole,

    pub status: AccountStatus,

    /// True for accounts provisioned through an admin invite
    pub invited_by_admin: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Checks a candidate password against the stored hash
    ///
    /// Returns false when no hash is stored (phone-only or pending invite
    /// accounts) or when the stored hash cannot be parsed.
    pub fn verify_password(&self, candidate: &str) -> bool {
        let Some(hash) = self.password_hash.as_deref() else {
            return false;
        };

        match password::verify_password(candidate, hash) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!(
                    account_id = %self.id,
                    error = %e,
                    "Stored password hash is unusable"
                );
                false
            }
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == AccountRole::Admin
    }

    /// Projection used by admin listings
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Listing projection of an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub role: AccountRole,
    pub created_at: DateTime<Utc>,
}

/// Draft for creating an account
///
/// `password` is plaintext; the store hashes it on persistence and never
/// keeps the plaintext.
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub external_auth_id: Option<String>,
    pub password: Option<String>,
    pub invite_token: Option<String>,
    pub role: AccountRole,
    pub status: AccountStatus,
    pub invited_by_admin: bool,
}

impl NewAccount {
    /// Self-registration with email and password
    pub fn with_email(name: &str, email: &str, password: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            email: Some(normalize_email(email)),
            password: Some(password.to_string()),
            ..Default::default()
        }
    }

    /// Self-registration through third-party phone auth
    pub fn with_phone(name: &str, phone_number: &str, external_auth_id: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            phone_number: Some(phone_number.trim().to_string()),
            external_auth_id: Some(external_auth_id.trim().to_string()),
            ..Default::default()
        }
    }

    /// Pending account created by an admin invite
    pub fn invited(name: &str, email: &str, role: AccountRole, invite_token: String) -> Self {
        Self {
            name: name.trim().to_string(),
            email: Some(normalize_email(email)),
            invite_token: Some(invite_token),
            role,
            status: AccountStatus::Inactive,
            invited_by_admin: true,
            ..Default::default()
        }
    }

    /// Admin account created on first allow-listed admin login
    pub fn bootstrap_admin(email: &str, password: &str) -> Self {
        Self {
            name: "Admin".to_string(),
            email: Some(normalize_email(email)),
            password: Some(password.to_string()),
            role: AccountRole::Admin,
            ..Default::default()
        }
    }

    /// Runs every field validator plus the login-credential requirement
    pub fn validate(&self) -> Result<(), ValidationFailure> {
        validate_name(&self.name)?;

        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(phone) = &self.phone_number {
            validate_phone_number(phone)?;
        }
        if let Some(password) = &self.password {
            validate_stored_password(password)?;
        }

        let has_credential = self.password.is_some()
            || self.external_auth_id.is_some()
            || self.phone_number.is_some()
            || self.invite_token.is_some();
        if !has_credential {
            return Err(ValidationFailure::new("password", "Password is required"));
        }

        Ok(())
    }
}

/// Partial update of an account
///
/// Only `Some` fields are touched. `invite_token: Some(None)` clears the
/// pending invite.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password: Option<String>,
    pub invite_token: Option<Option<String>>,
    pub role: Option<AccountRole>,
    pub status: Option<AccountStatus>,
}

impl AccountUpdate {
    /// Normalizes touched fields in place (trimmed name, lowercase email)
    pub fn normalize(mut self) -> Self {
        self.name = self.name.map(|n| n.trim().to_string());
        self.email = self.email.map(|e| normalize_email(&e));
        self.phone_number = self.phone_number.map(|p| p.trim().to_string());
        self
    }

    /// Re-runs the validators of touched fields only
    pub fn validate(&self) -> Result<(), ValidationFailure> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(phone) = &self.phone_number {
            validate_phone_number(phone)?;
        }
        if let Some(password) = &self.password {
            validate_stored_password(password)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone_number.is_none()
            && self.password.is_none()
            && self.invite_token.is_none()
            && self.role.is_none()
            && self.status.is_none()
    }
}

/// Trims and lowercases an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_name(name: &str) -> Result<(), ValidationFailure> {
    let len = name.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        return Err(ValidationFailure::new(
            "name",
            format!(
                "Name must be between {} and {} characters",
                NAME_MIN_LEN, NAME_MAX_LEN
            ),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationFailure> {
    if !email.validate_email() {
        return Err(ValidationFailure::new("email", "Invalid email"));
    }
    Ok(())
}

/// Checks the international `+<country><number>` format (E.164)
pub fn validate_phone_number(phone: &str) -> Result<(), ValidationFailure> {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    let pattern = PHONE.get_or_init(|| Regex::new(r"^\+[1-9]\d{1,14}$").unwrap());

    if !pattern.is_match(phone) {
        return Err(ValidationFailure::new(
            "phoneNumber",
            "Invalid phone number format.",
        ));
    }
    Ok(())
}

fn validate_stored_password(password: &str) -> Result<(), ValidationFailure> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(ValidationFailure::new(
            "password",
            format!("Password must be at least {} characters", PASSWORD_MIN_LEN),
        ));
    }
    Ok(())
}
