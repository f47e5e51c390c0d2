//! # PartnerDesk Shared Library
//!
//! This crate contains the account model, credential store, token service,
//! request guards and invite lifecycle used by the PartnerDesk API server.
//!
//! ## Module Organization
//!
//! - `models`: Account model, roles, statuses and field validation
//! - `store`: Credential store trait with PostgreSQL and in-memory backends
//! - `auth`: Password hashing, tokens, cookies, guards and admin bootstrap
//! - `invite`: Admin invite issuance and partner redemption
//! - `mail`: Outbound email delivery
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod invite;
pub mod mail;
pub mod models;
pub mod store;

/// Current version of the PartnerDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
