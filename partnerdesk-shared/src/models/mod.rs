/// Data models for PartnerDesk
///
/// # Models
///
/// - `account`: User, partner and admin accounts (the only persisted entity)
///
/// # Example
///
/// ```
/// use partnerdesk_shared::models::account::{AccountRole, NewAccount};
///
/// let draft = NewAccount::with_email("Ann", "Ann@Example.com", "Str0ng!Pass");
/// assert_eq!(draft.role, AccountRole::Partner);
/// assert!(draft.validate().is_ok());
/// ```

pub mod account;
