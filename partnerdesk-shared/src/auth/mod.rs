/// Authentication primitives for PartnerDesk
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength checks
/// - [`jwt`]: session, admin and invite tokens
/// - [`cookie`]: credential cookie names and attributes
/// - [`middleware`]: axum guards that resolve the calling account
/// - [`admin`]: allow-list based admin login and bootstrap
///
/// # Example
///
/// ```
/// use partnerdesk_shared::auth::jwt::{TokenLifetimes, TokenService};
/// use partnerdesk_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Str0ng!Pass")?;
/// assert!(verify_password("Str0ng!Pass", &hash)?);
///
/// let tokens = TokenService::new("a-secret-of-at-least-32-bytes-long", TokenLifetimes::default());
/// let invite = tokens.issue_invite("bob@x.com", "Bob", Default::default())?;
/// assert_eq!(tokens.verify_invite(&invite)?.email, "bob@x.com");
/// # Ok(())
/// # }
/// ```

pub mod admin;
pub mod cookie;
pub mod jwt;
pub mod middleware;
pub mod password;
