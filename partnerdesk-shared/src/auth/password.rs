/// Password hashing with Argon2id
///
/// Hashes are produced in PHC string format, so the algorithm, cost
/// parameters and the random salt travel with the hash. Verification reads the
/// parameters back out of the stored string, which keeps old hashes valid if
/// the cost parameters below are raised later.
///
/// # Parameters
///
/// - **Memory**: 64 MiB
/// - **Iterations**: 3
/// - **Lanes**: 4
/// - **Salt**: 16 random bytes from the OS RNG
///
/// # Example
///
/// ```
/// use partnerdesk_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Str0ng!Pass")?;
/// assert!(verify_password("Str0ng!Pass", &hash)?);
/// assert!(!verify_password("str0ng!pass", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

const MEMORY_COST_KIB: u32 = 65536;
const TIME_COST: u32 = 3;
const PARALLELISM: u32 = 4;
const OUTPUT_LEN: usize = 32;

/// Minimum length accepted by [`validate_password_strength`]
pub const STRONG_PASSWORD_MIN_LEN: usize = 8;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Stored hash is not a valid PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),

    /// Verification failed for a reason other than a wrong password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, Some(OUTPUT_LEN))
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a plaintext password with a fresh random salt
///
/// # Errors
///
/// Returns `PasswordError::HashError` if the hasher rejects the input
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC hash
///
/// The comparison inside Argon2 is constant-time. A wrong password yields
/// `Ok(false)`; only an unusable hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Checks that a user-chosen password is strong enough
///
/// Requires at least 8 characters with an uppercase letter, a lowercase
/// letter, a digit and a symbol.
///
/// ```
/// use partnerdesk_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("Str0ng!Pass").is_ok());
/// assert!(validate_password_strength("password").is_err());
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < STRONG_PASSWORD_MIN_LEN {
        return Err(format!(
            "Password must be at least {} characters long",
            STRONG_PASSWORD_MIN_LEN
        ));
    }

    let checks: [(fn(char) -> bool, &str); 4] = [
        (char::is_uppercase, "an uppercase letter"),
        (char::is_lowercase, "a lowercase letter"),
        (char::is_numeric, "a digit"),
        (|c: char| !c.is_alphanumeric(), "a special character"),
    ];

    for (check, requirement) in checks {
        if !password.chars().any(check) {
            return Err(format!("Password must contain {}", requirement));
        }
    }

    Ok(())
}
