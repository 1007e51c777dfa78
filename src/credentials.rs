//! # Credential Hashing
//!
//! Argon2id password hashing for account credentials.
//!
//! Passwords are stored as PHC strings (`$argon2id$v=19$...`), which embed
//! the algorithm, parameters, and salt alongside the hash. Verification
//! reads everything it needs from the stored string, so parameters can be
//! raised later without invalidating existing credentials.
//!
//! Parameters: 64 MiB memory, 3 iterations, 1 lane, 32-byte output.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::error::{Error, Result};

/// Argon2 memory cost in KiB (64 MiB)
const M_COST_KIB: u32 = 64 * 1024;

/// Argon2 iteration count
const T_COST: u32 = 3;

/// Argon2 parallelism (lanes)
const P_COST: u32 = 1;

/// Hash output length in bytes
const OUTPUT_LEN: usize = 32;

fn hasher() -> Result<Argon2<'static>> {
    let params = Params::new(M_COST_KIB, T_COST, P_COST, Some(OUTPUT_LEN))
        .map_err(|e| Error::Internal(format!("Invalid Argon2 parameters: {}", e)))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string.
///
/// A malformed stored hash verifies as false rather than erroring; the
/// caller treats it like any other failed login.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    match hasher() {
        Ok(argon2) => argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
