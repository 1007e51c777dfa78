//! # Error Handling
//!
//! This module provides the error types for Cinder Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Account Errors                                                    │
//! │  │   ├── UsernameTaken         - Username already registered           │
//! │  │   └── InvalidCredentials    - Unknown user or wrong password        │
//! │  │                                                                      │
//! │  ├── Session Errors                                                    │
//! │  │   └── Unauthenticated       - Missing, unknown, or expired token    │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── InvalidKeyLength      - Key is not exactly 32 bytes           │
//! │  │   ├── KeyAgreementError     - Peer public key unusable for DH       │
//! │  │   ├── AuthenticationFailed  - AEAD tag or AAD mismatch              │
//! │  │   ├── KeyDerivationFailed   - HKDF expansion failed                 │
//! │  │   └── RngFailed             - OS randomness source failed           │
//! │  │                                                                      │
//! │  └── Vault / Storage Errors                                            │
//! │      ├── NotFound              - Unknown or already-consumed record    │
//! │      ├── NotAuthorized         - Caller is not the sealed receiver     │
//! │      ├── CorruptMessage        - Stored record fails authentication    │
//! │      └── DatabaseError         - SQLite-level failure                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Expected Outcomes vs Faults
//!
//! Callers need to distinguish outcomes that are part of normal protocol
//! operation (a consumed message reads as absent, a revoked token reads as
//! unauthenticated) from genuine faults (a stored record that no longer
//! authenticates, a failing database). [`Error::is_expected`] makes that
//! split explicit so transport layers can map the first group to client
//! responses and treat the second as server-side failures.
//!
//! Two deliberate properties of the taxonomy:
//!
//! - `NotFound` is uniform: a message that never existed and a message that
//!   was already consumed produce the identical error, so probing cannot
//!   reveal delivery history.
//! - No error carries key material or partial plaintext in its payload.

use thiserror::Error;

/// Result type alias for Cinder Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Cinder Core
///
/// All errors are categorized by module/domain to make error handling
/// clearer and to provide meaningful error messages to callers.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Account Errors (100-199)
    // ========================================================================

    /// The requested username is already registered
    #[error("Username already exists.")]
    UsernameTaken,

    /// Unknown username or wrong password
    ///
    /// Deliberately identical for both cases so a login probe cannot tell
    /// which half failed.
    #[error("Invalid credentials.")]
    InvalidCredentials,

    // ========================================================================
    // Session Errors (200-299)
    // ========================================================================

    /// The bearer token is missing, unknown, revoked, or expired
    #[error("Invalid or expired session token.")]
    Unauthenticated,

    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================

    /// A symmetric key had the wrong length (must be exactly 32 bytes)
    #[error("Invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    /// Key agreement failed (peer public key unusable)
    #[error("Key agreement failed: {0}")]
    KeyAgreementError(String),

    /// AEAD authentication failed (tag or associated data mismatch)
    #[error("Authentication failed: ciphertext or associated data rejected")]
    AuthenticationFailed,

    /// Key derivation failed
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// Random number generation failed
    #[error("Random number generation failed")]
    RngFailed,

    // ========================================================================
    // Vault / Storage Errors (400-499)
    // ========================================================================

    /// Record not found
    ///
    /// Covers both "never existed" and "already consumed" with one message,
    /// so the two are indistinguishable from outside.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller authenticated but is not the sealed receiver
    #[error("Not authorized to read this message.")]
    NotAuthorized,

    /// A stored record failed authentication during consume
    ///
    /// Should not occur under correct construction; the record is left in
    /// place so the fault can be inspected.
    #[error("Stored message is corrupt.")]
    CorruptMessage,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the stable numeric code for this error
    ///
    /// Error codes are organized by category:
    /// - 100-199: Accounts
    /// - 200-299: Sessions
    /// - 300-399: Crypto
    /// - 400-499: Vault / storage
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Accounts (100-199)
            Error::UsernameTaken => 100,
            Error::InvalidCredentials => 101,

            // Sessions (200-299)
            Error::Unauthenticated => 200,

            // Crypto (300-399)
            Error::InvalidKeyLength(_) => 300,
            Error::KeyAgreementError(_) => 301,
            Error::AuthenticationFailed => 302,
            Error::KeyDerivationFailed(_) => 303,
            Error::RngFailed => 304,

            // Vault / storage (400-499)
            Error::NotFound(_) => 400,
            Error::NotAuthorized => 401,
            Error::CorruptMessage => 402,
            Error::DatabaseError(_) => 403,

            // Internal (900-999)
            Error::Internal(_) => 900,
        }
    }

    /// Check if this error is an expected protocol outcome
    ///
    /// Expected outcomes are part of normal operation and map cleanly to
    /// client-facing responses. Everything else is a fault: a caller must
    /// not blindly retry a read after one without re-checking state.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Error::UsernameTaken
                | Error::InvalidCredentials
                | Error::Unauthenticated
                | Error::NotFound(_)
                | Error::NotAuthorized
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
