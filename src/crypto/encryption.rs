//! # Encryption Module
//!
//! Provides AES-256-GCM sealing for message confidentiality and integrity.
//!
//! ## Sealing Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MESSAGE SEALING FLOW                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SENDER                                                                │
//! │  ─────────────────────────────────────────────────────────────────      │
//! │                                                                         │
//! │  Step 1: Obtain a One-Time Key (fresh per message)                     │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  X25519 agreement + HKDF-SHA256 (see kdf module)             │       │
//! │  │           ↓                                                  │       │
//! │  │  One-Time Key (32 bytes)                                     │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  Step 2: Generate Nonce (unique per seal)                              │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  Random 12 bytes from the OS CSPRNG                          │       │
//! │  │  (Never reuse a nonce with the same key!)                   │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  Step 3: Seal                                                          │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  AES-256-GCM(                                                │       │
//! │  │    key = one_time_key,                                      │       │
//! │  │    nonce = random_nonce,                                    │       │
//! │  │    plaintext = message,                                     │       │
//! │  │    aad = optional binding context                           │       │
//! │  │  )                                                          │       │
//! │  │           ↓                                                  │       │
//! │  │  Ciphertext + 16-byte Auth Tag                              │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  Output: (nonce, ciphertext_with_tag)                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Opening runs the same construction in reverse. Any change to the
//! ciphertext, the tag, the nonce, or the associated data makes the open
//! fail with [`Error::AuthenticationFailed`]; there is no partial output.
//!
//! ## Envelope Blobs
//!
//! For columns that hold a complete sealed value (the sender and receiver
//! name envelopes), [`seal_blob`] and [`open_blob`] bundle the nonce with
//! the ciphertext as `nonce || ciphertext` so a single BLOB is
//! self-contained. The message payload keeps its nonce in a separate
//! column instead, matching the (nonce, ciphertext) pair that [`seal`]
//! returns.
//!
//! ## Security Properties
//!
//! - **Confidentiality**: AES-256 in GCM mode
//! - **Integrity**: 16-byte polynomial MAC over ciphertext and AAD
//! - **Nonce hygiene**: every seal draws a fresh random nonce; callers
//!   never pick nonces
//! - **Key hygiene**: [`OneTimeKey`] zeroizes its bytes on drop

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm,
};
use rand::rngs::OsRng;
use rand_core::RngCore;
use zeroize::ZeroizeOnDrop;

use crate::error::{Error, Result};

// ============================================================================
// CONSTANTS
// ============================================================================

/// AES-GCM nonce size in bytes (96 bits, the recommended GCM nonce length)
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes (appended to the ciphertext)
pub const TAG_SIZE: usize = 16;

/// Symmetric key size in bytes (AES-256)
pub const KEY_SIZE: usize = 32;

// ============================================================================
// NONCE
// ============================================================================

/// A 96-bit AES-GCM nonce.
///
/// Uniqueness per key is what keeps GCM safe; [`Nonce::random`] is the only
/// production constructor, so every sealed value gets a fresh one. Nonces
/// persist as raw bytes and come back through [`Nonce::from_slice`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a random nonce from the OS CSPRNG
    pub fn random() -> Result<Self> {
        let mut bytes = [0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| Error::RngFailed)?;
        Ok(Self(bytes))
    }

    /// Construct a nonce from raw bytes (for values read back from storage)
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Construct a nonce from a slice, checking the length
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; NONCE_SIZE] = bytes
            .try_into()
            .map_err(|_| Error::AuthenticationFailed)?;
        Ok(Self(arr))
    }

    /// Access the raw nonce bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

// ============================================================================
// ONE-TIME KEY
// ============================================================================

/// A 256-bit symmetric key used to seal exactly one value.
///
/// The bytes are wiped when the key is dropped. Keys are produced by the
/// kdf module (one per message) and parsed back from storage during
/// consume; they are never logged or serialized as text.
#[derive(Clone, ZeroizeOnDrop)]
pub struct OneTimeKey([u8; KEY_SIZE]);

impl OneTimeKey {
    /// Construct a key from exactly [`KEY_SIZE`] bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Construct a key from a slice, rejecting any length other than 32
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| Error::InvalidKeyLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Access the raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for OneTimeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key bytes must never reach logs.
        write!(f, "OneTimeKey(..)")
    }
}

// ============================================================================
// SEAL / OPEN
// ============================================================================

/// Seal a plaintext under a one-time key.
///
/// Draws a fresh random nonce, then encrypts with AES-256-GCM. The
/// optional `aad` is authenticated but not encrypted; an open with
/// different associated data fails.
///
/// Returns the nonce and the ciphertext (auth tag appended).
pub fn seal(key: &OneTimeKey, plaintext: &[u8], aad: Option<&[u8]>) -> Result<(Nonce, Vec<u8>)> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| Error::Internal(format!("Failed to initialize cipher: {}", e)))?;

    let nonce = Nonce::random()?;

    let payload = Payload {
        msg: plaintext,
        aad: aad.unwrap_or(&[]),
    };

    let ciphertext = cipher
        .encrypt(aes_gcm::Nonce::from_slice(nonce.as_bytes()), payload)
        .map_err(|_| Error::Internal("Encryption failed".to_string()))?;

    Ok((nonce, ciphertext))
}

/// Open a sealed value.
///
/// Fails with [`Error::AuthenticationFailed`] if the ciphertext, tag,
/// nonce, or associated data do not match what was sealed. On failure
/// nothing is returned; there is no partial plaintext.
pub fn open(
    key: &OneTimeKey,
    nonce: &Nonce,
    ciphertext: &[u8],
    aad: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| Error::Internal(format!("Failed to initialize cipher: {}", e)))?;

    let payload = Payload {
        msg: ciphertext,
        aad: aad.unwrap_or(&[]),
    };

    cipher
        .decrypt(aes_gcm::Nonce::from_slice(nonce.as_bytes()), payload)
        .map_err(|_| Error::AuthenticationFailed)
}

// ============================================================================
// SELF-CONTAINED BLOBS
// ============================================================================

/// Seal a plaintext into a single `nonce || ciphertext` blob.
pub fn seal_blob(key: &OneTimeKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let (nonce, ciphertext) = seal(key, plaintext, None)?;
    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(nonce.as_bytes());
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Open a `nonce || ciphertext` blob produced by [`seal_blob`].
///
/// A blob too short to contain a nonce and a tag is rejected the same way
/// as a forged one.
pub fn open_blob(key: &OneTimeKey, blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::AuthenticationFailed);
    }
    let nonce = Nonce::from_slice(&blob[..NONCE_SIZE])?;
    open(key, &nonce, &blob[NONCE_SIZE..], None)
}

// ============================================================================
// TESTS
// ============================================================================
