//! # Key Derivation Functions
//!
//! This module turns a raw X25519 agreement into the one-time AES key
//! that seals a single message.
//!
//! ## Derivation Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 SHARED SECRET → ONE-TIME MESSAGE KEY                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              X25519 SHARED SECRET (32 bytes)                    │   │
//! │  │                                                                 │   │
//! │  │  sender_ephemeral_private × receiver_ephemeral_public           │   │
//! │  │  (both pairs minted fresh for this one message)                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │                                ▼                                        │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HKDF-SHA256                                  │   │
//! │  │                                                                 │   │
//! │  │  HKDF-SHA256(                                                  │   │
//! │  │    ikm  = shared_secret,                                       │   │
//! │  │    salt = optional caller salt,                                │   │
//! │  │    info = "cinder-message-key-v1"                              │   │
//! │  │  )                                                             │   │
//! │  │                                                                 │   │
//! │  │  → 32-byte AES-256-GCM key                                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `info` label gives each purpose its own key space: the same raw
//! agreement expanded under a different label yields an unrelated key, so
//! a key derived for one context can never double as another context's.
//! Labels are versioned so the pipeline can evolve without ambiguity.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::crypto::encryption::{OneTimeKey, KEY_SIZE};
use crate::crypto::keys::EphemeralKeyPair;
use crate::error::{Error, Result};

// ============================================================================
// DOMAIN SEPARATION LABELS
// ============================================================================

/// Versioned HKDF info labels. One label per key purpose.
pub mod domain {
    /// Key that seals a single message payload and its name envelopes
    pub const MESSAGE_KEY: &[u8] = b"cinder-message-key-v1";
}

// ============================================================================
// KEY DERIVATION
// ============================================================================

/// Derive a one-time symmetric key from an X25519 agreement.
///
/// Runs `local_private × peer_public` and expands the shared secret with
/// HKDF-SHA256 under the given `info` label. Both sides of an exchange
/// derive the identical key from mirrored inputs; any change to the salt
/// or label produces an unrelated key.
///
/// The intermediate shared secret is wiped before returning.
pub fn derive_key(
    local: &EphemeralKeyPair,
    peer_public: &[u8; 32],
    salt: Option<&[u8]>,
    info: &[u8],
) -> Result<OneTimeKey> {
    let mut shared = local.diffie_hellman(peer_public)?;

    let hk = Hkdf::<Sha256>::new(salt, &shared);
    let mut okm = [0u8; KEY_SIZE];
    let expanded = hk
        .expand(info, &mut okm)
        .map_err(|e| Error::KeyDerivationFailed(format!("HKDF expand failed: {}", e)));

    shared.zeroize();
    expanded?;

    Ok(OneTimeKey::from_bytes(okm))
}

// ============================================================================
// TESTS
// ============================================================================
