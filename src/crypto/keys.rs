//! # Key Management
//!
//! This module handles cryptographic key generation and agreement.
//!
//! ## Key Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY TYPES                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  IdentityKeyPair (Ed25519)                                      │   │
//! │  │  ──────────────────────────                                      │   │
//! │  │                                                                  │   │
//! │  │  Purpose:                                                       │   │
//! │  │  • Long-lived account identity, minted at registration          │   │
//! │  │  • Public half is stored with the account and listable          │   │
//! │  │                                                                  │   │
//! │  │  Format:                                                        │   │
//! │  │  • Private key: 32 bytes (never persisted, zeroized on drop)   │   │
//! │  │  • Public key: 32 bytes (shared freely)                        │   │
//! │  │                                                                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  EphemeralKeyPair (X25519)                                      │   │
//! │  │  ──────────────────────────                                      │   │
//! │  │                                                                  │   │
//! │  │  Purpose:                                                       │   │
//! │  │  • One Diffie-Hellman agreement per message                     │   │
//! │  │  • Generated fresh at send time, dropped after key derivation   │   │
//! │  │                                                                  │   │
//! │  │  Format:                                                        │   │
//! │  │  • Private key: 32 bytes (kept secret, zeroized on drop)       │   │
//! │  │  • Public key: 32 bytes (fed into the peer's agreement)        │   │
//! │  │                                                                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A fresh [`EphemeralKeyPair`] on both sides of every message is what
//! limits the blast radius of any single key: once the pairs are dropped,
//! nothing outside the stored one-time key can reproduce the agreement.

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::ZeroizeOnDrop;

use crate::error::{Error, Result};

/// Size of all key material in bytes (both curves use 32-byte keys)
pub const KEY_LENGTH: usize = 32;

// ============================================================================
// IDENTITY KEYS (Ed25519)
// ============================================================================

/// Ed25519 keypair that anchors an account's identity.
///
/// Minted once at registration. Only the public half is persisted; the
/// private half lives in this struct and is wiped when it drops.
#[derive(Clone, ZeroizeOnDrop)]
pub struct IdentityKeyPair {
    /// Private signing key (zeroized on drop)
    #[zeroize(skip)] // SigningKey zeroizes itself on drop
    signing_key: SigningKey,
}

impl IdentityKeyPair {
    /// Generate a new random identity keypair
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Get the public key bytes (32 bytes)
    pub fn public_bytes(&self) -> [u8; KEY_LENGTH] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Get the verifying (public) key
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl std::fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public", &hex::encode(self.public_bytes()))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// EPHEMERAL KEYS (X25519)
// ============================================================================

/// X25519 keypair used for exactly one key agreement.
///
/// The private half stays inside the struct; callers only ever see the
/// public bytes and the derived shared secret.
#[derive(Clone, ZeroizeOnDrop)]
pub struct EphemeralKeyPair {
    /// Private scalar (zeroized on drop)
    #[zeroize(skip)] // StaticSecret zeroizes itself on drop
    secret: StaticSecret,
}

impl EphemeralKeyPair {
    /// Generate a new random ephemeral keypair
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        Self { secret }
    }

    /// Reconstruct a keypair from raw private key bytes
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self {
            secret: StaticSecret::from(bytes),
        }
    }

    /// Get the public key bytes (32 bytes)
    pub fn public_bytes(&self) -> [u8; KEY_LENGTH] {
        X25519PublicKey::from(&self.secret).to_bytes()
    }

    /// Perform X25519 Diffie-Hellman with a peer's public key.
    ///
    /// Rejects agreements whose output is the all-zero point (identity or
    /// low-order peer keys) so a malicious public key cannot force a
    /// predictable shared secret.
    pub fn diffie_hellman(&self, their_public: &[u8; KEY_LENGTH]) -> Result<[u8; KEY_LENGTH]> {
        let peer = X25519PublicKey::from(*their_public);
        let shared = self.secret.diffie_hellman(&peer);
        if !shared.was_contributory() {
            return Err(Error::KeyAgreementError(
                "Peer public key is a low-order point".to_string(),
            ));
        }
        Ok(shared.to_bytes())
    }
}

impl std::fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public", &hex::encode(self.public_bytes()))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SERDE HELPERS
// ============================================================================

/// Serde helper for 32-byte keys as hex strings
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

// ============================================================================
// TESTS
// ============================================================================
