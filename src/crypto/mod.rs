//! # Cryptography Module
//!
//! This module provides all cryptographic primitives used by Cinder Core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 PER-MESSAGE KEY PIPELINE                        │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  Sender Ephemeral (X25519)      Receiver Ephemeral (X25519)    │   │
//! │  │            │                               │                    │   │
//! │  │            └──────────── × ────────────────┘                    │   │
//! │  │                          │                                      │   │
//! │  │                          ▼                                      │   │
//! │  │  ┌─────────────────────────────────────────────────────────┐   │   │
//! │  │  │         Shared Secret (32 bytes, per message)            │   │   │
//! │  │  └─────────────────────────────────────────────────────────┘   │   │
//! │  │                          │                                      │   │
//! │  │                          ▼  HKDF-SHA256                         │   │
//! │  │  ┌─────────────────────────────────────────────────────────┐   │   │
//! │  │  │     One-Time Key ("cinder-message-key-v1")               │   │   │
//! │  │  └─────────────────────────────────────────────────────────┘   │   │
//! │  │                                                                 │   │
//! │  │  Both ephemeral pairs are dropped after derivation. The key    │   │
//! │  │  travels with the stored record and dies with it.              │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 SEALING SCHEME                                  │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  AES-256-GCM                                                   │   │
//! │  │  • 256-bit key                                                 │   │
//! │  │  • 96-bit nonce (random per seal)                              │   │
//! │  │  • 128-bit authentication tag                                  │   │
//! │  │                                                                 │   │
//! │  │  Ciphertext = AES-GCM(key, nonce, plaintext, associated_data) │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices & Rationale
//!
//! | Algorithm | Purpose | Why Chosen |
//! |-----------|---------|------------|
//! | AES-256-GCM | Sealing | Hardware acceleration, AEAD |
//! | X25519 | Key Exchange | Fast ECDH, constant-time dalek impl |
//! | HKDF-SHA256 | Key Derivation | Industry standard, well-analyzed |
//! | Ed25519 | Account Identity | Small keys, widely audited |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: All secret keys are zeroized when dropped
//! 2. **Constant-Time Operations**: Using dalek for constant-time crypto
//! 3. **Secure Random**: Using `rand::rngs::OsRng` for cryptographic randomness
//! 4. **No Key Reuse**: Unique nonces for every seal, one key per message

mod encryption;
mod kdf;
mod keys;

pub use encryption::{
    open, open_blob, seal, seal_blob, Nonce, OneTimeKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE,
};
pub use kdf::{derive_key, domain};
pub use keys::{EphemeralKeyPair, IdentityKeyPair, KEY_LENGTH};

pub(crate) use keys::hex_bytes;
