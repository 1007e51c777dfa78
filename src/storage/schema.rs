//! # Database Schema
//!
//! SQL schema definitions for the Cinder database.
//!
//! ## Schema Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DATABASE SCHEMA                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐    ┌─────────────────┐      ┌─────────────────┐    │
//! │  │     users       │    │    sessions     │      │    messages     │    │
//! │  ├─────────────────┤    ├─────────────────┤      ├─────────────────┤    │
//! │  │ id              │◄───│ user_id         │      │ id              │    │
//! │  │ username        │    │ token           │      │ ciphertext      │    │
//! │  │ password_hash   │    │ created_at      │      │ nonce           │    │
//! │  │ public_key      │    └─────────────────┘      │ enc_sender      │    │
//! │  │ created_at      │                             │ enc_receiver    │    │
//! │  └─────────────────┘                             │ key             │    │
//! │                                                  │ created_at      │    │
//! │                                                  └─────────────────┘    │
//! │                                                                         │
//! │  A messages row is self-contained: the one-time key rides with the      │
//! │  sealed columns and the whole row is deleted at consume time. There     │
//! │  are no foreign keys from messages to users; identities only exist      │
//! │  inside the sealed envelopes.                                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL to create all tables
pub const CREATE_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Users table
-- One row per registered account
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    -- Login name, unique across the deployment
    username TEXT NOT NULL UNIQUE,
    -- Argon2id PHC string
    password_hash TEXT NOT NULL,
    -- Ed25519 public identity key (32 bytes)
    public_key BLOB NOT NULL,
    -- When the account was created (Unix timestamp ms)
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_username ON users(username);

-- Sessions table
-- One row per live bearer token
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    -- Opaque bearer token (64 hex chars)
    token TEXT NOT NULL UNIQUE,
    -- Owning account
    user_id INTEGER NOT NULL,
    -- When the token was issued (Unix timestamp ms)
    created_at INTEGER NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_sessions_token ON sessions(token);

-- Messages table
-- One row per undelivered message; the row IS the message, and consuming
-- it deletes the row
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    -- Sealed payload (ciphertext with auth tag)
    ciphertext BLOB NOT NULL,
    -- AES-GCM nonce for the payload (12 bytes)
    nonce BLOB NOT NULL,
    -- Sender name sealed as a self-contained blob (nonce || ciphertext)
    enc_sender BLOB NOT NULL,
    -- Receiver name sealed as a self-contained blob (nonce || ciphertext)
    enc_receiver BLOB NOT NULL,
    -- One-time AES key for this message (32 bytes); secret only while the
    -- row exists, and only from parties without store access
    key BLOB NOT NULL,
    -- When the message was stored (Unix timestamp ms)
    created_at INTEGER NOT NULL
);
"#;
