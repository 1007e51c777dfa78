//! # Session Module
//!
//! Bearer-token sessions for authenticated callers.
//!
//! ## Token Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SESSION LIFECYCLE                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   login ──► issue() ──► 32 random bytes ──► 64-char hex token          │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                      sessions table row                                 │
//! │                              │                                          │
//! │          ┌───────────────────┼───────────────────┐                      │
//! │          ▼                   ▼                   ▼                      │
//! │     resolve(token)      revoke(token)      TTL elapsed                  │
//! │     → Some(user_id)     → row deleted      → treated as unknown         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tokens are opaque: 256 bits from the OS CSPRNG, hex encoded, carrying
//! no user data. Every token is the same length, so a token's shape says
//! nothing about who holds it. Expiry is optional and lazy: a TTL-expired
//! row is dropped the moment `resolve` touches it, and `purge_expired`
//! sweeps the rest in bulk.
//!
//! Tokens never appear in logs at any level.

use rand::rngs::OsRng;
use rand_core::RngCore;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::storage::Database;

/// Token entropy in bytes (hex encoding doubles the length)
pub const TOKEN_SIZE: usize = 32;

/// Issues, resolves, and revokes bearer tokens.
pub struct SessionManager {
    database: Arc<Database>,
    /// Optional max session age; None means sessions live until revoked
    ttl: Option<Duration>,
}

impl SessionManager {
    /// Create a session manager whose sessions never expire
    pub fn new(database: Arc<Database>) -> Self {
        Self {
            database,
            ttl: None,
        }
    }

    /// Create a session manager whose sessions expire after `ttl`
    pub fn with_ttl(database: Arc<Database>, ttl: Duration) -> Self {
        Self {
            database,
            ttl: Some(ttl),
        }
    }

    /// Issue a fresh token for a user
    pub fn issue(&self, user_id: i64) -> Result<String> {
        let mut bytes = [0u8; TOKEN_SIZE];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| Error::RngFailed)?;
        let token = hex::encode(bytes);

        self.database.insert_session(&token, user_id)?;
        tracing::debug!("Session issued for user {}", user_id);
        Ok(token)
    }

    /// Resolve a token to its user id
    ///
    /// Returns None for unknown, revoked, and expired tokens alike. An
    /// expired row is deleted on the way through, so a dead token cannot
    /// resolve on a later call either.
    pub fn resolve(&self, token: &str) -> Result<Option<i64>> {
        let Some(session) = self.database.get_session_by_token(token)? else {
            return Ok(None);
        };

        if let Some(ttl) = self.ttl {
            let age = crate::time::now_timestamp_millis() - session.created_at;
            if age >= ttl_millis(ttl) {
                self.database.delete_session(token)?;
                tracing::debug!("Expired session dropped for user {}", session.user_id);
                return Ok(None);
            }
        }

        Ok(Some(session.user_id))
    }

    /// Revoke a token
    ///
    /// Idempotent: revoking an unknown or already-revoked token succeeds.
    pub fn revoke(&self, token: &str) -> Result<()> {
        let removed = self.database.delete_session(token)?;
        if removed {
            tracing::debug!("Session revoked");
        }
        Ok(())
    }

    /// Delete every session older than the TTL
    ///
    /// Returns the number of sessions removed. Without a TTL this is a
    /// no-op.
    pub fn purge_expired(&self) -> Result<usize> {
        let Some(ttl) = self.ttl else {
            return Ok(0);
        };
        let cutoff = crate::time::now_timestamp_millis().saturating_sub(ttl_millis(ttl));
        let removed = self.database.delete_expired_sessions(cutoff)?;
        if removed > 0 {
            tracing::info!("Purged {} expired sessions", removed);
        }
        Ok(removed)
    }
}

/// A TTL wider than i64 milliseconds saturates to the maximum age instead
/// of wrapping negative and expiring everything on sight.
fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

// ============================================================================
// TESTS
// ============================================================================
