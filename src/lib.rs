//! # Cinder Core
//!
//! A self-destructing messaging library: every message is sealed under a
//! key that exists for that message alone, stored until its first
//! successful read, and destroyed by the read that wins.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CINDER CORE MODULES                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────────────────┐    │
//! │  │  Accounts   │  │   Session   │  │          Delivery            │    │
//! │  │             │  │             │  │                              │    │
//! │  │ - Register  │  │ - Issue     │  │ - Ephemeral key agreement    │    │
//! │  │ - Login     │  │ - Resolve   │  │ - Seal payload + envelopes   │    │
//! │  │ - Directory │  │ - Revoke    │  │ - Exactly-once read          │    │
//! │  └──────┬──────┘  └──────┬──────┘  └──────────────┬───────────────┘    │
//! │         │                │                        │                    │
//! │         └────────────────┴────────────┬───────────┘                    │
//! │                                       │                                │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──┴──────────────────────────┐     │
//! │  │   Crypto    │  │   Storage   │  │           Vault             │     │
//! │  │             │  │             │  │                             │     │
//! │  │ - X25519    │  │ - SQLite    │◄─┤ - Atomic store              │     │
//! │  │ - AES-GCM   │  │ - users     │  │ - Linearizable consume      │     │
//! │  │ - HKDF      │  │ - sessions  │  │ - Destroy on first read     │     │
//! │  └─────────────┘  │ - messages  │  └─────────────────────────────┘     │
//! │                   └─────────────┘                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Cryptographic primitives (sealing, key agreement, derivation)
//! - [`credentials`] - Argon2id password hashing
//! - [`storage`] - SQLite persistence (users, sessions, sealed messages)
//! - [`session`] - Bearer-token issuance and validation
//! - [`vault`] - Write-once, read-once message store
//! - [`accounts`] - Registration, login, and the user directory
//! - [`delivery`] - Authenticated send and exactly-once read
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SECURITY LAYERS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Layer 1: Per-Message Sealing (X25519 + HKDF + AES-256-GCM)            │
//! │  ──────────────────────────────────────────────────────────             │
//! │  Each message derives its own 256-bit key from two fresh ephemeral     │
//! │  X25519 pairs. Compromising one message's key reveals nothing about    │
//! │  any other message, past or future.                                    │
//! │                                                                         │
//! │  Layer 2: Sealed Metadata Envelopes                                     │
//! │  ──────────────────────────────────                                     │
//! │  Sender and receiver names are stored only as AEAD blobs under the     │
//! │  same one-time key. A stored row names nobody in the clear.            │
//! │                                                                         │
//! │  Layer 3: Exactly-Once Destruction                                      │
//! │  ─────────────────────────────────                                      │
//! │  The first successful read deletes the row, key included. Later or     │
//! │  racing reads are indistinguishable from reads of an id that never     │
//! │  existed.                                                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod accounts;
pub mod credentials;
pub mod crypto;
pub mod delivery;
pub mod error;
pub mod session;
pub mod storage;
/// Time utilities (Unix-millisecond timestamps).
pub mod time;
pub mod vault;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use accounts::PublicIdentity;
pub use error::{Error, Result};

use std::sync::Arc;
use std::time::Duration;

use accounts::AccountService;
use delivery::DeliveryService;
use session::SessionManager;
use storage::Database;
use vault::MessageVault;

// ============================================================================
// CORE INSTANCE
// ============================================================================

/// Configuration for opening a Cinder Core instance
#[derive(Debug, Clone, Default)]
pub struct CoreConfig {
    /// Database file path; None keeps everything in memory
    pub storage_path: Option<String>,
    /// Session lifetime; None means sessions live until logout
    pub session_ttl: Option<Duration>,
}

/// The main Cinder Core instance that wires all modules together
///
/// ## Lifecycle
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       CINDER CORE LIFECYCLE                             │
/// ├─────────────────────────────────────────────────────────────────────────┤
/// │                                                                         │
/// │  1. Open                                                                │
/// │     ┌─────────────┐                                                    │
/// │     │ CinderCore::│──► Open database (file or memory)                  │
/// │     │ open(config)│──► Apply schema                                    │
/// │     └─────────────┘──► Wire sessions, vault, accounts, delivery        │
/// │            │                                                           │
/// │            ▼                                                           │
/// │  2. Ready for Operations                                               │
/// │     ┌─────────────┐                                                    │
/// │     │   Active    │◄─► register / login / logout                       │
/// │     │   State     │◄─► send / read (exactly once)                      │
/// │     └─────────────┘◄─► whoami / list_recipients                        │
/// │            │                                                           │
/// │            ▼                                                           │
/// │  3. Drop                                                               │
/// │     All handles share the same Arcs; the connection closes when the    │
/// │     last clone goes away.                                              │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// There is no global instance: every `CinderCore` owns its own database
/// handle and services, so two instances in one process never share
/// state. Clones are cheap and share everything with their source.
#[derive(Clone)]
pub struct CinderCore {
    sessions: Arc<SessionManager>,
    accounts: AccountService,
    delivery: DeliveryService,
}

impl CinderCore {
    /// Open a core instance with the given configuration
    ///
    /// ## Example
    ///
    /// ```ignore
    /// use cinder_core::{CinderCore, CoreConfig};
    ///
    /// let core = CinderCore::open(CoreConfig::default()).await?;
    /// core.register("alice", "hunter2!")?;
    /// ```
    pub async fn open(config: CoreConfig) -> Result<Self> {
        tracing::info!("Opening Cinder Core v{}", env!("CARGO_PKG_VERSION"));

        let database = Arc::new(Database::open(config.storage_path.as_deref()).await?);

        let sessions = Arc::new(match config.session_ttl {
            Some(ttl) => SessionManager::with_ttl(database.clone(), ttl),
            None => SessionManager::new(database.clone()),
        });

        let vault = Arc::new(MessageVault::new(database.clone()));
        let accounts = AccountService::new(database.clone(), sessions.clone());
        let delivery = DeliveryService::new(database, sessions.clone(), vault);

        tracing::info!("Cinder Core ready");
        Ok(Self {
            sessions,
            accounts,
            delivery,
        })
    }

    // ========================================================================
    // ACCOUNT OPERATIONS
    // ========================================================================

    /// Register a new account
    pub fn register(&self, username: &str, password: &str) -> Result<()> {
        self.accounts.register(username, password)
    }

    /// Log in and receive a bearer token
    pub fn login(&self, username: &str, password: &str) -> Result<String> {
        self.accounts.login(username, password)
    }

    /// Log out a bearer token (idempotent)
    pub fn logout(&self, token: &str) -> Result<()> {
        self.accounts.logout(token)
    }

    /// Describe the authenticated caller
    pub fn whoami(&self, token: &str) -> Result<PublicIdentity> {
        self.accounts.whoami(token)
    }

    /// List every other username
    pub fn list_recipients(&self, token: &str) -> Result<Vec<String>> {
        self.accounts.list_recipients(token)
    }

    // ========================================================================
    // MESSAGE OPERATIONS
    // ========================================================================

    /// Seal and store a message for exactly one read by `receiver`
    pub fn send(&self, token: &str, receiver: &str, plaintext: &str) -> Result<String> {
        self.delivery.send(token, receiver, plaintext)
    }

    /// Read a message exactly once, destroying it on success
    pub fn read(&self, token: &str, message_id: &str) -> Result<String> {
        self.delivery.read(token, message_id)
    }

    // ========================================================================
    // MAINTENANCE
    // ========================================================================

    /// Sweep sessions that have outlived the configured TTL
    ///
    /// Returns the number removed; a core without a TTL removes nothing.
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        self.sessions.purge_expired()
    }
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Cinder Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns build information for debugging
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        #[cfg(target_os = "macos")]
        target: "macos",
        #[cfg(target_os = "linux")]
        target: "linux",
        #[cfg(target_os = "windows")]
        target: "windows",
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        target: "unknown",
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

/// Build information for debugging
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Crate version
    pub version: &'static str,
    /// Target OS
    pub target: &'static str,
    /// Build profile (debug/release)
    pub profile: &'static str,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_core() -> CinderCore {
        CinderCore::open(CoreConfig::default()).await.unwrap()
    }

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_build_info() {
        let info = build_info();
        assert_eq!(info.version, version());
        assert!(!info.target.is_empty());
    }

    #[tokio::test]
    async fn test_full_message_round_trip() {
        let core = open_core().await;
        core.register("alice", "pw-alice").unwrap();
        core.register("bob", "pw-bob").unwrap();

        let alice = core.login("alice", "pw-alice").unwrap();
        let bob = core.login("bob", "pw-bob").unwrap();

        let id = core.send(&alice, "bob", "hello").unwrap();
        assert_eq!(core.read(&bob, &id).unwrap(), "hello");
        assert!(matches!(core.read(&bob, &id), Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_login_leaves_prior_sessions_working() {
        let core = open_core().await;
        core.register("alice", "correct").unwrap();

        let token = core.login("alice", "correct").unwrap();

        let failed = core.login("alice", "wrong");
        assert!(matches!(failed, Err(Error::InvalidCredentials)));

        // No token was issued for the failed attempt and the prior one
        // still resolves.
        assert_eq!(core.whoami(&token).unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_logged_out_token_is_unauthenticated_not_not_found() {
        let core = open_core().await;
        core.register("alice", "pw").unwrap();
        core.register("bob", "pw").unwrap();

        let alice = core.login("alice", "pw").unwrap();
        let bob = core.login("bob", "pw").unwrap();
        let id = core.send(&alice, "bob", "ping").unwrap();

        core.logout(&bob).unwrap();

        // Revoked token: the caller's standing fails, not the message.
        assert!(matches!(core.read(&bob, &id), Err(Error::Unauthenticated)));

        // Valid token, missing message: the opposite outcome.
        let bob = core.login("bob", "pw").unwrap();
        assert!(matches!(
            core.read(&bob, "no-such-id"),
            Err(Error::NotFound(_))
        ));

        // The real message was untouched by all of the above.
        assert_eq!(core.read(&bob, &id).unwrap(), "ping");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reads_through_the_facade() {
        let core = open_core().await;
        core.register("alice", "pw").unwrap();
        core.register("bob", "pw").unwrap();

        let alice = core.login("alice", "pw").unwrap();
        let bob = core.login("bob", "pw").unwrap();
        let id = core.send(&alice, "bob", "only once").unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let core = core.clone();
            let bob = bob.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move { core.read(&bob, &id) }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(text) => {
                    assert_eq!(text, "only once");
                    successes += 1;
                }
                Err(Error::NotFound(_)) => {}
                Err(other) => panic!("unexpected outcome: {:?}", other),
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_session_ttl_via_config() {
        let core = CinderCore::open(CoreConfig {
            storage_path: None,
            session_ttl: Some(Duration::ZERO),
        })
        .await
        .unwrap();

        core.register("alice", "pw").unwrap();
        let token = core.login("alice", "pw").unwrap();

        // With a zero TTL the token is already dead.
        assert!(matches!(core.whoami(&token), Err(Error::Unauthenticated)));
        assert_eq!(core.purge_expired_sessions().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_two_instances_do_not_share_state() {
        let a = open_core().await;
        let b = open_core().await;

        a.register("alice", "pw").unwrap();
        let result = b.login("alice", "pw");
        assert!(matches!(result, Err(Error::InvalidCredentials)));
    }
}
