//! # Accounts Module
//!
//! Registration, login, and the authenticated views of the user directory.
//!
//! ## Account Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ACCOUNT LIFECYCLE                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  register(username, password)                                           │
//! │      │                                                                  │
//! │      ├── Argon2id hash of the password                                  │
//! │      ├── fresh Ed25519 identity keypair                                 │
//! │      │       └── public half stored, private half dropped               │
//! │      └── users row (UNIQUE username)                                    │
//! │                                                                         │
//! │  login(username, password) ──► verify hash ──► bearer token             │
//! │  logout(token)             ──► revoke (idempotent)                      │
//! │  whoami(token)             ──► username + public identity key           │
//! │  list_recipients(token)    ──► every other username                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Login failure is uniform: an unknown username and a wrong password
//! produce the same [`Error::InvalidCredentials`], and neither issues a
//! token. A failed login never disturbs sessions that already exist.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::credentials;
use crate::crypto::{hex_bytes, IdentityKeyPair};
use crate::error::{Error, Result};
use crate::session::SessionManager;
use crate::storage::{Database, UserRecord};

/// The authenticated caller's public view of their own account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicIdentity {
    /// Login name
    pub username: String,
    /// Ed25519 public identity key, hex encoded in transit
    #[serde(with = "hex_bytes")]
    pub public_key: [u8; 32],
}

/// Registration, login, and directory queries.
#[derive(Clone)]
pub struct AccountService {
    database: Arc<Database>,
    sessions: Arc<SessionManager>,
}

impl AccountService {
    /// Create an account service over the given database and sessions
    pub fn new(database: Arc<Database>, sessions: Arc<SessionManager>) -> Self {
        Self { database, sessions }
    }

    /// Register a new account.
    ///
    /// Hashes the password, mints an identity keypair, and stores the
    /// public half. The private half never leaves this function.
    pub fn register(&self, username: &str, password: &str) -> Result<()> {
        // Friendly fast-path; the UNIQUE constraint in create_user is the
        // real guard against racing registrations.
        if self.database.get_user_by_username(username)?.is_some() {
            return Err(Error::UsernameTaken);
        }

        let password_hash = credentials::hash_password(password)?;
        let identity = IdentityKeyPair::generate();

        self.database
            .create_user(username, &password_hash, &identity.public_bytes())?;

        tracing::info!("Account registered: {}", username);
        Ok(())
    }

    /// Log in and receive a fresh bearer token.
    pub fn login(&self, username: &str, password: &str) -> Result<String> {
        let Some(user) = self.database.get_user_by_username(username)? else {
            return Err(Error::InvalidCredentials);
        };

        if !credentials::verify_password(password, &user.password_hash) {
            tracing::warn!("Failed login attempt for {}", username);
            return Err(Error::InvalidCredentials);
        }

        let token = self.sessions.issue(user.id)?;
        tracing::info!("User {} logged in", username);
        Ok(token)
    }

    /// Log out a token.
    ///
    /// Idempotent; an unknown token logs out successfully.
    pub fn logout(&self, token: &str) -> Result<()> {
        self.sessions.revoke(token)
    }

    /// Describe the authenticated caller.
    pub fn whoami(&self, token: &str) -> Result<PublicIdentity> {
        let user = self.current_user(token)?;
        let public_key: [u8; 32] = user
            .public_key
            .as_slice()
            .try_into()
            .map_err(|_| Error::Internal("Stored public key has wrong length".to_string()))?;

        Ok(PublicIdentity {
            username: user.username,
            public_key,
        })
    }

    /// List every username except the caller's own.
    pub fn list_recipients(&self, token: &str) -> Result<Vec<String>> {
        let user = self.current_user(token)?;
        self.database.list_usernames_except(&user.username)
    }

    /// Resolve a token to its full user record.
    fn current_user(&self, token: &str) -> Result<UserRecord> {
        let Some(user_id) = self.sessions.resolve(token)? else {
            return Err(Error::Unauthenticated);
        };
        // A session outliving its user row reads as unauthenticated too.
        self.database
            .get_user_by_id(user_id)?
            .ok_or(Error::Unauthenticated)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> AccountService {
        let db = Arc::new(Database::open(None).await.unwrap());
        let sessions = Arc::new(SessionManager::new(db.clone()));
        AccountService::new(db, sessions)
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let accounts = setup().await;
        accounts.register("alice", "hunter2!").unwrap();

        let token = accounts.login("alice", "hunter2!").unwrap();
        let identity = accounts.whoami(&token).unwrap();
        assert_eq!(identity.username, "alice");
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let accounts = setup().await;
        accounts.register("alice", "pw-one").unwrap();

        let result = accounts.register("alice", "pw-two");
        assert!(matches!(result, Err(Error::UsernameTaken)));
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let accounts = setup().await;
        accounts.register("alice", "correct").unwrap();

        let wrong_password = accounts.login("alice", "incorrect");
        assert!(matches!(wrong_password, Err(Error::InvalidCredentials)));

        let unknown_user = accounts.login("nobody", "correct");
        assert!(matches!(unknown_user, Err(Error::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_failed_login_leaves_existing_sessions_alone() {
        let accounts = setup().await;
        accounts.register("alice", "correct").unwrap();

        let token = accounts.login("alice", "correct").unwrap();
        assert!(accounts.login("alice", "incorrect").is_err());

        // The earlier token still works.
        assert_eq!(accounts.whoami(&token).unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_logout_revokes_and_is_idempotent() {
        let accounts = setup().await;
        accounts.register("alice", "pw").unwrap();
        let token = accounts.login("alice", "pw").unwrap();

        accounts.logout(&token).unwrap();
        let result = accounts.whoami(&token);
        assert!(matches!(result, Err(Error::Unauthenticated)));

        accounts.logout(&token).unwrap();
        accounts.logout("never-issued").unwrap();
    }

    #[tokio::test]
    async fn test_whoami_requires_valid_token() {
        let accounts = setup().await;
        let result = accounts.whoami("garbage");
        assert!(matches!(result, Err(Error::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_identity_serializes_with_hex_key() {
        let accounts = setup().await;
        accounts.register("alice", "pw").unwrap();
        let token = accounts.login("alice", "pw").unwrap();

        let identity = accounts.whoami(&token).unwrap();
        let json = serde_json::to_value(&identity).unwrap();
        let key_hex = json["public_key"].as_str().unwrap();
        assert_eq!(key_hex.len(), 64);
        assert_eq!(hex::decode(key_hex).unwrap(), identity.public_key);
    }

    #[tokio::test]
    async fn test_list_recipients_excludes_self() {
        let accounts = setup().await;
        accounts.register("carol", "pw").unwrap();
        accounts.register("alice", "pw").unwrap();
        accounts.register("bob", "pw").unwrap();

        let token = accounts.login("alice", "pw").unwrap();
        let names = accounts.list_recipients(&token).unwrap();
        assert_eq!(names, vec!["bob".to_string(), "carol".to_string()]);
    }
}
