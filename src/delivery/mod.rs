//! # Delivery Module
//!
//! Orchestrates the send and read halves of the one-shot message protocol.
//!
//! ## Send Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SEND PIPELINE                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  send(token, receiver, plaintext)                                       │
//! │      │                                                                  │
//! │      ├── resolve token ──────────── unknown ──► Unauthenticated         │
//! │      ├── look up receiver ───────── unknown ──► NotFound                │
//! │      │                                                                  │
//! │      ├── mint TWO ephemeral X25519 pairs (this message only)            │
//! │      ├── derive one-time key  (sender_priv × receiver_pub, HKDF)        │
//! │      │                                                                  │
//! │      ├── seal plaintext           (own nonce, stored beside it)         │
//! │      ├── seal sender username     (self-contained blob)                 │
//! │      ├── seal receiver username   (self-contained blob)                 │
//! │      │                                                                  │
//! │      └── vault.store(...) ──► message_id                                │
//! │                                                                         │
//! │  Both ephemeral pairs are dropped before send returns. From then on     │
//! │  the stored one-time key is the only way to open any of the three       │
//! │  sealed values, and it dies with the row.                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `read` is a thin authenticated shim over the vault: it maps the bearer
//! token to a username and lets `consume` decide everything else. An
//! unusable token fails as [`Error::Unauthenticated`] before the vault is
//! touched, so a logged-out caller learns nothing about whether a message
//! id exists.

use std::sync::Arc;

use crate::crypto::{self, domain, EphemeralKeyPair};
use crate::error::{Error, Result};
use crate::session::SessionManager;
use crate::storage::{Database, UserRecord};
use crate::vault::MessageVault;

/// Authenticated send and read operations.
#[derive(Clone)]
pub struct DeliveryService {
    database: Arc<Database>,
    sessions: Arc<SessionManager>,
    vault: Arc<MessageVault>,
}

impl DeliveryService {
    /// Create a delivery service over the given collaborators
    pub fn new(
        database: Arc<Database>,
        sessions: Arc<SessionManager>,
        vault: Arc<MessageVault>,
    ) -> Self {
        Self {
            database,
            sessions,
            vault,
        }
    }

    /// Seal a message for `receiver` and store it for exactly one read.
    ///
    /// Returns the fresh message id. Each call derives its own one-time
    /// key from two fresh ephemeral pairs; no key material is shared
    /// between messages.
    pub fn send(&self, token: &str, receiver: &str, plaintext: &str) -> Result<String> {
        let sender = self.current_user(token)?;

        if self.database.get_user_by_username(receiver)?.is_none() {
            return Err(Error::NotFound(format!("user {}", receiver)));
        }

        let sender_ephemeral = EphemeralKeyPair::generate();
        let receiver_ephemeral = EphemeralKeyPair::generate();
        let key = crypto::derive_key(
            &sender_ephemeral,
            &receiver_ephemeral.public_bytes(),
            None,
            domain::MESSAGE_KEY,
        )?;

        let (nonce, ciphertext) = crypto::seal(&key, plaintext.as_bytes(), None)?;
        let enc_sender = crypto::seal_blob(&key, sender.username.as_bytes())?;
        let enc_receiver = crypto::seal_blob(&key, receiver.as_bytes())?;

        // Both ephemeral pairs fall out of scope at the end of this call;
        // after that only the stored key can open this message.
        let id = self
            .vault
            .store(&ciphertext, &enc_sender, &enc_receiver, &nonce, &key)?;

        tracing::info!("Message {} accepted for delivery", id);
        Ok(id)
    }

    /// Read a message exactly once as the authenticated caller.
    ///
    /// Vault outcomes pass through unchanged: `NotFound` for missing or
    /// already-consumed ids, `NotAuthorized` when the caller is not the
    /// sealed receiver.
    pub fn read(&self, token: &str, message_id: &str) -> Result<String> {
        let user = self.current_user(token)?;
        self.vault.consume(message_id, &user.username)
    }

    /// Resolve a token to its full user record.
    fn current_user(&self, token: &str) -> Result<UserRecord> {
        let Some(user_id) = self.sessions.resolve(token)? else {
            return Err(Error::Unauthenticated);
        };
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
    use crate::accounts::AccountService;

    struct Fixture {
        database: Arc<Database>,
        accounts: AccountService,
        delivery: DeliveryService,
    }

    async fn setup() -> Fixture {
        let database = Arc::new(Database::open(None).await.unwrap());
        let sessions = Arc::new(SessionManager::new(database.clone()));
        let vault = Arc::new(MessageVault::new(database.clone()));
        let accounts = AccountService::new(database.clone(), sessions.clone());
        let delivery = DeliveryService::new(database.clone(), sessions, vault);
        Fixture {
            database,
            accounts,
            delivery,
        }
    }

    fn register_and_login(fixture: &Fixture, username: &str) -> String {
        fixture.accounts.register(username, "password").unwrap();
        fixture.accounts.login(username, "password").unwrap()
    }

    #[tokio::test]
    async fn test_send_and_read_once() {
        let fx = setup().await;
        let alice = register_and_login(&fx, "alice");
        let bob = register_and_login(&fx, "bob");

        let id = fx.delivery.send(&alice, "bob", "hello").unwrap();
        assert_eq!(fx.delivery.read(&bob, &id).unwrap(), "hello");

        // The first read burned it.
        let again = fx.delivery.read(&bob, &id);
        assert!(matches!(again, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_third_party_cannot_read_or_destroy() {
        let fx = setup().await;
        let alice = register_and_login(&fx, "alice");
        let bob = register_and_login(&fx, "bob");
        let charlie = register_and_login(&fx, "charlie");

        let id = fx.delivery.send(&alice, "bob", "for bob").unwrap();

        let intercepted = fx.delivery.read(&charlie, &id);
        assert!(matches!(intercepted, Err(Error::NotAuthorized)));

        // Bob's copy survived the attempt.
        assert_eq!(fx.delivery.read(&bob, &id).unwrap(), "for bob");
    }

    #[tokio::test]
    async fn test_sender_is_not_the_receiver() {
        let fx = setup().await;
        let alice = register_and_login(&fx, "alice");
        register_and_login(&fx, "bob");

        let id = fx.delivery.send(&alice, "bob", "one way only").unwrap();
        let result = fx.delivery.read(&alice, &id);
        assert!(matches!(result, Err(Error::NotAuthorized)));
    }

    #[tokio::test]
    async fn test_send_requires_authentication() {
        let fx = setup().await;
        register_and_login(&fx, "bob");

        let result = fx.delivery.send("bad-token", "bob", "hi");
        assert!(matches!(result, Err(Error::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_send_to_unknown_receiver() {
        let fx = setup().await;
        let alice = register_and_login(&fx, "alice");

        let result = fx.delivery.send(&alice, "nobody", "hi");
        match result {
            Err(Error::NotFound(what)) => assert!(what.contains("user")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_logged_out_reader_is_unauthenticated_not_not_found() {
        let fx = setup().await;
        let alice = register_and_login(&fx, "alice");
        let bob = register_and_login(&fx, "bob");

        let id = fx.delivery.send(&alice, "bob", "still here").unwrap();

        fx.accounts.logout(&bob).unwrap();
        let result = fx.delivery.read(&bob, &id);
        assert!(matches!(result, Err(Error::Unauthenticated)));

        // The failed attempt said nothing about the message and left it
        // intact.
        let bob_again = fx.accounts.login("bob", "password").unwrap();
        assert_eq!(fx.delivery.read(&bob_again, &id).unwrap(), "still here");
    }

    #[tokio::test]
    async fn test_every_send_uses_a_fresh_key() {
        let fx = setup().await;
        let alice = register_and_login(&fx, "alice");
        register_and_login(&fx, "bob");

        let id1 = fx.delivery.send(&alice, "bob", "same text").unwrap();
        let id2 = fx.delivery.send(&alice, "bob", "same text").unwrap();

        let r1 = fx.database.get_message(&id1).unwrap().unwrap();
        let r2 = fx.database.get_message(&id2).unwrap().unwrap();
        assert_ne!(r1.key, r2.key);
        assert_ne!(r1.nonce, r2.nonce);
        assert_ne!(r1.ciphertext, r2.ciphertext);
    }
}
