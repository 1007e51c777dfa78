//! # Message Vault
//!
//! One-shot storage for sealed messages: a record is written once, read
//! at most once, and destroyed by the read that wins.
//!
//! ## Consume Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CONSUME PIPELINE                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  consume(message_id, requesting_user)                                   │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  1. Look up row ──────────────── absent ──► NotFound                    │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  2. Parse one-time key ───────── malformed ──► CorruptMessage (intact)  │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  3. Open receiver envelope ───── fails or ──► NotAuthorized (intact)    │
//! │          │                       mismatch                               │
//! │          ▼                                                              │
//! │  4. Open payload ─────────────── fails ──► CorruptMessage (intact)      │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  5. DELETE row ───────────────── 0 rows ──► NotFound (lost the race)    │
//! │          │                                                              │
//! │          ▼                                                              │
//! │     plaintext (row is gone)                                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The conditional DELETE in step 5 is the linearization point. Rows are
//! immutable between insert and delete, so any number of callers can run
//! steps 1-4 against the same snapshot; the row count returned by the
//! DELETE then picks exactly one winner, and every loser reports the same
//! `NotFound` a never-stored id would. Destruction happens only on the
//! success path: unauthorized and corrupt outcomes leave the row in place.

use std::sync::Arc;
use uuid::Uuid;

use crate::crypto::{self, Nonce, OneTimeKey};
use crate::error::{Error, Result};
use crate::storage::Database;

/// Write-once, read-once message store.
#[derive(Clone)]
pub struct MessageVault {
    database: Arc<Database>,
}

impl MessageVault {
    /// Create a vault over the given database
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// Store a sealed message, returning its fresh identifier.
    ///
    /// The row carries everything a later consume needs: payload
    /// ciphertext with its nonce, both sealed name envelopes, and the
    /// one-time key. One INSERT makes the write atomic.
    pub fn store(
        &self,
        sealed_payload: &[u8],
        sealed_sender: &[u8],
        sealed_receiver: &[u8],
        nonce: &Nonce,
        key: &OneTimeKey,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.database.insert_message(
            &id,
            sealed_payload,
            nonce.as_bytes(),
            sealed_sender,
            sealed_receiver,
            key.as_bytes(),
        )?;
        tracing::debug!("Message {} stored", id);
        Ok(id)
    }

    /// Read a message exactly once, destroying it on success.
    ///
    /// Exactly one of N concurrent callers gets the plaintext; the rest
    /// get [`Error::NotFound`], indistinguishable from an id that never
    /// existed.
    pub fn consume(&self, message_id: &str, requesting_user: &str) -> Result<String> {
        let Some(record) = self.database.get_message(message_id)? else {
            return Err(Error::NotFound(format!("message {}", message_id)));
        };

        // A record whose key cannot even be parsed is an integrity fault.
        let key = OneTimeKey::from_slice(&record.key).map_err(|_| Error::CorruptMessage)?;

        // Authorization gate. Failure leaves the record in place: an
        // unauthorized caller must not destroy an undelivered message.
        let receiver = crypto::open_blob(&key, &record.enc_receiver)
            .map_err(|_| Error::NotAuthorized)?;
        if receiver != requesting_user.as_bytes() {
            tracing::warn!("Rejected consume of message {} by wrong receiver", message_id);
            return Err(Error::NotAuthorized);
        }

        // Payload integrity, still ahead of the delete so a faulty record
        // stays inspectable.
        let nonce = Nonce::from_slice(&record.nonce).map_err(|_| Error::CorruptMessage)?;
        let payload = crypto::open(&key, &nonce, &record.ciphertext, None)
            .map_err(|_| Error::CorruptMessage)?;
        let plaintext = String::from_utf8(payload).map_err(|_| Error::CorruptMessage)?;

        // Linearization point: the row count picks one winner among any
        // racing callers.
        if !self.database.delete_message(message_id)? {
            tracing::debug!("Message {} was consumed by a concurrent reader", message_id);
            return Err(Error::NotFound(format!("message {}", message_id)));
        }

        tracing::debug!("Message {} consumed and destroyed", message_id);
        Ok(plaintext)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KEY_SIZE;

    async fn setup() -> (Arc<Database>, MessageVault) {
        let db = Arc::new(Database::open(None).await.unwrap());
        let vault = MessageVault::new(db.clone());
        (db, vault)
    }

    /// Seal a message for `receiver` the way the delivery layer does and
    /// store it, returning the id and the key used.
    fn store_sealed(
        vault: &MessageVault,
        plaintext: &str,
        sender: &str,
        receiver: &str,
    ) -> (String, OneTimeKey) {
        let key = OneTimeKey::from_bytes([42u8; KEY_SIZE]);
        let (nonce, ciphertext) = crypto::seal(&key, plaintext.as_bytes(), None).unwrap();
        let enc_sender = crypto::seal_blob(&key, sender.as_bytes()).unwrap();
        let enc_receiver = crypto::seal_blob(&key, receiver.as_bytes()).unwrap();

        let id = vault
            .store(&ciphertext, &enc_sender, &enc_receiver, &nonce, &key)
            .unwrap();
        (id, key)
    }

    #[tokio::test]
    async fn test_store_and_consume_round_trip() {
        let (db, vault) = setup().await;
        let (id, _) = store_sealed(&vault, "burn after reading", "alice", "bob");

        let plaintext = vault.consume(&id, "bob").unwrap();
        assert_eq!(plaintext, "burn after reading");

        // The winning read destroyed the row.
        assert!(db.get_message(&id).unwrap().is_none());
        let again = vault.consume(&id, "bob");
        assert!(matches!(again, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (_, vault) = setup().await;
        let result = vault.consume("no-such-id", "bob");
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_wrong_user_rejected_and_record_intact() {
        let (db, vault) = setup().await;
        let (id, _) = store_sealed(&vault, "for bob only", "alice", "bob");

        let result = vault.consume(&id, "mallory");
        assert!(matches!(result, Err(Error::NotAuthorized)));

        // The rejected attempt must not have burned the message.
        assert!(db.get_message(&id).unwrap().is_some());
        assert_eq!(vault.consume(&id, "bob").unwrap(), "for bob only");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consumes_have_one_winner() {
        let (_, vault) = setup().await;
        let (id, _) = store_sealed(&vault, "the secret", "alice", "bob");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let vault = vault.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move { vault.consume(&id, "bob") }));
        }

        let mut successes = 0;
        let mut not_found = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(plaintext) => {
                    assert_eq!(plaintext, "the secret");
                    successes += 1;
                }
                Err(Error::NotFound(_)) => not_found += 1,
                Err(other) => panic!("unexpected outcome: {:?}", other),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(not_found, 7);
    }

    #[tokio::test]
    async fn test_malformed_key_is_corrupt_and_intact() {
        let (db, vault) = setup().await;
        db.insert_message("m-bad-key", b"cipher", b"nonce", b"s", b"r", &[0u8; 16])
            .unwrap();

        let result = vault.consume("m-bad-key", "bob");
        assert!(matches!(result, Err(Error::CorruptMessage)));
        assert!(db.get_message("m-bad-key").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_mismatched_payload_key_is_corrupt_and_intact() {
        let (db, vault) = setup().await;

        // Envelopes sealed under the stored key, payload under a different
        // one: authorization passes, payload authentication cannot.
        let stored_key = OneTimeKey::from_bytes([1u8; KEY_SIZE]);
        let other_key = OneTimeKey::from_bytes([2u8; KEY_SIZE]);
        let (nonce, ciphertext) = crypto::seal(&other_key, b"payload", None).unwrap();
        let enc_sender = crypto::seal_blob(&stored_key, b"alice").unwrap();
        let enc_receiver = crypto::seal_blob(&stored_key, b"bob").unwrap();

        let id = vault
            .store(&ciphertext, &enc_sender, &enc_receiver, &nonce, &stored_key)
            .unwrap();

        let result = vault.consume(&id, "bob");
        assert!(matches!(result, Err(Error::CorruptMessage)));
        assert!(db.get_message(&id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_bad_payload_nonce_is_corrupt_and_intact() {
        let (db, vault) = setup().await;

        let key = OneTimeKey::from_bytes([3u8; KEY_SIZE]);
        let enc_sender = crypto::seal_blob(&key, b"alice").unwrap();
        let enc_receiver = crypto::seal_blob(&key, b"bob").unwrap();

        db.insert_message("m-bad-nonce", b"cipher", b"short", &enc_sender, &enc_receiver, key.as_bytes())
            .unwrap();

        let result = vault.consume("m-bad-nonce", "bob");
        assert!(matches!(result, Err(Error::CorruptMessage)));
        assert!(db.get_message("m-bad-nonce").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_non_utf8_payload_is_corrupt_and_intact() {
        let (db, vault) = setup().await;

        let key = OneTimeKey::from_bytes([4u8; KEY_SIZE]);
        let (nonce, ciphertext) = crypto::seal(&key, &[0xFF, 0xFE, 0xFD], None).unwrap();
        let enc_sender = crypto::seal_blob(&key, b"alice").unwrap();
        let enc_receiver = crypto::seal_blob(&key, b"bob").unwrap();

        let id = vault
            .store(&ciphertext, &enc_sender, &enc_receiver, &nonce, &key)
            .unwrap();

        // The payload authenticates but is not text; the fault surfaces
        // before the delete, so the record survives.
        let result = vault.consume(&id, "bob");
        assert!(matches!(result, Err(Error::CorruptMessage)));
        assert!(db.get_message(&id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_garbage_receiver_envelope_is_not_authorized() {
        let (db, vault) = setup().await;

        let key = OneTimeKey::from_bytes([5u8; KEY_SIZE]);
        let (nonce, ciphertext) = crypto::seal(&key, b"payload", None).unwrap();
        let enc_sender = crypto::seal_blob(&key, b"alice").unwrap();

        db.insert_message("m-garbage", &ciphertext, nonce.as_bytes(), &enc_sender, b"not a blob", key.as_bytes())
            .unwrap();

        let result = vault.consume("m-garbage", "bob");
        assert!(matches!(result, Err(Error::NotAuthorized)));
        assert!(db.get_message("m-garbage").unwrap().is_some());
    }
}
