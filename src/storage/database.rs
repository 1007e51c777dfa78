//! # Database
//!
//! SQLite database wrapper for accounts, sessions, and sealed messages.
//!
//! ## Database Operations
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      DATABASE OPERATIONS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │    Services     │  accounts / session / vault                       │
//! │  └────────┬────────┘                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │    Database     │  High-level API                                   │
//! │  │   (this file)   │  - User accounts                                  │
//! │  │                 │  - Bearer sessions                                │
//! │  │                 │  - Sealed message rows                            │
//! │  └────────┬────────┘                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │    rusqlite     │  SQLite wrapper                                   │
//! │  │                 │  - Prepared statements                            │
//! │  │                 │  - Serialized via one connection                  │
//! │  └────────┬────────┘                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │   SQLite DB     │  Storage                                          │
//! │  │   (file or      │  - In-memory for tests                            │
//! │  │    memory)      │  - File for production                            │
//! │  └─────────────────┘                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All access goes through a single mutex-guarded connection, so every
//! statement is atomic with respect to every other. Deletes report their
//! affected-row count; that count is what lets callers race on a row and
//! have SQLite pick exactly one winner.

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::sync::Arc;

use super::schema;
use crate::error::{Error, Result};

/// The main database handle
///
/// This wraps a SQLite connection and provides high-level methods
/// for storing and retrieving Cinder data.
pub struct Database {
    /// The underlying SQLite connection
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create a database
    ///
    /// If path is None, creates an in-memory database (useful for testing).
    pub async fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| Error::DatabaseError(format!("Failed to open database: {}", e)))?,
            None => Connection::open_in_memory().map_err(|e| {
                Error::DatabaseError(format!("Failed to create in-memory database: {}", e))
            })?,
        };

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        // Initialize schema
        db.init_schema()?;

        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        // Check current schema version
        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .ok();

        match version {
            None => {
                // Fresh database, create all tables
                conn.execute_batch(schema::CREATE_TABLES)
                    .map_err(|e| Error::DatabaseError(format!("Failed to create tables: {}", e)))?;

                // Set schema version
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?)",
                    params![schema::SCHEMA_VERSION],
                )
                .map_err(|e| Error::DatabaseError(format!("Failed to set schema version: {}", e)))?;

                tracing::info!("Database schema created (version {})", schema::SCHEMA_VERSION);
            }
            Some(v) if v == schema::SCHEMA_VERSION => {
                tracing::debug!("Database schema version: {}", v);
            }
            Some(v) => {
                return Err(Error::DatabaseError(format!(
                    "Database schema version {} is newer than supported version {}",
                    v,
                    schema::SCHEMA_VERSION
                )));
            }
        }

        Ok(())
    }

    // ========================================================================
    // USER OPERATIONS
    // ========================================================================

    /// Create a new user account
    ///
    /// Returns the new row id. A username collision surfaces as
    /// [`Error::UsernameTaken`] via the UNIQUE constraint, so two racing
    /// registrations cannot both succeed.
    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        public_key: &[u8; 32],
    ) -> Result<i64> {
        let conn = self.conn.lock();
        let now = crate::time::now_timestamp_millis();

        conn.execute(
            "INSERT INTO users (username, password_hash, public_key, created_at)
             VALUES (?, ?, ?, ?)",
            params![username, password_hash, public_key.as_slice(), now],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::UsernameTaken
            }
            other => Error::DatabaseError(format!("Failed to create user: {}", other)),
        })?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a user by username
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock();

        let result = conn.query_row(
            "SELECT id, username, password_hash, public_key, created_at
             FROM users WHERE username = ?",
            params![username],
            |row| {
                Ok(UserRecord {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    password_hash: row.get(2)?,
                    public_key: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::DatabaseError(format!("Failed to get user: {}", e))),
        }
    }

    /// Get a user by row id
    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock();

        let result = conn.query_row(
            "SELECT id, username, password_hash, public_key, created_at
             FROM users WHERE id = ?",
            params![id],
            |row| {
                Ok(UserRecord {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    password_hash: row.get(2)?,
                    public_key: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::DatabaseError(format!("Failed to get user: {}", e))),
        }
    }

    /// List all usernames except the given one, sorted
    pub fn list_usernames_except(&self, username: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT username FROM users WHERE username != ? ORDER BY username")
            .map_err(|e| Error::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![username], |row| row.get(0))
            .map_err(|e| Error::DatabaseError(format!("Failed to query users: {}", e)))?;

        let mut usernames = Vec::new();
        for row in rows {
            usernames
                .push(row.map_err(|e| Error::DatabaseError(format!("Failed to read row: {}", e)))?);
        }
        Ok(usernames)
    }

    // ========================================================================
    // SESSION OPERATIONS
    // ========================================================================

    /// Insert a new session token for a user
    pub fn insert_session(&self, token: &str, user_id: i64) -> Result<i64> {
        let conn = self.conn.lock();
        let now = crate::time::now_timestamp_millis();

        conn.execute(
            "INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)",
            params![token, user_id, now],
        )
        .map_err(|e| Error::DatabaseError(format!("Failed to insert session: {}", e)))?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a session by its token
    pub fn get_session_by_token(&self, token: &str) -> Result<Option<SessionRecord>> {
        let conn = self.conn.lock();

        let result = conn.query_row(
            "SELECT id, token, user_id, created_at FROM sessions WHERE token = ?",
            params![token],
            |row| {
                Ok(SessionRecord {
                    id: row.get(0)?,
                    token: row.get(1)?,
                    user_id: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::DatabaseError(format!("Failed to get session: {}", e))),
        }
    }

    /// Delete a session by its token
    ///
    /// Returns true if a row was deleted, false if the token was unknown.
    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute("DELETE FROM sessions WHERE token = ?", params![token])
            .map_err(|e| Error::DatabaseError(format!("Failed to delete session: {}", e)))?;
        Ok(rows > 0)
    }

    /// Delete all sessions created at or before the cutoff timestamp
    ///
    /// Returns the number of sessions removed.
    pub fn delete_expired_sessions(&self, cutoff: i64) -> Result<usize> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM sessions WHERE created_at <= ?",
                params![cutoff],
            )
            .map_err(|e| Error::DatabaseError(format!("Failed to delete sessions: {}", e)))?;
        Ok(rows)
    }

    // ========================================================================
    // MESSAGE OPERATIONS
    // ========================================================================

    /// Insert a sealed message row
    ///
    /// The single INSERT is atomic: a reader sees either no row or the
    /// complete row, never a partial one.
    pub fn insert_message(
        &self,
        id: &str,
        ciphertext: &[u8],
        nonce: &[u8],
        enc_sender: &[u8],
        enc_receiver: &[u8],
        key: &[u8],
    ) -> Result<()> {
        let conn = self.conn.lock();
        let now = crate::time::now_timestamp_millis();

        conn.execute(
            "INSERT INTO messages (id, ciphertext, nonce, enc_sender, enc_receiver, key, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![id, ciphertext, nonce, enc_sender, enc_receiver, key, now],
        )
        .map_err(|e| Error::DatabaseError(format!("Failed to insert message: {}", e)))?;

        Ok(())
    }

    /// Get a sealed message row by id
    pub fn get_message(&self, id: &str) -> Result<Option<MessageRecord>> {
        let conn = self.conn.lock();

        let result = conn.query_row(
            "SELECT id, ciphertext, nonce, enc_sender, enc_receiver, key, created_at
             FROM messages WHERE id = ?",
            params![id],
            |row| {
                Ok(MessageRecord {
                    id: row.get(0)?,
                    ciphertext: row.get(1)?,
                    nonce: row.get(2)?,
                    enc_sender: row.get(3)?,
                    enc_receiver: row.get(4)?,
                    key: row.get(5)?,
                    created_at: row.get(6)?,
                })
            },
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::DatabaseError(format!("Failed to get message: {}", e))),
        }
    }

    /// Delete a message row by id
    ///
    /// Returns true if a row was deleted, false if the id was unknown.
    /// When several callers race on the same id, the row count makes
    /// SQLite pick exactly one winner.
    pub fn delete_message(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute("DELETE FROM messages WHERE id = ?", params![id])
            .map_err(|e| Error::DatabaseError(format!("Failed to delete message: {}", e)))?;
        Ok(rows > 0)
    }
}

// ============================================================================
// RECORD TYPES
// ============================================================================

/// A user account row
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Row id
    pub id: i64,
    /// Login name
    pub username: String,
    /// Argon2id PHC string
    pub password_hash: String,
    /// Ed25519 public identity key bytes
    pub public_key: Vec<u8>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

/// A session row
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Row id
    pub id: i64,
    /// Opaque bearer token
    pub token: String,
    /// Owning user row id
    pub user_id: i64,
    /// Issue timestamp (Unix ms)
    pub created_at: i64,
}

/// A sealed message row
#[derive(Debug, Clone)]
pub struct MessageRecord {
    /// Opaque message id
    pub id: String,
    /// Sealed payload (ciphertext with auth tag)
    pub ciphertext: Vec<u8>,
    /// Payload nonce (12 bytes)
    pub nonce: Vec<u8>,
    /// Sealed sender name blob
    pub enc_sender: Vec<u8>,
    /// Sealed receiver name blob
    pub enc_receiver: Vec<u8>,
    /// One-time AES key bytes (32 bytes)
    pub key: Vec<u8>,
    /// Store timestamp (Unix ms)
    pub created_at: i64,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open(None).await.unwrap()
    }

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = test_db().await;
        // Opening twice against the same handle is fine; schema init is
        // idempotent.
        db.init_schema().unwrap();
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = test_db().await;
        let id = db.create_user("alice", "$argon2id$stub", &[3u8; 32]).unwrap();

        let by_name = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(by_name.username, "alice");
        assert_eq!(by_name.password_hash, "$argon2id$stub");
        assert_eq!(by_name.public_key, vec![3u8; 32]);

        let by_id = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        assert!(db.get_user_by_username("bob").unwrap().is_none());
        assert!(db.get_user_by_id(id + 1).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let db = test_db().await;
        db.create_user("alice", "hash1", &[1u8; 32]).unwrap();

        let result = db.create_user("alice", "hash2", &[2u8; 32]);
        assert!(matches!(result, Err(Error::UsernameTaken)));
    }

    #[tokio::test]
    async fn test_list_usernames_except() {
        let db = test_db().await;
        db.create_user("carol", "h", &[1u8; 32]).unwrap();
        db.create_user("alice", "h", &[2u8; 32]).unwrap();
        db.create_user("bob", "h", &[3u8; 32]).unwrap();

        let names = db.list_usernames_except("alice").unwrap();
        assert_eq!(names, vec!["bob".to_string(), "carol".to_string()]);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let db = test_db().await;
        let user_id = db.create_user("alice", "h", &[1u8; 32]).unwrap();

        db.insert_session("token-a", user_id).unwrap();

        let session = db.get_session_by_token("token-a").unwrap().unwrap();
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.token, "token-a");

        assert!(db.delete_session("token-a").unwrap());
        assert!(db.get_session_by_token("token-a").unwrap().is_none());
        assert!(!db.delete_session("token-a").unwrap());
    }

    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let db = test_db().await;
        let user_id = db.create_user("alice", "h", &[1u8; 32]).unwrap();
        db.insert_session("old", user_id).unwrap();
        db.insert_session("older", user_id).unwrap();

        // Everything so far is at or before "now".
        let removed = db
            .delete_expired_sessions(crate::time::now_timestamp_millis())
            .unwrap();
        assert_eq!(removed, 2);
        assert!(db.get_session_by_token("old").unwrap().is_none());

        // A fresh session with a cutoff in the past survives.
        db.insert_session("fresh", user_id).unwrap();
        let removed = db.delete_expired_sessions(0).unwrap();
        assert_eq!(removed, 0);
        assert!(db.get_session_by_token("fresh").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_message_lifecycle() {
        let db = test_db().await;
        db.insert_message("m-1", b"cipher", b"nonce", b"sender", b"receiver", b"key")
            .unwrap();

        let record = db.get_message("m-1").unwrap().unwrap();
        assert_eq!(record.id, "m-1");
        assert_eq!(record.ciphertext, b"cipher");
        assert_eq!(record.nonce, b"nonce");
        assert_eq!(record.enc_sender, b"sender");
        assert_eq!(record.enc_receiver, b"receiver");
        assert_eq!(record.key, b"key");

        assert!(db.delete_message("m-1").unwrap());
        assert!(db.get_message("m-1").unwrap().is_none());
        assert!(!db.delete_message("m-1").unwrap());
    }

    #[tokio::test]
    async fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cinder.db");
        let path_str = path.to_str().unwrap();

        {
            let db = Database::open(Some(path_str)).await.unwrap();
            db.create_user("alice", "hash", &[9u8; 32]).unwrap();
        }

        let db = Database::open(Some(path_str)).await.unwrap();
        let user = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(user.public_key, vec![9u8; 32]);
    }

    #[tokio::test]
    async fn test_newer_schema_version_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cinder.db");
        let path_str = path.to_str().unwrap();

        {
            Database::open(Some(path_str)).await.unwrap();
        }

        // Stamp the file as written by some future release.
        {
            let conn = Connection::open(path_str).unwrap();
            conn.execute("UPDATE schema_version SET version = 99", [])
                .unwrap();
        }

        let result = Database::open(Some(path_str)).await;
        assert!(matches!(
            result,
            Err(Error::DatabaseError(ref msg)) if msg.contains("newer")
        ));
    }
}
