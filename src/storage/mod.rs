//! # Storage Module
//!
//! SQLite-backed storage for Cinder data.
//!
//! ## Storage Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         STORAGE SYSTEM                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SQLite Database                                                │   │
//! │  │  ───────────────                                                 │   │
//! │  │                                                                 │   │
//! │  │  Tables:                                                       │   │
//! │  │  • users - Accounts with public identity keys                  │   │
//! │  │  • sessions - Live bearer tokens                               │   │
//! │  │  • messages - Sealed one-shot message rows                     │   │
//! │  │                                                                 │   │
//! │  │  Message rows carry only AEAD output plus the one-time key;    │   │
//! │  │  nothing in the row names its sender or receiver in the clear. │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One statement per operation on a single serialized connection keeps the
//! store's atomicity story simple: the row exists in full or not at all,
//! and conditional deletes settle any race over the same row.

mod database;
mod schema;

pub use database::{Database, MessageRecord, SessionRecord, UserRecord};
