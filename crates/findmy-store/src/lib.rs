//! FindMy Bridge record-store layer.
//!
//! Reads the encrypted record store written by the system's tracking daemon
//! and feeds the device registry.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  StoreWatcher                        │
//! │        (notify, recursive, create/modify)            │
//! ├──────────────────────────────────────────────────────┤
//! │                 RecordIngestor                       │
//! │     (tree scan / single file → registry apply)       │
//! ├──────────────────────────────────────────────────────┤
//! │            RecordCrypto (AES-256-GCM)                │
//! │     (plist [nonce, tag, ciphertext] container)       │
//! ├──────────────────────────────────────────────────────┤
//! │              KeychainKeyProvider                     │
//! │       (OS keychain, `BeaconStore` label)             │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod crypto;
pub mod ingest;
pub mod keychain;
pub mod layout;
pub mod records;
pub mod watcher;

pub use crypto::{generate_key, RecordCrypto, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use ingest::RecordIngestor;
pub use keychain::{KeyProvider, KeychainKeyProvider, MemoryKeyProvider};
pub use layout::StoreLayout;
pub use records::parse_record;
pub use watcher::StoreWatcher;
