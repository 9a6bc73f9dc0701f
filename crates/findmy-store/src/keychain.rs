//! OS keychain lookup for the record decryption key.
//!
//! The tracking daemon seals records with a symmetric key it keeps in the
//! platform keychain under the `BeaconStore` label. This module only reads
//! that key — provisioning is entirely outside this system — and caches it
//! for the process lifetime.

use keyring::Entry;
use parking_lot::Mutex;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use findmy_core::KeyError;

use crate::crypto::KEY_SIZE;

/// Keychain service the tracking daemon stores the record key under.
pub const KEYCHAIN_SERVICE: &str = "BeaconStore";

/// Key name for the record decryption key.
const RECORD_KEY_NAME: &str = "beacon-record-key";

/// Source of the record decryption key.
///
/// Implementations resolve the key lazily on first use and cache it for the
/// process lifetime; the key is never created or refreshed here.
pub trait KeyProvider: Send + Sync {
    /// Get the record key, resolving it on first use.
    fn record_key(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>, KeyError>;
}

/// Key provider backed by the platform's native secure storage:
/// Keychain on macOS, Credential Manager on Windows, Secret Service on Linux.
pub struct KeychainKeyProvider {
    entry: Entry,
    cached: Mutex<Option<Zeroizing<[u8; KEY_SIZE]>>>,
}

impl KeychainKeyProvider {
    /// Create a provider for the standard `BeaconStore` entry.
    pub fn new() -> Result<Self, KeyError> {
        Self::with_names(KEYCHAIN_SERVICE, RECORD_KEY_NAME)
    }

    /// Create with custom names (for tests against a scratch keychain).
    pub fn with_names(service: &str, key_name: &str) -> Result<Self, KeyError> {
        let entry = Entry::new(service, key_name)
            .map_err(|e| KeyError::Invalid(format!("failed to open keychain entry: {}", e)))?;
        Ok(Self {
            entry,
            cached: Mutex::new(None),
        })
    }
}

impl KeyProvider for KeychainKeyProvider {
    fn record_key(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>, KeyError> {
        let mut cached = self.cached.lock();
        if let Some(key) = cached.as_ref() {
            return Ok(key.clone());
        }

        let secret = match self.entry.get_secret() {
            Ok(secret) => Zeroizing::new(secret),
            Err(keyring::Error::NoEntry) => {
                warn!(service = KEYCHAIN_SERVICE, "record key not found in keychain");
                return Err(KeyError::Unavailable);
            }
            Err(e) => {
                warn!(error = %e, "keychain lookup failed");
                return Err(KeyError::Invalid(format!("failed to access keychain: {}", e)));
            }
        };

        let key = decode_key(&secret)?;
        debug!("record key resolved from keychain");
        *cached = Some(key.clone());
        Ok(key)
    }
}

/// Accept raw 32-byte key material or its hex encoding — the form
/// `security find-generic-password -w` prints.
fn decode_key(secret: &[u8]) -> Result<Zeroizing<[u8; KEY_SIZE]>, KeyError> {
    if secret.len() == KEY_SIZE {
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        key.copy_from_slice(secret);
        return Ok(key);
    }
    if secret.len() == KEY_SIZE * 2 {
        if let Ok(decoded) = hex::decode(secret) {
            if decoded.len() == KEY_SIZE {
                let decoded = Zeroizing::new(decoded);
                let mut key = Zeroizing::new([0u8; KEY_SIZE]);
                key.copy_from_slice(&decoded);
                return Ok(key);
            }
        }
    }
    Err(KeyError::Invalid(format!(
        "unexpected key length {} in keychain",
        secret.len()
    )))
}

/// In-memory key provider for tests: a fixed key, or none at all to
/// exercise the key-unavailable path.
pub struct MemoryKeyProvider {
    key: Option<[u8; KEY_SIZE]>,
}

impl MemoryKeyProvider {
    /// Provider that always returns `key`.
    pub fn with_key(key: [u8; KEY_SIZE]) -> Self {
        Self { key: Some(key) }
    }

    /// Provider with no key, simulating an unprovisioned keychain.
    pub fn empty() -> Self {
        Self { key: None }
    }
}

impl KeyProvider for MemoryKeyProvider {
    fn record_key(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>, KeyError> {
        self.key.map(Zeroizing::new).ok_or(KeyError::Unavailable)
    }
}
