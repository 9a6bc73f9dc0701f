//! Record ingestion: walk the store (or react to one changed file), decrypt,
//! parse, and route into the device registry.
//!
//! Per-file failures are swallowed after logging — one corrupt record never
//! aborts a scan. A missing decryption key is the one fatal condition:
//! nothing is processed until it is provisioned.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use findmy_core::{DeviceRegistry, KeyError, RecordCategory};

use crate::crypto::RecordCrypto;
use crate::keychain::KeyProvider;
use crate::layout::StoreLayout;
use crate::records::parse_record;

/// Decrypts record files and applies them to the registry.
///
/// The decryption key is resolved lazily on first use and the crypto context
/// is kept for the process lifetime.
pub struct RecordIngestor {
    layout: StoreLayout,
    keys: Arc<dyn KeyProvider>,
    registry: Arc<DeviceRegistry>,
    crypto: Mutex<Option<RecordCrypto>>,
}

impl RecordIngestor {
    pub fn new(
        layout: StoreLayout,
        keys: Arc<dyn KeyProvider>,
        registry: Arc<DeviceRegistry>,
    ) -> Self {
        Self {
            layout,
            keys,
            registry,
            crypto: Mutex::new(None),
        }
    }

    /// Full-tree bootstrap scan, one pass per category in identity-first
    /// order. Fails only when the decryption key is unavailable; the caller
    /// must not start the incremental mode in that case.
    pub fn bootstrap(&self) -> Result<(), KeyError> {
        self.ensure_crypto()?;
        for category in RecordCategory::ALL {
            let dir = self.layout.category_dir(category);
            if !dir.is_dir() {
                debug!(dir = %dir.display(), "category directory missing, skipped");
                continue;
            }
            self.ingest_tree(&dir, category);
        }
        info!(devices = self.registry.len(), "bootstrap scan complete");
        Ok(())
    }

    /// React to one changed path from the watcher. Paths outside the four
    /// category directories are ignored; a path that vanished between the
    /// event and now is ignored too.
    pub fn ingest_path(&self, path: &Path) {
        let Some(category) = self.layout.category_of(path) else {
            debug!(path = %path.display(), "change outside record categories, ignored");
            return;
        };
        if path.is_dir() {
            self.ingest_tree(path, category);
        } else if path.is_file() {
            self.ingest_file(path, category);
        } else {
            debug!(path = %path.display(), "changed path no longer exists, ignored");
        }
    }

    /// Recurse over a directory, ingesting every regular file. Order is not
    /// significant; the registry's merge rules are order-independent.
    fn ingest_tree(&self, dir: &Path, category: RecordCategory) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to read record directory");
                return;
            }
        };
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if path.is_dir() {
                self.ingest_tree(&path, category);
            } else {
                self.ingest_file(&path, category);
            }
        }
    }

    /// Decrypt and apply a single record file. All failures are local to
    /// this file.
    fn ingest_file(&self, path: &Path, category: RecordCategory) {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read record file");
                return;
            }
        };

        let payload = {
            let mut guard = self.crypto.lock();
            if guard.is_none() {
                match self.build_crypto() {
                    Ok(crypto) => *guard = Some(crypto),
                    Err(e) => {
                        warn!(error = %e, "ingestion disabled: record key unavailable");
                        return;
                    }
                }
            }
            let Some(crypto) = guard.as_ref() else {
                return;
            };
            match crypto.open(&bytes) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "dropping unreadable record");
                    return;
                }
            }
        };

        match parse_record(category, &payload) {
            Some(record) => {
                debug!(
                    kind = record.kind_name(),
                    identifier = record.device_identifier(),
                    path = %path.display(),
                    "record ingested"
                );
                self.registry.apply(record);
            }
            None => {
                debug!(path = %path.display(), "record missing required fields, dropped");
            }
        }
    }

    fn ensure_crypto(&self) -> Result<(), KeyError> {
        let mut guard = self.crypto.lock();
        if guard.is_none() {
            *guard = Some(self.build_crypto()?);
        }
        Ok(())
    }

    fn build_crypto(&self) -> Result<RecordCrypto, KeyError> {
        let key = self.keys.record_key()?;
        RecordCrypto::new(&key)
    }
}
