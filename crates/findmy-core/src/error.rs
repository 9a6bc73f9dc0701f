//! Error taxonomy for the record pipeline and the notification sinks.

use thiserror::Error;

/// Failure decoding or decrypting a single record file.
///
/// Always local to that one file: callers log the error and move on, so one
/// corrupt record never aborts a directory scan.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The on-disk container is not a property-list array of at least three
    /// byte blobs `[nonce, tag, ciphertext]` with the expected blob sizes.
    #[error("malformed record container: {0}")]
    Format(String),

    /// AEAD tag verification failed: wrong key or corrupted data. No
    /// plaintext is ever produced in this case.
    #[error("record authentication failed (wrong key or corrupted data)")]
    Authentication,

    /// The decrypted plaintext is not a string-keyed property-list
    /// dictionary.
    #[error("decrypted record is not a key/value dictionary")]
    DecodedFormat,

    /// The record file could not be read from disk.
    #[error("failed to read record file: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure resolving the record decryption key.
#[derive(Debug, Error)]
pub enum KeyError {
    /// No key material exists under the expected keychain label. Ingestion
    /// stays disabled until the key is provisioned externally.
    #[error("no record decryption key found in the OS keychain")]
    Unavailable,

    /// Key material exists but is unusable (wrong size or encoding), or the
    /// platform keystore rejected the lookup.
    #[error("record decryption key is unusable: {0}")]
    Invalid(String),
}

/// Failure on an outbound notification sink.
///
/// Local to one dispatch attempt: the sink logs it, resets its connection
/// state, and waits for the next event.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Could not establish a connection to the sink.
    #[error("sink connect failed: {0}")]
    Connect(String),

    /// An established connection failed while publishing.
    #[error("sink publish failed: {0}")]
    Publish(String),
}
