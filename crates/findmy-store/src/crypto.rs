//! Record decryption: property-list container decode + AES-256-GCM open.
//!
//! Each record file is a plist array `[nonce, tag, ciphertext]`; the
//! recovered plaintext is itself a plist dictionary of scalar values.

use std::io::Cursor;

use plist::{Dictionary, Value};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};

use findmy_core::{KeyError, RecordError};

/// Size of the decryption key (32 bytes = 256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of the nonce (12 bytes for AES-GCM).
pub const NONCE_SIZE: usize = 12;

/// Size of the authentication tag (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Decryptor for record files, plus the `seal` inverse used by fixtures.
///
/// Pure: no side effects beyond RNG use in `seal`.
pub struct RecordCrypto {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl RecordCrypto {
    /// Create a crypto context over the given record key.
    pub fn new(key: &[u8; KEY_SIZE]) -> Result<Self, KeyError> {
        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| KeyError::Invalid("failed to build AES-256-GCM key".to_string()))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Decrypt one record file's bytes into its key/value payload.
    ///
    /// A failed tag check yields `RecordError::Authentication` and never any
    /// plaintext.
    pub fn open(&self, bytes: &[u8]) -> Result<Dictionary, RecordError> {
        let (nonce_bytes, tag, ciphertext) = decode_container(bytes)?;

        let nonce = Nonce::try_assume_unique_for_key(&nonce_bytes)
            .map_err(|_| RecordError::Format("bad nonce".to_string()))?;

        // ring expects ciphertext followed by the tag
        let mut in_out = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
        in_out.extend_from_slice(&ciphertext);
        in_out.extend_from_slice(&tag);

        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| RecordError::Authentication)?;

        let value =
            Value::from_reader(Cursor::new(&*plaintext)).map_err(|_| RecordError::DecodedFormat)?;
        match value {
            Value::Dictionary(payload) => Ok(payload),
            _ => Err(RecordError::DecodedFormat),
        }
    }

    /// Seal a payload into the on-disk container shape with a random nonce.
    ///
    /// The daemon never writes records; this exists for round-trip checks
    /// and test fixtures.
    pub fn seal(&self, payload: &Dictionary) -> Result<Vec<u8>, RecordError> {
        let mut plaintext = Vec::new();
        Value::Dictionary(payload.clone())
            .to_writer_binary(&mut plaintext)
            .map_err(|e| RecordError::Format(format!("failed to encode payload: {}", e)))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| RecordError::Format("failed to generate nonce".to_string()))?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext;
        self.key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| RecordError::Format("encryption failed".to_string()))?;
        let tag = in_out.split_off(in_out.len() - TAG_SIZE);

        let container = Value::Array(vec![
            Value::Data(nonce_bytes.to_vec()),
            Value::Data(tag),
            Value::Data(in_out),
        ]);
        let mut bytes = Vec::new();
        container
            .to_writer_binary(&mut bytes)
            .map_err(|e| RecordError::Format(format!("failed to encode container: {}", e)))?;
        Ok(bytes)
    }
}

/// Split a container into its nonce, tag, and ciphertext blobs.
///
/// The tracking daemon occasionally appends extra elements; anything past
/// the first three is ignored, but fewer than three is malformed.
fn decode_container(bytes: &[u8]) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>), RecordError> {
    let value = Value::from_reader(Cursor::new(bytes))
        .map_err(|e| RecordError::Format(format!("not a property list: {}", e)))?;
    let Value::Array(items) = value else {
        return Err(RecordError::Format("container is not an array".to_string()));
    };
    if items.len() < 3 {
        return Err(RecordError::Format(format!(
            "expected 3 container elements, got {}",
            items.len()
        )));
    }

    let mut blobs = Vec::with_capacity(3);
    for (index, item) in items.into_iter().take(3).enumerate() {
        match item {
            Value::Data(data) => blobs.push(data),
            _ => {
                return Err(RecordError::Format(format!(
                    "container element {} is not a byte blob",
                    index
                )))
            }
        }
    }
    let ciphertext = blobs.pop().unwrap_or_default();
    let tag = blobs.pop().unwrap_or_default();
    let nonce = blobs.pop().unwrap_or_default();

    if nonce.len() != NONCE_SIZE {
        return Err(RecordError::Format(format!(
            "nonce is {} bytes, expected {}",
            nonce.len(),
            NONCE_SIZE
        )));
    }
    if tag.len() != TAG_SIZE {
        return Err(RecordError::Format(format!(
            "tag is {} bytes, expected {}",
            tag.len(),
            TAG_SIZE
        )));
    }
    Ok((nonce, tag, ciphertext))
}

/// Generate a random record key. Only used by tests and fixtures; the real
/// key is provisioned by the tracking daemon.
pub fn generate_key() -> Result<[u8; KEY_SIZE], KeyError> {
    let rng = SystemRandom::new();
    let mut key = [0u8; KEY_SIZE];
    rng.fill(&mut key)
        .map_err(|_| KeyError::Invalid("failed to generate random key".to_string()))?;
    Ok(key)
}
