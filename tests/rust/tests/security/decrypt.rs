//! Decryption integration tests.
//!
//! These go through real sealed files and full containers; unit tests for
//! the container decoder live in findmy_store::crypto::tests.

use std::io::Cursor;

use plist::{Dictionary, Value};
use pretty_assertions::assert_eq;

use findmy_core::RecordError;
use findmy_store::{generate_key, RecordCrypto, NONCE_SIZE, TAG_SIZE};
use tests::fixtures;

fn crypto() -> RecordCrypto {
    RecordCrypto::new(&generate_key().expect("generate key")).expect("build crypto")
}

/// Pull the container apart into its three blobs.
fn split(bytes: &[u8]) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let Value::Array(items) = Value::from_reader(Cursor::new(bytes)).expect("parse container")
    else {
        panic!("container is not an array");
    };
    let blobs: Vec<Vec<u8>> = items
        .into_iter()
        .map(|item| match item {
            Value::Data(data) => data,
            other => panic!("unexpected element {:?}", other),
        })
        .collect();
    assert_eq!(blobs.len(), 3);
    let mut blobs = blobs.into_iter();
    (
        blobs.next().unwrap(),
        blobs.next().unwrap(),
        blobs.next().unwrap(),
    )
}

fn join(nonce: &[u8], tag: &[u8], ciphertext: &[u8]) -> Vec<u8> {
    let container = Value::Array(vec![
        Value::Data(nonce.to_vec()),
        Value::Data(tag.to_vec()),
        Value::Data(ciphertext.to_vec()),
    ]);
    let mut bytes = Vec::new();
    container.to_writer_binary(&mut bytes).expect("encode container");
    bytes
}

#[test]
fn test_roundtrip_through_a_file() {
    let crypto = crypto();
    let dir = tempfile::tempdir().unwrap();

    let payload = fixtures::owned_beacon("ABCD-1234", "AirTag");
    let path = fixtures::write_sealed(&crypto, dir.path(), "record", &payload);

    let bytes = std::fs::read(path).unwrap();
    let opened = crypto.open(&bytes).unwrap();
    assert_eq!(opened, payload);
}

#[test]
fn test_roundtrip_preserves_heterogeneous_scalars() {
    let crypto = crypto();
    let at = chrono::Utc::now();

    let mut payload = Dictionary::new();
    payload.insert("string".to_string(), Value::String("text".to_string()));
    payload.insert("real".to_string(), Value::Real(3.25));
    payload.insert("integer".to_string(), Value::Integer(42i64.into()));
    payload.insert("blob".to_string(), Value::Data(vec![0xde, 0xad, 0xbe, 0xef]));
    payload.insert("date".to_string(), fixtures::plist_date(at));

    let sealed = crypto.seal(&payload).unwrap();
    let opened = crypto.open(&sealed).unwrap();

    assert_eq!(opened.get("string"), payload.get("string"));
    assert_eq!(opened.get("real"), payload.get("real"));
    assert_eq!(opened.get("integer"), payload.get("integer"));
    assert_eq!(opened.get("blob"), payload.get("blob"));
    assert!(opened.get("date").is_some());
}

#[test]
fn test_every_tag_bit_flip_fails_authentication() {
    let crypto = crypto();
    let sealed = crypto.seal(&fixtures::owned_beacon("ABCD", "AirTag")).unwrap();
    let (nonce, tag, ciphertext) = split(&sealed);
    assert_eq!(nonce.len(), NONCE_SIZE);
    assert_eq!(tag.len(), TAG_SIZE);

    for index in 0..tag.len() {
        for bit in 0..8 {
            let mut tampered = tag.clone();
            tampered[index] ^= 1 << bit;
            let result = crypto.open(&join(&nonce, &tampered, &ciphertext));
            assert!(
                matches!(result, Err(RecordError::Authentication)),
                "tag byte {} bit {} did not fail authentication",
                index,
                bit
            );
        }
    }
}

#[test]
fn test_ciphertext_bit_flips_fail_authentication() {
    let crypto = crypto();
    let sealed = crypto.seal(&fixtures::owned_beacon("ABCD", "AirTag")).unwrap();
    let (nonce, tag, ciphertext) = split(&sealed);

    for index in [0, ciphertext.len() / 2, ciphertext.len() - 1] {
        let mut tampered = ciphertext.clone();
        tampered[index] ^= 0x01;
        let result = crypto.open(&join(&nonce, &tag, &tampered));
        assert!(
            matches!(result, Err(RecordError::Authentication)),
            "ciphertext byte {} did not fail authentication",
            index
        );
    }
}

#[test]
fn test_nonce_flip_fails_authentication() {
    let crypto = crypto();
    let sealed = crypto.seal(&fixtures::owned_beacon("ABCD", "AirTag")).unwrap();
    let (mut nonce, tag, ciphertext) = split(&sealed);

    nonce[0] ^= 0x01;
    let result = crypto.open(&join(&nonce, &tag, &ciphertext));
    assert!(matches!(result, Err(RecordError::Authentication)));
}

#[test]
fn test_wrong_key_never_yields_plaintext() {
    let crypto1 = crypto();
    let crypto2 = crypto();

    let sealed = crypto1.seal(&fixtures::owned_beacon("ABCD", "AirTag")).unwrap();
    let result = crypto2.open(&sealed);
    assert!(matches!(result, Err(RecordError::Authentication)));
}

#[test]
fn test_truncated_container_is_malformed() {
    let crypto = crypto();
    let container = Value::Array(vec![
        Value::Data(vec![0u8; NONCE_SIZE]),
        Value::Data(vec![0u8; TAG_SIZE]),
    ]);
    let mut bytes = Vec::new();
    container.to_writer_binary(&mut bytes).unwrap();

    assert!(matches!(crypto.open(&bytes), Err(RecordError::Format(_))));
}
