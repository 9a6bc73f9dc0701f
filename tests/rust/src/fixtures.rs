//! Record payload builders and sealed-file helpers.
//!
//! Payload field names match what the tracking daemon writes on disk
//! (`identifier`, `associatedBeacon`, `pairingDate`, ...).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use plist::{Dictionary, Value};

use findmy_store::RecordCrypto;

/// A plist date for the given instant.
pub fn plist_date(at: DateTime<Utc>) -> Value {
    Value::Date(plist::Date::from(SystemTime::from(at)))
}

/// An owned-beacon payload: the record kind that creates devices.
pub fn owned_beacon(identifier: &str, model: &str) -> Dictionary {
    let mut payload = Dictionary::new();
    payload.insert("identifier".to_string(), Value::String(identifier.to_string()));
    payload.insert("model".to_string(), Value::String(model.to_string()));
    payload
}

/// A naming payload with optional emoji.
pub fn naming(beacon: &str, name: &str, emoji: Option<&str>) -> Dictionary {
    let mut payload = Dictionary::new();
    payload.insert("associatedBeacon".to_string(), Value::String(beacon.to_string()));
    payload.insert("name".to_string(), Value::String(name.to_string()));
    if let Some(emoji) = emoji {
        payload.insert("emoji".to_string(), Value::String(emoji.to_string()));
    }
    payload
}

/// A product-info payload.
pub fn product_info(identifier: &str, manufacturer: &str, model_name: &str, version: &str) -> Dictionary {
    let mut payload = Dictionary::new();
    payload.insert("identifier".to_string(), Value::String(identifier.to_string()));
    payload.insert(
        "manufacturerName".to_string(),
        Value::String(manufacturer.to_string()),
    );
    payload.insert("modelName".to_string(), Value::String(model_name.to_string()));
    payload.insert("version".to_string(), Value::String(version.to_string()));
    payload
}

/// An estimated-location payload.
pub fn estimated_location(
    beacon: &str,
    latitude: f64,
    longitude: f64,
    accuracy: Option<f64>,
    at: DateTime<Utc>,
) -> Dictionary {
    let mut payload = Dictionary::new();
    payload.insert("associatedBeacon".to_string(), Value::String(beacon.to_string()));
    payload.insert("latitude".to_string(), Value::Real(latitude));
    payload.insert("longitude".to_string(), Value::Real(longitude));
    if let Some(accuracy) = accuracy {
        payload.insert("horizontalAccuracy".to_string(), Value::Real(accuracy));
    }
    payload.insert("timestamp".to_string(), plist_date(at));
    payload.insert("scanDate".to_string(), plist_date(at));
    payload
}

/// Seal `payload` and write it as a record file under `dir`, creating the
/// directory as needed. Returns the file path.
pub fn write_sealed(crypto: &RecordCrypto, dir: &Path, name: &str, payload: &Dictionary) -> PathBuf {
    fs::create_dir_all(dir).expect("create record directory");
    let bytes = crypto.seal(payload).expect("seal record");
    let path = dir.join(name);
    fs::write(&path, bytes).expect("write record file");
    path
}
