//! Parsing decrypted record payloads into typed record kinds.
//!
//! Field names follow the on-disk dictionaries the tracking daemon writes
//! (`identifier`, `associatedBeacon`, `pairingDate`, ...).

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use plist::{Dictionary, Value};

use findmy_core::{
    BeaconRecord, EstimatedLocationRecord, NamingRecord, OwnedBeaconRecord, ProductInfoRecord,
    RecordCategory,
};

/// Parse a decrypted payload belonging to `category`.
///
/// `None` when the record lacks its identifier field — or, for location
/// records, a timestamp. Such records are dropped silently; the payload
/// carries nothing the registry could act on.
pub fn parse_record(category: RecordCategory, payload: &Dictionary) -> Option<BeaconRecord> {
    match category {
        RecordCategory::OwnedBeacons => Some(BeaconRecord::OwnedBeacon(OwnedBeaconRecord {
            identifier: string(payload, "identifier")?,
            model: string(payload, "model"),
            pairing_date: date(payload, "pairingDate"),
        })),
        RecordCategory::ProductInfo => Some(BeaconRecord::ProductInfo(ProductInfoRecord {
            identifier: string(payload, "identifier")?,
            manufacturer_name: string(payload, "manufacturerName"),
            model_name: string(payload, "modelName"),
            version: string(payload, "version"),
        })),
        RecordCategory::Naming => Some(BeaconRecord::Naming(NamingRecord {
            associated_beacon: string(payload, "associatedBeacon")?,
            name: string(payload, "name"),
            emoji: string(payload, "emoji"),
        })),
        RecordCategory::EstimatedLocation => {
            Some(BeaconRecord::EstimatedLocation(EstimatedLocationRecord {
                associated_beacon: string(payload, "associatedBeacon")?,
                latitude: float(payload, "latitude"),
                longitude: float(payload, "longitude"),
                horizontal_accuracy: float(payload, "horizontalAccuracy"),
                timestamp: date(payload, "timestamp")?,
                scan_date: date(payload, "scanDate"),
            }))
        }
    }
}

fn string(payload: &Dictionary, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(|value| value.as_string())
        .map(|s| s.to_string())
}

fn float(payload: &Dictionary, key: &str) -> Option<f64> {
    match payload.get(key)? {
        Value::Real(value) => Some(*value),
        Value::Integer(value) => value.as_signed().map(|v| v as f64),
        _ => None,
    }
}

fn date(payload: &Dictionary, key: &str) -> Option<DateTime<Utc>> {
    payload
        .get(key)
        .and_then(|value| value.as_date())
        .map(|date| DateTime::<Utc>::from(SystemTime::from(date)))
}
