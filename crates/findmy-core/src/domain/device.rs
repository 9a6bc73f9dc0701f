//! Device entity - one tracked beacon and everything known about it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked device, keyed by the opaque identifier its beacon records carry.
///
/// Every attribute other than the identifier is optional until a record
/// populates it. Devices are owned by the registry; reads hand out clones,
/// so holding a `Device` never blocks ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Stable opaque identifier. Case-preserving; display paths uppercase it.
    pub identifier: String,

    // From OwnedBeacon records
    pub model: Option<String>,
    pub pairing_date: Option<DateTime<Utc>>,

    // From ProductInfo records
    pub manufacturer_name: Option<String>,
    pub model_name: Option<String>,
    pub version: Option<String>,

    // From Naming records
    pub name: Option<String>,
    pub emoji: Option<String>,

    // From EstimatedLocation records
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Horizontal accuracy of the last fix, in meters.
    pub horizontal_accuracy: Option<f64>,
    /// Timestamp of the last location fix. Monotonically non-decreasing.
    pub timestamp: Option<DateTime<Utc>>,
    pub scan_date: Option<DateTime<Utc>>,

    /// Battery level, when a record source reports one.
    pub battery: Option<f64>,
}

impl Device {
    /// Create an empty device for `identifier`.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            model: None,
            pairing_date: None,
            manufacturer_name: None,
            model_name: None,
            version: None,
            name: None,
            emoji: None,
            latitude: None,
            longitude: None,
            horizontal_accuracy: None,
            timestamp: None,
            scan_date: None,
            battery: None,
        }
    }

    /// Display label: emoji + name when both are set, else the name, else
    /// the hardware model, else the raw identifier.
    pub fn label(&self) -> String {
        match (&self.emoji, &self.name) {
            (Some(emoji), Some(name)) => format!("{} {}", emoji, name),
            _ => self
                .name
                .clone()
                .or_else(|| self.model.clone())
                .unwrap_or_else(|| self.identifier.clone()),
        }
    }

    /// The identifier uppercased, as used in outbound ids and topics.
    pub fn display_id(&self) -> String {
        self.identifier.to_uppercase()
    }

    /// The device's position, once both coordinates are known.
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some((latitude, longitude)),
            _ => None,
        }
    }
}
