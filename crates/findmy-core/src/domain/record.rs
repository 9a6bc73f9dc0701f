//! Record kinds written by the tracking daemon, one encrypted file each.
//!
//! Every kind carries a device identifier; only [`OwnedBeaconRecord`] may
//! create a device, the other three are dropped when the device is unknown.

use chrono::{DateTime, Utc};

/// The four fixed sub-directories of the record store, one per record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordCategory {
    OwnedBeacons,
    ProductInfo,
    Naming,
    EstimatedLocation,
}

impl RecordCategory {
    /// All categories, in bootstrap scan order: identity records first so
    /// attribute and location records find their device already registered.
    pub const ALL: [RecordCategory; 4] = [
        RecordCategory::OwnedBeacons,
        RecordCategory::Naming,
        RecordCategory::ProductInfo,
        RecordCategory::EstimatedLocation,
    ];

    /// The fixed sub-directory name the tracking daemon writes this kind to.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::OwnedBeacons => "OwnedBeacons",
            Self::ProductInfo => "BeaconProductInfoRecord",
            Self::Naming => "BeaconNamingRecord",
            Self::EstimatedLocation => "BeaconEstimatedLocation",
        }
    }
}

/// Pairing record: the only kind allowed to create a device.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedBeaconRecord {
    pub identifier: String,
    pub model: Option<String>,
    pub pairing_date: Option<DateTime<Utc>>,
}

/// Vendor-reported product details.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInfoRecord {
    pub identifier: String,
    pub manufacturer_name: Option<String>,
    pub model_name: Option<String>,
    pub version: Option<String>,
}

/// User-assigned display name and emoji.
#[derive(Debug, Clone, PartialEq)]
pub struct NamingRecord {
    pub associated_beacon: String,
    pub name: Option<String>,
    pub emoji: Option<String>,
}

/// A location fix. Records without a timestamp are dropped at parse time,
/// so the monotonicity guard always has something to compare.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatedLocationRecord {
    pub associated_beacon: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub horizontal_accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub scan_date: Option<DateTime<Utc>>,
}

/// A parsed record of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum BeaconRecord {
    OwnedBeacon(OwnedBeaconRecord),
    ProductInfo(ProductInfoRecord),
    Naming(NamingRecord),
    EstimatedLocation(EstimatedLocationRecord),
}

impl BeaconRecord {
    /// The record kind as a string, for logging.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::OwnedBeacon(_) => "owned_beacon",
            Self::ProductInfo(_) => "product_info",
            Self::Naming(_) => "naming",
            Self::EstimatedLocation(_) => "estimated_location",
        }
    }

    /// The device identifier the record refers to.
    pub fn device_identifier(&self) -> &str {
        match self {
            Self::OwnedBeacon(record) => &record.identifier,
            Self::ProductInfo(record) => &record.identifier,
            Self::Naming(record) => &record.associated_beacon,
            Self::EstimatedLocation(record) => &record.associated_beacon,
        }
    }
}
