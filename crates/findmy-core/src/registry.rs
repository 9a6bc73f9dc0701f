//! Device registry - the authoritative in-memory device map.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::domain::{
    BeaconRecord, Device, EstimatedLocationRecord, NamingRecord, OwnedBeaconRecord,
    ProductInfoRecord,
};
use crate::event_bus::EventSender;
use crate::DeviceEvent;

/// In-memory map from device identifier to device state.
///
/// All mutation funnels through the four `apply_*` operations, serialized by
/// an internal mutex so every caller observes a single mutation order. Reads
/// return cloned snapshots and may trail an in-flight mutation. Devices are
/// never removed; the registry only grows for the process lifetime.
///
/// On a committed creation or location change the registered event sender is
/// invoked synchronously — after the lock is released but before the apply
/// call returns — so consumers always see an event for already-committed
/// state and can safely read the registry from their own task.
pub struct DeviceRegistry {
    inner: Mutex<Inner>,
    events: EventSender,
}

#[derive(Default)]
struct Inner {
    devices: HashMap<String, Device>,
    /// Identifiers in first-seen order; `devices()` iterates this.
    order: Vec<String>,
}

impl DeviceRegistry {
    /// Create an empty registry emitting events through `events`.
    pub fn new(events: EventSender) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            events,
        }
    }

    /// Apply a parsed record of any kind.
    pub fn apply(&self, record: BeaconRecord) {
        match record {
            BeaconRecord::OwnedBeacon(record) => self.apply_owned_beacon(record),
            BeaconRecord::ProductInfo(record) => self.apply_product_info(record),
            BeaconRecord::Naming(record) => self.apply_naming(record),
            BeaconRecord::EstimatedLocation(record) => self.apply_estimated_location(record),
        }
    }

    /// Apply a pairing record. Creates the device on first sight (emitting
    /// `Created`), refreshes model and pairing date otherwise.
    pub fn apply_owned_beacon(&self, record: OwnedBeaconRecord) {
        let event = {
            let mut inner = self.inner.lock();
            if let Some(device) = inner.devices.get_mut(&record.identifier) {
                device.model = record.model;
                device.pairing_date = record.pairing_date;
                debug!(identifier = %device.identifier, "owned beacon refreshed");
                None
            } else {
                let mut device = Device::new(record.identifier.clone());
                device.model = record.model;
                device.pairing_date = record.pairing_date;
                info!(
                    identifier = %device.identifier,
                    model = device.model.as_deref().unwrap_or(""),
                    "new device registered"
                );
                inner.order.push(record.identifier.clone());
                inner.devices.insert(record.identifier, device.clone());
                Some(DeviceEvent::Created { device })
            }
        };
        if let Some(event) = event {
            self.events.emit(event);
        }
    }

    /// Apply vendor product details. A no-op for unknown devices.
    pub fn apply_product_info(&self, record: ProductInfoRecord) {
        let mut inner = self.inner.lock();
        let Some(device) = inner.devices.get_mut(&record.identifier) else {
            debug!(identifier = %record.identifier, "product info for unknown device, dropped");
            return;
        };
        device.manufacturer_name = record.manufacturer_name;
        device.model_name = record.model_name;
        device.version = record.version;
        debug!(identifier = %device.identifier, "product info updated");
    }

    /// Apply a user-assigned name/emoji. A no-op for unknown devices.
    pub fn apply_naming(&self, record: NamingRecord) {
        let mut inner = self.inner.lock();
        let Some(device) = inner.devices.get_mut(&record.associated_beacon) else {
            debug!(identifier = %record.associated_beacon, "naming for unknown device, dropped");
            return;
        };
        device.name = record.name;
        device.emoji = record.emoji;
        debug!(identifier = %device.identifier, label = %device.label(), "device renamed");
    }

    /// Apply a location fix. A no-op for unknown devices, and a no-op (not
    /// an error) when the fix timestamp is not strictly newer than the
    /// current one. A committed fix emits exactly one `LocationUpdated`.
    pub fn apply_estimated_location(&self, record: EstimatedLocationRecord) {
        let event = {
            let mut inner = self.inner.lock();
            let Some(device) = inner.devices.get_mut(&record.associated_beacon) else {
                debug!(identifier = %record.associated_beacon, "location for unknown device, dropped");
                return;
            };
            if let Some(current) = device.timestamp {
                if record.timestamp <= current {
                    debug!(
                        identifier = %device.identifier,
                        fix = %record.timestamp,
                        current = %current,
                        "stale location fix discarded"
                    );
                    return;
                }
            }
            device.latitude = record.latitude;
            device.longitude = record.longitude;
            device.horizontal_accuracy = record.horizontal_accuracy;
            device.timestamp = Some(record.timestamp);
            device.scan_date = record.scan_date;
            info!(
                identifier = %device.identifier,
                label = %device.label(),
                fix = %record.timestamp,
                "location updated"
            );
            DeviceEvent::LocationUpdated {
                device: device.clone(),
            }
        };
        self.events.emit(event);
    }

    /// Look up one device by identifier.
    pub fn get(&self, identifier: &str) -> Option<Device> {
        self.inner.lock().devices.get(identifier).cloned()
    }

    /// All devices, in first-seen order.
    pub fn devices(&self) -> Vec<Device> {
        let inner = self.inner.lock();
        inner
            .order
            .iter()
            .filter_map(|identifier| inner.devices.get(identifier).cloned())
            .collect()
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.inner.lock().devices.len()
    }

    /// Whether no device has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().devices.is_empty()
    }
}
