//! Core entities: devices, record kinds, and registry events.

mod device;
mod event;
mod record;

pub use device::Device;
pub use event::DeviceEvent;
pub use record::{
    BeaconRecord, EstimatedLocationRecord, NamingRecord, OwnedBeaconRecord, ProductInfoRecord,
    RecordCategory,
};
