//! Registry events consumed by the notification dispatcher.

use serde::{Deserialize, Serialize};

use super::Device;

/// A committed registry change worth telling the outside world about.
///
/// Events carry a snapshot of the device taken after the mutation committed,
/// so consumers never have to race the registry for state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// A new device appeared: first owned-beacon record for its identifier.
    Created { device: Device },

    /// A device's location fix advanced past the monotonicity guard.
    LocationUpdated { device: Device },
}

impl DeviceEvent {
    /// The event type name as a string, for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::LocationUpdated { .. } => "location_updated",
        }
    }

    /// The device snapshot the event carries.
    pub fn device(&self) -> &Device {
        match self {
            Self::Created { device } | Self::LocationUpdated { device } => device,
        }
    }
}
