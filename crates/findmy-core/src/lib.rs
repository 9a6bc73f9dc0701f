//! # FindMy Bridge Core Library
//!
//! Domain model and business rules for the record-ingestion pipeline.
//!
//! ## Modules
//!
//! - `domain` - Core entities (Device, record kinds, registry events)
//! - `error` - Error taxonomy for the pipeline and the notification sinks
//! - `event_bus` - Broadcast channel between the registry and consumers
//! - `registry` - The authoritative in-memory device registry

pub mod domain;
pub mod error;
pub mod event_bus;
pub mod registry;

// Re-export commonly used types
pub use domain::*;
pub use error::{KeyError, RecordError, SinkError};
pub use event_bus::{EventBus, EventReceiver, EventSender};
pub use registry::DeviceRegistry;
