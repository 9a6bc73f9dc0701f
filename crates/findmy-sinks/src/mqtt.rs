//! Home Assistant MQTT sink.
//!
//! One lazily-established broker connection, torn down and recreated when
//! any connection parameter changes or after a failure — recovery always
//! waits for the next event, there is no background reconnect loop. Per
//! device, two retained at-least-once publishes: an MQTT-discovery config
//! document and a state/attributes document.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use findmy_core::{Device, SinkError};

use crate::settings::{MqttParams, MqttSettings};

/// Broker client identifier.
const CLIENT_ID: &str = "FindMyDevices";

/// Discovery prefix + component for Home Assistant device trackers.
const TOPIC_PREFIX: &str = "homeassistant/device_tracker";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// An established broker session. Publishes are retained, at-least-once.
#[async_trait]
pub trait MqttSession: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), SinkError>;

    async fn disconnect(&self);

    /// Whether the connection behind this session is still believed healthy.
    fn is_healthy(&self) -> bool;
}

/// Opens broker sessions. A seam so tests can substitute a fake broker.
#[async_trait]
pub trait MqttConnector: Send + Sync {
    async fn connect(&self, params: &MqttParams) -> Result<Box<dyn MqttSession>, SinkError>;
}

/// The production connector: rumqttc, with the broker handshake awaited
/// before the session is handed out and a background task draining the
/// event loop afterwards.
pub struct RumqttcConnector;

#[async_trait]
impl MqttConnector for RumqttcConnector {
    async fn connect(&self, params: &MqttParams) -> Result<Box<dyn MqttSession>, SinkError> {
        let mut options = MqttOptions::new(CLIENT_ID, params.host.clone(), params.port);
        options.set_keep_alive(KEEP_ALIVE);
        if !params.user.is_empty() {
            options.set_credentials(params.user.clone(), params.password.clone());
        }

        let (client, mut eventloop) = AsyncClient::new(options, 16);

        // Wait for the broker handshake so connect failures surface here,
        // not on the first publish.
        let handshake = tokio::time::timeout(CONNECT_TIMEOUT, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(_) => continue,
                    Err(e) => return Err(SinkError::Connect(e.to_string())),
                }
            }
        })
        .await;
        match handshake {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(SinkError::Connect("broker handshake timed out".to_string())),
        }
        info!(host = %params.host, port = params.port, "connected to MQTT broker");

        // Keep draining the event loop so acks and pings flow. On the first
        // error, flag the session unhealthy and stop; the next event tears
        // the session down and reconnects lazily.
        let healthy = Arc::new(AtomicBool::new(true));
        let task_healthy = healthy.clone();
        let host = params.host.clone();
        let task = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(host = %host, error = %e, "MQTT connection lost");
                        task_healthy.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }
        });

        Ok(Box::new(RumqttcSession {
            client,
            healthy,
            task,
        }))
    }
}

struct RumqttcSession {
    client: AsyncClient,
    healthy: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<()>,
}

#[async_trait]
impl MqttSession for RumqttcSession {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), SinkError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, true, payload)
            .await
            .map_err(|e| SinkError::Publish(e.to_string()))
    }

    async fn disconnect(&self) {
        let _ = self.client.disconnect().await;
        self.task.abort();
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

struct Connection {
    params: MqttParams,
    session: Box<dyn MqttSession>,
}

/// MQTT sink with lazy connect and parameter-change reconnect. The
/// connection handle never leaves this struct.
pub struct MqttSink {
    connector: Box<dyn MqttConnector>,
    connection: Option<Connection>,
}

impl MqttSink {
    pub fn new() -> Self {
        Self::with_connector(Box::new(RumqttcConnector))
    }

    /// Replace the broker connector (tests).
    pub fn with_connector(connector: Box<dyn MqttConnector>) -> Self {
        Self {
            connector,
            connection: None,
        }
    }

    /// Publish the device's discovery and attributes documents. Inactive
    /// configuration or a device without a resolved position is a no-op;
    /// failures log, tear the connection down, and wait for the next event.
    pub async fn notify(&mut self, settings: &MqttSettings, device: &Device) {
        if !settings.is_active() {
            return;
        }
        if device.position().is_none() {
            debug!(identifier = %device.identifier, "no position yet, MQTT skipped");
            return;
        }
        if let Err(e) = self.publish_device(settings, device).await {
            warn!(
                identifier = %device.identifier,
                error = %e,
                "MQTT publish failed, resetting connection"
            );
            self.teardown().await;
        }
    }

    /// Drop the connection, if any. Called on shutdown.
    pub async fn shutdown(&mut self) {
        self.teardown().await;
    }

    async fn publish_device(
        &mut self,
        settings: &MqttSettings,
        device: &Device,
    ) -> Result<(), SinkError> {
        let topics = DeviceTopics::for_device(device);
        let config = serde_json::to_vec(&config_document(device, &topics))
            .map_err(|e| SinkError::Publish(e.to_string()))?;
        let attributes = serde_json::to_vec(&attributes_document(device))
            .map_err(|e| SinkError::Publish(e.to_string()))?;

        let session = self.ensure_connected(settings).await?;
        session.publish(&topics.config, config).await?;
        session.publish(&topics.attributes, attributes).await?;
        debug!(identifier = %device.identifier, "MQTT documents published");
        Ok(())
    }

    /// Connect lazily, tearing down first when the parameters changed or the
    /// background event loop reported trouble.
    async fn ensure_connected(
        &mut self,
        settings: &MqttSettings,
    ) -> Result<&dyn MqttSession, SinkError> {
        let params = settings.params();
        let stale = self
            .connection
            .as_ref()
            .is_some_and(|conn| conn.params != params || !conn.session.is_healthy());
        if stale {
            info!("MQTT parameters changed or connection unhealthy, reconnecting");
            self.teardown().await;
        }

        if self.connection.is_none() {
            let session = self.connector.connect(&params).await?;
            self.connection = Some(Connection { params, session });
        }
        match &self.connection {
            Some(conn) => Ok(conn.session.as_ref()),
            None => Err(SinkError::Connect("not connected".to_string())),
        }
    }

    async fn teardown(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.session.disconnect().await;
        }
    }
}

impl Default for MqttSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-device topic names.
pub struct DeviceTopics {
    pub config: String,
    pub state: String,
    pub attributes: String,
}

impl DeviceTopics {
    pub fn for_device(device: &Device) -> Self {
        let id = device.display_id();
        Self {
            config: format!("{}/FMD_{}/config", TOPIC_PREFIX, id),
            state: format!("{}/FMD_{}/state", TOPIC_PREFIX, id),
            attributes: format!("{}/FMD_{}/attributes", TOPIC_PREFIX, id),
        }
    }
}

/// Home Assistant discovery document describing the device and where its
/// state and attributes are published.
pub fn config_document(device: &Device, topics: &DeviceTopics) -> Value {
    let unique_id = format!("FMD_{}", device.display_id());
    json!({
        "unique_id": unique_id,
        "name": device.label(),
        "state_topic": topics.state,
        "json_attributes_topic": topics.attributes,
        "source_type": "gps",
        "device": {
            "identifiers": [unique_id],
            "name": device.label(),
            "manufacturer": device.manufacturer_name,
            "model": device.model_name.as_ref().or(device.model.as_ref()),
            "sw_version": device.version,
        },
    })
}

/// Attributes document: position, accuracy, fix time in both ISO-8601 and
/// epoch seconds, battery when known, and provenance tags.
pub fn attributes_document(device: &Device) -> Value {
    let mut doc = json!({
        "source_type": "gps",
        "provider": "FindMyDevices",
    });
    if let Some((latitude, longitude)) = device.position() {
        doc["latitude"] = json!(latitude);
        doc["longitude"] = json!(longitude);
    }
    if let Some(accuracy) = device.horizontal_accuracy {
        doc["gps_accuracy"] = json!(accuracy);
    }
    if let Some(timestamp) = device.timestamp {
        doc["last_seen"] = json!(timestamp.to_rfc3339());
        doc["last_seen_ts"] = json!(timestamp.timestamp());
    }
    if let Some(battery) = device.battery {
        doc["battery_level"] = json!(battery);
    }
    doc
}
