//! Notification dispatcher - forwards registry events to the configured
//! sinks.
//!
//! Runs as a spawned consumer task over an event-bus receiver, so sink I/O
//! never blocks ingestion. Each sink fails independently; neither failure
//! affects the other sink or the registry.

use tokio::task::JoinHandle;
use tracing::{debug, info};

use findmy_core::{DeviceEvent, EventReceiver};

use crate::mqtt::{MqttConnector, MqttSink};
use crate::settings::{MqttSettings, WebhookSettings};
use crate::webhook::WebhookSink;

/// Consumes device events and fans them out to the HTTP webhook and MQTT
/// sinks. Owns both sinks (and the MQTT connection handle) exclusively.
pub struct NotificationDispatcher {
    webhook_settings: WebhookSettings,
    mqtt_settings: MqttSettings,
    webhook: WebhookSink,
    mqtt: MqttSink,
}

impl NotificationDispatcher {
    pub fn new(webhook_settings: WebhookSettings, mqtt_settings: MqttSettings) -> Self {
        Self {
            webhook_settings,
            mqtt_settings,
            webhook: WebhookSink::new(),
            mqtt: MqttSink::new(),
        }
    }

    /// Like `new`, with the MQTT broker connector replaced (tests).
    pub fn with_mqtt_connector(
        webhook_settings: WebhookSettings,
        mqtt_settings: MqttSettings,
        connector: Box<dyn MqttConnector>,
    ) -> Self {
        Self {
            webhook_settings,
            mqtt_settings,
            webhook: WebhookSink::new(),
            mqtt: MqttSink::with_connector(connector),
        }
    }

    /// Spawn the consumer task. Runs until the event bus closes, then drops
    /// the MQTT connection.
    pub fn start(mut self, mut events: EventReceiver) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                webhook = self.webhook_settings.is_active(),
                mqtt = self.mqtt_settings.is_active(),
                "notification dispatcher started"
            );
            while let Some(event) = events.recv().await {
                self.handle_event(event).await;
            }
            info!("event bus closed, notification dispatcher stopping");
            self.mqtt.shutdown().await;
        })
    }

    /// Dispatch one event to both sinks. Public so tests can drive the
    /// dispatcher without a bus.
    pub async fn handle_event(&mut self, event: DeviceEvent) {
        let device = event.device().clone();
        debug!(
            event = event.type_name(),
            identifier = %device.identifier,
            label = %device.label(),
            "dispatching device event"
        );
        // Sinks decide for themselves: inactive configuration and devices
        // without a position are skipped inside each sink.
        self.webhook.notify(&self.webhook_settings, &device).await;
        self.mqtt.notify(&self.mqtt_settings, &device).await;
    }
}
