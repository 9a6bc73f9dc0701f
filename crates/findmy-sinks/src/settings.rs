//! Sink configuration.
//!
//! A sink whose required fields are empty is silently inactive, not an
//! error: the bridge runs fine with zero sinks configured.

use serde::{Deserialize, Serialize};

/// Home Assistant HTTP webhook settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    pub enabled: bool,
    /// Base URL of the Home Assistant instance.
    pub endpoint: String,
    /// Long-lived access token.
    pub token: String,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://homeassistant.local:8123".to_string(),
            token: String::new(),
        }
    }
}

impl WebhookSettings {
    /// Whether the sink should do anything at all.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.endpoint.is_empty() && !self.token.is_empty()
    }
}

/// MQTT broker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    pub enabled: bool,
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            server: String::new(),
            port: 1883,
            user: String::new(),
            password: String::new(),
        }
    }
}

impl MqttSettings {
    /// Whether the sink should do anything at all.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.server.is_empty()
    }

    /// The connection-identity subset; any change here forces a reconnect.
    pub fn params(&self) -> MqttParams {
        MqttParams {
            host: self.server.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}

/// Connection parameters of an MQTT session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}
