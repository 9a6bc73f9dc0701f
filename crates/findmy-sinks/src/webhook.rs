//! Home Assistant `device_tracker.see` webhook sink.
//!
//! One POST per event, at-most-once: failures and non-2xx responses are
//! logged and dropped, with no retry and no backoff.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, warn};

use findmy_core::Device;

use crate::settings::WebhookSettings;

/// Fixed host-name tag sent with every webhook update.
const HOST_NAME: &str = "FindMyDevices";

/// Webhook service path on the Home Assistant API.
const SEE_PATH: &str = "/api/services/device_tracker/see";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP webhook sink. One reqwest client, reused across events so keep-alive
/// connections survive between updates.
pub struct WebhookSink {
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self { client }
    }

    /// Send one location update. Inactive configuration or a device without
    /// a resolved position is a silent no-op.
    pub async fn notify(&self, settings: &WebhookSettings, device: &Device) {
        if !settings.is_active() {
            return;
        }
        let Some(body) = build_payload(device) else {
            debug!(identifier = %device.identifier, "no position yet, webhook skipped");
            return;
        };

        let url = format!("{}{}", settings.endpoint.trim_end_matches('/'), SEE_PATH);
        let result = self
            .client
            .post(&url)
            .bearer_auth(&settings.token)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(identifier = %device.identifier, "webhook update delivered");
            }
            Ok(response) => {
                warn!(
                    identifier = %device.identifier,
                    status = %response.status(),
                    "webhook update rejected"
                );
            }
            Err(e) => {
                warn!(identifier = %device.identifier, error = %e, "webhook update failed");
            }
        }
    }
}

impl Default for WebhookSink {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON body for `device_tracker.see`; `None` without a resolved position.
pub fn build_payload(device: &Device) -> Option<Value> {
    let (latitude, longitude) = device.position()?;
    let id = device.display_id();

    let mut body = json!({
        "dev_id": format!("findmy_{}", id.replace('-', "")),
        "gps": [latitude, longitude],
        "mac": format!("FINDMY_{}", id),
        "host_name": HOST_NAME,
    });
    if let Some(accuracy) = device.horizontal_accuracy {
        body["gps_accuracy"] = json!(accuracy);
    }
    Some(body)
}
