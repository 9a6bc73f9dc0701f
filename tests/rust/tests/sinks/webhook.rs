//! Webhook sink behavior against a mock Home Assistant endpoint.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use findmy_core::{Device, DeviceEvent};
use findmy_sinks::{MqttSettings, NotificationDispatcher, WebhookSettings};

fn located_device() -> Device {
    let mut device = Device::new("abcd-12ef");
    device.name = Some("Keys".to_string());
    device.latitude = Some(48.85);
    device.longitude = Some(2.35);
    device.horizontal_accuracy = Some(7.5);
    device
}

fn webhook_settings(endpoint: &str, enabled: bool) -> WebhookSettings {
    WebhookSettings {
        enabled,
        endpoint: endpoint.to_string(),
        token: "test-token".to_string(),
    }
}

fn dispatcher(endpoint: &str, enabled: bool) -> NotificationDispatcher {
    NotificationDispatcher::new(
        webhook_settings(endpoint, enabled),
        MqttSettings::default(),
    )
}

#[tokio::test]
async fn test_location_update_posts_see_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/services/device_tracker/see"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({
            "dev_id": "findmy_ABCD12EF",
            "gps": [48.85, 2.35],
            "gps_accuracy": 7.5,
            "mac": "FINDMY_ABCD-12EF",
            "host_name": "FindMyDevices",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut dispatcher = dispatcher(&server.uri(), true);
    dispatcher
        .handle_event(DeviceEvent::LocationUpdated {
            device: located_device(),
        })
        .await;
}

#[tokio::test]
async fn test_disabled_sink_never_issues_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut dispatcher = dispatcher(&server.uri(), false);
    dispatcher
        .handle_event(DeviceEvent::LocationUpdated {
            device: located_device(),
        })
        .await;
}

#[tokio::test]
async fn test_missing_token_is_a_silent_noop() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut settings = webhook_settings(&server.uri(), true);
    settings.token = String::new();
    let mut dispatcher = NotificationDispatcher::new(settings, MqttSettings::default());
    dispatcher
        .handle_event(DeviceEvent::LocationUpdated {
            device: located_device(),
        })
        .await;
}

#[tokio::test]
async fn test_device_without_position_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut dispatcher = dispatcher(&server.uri(), true);
    dispatcher
        .handle_event(DeviceEvent::Created {
            device: Device::new("abcd-12ef"),
        })
        .await;
}

#[tokio::test]
async fn test_rejected_response_does_not_poison_the_sink() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/services/device_tracker/see"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    // Two dispatches: the second still goes out after the first was rejected
    let mut dispatcher = dispatcher(&server.uri(), true);
    for _ in 0..2 {
        dispatcher
            .handle_event(DeviceEvent::LocationUpdated {
                device: located_device(),
            })
            .await;
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_is_logged_and_dropped() {
    // Nothing is listening on this port; the dispatch must still return
    let mut dispatcher = dispatcher("http://127.0.0.1:9", true);
    dispatcher
        .handle_event(DeviceEvent::LocationUpdated {
            device: located_device(),
        })
        .await;
}
