//! MQTT bus adapter.
//!
//! Implements [`BusPort`] on top of the ESP-IDF MQTT client.  The client
//! runs its own task; its event callback never touches the engine and only
//! forwards what it sees into the [`INBOUND`](crate::events::INBOUND)
//! mailbox:
//!
//! | Client event     | Mailbox event                     |
//! |------------------|-----------------------------------|
//! | `Connected`      | `InboundEvent::BusConnected`      |
//! | `Disconnected`   | `InboundEvent::BusDisconnected`   |
//! | `Received`       | `InboundEvent::BusMessage`        |
//!
//! ## cfg gating
//!
//! On host the adapter is a simulation: it records publishes and
//! subscriptions and its connection state is driven by the caller.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::app::ports::{BusError, BusPort};
use crate::events::{self, InboundEvent};

/// Broker connection settings.
#[derive(Debug, Clone, Default)]
pub struct MqttSettings {
    /// `mqtt://host:port`; empty disables the client.
    pub url: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Forward one client event into the mailbox.  Shared by the ESP-IDF
/// callback and the host simulation.
fn forward(connected: &AtomicBool, event: InboundEvent) {
    match &event {
        InboundEvent::BusConnected => {
            info!("MQTT: connected");
            connected.store(true, Ordering::Release);
        }
        InboundEvent::BusDisconnected => {
            info!("MQTT: disconnected");
            connected.store(false, Ordering::Release);
        }
        InboundEvent::BusMessage { topic, .. } => debug!("MQTT: message on {}", topic),
        InboundEvent::Ring(_) => {}
    }
    events::push_event(event);
}

pub struct MqttAdapter {
    connected: Arc<AtomicBool>,
    #[cfg(target_os = "espidf")]
    client: Option<esp_idf_svc::mqtt::client::EspMqttClient<'static>>,
    #[cfg(not(target_os = "espidf"))]
    published: Vec<(String, String)>,
    #[cfg(not(target_os = "espidf"))]
    subscribed: Vec<String>,
}

impl MqttAdapter {
    // ── Platform-specific ─────────────────────────────────────

    /// Start the client.  An empty URL yields an adapter that never connects.
    #[cfg(target_os = "espidf")]
    pub fn start(settings: &MqttSettings) -> Self {
        use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration};

        let connected = Arc::new(AtomicBool::new(false));
        if settings.url.is_empty() {
            info!("MQTT: no broker configured");
            return Self {
                connected,
                client: None,
            };
        }

        let conf = MqttClientConfiguration {
            client_id: Some(&settings.client_id),
            username: settings.username.as_deref(),
            password: settings.password.as_deref(),
            ..Default::default()
        };
        let flag = Arc::clone(&connected);
        let client = EspMqttClient::new_cb(&settings.url, &conf, move |event| {
            match event.payload() {
                EventPayload::Connected(_) => forward(&flag, InboundEvent::BusConnected),
                EventPayload::Disconnected => forward(&flag, InboundEvent::BusDisconnected),
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    ..
                } => match InboundEvent::bus_message(topic, data) {
                    Some(msg) => forward(&flag, msg),
                    None => warn!("MQTT: topic {} too long, message dropped", topic),
                },
                EventPayload::Error(e) => warn!("MQTT: client error: {:?}", e),
                _ => {}
            }
        });

        match client {
            Ok(client) => {
                info!("MQTT: client started for {}", settings.url);
                Self {
                    connected,
                    client: Some(client),
                }
            }
            Err(e) => {
                warn!("MQTT: client start failed: {}", e);
                Self {
                    connected,
                    client: None,
                }
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self, topic: &str, payload: &str) -> Result<(), BusError> {
        use esp_idf_svc::mqtt::client::QoS;

        let client = self.client.as_mut().ok_or(BusError::NotConnected)?;
        client
            .enqueue(topic, QoS::AtMostOnce, false, payload.as_bytes())
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: publish to {} failed: {}", topic, e);
                BusError::PublishFailed
            })
    }

    #[cfg(target_os = "espidf")]
    fn platform_subscribe(&mut self, topic: &str) -> Result<(), BusError> {
        use esp_idf_svc::mqtt::client::QoS;

        let client = self.client.as_mut().ok_or(BusError::NotConnected)?;
        client
            .subscribe(topic, QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: subscribe to {} failed: {}", topic, e);
                BusError::SubscribeFailed
            })
    }

    /// Simulation: a disconnected client with empty logs.
    #[cfg(not(target_os = "espidf"))]
    pub fn start(settings: &MqttSettings) -> Self {
        info!("MQTT(sim): broker '{}' not contacted", settings.url);
        Self {
            connected: Arc::new(AtomicBool::new(false)),
            published: Vec::new(),
            subscribed: Vec::new(),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self, topic: &str, payload: &str) -> Result<(), BusError> {
        self.published.push((topic.to_string(), payload.to_string()));
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_subscribe(&mut self, topic: &str) -> Result<(), BusError> {
        self.subscribed.push(topic.to_string());
        Ok(())
    }

    /// Simulation: act as if the client task reported a session change.
    #[cfg(not(target_os = "espidf"))]
    pub fn simulate_connection(&self, up: bool) {
        let event = if up {
            InboundEvent::BusConnected
        } else {
            InboundEvent::BusDisconnected
        };
        forward(&self.connected, event);
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn published(&self) -> &[(String, String)] {
        &self.published
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn subscriptions(&self) -> &[String] {
        &self.subscribed
    }
}

impl BusPort for MqttAdapter {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), BusError> {
        if !self.is_connected() {
            return Err(BusError::NotConnected);
        }
        self.platform_publish(topic, payload)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), BusError> {
        if !self.is_connected() {
            return Err(BusError::NotConnected);
        }
        self.platform_subscribe(topic)?;
        info!("MQTT: subscribed to {}", topic);
        Ok(())
    }
}
