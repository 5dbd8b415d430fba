//! MQTT client adapter.
//!
//! Implements [`MqttTransport`] on top of the ESP-IDF MQTT client.  The
//! client runs its own task; its event callback only records the
//! connection flag and pushes deliveries into the static [`Inbox`].  The
//! control loop drains that inbox through [`MqttTransport::next_event`].
//!
//! All traffic is QoS 0, non-retained, matching the rest of the bus.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`.
//! - **all other targets**: an in-process loopback broker for host tests.

use log::{debug, info, warn};

use crate::app::ports::MqttTransport;
use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::net::TransportEvent;

#[cfg(target_os = "espidf")]
pub use esp::MqttAdapter;
#[cfg(not(target_os = "espidf"))]
pub use sim::MqttAdapter;

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use core::sync::atomic::{AtomicBool, Ordering};
    use core::time::Duration;

    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_svc::mqtt::client::{
        Details, EspMqttClient, EspMqttEvent, EventPayload, MqttClientConfiguration, QoS,
    };

    use super::*;
    use crate::net::Message;
    use crate::net::inbox::Inbox;

    /// How long the first handshake may take before it counts as failed.
    const HANDSHAKE_WAIT_MS: u32 = 5_000;
    const HANDSHAKE_POLL_MS: u32 = 50;

    static INBOX: Inbox = Inbox::new();
    static CONNECTED: AtomicBool = AtomicBool::new(false);

    /// Runs on the MQTT client task.
    fn on_event(event: EspMqttEvent<'_>) {
        match event.payload() {
            EventPayload::Connected(_) => {
                CONNECTED.store(true, Ordering::Release);
            }
            EventPayload::Disconnected => {
                if CONNECTED.swap(false, Ordering::AcqRel) {
                    INBOX.push(TransportEvent::Disconnected);
                }
            }
            EventPayload::Received { topic, data, details, .. } => {
                if !matches!(details, Details::Complete) {
                    warn!("MQTT: fragmented message dropped");
                    return;
                }
                let Some(topic) = topic else { return };
                match Message::new(topic, data) {
                    Ok(msg) => {
                        if !INBOX.push(TransportEvent::Message(msg)) {
                            warn!("MQTT: inbox full, {topic} dropped");
                        }
                    }
                    Err(e) => warn!("MQTT: {topic}: {e}"),
                }
            }
            EventPayload::Error(e) => warn!("MQTT: client error {e:?}"),
            _ => {}
        }
    }

    #[derive(Default)]
    pub struct MqttAdapter {
        client: Option<EspMqttClient<'static>>,
    }

    impl MqttAdapter {
        pub fn new() -> Self {
            Self { client: None }
        }

        /// Events lost to a full inbox since boot.
        pub fn dropped(&self) -> u32 {
            INBOX.dropped()
        }

        fn client(&mut self) -> Result<&mut EspMqttClient<'static>, BrokerError> {
            self.client.as_mut().ok_or(BrokerError::NotConnected)
        }
    }

    impl MqttTransport for MqttAdapter {
        fn connect(&mut self, client_id: &str, broker: &BrokerConfig) -> Result<(), BrokerError> {
            // The client reconnects on its own once created; later calls
            // only report whether it has.
            if self.client.is_some() {
                return if CONNECTED.load(Ordering::Acquire) {
                    Ok(())
                } else {
                    Err(BrokerError::Handshake(-1))
                };
            }

            let url = format!("mqtt://{}:{}", broker.host, broker.port);
            let conf = MqttClientConfiguration {
                client_id: Some(client_id),
                username: broker.username.as_deref(),
                password: broker.password.as_deref(),
                keep_alive_interval: Some(Duration::from_secs(u64::from(broker.keep_alive_secs))),
                ..Default::default()
            };
            let client = EspMqttClient::new_cb(&url, &conf, on_event)
                .map_err(|e| BrokerError::Handshake(e.code()))?;
            self.client = Some(client);
            info!("MQTT: client started for {url}");

            let mut waited = 0;
            while !CONNECTED.load(Ordering::Acquire) {
                if waited >= HANDSHAKE_WAIT_MS {
                    return Err(BrokerError::Handshake(-1));
                }
                FreeRtos::delay_ms(HANDSHAKE_POLL_MS);
                waited += HANDSHAKE_POLL_MS;
            }
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.client.is_some() && CONNECTED.load(Ordering::Acquire)
        }

        fn subscribe(&mut self, pattern: &str) -> Result<(), BrokerError> {
            self.client()?
                .subscribe(pattern, QoS::AtMostOnce)
                .map(|_| ())
                .map_err(|e| BrokerError::Subscribe(e.code()))
        }

        fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BrokerError> {
            debug!("MQTT: publish {topic} ({} bytes)", payload.len());
            self.client()?
                .publish(topic, QoS::AtMostOnce, false, payload)
                .map(|_| ())
                .map_err(|e| BrokerError::Publish(e.code()))
        }

        fn next_event(&mut self) -> Option<TransportEvent> {
            INBOX.pop()
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Host loopback broker
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use super::*;
    use crate::net::Message;
    use crate::net::inbox::Inbox;
    use crate::routing::filter_matches;

    /// Loopback transport: publishes matching a live subscription come
    /// straight back as deliveries, like a broker with one client.
    #[derive(Default)]
    pub struct MqttAdapter {
        inbox: Inbox,
        connected: bool,
        refuse_connects: u32,
        subscriptions: Vec<String>,
        published: Vec<(String, Vec<u8>)>,
    }

    impl MqttAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn dropped(&self) -> u32 {
            self.inbox.dropped()
        }

        /// Broker-side subscriptions of the current session.
        pub fn subscriptions(&self) -> &[String] {
            &self.subscriptions
        }

        /// Every accepted publish, in order.
        pub fn published(&self) -> &[(String, Vec<u8>)] {
            &self.published
        }

        /// Refuse the next `n` handshakes.
        pub fn sim_refuse_connects(&mut self, n: u32) {
            self.refuse_connects = n;
        }

        /// Deliver a message from another client.
        pub fn sim_inject(&mut self, topic: &str, payload: &[u8]) {
            if !self.connected || !self.subscriptions.iter().any(|f| filter_matches(f, topic)) {
                return;
            }
            match Message::new(topic, payload) {
                Ok(msg) => {
                    self.inbox.push(TransportEvent::Message(msg));
                }
                Err(e) => warn!("MQTT(sim): {topic}: {e}"),
            }
        }

        /// Drop the connection; the session learns about it on its next poll.
        pub fn sim_drop_connection(&mut self) {
            if self.connected {
                self.connected = false;
                self.inbox.push(TransportEvent::Disconnected);
            }
        }
    }

    impl MqttTransport for MqttAdapter {
        fn connect(&mut self, client_id: &str, broker: &BrokerConfig) -> Result<(), BrokerError> {
            if self.refuse_connects > 0 {
                self.refuse_connects -= 1;
                return Err(BrokerError::Handshake(5));
            }
            // Clean session: nothing survives a reconnect.
            self.subscriptions.clear();
            self.connected = true;
            info!("MQTT(sim): {client_id} connected to {}:{}", broker.host, broker.port);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn subscribe(&mut self, pattern: &str) -> Result<(), BrokerError> {
            if !self.connected {
                return Err(BrokerError::NotConnected);
            }
            self.subscriptions.push(pattern.to_owned());
            Ok(())
        }

        fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BrokerError> {
            if !self.connected {
                return Err(BrokerError::NotConnected);
            }
            debug!("MQTT(sim): publish {topic}");
            self.published.push((topic.to_owned(), payload.to_vec()));
            self.sim_inject(topic, payload);
            Ok(())
        }

        fn next_event(&mut self) -> Option<TransportEvent> {
            self.inbox.pop()
        }
    }

}
