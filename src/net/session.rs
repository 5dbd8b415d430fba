//! Broker session: connection state, subscriptions, publish and poll.
//!
//! ```text
//! Disconnected ──link up──▶ LinkUp ──try_connect──▶ BrokerConnecting
//!      ▲                                               │        ▲
//!      └─────────────── link lost ─────────────────────┤        │ publish failure,
//!                                                      ▼        │ Disconnected event
//!                                               BrokerConnected ┘
//! ```
//!
//! The session remembers every pattern passed to [`BrokerSession::subscribe`]
//! and re-issues all of them on each successful handshake, before any
//! buffered inbound message is delivered.  Brokers drop subscriptions with
//! a clean session, so nothing is received until this has happened.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::app::ports::{MqttTransport, RetryDecision, StartupHook, StartupStage};
use crate::config::{BrokerConfig, RetryPolicy};
use crate::error::BrokerError;

use super::identity::ClientId;
use super::inbox::INBOX_DEPTH;
use super::{Message, TransportEvent};

/// Upper bound on messages delivered per [`BrokerSession::poll`].
pub const MAX_POLL_BATCH: usize = INBOX_DEPTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    LinkUp,
    BrokerConnecting,
    BrokerConnected,
}

impl ConnectionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::LinkUp => "link_up",
            Self::BrokerConnecting => "broker_connecting",
            Self::BrokerConnected => "broker_connected",
        }
    }
}

/// Result of a fire-and-forget publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Sent,
    /// Not connected, or the transport refused the packet.
    Dropped,
}

pub struct BrokerSession<T> {
    transport: T,
    client_id: ClientId,
    state: ConnectionState,
    subscriptions: Vec<String>,
    handshakes: u32,
}

impl<T: MqttTransport> BrokerSession<T> {
    pub fn new(transport: T, client_id: ClientId) -> Self {
        Self {
            transport,
            client_id,
            state: ConnectionState::Disconnected,
            subscriptions: Vec::new(),
            handshakes: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::BrokerConnected
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Patterns re-issued after every handshake.
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    /// Successful handshakes since boot.
    pub fn handshakes(&self) -> u32 {
        self.handshakes
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The network link came up.
    pub fn link_up(&mut self) {
        if self.state == ConnectionState::Disconnected {
            self.state = ConnectionState::LinkUp;
        }
    }

    /// The network link went away; any broker session with it.
    ///
    /// Everything still buffered belongs to the dead session and is
    /// discarded, including its disconnect notice.
    pub fn link_down(&mut self) {
        self.state = ConnectionState::Disconnected;
        let mut stale = 0;
        while self.transport.next_event().is_some() {
            stale += 1;
        }
        if stale > 0 {
            debug!("MQTT: discarded {stale} buffered events after link loss");
        }
    }

    /// Blocking startup handshake with bounded retries.
    pub fn connect(
        &mut self,
        broker: &BrokerConfig,
        policy: &RetryPolicy,
        delay: &mut impl DelayNs,
        hook: &mut impl StartupHook,
    ) -> Result<(), BrokerError> {
        let mut attempts = 0u32;
        loop {
            info!(
                "The client {} connects to the MQTT broker {}:{}",
                self.client_id, broker.host, broker.port
            );
            match self.try_connect(broker) {
                Ok(()) => return Ok(()),
                Err(e) => warn!("MQTT: connect failed ({e})"),
            }
            attempts += 1;
            if policy.exhausted(attempts) {
                return Err(BrokerError::AttemptsExhausted { attempts });
            }
            if hook.on_retry(StartupStage::Broker, attempts) == RetryDecision::Abort {
                return Err(BrokerError::Cancelled);
            }
            delay.delay_ms(policy.delay_ms);
        }
    }

    /// One handshake attempt followed by re-subscription.  Never sleeps.
    pub fn try_connect(&mut self, broker: &BrokerConfig) -> Result<(), BrokerError> {
        if self.state == ConnectionState::Disconnected {
            return Err(BrokerError::NotConnected);
        }
        self.state = ConnectionState::BrokerConnecting;
        self.transport.connect(&self.client_id, broker)?;
        self.handshakes += 1;
        info!("MQTT: broker connected");

        for pattern in &self.subscriptions {
            if let Err(e) = self.transport.subscribe(pattern) {
                warn!("MQTT: resubscribe to {pattern} failed ({e})");
                return Err(e);
            }
            debug!("MQTT: resubscribed {pattern}");
        }
        self.state = ConnectionState::BrokerConnected;
        Ok(())
    }

    /// Register `pattern` and SUBSCRIBE now if connected.
    ///
    /// While not connected the pattern is only remembered; it goes out
    /// with the next handshake.
    pub fn subscribe(&mut self, pattern: &str) -> Result<(), BrokerError> {
        if !self.subscriptions.iter().any(|s| s == pattern) {
            self.subscriptions.push(pattern.to_owned());
        }
        if !self.is_connected() {
            debug!("MQTT: subscribe to {pattern} deferred");
            return Ok(());
        }
        match self.transport.subscribe(pattern) {
            Ok(()) => {
                info!("MQTT: subscribed {pattern}");
                Ok(())
            }
            Err(e) => {
                self.connection_lost();
                Err(e)
            }
        }
    }

    /// Fire-and-forget publish.  Nothing is queued while disconnected.
    pub fn publish(&mut self, topic: &str, payload: &[u8]) -> PublishOutcome {
        if !self.is_connected() {
            debug!("MQTT: publish to {topic} dropped ({})", self.state.as_str());
            return PublishOutcome::Dropped;
        }
        match self.transport.publish(topic, payload) {
            Ok(()) => PublishOutcome::Sent,
            Err(e) => {
                warn!("MQTT: publish to {topic} failed ({e})");
                self.connection_lost();
                PublishOutcome::Dropped
            }
        }
    }

    /// Deliver up to [`MAX_POLL_BATCH`] buffered messages to `deliver`.
    ///
    /// Does nothing unless connected.  A disconnect event ends the batch;
    /// messages behind it wait for the next handshake and resubscribe.
    pub fn poll(&mut self, mut deliver: impl FnMut(&Message)) -> usize {
        if !self.is_connected() {
            return 0;
        }

        let mut delivered = 0;
        while delivered < MAX_POLL_BATCH {
            match self.transport.next_event() {
                Some(TransportEvent::Message(msg)) => {
                    deliver(&msg);
                    delivered += 1;
                }
                Some(TransportEvent::Disconnected) => {
                    self.connection_lost();
                    return delivered;
                }
                None => break,
            }
        }
        // The inbox may have overflowed before the disconnect event got in.
        if !self.transport.is_connected() {
            self.connection_lost();
        }
        delivered
    }

    fn connection_lost(&mut self) {
        if self.state == ConnectionState::BrokerConnected {
            warn!("MQTT: connection lost, reconnecting");
            self.state = ConnectionState::BrokerConnecting;
        }
    }
}
