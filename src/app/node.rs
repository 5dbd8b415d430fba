//! Node loop: the cooperative scheduler.
//!
//! [`NodeLoop`] owns every component of one node and drives them from a
//! single thread.  All I/O flows through port traits, so the same loop
//! runs on the ESP32 and against the mocks in `tests/integration`.
//!
//! ```text
//!               ┌──────────────────────────────────────────────┐
//!  LinkPort ◀──▶│ NetworkLink                                  │
//!               │      │                                       │
//! Transport ◀──▶│ BrokerSession ──poll──▶ TopicRouter ──▶ ActuatorBank ──▶ PinWriter
//!               │      ▲                                       │
//!               │      └── Publisher ◀── SensorChannel ◀───────│── SensorSource
//!               └──────────────────────────────────────────────┘
//! ```
//!
//! Startup blocks with bounded retries: associate, connect, publish the
//! hello message, subscribe.  If either stage gives up the node enters
//! [`NodeState::StartupFailed`] and does nothing further; the firmware
//! restarts the chip.
//!
//! Each [`iterate`](NodeLoop::iterate) then runs, in order: connection
//! maintenance, inbound delivery, sampling and publishing.  Nothing in an
//! iteration sleeps; the caller yields between iterations.

use embedded_hal::delay::DelayNs;
use log::{LevelFilter, debug, info, warn};

use crate::config::{HandlerKind, NodeConfig};
use crate::drivers::actuator_bank::ActuatorBank;
use crate::error::{ConfigError, DropReason, Error, Result};
use crate::net::identity::ClientId;
use crate::net::link::NetworkLink;
use crate::net::session::{BrokerSession, ConnectionState};
use crate::net::Message;
use crate::routing::TopicRouter;
use crate::routing::command::decode_bool;
use crate::sensors::SensorChannel;

use super::events::NodeEvent;
use super::ports::{EventSink, LinkPort, MqttTransport, PinWriter, StartupHook};

// ───────────────────────────────────────────────────────────────
// Handlers and state
// ───────────────────────────────────────────────────────────────

/// What a routed message does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Drive the actuator at this bank index.
    Actuator(usize),
    /// Toggle debug verbosity.
    Debug,
    /// Log and discard.
    Log,
}

impl From<HandlerKind> for Handler {
    fn from(kind: HandlerKind) -> Self {
        match kind {
            HandlerKind::Log => Self::Log,
            HandlerKind::Debug => Self::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Starting,
    Running,
    /// Terminal.  Carries the error that ended startup.
    StartupFailed(Error),
}

/// What one iteration did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IterationReport {
    pub delivered: usize,
    pub sampled: usize,
}

// ───────────────────────────────────────────────────────────────
// NodeLoop
// ───────────────────────────────────────────────────────────────

pub struct NodeLoop<L, T, P> {
    config: NodeConfig,
    link: NetworkLink<L>,
    session: BrokerSession<T>,
    router: TopicRouter<Handler>,
    bank: ActuatorBank,
    pins: P,
    sensors: Vec<SensorChannel>,
    state: NodeState,
    verbose: bool,
    /// Earliest tick for the next steady-state reconnect attempt.
    next_reconnect_ms: u64,
}

impl<L: LinkPort, T: MqttTransport, P: PinWriter> NodeLoop<L, T, P> {
    /// Validate `config`, build the dispatch table and drive every
    /// actuator to its initial level.  No network activity yet.
    pub fn new(
        config: NodeConfig,
        client_id: ClientId,
        link: L,
        transport: T,
        mut pins: P,
        sensors: Vec<SensorChannel>,
    ) -> Result<Self> {
        config.validate()?;
        let router = build_router(&config)?;
        let bank = ActuatorBank::new(&config.actuators);
        bank.init(&mut pins);

        Ok(Self {
            config,
            link: NetworkLink::new(link),
            session: BrokerSession::new(transport, client_id),
            router,
            bank,
            pins,
            sensors,
            state: NodeState::Starting,
            verbose: false,
            next_reconnect_ms: 0,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Blocking startup.  On failure the node is left in
    /// [`NodeState::StartupFailed`] and the error is returned.
    pub fn start(
        &mut self,
        delay: &mut impl DelayNs,
        hook: &mut impl StartupHook,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match self.state {
            NodeState::Running => return Ok(()),
            NodeState::StartupFailed(e) => return Err(e),
            NodeState::Starting => {}
        }

        match self.bring_up(delay, hook, sink) {
            Ok(()) => {
                self.state = NodeState::Running;
                sink.emit(&NodeEvent::Started { client_id: self.session.client_id() });
                info!("Node running as {}", self.session.client_id());
                Ok(())
            }
            Err(e) => {
                self.state = NodeState::StartupFailed(e);
                sink.emit(&NodeEvent::StartupFailed(e));
                Err(e)
            }
        }
    }

    fn bring_up(
        &mut self,
        delay: &mut impl DelayNs,
        hook: &mut impl StartupHook,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        self.link
            .associate(&self.config.wifi, &self.config.link_retry, delay, hook)?;
        let before = self.session.state();
        self.session.link_up();
        self.emit_transition(before, sink);

        self.connect_broker(delay, hook, sink)?;

        // A failed hello or SUBSCRIBE drops the session back to connecting;
        // every pattern is still remembered and replayed by the handshake.
        let before = self.session.state();
        if let Some(hello) = &self.config.hello {
            self.session.publish(&self.config.root_topic, hello.as_bytes());
        }
        for pattern in self.config.broker_subscriptions() {
            if let Err(e) = self.session.subscribe(pattern) {
                warn!("MQTT: subscribe {pattern} failed: {e}");
            }
        }
        self.emit_transition(before, sink);

        if !self.session.is_connected() {
            self.connect_broker(delay, hook, sink)?;
        }
        Ok(())
    }

    /// Broker stage of startup, under `broker_retry`.
    fn connect_broker(
        &mut self,
        delay: &mut impl DelayNs,
        hook: &mut impl StartupHook,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let before = self.session.state();
        let connected =
            self.session
                .connect(&self.config.broker, &self.config.broker_retry, delay, hook);
        self.emit_transition(before, sink);
        connected?;
        Ok(())
    }

    // ── Steady state ──────────────────────────────────────────

    /// One pass of the steady-state loop.  Never sleeps.
    ///
    /// Does nothing unless [`start`](Self::start) has succeeded.
    pub fn iterate(&mut self, now_ms: u64, sink: &mut impl EventSink) -> IterationReport {
        if self.state != NodeState::Running {
            return IterationReport::default();
        }

        let before = self.session.state();
        self.maintain(now_ms);
        self.emit_transition(before, sink);

        let before = self.session.state();
        let delivered = self.deliver_inbound(sink);
        self.emit_transition(before, sink);

        let before = self.session.state();
        let sampled = self.sample_sensors(now_ms, sink);
        self.emit_transition(before, sink);

        IterationReport { delivered, sampled }
    }

    /// Non-blocking reconnect: one attempt per retry interval.
    fn maintain(&mut self, now_ms: u64) {
        if !self.link.is_up() {
            self.session.link_down();
            if now_ms >= self.next_reconnect_ms {
                self.next_reconnect_ms = now_ms + u64::from(self.config.link_retry.delay_ms);
                if let Err(e) = self.link.reassociate() {
                    warn!("WiFi: reassociate failed ({e})");
                }
            }
            return;
        }

        self.session.link_up();
        if self.session.is_connected() || now_ms < self.next_reconnect_ms {
            return;
        }
        let retry_ms = self.config.broker_retry.delay_ms;
        self.next_reconnect_ms = now_ms + u64::from(retry_ms);
        info!("Attempting MQTT connection...");
        if let Err(e) = self.session.try_connect(&self.config.broker) {
            warn!("MQTT: reconnect failed ({e}), try again in {retry_ms} ms");
        }
    }

    fn deliver_inbound(&mut self, sink: &mut impl EventSink) -> usize {
        let Self { session, router, bank, pins, verbose, .. } = self;
        session.poll(|msg| dispatch(msg, router, bank, pins, verbose, sink))
    }

    fn sample_sensors(&mut self, now_ms: u64, sink: &mut impl EventSink) -> usize {
        let mut sampled = 0;
        for channel in &mut self.sensors {
            let Some(result) = channel.poll(now_ms) else {
                continue;
            };
            sampled += 1;
            match result {
                Ok(reading) => {
                    let (payload, outcome) = channel.publisher().publish(&mut self.session, &reading);
                    sink.emit(&NodeEvent::ReadingPublished {
                        sensor: channel.id(),
                        payload: &payload,
                        outcome,
                    });
                }
                Err(fault) => {
                    sink.emit(&NodeEvent::SensorFaulted { sensor: channel.id(), fault });
                    if self.config.publish_faults {
                        channel.publisher().publish_fault(&mut self.session, fault);
                    }
                }
            }
        }
        sampled
    }

    fn emit_transition(&self, before: ConnectionState, sink: &mut impl EventSink) {
        let now = self.session.state();
        if now != before {
            sink.emit(&NodeEvent::ConnectionChanged { from: before, to: now });
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.session.state()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn session(&self) -> &BrokerSession<T> {
        &self.session
    }

    pub fn bank(&self) -> &ActuatorBank {
        &self.bank
    }

    pub fn sensors(&self) -> &[SensorChannel] {
        &self.sensors
    }

    /// `true` while `lemons/debug` has verbosity on.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn pins(&self) -> &P {
        &self.pins
    }

    pub fn transport(&self) -> &T {
        self.session.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.session.transport_mut()
    }

    pub fn link_port(&self) -> &L {
        self.link.port()
    }

    pub fn link_port_mut(&mut self) -> &mut L {
        self.link.port_mut()
    }
}

// ───────────────────────────────────────────────────────────────
// Routing
// ───────────────────────────────────────────────────────────────

fn build_router(config: &NodeConfig) -> core::result::Result<TopicRouter<Handler>, ConfigError> {
    let mut router = TopicRouter::new();
    for (index, binding) in config.actuators.iter().enumerate() {
        router
            .register(&binding.topic, Handler::Actuator(index))
            .map_err(|_| ConfigError::InvalidPattern)?;
    }
    for sub in &config.subscriptions {
        router
            .register(&sub.pattern, Handler::from(sub.handler))
            .map_err(|_| ConfigError::InvalidPattern)?;
    }
    Ok(router)
}

/// Route one inbound message to its handler.
fn dispatch<P: PinWriter>(
    msg: &Message,
    router: &TopicRouter<Handler>,
    bank: &mut ActuatorBank,
    pins: &mut P,
    verbose: &mut bool,
    sink: &mut impl EventSink,
) {
    let topic = msg.topic.as_str();
    debug!("Message arrived in topic: {topic}");

    let Some(&handler) = router.resolve(topic) else {
        sink.emit(&NodeEvent::MessageDropped { topic, reason: DropReason::UnroutableTopic });
        return;
    };

    match handler {
        Handler::Actuator(index) => match bank.command_at(index, &msg.payload) {
            Some(cmd) => {
                let changed = bank.execute(cmd, pins);
                sink.emit(&NodeEvent::ActuatorSet {
                    topic,
                    pin: cmd.pin,
                    level: cmd.level,
                    changed,
                });
            }
            None => {
                sink.emit(&NodeEvent::MessageDropped { topic, reason: DropReason::MalformedPayload })
            }
        },
        Handler::Debug => match decode_bool(&msg.payload) {
            Some(on) => {
                *verbose = on;
                log::set_max_level(if on { LevelFilter::Debug } else { LevelFilter::Info });
                sink.emit(&NodeEvent::VerbosityChanged { verbose: on });
            }
            None => {
                sink.emit(&NodeEvent::MessageDropped { topic, reason: DropReason::MalformedPayload })
            }
        },
        Handler::Log => sink.emit(&NodeEvent::MessageLogged { topic, payload: msg.payload_str() }),
    }
}
