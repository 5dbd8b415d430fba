//! Mock adapters for integration tests.
//!
//! Every port the node loop touches has a recording stand-in here, so tests
//! can assert on the exact wire and pin history without WiFi, a broker or
//! GPIO registers.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{ErrorKind, ErrorType, Operation, SpiDevice};
use vtms_node::app::events::NodeEvent;
use vtms_node::app::node::NodeLoop;
use vtms_node::app::ports::{
    AnalogInput, EventSink, LinkPort, MqttTransport, PinWriter, RetryDecision, StartupHook,
    StartupStage,
};
use vtms_node::config::{
    BrokerConfig, NodeConfig, NodeVariant, RetryPolicy, SensorKind, WifiCredentials,
};
use vtms_node::drivers::actuator_bank::Level;
use vtms_node::error::{BrokerError, DropReason, Error, LinkError, SensorFault};
use vtms_node::net::identity::{self, ClientId};
use vtms_node::net::session::{ConnectionState, PublishOutcome};
use vtms_node::net::{Message, TransportEvent};
use vtms_node::pins::PinId;
use vtms_node::sensors::analog::AnalogVoltageSensor;
use vtms_node::sensors::thermocouple::Max6675;
use vtms_node::sensors::{SensorChannel, SensorSource};

pub type TestNode = NodeLoop<MockLink, MockTransport, MockPins>;

pub const MAC: identity::MacAddress = [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE];

// ── MockLink ──────────────────────────────────────────────────

/// Associates after a scripted number of status polls.
pub struct MockLink {
    pub associated: bool,
    /// `None` never associates.
    pub polls_until_up: Option<u32>,
    /// A reassociate request brings the link back on the next poll.
    pub restore_on_reassociate: bool,
    pub begins: u32,
    pub reassociations: u32,
}

#[allow(dead_code)]
impl MockLink {
    pub fn new() -> Self {
        Self::after(0)
    }

    pub fn after(polls: u32) -> Self {
        Self {
            associated: false,
            polls_until_up: Some(polls),
            restore_on_reassociate: true,
            begins: 0,
            reassociations: 0,
        }
    }

    pub fn never() -> Self {
        Self { polls_until_up: None, ..Self::new() }
    }

    /// Lose the association until the node asks for it again.
    pub fn drop_link(&mut self) {
        self.associated = false;
        self.polls_until_up = None;
    }
}

impl LinkPort for MockLink {
    fn begin(&mut self, _credentials: &WifiCredentials) -> Result<(), LinkError> {
        self.begins += 1;
        Ok(())
    }

    fn is_associated(&mut self) -> bool {
        if !self.associated {
            match self.polls_until_up {
                Some(0) => self.associated = true,
                Some(n) => self.polls_until_up = Some(n - 1),
                None => {}
            }
        }
        self.associated
    }

    fn reassociate(&mut self) -> Result<(), LinkError> {
        self.reassociations += 1;
        if self.restore_on_reassociate {
            self.polls_until_up = Some(0);
        }
        Ok(())
    }
}

// ── MockTransport ─────────────────────────────────────────────

/// Records every CONNECT, SUBSCRIBE and PUBLISH as one line in `ops`.
#[derive(Default)]
pub struct MockTransport {
    pub ops: Vec<String>,
    pub events: VecDeque<TransportEvent>,
    pub connected: bool,
    pub refuse_connects: u32,
    /// SUBSCRIBE requests still to reject, one per call.
    pub fail_subscribes: u32,
    pub fail_publish: bool,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing(n: u32) -> Self {
        Self { refuse_connects: n, ..Self::default() }
    }

    /// Buffer an inbound message, as the client task would.
    pub fn deliver(&mut self, topic: &str, payload: &str) {
        let msg = Message::new(topic, payload.as_bytes()).unwrap();
        self.events.push_back(TransportEvent::Message(msg));
    }

    /// The broker went away.
    pub fn drop_connection(&mut self) {
        self.connected = false;
        self.events.push_back(TransportEvent::Disconnected);
    }

    pub fn published(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| op.strip_prefix("pub "))
            .collect()
    }

    pub fn connects(&self) -> usize {
        self.ops.iter().filter(|op| op.starts_with("connect ")).count()
    }
}

impl MqttTransport for MockTransport {
    fn connect(&mut self, client_id: &str, _broker: &BrokerConfig) -> Result<(), BrokerError> {
        self.ops.push(format!("connect {client_id}"));
        if self.refuse_connects > 0 {
            self.refuse_connects -= 1;
            return Err(BrokerError::Handshake(5));
        }
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, pattern: &str) -> Result<(), BrokerError> {
        if !self.connected {
            return Err(BrokerError::NotConnected);
        }
        if self.fail_subscribes > 0 {
            self.fail_subscribes -= 1;
            return Err(BrokerError::Subscribe(-1));
        }
        self.ops.push(format!("sub {pattern}"));
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BrokerError> {
        if !self.connected || self.fail_publish {
            return Err(BrokerError::Publish(-1));
        }
        self.ops
            .push(format!("pub {topic} {}", String::from_utf8_lossy(payload)));
        Ok(())
    }

    fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.pop_front()
    }
}

// ── MockPins ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MockPins {
    pub configured: Vec<PinId>,
    pub writes: Vec<(PinId, Level)>,
}

#[allow(dead_code)]
impl MockPins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last level written to `pin`.
    pub fn level(&self, pin: PinId) -> Option<Level> {
        self.writes
            .iter()
            .rev()
            .find(|(p, _)| *p == pin)
            .map(|(_, level)| *level)
    }
}

impl PinWriter for MockPins {
    fn configure_output(&mut self, pin: PinId) {
        self.configured.push(pin);
    }

    fn write(&mut self, pin: PinId, level: Level) {
        self.writes.push((pin, level));
    }
}

// ── Delay and startup hook ────────────────────────────────────

/// Never sleeps; adds up what it was asked to sleep.
#[derive(Default)]
pub struct NoDelay {
    pub slept_ms: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.slept_ms += u64::from(ms);
    }
}

/// Records every retry; aborts on attempt `abort_at` of `stage`.
#[derive(Default)]
pub struct RecordingHook {
    pub retries: Vec<(StartupStage, u32)>,
    pub abort_at: Option<(StartupStage, u32)>,
}

impl StartupHook for RecordingHook {
    fn on_retry(&mut self, stage: StartupStage, attempt: u32) -> RetryDecision {
        self.retries.push((stage, attempt));
        if self.abort_at == Some((stage, attempt)) {
            RetryDecision::Abort
        } else {
            RetryDecision::Continue
        }
    }
}

// ── RecordingSink ─────────────────────────────────────────────

/// Owned copies of every event the node emitted.
#[derive(Default)]
pub struct RecordingSink {
    pub started: Option<String>,
    pub startup_failed: Option<Error>,
    pub transitions: Vec<(ConnectionState, ConnectionState)>,
    pub actuator_sets: Vec<(String, PinId, Level, bool)>,
    pub logged: Vec<(String, String)>,
    pub dropped: Vec<(String, DropReason)>,
    pub verbosity: Vec<bool>,
    pub readings: Vec<(String, String, PublishOutcome)>,
    pub faults: Vec<(String, SensorFault)>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_transition(&self) -> Option<(ConnectionState, ConnectionState)> {
        self.transitions.last().copied()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &NodeEvent<'_>) {
        match *event {
            NodeEvent::Started { client_id } => self.started = Some(client_id.to_owned()),
            NodeEvent::StartupFailed(e) => self.startup_failed = Some(e),
            NodeEvent::ConnectionChanged { from, to } => self.transitions.push((from, to)),
            NodeEvent::ActuatorSet { topic, pin, level, changed } => {
                self.actuator_sets.push((topic.to_owned(), pin, level, changed));
            }
            NodeEvent::MessageLogged { topic, payload } => {
                self.logged.push((topic.to_owned(), payload.to_owned()));
            }
            NodeEvent::MessageDropped { topic, reason } => {
                self.dropped.push((topic.to_owned(), reason));
            }
            NodeEvent::VerbosityChanged { verbose } => self.verbosity.push(verbose),
            NodeEvent::ReadingPublished { sensor, payload, outcome } => {
                self.readings.push((sensor.to_owned(), payload.to_owned(), outcome));
            }
            NodeEvent::SensorFaulted { sensor, fault } => {
                self.faults.push((sensor.to_owned(), fault));
            }
        }
    }
}

// ── Sensor sources ────────────────────────────────────────────

/// ADC channel whose next conversion the test controls.
pub struct SharedAdc(pub Rc<Cell<Result<u16, SensorFault>>>);

impl AnalogInput for SharedAdc {
    fn read_raw(&mut self) -> Result<u16, SensorFault> {
        self.0.get()
    }
}

/// MAX6675 stand-in: shifts out the current frame, or fails on `None`.
pub struct SharedFrame(pub Rc<Cell<Option<u16>>>);

impl ErrorType for SharedFrame {
    type Error = ErrorKind;
}

impl SpiDevice for SharedFrame {
    fn transaction(&mut self, ops: &mut [Operation<'_, u8>]) -> Result<(), ErrorKind> {
        let frame = self.0.get().ok_or(ErrorKind::Other)?;
        for op in ops {
            if let Operation::Read(buf) = op {
                buf.copy_from_slice(&frame.to_be_bytes()[..buf.len()]);
            }
        }
        Ok(())
    }
}

/// MAX6675 frame for a temperature in quarter degrees Celsius.
#[allow(dead_code)]
pub fn frame_for(celsius_quarters: u16) -> u16 {
    celsius_quarters << 3
}

// ── Node builders ─────────────────────────────────────────────

pub fn client_id() -> ClientId {
    identity::client_id("esp32-client-", &MAC)
}

/// A board preset with short, bounded retry budgets.
pub fn test_config(variant: NodeVariant) -> NodeConfig {
    let mut config = NodeConfig::preset(variant);
    config.link_retry = RetryPolicy { delay_ms: 500, max_attempts: Some(3) };
    config.broker_retry = RetryPolicy { delay_ms: 2_000, max_attempts: Some(3) };
    config
}

/// One channel per configured sensor, fed from the shared test inputs.
#[allow(dead_code)]
pub fn sensor_channels(
    config: &NodeConfig,
    adc: &Rc<Cell<Result<u16, SensorFault>>>,
    frame: &Rc<Cell<Option<u16>>>,
) -> Vec<SensorChannel> {
    config
        .sensors
        .iter()
        .map(|binding| {
            let source: Box<dyn SensorSource> = match binding.kind {
                SensorKind::AnalogVoltage { v_ref, full_scale, .. } => Box::new(
                    AnalogVoltageSensor::new(SharedAdc(Rc::clone(adc)), v_ref, full_scale),
                ),
                SensorKind::Thermocouple { unit } => {
                    Box::new(Max6675::new(SharedFrame(Rc::clone(frame)), unit))
                }
            };
            SensorChannel::new(binding, source)
        })
        .collect()
}

pub fn build(
    config: NodeConfig,
    link: MockLink,
    transport: MockTransport,
    sensors: Vec<SensorChannel>,
) -> TestNode {
    NodeLoop::new(config, client_id(), link, transport, MockPins::new(), sensors).unwrap()
}

/// A flags board that has completed startup.
#[allow(dead_code)]
pub fn running_flags_node(sink: &mut RecordingSink) -> TestNode {
    let mut node = build(
        test_config(NodeVariant::Flags),
        MockLink::new(),
        MockTransport::new(),
        Vec::new(),
    );
    node.start(&mut NoDelay::default(), &mut RecordingHook::default(), sink)
        .unwrap();
    node
}
