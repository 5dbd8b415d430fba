//! Bounded startup: association and broker retry budgets, hook aborts and
//! configuration rejected before any I/O.

use vtms_node::app::node::{NodeLoop, NodeState};
use vtms_node::app::ports::StartupStage;
use vtms_node::config::{NodeVariant, RetryPolicy};
use vtms_node::error::{BrokerError, ConfigError, Error, LinkError};
use vtms_node::net::session::ConnectionState;

use crate::mock_net::{
    MockLink, MockPins, MockTransport, NoDelay, RecordingHook, RecordingSink, build, client_id,
    test_config,
};

// ── Link stage ────────────────────────────────────────────────

#[test]
fn slow_association_is_retried() {
    let mut node = build(
        test_config(NodeVariant::Flags),
        MockLink::after(2),
        MockTransport::new(),
        Vec::new(),
    );
    let mut delay = NoDelay::default();
    let mut hook = RecordingHook::default();

    node.start(&mut delay, &mut hook, &mut RecordingSink::new())
        .unwrap();

    assert_eq!(hook.retries, vec![(StartupStage::Link, 1), (StartupStage::Link, 2)]);
    assert_eq!(delay.slept_ms, 1_000);
    assert_eq!(node.link_port().begins, 1);
    assert_eq!(node.state(), NodeState::Running);
}

#[test]
fn association_budget_ends_startup() {
    let mut node = build(
        test_config(NodeVariant::Flags),
        MockLink::never(),
        MockTransport::new(),
        Vec::new(),
    );
    let mut hook = RecordingHook::default();
    let mut sink = RecordingSink::new();

    let err = node.start(&mut NoDelay::default(), &mut hook, &mut sink);

    let expected = Error::Link(LinkError::AttemptsExhausted { attempts: 3 });
    assert_eq!(err, Err(expected));
    assert_eq!(node.state(), NodeState::StartupFailed(expected));
    assert_eq!(sink.startup_failed, Some(expected));
    assert_eq!(hook.retries.len(), 2);
    assert!(node.transport().ops.is_empty());
    assert_eq!(node.connection_state(), ConnectionState::Disconnected);
}

#[test]
fn unbounded_association_stops_on_hook_abort() {
    let mut config = test_config(NodeVariant::Flags);
    config.link_retry = RetryPolicy { delay_ms: 500, max_attempts: None };
    let mut node = build(config, MockLink::never(), MockTransport::new(), Vec::new());
    let mut hook = RecordingHook {
        abort_at: Some((StartupStage::Link, 50)),
        ..Default::default()
    };

    let err = node.start(&mut NoDelay::default(), &mut hook, &mut RecordingSink::new());

    assert_eq!(err, Err(Error::Link(LinkError::Cancelled)));
    assert_eq!(hook.retries.len(), 50);
}

// ── Broker stage ──────────────────────────────────────────────

#[test]
fn refused_handshakes_are_retried() {
    let mut node = build(
        test_config(NodeVariant::Flags),
        MockLink::new(),
        MockTransport::refusing(2),
        Vec::new(),
    );
    let mut delay = NoDelay::default();
    let mut hook = RecordingHook::default();

    node.start(&mut delay, &mut hook, &mut RecordingSink::new())
        .unwrap();

    assert_eq!(node.transport().connects(), 3);
    assert_eq!(hook.retries, vec![(StartupStage::Broker, 1), (StartupStage::Broker, 2)]);
    assert_eq!(delay.slept_ms, 4_000);
    assert_eq!(node.session().handshakes(), 1);
}

#[test]
fn broker_budget_ends_startup() {
    let mut node = build(
        test_config(NodeVariant::Flags),
        MockLink::new(),
        MockTransport::refusing(10),
        Vec::new(),
    );
    let mut sink = RecordingSink::new();

    let err = node.start(&mut NoDelay::default(), &mut RecordingHook::default(), &mut sink);

    assert_eq!(
        err,
        Err(Error::Broker(BrokerError::AttemptsExhausted { attempts: 3 }))
    );
    assert_eq!(
        sink.transitions,
        vec![
            (ConnectionState::Disconnected, ConnectionState::LinkUp),
            (ConnectionState::LinkUp, ConnectionState::BrokerConnecting),
        ]
    );
    assert!(sink.started.is_none());
}

#[test]
fn broker_stage_abort_is_cancellation() {
    let mut node = build(
        test_config(NodeVariant::Flags),
        MockLink::new(),
        MockTransport::refusing(10),
        Vec::new(),
    );
    let mut hook = RecordingHook {
        abort_at: Some((StartupStage::Broker, 2)),
        ..Default::default()
    };

    let err = node.start(&mut NoDelay::default(), &mut hook, &mut RecordingSink::new());

    assert_eq!(err, Err(Error::Broker(BrokerError::Cancelled)));
    assert_eq!(node.transport().connects(), 2);
}

#[test]
fn rejected_subscribe_reconnects_and_replays() {
    let mut transport = MockTransport::new();
    transport.fail_subscribes = 1;
    let mut node = build(test_config(NodeVariant::Flags), MockLink::new(), transport, Vec::new());
    let mut sink = RecordingSink::new();

    node.start(&mut NoDelay::default(), &mut RecordingHook::default(), &mut sink)
        .unwrap();

    assert_eq!(node.state(), NodeState::Running);
    assert_eq!(node.connection_state(), ConnectionState::BrokerConnected);
    assert_eq!(node.transport().connects(), 2);
    assert_eq!(
        node.transport().ops[1..],
        [
            "pub emqx/esp32 Hi, I'm VTMS LED Controller",
            "connect esp32-client-DE:AD:BE:EF:CA:FE",
            "sub emqx/esp32",
            "sub lemons/#",
        ]
    );
    assert!(sink.transitions.contains(&(
        ConnectionState::BrokerConnected,
        ConnectionState::BrokerConnecting
    )));
}

#[test]
fn rejected_resubscribe_uses_broker_budget() {
    let mut transport = MockTransport::new();
    transport.fail_subscribes = 10;
    let mut node = build(test_config(NodeVariant::Flags), MockLink::new(), transport, Vec::new());
    let mut hook = RecordingHook::default();

    let err = node.start(&mut NoDelay::default(), &mut hook, &mut RecordingSink::new());

    assert_eq!(
        err,
        Err(Error::Broker(BrokerError::AttemptsExhausted { attempts: 3 }))
    );
    assert_eq!(hook.retries, vec![(StartupStage::Broker, 1), (StartupStage::Broker, 2)]);
    // The first handshake, then three more for the replay.
    assert_eq!(node.transport().connects(), 4);
}

// ── Failed state is terminal ──────────────────────────────────

#[test]
fn failed_node_stays_inert() {
    let mut node = build(
        test_config(NodeVariant::Flags),
        MockLink::never(),
        MockTransport::new(),
        Vec::new(),
    );
    let mut sink = RecordingSink::new();
    let first = node.start(&mut NoDelay::default(), &mut RecordingHook::default(), &mut sink);
    assert!(first.is_err());

    // Even if the network shows up now, nothing happens.
    node.link_port_mut().polls_until_up = Some(0);
    node.transport_mut().deliver("lemons/flag/black", "true");
    let report = node.iterate(1_000, &mut sink);
    assert_eq!(report.delivered, 0);
    assert_eq!(report.sampled, 0);

    let again = node.start(&mut NoDelay::default(), &mut RecordingHook::default(), &mut sink);
    assert_eq!(again, first);
    assert_eq!(node.link_port().begins, 1);
    assert!(node.transport().ops.is_empty());
}

#[test]
fn iterate_before_start_does_nothing() {
    let mut node = build(
        test_config(NodeVariant::Flags),
        MockLink::new(),
        MockTransport::new(),
        Vec::new(),
    );
    let mut sink = RecordingSink::new();
    node.transport_mut().deliver("lemons/flag/black", "true");

    assert_eq!(node.iterate(0, &mut sink).delivered, 0);
    assert_eq!(node.state(), NodeState::Starting);
    assert!(node.transport().ops.is_empty());
}

// ── Configuration ─────────────────────────────────────────────

#[test]
fn invalid_config_is_rejected_before_io() {
    let mut config = test_config(NodeVariant::Flags);
    config.wifi.ssid.clear();
    let result = NodeLoop::new(
        config,
        client_id(),
        MockLink::new(),
        MockTransport::new(),
        MockPins::new(),
        Vec::new(),
    );
    assert_eq!(result.err(), Some(Error::Config(ConfigError::InvalidSsid)));
}

#[test]
fn shared_actuator_pin_is_rejected() {
    let mut config = test_config(NodeVariant::Flags);
    config.actuators[1].pin = config.actuators[0].pin;
    let pin = config.actuators[0].pin;
    let result = NodeLoop::new(
        config,
        client_id(),
        MockLink::new(),
        MockTransport::new(),
        MockPins::new(),
        Vec::new(),
    );
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::DuplicatePin(p))) if p == pin
    ));
}
