//! End-to-end scenarios for a flags board: startup traffic, actuator
//! commands, routing precedence and the debug toggle.

use vtms_node::drivers::actuator_bank::Level;
use vtms_node::error::DropReason;
use vtms_node::net::session::{ConnectionState, MAX_POLL_BATCH};
use vtms_node::pins;

use crate::mock_net::{RecordingSink, running_flags_node};

// ── Startup traffic ───────────────────────────────────────────

#[test]
fn hello_goes_out_before_subscriptions() {
    let mut sink = RecordingSink::new();
    let node = running_flags_node(&mut sink);

    assert_eq!(
        node.transport().ops,
        vec![
            "connect esp32-client-DE:AD:BE:EF:CA:FE",
            "pub emqx/esp32 Hi, I'm VTMS LED Controller",
            "sub emqx/esp32",
            "sub lemons/#",
        ]
    );
    assert_eq!(sink.started.as_deref(), Some("esp32-client-DE:AD:BE:EF:CA:FE"));
    assert_eq!(node.connection_state(), ConnectionState::BrokerConnected);
}

#[test]
fn outputs_start_low() {
    let mut sink = RecordingSink::new();
    let node = running_flags_node(&mut sink);

    let expected = [
        pins::BLACK_FLAG_GPIO,
        pins::RED_FLAG_GPIO,
        pins::PIT_SOON_GPIO,
        pins::BOX_BOX_GPIO,
    ];
    assert_eq!(node.pins().configured, expected);
    for pin in expected {
        assert_eq!(node.pins().level(pin), Some(Level::Low));
    }
}

// ── Actuator commands ─────────────────────────────────────────

#[test]
fn black_flag_follows_commands_and_ignores_junk() {
    let mut sink = RecordingSink::new();
    let mut node = running_flags_node(&mut sink);

    node.transport_mut().deliver("lemons/flag/black", "true");
    assert_eq!(node.iterate(0, &mut sink).delivered, 1);
    assert_eq!(node.pins().level(pins::BLACK_FLAG_GPIO), Some(Level::High));
    assert_eq!(node.bank().level("lemons/flag/black"), Some(Level::High));

    let writes = node.pins().writes.len();
    node.transport_mut().deliver("lemons/flag/black", "maybe");
    node.iterate(10, &mut sink);
    assert_eq!(node.pins().writes.len(), writes);
    assert_eq!(node.bank().level("lemons/flag/black"), Some(Level::High));
    assert_eq!(
        sink.dropped,
        vec![("lemons/flag/black".to_owned(), DropReason::MalformedPayload)]
    );

    node.transport_mut().deliver("lemons/flag/black", "false");
    node.iterate(20, &mut sink);
    assert_eq!(node.pins().level(pins::BLACK_FLAG_GPIO), Some(Level::Low));
}

#[test]
fn repeated_command_rewrites_without_change() {
    let mut sink = RecordingSink::new();
    let mut node = running_flags_node(&mut sink);

    node.transport_mut().deliver("lemons/box", "true");
    node.transport_mut().deliver("lemons/box", "true");
    node.iterate(0, &mut sink);

    let changes: Vec<bool> = sink.actuator_sets.iter().map(|(_, _, _, c)| *c).collect();
    assert_eq!(changes, vec![true, false]);
    let box_writes = node
        .pins()
        .writes
        .iter()
        .filter(|(pin, level)| *pin == pins::BOX_BOX_GPIO && *level == Level::High)
        .count();
    assert_eq!(box_writes, 2);
}

#[test]
fn commands_are_case_sensitive() {
    let mut sink = RecordingSink::new();
    let mut node = running_flags_node(&mut sink);

    node.transport_mut().deliver("lemons/flag/red", "TRUE");
    node.transport_mut().deliver("lemons/flag/red", " true");
    node.iterate(0, &mut sink);

    assert_eq!(node.bank().level("lemons/flag/red"), Some(Level::Low));
    assert_eq!(sink.dropped.len(), 2);
    assert!(sink.actuator_sets.is_empty());
}

// ── Routing ───────────────────────────────────────────────────

#[test]
fn unrouted_topic_has_no_side_effects() {
    let mut sink = RecordingSink::new();
    let mut node = running_flags_node(&mut sink);
    let writes = node.pins().writes.len();
    let ops = node.transport().ops.len();

    node.transport_mut().deliver("obd/rpm", "3000");
    assert_eq!(node.iterate(0, &mut sink).delivered, 1);

    assert_eq!(node.pins().writes.len(), writes);
    assert_eq!(node.transport().ops.len(), ops);
    assert_eq!(sink.dropped, vec![("obd/rpm".to_owned(), DropReason::UnroutableTopic)]);
}

#[test]
fn exact_topics_win_over_the_namespace_wildcard() {
    let mut sink = RecordingSink::new();
    let mut node = running_flags_node(&mut sink);

    node.transport_mut().deliver("lemons/pit", "true");
    node.transport_mut().deliver("lemons/temp/oil_F", "212");
    node.transport_mut().deliver("emqx/esp32", "hello");
    node.iterate(0, &mut sink);

    assert_eq!(sink.actuator_sets.len(), 1);
    assert_eq!(sink.actuator_sets[0].1, pins::PIT_SOON_GPIO);
    assert_eq!(
        sink.logged,
        vec![
            ("lemons/temp/oil_F".to_owned(), "212".to_owned()),
            ("emqx/esp32".to_owned(), "hello".to_owned()),
        ]
    );
}

#[test]
fn debug_topic_toggles_verbosity() {
    let mut sink = RecordingSink::new();
    let mut node = running_flags_node(&mut sink);
    assert!(!node.verbose());

    node.transport_mut().deliver("lemons/debug", "true");
    node.iterate(0, &mut sink);
    assert!(node.verbose());

    node.transport_mut().deliver("lemons/debug", "1");
    node.transport_mut().deliver("lemons/debug", "false");
    node.iterate(10, &mut sink);
    assert!(!node.verbose());
    assert_eq!(sink.verbosity, vec![true, false]);
    assert_eq!(sink.dropped, vec![("lemons/debug".to_owned(), DropReason::MalformedPayload)]);
    assert!(sink.logged.is_empty());
}

#[test]
fn delivery_is_bounded_per_iteration() {
    let mut sink = RecordingSink::new();
    let mut node = running_flags_node(&mut sink);

    for _ in 0..MAX_POLL_BATCH + 4 {
        node.transport_mut().deliver("lemons/pit", "true");
    }
    assert_eq!(node.iterate(0, &mut sink).delivered, MAX_POLL_BATCH);
    assert_eq!(node.iterate(10, &mut sink).delivered, 4);
    assert_eq!(node.iterate(20, &mut sink).delivered, 0);
}
