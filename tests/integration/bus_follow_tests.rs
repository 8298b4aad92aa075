//! Integration tests for bus session tracking and followed-topic rings.

use super::mock_hw::{FixedClock, MemStorage, MockAudio, MockBus, ScriptedSwitch};

use doorbell::app::events::EventKind;
use doorbell::app::service::DoorbellEngine;
use doorbell::config::{BusTopics, DoorbellConfig, FOLLOW_TOPICS_FILE};
use doorbell::drivers::switch::SwitchDetector;
use doorbell::events::{self, BusFlags, InboundEvent};

type Engine = DoorbellEngine<MockAudio, MemStorage, FixedClock>;

fn make_engine(follow: &[&str]) -> (Engine, MemStorage) {
    let storage = MemStorage::new().with_file(FOLLOW_TOPICS_FILE, follow);
    let engine = DoorbellEngine::new(
        DoorbellConfig::default(),
        BusTopics::from_prefix("/switches/doorbell/"),
        SwitchDetector::disabled(),
        MockAudio::new(5),
        storage.clone(),
        FixedClock::default(),
    );
    (engine, storage)
}

fn tick(engine: &mut Engine, flags: BusFlags, now_ms: u64, bus: &mut MockBus) {
    engine.on_tick(flags, now_ms, &mut ScriptedSwitch::default(), bus);
}

/// Tick until the current session is over.
fn settle(engine: &mut Engine, bus: &mut MockBus) {
    for t in 0..100 {
        tick(engine, BusFlags::default(), t, bus);
    }
    assert!(!engine.is_playing());
}

const CONNECTED: BusFlags = BusFlags {
    connected: true,
    disconnected: false,
};
const DISCONNECTED: BusFlags = BusFlags {
    connected: false,
    disconnected: true,
};

// ── Session tracking ──────────────────────────────────────────

#[test]
fn connect_subscribes_followed_topics() {
    let (mut engine, _) = make_engine(&["/home/gate", "/home/intercom,RING"]);
    let mut bus = MockBus::connected();

    tick(&mut engine, CONNECTED, 0, &mut bus);

    assert!(engine.is_subscribed());
    assert_eq!(bus.subscriptions, ["/home/gate", "/home/intercom"]);
    assert_eq!(engine.followed_topics().len(), 2);
    assert_eq!(
        engine.followed_topics()[1].match_value.as_deref(),
        Some("RING")
    );
}

#[test]
fn subscribes_once_per_session() {
    let (mut engine, _) = make_engine(&["/home/gate"]);
    let mut bus = MockBus::connected();

    for t in 0..10 {
        tick(&mut engine, BusFlags::default(), t, &mut bus);
    }
    assert_eq!(bus.subscriptions.len(), 1);
}

#[test]
fn disconnect_then_reconnect_reloads_file() {
    let (mut engine, storage) = make_engine(&["/home/gate"]);
    let mut bus = MockBus::connected();
    tick(&mut engine, CONNECTED, 0, &mut bus);

    bus.connected = false;
    tick(&mut engine, DISCONNECTED, 1, &mut bus);
    assert!(!engine.is_subscribed());

    storage.put(FOLLOW_TOPICS_FILE, &["/home/garage,OPEN"]);
    bus.connected = true;
    bus.subscriptions.clear();
    tick(&mut engine, CONNECTED, 2, &mut bus);

    assert!(engine.is_subscribed());
    assert_eq!(bus.subscriptions, ["/home/garage"]);
    assert_eq!(engine.followed_topics()[0].topic, "/home/garage");
}

#[test]
fn lost_session_without_event_is_noticed() {
    let (mut engine, _) = make_engine(&["/home/gate"]);
    let mut bus = MockBus::connected();
    tick(&mut engine, BusFlags::default(), 0, &mut bus);
    assert!(engine.is_subscribed());

    bus.connected = false;
    tick(&mut engine, BusFlags::default(), 1, &mut bus);
    assert!(!engine.is_subscribed());
}

#[test]
fn failed_subscription_keeps_flag_clear() {
    let (mut engine, _) = make_engine(&["/home/gate", "/home/intercom"]);
    let mut bus = MockBus {
        refuse: vec!["/home/intercom".to_string()],
        ..MockBus::connected()
    };

    tick(&mut engine, CONNECTED, 0, &mut bus);
    assert!(!engine.is_subscribed());

    bus.refuse.clear();
    tick(&mut engine, BusFlags::default(), 1, &mut bus);
    assert!(engine.is_subscribed());
}

#[test]
fn no_follow_file_follows_nothing() {
    let storage = MemStorage::new();
    let mut engine = DoorbellEngine::new(
        DoorbellConfig::default(),
        BusTopics::from_prefix("/switches/doorbell/"),
        SwitchDetector::disabled(),
        MockAudio::new(5),
        storage,
        FixedClock::default(),
    );
    let mut bus = MockBus::connected();

    tick(&mut engine, CONNECTED, 0, &mut bus);
    assert!(engine.is_subscribed());
    assert!(bus.subscriptions.is_empty());
    assert_eq!(engine.on_bus_message("/home/gate", Some("1"), &mut bus), 0);
}

// ── Followed-topic rings ──────────────────────────────────────

#[test]
fn match_value_requires_exact_payload() {
    let (mut engine, _) = make_engine(&["/home/intercom,RING"]);
    let mut bus = MockBus::connected();
    tick(&mut engine, CONNECTED, 0, &mut bus);

    assert_eq!(engine.on_bus_message("/home/intercom", Some("ring"), &mut bus), 0);
    assert_eq!(engine.on_bus_message("/home/intercom", Some("RING "), &mut bus), 0);
    assert!(!engine.is_playing());

    assert_eq!(engine.on_bus_message("/home/intercom", Some("RING"), &mut bus), 1);
    assert!(engine.is_playing());
    assert_eq!(
        engine.history().recent().next().map(|e| e.kind),
        Some(EventKind::BusTrigger)
    );
}

#[test]
fn topic_without_value_matches_any_payload() {
    let (mut engine, _) = make_engine(&["/home/gate"]);
    let mut bus = MockBus::connected();
    tick(&mut engine, CONNECTED, 0, &mut bus);

    for payload in ["1", "", "anything"] {
        assert_eq!(engine.on_bus_message("/home/gate", Some(payload), &mut bus), 1);
        assert!(engine.is_playing());
        settle(&mut engine, &mut bus);
    }
    assert_eq!(engine.history().len(), 3);
}

#[test]
fn unfollowed_topic_is_ignored() {
    let (mut engine, _) = make_engine(&["/home/gate"]);
    let mut bus = MockBus::connected();
    tick(&mut engine, CONNECTED, 0, &mut bus);

    assert_eq!(engine.on_bus_message("/home/gate/extra", Some("1"), &mut bus), 0);
    assert!(!engine.is_playing());
    assert!(engine.history().is_empty());
}

#[test]
fn duplicate_entries_ring_once() {
    let (mut engine, _) = make_engine(&["/home/gate", "/home/gate,1"]);
    let mut bus = MockBus::connected();
    tick(&mut engine, CONNECTED, 0, &mut bus);

    assert_eq!(engine.on_bus_message("/home/gate", Some("1"), &mut bus), 2);
    assert_eq!(engine.history().len(), 1);
    assert_eq!(bus.published_topics(), ["/switches/doorbell/playAudio"]);
}

#[test]
fn follow_file_stops_at_first_empty_line() {
    let (mut engine, _) = make_engine(&["/home/gate", "", "/home/never"]);
    let mut bus = MockBus::connected();
    tick(&mut engine, CONNECTED, 0, &mut bus);

    assert_eq!(bus.subscriptions, ["/home/gate"]);
}

#[test]
fn mailbox_round_trip() {
    let (mut engine, _) = make_engine(&["/home/gate"]);
    let mut bus = MockBus::connected();

    assert!(events::push_event(InboundEvent::BusConnected));
    assert!(events::push_event(
        InboundEvent::bus_message("/home/gate", b"1").unwrap()
    ));

    let mut flags = BusFlags::default();
    for event in events::drain_events() {
        engine.dispatch(event, &mut flags, &mut bus);
    }
    assert!(flags.connected);
    // The message arrived before the subscription tick; rings only need
    // the followed set, which was loaded at construction.
    assert!(engine.is_playing());

    tick(&mut engine, flags, 0, &mut bus);
    assert!(engine.is_subscribed());
}

#[test]
fn uncarried_payload_rings_bare_entries_only() {
    let (mut engine, _) = make_engine(&["/home/gate", "/home/intercom,RING"]);
    let mut bus = MockBus::connected();
    tick(&mut engine, CONNECTED, 0, &mut bus);

    let oversized = [b'x'; events::MAX_PAYLOAD_LEN + 1];
    let not_utf8: &[u8] = &[0xff, 0xfe, 0x00];
    let mut flags = BusFlags::default();

    for payload in [&oversized[..], not_utf8] {
        let event = InboundEvent::bus_message("/home/intercom", payload).unwrap();
        engine.dispatch(event, &mut flags, &mut bus);
        assert!(!engine.is_playing());

        let event = InboundEvent::bus_message("/home/gate", payload).unwrap();
        engine.dispatch(event, &mut flags, &mut bus);
        assert!(engine.is_playing());
        settle(&mut engine, &mut bus);
    }
    assert_eq!(engine.history().len(), 2);
}
