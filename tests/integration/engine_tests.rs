//! Integration tests for the switch → engine → scheduler → history pipeline.

use super::mock_hw::{FixedClock, MemStorage, MockAudio, MockBus, ScriptedSwitch};

use doorbell::app::events::EventKind;
use doorbell::app::service::DoorbellEngine;
use doorbell::config::{BusTopics, DoorbellConfig, HISTORY_FILE};
use doorbell::drivers::switch::SwitchDetector;
use doorbell::error::{Error, PlaybackError};
use doorbell::events::{BusFlags, InboundEvent};
use doorbell::scheduler::PlaybackState;

type Engine = DoorbellEngine<MockAudio, MemStorage, FixedClock>;

const PREFIX: &str = "/switches/doorbell/";

fn make_engine(config: DoorbellConfig, audio: MockAudio, storage: MemStorage) -> Engine {
    DoorbellEngine::new(
        config,
        BusTopics::from_prefix(PREFIX),
        SwitchDetector::new(),
        audio,
        storage,
        FixedClock::default(),
    )
}

fn default_engine() -> (Engine, MemStorage) {
    let storage = MemStorage::new();
    let engine = make_engine(DoorbellConfig::default(), MockAudio::new(10), storage.clone());
    (engine, storage)
}

/// Tick from `from` to `to` inclusive, one tick per millisecond.
fn run(engine: &mut Engine, sw: &mut ScriptedSwitch, bus: &mut MockBus, from: u64, to: u64) {
    for t in from..=to {
        engine.on_tick(BusFlags::default(), t, sw, bus);
    }
}

// ── Playback sequencing ───────────────────────────────────────

#[test]
fn two_play_throughs_with_delay() {
    let config = DoorbellConfig {
        play_count: 2,
        play_delay_ms: 1000,
        ..DoorbellConfig::default()
    };
    let storage = MemStorage::new();
    // Completion is reported on the 150th pump.
    let mut engine = make_engine(config, MockAudio::new(149), storage.clone());
    let mut sw = ScriptedSwitch::default();
    let mut bus = MockBus::connected();

    engine.ring(EventKind::ButtonPress, &mut bus).unwrap();
    assert_eq!(engine.playback_state(), PlaybackState::Playing { remaining: 2 });

    run(&mut engine, &mut sw, &mut bus, 1, 150);
    assert_eq!(
        engine.playback_state(),
        PlaybackState::ScheduledReplay {
            resume_at_ms: 1150,
            remaining: 1
        }
    );

    run(&mut engine, &mut sw, &mut bus, 151, 1149);
    assert!(matches!(engine.playback_state(), PlaybackState::ScheduledReplay { .. }));

    run(&mut engine, &mut sw, &mut bus, 1150, 1150);
    assert_eq!(engine.playback_state(), PlaybackState::Playing { remaining: 1 });
    assert_eq!(engine.audio().opens, 2);

    run(&mut engine, &mut sw, &mut bus, 1151, 1300);
    assert_eq!(engine.playback_state(), PlaybackState::Idle);
    assert_eq!(engine.audio().stops, 2);

    assert_eq!(engine.history().len(), 1);
    assert_eq!(
        engine.history().recent().next().map(|e| e.kind),
        Some(EventKind::ButtonPress)
    );
    assert_eq!(storage.get(HISTORY_FILE).map(|l| l.len()), Some(1));
    assert_eq!(bus.published_topics(), ["/switches/doorbell/playAudio"]);
}

#[test]
fn ring_while_playing_is_rejected() {
    let (mut engine, storage) = default_engine();
    let mut bus = MockBus::connected();

    engine.ring(EventKind::WebTrigger, &mut bus).unwrap();
    let state = engine.playback_state();
    let writes = storage.writes();

    for kind in [EventKind::WebTrigger, EventKind::BusTrigger, EventKind::ButtonPress] {
        assert_eq!(
            engine.ring(kind, &mut bus),
            Err(Error::Playback(PlaybackError::Busy))
        );
    }

    assert_eq!(engine.playback_state(), state);
    assert_eq!(engine.history().len(), 1);
    assert_eq!(storage.writes(), writes);
    assert_eq!(bus.published.len(), 1);
}

#[test]
fn ring_again_after_session_ends() {
    let (mut engine, _) = default_engine();
    let mut sw = ScriptedSwitch::default();
    let mut bus = MockBus::connected();

    engine.ring(EventKind::WebTrigger, &mut bus).unwrap();
    run(&mut engine, &mut sw, &mut bus, 1, 20);
    assert!(!engine.is_playing());

    engine.ring(EventKind::WebTrigger, &mut bus).unwrap();
    assert_eq!(engine.history().len(), 2);
}

#[test]
fn broken_track_neither_publishes_nor_records() {
    let storage = MemStorage::new();
    let mut engine = make_engine(DoorbellConfig::default(), MockAudio::broken(), storage.clone());
    let mut bus = MockBus::connected();

    let err = engine.ring(EventKind::WebTrigger, &mut bus).unwrap_err();
    assert!(matches!(err, Error::Playback(PlaybackError::DecoderInit(_))));
    assert!(!engine.is_playing());
    assert!(bus.published.is_empty());
    assert!(engine.history().is_empty());
    assert_eq!(storage.writes(), 0);
}

// ── Switch handling ───────────────────────────────────────────

#[test]
fn short_press_publishes_and_rings() {
    let (mut engine, _) = default_engine();
    let mut sw = ScriptedSwitch::default();
    let mut bus = MockBus::connected();

    run(&mut engine, &mut sw, &mut bus, 0, 9);
    sw.press();
    run(&mut engine, &mut sw, &mut bus, 10, 299);
    assert!(!engine.is_playing());
    sw.release();
    run(&mut engine, &mut sw, &mut bus, 300, 300);

    assert!(engine.is_playing());
    assert_eq!(
        bus.published_topics(),
        ["/switches/doorbell/press", "/switches/doorbell/playAudio"]
    );
    assert!(bus.published.iter().all(|(_, payload)| payload == "1"));
    assert_eq!(
        engine.history().recent().next().map(|e| e.kind),
        Some(EventKind::ButtonPress)
    );
}

#[test]
fn bounce_does_nothing() {
    let (mut engine, _) = default_engine();
    let mut sw = ScriptedSwitch::default();
    let mut bus = MockBus::connected();

    sw.press();
    run(&mut engine, &mut sw, &mut bus, 0, 40);
    sw.release();
    run(&mut engine, &mut sw, &mut bus, 41, 500);

    assert!(bus.published.is_empty());
    assert!(engine.history().is_empty());
}

#[test]
fn long_press_signals_without_playback() {
    let (mut engine, _) = default_engine();
    let mut sw = ScriptedSwitch::default();
    let mut bus = MockBus::connected();

    sw.press();
    run(&mut engine, &mut sw, &mut bus, 0, 7000);
    sw.release();
    run(&mut engine, &mut sw, &mut bus, 7001, 7200);

    assert!(!engine.is_playing());
    assert_eq!(bus.published_topics(), ["/switches/doorbell/longPress"]);
    let kinds: Vec<_> = engine.history().recent().map(|e| e.kind).collect();
    assert_eq!(kinds, [EventKind::AuxSignal]);
}

#[test]
fn press_while_playing_publishes_press_only() {
    // Long track so the session outlasts the press.
    let mut engine = make_engine(DoorbellConfig::default(), MockAudio::new(10_000), MemStorage::new());
    let mut sw = ScriptedSwitch::default();
    let mut bus = MockBus::connected();

    engine.ring(EventKind::WebTrigger, &mut bus).unwrap();
    bus.published.clear();

    sw.press();
    run(&mut engine, &mut sw, &mut bus, 0, 200);
    sw.release();
    run(&mut engine, &mut sw, &mut bus, 201, 201);

    assert!(engine.is_playing());
    assert_eq!(bus.published_topics(), ["/switches/doorbell/press"]);
    assert_eq!(engine.history().len(), 1);
}

#[test]
fn missing_switch_sample_is_ignored() {
    let (mut engine, _) = default_engine();
    let mut sw = ScriptedSwitch { level: None };
    let mut bus = MockBus::connected();

    run(&mut engine, &mut sw, &mut bus, 0, 6000);
    assert!(bus.published.is_empty());
}

// ── Inbound events and persistence ────────────────────────────

#[test]
fn web_ring_through_dispatch() {
    let (mut engine, _) = default_engine();
    let mut bus = MockBus::connected();
    let mut flags = BusFlags::default();

    engine.dispatch(InboundEvent::Ring(EventKind::WebTrigger), &mut flags, &mut bus);

    assert!(engine.is_playing());
    assert_eq!(flags, BusFlags::default());
    assert_eq!(
        engine.history().recent().next().map(|e| e.kind),
        Some(EventKind::WebTrigger)
    );
}

#[test]
fn ring_without_bus_still_plays_and_records() {
    let (mut engine, _) = default_engine();
    let mut bus = MockBus::default();

    engine.ring(EventKind::WebTrigger, &mut bus).unwrap();
    assert!(engine.is_playing());
    assert!(bus.published.is_empty());
    assert_eq!(engine.history().len(), 1);
}

#[test]
fn history_write_failure_is_not_fatal() {
    let (mut engine, storage) = default_engine();
    storage.set_fail_writes(true);
    let mut bus = MockBus::connected();

    engine.ring(EventKind::WebTrigger, &mut bus).unwrap();
    assert_eq!(engine.history().len(), 1);
    assert_eq!(storage.get(HISTORY_FILE), None);
}

#[test]
fn history_survives_restart() {
    let (mut engine, storage) = default_engine();
    let mut bus = MockBus::default();
    engine.ring(EventKind::WebTrigger, &mut bus).unwrap();
    drop(engine);

    let reborn = make_engine(DoorbellConfig::default(), MockAudio::new(1), storage.clone());
    let kinds: Vec<_> = reborn.history().recent().map(|e| e.kind).collect();
    assert_eq!(kinds, [EventKind::WebTrigger]);
    assert_eq!(
        storage.get(HISTORY_FILE).unwrap(),
        ["2024-11-23 12:49:17 doorbell through web"]
    );
}
