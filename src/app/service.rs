//! Doorbell engine: the hexagonal core.
//!
//! [`DoorbellEngine`] owns the configuration, the switch detector, the
//! playback scheduler, the followed-topic set and the history journal.
//! All I/O flows through port traits: storage, audio and clock are owned
//! by the engine, switch and bus are passed in at each call site.
//!
//! ```text
//!   SwitchPort ──▶ ┌─────────────────────────────┐ ──▶ BusPort (publish)
//!  InboundEvent ──▶│        DoorbellEngine        │
//!                  │ Detector · Scheduler · Log   │ ──▶ AudioPort
//!                  └─────────────────────────────┘ ──▶ StoragePort
//! ```
//!
//! Every ring source goes through [`DoorbellEngine::ring`], which is the
//! only place that starts playback.  A ring while a session is running is
//! rejected, so overlapping triggers collapse into one chime.

use log::{debug, error, info, warn};

use crate::config::{
    BUS_EVENT_PAYLOAD, BusTopics, DoorbellConfig, FollowedTopics, load_followed_topics,
};
use crate::drivers::switch::{SwitchDetector, SwitchEvent};
use crate::error::{self, PlaybackError};
use crate::events::{BusFlags, InboundEvent};
use crate::history::HistoryLog;
use crate::scheduler::{PlaybackScheduler, PlaybackState};

use super::events::EventKind;
use super::ports::{AudioPort, BusError, BusPort, ClockPort, StoragePort, SwitchPort};

// ───────────────────────────────────────────────────────────────
// DoorbellEngine
// ───────────────────────────────────────────────────────────────

pub struct DoorbellEngine<A: AudioPort, S: StoragePort, C: ClockPort> {
    config: DoorbellConfig,
    topics: BusTopics,
    followed: FollowedTopics,
    /// Whether every followed topic is subscribed on the current session.
    subscribed: bool,
    detector: SwitchDetector,
    scheduler: PlaybackScheduler<A>,
    history: HistoryLog,
    storage: S,
    clock: C,
}

impl<A: AudioPort, S: StoragePort, C: ClockPort> DoorbellEngine<A, S, C> {
    /// Build the engine and restore persisted state (history, followed
    /// topics) from `storage`.
    pub fn new(
        config: DoorbellConfig,
        topics: BusTopics,
        detector: SwitchDetector,
        audio: A,
        storage: S,
        clock: C,
    ) -> Self {
        let scheduler = PlaybackScheduler::new(audio, config.play_count, config.play_delay_ms);
        let mut history = HistoryLog::new();
        history.load(&storage);
        let followed = load_followed_topics(&storage);
        info!(
            "Engine: ready, {} history entries, {} followed topics",
            history.len(),
            followed.len()
        );

        Self {
            config,
            topics,
            followed,
            subscribed: false,
            detector,
            scheduler,
            history,
            storage,
            clock,
        }
    }

    // ── Ring arbitration ──────────────────────────────────────

    /// Start a ring session on behalf of `source`.
    ///
    /// On success the play-audio topic is published and `source` is
    /// recorded.  While a session is running the request is rejected with
    /// [`PlaybackError::Busy`] and nothing changes.
    pub fn ring(&mut self, source: EventKind, bus: &mut impl BusPort) -> error::Result<()> {
        if self.scheduler.is_active() {
            debug!("Engine: {} ignored, {}", source, PlaybackError::Busy);
            return Err(PlaybackError::Busy.into());
        }

        if let Err(e) = self.scheduler.begin(&self.config.track, self.config.gain) {
            error!("Engine: {} dropped: {}", source, e);
            return Err(e.into());
        }

        info!("Engine: ring ({})", source);
        let _ = publish(bus, &self.topics.play_audio);
        let _ = self.record(source);
        Ok(())
    }

    /// Journal `kind`.  The in-memory log always keeps the entry; the error
    /// only reports that the file was not rewritten.
    fn record(&mut self, kind: EventKind) -> error::Result<()> {
        let timestamp = self.clock.local_timestamp();
        self.history
            .record(kind, timestamp, &mut self.storage)
            .inspect_err(|e| warn!("Engine: history not persisted: {}", e))?;
        Ok(())
    }

    // ── Tick ──────────────────────────────────────────────────

    /// One main-loop iteration: bus session bookkeeping, switch sampling,
    /// then playback.
    pub fn on_tick(
        &mut self,
        flags: BusFlags,
        now_ms: u64,
        switch: &mut impl SwitchPort,
        bus: &mut impl BusPort,
    ) {
        self.track_bus_session(flags, bus);

        match self.detector.poll(switch, now_ms) {
            Some(SwitchEvent::Released) => {
                let _ = publish(bus, &self.topics.press);
                // Busy and decoder failures are already logged by ring().
                let _ = self.ring(EventKind::ButtonPress, bus);
            }
            Some(SwitchEvent::LongPressed) => {
                info!("Engine: long press");
                let _ = publish(bus, &self.topics.long_press);
                let _ = self.record(EventKind::AuxSignal);
            }
            Some(SwitchEvent::Pressed) => debug!("Engine: switch down"),
            None => {}
        }

        self.scheduler.tick(now_ms);
    }

    fn track_bus_session(&mut self, flags: BusFlags, bus: &mut impl BusPort) {
        let connected = bus.is_connected();

        if flags.disconnected || (!connected && self.subscribed) {
            if self.subscribed {
                info!("Engine: bus session lost");
            }
            self.subscribed = false;
        }

        if flags.connected || (connected && !self.subscribed) {
            self.resubscribe(bus);
        }
    }

    fn resubscribe(&mut self, bus: &mut impl BusPort) {
        self.followed = load_followed_topics(&self.storage);
        let mut all_ok = true;
        for entry in &self.followed {
            if let Err(e) = bus.subscribe(&entry.topic) {
                warn!("Engine: subscribe to {} failed: {}", entry.topic, e);
                all_ok = false;
            }
        }
        self.subscribed = all_ok;
        if all_ok {
            info!("Engine: following {} topics", self.followed.len());
        }
    }

    // ── Inbound events ────────────────────────────────────────

    /// Ring once per followed entry selected by `(topic, payload)`.
    /// `None` stands for a payload the mailbox could not carry.  Returns the
    /// number of matching entries.
    pub fn on_bus_message(
        &mut self,
        topic: &str,
        payload: Option<&str>,
        bus: &mut impl BusPort,
    ) -> usize {
        let hits = self
            .followed
            .iter()
            .filter(|f| f.matches(topic, payload))
            .count();
        for _ in 0..hits {
            let _ = self.ring(EventKind::BusTrigger, bus);
        }
        if hits == 0 {
            debug!("Engine: {} = {:?} not followed", topic, payload);
        }
        hits
    }

    /// Route one mailbox event.  Session transitions are folded into
    /// `flags` for the next [`on_tick`](Self::on_tick).
    pub fn dispatch(&mut self, event: InboundEvent, flags: &mut BusFlags, bus: &mut impl BusPort) {
        if flags.absorb(&event) {
            return;
        }
        match event {
            InboundEvent::BusMessage { topic, payload } => {
                self.on_bus_message(&topic, payload.as_deref(), bus);
            }
            InboundEvent::Ring(kind) => {
                let _ = self.ring(kind, bus);
            }
            InboundEvent::BusConnected | InboundEvent::BusDisconnected => {}
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.scheduler.state()
    }

    pub fn config(&self) -> &DoorbellConfig {
        &self.config
    }

    pub fn topics(&self) -> &BusTopics {
        &self.topics
    }

    pub fn followed_topics(&self) -> &FollowedTopics {
        &self.followed
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn audio(&self) -> &A {
        self.scheduler.audio()
    }
}

/// Publish an event marker.  While the bus is down nothing is sent and
/// the result is [`BusError::NotConnected`].
fn publish(bus: &mut impl BusPort, topic: &str) -> error::Result<()> {
    if !bus.is_connected() {
        debug!("Engine: bus down, {} not published", topic);
        return Err(BusError::NotConnected.into());
    }
    bus.publish(topic, BUS_EVENT_PAYLOAD)
        .inspect_err(|e| warn!("Engine: publish to {} failed: {}", topic, e))?;
    Ok(())
}
