//! Mock adapters for integration tests.
//!
//! Each mock records what the engine asked of it so tests can assert on
//! the full interaction without a speaker, a broker or a flash chip.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use doorbell::app::ports::{
    AudioError, AudioPort, BusError, BusPort, ClockPort, StorageError, StoragePort, SwitchPort,
};
use doorbell::history::{Timestamp, timestamp_from};

// ── MockAudio ─────────────────────────────────────────────────

/// Track that renders for `frames` pumps, then reports completion on the
/// next pump.
pub struct MockAudio {
    pub frames: u32,
    pub left: u32,
    pub opens: u32,
    pub stops: u32,
    pub fail_open: bool,
}

#[allow(dead_code)]
impl MockAudio {
    pub fn new(frames: u32) -> Self {
        Self {
            frames,
            left: 0,
            opens: 0,
            stops: 0,
            fail_open: false,
        }
    }

    pub fn broken() -> Self {
        Self {
            fail_open: true,
            ..Self::new(0)
        }
    }
}

impl AudioPort for MockAudio {
    fn open(&mut self, _track: &str, _gain: f32) -> Result<(), AudioError> {
        if self.fail_open {
            return Err(AudioError::TrackNotFound);
        }
        self.opens += 1;
        self.left = self.frames;
        Ok(())
    }

    fn pump(&mut self) -> bool {
        if self.left == 0 {
            return false;
        }
        self.left -= 1;
        true
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}

// ── MockBus ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBus {
    pub connected: bool,
    pub published: Vec<(String, String)>,
    pub subscriptions: Vec<String>,
    /// Topics whose subscription is refused.
    pub refuse: Vec<String>,
}

#[allow(dead_code)]
impl MockBus {
    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    pub fn published_topics(&self) -> Vec<&str> {
        self.published.iter().map(|(t, _)| t.as_str()).collect()
    }
}

impl BusPort for MockBus {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), BusError> {
        if !self.connected {
            return Err(BusError::NotConnected);
        }
        self.published.push((topic.to_string(), payload.to_string()));
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), BusError> {
        if !self.connected {
            return Err(BusError::NotConnected);
        }
        if self.refuse.iter().any(|t| t == topic) {
            return Err(BusError::SubscribeFailed);
        }
        self.subscriptions.push(topic.to_string());
        Ok(())
    }
}

// ── MemStorage ────────────────────────────────────────────────

#[derive(Default)]
struct Files {
    files: HashMap<String, Vec<String>>,
    fail_writes: bool,
    writes: usize,
}

/// In-memory files.  Clones share the same contents so a test can keep a
/// handle after moving the store into the engine.
#[derive(Clone, Default)]
pub struct MemStorage(Rc<RefCell<Files>>);

#[allow(dead_code)]
impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, name: &str, lines: &[&str]) -> Self {
        self.put(name, lines);
        self
    }

    pub fn put(&self, name: &str, lines: &[&str]) {
        self.0
            .borrow_mut()
            .files
            .insert(name.to_string(), lines.iter().map(|l| l.to_string()).collect());
    }

    pub fn get(&self, name: &str) -> Option<Vec<String>> {
        self.0.borrow().files.get(name).cloned()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.0.borrow_mut().fail_writes = fail;
    }

    pub fn writes(&self) -> usize {
        self.0.borrow().writes
    }
}

impl StoragePort for MemStorage {
    fn read_lines(&self, name: &str) -> Result<Vec<String>, StorageError> {
        self.get(name).ok_or(StorageError::NotFound)
    }

    fn write_lines(&mut self, name: &str, lines: &[String]) -> Result<(), StorageError> {
        let mut inner = self.0.borrow_mut();
        if inner.fail_writes {
            return Err(StorageError::Io);
        }
        inner.writes += 1;
        inner.files.insert(name.to_string(), lines.to_vec());
        Ok(())
    }
}

// ── FixedClock ────────────────────────────────────────────────

pub struct FixedClock(pub &'static str);

impl Default for FixedClock {
    fn default() -> Self {
        Self("2024-11-23 12:49:17")
    }
}

impl ClockPort for FixedClock {
    fn local_timestamp(&self) -> Timestamp {
        timestamp_from(self.0)
    }
}

// ── ScriptedSwitch ────────────────────────────────────────────

/// Switch whose line level the test sets directly (`true` = released).
pub struct ScriptedSwitch {
    pub level: Option<bool>,
}

impl Default for ScriptedSwitch {
    fn default() -> Self {
        Self { level: Some(true) }
    }
}

#[allow(dead_code)]
impl ScriptedSwitch {
    pub fn press(&mut self) {
        self.level = Some(false);
    }

    pub fn release(&mut self) {
        self.level = Some(true);
    }
}

impl SwitchPort for ScriptedSwitch {
    fn read_level(&mut self) -> Option<bool> {
        self.level
    }
}
