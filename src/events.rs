//! Inbound event mailbox.
//!
//! Events are produced by:
//! - the MQTT client task (bus messages, connect/disconnect transitions)
//! - the HTTP server task (web ring requests)
//!
//! Events are consumed by the main loop, which drains the mailbox before
//! every engine tick.  Producers never touch the engine directly.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ MQTT task   │────▶│   INBOUND    │────▶│  Main Loop   │
//! │ HTTP task   │────▶│  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::String;
use log::warn;

use crate::app::events::EventKind;

/// Longest topic carried through the mailbox.
pub const MAX_TOPIC_LEN: usize = 128;
/// Longest payload carried through the mailbox.
pub const MAX_PAYLOAD_LEN: usize = 64;

/// Maximum number of pending events.
const INBOUND_DEPTH: usize = 16;

/// Something that happened outside the main task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A message arrived on a subscribed topic.  `payload` is `None` when
    /// the bytes are not UTF-8 or longer than [`MAX_PAYLOAD_LEN`].
    BusMessage {
        topic: String<MAX_TOPIC_LEN>,
        payload: Option<String<MAX_PAYLOAD_LEN>>,
    },
    /// A ring request from a non-bus source (web).
    Ring(EventKind),
    /// The bus client established a broker session.
    BusConnected,
    /// The bus client lost its broker session.
    BusDisconnected,
}

impl InboundEvent {
    /// Build a bus message, or `None` when the topic does not fit.
    pub fn bus_message(topic: &str, payload: &[u8]) -> Option<Self> {
        let topic = String::try_from(topic).ok()?;
        let payload = core::str::from_utf8(payload)
            .ok()
            .and_then(|p| String::try_from(p).ok());
        Some(Self::BusMessage { topic, payload })
    }
}

pub type InboundChannel = Channel<CriticalSectionRawMutex, InboundEvent, INBOUND_DEPTH>;

/// Producer tasks → main loop.
pub static INBOUND: InboundChannel = Channel::new();

/// Push an event into [`INBOUND`].
/// Returns `false` if the mailbox is full (event dropped).
pub fn push_event(event: InboundEvent) -> bool {
    push_to(&INBOUND, event)
}

pub fn push_to(channel: &InboundChannel, event: InboundEvent) -> bool {
    match channel.try_send(event) {
        Ok(()) => true,
        Err(_) => {
            warn!("Events: mailbox full, event dropped");
            false
        }
    }
}

/// Pop every pending event from [`INBOUND`], oldest first.
pub fn drain_events() -> impl Iterator<Item = InboundEvent> {
    drain_from(&INBOUND)
}

pub fn drain_from(channel: &InboundChannel) -> impl Iterator<Item = InboundEvent> + '_ {
    core::iter::from_fn(move || channel.try_receive().ok())
}

/// Bus session transitions seen since the last tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusFlags {
    pub connected: bool,
    pub disconnected: bool,
}

impl BusFlags {
    /// Fold a transition event into the flags.  Returns `false` for events
    /// that are not transitions.
    pub fn absorb(&mut self, event: &InboundEvent) -> bool {
        match event {
            InboundEvent::BusConnected => self.connected = true,
            InboundEvent::BusDisconnected => self.disconnected = true,
            _ => return false,
        }
        true
    }
}
