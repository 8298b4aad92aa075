//! Doorbell event kinds.
//!
//! The closed set of things the history journal records and the engine
//! reacts to.  Each kind has a fixed description used in the persisted
//! history file.

use serde::Serialize;

/// What triggered a history entry (and, for the ring kinds, a playback).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Short press of the physical doorbell switch.
    ButtonPress,
    /// Long press of the switch: the courtyard lamp signal.
    AuxSignal,
    /// Ring requested through the web interface.
    WebTrigger,
    /// Ring requested by a followed bus topic.
    BusTrigger,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::ButtonPress,
        EventKind::AuxSignal,
        EventKind::WebTrigger,
        EventKind::BusTrigger,
    ];

    /// Text written after the timestamp in the history file.
    pub const fn description(self) -> &'static str {
        match self {
            Self::ButtonPress => "doorbell switch",
            Self::AuxSignal => "courtyard lamp",
            Self::WebTrigger => "doorbell through web",
            Self::BusTrigger => "doorbell through MQTT",
        }
    }

    /// Inverse of [`description`](Self::description).
    pub fn from_description(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.description() == text)
    }
}

impl core::fmt::Display for EventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.description())
    }
}
