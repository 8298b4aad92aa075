//! Port traits: the hexagonal boundary between the doorbell core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DoorbellEngine (domain)
//! ```
//!
//! Driven adapters (switch GPIO, audio pipeline, MQTT client, flash files,
//! wall clock) implement these traits.  The
//! [`DoorbellEngine`](super::service::DoorbellEngine) consumes them via
//! generics, so the core never touches hardware or sockets directly.

use crate::history::Timestamp;

// ───────────────────────────────────────────────────────────────
// Switch port (driven adapter: GPIO → domain)
// ───────────────────────────────────────────────────────────────

/// Raw doorbell switch sampling.
pub trait SwitchPort {
    /// Sample the raw line level (`true` = high = released).
    /// Returns `None` when no sample is available this tick.
    fn read_level(&mut self) -> Option<bool>;
}

// ───────────────────────────────────────────────────────────────
// Audio port (driven adapter: domain → decoder + output)
// ───────────────────────────────────────────────────────────────

/// A decoder/output pipeline that the playback scheduler drives cooperatively.
///
/// The scheduler calls [`open`](Self::open) for every play-through, then
/// [`pump`](Self::pump) once per tick until it returns `false`, then
/// [`stop`](Self::stop).  `open` must tear down whatever pipeline existed
/// before and start the track from its first frame.
pub trait AudioPort {
    /// Build a fresh pipeline for `track` at the given output gain.
    fn open(&mut self, track: &str, gain: f32) -> Result<(), AudioError>;

    /// Push the next slice of decoded audio to the output without blocking.
    /// Returns `false` once the whole track has been rendered.
    fn pump(&mut self) -> bool;

    /// Release the output after a completed play-through.
    fn stop(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Bus port (driven adapter: domain ↔ MQTT)
// ───────────────────────────────────────────────────────────────

/// Publish/subscribe access to the message bus.
///
/// Inbound messages do not flow through this trait: they are queued by the
/// adapter as [`InboundEvent`](crate::events::InboundEvent)s and delivered
/// to the engine by the main loop.
pub trait BusPort {
    /// Whether the client currently holds a broker session.
    fn is_connected(&self) -> bool;

    /// Publish `payload` on `topic`.
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), BusError>;

    /// Subscribe to `topic`.
    fn subscribe(&mut self, topic: &str) -> Result<(), BusError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ flash filesystem)
// ───────────────────────────────────────────────────────────────

/// Line-oriented persistent files.
///
/// Implementations strip `;` comments and trailing blanks on read, and
/// keep empty lines so that line indices stay meaningful.  `write_lines`
/// replaces the whole file; no handle is held between calls.
pub trait StoragePort {
    /// Read every line of `name`.
    fn read_lines(&self, name: &str) -> Result<Vec<String>, StorageError>;

    /// Rewrite `name` so that it contains exactly `lines`.
    fn write_lines(&mut self, name: &str, lines: &[String]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: RTC / SNTP → domain)
// ───────────────────────────────────────────────────────────────

/// Human-readable local wall-clock time for history entries.
pub trait ClockPort {
    /// Current local time as `YYYY-MM-DD HH:MM:SS`.
    fn local_timestamp(&self) -> Timestamp;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`AudioPort::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioError {
    /// The track file does not exist.
    TrackNotFound,
    /// The track is not a supported PCM WAV stream.
    UnsupportedFormat,
    /// The output peripheral could not be configured.
    OutputInit,
    /// Reading the track failed.
    Io,
}

/// Errors from [`BusPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// No broker session is established.
    NotConnected,
    /// The client refused or failed to enqueue the publish.
    PublishFailed,
    /// The client refused or failed to enqueue the subscribe.
    SubscribeFailed,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested file does not exist.
    NotFound,
    /// Generic I/O error (mount missing, partition full, short write).
    Io,
}

impl core::fmt::Display for AudioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TrackNotFound => write!(f, "track not found"),
            Self::UnsupportedFormat => write!(f, "unsupported audio format"),
            Self::OutputInit => write!(f, "audio output init failed"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for BusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "file not found"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}
