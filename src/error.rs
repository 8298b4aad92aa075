//! Unified error types for the doorbell firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the main loop
//! and the engine report failures uniformly.  All variants are `Copy`; none
//! of them is fatal to the process.

use core::fmt;

use crate::app::ports::{AudioError, BusError, StorageError};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible doorbell operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration was missing or malformed; defaults were applied.
    Config(ConfigError),
    /// A ring request could not start playback.
    Playback(PlaybackError),
    /// A persistent file could not be read or rewritten.
    Storage(StorageError),
    /// The message bus rejected a publish or subscribe.
    Bus(BusError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Playback(e) => write!(f, "playback: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Bus(e) => write!(f, "bus: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file does not exist or could not be read.
    Missing(&'static str),
    /// A field was present but could not be parsed or was out of range.
    /// The `&'static str` names the field.
    Malformed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(what) => write!(f, "{what} missing"),
            Self::Malformed(field) => write!(f, "{field} malformed"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Playback errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackError {
    /// A session is already playing or waiting for a replay.
    Busy,
    /// The decoder/output pipeline could not be opened.
    DecoderInit(AudioError),
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "audio playing has already started"),
            Self::DecoderInit(e) => write!(f, "cannot start audio: {e}"),
        }
    }
}

impl From<AudioError> for PlaybackError {
    fn from(e: AudioError) -> Self {
        Self::DecoderInit(e)
    }
}

impl From<PlaybackError> for Error {
    fn from(e: PlaybackError) -> Self {
        Self::Playback(e)
    }
}

// ---------------------------------------------------------------------------
// Port error conversions
// ---------------------------------------------------------------------------

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
