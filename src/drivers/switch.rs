//! Doorbell switch debounce and edge detection.
//!
//! ## Hardware
//!
//! Active-low momentary switch with pull-up: the line idles high and reads
//! low while the button is held.  The main loop samples the raw level once
//! per tick through [`SwitchPort`] and feeds it to [`SwitchDetector::update`].
//!
//! ## Gesture detection
//!
//! | Gesture      | Condition                                  | Event          |
//! |--------------|--------------------------------------------|----------------|
//! | Press        | Falling edge with no press pending         | `Pressed`      |
//! | Short press  | Rising edge >= 100 ms after the press      | `Released`     |
//! | Bounce       | Rising edge < 100 ms after the press       | none           |
//! | Long press   | Held >= 5 s                                | `LongPressed`  |
//!
//! A release that follows a long press emits nothing.

use embedded_hal::digital::Error as _;
use log::{debug, warn};

use crate::app::ports::SwitchPort;

/// Minimum press duration before a release counts.
pub const SOFT_DEBOUNCE_MS: u64 = 100;
/// Hold time that turns a press into a long press.
pub const LONG_PRESS_MS: u64 = 5000;

/// Events emitted after edge classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchEvent {
    Pressed,
    Released,
    LongPressed,
}

pub struct SwitchDetector {
    enabled: bool,
    prev_level: bool,
    press_started_ms: Option<u64>,
}

impl Default for SwitchDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SwitchDetector {
    pub fn new() -> Self {
        Self {
            enabled: true,
            prev_level: true,
            press_started_ms: None,
        }
    }

    /// Detector for a board without a switch pin.  Never emits.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Build from the pin sentinel in [`crate::pins`].
    pub fn for_pin(gpio: Option<i32>) -> Self {
        match gpio {
            Some(_) => Self::new(),
            None => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a press edge was seen and not yet cleared.
    pub fn is_pressed(&self) -> bool {
        self.press_started_ms.is_some()
    }

    /// Call from the main loop at each tick with the raw line level
    /// (`true` = high = released).
    pub fn update(&mut self, raw_level: bool, now_ms: u64) -> Option<SwitchEvent> {
        if !self.enabled {
            return None;
        }

        let changed = self.prev_level != raw_level;
        let rising = changed && raw_level;
        let falling = changed && self.prev_level;
        self.prev_level = raw_level;

        if falling && self.press_started_ms.is_none() {
            self.press_started_ms = Some(now_ms);
            return Some(SwitchEvent::Pressed);
        }

        if rising {
            let started = self.press_started_ms.take()?;
            let held_ms = now_ms.saturating_sub(started);
            if held_ms >= SOFT_DEBOUNCE_MS {
                return Some(SwitchEvent::Released);
            }
            debug!("Switch: {} ms bounce ignored", held_ms);
            return None;
        }

        if let Some(started) = self.press_started_ms {
            if now_ms.saturating_sub(started) >= LONG_PRESS_MS {
                self.press_started_ms = None;
                return Some(SwitchEvent::LongPressed);
            }
        }

        None
    }

    /// Sample `port` and classify the level.  No sample, no event.
    pub fn poll(&mut self, port: &mut impl SwitchPort, now_ms: u64) -> Option<SwitchEvent> {
        if !self.enabled {
            return None;
        }
        let level = port.read_level()?;
        self.update(level, now_ms)
    }
}

/// [`SwitchPort`] over any `embedded-hal` input pin.
pub struct GpioSwitch<P> {
    pin: P,
}

impl<P: embedded_hal::digital::InputPin> GpioSwitch<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: embedded_hal::digital::InputPin> SwitchPort for GpioSwitch<P> {
    fn read_level(&mut self) -> Option<bool> {
        match self.pin.is_high() {
            Ok(level) => Some(level),
            Err(e) => {
                warn!("Switch: pin read failed: {:?}", e.kind());
                None
            }
        }
    }
}

/// A board without a switch samples nothing.
impl<S: SwitchPort> SwitchPort for Option<S> {
    fn read_level(&mut self) -> Option<bool> {
        self.as_mut()?.read_level()
    }
}
