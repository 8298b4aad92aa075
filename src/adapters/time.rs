//! ESP32 time adapter.
//!
//! - **`target_os = "espidf"`**: uptime from `esp_timer_get_time()`
//!   (microsecond precision, monotonic); wall clock from the C library,
//!   set by SNTP and interpreted through the `TZ` variable.
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` and the
//!   host clock for testing and simulation.

use chrono::{Local, Utc};

use crate::app::ports::ClockPort;
use crate::history::{Timestamp, timestamp_from};

/// Timestamps before 2020-01-01 mean SNTP has not synced yet.
const EPOCH_2020: i64 = 1_577_836_800;

/// Format used for history entries.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_ms(&self) -> u64 {
        // SAFETY: plain read of the high-resolution timer.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Whether the wall clock has been set (SNTP synced).
    pub fn is_wall_clock_set(&self) -> bool {
        Utc::now().timestamp() >= EPOCH_2020
    }
}

impl ClockPort for SystemClock {
    fn local_timestamp(&self) -> Timestamp {
        timestamp_from(&Local::now().format(TIMESTAMP_FORMAT).to_string())
    }
}
