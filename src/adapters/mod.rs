//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements   | Connects to                    |
//! |--------------|--------------|--------------------------------|
//! | `line_file`  | StoragePort  | SPIFFS / host directory        |
//! | `mqtt`       | BusPort      | ESP-IDF MQTT client            |
//! |              | (mailbox)    | inbound messages, transitions  |
//! | `time`       | ClockPort    | ESP32 system timer, SNTP clock |
//! | `device_id`  | (none)       | eFuse MAC → default hostname   |
//! | `web`        | (mailbox)    | ESP-IDF HTTP server            |
//!
//! The switch and audio adapters live in [`crate::drivers`].

pub mod device_id;
pub mod line_file;
pub mod mqtt;
pub mod time;
pub mod web;
