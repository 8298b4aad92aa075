//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the doorbell's business rules: ring arbitration,
//! switch event translation, topic following and history bookkeeping.
//! All interaction with hardware and the network happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
