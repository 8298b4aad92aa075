//! HTTP trigger and export endpoints.
//!
//! | Route                     | Effect                                        |
//! |---------------------------|-----------------------------------------------|
//! | `/doorbell.htm?bell=RING` | enqueue `InboundEvent::Ring(WebTrigger)`      |
//! | `/history.json`           | persisted history, newest first               |
//! | `/info.json`              | identity and chime configuration              |
//!
//! Handlers run on the httpd task.  They never touch the engine: rings go
//! through the mailbox and exports read the files the engine persists.

use log::info;
use serde::Serialize;

use crate::app::events::EventKind;
use crate::app::ports::StoragePort;
use crate::config::DoorbellConfig;
use crate::events::{self, InboundEvent};
use crate::history::HistoryLog;

pub const RING_PATH: &str = "/doorbell.htm";
pub const HISTORY_PATH: &str = "/history.json";
pub const INFO_PATH: &str = "/info.json";

/// Whether a request URI carries `bell=RING` in its query string.
pub fn ring_requested(uri: &str) -> bool {
    uri.split_once('?')
        .is_some_and(|(_, query)| query.split('&').any(|pair| pair == "bell=RING"))
}

/// Handle a ring request URI.  Returns `true` when a ring was enqueued.
pub fn handle_ring(uri: &str) -> bool {
    if !ring_requested(uri) {
        return false;
    }
    info!("Web: ring requested");
    events::push_event(InboundEvent::Ring(EventKind::WebTrigger))
}

/// Reply body for a ring request.  Enqueueing only asks the engine to ring;
/// a session already playing still rejects it.
pub fn ring_reply(enqueued: bool) -> &'static str {
    if enqueued { "requested" } else { "ignored" }
}

/// Serialise the persisted history as a JSON array.
pub fn history_json(storage: &impl StoragePort) -> Result<String, serde_json::Error> {
    let mut log = HistoryLog::new();
    log.load(storage);
    serde_json::to_string(&log.recent().collect::<Vec<_>>())
}

/// Body of [`INFO_PATH`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo<'a> {
    pub host_name: &'a str,
    pub mac_address: String,
    pub version: &'static str,
    pub uptime_ms: u64,
    pub topic_prefix: &'a str,
    pub doorbell: &'a DoorbellConfig,
}

impl<'a> DeviceInfo<'a> {
    pub fn new(
        host_name: &'a str,
        mac: &[u8; 6],
        uptime_ms: u64,
        topic_prefix: &'a str,
        doorbell: &'a DoorbellConfig,
    ) -> Self {
        let mac_address = mac
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":");
        Self {
            host_name,
            mac_address,
            version: env!("CARGO_PKG_VERSION"),
            uptime_ms,
            topic_prefix,
            doorbell,
        }
    }
}

#[cfg(target_os = "espidf")]
pub use server::{InfoSource, start};

#[cfg(target_os = "espidf")]
mod server {
    use std::sync::Arc;

    use esp_idf_svc::http::Method;
    use esp_idf_svc::http::server::{Configuration, EspHttpServer};
    use esp_idf_svc::io::Write;
    use esp_idf_svc::sys::EspError;

    use super::*;
    use crate::adapters::device_id::read_mac;
    use crate::adapters::line_file::{LineFileStore, SPIFFS_BASE};
    use crate::adapters::time::SystemClock;

    /// Static facts the info endpoint reports.
    pub struct InfoSource {
        pub host_name: String,
        pub topic_prefix: String,
        pub doorbell: DoorbellConfig,
    }

    pub fn start(info_src: InfoSource) -> Result<EspHttpServer<'static>, EspError> {
        let mut server = EspHttpServer::new(&Configuration::default())?;
        let info_src = Arc::new(info_src);

        server.fn_handler(RING_PATH, Method::Get, |req| {
            let body = ring_reply(handle_ring(req.uri())).as_bytes();
            req.into_ok_response()?.write_all(body)
        })?;

        server.fn_handler(HISTORY_PATH, Method::Get, |req| {
            let store = LineFileStore::new(SPIFFS_BASE);
            let body = history_json(&store).unwrap_or_else(|_| "[]".to_string());
            req.into_response(200, None, &[("Content-Type", "application/json")])?
                .write_all(body.as_bytes())
        })?;

        server.fn_handler(INFO_PATH, Method::Get, move |req| {
            let clock = SystemClock::new();
            let info = DeviceInfo::new(
                &info_src.host_name,
                &read_mac(),
                clock.uptime_ms(),
                &info_src.topic_prefix,
                &info_src.doorbell,
            );
            let body = serde_json::to_string(&info).unwrap_or_else(|_| "{}".to_string());
            req.into_response(200, None, &[("Content-Type", "application/json")])?
                .write_all(body.as_bytes())
        })?;

        info!("Web: HTTP server started");
        Ok(server)
    }
}
