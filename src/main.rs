//! Doorbell firmware entry point
//!
//! Hexagonal architecture with a single cooperative main loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  GpioSwitch     WavPlayer<I2sOutput>   LineFileStore           │
//! │  (SwitchPort)   (AudioPort)            (StoragePort)           │
//! │  MqttAdapter    SystemClock            HTTP server             │
//! │  (BusPort)      (ClockPort)            (mailbox producer)      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              DoorbellEngine (pure logic)               │    │
//! │  │  Detector · PlaybackScheduler · HistoryLog             │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  INBOUND mailbox: MQTT task + httpd task ──▶ main loop         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::{Result, anyhow};
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyIOPin, Input, PinDriver, Pull};
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::EspSntp;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use doorbell::adapters::device_id::{default_hostname, read_mac};
use doorbell::adapters::line_file::{LineFileStore, SPIFFS_BASE, mount_spiffs};
use doorbell::adapters::mqtt::{MqttAdapter, MqttSettings};
use doorbell::adapters::time::SystemClock;
use doorbell::adapters::web::{self, InfoSource};
use doorbell::app::service::DoorbellEngine;
use doorbell::config::{self, BusTopics, DoorbellConfig, TIMEZONE};
use doorbell::drivers::audio::{I2sOutput, WavPlayer};
use doorbell::drivers::switch::{GpioSwitch, SwitchDetector};
use doorbell::error::Error;
use doorbell::events::{self, BusFlags};
use doorbell::pins;

// ── Build-time settings ───────────────────────────────────────

const WIFI_SSID: &str = match option_env!("DOORBELL_WIFI_SSID") {
    Some(s) => s,
    None => "",
};
const WIFI_PASS: &str = match option_env!("DOORBELL_WIFI_PASS") {
    Some(s) => s,
    None => "",
};
const MQTT_URL: &str = match option_env!("DOORBELL_MQTT_URL") {
    Some(s) => s,
    None => "",
};

type SwitchPin = PinDriver<'static, AnyIOPin, Input>;

// ── Helpers ───────────────────────────────────────────────────

fn connect_wifi(
    modem: Modem,
    sysloop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
    hostname: &str,
) -> Result<BlockingWifi<EspWifi<'static>>> {
    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), Some(nvs))?, sysloop)?;
    wifi.wifi_mut().sta_netif_mut().set_hostname(hostname)?;
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: WIFI_SSID.try_into().map_err(|_| anyhow!("SSID too long"))?,
        password: WIFI_PASS.try_into().map_err(|_| anyhow!("password too long"))?,
        auth_method: if WIFI_PASS.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;
    info!("WiFi: connected to '{}' as {}", WIFI_SSID, hostname);
    Ok(wifi)
}

fn switch_pin(gpio: Option<i32>) -> Option<GpioSwitch<SwitchPin>> {
    let gpio = gpio?;
    // SAFETY: the pin number comes from `pins` and is claimed nowhere else.
    let pin = unsafe { AnyIOPin::new(gpio) };
    let mut driver = match PinDriver::input(pin) {
        Ok(d) => d,
        Err(e) => {
            warn!("Switch: GPIO{} unavailable: {}", gpio, e);
            return None;
        }
    };
    if let Err(e) = driver.set_pull(Pull::Up) {
        warn!("Switch: GPIO{} pull-up failed: {}", gpio, e);
    }
    Some(GpioSwitch::new(driver))
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Doorbell v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // SAFETY: single-threaded at this point; nothing else reads the
    // environment concurrently.
    unsafe {
        std::env::set_var("TZ", TIMEZONE);
        esp_idf_svc::sys::tzset();
    }

    // ── 2. Storage: the only fatal failure ────────────────────
    mount_spiffs().map_err(Error::from)?;
    let store = LineFileStore::new(SPIFFS_BASE);

    // ── 3. Configuration and identity ─────────────────────────
    let doorbell_cfg = DoorbellConfig::load(&store).unwrap_or_else(|e| {
        warn!("{}, using defaults", Error::from(e));
        DoorbellConfig::default()
    });
    let mac = read_mac();
    let hostname = config::resolve_hostname(&store, &default_hostname(&mac));
    let prefix = config::resolve_topic_prefix(&store, &hostname);
    info!("Identity: host '{}', topic prefix '{}'", hostname, prefix);

    // ── 4. Network ────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let _wifi = match connect_wifi(peripherals.modem, sysloop, nvs, &hostname) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!("WiFi: {}, running without network", e);
            None
        }
    };
    let _sntp = EspSntp::new_default()
        .inspect_err(|e| warn!("SNTP: {}", e))
        .ok();

    let mut bus = MqttAdapter::start(&MqttSettings {
        url: MQTT_URL.to_string(),
        client_id: hostname.clone(),
        username: option_env!("DOORBELL_MQTT_USER").map(str::to_string),
        password: option_env!("DOORBELL_MQTT_PASS").map(str::to_string),
    });

    let _http = web::start(InfoSource {
        host_name: hostname.clone(),
        topic_prefix: prefix.clone(),
        doorbell: doorbell_cfg.clone(),
    })
    .inspect_err(|e| warn!("Web: {}", e))
    .ok();

    // ── 5. Engine ─────────────────────────────────────────────
    let mut switch = switch_pin(pins::DOORBELL_SWITCH_GPIO);
    let detector = SwitchDetector::for_pin(pins::DOORBELL_SWITCH_GPIO);
    let audio = WavPlayer::new(I2sOutput::new(), SPIFFS_BASE);
    let clock = SystemClock::new();
    if !clock.is_wall_clock_set() {
        warn!("Time: wall clock not synced yet, early history entries carry boot time");
    }
    let mut engine = DoorbellEngine::new(
        doorbell_cfg,
        BusTopics::from_prefix(&prefix),
        detector,
        audio,
        store,
        SystemClock::new(),
    );

    info!("System ready. Entering main loop.");

    // ── 6. Main loop ──────────────────────────────────────────
    let mut flags = BusFlags::default();
    loop {
        for event in events::drain_events() {
            engine.dispatch(event, &mut flags, &mut bus);
        }
        engine.on_tick(
            core::mem::take(&mut flags),
            clock.uptime_ms(),
            &mut switch,
            &mut bus,
        );
        FreeRtos::delay_ms(1);
    }
}
