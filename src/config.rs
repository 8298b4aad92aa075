//! System configuration parameters
//!
//! Everything the doorbell reads from flash at boot: the chime settings in
//! `doorbell.txt`, the followed bus topics, and the identity files that
//! determine the hostname and the bus topic prefix.  Every value has a
//! default; a missing or malformed line only affects its own field.

use heapless::Vec as BoundedVec;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::StoragePort;
use crate::error::ConfigError;
use crate::events::MAX_TOPIC_LEN;

// --- Files (relative to the storage root) ---
/// Chime settings: track, play count, inter-play delay, gain (one per line).
pub const CONFIG_FILE: &str = "doorbell.txt";
/// Followed bus topics: `topic` or `topic,value` per line.
pub const FOLLOW_TOPICS_FILE: &str = "doorbell_mqtt_follow.txt";
/// Persisted event history, newest first.
pub const HISTORY_FILE: &str = "doorbell_history.txt";
/// Optional hostname override (line 0).
pub const HOSTNAME_FILE: &str = "hostname.txt";
/// Optional bus topic (line 0) and full topic prefix override (line 2).
pub const BUS_TOPIC_FILE: &str = "mqtt_topic.txt";

// --- Defaults ---
pub const DEFAULT_TRACK: &str = "doorbell.wav";
pub const DEFAULT_PLAY_COUNT: u8 = 1;
pub const DEFAULT_PLAY_DELAY_MS: u32 = 1000;
pub const DEFAULT_GAIN: f32 = 1.0;
/// Highest gain the output stage accepts.
pub const MAX_GAIN: f32 = 4.0;

/// Upper bound on followed topics.
pub const MAX_FOLLOWED_TOPICS: usize = 8;

/// Hostname stem; the last three MAC bytes are appended.
pub const DEFAULT_HOSTNAME: &str = "doorbell";
/// Root under which the default topic prefix is built.
pub const TOPIC_ROOT: &str = "/switches/";
/// Payload published on every doorbell topic.
pub const BUS_EVENT_PAYLOAD: &str = "1";

/// POSIX TZ rule for local timestamps (Central European Time).
pub const TIMEZONE: &str = "CET-1CEST,M3.5.0,M10.5.0/3";

/// Chime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorbellConfig {
    /// Audio file played on ring, relative to the storage root.
    pub track: String,
    /// Number of play-throughs per ring (≥ 1).
    pub play_count: u8,
    /// Pause between two play-throughs (milliseconds).
    pub play_delay_ms: u32,
    /// Output gain (0.0 – 4.0).
    pub gain: f32,
}

impl Default for DoorbellConfig {
    fn default() -> Self {
        Self {
            track: DEFAULT_TRACK.to_string(),
            play_count: DEFAULT_PLAY_COUNT,
            play_delay_ms: DEFAULT_PLAY_DELAY_MS,
            gain: DEFAULT_GAIN,
        }
    }
}

impl DoorbellConfig {
    /// Build a configuration from the lines of [`CONFIG_FILE`].
    ///
    /// Returns the configuration plus one [`ConfigError::Malformed`] per
    /// field that was present but rejected.  Absent or empty lines silently
    /// take their default.
    pub fn from_lines(lines: &[String]) -> (Self, BoundedVec<ConfigError, 4>) {
        let mut cfg = Self::default();
        let mut issues = BoundedVec::new();
        let line = |idx: usize| lines.get(idx).map(String::as_str).unwrap_or("");

        if !line(0).is_empty() {
            cfg.track = line(0).to_string();
        }

        match line(1) {
            "" => {}
            s => match s.trim().parse::<u8>() {
                Ok(n) if n >= 1 => cfg.play_count = n,
                _ => {
                    let _ = issues.push(ConfigError::Malformed("play count"));
                }
            },
        }

        match line(2) {
            "" => {}
            s => match s.trim().parse::<u32>() {
                Ok(ms) => cfg.play_delay_ms = ms,
                Err(_) => {
                    let _ = issues.push(ConfigError::Malformed("play delay"));
                }
            },
        }

        match line(3) {
            "" => {}
            s => match s.trim().parse::<f32>() {
                Ok(g) if g.is_finite() && (0.0..=MAX_GAIN).contains(&g) => cfg.gain = g,
                _ => {
                    let _ = issues.push(ConfigError::Malformed("gain"));
                }
            },
        }

        (cfg, issues)
    }

    /// Load [`CONFIG_FILE`] from storage.
    ///
    /// `Err(ConfigError::Missing)` means the file could not be read; the
    /// caller falls back to [`DoorbellConfig::default`].  Malformed fields
    /// are logged and replaced by their defaults.
    pub fn load(storage: &impl StoragePort) -> Result<Self, ConfigError> {
        let lines = storage
            .read_lines(CONFIG_FILE)
            .map_err(|_| ConfigError::Missing(CONFIG_FILE))?;
        let (cfg, issues) = Self::from_lines(&lines);
        for issue in &issues {
            warn!("Config: {} in {}, using default", issue, CONFIG_FILE);
        }
        info!(
            "Config: track='{}' count={} delay={}ms gain={:.2}",
            cfg.track, cfg.play_count, cfg.play_delay_ms, cfg.gain
        );
        Ok(cfg)
    }
}

// ───────────────────────────────────────────────────────────────
// Followed topics
// ───────────────────────────────────────────────────────────────

/// A bus topic whose messages ring the bell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowedTopic {
    pub topic: String,
    /// Payload that must match exactly; `None` accepts any payload.
    pub match_value: Option<String>,
}

impl FollowedTopic {
    /// Parse `topic` or `topic,value`.  Returns `None` for an empty topic.
    pub fn parse(line: &str) -> Option<Self> {
        let (topic, value) = match line.split_once(',') {
            Some((t, v)) => (t, Some(v)),
            None => (line, None),
        };
        if topic.is_empty() {
            return None;
        }
        Some(Self {
            topic: topic.to_string(),
            match_value: value.filter(|v| !v.is_empty()).map(str::to_string),
        })
    }

    /// Whether an inbound `(topic, payload)` pair selects this entry.
    /// A `None` payload (not carried) only selects entries without a value.
    pub fn matches(&self, topic: &str, payload: Option<&str>) -> bool {
        self.topic == topic
            && match self.match_value.as_deref() {
                None => true,
                Some(v) => payload == Some(v),
            }
    }
}

/// The bounded followed-topic set.
pub type FollowedTopics = BoundedVec<FollowedTopic, MAX_FOLLOWED_TOPICS>;

/// Parse followed-topic lines.  Parsing stops at the first empty line and
/// after [`MAX_FOLLOWED_TOPICS`] entries.  Topics longer than the mailbox
/// can carry are skipped.
pub fn parse_followed_topics(lines: &[String]) -> FollowedTopics {
    let mut topics = FollowedTopics::new();
    for line in lines {
        let Some(entry) = FollowedTopic::parse(line) else {
            break;
        };
        if entry.topic.len() > MAX_TOPIC_LEN {
            warn!("Config: followed topic longer than {} bytes skipped", MAX_TOPIC_LEN);
            continue;
        }
        if topics.push(entry).is_err() {
            warn!(
                "Config: more than {} followed topics, ignoring the rest",
                MAX_FOLLOWED_TOPICS
            );
            break;
        }
    }
    topics
}

/// Load [`FOLLOW_TOPICS_FILE`]; a missing file means nothing is followed.
pub fn load_followed_topics(storage: &impl StoragePort) -> FollowedTopics {
    match storage.read_lines(FOLLOW_TOPICS_FILE) {
        Ok(lines) => parse_followed_topics(&lines),
        Err(e) => {
            info!("Config: {} not readable ({}), following no topics", FOLLOW_TOPICS_FILE, e);
            FollowedTopics::new()
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Identity and published topics
// ───────────────────────────────────────────────────────────────

/// Topics the doorbell publishes on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusTopics {
    pub play_audio: String,
    pub press: String,
    pub long_press: String,
}

impl BusTopics {
    /// `prefix` is used verbatim, so it normally ends in `/`.
    pub fn from_prefix(prefix: &str) -> Self {
        Self {
            play_audio: format!("{prefix}playAudio"),
            press: format!("{prefix}press"),
            long_press: format!("{prefix}longPress"),
        }
    }
}

/// Resolve the hostname: line 0 of [`HOSTNAME_FILE`] or the MAC-derived default.
pub fn resolve_hostname(storage: &impl StoragePort, default: &str) -> String {
    first_line(storage, HOSTNAME_FILE, 0).unwrap_or_else(|| default.to_string())
}

/// Resolve the bus topic prefix.
///
/// Line 2 of [`BUS_TOPIC_FILE`] overrides everything; otherwise the prefix is
/// `/switches/<topic>/` where `<topic>` is line 0 of that file or the hostname.
pub fn resolve_topic_prefix(storage: &impl StoragePort, hostname: &str) -> String {
    if let Some(prefix) = first_line(storage, BUS_TOPIC_FILE, 2) {
        return prefix;
    }
    let topic = first_line(storage, BUS_TOPIC_FILE, 0).unwrap_or_else(|| {
        info!("Config: using hostname '{}' as bus topic", hostname);
        hostname.to_string()
    });
    format!("{TOPIC_ROOT}{topic}/")
}

fn first_line(storage: &impl StoragePort, name: &str, idx: usize) -> Option<String> {
    storage
        .read_lines(name)
        .ok()
        .and_then(|lines| lines.into_iter().nth(idx))
        .filter(|l| !l.is_empty())
}
