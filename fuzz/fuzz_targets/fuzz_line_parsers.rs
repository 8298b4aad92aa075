//! Fuzz target: flash text-file parsers
//!
//! Splits arbitrary input into lines the way `LineFileStore` does and runs
//! every parser that reads them: chime settings, followed topics and the
//! history journal.
//!
//! cargo fuzz run fuzz_line_parsers

#![no_main]

use libfuzzer_sys::fuzz_target;
use doorbell::adapters::line_file::clean_line;
use doorbell::config::{DoorbellConfig, MAX_FOLLOWED_TOPICS, MAX_GAIN, parse_followed_topics};
use doorbell::history::HistoryEntry;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let lines: Vec<String> = text.lines().map(|l| clean_line(l).to_string()).collect();

    let (cfg, _) = DoorbellConfig::from_lines(&lines);
    assert!(cfg.play_count >= 1);
    assert!((0.0..=MAX_GAIN).contains(&cfg.gain));

    let topics = parse_followed_topics(&lines);
    assert!(topics.len() <= MAX_FOLLOWED_TOPICS);
    for t in &topics {
        assert!(!t.topic.is_empty());
    }

    for line in &lines {
        if let Some(entry) = HistoryEntry::parse_line(line) {
            assert!(line.ends_with(entry.kind.description()));
        }
    }
});
