//! Playback scheduler.
//!
//! Runs one ring session at a time: `play_count` play-throughs of the
//! configured track with a fixed pause between the end of one and the
//! start of the next.  Nothing here blocks; the main loop calls
//! [`PlaybackScheduler::tick`] every iteration and the scheduler either
//! pumps the decoder or checks whether the pause has elapsed.
//!
//! ```text
//!            begin()                 pump() == false
//!   Idle ─────────────▶ Playing ──────────────────────┐
//!    ▲                    ▲                           │ remaining -= 1
//!    │                    │ now >= resume_at_ms       ▼
//!    │                    └──────────── ScheduledReplay   (remaining > 0)
//!    └────────────────────────────────────────────────┘   (remaining == 0)
//! ```

use log::{debug, info, warn};

use crate::app::ports::AudioPort;
use crate::error::PlaybackError;

// ═══════════════════════════════════════════════════════════════
//  Playback state
// ═══════════════════════════════════════════════════════════════

/// Where the current ring session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No session.
    Idle,
    /// A play-through is being rendered; `remaining` includes it.
    Playing { remaining: u8 },
    /// Between play-throughs, waiting for `resume_at_ms`.
    ScheduledReplay { resume_at_ms: u64, remaining: u8 },
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

pub struct PlaybackScheduler<A: AudioPort> {
    audio: A,
    play_count: u8,
    play_delay_ms: u32,
    /// Replays reopen exactly this path.
    track: String,
    gain: f32,
    state: PlaybackState,
}

impl<A: AudioPort> PlaybackScheduler<A> {
    /// A `play_count` of zero is treated as one.
    pub fn new(audio: A, play_count: u8, play_delay_ms: u32) -> Self {
        Self {
            audio,
            play_count: play_count.max(1),
            play_delay_ms,
            track: String::new(),
            gain: 1.0,
            state: PlaybackState::Idle,
        }
    }

    /// Start a session.
    ///
    /// Fails with [`PlaybackError::Busy`] while a session is running and
    /// with [`PlaybackError::DecoderInit`] when the pipeline cannot be
    /// built; in both cases the state is left untouched.
    pub fn begin(&mut self, track: &str, gain: f32) -> Result<(), PlaybackError> {
        if self.is_active() {
            return Err(PlaybackError::Busy);
        }

        self.audio.open(track, gain)?;

        self.track.clear();
        self.track.push_str(track);
        self.gain = gain;
        self.state = PlaybackState::Playing {
            remaining: self.play_count,
        };
        info!("Playback: started '{}' x{}", track, self.play_count);
        Ok(())
    }

    /// Advance the session by one step.
    pub fn tick(&mut self, now_ms: u64) {
        match self.state {
            PlaybackState::Idle => {}

            PlaybackState::Playing { remaining } => {
                if self.audio.pump() {
                    return;
                }
                self.audio.stop();
                self.finish_cycle(remaining, now_ms);
            }

            PlaybackState::ScheduledReplay {
                resume_at_ms,
                remaining,
            } => {
                if now_ms < resume_at_ms {
                    return;
                }
                match self.audio.open(&self.track, self.gain) {
                    Ok(()) => {
                        debug!("Playback: replay, {} left", remaining);
                        self.state = PlaybackState::Playing { remaining };
                    }
                    Err(e) => {
                        warn!("Playback: replay of '{}' failed: {}", self.track, e);
                        self.finish_cycle(remaining, now_ms);
                    }
                }
            }
        }
    }

    fn finish_cycle(&mut self, remaining: u8, now_ms: u64) {
        let remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            let resume_at_ms = now_ms + u64::from(self.play_delay_ms);
            debug!("Playback: cycle done, replay at {} ms", resume_at_ms);
            self.state = PlaybackState::ScheduledReplay {
                resume_at_ms,
                remaining,
            };
        } else {
            info!("Playback: finished");
            self.state = PlaybackState::Idle;
        }
    }

    /// True in every state except [`PlaybackState::Idle`].
    pub fn is_active(&self) -> bool {
        self.state != PlaybackState::Idle
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }
}
