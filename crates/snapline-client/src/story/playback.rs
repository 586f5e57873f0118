//! Story playback state machine.
//!
//! Pure state: no timers and no I/O. [`StoryPlayer`](super::StoryPlayer)
//! drives [`StoryPlayback::tick`] from a timer.

use std::time::Duration;

use serde::Serialize;

use crate::error::PlaybackError;
use crate::story::sequence::{StoryItem, StorySequence};

const FULL: f64 = 100.0;
// Absorbs float drift when a duration does not split evenly into 100 ticks.
const EPSILON: f64 = 1e-6;

/// What a playback command did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "signal", content = "value", rename_all = "camelCase")]
pub enum PlaybackSignal {
    /// Nothing changed (paused, placeholder, or no active session).
    Idle,
    Progressed(f64),
    Advanced(usize),
    Retreated(usize),
    /// Retreat at the first story: progress restarted from zero.
    Restarted,
    /// Advance past the last story; the viewer should close.
    SessionEnded,
}

#[derive(Debug, Clone, Default)]
pub struct StoryPlayback {
    sequence: StorySequence,
    current_index: usize,
    progress_percent: f64,
    is_paused: bool,
    is_active: bool,
}

impl StoryPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that a session could start at `start_index`.
    pub fn validate(sequence: &StorySequence, start_index: usize) -> Result<(), PlaybackError> {
        if sequence.is_empty() {
            return Err(PlaybackError::EmptySequence);
        }
        if start_index >= sequence.len() {
            return Err(PlaybackError::OutOfRange {
                index: start_index,
                len: sequence.len(),
            });
        }
        Ok(())
    }

    /// Begin a session at `start_index`. State is untouched on error.
    pub fn start(&mut self, sequence: StorySequence, start_index: usize) -> Result<(), PlaybackError> {
        Self::validate(&sequence, start_index)?;

        self.sequence = sequence;
        self.current_index = start_index;
        self.progress_percent = 0.0;
        self.is_paused = false;
        self.is_active = true;
        Ok(())
    }

    /// Advance progress by `delta` of wall time.
    pub fn tick(&mut self, delta: Duration) -> PlaybackSignal {
        if !self.auto_advances() {
            return PlaybackSignal::Idle;
        }
        let Some(story) = self.current() else {
            return PlaybackSignal::Idle;
        };

        let step = delta.as_secs_f64() * 1000.0 * FULL / story.duration_ms as f64;
        self.progress_percent = (self.progress_percent + step).min(FULL);

        if self.progress_percent >= FULL - EPSILON {
            self.progress_percent = FULL;
            self.advance()
        } else {
            PlaybackSignal::Progressed(self.progress_percent)
        }
    }

    pub fn advance(&mut self) -> PlaybackSignal {
        if !self.is_active {
            return PlaybackSignal::Idle;
        }
        if self.current_index + 1 >= self.sequence.len() {
            self.is_active = false;
            return PlaybackSignal::SessionEnded;
        }
        self.current_index += 1;
        self.progress_percent = 0.0;
        PlaybackSignal::Advanced(self.current_index)
    }

    pub fn retreat(&mut self) -> PlaybackSignal {
        if !self.is_active {
            return PlaybackSignal::Idle;
        }
        self.progress_percent = 0.0;
        if self.current_index == 0 {
            return PlaybackSignal::Restarted;
        }
        self.current_index -= 1;
        PlaybackSignal::Retreated(self.current_index)
    }

    pub fn pause(&mut self) {
        self.is_paused = true;
    }

    pub fn resume(&mut self) {
        self.is_paused = false;
    }

    /// End the session without reaching the last story.
    pub fn stop(&mut self) {
        self.is_active = false;
    }

    /// Whether ticks currently move progress forward.
    pub fn auto_advances(&self) -> bool {
        self.is_active
            && !self.is_paused
            && self
                .current()
                .is_some_and(|s| !s.is_own_story_placeholder)
    }

    pub fn current(&self) -> Option<&StoryItem> {
        self.sequence.get(self.current_index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn progress_percent(&self) -> f64 {
        self.progress_percent
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn sequence(&self) -> &StorySequence {
        &self.sequence
    }
}
