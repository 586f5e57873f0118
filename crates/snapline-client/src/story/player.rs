//! Timer-driven story player.
//!
//! The player owns at most one timer task. The task sleeps one tick
//! period of the active story and then ticks the shared playback state.
//! Any command that changes the active story, pauses, or ends the session
//! aborts the task first and spawns a fresh one if playback should go on.
//! Each spawn bumps a generation counter held under the same lock as the
//! playback state; a timer only ticks while its generation is current.
//! Invalid `start` requests are rejected before the running session is
//! touched.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ClientError;
use crate::events::{ClientEvent, EventBus};
use crate::story::playback::{PlaybackSignal, StoryPlayback};
use crate::story::sequence::StorySequence;

/// Point-in-time view of the player for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub session_id: Option<Uuid>,
    pub current_index: usize,
    pub progress_percent: f64,
    pub is_paused: bool,
    pub is_active: bool,
}

#[derive(Default)]
struct Shared {
    playback: StoryPlayback,
    generation: u64,
    /// Cleared when the session ends, whether by the timer or a command.
    session_id: Option<Uuid>,
}

pub struct StoryPlayer {
    state: Arc<Mutex<Shared>>,
    timer: Option<JoinHandle<()>>,
    events: EventBus,
}

impl StoryPlayer {
    pub fn new(events: EventBus) -> Self {
        Self {
            state: Arc::new(Mutex::new(Shared::default())),
            timer: None,
            events,
        }
    }

    /// Start a viewing session, replacing any running one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, sequence: StorySequence, start_index: usize) -> Result<Uuid, ClientError> {
        StoryPlayback::validate(&sequence, start_index)?;
        self.cancel_timer();

        let len = sequence.len();
        let session_id = Uuid::new_v4();
        {
            let mut shared = self.state.lock()?;
            shared.playback.start(sequence, start_index)?;
            shared.session_id = Some(session_id);
        }
        info!(session = %session_id, stories = len, start_index, "Story session started");

        self.spawn_timer();
        Ok(session_id)
    }

    pub fn advance(&mut self) -> Result<PlaybackSignal, ClientError> {
        self.navigate(StoryPlayback::advance)
    }

    pub fn retreat(&mut self) -> Result<PlaybackSignal, ClientError> {
        self.navigate(StoryPlayback::retreat)
    }

    pub fn pause(&mut self) -> Result<(), ClientError> {
        self.cancel_timer();
        self.state.lock()?.playback.pause();
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), ClientError> {
        self.state.lock()?.playback.resume();
        self.spawn_timer();
        Ok(())
    }

    /// The viewer left the session.
    pub fn exit(&mut self) -> Result<(), ClientError> {
        self.cancel_timer();
        let ended = {
            let mut shared = self.state.lock()?;
            shared.playback.stop();
            shared.session_id.take()
        };
        if let Some(session_id) = ended {
            info!(session = %session_id, "Story session exited");
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Result<PlaybackSnapshot, ClientError> {
        let shared = self.state.lock()?;
        let state = &shared.playback;
        Ok(PlaybackSnapshot {
            session_id: shared.session_id,
            current_index: state.current_index(),
            progress_percent: state.progress_percent(),
            is_paused: state.is_paused(),
            is_active: state.is_active(),
        })
    }

    /// Whether a timer task is currently alive.
    pub fn has_timer(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn navigate(
        &mut self,
        op: fn(&mut StoryPlayback) -> PlaybackSignal,
    ) -> Result<PlaybackSignal, ClientError> {
        self.cancel_timer();
        let (signal, session_id) = {
            let mut shared = self.state.lock()?;
            let signal = op(&mut shared.playback);
            let session_id = if matches!(signal, PlaybackSignal::SessionEnded) {
                shared.session_id.take()
            } else {
                shared.session_id
            };
            (signal, session_id)
        };
        if let Some(session_id) = session_id {
            announce(&self.events, session_id, signal);
        }
        self.spawn_timer();
        Ok(signal)
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            if let Ok(mut shared) = self.state.lock() {
                shared.generation += 1;
            }
        }
    }

    fn spawn_timer(&mut self) {
        self.cancel_timer();

        let (session_id, generation) = {
            let Ok(mut shared) = self.state.lock() else {
                return;
            };
            let Some(session_id) = shared.session_id else {
                return;
            };
            if !shared.playback.auto_advances() {
                return;
            }
            shared.generation += 1;
            (session_id, shared.generation)
        };

        let state = self.state.clone();
        let events = self.events.clone();
        self.timer = Some(tokio::spawn(run_timer(state, events, session_id, generation)));
    }
}

impl Drop for StoryPlayer {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

fn announce(events: &EventBus, session_id: Uuid, signal: PlaybackSignal) {
    match signal {
        PlaybackSignal::Advanced(index) | PlaybackSignal::Retreated(index) => {
            events.emit(ClientEvent::StoryAdvanced { session_id, index });
        }
        PlaybackSignal::SessionEnded => {
            info!(session = %session_id, "Story session ended");
            events.emit(ClientEvent::StorySessionEnded { session_id });
        }
        PlaybackSignal::Idle | PlaybackSignal::Progressed(_) | PlaybackSignal::Restarted => {}
    }
}

async fn run_timer(state: Arc<Mutex<Shared>>, events: EventBus, session_id: Uuid, generation: u64) {
    loop {
        let period = {
            let Ok(shared) = state.lock() else { return };
            if shared.generation != generation || !shared.playback.auto_advances() {
                return;
            }
            match shared.playback.current() {
                Some(story) => story.tick_period(),
                None => return,
            }
        };

        tokio::time::sleep(period).await;

        let signal = {
            let Ok(mut shared) = state.lock() else { return };
            if shared.generation != generation {
                return;
            }
            let signal = shared.playback.tick(period);
            if matches!(signal, PlaybackSignal::SessionEnded) {
                shared.session_id = None;
            }
            signal
        };

        match signal {
            PlaybackSignal::Progressed(_) => {}
            PlaybackSignal::Advanced(index) => {
                debug!(session = %session_id, index, "Story auto-advanced");
                announce(&events, session_id, signal);
            }
            PlaybackSignal::SessionEnded => {
                announce(&events, session_id, signal);
                return;
            }
            _ => return,
        }
    }
}
