//! Story viewing: the playback state machine and its timer-driven player.

pub mod playback;
pub mod player;
pub mod sequence;

pub use playback::{PlaybackSignal, StoryPlayback};
pub use player::{PlaybackSnapshot, StoryPlayer};
pub use sequence::{StoryItem, StorySequence};
