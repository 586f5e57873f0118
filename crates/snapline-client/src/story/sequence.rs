use std::time::Duration;

use serde::Serialize;

use snapline_shared::constants::STORY_PROGRESS_STEPS;
use snapline_shared::protocol::StoryRecord;
use snapline_shared::types::StoryId;

/// One entry of a story viewing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryItem {
    pub id: StoryId,
    pub owner: String,
    pub media: Option<String>,
    pub duration_ms: u64,
    /// The viewer's "create your story" entry; never auto-advances.
    pub is_own_story_placeholder: bool,
}

impl StoryItem {
    pub fn new(id: StoryId, owner: impl Into<String>, media: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            id,
            owner: owner.into(),
            media: Some(media.into()),
            duration_ms: duration_ms.max(1),
            is_own_story_placeholder: false,
        }
    }

    pub fn own_story_placeholder(owner: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            id: StoryId(0),
            owner: owner.into(),
            media: None,
            duration_ms: duration_ms.max(1),
            is_own_story_placeholder: true,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Interval between timer fires: one percent of the duration.
    pub fn tick_period(&self) -> Duration {
        self.duration() / STORY_PROGRESS_STEPS as u32
    }
}

/// Ordered stories of one viewing session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorySequence {
    items: Vec<StoryItem>,
}

impl StorySequence {
    pub fn new(items: Vec<StoryItem>) -> Self {
        Self { items }
    }

    /// Build a sequence from fetched stories, with the viewer's own-story
    /// placeholder at index 0.
    pub fn from_records(
        viewer: &str,
        records: impl IntoIterator<Item = StoryRecord>,
        default_duration_ms: u64,
    ) -> Self {
        let mut items = vec![StoryItem::own_story_placeholder(viewer, default_duration_ms)];
        items.extend(records.into_iter().map(|r| {
            StoryItem::new(
                r.id,
                r.username,
                r.media,
                r.duration.unwrap_or(default_duration_ms),
            )
        }));
        Self { items }
    }

    pub fn get(&self, index: usize) -> Option<&StoryItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoryItem> {
        self.items.iter()
    }
}
