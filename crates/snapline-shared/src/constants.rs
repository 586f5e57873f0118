/// Application name
pub const APP_NAME: &str = "Snapline";

/// Default social API base URL
pub const DEFAULT_API_URL: &str = "https://x8ki-letl-twmt.n7.xano.io/api:8Hqiic6m";

/// Default HTTP request timeout in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Default display duration of a story in milliseconds
pub const DEFAULT_STORY_DURATION_MS: u64 = 5_000;

/// Number of progress steps per story (one timer fire per percent)
pub const STORY_PROGRESS_STEPS: u64 = 100;

/// Capacity of the client event broadcast channel
pub const EVENT_CHANNEL_SIZE: usize = 64;

/// Backend endpoint roots
pub const POST_PATH: &str = "/post";
pub const LIKE_PATH: &str = "/like";
pub const FOLLOW_PATH: &str = "/follow";
pub const STORY_PATH: &str = "/story";
