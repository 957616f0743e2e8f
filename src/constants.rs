//! Application constants for Sharenite Mirror
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for lookup provider credentials
pub mod env {
    /// Environment variable name for the IGDB (Twitch) client id
    pub const IGDB_CLIENT_ID: &str = "IGDB_CLIENT_ID";

    /// Environment variable name for the IGDB (Twitch) client secret
    pub const IGDB_CLIENT_SECRET: &str = "IGDB_CLIENT_SECRET";

    /// Environment variable name for the default Sharenite username
    pub const USERNAME: &str = "SHARENITE_USERNAME";
}

/// Persistent store namespaces
pub mod store {
    /// Namespace holding the library snapshot and profile
    pub const SNAPSHOT_KEY: &str = "sharenite-data";

    /// Namespace holding per-record preference overlays
    pub const PREFERENCES_KEY: &str = "sharenite-preferences";

    /// Namespace holding the cover lookup cache
    pub const COVER_CACHE_KEY: &str = "game-covers-cache";

    /// Extension used for namespace files in the file-backed store
    pub const FILE_EXTENSION: &str = "json";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "Sharenite-Mirror/0.1.0 (Library Sync Tool)";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 10;
}

/// Rate limiting and retry configuration
pub mod limits {
    use super::Duration;

    /// Default rate limit for remote requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 10;

    /// Attempts made for a single detail fetch or lookup
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Linear backoff unit: the delay before retry `n` is `n * RETRY_BASE_DELAY`
    pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
}

/// Library synchronization constants
pub mod sync {
    use super::Duration;

    /// Detail fetches issued concurrently per batch
    pub const DETAIL_BATCH_SIZE: usize = 5;

    /// Pause between detail batches
    pub const BATCH_PAUSE: Duration = Duration::from_millis(100);

    /// Quiet period before a partial snapshot write
    pub const PERSIST_DEBOUNCE: Duration = Duration::from_secs(1);

    /// Consecutive unchanged pages that end a refresh pass
    pub const UNCHANGED_PAGE_LIMIT: u32 = 3;

    /// Age after which a cached snapshot is refreshed in the background
    pub const STALE_AFTER: Duration = Duration::from_secs(30 * 60);

    /// Capacity of the background failure channel
    pub const FAILURE_CHANNEL_CAPACITY: usize = 16;

    /// Play duration recorded for a game that has never been played
    pub const NEVER_PLAYED: &str = "00:00:00";
}

/// Cover lookup cache constants
pub mod covers {
    use super::Duration;

    /// Maximum number of cached lookups
    pub const DEFAULT_CAPACITY: usize = 500;

    /// Age after which an unprotected lookup expires
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
}

/// Sharenite service URLs
pub mod sharenite {
    /// Sharenite site root
    pub const BASE_URL: &str = "https://www.sharenite.link";

    /// Path segment under which public profiles live
    pub const PROFILES_PATH: &str = "profiles";

    /// Prefix on list item ids that carry a game identifier
    pub const GAME_ID_PREFIX: &str = "game_";

    /// List item id used by the table header row
    pub const HEADER_ROW_ID: &str = "header";

    /// Paragraph marker carrying the library size
    pub const TOTAL_GAMES_MARKER: &str = "Total games listed:";

    /// Detail label markers
    pub const PLAYTIME_MARKER: &str = "Playtime:";
    pub const PLAY_COUNT_MARKER: &str = "Play count:";
    pub const ADDED_MARKER: &str = "Added:";
    pub const MODIFIED_MARKER: &str = "Modified:";
    pub const PLATFORM_MARKER: &str = "PC";

    /// Text of the paginator link to the final page
    pub const LAST_PAGE_MARKER: &str = "Last";
}

/// IGDB cover provider endpoints
pub mod igdb {
    use super::Duration;

    /// Twitch OAuth token endpoint
    pub const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

    /// IGDB games search endpoint
    pub const GAMES_URL: &str = "https://api.igdb.com/v4/games";

    /// Image CDN root
    pub const IMAGE_BASE_URL: &str = "https://images.igdb.com/igdb/image/upload";

    /// Image size preset for covers
    pub const COVER_SIZE: &str = "t_cover_big";

    /// Image size preset for screenshots
    pub const SCREENSHOT_SIZE: &str = "t_screenshot_big";

    /// Tokens are refreshed this long before they expire
    pub const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(5 * 60);
}

/// Web scraping CSS selectors
pub mod selectors {
    /// Rows of the games table
    pub const GAME_ROW: &str = ".list-group-item";

    /// Game title inside a row
    pub const GAME_TITLE: &str = "strong";

    /// Activity timestamp inside a row
    pub const ACTIVITY: &str = "abbr";

    /// Column holding the activity label
    pub const ACTIVITY_COLUMN: &str = ".col-3";

    /// Links in the paginator
    pub const PAGE_LINK: &str = ".pagination .page-link";

    /// Next-page link in the paginator
    pub const NEXT_PAGE: &str = "a.page-link[rel=\"next\"]";

    /// Paragraphs scanned for the library size
    pub const PARAGRAPH: &str = "p";

    /// Muted labels on the detail page
    pub const MUTED_TEXT: &str = ".text-muted";

    /// Bold labels on the detail page
    pub const LABEL: &str = "strong";
}

/// Logging and debugging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "warn";
}

// Re-export commonly used constants for convenience
pub use env::{IGDB_CLIENT_ID as ENV_IGDB_CLIENT_ID, IGDB_CLIENT_SECRET as ENV_IGDB_CLIENT_SECRET};
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::{DEFAULT_RATE_LIMIT_RPS, MAX_ATTEMPTS, RETRY_BASE_DELAY};
pub use store::{COVER_CACHE_KEY, PREFERENCES_KEY, SNAPSHOT_KEY};
