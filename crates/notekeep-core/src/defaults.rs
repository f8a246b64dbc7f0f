//! Centralized default constants for notekeep.
//!
//! Every crate references these instead of defining its own magic numbers.

// =============================================================================
// AUTOSAVE
// =============================================================================

/// Quiet period after the last edit before a draft is flushed.
pub const AUTOSAVE_DEBOUNCE_MS: u64 = 750;

/// Buffer capacity of the per-editor autosave event bus.
pub const AUTOSAVE_EVENT_CAPACITY: usize = 64;

/// Whether updates carry the last seen version and reject stale writes.
pub const AUTOSAVE_CONFLICT_DETECTION: bool = false;

// =============================================================================
// TAGS
// =============================================================================

/// Maximum length of a normalized tag name, in characters.
pub const TAG_NAME_MAX_LEN: usize = 100;

/// Separator accepted when parsing a free-form tag line.
pub const TAG_SEPARATOR: char = ',';

// =============================================================================
// NOTES
// =============================================================================

/// Maximum length of a note title, in characters.
pub const NOTE_TITLE_MAX_LEN: usize = 500;

/// First version number assigned to a newly created note.
pub const NOTE_INITIAL_VERSION: i64 = 1;

// =============================================================================
// DATABASE
// =============================================================================

/// Default maximum number of pooled connections.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Default connection acquire timeout in seconds.
pub const DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle connection timeout in seconds.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;
