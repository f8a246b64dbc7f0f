//! Structured logging field name constants for notekeep.
//!
//! All crates use these names for `tracing` fields so log aggregation can
//! query the same keys across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Invariant broken, requires attention |
//! | WARN  | Recoverable failure surfaced to the user (failed flush) |
//! | INFO  | Lifecycle events, completed saves |
//! | DEBUG | Decision points (skip, defer, re-arm) |
//! | TRACE | Per-edit and per-tag iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "editor", "db"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "scheduler", "gateway", "reconciler", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "flush", "save", "reconcile", "find_or_create"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Owner (user) identifier.
pub const OWNER_ID: &str = "owner_id";

/// Normalized tag name.
pub const TAG_NAME: &str = "tag";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of tags in a reconciliation target.
pub const TAG_COUNT: &str = "tag_count";

/// Associations added by a reconciliation.
pub const ADDED: &str = "added";

/// Associations removed by a reconciliation.
pub const REMOVED: &str = "removed";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// What triggered a flush ("timer", "manual").
pub const TRIGGER: &str = "trigger";

/// Number of rows returned by a list or search.
pub const RESULT_COUNT: &str = "result_count";

/// Number of search terms.
pub const TERM_COUNT: &str = "term_count";
