//! Structured logging field name constants for quill.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values |
//! | TRACE | Per-item iteration (tag scans, note loops) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated through a request. Format: UUIDv7.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "service"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "tag_service", "note_service", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "attach_or_create", "detach", "find_by_tags"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Account id the operation is scoped to.
pub const ACCOUNT_ID: &str = "account_id";

/// Note id being operated on.
pub const NOTE_ID: &str = "note_id";

/// Tag id being operated on.
pub const TAG_ID: &str = "tag_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a query.
pub const RESULT_COUNT: &str = "result_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
