//! Structured logging field name constants.
//!
//! Names of the span fields the HTTP layer fills in after a request is sent
//! (declared as `Empty` in each `#[instrument]` and recorded through
//! `Span::record`).
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Operation failed and nothing was recovered |
//! | WARN  | Recoverable issue, fallback applied (empty read, dropped flush) |
//! | INFO  | Lifecycle events (login, logout, session expiry, teardown) |
//! | DEBUG | Decision points (timer reset, no-op drop, stale response ignored) |
//! | TRACE | Per-note iteration |

/// Correlation ID sent with each request.
pub const REQUEST_ID: &str = "request_id";

/// HTTP status code.
pub const STATUS: &str = "status";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of notes returned by a read.
pub const RESULT_COUNT: &str = "result_count";
