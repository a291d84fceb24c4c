//! Telemetry metric name constants.
//!
//! Centralised metric names for bragi operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `bragi_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `store`: cache backing: "memory" or "remote"
//! - `operation`: store command (e.g. "get", "set", "scan")
//! - `status`: outcome: "ok" or an error class

/// Texts answered from the cache.
pub const CACHE_HITS_TOTAL: &str = "bragi_cache_hits_total";

/// Texts that had to be sent to the backend.
pub const CACHE_MISSES_TOTAL: &str = "bragi_cache_misses_total";

/// Swallowed cache store failures.
///
/// Labels: `store`, `operation`.
pub const STORE_ERRORS_TOTAL: &str = "bragi_store_errors_total";

/// Translation backend calls.
///
/// Labels: `status` ("ok" | "auth" | "rate_limited" | "unavailable" | "error").
pub const BACKEND_REQUESTS_TOTAL: &str = "bragi_backend_requests_total";

/// Translation backend call duration in seconds.
pub const BACKEND_REQUEST_DURATION_SECONDS: &str = "bragi_backend_request_duration_seconds";
