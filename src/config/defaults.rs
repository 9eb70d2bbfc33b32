//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Comparison
// ============================================================================

/// Smallest permitted grid resolution (m).
pub const MIN_RESOLUTION_M: u32 = 1;

/// Largest permitted grid resolution (m).
pub const MAX_RESOLUTION_M: u32 = 100;

/// Resolution used when a comparison request does not name one (m).
pub const DEFAULT_RESOLUTION_M: u32 = 5;

/// Float noise, in ulps of the span/step ratio, absorbed before an
/// overlap span is rounded up to an extra grid step.
pub const GRID_SNAP_ULPS: f64 = 8.0;

// ============================================================================
// Server
// ============================================================================

/// Default HTTP bind address.
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";

/// Maximum accepted request body (bytes). Surveys with tens of thousands of
/// stations stay well under this.
pub const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Default number of sessions returned by list endpoints.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Upper bound on the `limit` query parameter.
pub const MAX_LIST_LIMIT: usize = 1000;

// ============================================================================
// Storage
// ============================================================================

/// Default sled data directory.
pub const DEFAULT_DATA_DIR: &str = "./data/survey_compare";
