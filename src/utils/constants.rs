//! Shared constants and invariants

pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 60;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;
