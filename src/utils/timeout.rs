//! Timeout validation utilities for browser operations

use std::time::Duration;

use crate::tools::ToolError;

/// Maximum timeout for browser navigation operations (5 minutes)
/// Covers slow-loading sites, heavy SPAs, and network delays
pub const MAX_NAVIGATION_TIMEOUT_MS: u64 = 300_000; // 5 minutes

/// Maximum settle delay after an element interaction (30 seconds)
pub const MAX_INTERACTION_TIMEOUT_MS: u64 = 30_000; // 30 seconds

/// Validate the load wait used by `navigate()`
///
/// # Example
/// ```rust,ignore
/// let timeout = validate_navigation_timeout(Some(45000), 5000)?;
/// ```
pub fn validate_navigation_timeout(
    timeout_ms: Option<u64>,
    default_ms: u64,
) -> Result<Duration, ToolError> {
    let ms = timeout_ms.unwrap_or(default_ms);

    if ms > MAX_NAVIGATION_TIMEOUT_MS {
        return Err(ToolError::InvalidArgument(format!(
            "Navigation timeout cannot exceed {}ms ({} minutes). Received: {}ms ({:.1} minutes)",
            MAX_NAVIGATION_TIMEOUT_MS,
            MAX_NAVIGATION_TIMEOUT_MS / 60_000,
            ms,
            ms as f64 / 60_000.0
        )));
    }

    Ok(Duration::from_millis(ms))
}

/// Validate the settle delay used after `click()`
pub fn validate_interaction_timeout(
    timeout_ms: Option<u64>,
    default_ms: u64,
) -> Result<Duration, ToolError> {
    let ms = timeout_ms.unwrap_or(default_ms);

    if ms > MAX_INTERACTION_TIMEOUT_MS {
        return Err(ToolError::InvalidArgument(format!(
            "Settle delay cannot exceed {}ms ({} seconds). Received: {}ms ({} seconds)",
            MAX_INTERACTION_TIMEOUT_MS,
            MAX_INTERACTION_TIMEOUT_MS / 1000,
            ms,
            ms / 1000
        )));
    }

    Ok(Duration::from_millis(ms))
}
