//! Time and duration conversion utilities.
//!
//! Media positions are carried as [`Duration`]s. Documents and media
//! backends speak in fractional seconds, so this module provides the
//! checked conversions between the two plus the `M:SS` clock formatting
//! used by the time readout.

use std::time::Duration;

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    fn as_millis_u64(&self) -> u64;

    /// Format as a `M:SS` clock. Minutes are unpadded and unbounded
    /// (an hour reads `60:00`), seconds are truncated and zero-padded.
    fn to_clock(&self) -> String;
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }

    fn to_clock(&self) -> String {
        let total = self.as_secs();
        format!("{}:{:02}", total / 60, total % 60)
    }
}

/// Convert fractional seconds to a [`Duration`].
///
/// Returns `None` for negative, NaN or infinite input.
#[must_use]
pub fn duration_from_secs(secs: f64) -> Option<Duration> {
    if secs < 0.0 {
        return None;
    }
    // abs() folds -0.0 into 0.0
    Duration::try_from_secs_f64(secs.abs()).ok()
}

/// Format the elapsed/total readout, e.g. `2:05 / 61:01`.
///
/// An unknown total (stream metadata not loaded yet) renders as `0:00`.
#[must_use]
pub fn format_time_readout(position: Duration, total: Option<Duration>) -> String {
    format!(
        "{} / {}",
        position.to_clock(),
        total.unwrap_or(Duration::ZERO).to_clock()
    )
}
