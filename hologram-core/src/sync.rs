//! Secondary audio lock-step with the primary video.
//!
//! Media elements run on independent clocks, so the secondary stream is
//! allowed to wander by up to the tolerance before it is hard-seeked back
//! onto the primary position.

use crate::media::MediaStream;
use crate::time::DurationExt;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum desync before the secondary stream is re-seeked
pub const DEFAULT_DRIFT_TOLERANCE: Duration = Duration::from_millis(200);

/// A re-seek performed on the secondary stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftCorrection {
    /// Secondary position before the correction
    pub from: Duration,
    /// Primary position the secondary was moved to
    pub to: Duration,
}

impl DriftCorrection {
    #[must_use]
    pub fn drift(&self) -> Duration {
        self.from.abs_diff(self.to)
    }
}

/// Keeps the secondary stream within `tolerance` of the primary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncClock {
    tolerance: Duration,
}

impl SyncClock {
    #[must_use]
    pub const fn new(tolerance: Duration) -> Self {
        Self { tolerance }
    }

    #[must_use]
    pub const fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// Correction needed for the given positions, if the drift strictly
    /// exceeds the tolerance
    #[must_use]
    pub fn correction(&self, primary: Duration, secondary: Duration) -> Option<DriftCorrection> {
        (primary.abs_diff(secondary) > self.tolerance).then_some(DriftCorrection {
            from: secondary,
            to: primary,
        })
    }

    /// Check the secondary against a new primary position and re-seek it
    /// when needed. Does nothing unless the secondary is playing.
    pub fn on_time_update(
        &self,
        primary: Duration,
        secondary: &mut dyn MediaStream,
    ) -> Option<DriftCorrection> {
        if !secondary.is_playing() {
            return None;
        }
        let correction = self.correction(primary, secondary.position())?;
        debug!(
            "Secondary drifted {}ms, seeking to {:?}",
            correction.drift().as_millis_u64(),
            correction.to
        );
        secondary.seek(correction.to);
        Some(correction)
    }

    /// Pause the secondary alongside the primary
    pub fn pause(&self, secondary: &mut dyn MediaStream) {
        secondary.pause();
    }

    /// Align the secondary with the primary position, then start it.
    ///
    /// Failures are logged and reported as `false`; they never affect the
    /// primary stream.
    pub fn resume(&self, primary: Duration, secondary: &mut dyn MediaStream) -> bool {
        secondary.seek(primary);
        match secondary.play() {
            Ok(()) => true,
            Err(e) => {
                warn!("Secondary audio could not start: {}", e);
                false
            }
        }
    }
}

impl Default for SyncClock {
    fn default() -> Self {
        Self::new(DEFAULT_DRIFT_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ClockStream;
    use tokio::time::advance;

    fn playing_secondary(position: Duration) -> ClockStream {
        let mut stream = ClockStream::new();
        stream.load("audio/a.mp3", Some(Duration::from_secs(60)));
        stream.play().unwrap();
        stream.seek(position);
        stream
    }

    #[test]
    fn test_correction_beyond_tolerance() {
        let clock = SyncClock::default();
        let correction = clock
            .correction(Duration::from_secs(10), Duration::from_millis(9700))
            .unwrap();
        assert_eq!(correction.to, Duration::from_secs(10));
        assert_eq!(correction.drift(), Duration::from_millis(300));
    }

    #[test]
    fn test_no_correction_within_tolerance() {
        let clock = SyncClock::default();
        assert!(clock
            .correction(Duration::from_secs(10), Duration::from_millis(9850))
            .is_none());
        assert!(clock
            .correction(Duration::from_secs(10), Duration::from_millis(10_150))
            .is_none());
        // Exactly at the tolerance is still in sync
        assert!(clock
            .correction(Duration::from_secs(10), Duration::from_millis(9800))
            .is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_time_update_seeks_secondary() {
        let clock = SyncClock::default();
        let mut secondary = playing_secondary(Duration::from_millis(9700));

        let correction = clock.on_time_update(Duration::from_secs(10), &mut secondary);
        assert!(correction.is_some());
        assert_eq!(secondary.position(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_time_update_leaves_small_drift() {
        let clock = SyncClock::default();
        let mut secondary = playing_secondary(Duration::from_millis(9850));

        assert!(clock
            .on_time_update(Duration::from_secs(10), &mut secondary)
            .is_none());
        assert_eq!(secondary.position(), Duration::from_millis(9850));
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_time_update_ignores_paused_secondary() {
        let clock = SyncClock::default();
        let mut secondary = playing_secondary(Duration::from_secs(1));
        clock.pause(&mut secondary);

        assert!(clock
            .on_time_update(Duration::from_secs(10), &mut secondary)
            .is_none());
        assert_eq!(secondary.position(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_aligns_then_plays() {
        let clock = SyncClock::default();
        let mut secondary = playing_secondary(Duration::from_secs(1));
        clock.pause(&mut secondary);

        assert!(clock.resume(Duration::from_secs(7), &mut secondary));
        assert!(secondary.is_playing());
        advance(Duration::from_secs(1)).await;
        assert_eq!(secondary.position(), Duration::from_secs(8));
    }

    #[test]
    fn test_resume_failure_is_reported_not_raised() {
        let clock = SyncClock::default();
        // Nothing loaded, so the stream refuses to start
        let mut secondary = ClockStream::new();
        assert!(!clock.resume(Duration::from_secs(3), &mut secondary));
    }
}
