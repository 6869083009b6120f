//! Off-peak window gate for bulk transfers.
//!
//! Bulk work may only start while the wall clock, read in a fixed reference
//! offset, is inside the low-traffic window: all weekend, and on weekdays
//! before the peak start hour or from the peak end hour onward.

mod clock;

use std::time::Duration;

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveTime, Offset, TimeZone, Timelike, Utc, Weekday,
};
use tracing::info;

pub use clock::{Clock, SystemClock};

/// Shortest sleep taken while still on-peak.
const MIN_WAIT: Duration = Duration::from_secs(1);

/// Low-traffic window definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffPeakWindow {
    /// Reference offset in which hours and weekdays are evaluated.
    pub utc_offset: FixedOffset,
    /// First on-peak hour on weekdays (inclusive).
    pub peak_start_hour: u32,
    /// First off-peak hour after the weekday peak.
    pub peak_end_hour: u32,
}

impl Default for OffPeakWindow {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
            peak_start_hour: 7,
            peak_end_hour: 22,
        }
    }
}

impl OffPeakWindow {
    /// Builds a window from whole-hour settings.
    ///
    /// Returns `None` for an offset outside ±23 hours or hours past 24.
    pub fn from_hours(
        utc_offset_hours: i32,
        peak_start_hour: u32,
        peak_end_hour: u32,
    ) -> Option<Self> {
        let utc_offset = FixedOffset::east_opt(utc_offset_hours.checked_mul(3600)?)?;
        if peak_start_hour > 24 || peak_end_hour > 24 {
            return None;
        }
        Some(Self {
            utc_offset,
            peak_start_hour,
            peak_end_hour,
        })
    }

    /// Returns `true` if bulk work may start at `now`.
    pub fn is_off_peak(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.utc_offset);
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return true;
        }
        let hour = local.hour();
        hour < self.peak_start_hour || hour >= self.peak_end_hour
    }

    /// Time from `now` until the window next opens (zero when open).
    pub fn until_off_peak(&self, now: DateTime<Utc>) -> Duration {
        if self.is_off_peak(now) {
            return Duration::ZERO;
        }

        let local = now.with_timezone(&self.utc_offset);
        let opens = NaiveTime::from_hms_opt(self.peak_end_hour, 0, 0).and_then(|t| {
            local
                .date_naive()
                .and_time(t)
                .and_local_timezone(self.utc_offset)
                .single()
        });

        match opens {
            Some(opens) => (opens.with_timezone(&Utc) - now).to_std().unwrap_or(Duration::ZERO),
            // `peak_end_hour == 24`: the window opens at the next local midnight.
            None => local
                .date_naive()
                .succ_opt()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .and_then(|t| t.and_local_timezone(self.utc_offset).single())
                .and_then(|opens| (opens.with_timezone(&Utc) - now).to_std().ok())
                .unwrap_or(Duration::ZERO),
        }
    }

    /// Blocks until the window is open, re-checking after every sleep.
    pub async fn wait(&self, clock: &dyn Clock) {
        loop {
            let now = clock.now();
            if self.is_off_peak(now) {
                return;
            }

            let wait = self.until_off_peak(now).max(MIN_WAIT);
            info!(
                wait_secs = wait.as_secs(),
                opens_at_hour = self.peak_end_hour,
                "on-peak hours, sleeping until off-peak"
            );
            clock.sleep(wait).await;
        }
    }
}
