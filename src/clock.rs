use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::fmt;

/// Seconds in one UTC day.
pub const SECS_PER_DAY: i64 = 86_400;

/// Time left until the next daily boundary.
/// Always rebuilt from the wall clock, never stepped from a previous value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingTime {
    pub hours: u32,
    /// 0-59
    pub minutes: u32,
    /// 0-59
    pub seconds: u32,
}

impl RemainingTime {
    pub const ZERO: RemainingTime = RemainingTime {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    /// Split a second count into h/m/s. Negative input clamps to zero.
    pub fn from_secs(total: i64) -> Self {
        if total <= 0 {
            return Self::ZERO;
        }
        let total = total as u64;
        Self {
            hours: (total / 3600) as u32,
            minutes: ((total % 3600) / 60) as u32,
            seconds: (total % 60) as u32,
        }
    }

    /// Reconstruct the total second count.
    pub fn total_seconds(&self) -> i64 {
        self.hours as i64 * 3600 + self.minutes as i64 * 60 + self.seconds as i64
    }
}

impl fmt::Display for RemainingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Urgency band of a countdown. Drives styling only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    /// Less than one hour left
    Critical,
    /// One to two hours left
    Warning,
    Normal,
}

impl Urgency {
    pub fn of(remaining: &RemainingTime) -> Self {
        if remaining.hours < 1 {
            Self::Critical
        } else if remaining.hours < 2 {
            Self::Warning
        } else {
            Self::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Normal => "normal",
        }
    }
}

/// Next 00:00:00 UTC strictly after `now`.
/// At exactly midnight this is the following midnight.
pub fn next_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    midnight + Duration::days(1)
}

/// Time remaining until the next UTC midnight.
///
/// The sub-second part is truncated. The exact boundary instant would give a
/// full day (86400s); it is clamped to 86399s so the result always fits in a
/// single day window.
pub fn compute_remaining(now: DateTime<Utc>) -> RemainingTime {
    let diff = (next_boundary(now) - now).num_seconds();
    RemainingTime::from_secs(diff.min(SECS_PER_DAY - 1))
}

/// Wall-clock source. Lets presenters be driven by a fixed time in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Clock that only moves when told to.
    pub(crate) struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        pub(crate) fn new(at: DateTime<Utc>) -> Self {
            Self(Mutex::new(at))
        }

        pub(crate) fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now = *now + by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, h, m, s).unwrap()
    }

    #[test]
    fn test_remaining_mid_day() {
        let r = compute_remaining(at(12, 0, 0));
        assert_eq!(r, RemainingTime { hours: 12, minutes: 0, seconds: 0 });

        let r = compute_remaining(at(22, 44, 30));
        assert_eq!(r, RemainingTime { hours: 1, minutes: 15, seconds: 30 });
    }

    #[test]
    fn test_last_second_of_day() {
        let r = compute_remaining(at(23, 59, 59));
        assert_eq!(r, RemainingTime { hours: 0, minutes: 0, seconds: 1 });
    }

    #[test]
    fn test_exact_midnight_targets_next_day() {
        let now = at(0, 0, 0);
        assert_eq!(next_boundary(now), Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap());

        // Full day clamped to 86399
        let r = compute_remaining(now);
        assert_eq!(r, RemainingTime { hours: 23, minutes: 59, seconds: 59 });
    }

    #[test]
    fn test_subsecond_truncated() {
        let now = at(23, 59, 58) + Duration::milliseconds(500);
        // 1.5s left -> 1
        assert_eq!(compute_remaining(now).total_seconds(), 1);

        let now = at(23, 59, 59) + Duration::milliseconds(999);
        assert_eq!(compute_remaining(now), RemainingTime::ZERO);
    }

    #[test]
    fn test_components_in_range_across_day() {
        let start = at(0, 0, 0);
        // Every 7 seconds across a full day plus a bit
        for step in 0..(SECS_PER_DAY / 7 + 20) {
            let r = compute_remaining(start + Duration::seconds(step * 7));
            assert!(r.minutes < 60);
            assert!(r.seconds < 60);
            assert!(r.total_seconds() <= SECS_PER_DAY - 1);
            assert!(r.total_seconds() >= 0);
        }
    }

    #[test]
    fn test_monotonic_within_window_and_reset() {
        let mut prev = compute_remaining(at(0, 0, 1)).total_seconds();
        let mut now = at(0, 0, 1);
        while now < at(23, 59, 59) {
            now = now + Duration::seconds(13);
            if now >= Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap() {
                break;
            }
            let cur = compute_remaining(now).total_seconds();
            assert!(cur <= prev);
            prev = cur;
        }

        // Crossing the boundary resets near a full day
        let after = Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 1).unwrap();
        assert_eq!(compute_remaining(after).total_seconds(), SECS_PER_DAY - 1);
    }

    #[test]
    fn test_from_secs_clamps_negative() {
        assert_eq!(RemainingTime::from_secs(-5), RemainingTime::ZERO);
        assert_eq!(RemainingTime::from_secs(0), RemainingTime::ZERO);
        assert_eq!(
            RemainingTime::from_secs(3725),
            RemainingTime { hours: 1, minutes: 2, seconds: 5 }
        );
    }

    #[test]
    fn test_urgency_tiers() {
        let critical = RemainingTime { hours: 0, minutes: 30, seconds: 0 };
        let warning = RemainingTime { hours: 1, minutes: 15, seconds: 0 };
        let normal = RemainingTime { hours: 5, minutes: 0, seconds: 0 };

        assert_eq!(Urgency::of(&critical), Urgency::Critical);
        assert_eq!(Urgency::of(&warning), Urgency::Warning);
        assert_eq!(Urgency::of(&normal), Urgency::Normal);

        // Edges
        assert_eq!(Urgency::of(&RemainingTime { hours: 1, minutes: 0, seconds: 0 }), Urgency::Warning);
        assert_eq!(Urgency::of(&RemainingTime { hours: 2, minutes: 0, seconds: 0 }), Urgency::Normal);
        assert_eq!(Urgency::of(&RemainingTime::ZERO), Urgency::Critical);
    }

    #[test]
    fn test_display_zero_pads() {
        let r = RemainingTime { hours: 1, minutes: 2, seconds: 3 };
        assert_eq!(r.to_string(), "01:02:03");
        assert_eq!(RemainingTime::ZERO.to_string(), "00:00:00");
    }
}
