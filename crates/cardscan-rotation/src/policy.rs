use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use cardscan_core::calendar::parse_bucket_date;
use cardscan_core::config::RotationGranularity;

/// Retention policy for one output category.
///
/// Immutable snapshot derived from the process configuration; holds the
/// active granularity and the retention window in days.
/// `retention_days == 0` means "archive every candidate regardless of age"
/// and is what forced cleanup uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RotationPolicy {
    /// Active rotation granularity.
    pub granularity: RotationGranularity,

    /// Days a bucket remains active after its period ends.
    pub retention_days: u32,
}

impl RotationPolicy {
    pub fn new(granularity: RotationGranularity, retention_days: u32) -> Self {
        Self {
            granularity,
            retention_days,
        }
    }

    /// The same policy with retention zeroed, as used by forced cleanup.
    pub fn forced(self) -> Self {
        Self {
            retention_days: 0,
            ..self
        }
    }

    /// True when the retention window is shorter than one full period.
    /// Non-forced sweeps then risk archiving a bucket still receiving
    /// writes; the scheduler warns about this at startup.
    pub fn shorter_than_period(&self) -> bool {
        self.retention_days > 0 && self.retention_days < self.granularity.period_days()
    }

    /// Archival cutoff: buckets older than this are expired.
    pub fn cutoff(&self, now: NaiveDateTime) -> NaiveDateTime {
        now - Duration::days(i64::from(self.retention_days))
    }

    /// Whether the bucket named `name` has outlived the retention window at
    /// `now`. The bucket's age comes from parsing its name; `modified` is
    /// the directory's last-modified timestamp, used as the fallback when
    /// the name matches no period shape.
    ///
    /// With `retention_days == 0` every bucket is expired, so forced cleanup
    /// reclaims even a bucket whose period began today.
    pub fn is_expired(&self, name: &str, modified: NaiveDateTime, now: NaiveDateTime) -> bool {
        if self.retention_days == 0 {
            return true;
        }

        let cutoff = self.cutoff(now);
        match parse_bucket_date(name) {
            Some(date) => date.and_time(NaiveTime::MIN) < cutoff,
            None => modified < cutoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    #[test]
    fn test_cutoff_is_calendar_subtraction() {
        let policy = RotationPolicy::new(RotationGranularity::Daily, 7);
        assert_eq!(policy.cutoff(at(2024, 1, 10)), at(2024, 1, 3));
    }

    #[test]
    fn test_daily_bucket_expiry() {
        let policy = RotationPolicy::new(RotationGranularity::Daily, 7);
        let now = at(2024, 1, 10);

        assert!(policy.is_expired("2024-01-01", now, now));
        assert!(policy.is_expired("2024-01-02", now, now));
        // Exactly at the cutoff is not yet past it.
        assert!(!policy.is_expired("2024-01-03", now, now));
        assert!(!policy.is_expired("2024-01-09", now, now));
    }

    #[test]
    fn test_week_zero_not_expired_early_in_year() {
        let policy = RotationPolicy::new(RotationGranularity::Weekly, 30);
        let now = at(2024, 1, 5);
        assert!(!policy.is_expired("2024-W00", now, now));
    }

    #[test]
    fn test_modification_time_fallback() {
        let policy = RotationPolicy::new(RotationGranularity::Daily, 30);
        let now = at(2024, 6, 1);

        let old = now - Duration::days(40);
        assert!(policy.is_expired("not-a-date-bucket", old, now));

        let recent = now - Duration::days(10);
        assert!(!policy.is_expired("not-a-date-bucket", recent, now));
    }

    #[test]
    fn test_zero_retention_expires_everything() {
        let policy = RotationPolicy::new(RotationGranularity::Daily, 7).forced();
        let now = at(2024, 1, 10);

        assert_eq!(policy.retention_days, 0);
        assert!(policy.is_expired("2024-01-10", now, now));
        assert!(policy.is_expired("2099-12-31", now, now));
        assert!(policy.is_expired("not-a-date-bucket", now, now));
    }

    #[test]
    fn test_expiry_is_monotonic_in_now() {
        let policy = RotationPolicy::new(RotationGranularity::Daily, 7);
        let modified = at(2024, 1, 1);

        let mut now = at(2024, 1, 9);
        let mut was_expired = false;
        for _ in 0..30 {
            let expired = policy.is_expired("2024-01-01", modified, now);
            assert!(expired >= was_expired, "expiry regressed at {now}");
            was_expired = expired;
            now += Duration::days(1);
        }
        assert!(was_expired);
    }

    #[test]
    fn test_shorter_than_period() {
        assert!(RotationPolicy::new(RotationGranularity::Weekly, 3).shorter_than_period());
        assert!(!RotationPolicy::new(RotationGranularity::Weekly, 7).shorter_than_period());
        assert!(!RotationPolicy::new(RotationGranularity::Weekly, 0).shorter_than_period());
        assert!(!RotationPolicy::new(RotationGranularity::Daily, 1).shorter_than_period());
    }
}
