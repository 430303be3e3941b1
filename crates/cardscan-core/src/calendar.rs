//! Period calendar: pure mappings between timestamps and bucket names.
//!
//! Bucket names encode the rotation period of the output they hold:
//! - Daily: `YYYY-MM-DD`
//! - Weekly: `YYYY-Wnn`, Sunday-anchored and 0-indexed (`%U`): days before
//!   the first Sunday of the year belong to week 0, the first Sunday starts
//!   week 1
//! - Monthly: `YYYY-MM`
//!
//! Parsing a weekly name yields the Monday of that week. For week 0 the
//! Monday of the partial leading week may fall in the previous year; this
//! year-boundary drift is a pinned approximation, not a bug.

use chrono::{Datelike, Duration, NaiveDate};

use crate::config::RotationGranularity;

/// Format the bucket name for the period containing `date`.
///
/// Deterministic and pure: every timestamp within one period maps to the
/// same name.
pub fn bucket_name(date: NaiveDate, granularity: RotationGranularity) -> String {
    match granularity {
        RotationGranularity::Daily => date.format("%Y-%m-%d").to_string(),
        RotationGranularity::Weekly => date.format("%Y-W%U").to_string(),
        RotationGranularity::Monthly => date.format("%Y-%m").to_string(),
    }
}

/// Parse a bucket name back to a representative date for age comparison.
///
/// Tries the weekly shape first (week marker), then daily (three
/// dash-separated components), then monthly (two components). The ordering
/// matters: standard names are unambiguous, but the weekly marker must win
/// before component counting. Returns `None` when the name matches no shape,
/// in which case callers fall back to the directory's modification time.
pub fn parse_bucket_date(name: &str) -> Option<NaiveDate> {
    if let Some((year, week)) = name.split_once("-W") {
        let year: i32 = year.parse().ok()?;
        let week: u32 = week.parse().ok()?;
        if week > 53 {
            return None;
        }
        return monday_of_week(year, week);
    }

    let parts: Vec<&str> = name.split('-').collect();
    match parts.len() {
        3 => NaiveDate::parse_from_str(name, "%Y-%m-%d").ok(),
        2 => {
            let year: i32 = parts[0].parse().ok()?;
            let month: u32 = parts[1].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, 1)
        }
        _ => None,
    }
}

/// Monday of Sunday-anchored week `week` of `year`.
///
/// Week `n >= 1` starts on `first_sunday + 7 * (n - 1)`; week 0 is the
/// partial span before the first Sunday, whose Monday may precede Jan 1.
fn monday_of_week(year: i32, week: u32) -> Option<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let to_first_sunday = (7 - jan1.weekday().num_days_from_sunday()) % 7;
    let first_sunday = jan1 + Duration::days(i64::from(to_first_sunday));
    let week_start = first_sunday + Duration::days((i64::from(week) - 1) * 7);
    Some(week_start + Duration::days(1))
}
