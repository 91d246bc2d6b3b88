use chrono::{DateTime, Datelike, TimeDelta, Timelike, Utc};

/// Julian day of the J2000.0 epoch (2000-01-01 12:00 TT, treated as UTC here).
pub const J2000: f64 = 2_451_545.0;

/// Julian day of the Unix epoch.
pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;

const DAYS_PER_CENTURY: f64 = 36_525.0;

/// Converts a UTC instant to a Julian day number (Meeus, ch. 7).
///
/// Sub-second precision is dropped, so the result is monotonically
/// non-decreasing in wall-clock time with one-second resolution.
pub fn to_julian_day(at: DateTime<Utc>) -> f64 {
    let mut year = at.year() as f64;
    let mut month = at.month() as f64;
    let day = at.day() as f64
        + at.hour() as f64 / 24.0
        + at.minute() as f64 / 1440.0
        + at.second() as f64 / 86_400.0;

    if month <= 2.0 {
        year -= 1.0;
        month += 12.0;
    }

    let a = (year / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();

    (365.25 * (year + 4716.0)).floor() + (30.6001 * (month + 1.0)).floor() + day + b - 1524.5
}

/// Converts a Julian day back to a UTC instant, rounded to the millisecond.
///
/// Returns `None` for non-finite input or dates chrono cannot represent.
pub fn from_julian_day(jd: f64) -> Option<DateTime<Utc>> {
    let millis = ((jd - UNIX_EPOCH_JD) * 86_400_000.0).round();
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// Offsets `base` (whose Julian day is `base_jd`) to the instant at `jd`.
pub(crate) fn offset_from(base: DateTime<Utc>, base_jd: f64, jd: f64) -> DateTime<Utc> {
    let millis = ((jd - base_jd) * 86_400_000.0).round() as i64;
    base + TimeDelta::milliseconds(millis)
}

/// Julian centuries elapsed since J2000.0.
pub fn julian_centuries(jd: f64) -> f64 {
    (jd - J2000) / DAYS_PER_CENTURY
}
