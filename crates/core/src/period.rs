use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// The last representable instant of `date` in UTC, i.e. 23:59:59.999999999.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (midnight + Duration::days(1) - Duration::nanoseconds(1)).and_utc()
}

/// Whether `instant` lies within `tolerance` (either side) of the end of `date`.
pub fn within_tolerance(instant: DateTime<Utc>, date: NaiveDate, tolerance: Duration) -> bool {
    let diff = instant.signed_duration_since(end_of_day(date));
    diff <= tolerance && diff >= -tolerance
}
