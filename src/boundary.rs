use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Hour of the next morning at which a day's reflection closes.
pub const DEFAULT_CUTOFF_HOUR: u32 = 5;

/// Returns the day the user is "living in" at `now`.
///
/// Before the cutoff hour this is still the previous calendar day.
pub fn effective_day(now: NaiveDateTime, cutoff_hour: u32) -> NaiveDate {
    let today = now.date();
    if now.hour() < cutoff_hour {
        today - Duration::days(1)
    } else {
        today
    }
}

/// Returns whether a reflection may still be recorded for `date` at `now`.
///
/// A day opens at midnight and closes at the cutoff hour of the next day.
pub fn can_reflect_on(date: NaiveDate, now: NaiveDateTime, cutoff_hour: u32) -> bool {
    if date > now.date() {
        return false;
    }
    let cutoff = NaiveTime::from_hms_opt(cutoff_hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    now <= (date + Duration::days(1)).and_time(cutoff)
}
