/// Next-occurrence arithmetic for recurring bookings
///
/// Schedules fire at `scheduled_time` (UTC, `HH:MM`). The next occurrence is
/// always on a later calendar day than the reference instant.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::models::recurring::RecurrenceFrequency;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("Invalid frequency: {0}")]
    UnknownFrequency(String),

    #[error("Invalid scheduled_time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("day_of_week (0-6) is required for weekly tasks")]
    MissingDayOfWeek,

    #[error("day_of_month (1-31) is required for monthly tasks")]
    MissingDayOfMonth,

    #[error("day_of_week must be between 0 and 6, got {0}")]
    InvalidDayOfWeek(i32),

    #[error("day_of_month must be between 1 and 31, got {0}")]
    InvalidDayOfMonth(i32),
}

/// Parses `HH:MM`
pub fn parse_scheduled_time(value: &str) -> Result<NaiveTime, RecurrenceError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| RecurrenceError::InvalidTime(value.to_string()))
}

/// Checks the day fields a frequency needs
pub fn validate_schedule(
    frequency: RecurrenceFrequency,
    scheduled_time: &str,
    day_of_week: Option<i32>,
    day_of_month: Option<i32>,
) -> Result<(), RecurrenceError> {
    parse_scheduled_time(scheduled_time)?;

    match frequency {
        RecurrenceFrequency::Weekly => match day_of_week {
            None => Err(RecurrenceError::MissingDayOfWeek),
            Some(d) if !(0..=6).contains(&d) => Err(RecurrenceError::InvalidDayOfWeek(d)),
            Some(_) => Ok(()),
        },
        RecurrenceFrequency::Monthly => match day_of_month {
            None => Err(RecurrenceError::MissingDayOfMonth),
            Some(d) if !(1..=31).contains(&d) => Err(RecurrenceError::InvalidDayOfMonth(d)),
            Some(_) => Ok(()),
        },
        RecurrenceFrequency::Daily | RecurrenceFrequency::Biweekly => Ok(()),
    }
}

/// Next firing instant strictly after `after`'s calendar day
///
/// - daily: the next day
/// - weekly: the next `day_of_week` (0 = Monday) after today
/// - biweekly: 14 days on
/// - monthly: `day_of_month` of next month, clamped to the month's length
pub fn next_occurrence(
    after: DateTime<Utc>,
    frequency: RecurrenceFrequency,
    scheduled_time: &str,
    day_of_week: Option<i32>,
    day_of_month: Option<i32>,
) -> Result<DateTime<Utc>, RecurrenceError> {
    validate_schedule(frequency, scheduled_time, day_of_week, day_of_month)?;
    let time = parse_scheduled_time(scheduled_time)?;
    let today = after.date_naive();

    let date = match frequency {
        RecurrenceFrequency::Daily => today + Duration::days(1),
        RecurrenceFrequency::Weekly => {
            let target = day_of_week.ok_or(RecurrenceError::MissingDayOfWeek)? as i64;
            let current = today.weekday().num_days_from_monday() as i64;
            let mut ahead = (target - current).rem_euclid(7);
            if ahead == 0 {
                ahead = 7;
            }
            today + Duration::days(ahead)
        }
        RecurrenceFrequency::Biweekly => today + Duration::days(14),
        RecurrenceFrequency::Monthly => {
            let day = day_of_month.ok_or(RecurrenceError::MissingDayOfMonth)? as u32;
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            let last = days_in_month(year, month);
            NaiveDate::from_ymd_opt(year, month, day.min(last))
                .ok_or(RecurrenceError::InvalidDayOfMonth(day as i32))?
        }
    };

    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}
