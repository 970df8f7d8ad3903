//! Due-date and reservation-deadline arithmetic.
//!
//! The library is closed on Fridays and Saturdays; both are skipped when a
//! due date lands on them and neither counts toward a reservation window.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc, Weekday};
use chrono::Datelike;
use once_cell::sync::Lazy;

/// Loan period in calendar days
pub const LOAN_PERIOD_DAYS: i64 = 14;

/// Number of qualifying (open) days a reservation stays collectable
pub const RESERVATION_WINDOW_DAYS: u32 = 3;

/// Weekdays on which the library is closed
pub const CLOSED_WEEKDAYS: [Weekday; 2] = [Weekday::Fri, Weekday::Sat];

/// Grace day for returns whose due date falls on a closed weekday
pub const GRACE_WEEKDAY: Weekday = Weekday::Sun;

static END_OF_DAY: Lazy<NaiveTime> =
    Lazy::new(|| NaiveTime::from_hms_milli_opt(23, 59, 59, 999).expect("valid time of day"));

pub fn is_closed(day: Weekday) -> bool {
    CLOSED_WEEKDAYS.contains(&day)
}

/// Normalize a timestamp to the last representable instant of its day
pub fn end_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&at.date_naive().and_time(*END_OF_DAY))
}

/// Due date for a loan issued at `issued_at`: 14 calendar days later,
/// walked forward past the closed weekdays, end of day.
///
/// An issue date that itself falls on a closed day is not special-cased;
/// the forward walk only applies to the computed result.
pub fn due_date(issued_at: DateTime<Utc>) -> DateTime<Utc> {
    let mut due = issued_at + Duration::days(LOAN_PERIOD_DAYS);
    while is_closed(due.weekday()) {
        due += Duration::days(1);
    }
    end_of_day(due)
}

/// Collection deadline for a reservation made at `reserved_at`: walk forward
/// one calendar day at a time, counting only open days, until exactly
/// `RESERVATION_WINDOW_DAYS` qualifying days have passed; end of day.
pub fn reservation_deadline(reserved_at: DateTime<Utc>) -> DateTime<Utc> {
    let mut deadline = reserved_at;
    let mut qualifying = 0;
    while qualifying < RESERVATION_WINDOW_DAYS {
        deadline += Duration::days(1);
        if !is_closed(deadline.weekday()) {
            qualifying += 1;
        }
    }
    end_of_day(deadline)
}
