//! Overdue fine computation and the return grace rule

use chrono::{DateTime, Datelike, Duration, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;

use super::calendar::{end_of_day, is_closed, GRACE_WEEKDAY};

/// Fine accrued per late open day. Fixed library-wide; not configurable per
/// book or per user.
pub static DAILY_FINE_RATE: Lazy<Decimal> = Lazy::new(|| Decimal::new(500, 2));

/// Latest instant at which a return is still accepted.
///
/// A due date falling on a closed weekday is extended to the end of the
/// following grace day (Sunday); otherwise the cutoff is the end of the due
/// date itself.
pub fn return_cutoff(due_at: DateTime<Utc>) -> DateTime<Utc> {
    if !is_closed(due_at.weekday()) {
        return end_of_day(due_at);
    }
    let mut cutoff = due_at;
    while cutoff.weekday() != GRACE_WEEKDAY {
        cutoff += Duration::days(1);
    }
    end_of_day(cutoff)
}

/// Whether a return attempted at `now` is past the grace cutoff
pub fn is_late_return(due_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > return_cutoff(due_at)
}

/// Fine accrued between `reference` and `today`.
///
/// Dates are compared at midnight; while `today` has not passed `reference`
/// the fine is zero. Lateness is counted in whole elapsed days, closed
/// weekdays excluded, at the fixed daily rate. Used for the reservation and
/// library-wide overdue variants; the return path rejects late returns
/// instead of fining them.
pub fn overdue_fine(reference: DateTime<Utc>, today: DateTime<Utc>) -> Decimal {
    let reference_day = reference.date_naive();
    let today_day = today.date_naive();
    if today_day <= reference_day {
        return Decimal::ZERO;
    }

    let mut days_late = 0i64;
    let mut day = reference_day + Duration::days(1);
    while day <= today_day {
        if !is_closed(day.weekday()) {
            days_late += 1;
        }
        day += Duration::days(1);
    }

    Decimal::from(days_late) * *DAILY_FINE_RATE
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn fine_is_zero_on_the_reference_date() {
        let due = at(2024, 3, 18, 23);
        assert_eq!(overdue_fine(due, at(2024, 3, 18, 9)), Decimal::ZERO);
        assert_eq!(overdue_fine(due, at(2024, 3, 10, 9)), Decimal::ZERO);
    }

    #[test]
    fn fine_counts_open_days_only() {
        // Due Thu 2024-03-07; today Tue 2024-03-12.
        // Elapsed: Fri (closed), Sat (closed), Sun, Mon, Tue -> 3 open days.
        let fine = overdue_fine(at(2024, 3, 7, 23), at(2024, 3, 12, 9));
        assert_eq!(fine, Decimal::from(3) * *DAILY_FINE_RATE);
    }

    #[test]
    fn one_open_day_late_is_one_daily_rate() {
        let fine = overdue_fine(at(2024, 3, 4, 23), at(2024, 3, 5, 9));
        assert_eq!(fine, *DAILY_FINE_RATE);
    }

    #[test]
    fn cutoff_on_an_open_day_is_the_due_day_itself() {
        let due = at(2024, 3, 18, 23); // Monday
        assert_eq!(return_cutoff(due).date_naive(), due.date_naive());
        assert!(!is_late_return(due, at(2024, 3, 18, 23)));
        assert!(is_late_return(due, at(2024, 3, 19, 0)));
    }

    #[test]
    fn due_on_friday_gets_grace_until_sunday() {
        let due = at(2024, 3, 15, 23); // Friday
        let cutoff = return_cutoff(due);
        assert_eq!(cutoff.weekday(), Weekday::Sun);
        assert_eq!(cutoff.date_naive(), at(2024, 3, 17, 0).date_naive());
        assert!(!is_late_return(due, at(2024, 3, 17, 20)));
        assert!(is_late_return(due, at(2024, 3, 18, 8)));
    }

    #[test]
    fn due_on_saturday_gets_grace_until_sunday() {
        let due = at(2024, 3, 16, 23); // Saturday
        assert_eq!(return_cutoff(due).date_naive(), at(2024, 3, 17, 0).date_naive());
    }
}
