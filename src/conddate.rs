//! Date cutoffs for `%<[NP?...>` conditions.

use chrono::{DateTime, Datelike, Duration, Local, LocalResult, Months, NaiveDate, NaiveTime, Timelike};

use crate::node::DatePeriod;

/// Compute the cutoff for a "newer than `count` × `period`" test against
/// `now`. A zero count means the start of the current unit (midnight today,
/// first of the month, Monday of this week, ...). A render-time timestamp
/// strictly greater than the cutoff passes the test.
pub(crate) fn cutoff(now: DateTime<Local>, count: usize, period: DatePeriod) -> DateTime<Local> {
    if count == 0 {
        return start_of(now, period);
    }
    // parse_number bounds count below u16::MAX, so none of these overflow
    match period {
        DatePeriod::Year => now
            .checked_sub_months(Months::new(12 * count as u32))
            .unwrap_or(now),
        DatePeriod::Month => now
            .checked_sub_months(Months::new(count as u32))
            .unwrap_or(now),
        DatePeriod::Week => now - Duration::weeks(count as i64),
        DatePeriod::Day => now - Duration::days(count as i64),
        DatePeriod::Hour => now - Duration::hours(count as i64),
        DatePeriod::Minute => now - Duration::minutes(count as i64),
    }
}

fn start_of(now: DateTime<Local>, period: DatePeriod) -> DateTime<Local> {
    match period {
        DatePeriod::Hour => now
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now),
        DatePeriod::Minute => now
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now),
        DatePeriod::Year | DatePeriod::Month | DatePeriod::Week | DatePeriod::Day => {
            let date = now.date_naive();
            let date = match period {
                DatePeriod::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
                DatePeriod::Month => date.with_day(1).unwrap_or(date),
                DatePeriod::Week => {
                    date - Duration::days(date.weekday().num_days_from_monday() as i64)
                }
                _ => date,
            };
            match date.and_time(NaiveTime::MIN).and_local_timezone(Local) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
                // midnight skipped by a DST transition; fall back to `now`
                LocalResult::None => now,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // Thursday afternoon
    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2023, 6, 15, 14, 30, 45).unwrap()
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn zero_count_is_start_of_unit() {
        assert_eq!(cutoff(now(), 0, DatePeriod::Minute), at(2023, 6, 15, 14, 30, 0));
        assert_eq!(cutoff(now(), 0, DatePeriod::Hour), at(2023, 6, 15, 14, 0, 0));
        assert_eq!(cutoff(now(), 0, DatePeriod::Day), at(2023, 6, 15, 0, 0, 0));
        assert_eq!(cutoff(now(), 0, DatePeriod::Week), at(2023, 6, 12, 0, 0, 0));
        assert_eq!(cutoff(now(), 0, DatePeriod::Month), at(2023, 6, 1, 0, 0, 0));
        assert_eq!(cutoff(now(), 0, DatePeriod::Year), at(2023, 1, 1, 0, 0, 0));
    }

    #[test]
    fn nonzero_count_subtracts() {
        assert_eq!(cutoff(now(), 10, DatePeriod::Minute), at(2023, 6, 15, 14, 20, 45));
        assert_eq!(cutoff(now(), 3, DatePeriod::Hour), at(2023, 6, 15, 11, 30, 45));
        assert_eq!(cutoff(now(), 3, DatePeriod::Day), at(2023, 6, 12, 14, 30, 45));
        assert_eq!(cutoff(now(), 2, DatePeriod::Week), at(2023, 6, 1, 14, 30, 45));
        assert_eq!(cutoff(now(), 2, DatePeriod::Month), at(2023, 4, 15, 14, 30, 45));
        assert_eq!(cutoff(now(), 1, DatePeriod::Year), at(2022, 6, 15, 14, 30, 45));
    }

    #[test]
    fn month_subtraction_clamps_short_months() {
        let end_of_may = at(2023, 5, 31, 12, 0, 0);
        assert_eq!(cutoff(end_of_may, 1, DatePeriod::Month), at(2023, 4, 30, 12, 0, 0));
    }
}
