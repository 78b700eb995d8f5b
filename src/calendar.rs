/// Calendar-aware date arithmetic used by the countdown calculators
///
/// Years and months are counted by stepping through the real calendar
/// (leap years, 28/29/30/31-day months) rather than by dividing by average
/// unit lengths, so a span from 2023-03-15 to 2024-05-20 reads as
/// "1 year, 2 months, 5 days" the way a person would count it.
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

pub const MILLIS_PER_SECOND: i64 = 1_000;
pub const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
pub const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
pub const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// A time span broken down into calendar units relative to a start instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarSpan {
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub millis: u32,
}

impl CalendarSpan {
    /// Milliseconds left over after the whole years and months
    pub fn remainder_millis(&self) -> i64 {
        self.days as i64 * MILLIS_PER_DAY
            + self.hours as i64 * MILLIS_PER_HOUR
            + self.minutes as i64 * MILLIS_PER_MINUTE
            + self.seconds as i64 * MILLIS_PER_SECOND
            + self.millis as i64
    }

    /// Re-accumulate the span onto `start`, inverse of [`decompose`]
    pub fn apply_to(&self, start: NaiveDateTime) -> Option<NaiveDateTime> {
        let after_years = step_years(start, self.years)?;
        let after_months = add_months(after_years, self.months)?;
        after_months.checked_add_signed(TimeDelta::milliseconds(self.remainder_millis()))
    }
}

/// Break `[start, end]` into whole calendar years, then whole calendar
/// months, then a day/hour/minute/second/millisecond remainder.
///
/// Years are stepped one at a time, so a Feb 29 start settles on Feb 28
/// after the first common year and stays there. Months are then counted
/// from that anniversary and never reach twelve.
///
/// Returns an empty span when `end` is not after `start`.
pub fn decompose(start: NaiveDateTime, end: NaiveDateTime) -> CalendarSpan {
    if end <= start {
        return CalendarSpan::default();
    }

    let mut years = 0;
    let mut after_years = start;
    while let Some(next) = add_years(after_years, 1).filter(|next| *next <= end) {
        after_years = next;
        years += 1;
    }

    // Always stepped from `after_years` so month-end clamping never drifts
    let mut months = 0;
    while matches!(add_months(after_years, months + 1), Some(next) if next <= end) {
        months += 1;
    }
    let cursor = add_months(after_years, months).unwrap_or(after_years);

    let mut rest = (end - cursor).num_milliseconds().max(0);
    let days = rest / MILLIS_PER_DAY;
    rest %= MILLIS_PER_DAY;
    let hours = rest / MILLIS_PER_HOUR;
    rest %= MILLIS_PER_HOUR;
    let minutes = rest / MILLIS_PER_MINUTE;
    rest %= MILLIS_PER_MINUTE;
    let seconds = rest / MILLIS_PER_SECOND;
    let millis = rest % MILLIS_PER_SECOND;

    CalendarSpan {
        years,
        months,
        days: days as u32,
        hours: hours as u32,
        minutes: minutes as u32,
        seconds: seconds as u32,
        millis: millis as u32,
    }
}

/// Advance by whole calendar years; Feb 29 lands on Feb 28 in common years
pub fn add_years(at: NaiveDateTime, years: u32) -> Option<NaiveDateTime> {
    add_months(at, years.checked_mul(12)?)
}

/// Advance one year at a time, the way [`decompose`] counts years
fn step_years(at: NaiveDateTime, years: u32) -> Option<NaiveDateTime> {
    (0..years).try_fold(at, |at, _| add_years(at, 1))
}

/// Advance by whole calendar months, clamping to the last day of short months
pub fn add_months(at: NaiveDateTime, months: u32) -> Option<NaiveDateTime> {
    at.checked_add_months(Months::new(months))
}

pub fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

/// The anniversary of `birth` in `year`, with Feb 29 mapped to Feb 28 in
/// common years
pub fn birthday_in_year(birth: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, birth.month(), birth.day()).or_else(|| {
        if birth.month() == 2 && birth.day() == 29 {
            NaiveDate::from_ymd_opt(year, 2, 28)
        } else {
            None
        }
    })
}

pub fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn start_of_day(at: NaiveDateTime) -> NaiveDateTime {
    midnight(at.date())
}

/// English ordinal suffix: 1st, 2nd, 3rd, 4th, 11th, 12th, 13th, 21st, ...
pub fn ordinal_suffix(n: u32) -> &'static str {
    if matches!(n % 100, 11..=13) {
        return "th";
    }
    match n % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}
