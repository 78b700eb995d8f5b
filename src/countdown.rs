/// Countdown calculators for the daily, birthday and life-expectancy timers
///
/// Every calculator takes the current local wall-clock time as an argument
/// and reads no clock itself, so the display loop decides what "now" is and
/// tests can pin it.
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::calendar::{
    add_years, birthday_in_year, decompose, midnight, ordinal_suffix, start_of_day, CalendarSpan,
    MILLIS_PER_DAY, MILLIS_PER_HOUR, MILLIS_PER_MINUTE, MILLIS_PER_SECOND,
};
use crate::error::CountdownError;
use crate::settings::{require_birth_date, require_life_expectancy, TimerKind, TimerSettings};

pub const LIFE_COMPLETE_MESSAGE: &str =
    "You have outlived your life expectancy. Every day from here is a bonus!";

/// Remaining time until a countdown target, plus progress through the cycle
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingTime {
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub total_millis: u64,
    /// 0-100
    pub progress_percentage: f64,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RemainingTime {
    fn from_span(span: CalendarSpan, total_millis: u64, progress: f64) -> Self {
        RemainingTime {
            years: span.years,
            months: span.months,
            days: span.days,
            hours: span.hours,
            minutes: span.minutes,
            seconds: span.seconds,
            total_millis,
            progress_percentage: clamp_progress(progress),
            is_complete: false,
            message: None,
        }
    }

    fn completed(message: &str) -> Self {
        RemainingTime {
            progress_percentage: 100.0,
            is_complete: true,
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }
}

/// Run the calculator selected by `settings`
pub fn calculate(settings: &TimerSettings, now: NaiveDateTime) -> Result<RemainingTime, CountdownError> {
    match settings.timer_kind {
        TimerKind::Daily => Ok(calculate_daily(now)),
        TimerKind::Birthday => calculate_birthday(now, settings.birth_date.as_deref()),
        TimerKind::Life => calculate_life(
            now,
            settings.birth_date.as_deref(),
            settings.life_expectancy_years,
        ),
    }
}

/// Countdown to the next local midnight
pub fn calculate_daily(now: NaiveDateTime) -> RemainingTime {
    let start = start_of_day(now);
    let target = start + TimeDelta::days(1);

    let elapsed = millis_between(start, now);
    let progress = elapsed as f64 / MILLIS_PER_DAY as f64 * 100.0;

    let remaining = millis_between(now, target);
    let span = CalendarSpan {
        hours: (remaining / MILLIS_PER_HOUR) as u32,
        minutes: (remaining % MILLIS_PER_HOUR / MILLIS_PER_MINUTE) as u32,
        seconds: (remaining % MILLIS_PER_MINUTE / MILLIS_PER_SECOND) as u32,
        millis: (remaining % MILLIS_PER_SECOND) as u32,
        ..Default::default()
    };

    RemainingTime::from_span(span, remaining as u64, progress)
}

/// Countdown to the next birthday
///
/// On the birthday itself the cycle restarts: progress is 0, the countdown
/// runs to next year's birthday and a congratulation message is attached.
pub fn calculate_birthday(
    now: NaiveDateTime,
    birth_date: Option<&str>,
) -> Result<RemainingTime, CountdownError> {
    let today = now.date();
    let birth = require_birth_date(birth_date, today)?;

    let next = next_birthday(today, birth).ok_or_else(out_of_range)?;
    let previous = birthday_in_year(birth, next.year() - 1).ok_or_else(out_of_range)?;
    let is_birthday = previous == today;

    let target = midnight(next);
    let cycle_start = midnight(previous);

    let progress = if is_birthday {
        0.0
    } else {
        millis_between(cycle_start, now) as f64 / millis_between(cycle_start, target) as f64 * 100.0
    };

    let message = if is_birthday {
        let age = (today.year() - birth.year()) as u32;
        (age > 0).then(|| format!("Happy {}{} Birthday!", age, ordinal_suffix(age)))
    } else {
        None
    };

    let remaining = RemainingTime::from_span(
        decompose(now, target),
        millis_between(now, target) as u64,
        progress,
    );
    Ok(remaining.with_message(message))
}

/// Countdown to the end of a life expectancy measured from the birth date
///
/// Only the whole-year part of `life_expectancy_years` is used.
pub fn calculate_life(
    now: NaiveDateTime,
    birth_date: Option<&str>,
    life_expectancy_years: Option<f64>,
) -> Result<RemainingTime, CountdownError> {
    let birth = require_birth_date(birth_date, now.date())?;
    let expectancy = require_life_expectancy(life_expectancy_years)?;

    let born = midnight(birth);
    let target = add_years(born, expectancy.trunc() as u32).ok_or_else(out_of_range)?;

    if target <= now {
        return Ok(RemainingTime::completed(LIFE_COMPLETE_MESSAGE));
    }

    let progress = millis_between(born, now) as f64 / millis_between(born, target) as f64 * 100.0;

    Ok(RemainingTime::from_span(
        decompose(now, target),
        millis_between(now, target) as u64,
        progress,
    ))
}

/// The date the birthday countdown targets, as seen on `today`
///
/// Today's birthday counts as passed, so the result is always after `today`.
pub fn next_birthday(today: NaiveDate, birth: NaiveDate) -> Option<NaiveDate> {
    let this_year = birthday_in_year(birth, today.year())?;
    if this_year > today {
        Some(this_year)
    } else {
        birthday_in_year(birth, today.year() + 1)
    }
}

fn millis_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    (end - start).num_milliseconds().max(0)
}

fn clamp_progress(progress: f64) -> f64 {
    if progress.is_finite() {
        progress.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn out_of_range() -> CountdownError {
    CountdownError::invalid("Date is outside the supported calendar range")
}
