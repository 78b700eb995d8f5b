/// Timer settings model, as persisted in chrome.storage.local
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CountdownError;

/// Storage keys, one per settings field
pub const KEY_TIMER_TYPE: &str = "timerType";
pub const KEY_BIRTH_DATE: &str = "birthDate";
pub const KEY_LIFE_EXPECTANCY: &str = "lifeExpectancy";
pub const KEY_SETUP_COMPLETED: &str = "setupCompleted";

pub const SETTINGS_KEYS: [&str; 4] = [
    KEY_TIMER_TYPE,
    KEY_BIRTH_DATE,
    KEY_LIFE_EXPECTANCY,
    KEY_SETUP_COMPLETED,
];

pub const MAX_LIFE_EXPECTANCY_YEARS: f64 = 150.0;
/// Only whole years of the expectancy are counted
pub const MIN_LIFE_EXPECTANCY_YEARS: f64 = 1.0;

const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerKind {
    #[default]
    Daily,
    Birthday,
    Life,
}

impl TimerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerKind::Daily => "daily",
            TimerKind::Birthday => "birthday",
            TimerKind::Life => "life",
        }
    }

    /// Parse the value of a `<select>` option; unknown values fall back to daily
    pub fn from_value(value: &str) -> TimerKind {
        match value {
            "birthday" => TimerKind::Birthday,
            "life" => TimerKind::Life,
            _ => TimerKind::Daily,
        }
    }

    pub fn needs_birth_date(&self) -> bool {
        matches!(self, TimerKind::Birthday | TimerKind::Life)
    }
}

/// User-configured timer settings
///
/// Every field has a default so a first run (empty storage) or a partially
/// written record still deserializes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(rename = "timerType", default)]
    pub timer_kind: TimerKind,

    /// Calendar date as `YYYY-MM-DD`, the shape an `<input type="date">` yields
    #[serde(rename = "birthDate", default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,

    #[serde(rename = "lifeExpectancy", default, skip_serializing_if = "Option::is_none")]
    pub life_expectancy_years: Option<f64>,

    #[serde(rename = "setupCompleted", default)]
    pub setup_completed: bool,
}

impl TimerSettings {
    pub fn daily() -> Self {
        TimerSettings {
            timer_kind: TimerKind::Daily,
            setup_completed: true,
            ..Default::default()
        }
    }

    pub fn birthday(birth_date: &str) -> Self {
        TimerSettings {
            timer_kind: TimerKind::Birthday,
            birth_date: Some(birth_date.to_string()),
            life_expectancy_years: None,
            setup_completed: true,
        }
    }

    pub fn life(birth_date: &str, life_expectancy_years: f64) -> Self {
        TimerSettings {
            timer_kind: TimerKind::Life,
            birth_date: Some(birth_date.to_string()),
            life_expectancy_years: Some(life_expectancy_years),
            setup_completed: true,
        }
    }

    /// Build completed settings from the popup form's raw field values
    ///
    /// Fields the chosen kind does not use are dropped.
    pub fn from_form(
        kind: TimerKind,
        birth_date: &str,
        life_expectancy: &str,
        today: NaiveDate,
    ) -> Result<Self, CountdownError> {
        let birth_date = Some(birth_date.trim())
            .filter(|s| !s.is_empty() && kind.needs_birth_date())
            .map(str::to_string);

        let life_expectancy_years = match life_expectancy.trim() {
            raw if raw.is_empty() || kind != TimerKind::Life => None,
            raw => Some(raw.parse::<f64>().map_err(|_| {
                CountdownError::invalid(format!("Life expectancy '{}' is not a number", raw))
            })?),
        };

        let settings = TimerSettings {
            timer_kind: kind,
            birth_date,
            life_expectancy_years,
            setup_completed: true,
        };
        settings.validate(today)?;
        Ok(settings)
    }

    /// Check the per-kind field requirements against `today`
    pub fn validate(&self, today: NaiveDate) -> Result<(), CountdownError> {
        if self.timer_kind.needs_birth_date() {
            require_birth_date(self.birth_date.as_deref(), today)?;
        }
        if self.timer_kind == TimerKind::Life {
            require_life_expectancy(self.life_expectancy_years)?;
        }
        Ok(())
    }
}

/// Parse a stored `YYYY-MM-DD` birth date
pub fn parse_birth_date(raw: &str) -> Result<NaiveDate, CountdownError> {
    NaiveDate::parse_from_str(raw.trim(), BIRTH_DATE_FORMAT).map_err(|_| {
        CountdownError::invalid(format!(
            "Birth date '{}' is not a valid YYYY-MM-DD date",
            raw.trim()
        ))
    })
}

/// A present, parseable birth date that is not after `today`
pub fn require_birth_date(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate, CountdownError> {
    let raw = raw
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| CountdownError::invalid("Birth date is required"))?;

    let birth = parse_birth_date(raw)?;
    if birth > today {
        return Err(CountdownError::invalid("Birth date cannot be in the future"));
    }
    Ok(birth)
}

/// A present life expectancy in [1, 150] years
pub fn require_life_expectancy(years: Option<f64>) -> Result<f64, CountdownError> {
    match years {
        None => Err(CountdownError::invalid("Life expectancy is required")),
        Some(y) if !y.is_finite() || y <= 0.0 => Err(CountdownError::invalid(
            "Life expectancy must be a positive number of years",
        )),
        Some(y) if y < MIN_LIFE_EXPECTANCY_YEARS => Err(CountdownError::invalid(format!(
            "Life expectancy must be at least {} year",
            MIN_LIFE_EXPECTANCY_YEARS
        ))),
        Some(y) if y > MAX_LIFE_EXPECTANCY_YEARS => Err(CountdownError::invalid(format!(
            "Life expectancy cannot exceed {} years",
            MAX_LIFE_EXPECTANCY_YEARS
        ))),
        Some(y) => Ok(y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_default_settings() {
        let settings = TimerSettings::default();
        assert_eq!(settings.timer_kind, TimerKind::Daily);
        assert_eq!(settings.birth_date, None);
        assert!(!settings.setup_completed);
        assert!(settings.validate(today()).is_ok());
    }

    #[test]
    fn test_deserialize_empty_storage() {
        let settings: TimerSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, TimerSettings::default());
    }

    #[test]
    fn test_serialization_uses_storage_keys() {
        let settings = TimerSettings::life("1990-05-20", 80.0);

        let json = serde_json::to_value(&settings).unwrap();

        assert_eq!(json[KEY_TIMER_TYPE], "life");
        assert_eq!(json[KEY_BIRTH_DATE], "1990-05-20");
        assert_eq!(json[KEY_LIFE_EXPECTANCY], 80.0);
        assert_eq!(json[KEY_SETUP_COMPLETED], true);

        let deserialized: TimerSettings = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized, settings);
    }

    #[test]
    fn test_timer_kind_from_value() {
        assert_eq!(TimerKind::from_value("birthday"), TimerKind::Birthday);
        assert_eq!(TimerKind::from_value("life"), TimerKind::Life);
        assert_eq!(TimerKind::from_value("daily"), TimerKind::Daily);
        assert_eq!(TimerKind::from_value("weekly"), TimerKind::Daily);
        assert_eq!(TimerKind::Life.as_str(), "life");
    }

    #[test]
    fn test_validate_birthday_requires_date() {
        let mut settings = TimerSettings::birthday("");
        assert_eq!(
            settings.validate(today()),
            Err(CountdownError::invalid("Birth date is required"))
        );

        settings.birth_date = Some("1990-02-30".to_string());
        assert!(settings.validate(today()).is_err());

        settings.birth_date = Some("2030-01-01".to_string());
        assert_eq!(
            settings.validate(today()),
            Err(CountdownError::invalid("Birth date cannot be in the future"))
        );

        settings.birth_date = Some("1990-02-28".to_string());
        assert!(settings.validate(today()).is_ok());
    }

    #[test]
    fn test_validate_life_expectancy_range() {
        assert!(TimerSettings::life("1990-01-01", 80.0).validate(today()).is_ok());
        assert!(TimerSettings::life("1990-01-01", 150.0).validate(today()).is_ok());
        assert!(TimerSettings::life("1990-01-01", 150.5).validate(today()).is_err());
        assert!(TimerSettings::life("1990-01-01", 1.0).validate(today()).is_ok());
        assert_eq!(
            TimerSettings::life("1990-01-01", 0.5).validate(today()),
            Err(CountdownError::invalid("Life expectancy must be at least 1 year"))
        );
        assert!(TimerSettings::life("1990-01-01", 0.0).validate(today()).is_err());
        assert!(TimerSettings::life("1990-01-01", -3.0).validate(today()).is_err());
        assert!(TimerSettings::life("1990-01-01", f64::NAN).validate(today()).is_err());

        let mut missing = TimerSettings::life("1990-01-01", 80.0);
        missing.life_expectancy_years = None;
        assert_eq!(
            missing.validate(today()),
            Err(CountdownError::invalid("Life expectancy is required"))
        );
    }

    #[test]
    fn test_from_form() {
        let settings = TimerSettings::from_form(TimerKind::Life, "1990-05-20", " 82.5 ", today()).unwrap();
        assert_eq!(settings, TimerSettings::life("1990-05-20", 82.5));

        let settings = TimerSettings::from_form(TimerKind::Daily, "1990-05-20", "80", today()).unwrap();
        assert_eq!(settings, TimerSettings::daily());

        let settings = TimerSettings::from_form(TimerKind::Birthday, "1990-05-20", "abc", today()).unwrap();
        assert_eq!(settings, TimerSettings::birthday("1990-05-20"));
    }

    #[test]
    fn test_from_form_rejects_bad_input() {
        assert_eq!(
            TimerSettings::from_form(TimerKind::Life, "1990-05-20", "eighty", today()),
            Err(CountdownError::invalid("Life expectancy 'eighty' is not a number"))
        );
        assert_eq!(
            TimerSettings::from_form(TimerKind::Life, "1990-05-20", "", today()),
            Err(CountdownError::invalid("Life expectancy is required"))
        );
        assert_eq!(
            TimerSettings::from_form(TimerKind::Birthday, "", "", today()),
            Err(CountdownError::invalid("Birth date is required"))
        );
    }

    #[test]
    fn test_parse_birth_date_trims_whitespace() {
        assert_eq!(
            parse_birth_date(" 2000-02-29 "),
            Ok(NaiveDate::from_ymd_opt(2000, 2, 29).unwrap())
        );
        assert!(parse_birth_date("29/02/2000").is_err());
    }
}
