//! CF time coordinates
//!
//! Time axes store numeric offsets such as `days since 1979-01-01 00:00:00`.
//! This module parses those units with `chrono` so bounds can be given as dates.

use crate::errors::{Result, SpatialStatsError};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Date-time layouts accepted for reference dates and date bounds
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Calendars in which date arithmetic is plain proleptic Gregorian
const GREGORIAN_CALENDARS: &[&str] = &["standard", "gregorian", "proleptic_gregorian"];

/// Unit of a CF time offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    const fn seconds(self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
            Self::Hours => 3_600.0,
            Self::Days => 86_400.0,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "second" | "seconds" | "sec" | "secs" | "s" => Some(Self::Seconds),
            "minute" | "minutes" | "min" | "mins" => Some(Self::Minutes),
            "hour" | "hours" | "hr" | "hrs" | "h" => Some(Self::Hours),
            "day" | "days" | "d" => Some(Self::Days),
            _ => None,
        }
    }
}

/// Parsed `"<unit> since <reference>"` units string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub reference: NaiveDateTime,
}

impl TimeUnits {
    /// Parse a CF units string
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::Configuration`] for units that are not
    /// `seconds|minutes|hours|days since <date>`.
    pub fn parse(units: &str) -> Result<Self> {
        let invalid = || {
            SpatialStatsError::Configuration(format!(
                "unsupported time units '{units}', expected '<days|hours|minutes|seconds> since <date>'"
            ))
        };

        let (unit, reference) = units.trim().split_once(" since ").ok_or_else(invalid)?;
        let unit = TimeUnit::parse(unit.trim()).ok_or_else(invalid)?;
        let reference = parse_datetime(reference).ok_or_else(invalid)?;

        Ok(Self { unit, reference })
    }

    /// Offset of `datetime` from the reference, in these units
    #[must_use]
    pub fn offset_of(&self, datetime: NaiveDateTime) -> f64 {
        let delta = datetime.signed_duration_since(self.reference);
        #[allow(clippy::cast_precision_loss)]
        let seconds = delta.num_milliseconds() as f64 / 1_000.0;
        seconds / self.unit.seconds()
    }

    /// Date-time at `offset` from the reference, if representable
    #[must_use]
    pub fn datetime_at(&self, offset: f64) -> Option<NaiveDateTime> {
        if !offset.is_finite() {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)]
        let millis = (offset * self.unit.seconds() * 1_000.0).round() as i64;
        self.reference
            .checked_add_signed(chrono::Duration::milliseconds(millis))
    }
}

/// Parse a date or date-time, ignoring a trailing `Z`/`UTC`/`+00:00` designator
#[must_use]
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    let s = s
        .strip_suffix(" UTC")
        .or_else(|| s.strip_suffix('Z'))
        .or_else(|| s.strip_suffix("+00:00"))
        .unwrap_or(s)
        .trim();

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// A time bound: a raw axis offset or a calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeBound {
    /// Offset in the axis' own units (or an index in index mode)
    Offset(f64),
    /// Date string such as `1980-06-01` or `1980-06-01T12:00:00`
    Date(String),
}

impl TimeBound {
    /// Resolve to an offset on an axis with the given CF `units` and `calendar`
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::Configuration`] when a date cannot be parsed,
    /// the axis has no usable units, or its calendar is not Gregorian.
    pub fn resolve(&self, units: Option<&str>, calendar: Option<&str>) -> Result<f64> {
        match self {
            Self::Offset(v) => Ok(*v),
            Self::Date(text) => {
                let datetime = parse_datetime(text).ok_or_else(|| {
                    SpatialStatsError::Configuration(format!("cannot parse time bound '{text}'"))
                })?;
                let units = units.ok_or_else(|| {
                    SpatialStatsError::Configuration(format!(
                        "time bound '{text}' is a date but the time axis has no units"
                    ))
                })?;
                if let Some(calendar) = calendar {
                    if !GREGORIAN_CALENDARS.contains(&calendar.to_ascii_lowercase().as_str()) {
                        return Err(SpatialStatsError::Configuration(format!(
                            "date bounds are not supported for calendar '{calendar}'; give numeric offsets instead"
                        )));
                    }
                }
                Ok(TimeUnits::parse(units)?.offset_of(datetime))
            }
        }
    }

    /// Integer value for index-mode selection
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::Configuration`] for dates and non-integral offsets.
    pub fn as_index(&self) -> Result<usize> {
        match self {
            Self::Offset(v) if v.is_finite() && *v >= 0.0 && v.fract() == 0.0 => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                Ok(*v as usize)
            }
            other => Err(SpatialStatsError::Configuration(format!(
                "index-mode time bound must be a non-negative integer, got {other}"
            ))),
        }
    }
}

impl fmt::Display for TimeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offset(v) => write!(f, "{v}"),
            Self::Date(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for TimeBound {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty time bound".to_string());
        }
        match s.parse::<f64>() {
            Ok(v) => Ok(Self::Offset(v)),
            Err(_) if parse_datetime(s).is_some() => Ok(Self::Date(s.to_string())),
            Err(_) => Err(format!("'{s}' is neither a number nor a date (YYYY-MM-DD[THH:MM:SS])")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_units() {
        let units = TimeUnits::parse("days since 1979-01-01 00:00:00").unwrap();
        assert_eq!(units.unit, TimeUnit::Days);
        assert_eq!(units.reference, date(1979, 1, 1));

        let units = TimeUnits::parse("hours since 1900-01-01").unwrap();
        assert_eq!(units.unit, TimeUnit::Hours);

        assert!(TimeUnits::parse("months since 2000-01-01").is_err());
        assert!(TimeUnits::parse("days").is_err());
    }

    #[test]
    fn test_offset_round_trip() {
        let units = TimeUnits::parse("hours since 1900-01-01 00:00:00").unwrap();
        let offset = units.offset_of(date(1979, 1, 1));
        assert_relative_eq!(offset, 692_496.0);
        assert_eq!(units.datetime_at(offset), Some(date(1979, 1, 1)));
    }

    #[test]
    fn test_resolve_date_bound() {
        let bound = TimeBound::Date("2000-01-31".to_string());
        let offset = bound
            .resolve(Some("days since 2000-01-01"), Some("gregorian"))
            .unwrap();
        assert_relative_eq!(offset, 30.0);

        assert!(bound.resolve(None, None).is_err());
        assert!(bound
            .resolve(Some("days since 2000-01-01"), Some("360_day"))
            .is_err());
        assert_eq!(TimeBound::Offset(12.5).resolve(None, None).unwrap(), 12.5);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("42".parse::<TimeBound>().unwrap(), TimeBound::Offset(42.0));
        assert_eq!(
            "1985-07-01".parse::<TimeBound>().unwrap(),
            TimeBound::Date("1985-07-01".to_string())
        );
        assert!("yesterday".parse::<TimeBound>().is_err());
    }

    #[test]
    fn test_as_index() {
        assert_eq!(TimeBound::Offset(10.0).as_index().unwrap(), 10);
        assert!(TimeBound::Offset(1.5).as_index().is_err());
        assert!(TimeBound::Offset(-1.0).as_index().is_err());
        assert!(TimeBound::Date("2000-01-01".to_string()).as_index().is_err());
    }

    #[test]
    fn test_deserialize_untagged() {
        let bounds: Vec<TimeBound> = serde_json::from_str(r#"[3, "1990-01-01"]"#).unwrap();
        assert_eq!(bounds[0], TimeBound::Offset(3.0));
        assert_eq!(bounds[1], TimeBound::Date("1990-01-01".to_string()));
    }
}
