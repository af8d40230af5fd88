//! Parsing of `--since` expressions into a cutoff instant.
//!
//! Accepted forms:
//!
//! - relative: `now`, `today`, `yesterday`, `3 days ago`, `an hour ago`,
//!   and compact `1y`, `6mo`, `2w`, `10d`, `12h`, `30m`, `45s`
//! - absolute: RFC 3339, `YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DDTHH:MM:SS`,
//!   `YYYY-MM-DD` and `YYYY/MM/DD`, the naive ones read as local time
//!
//! ```
//! use chrono::{Local, TimeZone, Utc};
//! use ocrdex::since::parse_since_at;
//!
//! let now = Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
//! let cutoff = parse_since_at("1 year ago", now).unwrap();
//! let expected = Local.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap();
//! assert_eq!(cutoff, expected.with_timezone(&Utc));
//! ```

use chrono::{
    DateTime,
    Local,
    Months,
    NaiveDate,
    NaiveDateTime,
    TimeDelta,
    TimeZone,
    Utc,
};

use crate::error::{Error, Result};

const DATETIME_FORMATS: &[&str] =
    &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl Unit {
    fn parse(s: &str) -> Option<Self> {
        let unit = match s {
            "s" | "sec" | "secs" | "second" | "seconds" => Self::Seconds,
            "m" | "min" | "mins" | "minute" | "minutes" => Self::Minutes,
            "h" | "hr" | "hrs" | "hour" | "hours" => Self::Hours,
            "d" | "day" | "days" => Self::Days,
            "w" | "wk" | "wks" | "week" | "weeks" => Self::Weeks,
            "mo" | "mon" | "month" | "months" => Self::Months,
            "y" | "yr" | "yrs" | "year" | "years" => Self::Years,
            _ => return None,
        };
        Some(unit)
    }
}

/// Parse an optional `--since` expression relative to the current time.
///
/// Absent or blank input means no cutoff.
pub fn parse_since(expr: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match expr.map(str::trim) {
        None | Some("") => Ok(None),
        Some(expr) => parse_since_at(expr, Local::now()).map(Some),
    }
}

/// Parse `expr` against a fixed reference instant.
pub fn parse_since_at(
    expr: &str,
    now: DateTime<Local>,
) -> Result<DateTime<Utc>> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(parse_error(expr, "empty expression"));
    }

    if let Some(instant) = parse_absolute(trimmed)? {
        return Ok(instant);
    }

    let lowered = trimmed.to_lowercase();
    let local = match lowered.as_str() {
        "now" => now,
        "today" => start_of_day(now, 0).ok_or_else(|| {
            parse_error(expr, "local midnight does not exist")
        })?,
        "yesterday" => start_of_day(now, 1).ok_or_else(|| {
            parse_error(expr, "local midnight does not exist")
        })?,
        relative => {
            let (amount, unit) = split_relative(relative)
                .ok_or_else(|| parse_error(expr, "unrecognized format"))?;
            subtract(now, amount, unit)
                .ok_or_else(|| parse_error(expr, "out of range"))?
        }
    };

    Ok(local.with_timezone(&Utc))
}

fn parse_absolute(s: &str) -> Result<Option<DateTime<Utc>>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    let naive = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS.iter().find_map(|fmt| {
                NaiveDate::parse_from_str(s, fmt)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
        });

    match naive {
        None => Ok(None),
        Some(naive) => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .ok_or_else(|| parse_error(s, "no such local time")),
    }
}

/// Split `"3 days ago"`, `"an hour ago"` or `"1y"` into amount and unit.
fn split_relative(s: &str) -> Option<(u32, Unit)> {
    let s = s.strip_suffix("ago").unwrap_or(s).trim_end();

    if let Some((amount, unit)) = s.split_once(char::is_whitespace) {
        let amount = match amount {
            "a" | "an" => 1,
            n => n.parse().ok()?,
        };
        return Some((amount, Unit::parse(unit.trim())?));
    }

    let split = s.find(|c: char| !c.is_ascii_digit())?;
    let (amount, unit) = s.split_at(split);
    Some((amount.parse().ok()?, Unit::parse(unit)?))
}

fn subtract(
    now: DateTime<Local>,
    amount: u32,
    unit: Unit,
) -> Option<DateTime<Local>> {
    let amount_i = i64::from(amount);
    let delta = match unit {
        Unit::Seconds => TimeDelta::try_seconds(amount_i)?,
        Unit::Minutes => TimeDelta::try_minutes(amount_i)?,
        Unit::Hours => TimeDelta::try_hours(amount_i)?,
        Unit::Days => TimeDelta::try_days(amount_i)?,
        Unit::Weeks => TimeDelta::try_weeks(amount_i)?,
        Unit::Months => return now.checked_sub_months(Months::new(amount)),
        Unit::Years => {
            return now
                .checked_sub_months(Months::new(amount.checked_mul(12)?));
        }
    };
    now.checked_sub_signed(delta)
}

fn start_of_day(
    now: DateTime<Local>,
    days_back: u64,
) -> Option<DateTime<Local>> {
    let date = now
        .date_naive()
        .checked_sub_days(chrono::Days::new(days_back))?;
    Local
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .earliest()
}

fn parse_error(input: &str, reason: &str) -> Error {
    Error::DateParse {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn absent_or_blank_means_no_cutoff() {
        assert_eq!(parse_since(None).unwrap(), None);
        assert_eq!(parse_since(Some("   ")).unwrap(), None);
    }

    #[test]
    fn year_ago_long_and_compact() {
        let expected = local(2023, 6, 15, 12);
        assert_eq!(parse_since_at("1 year ago", now()).unwrap(), expected);
        assert_eq!(parse_since_at("1y", now()).unwrap(), expected);
        assert_eq!(parse_since_at("a year ago", now()).unwrap(), expected);
        assert_eq!(parse_since_at("1 YEAR AGO", now()).unwrap(), expected);
    }

    #[test]
    fn calendar_months() {
        assert_eq!(
            parse_since_at("3 months ago", now()).unwrap(),
            local(2024, 3, 15, 12)
        );
        assert_eq!(
            parse_since_at("3mo", now()).unwrap(),
            local(2024, 3, 15, 12)
        );
    }

    #[test]
    fn fixed_durations() {
        let base = now().with_timezone(&Utc);
        assert_eq!(
            parse_since_at("3 days ago", now()).unwrap(),
            base - TimeDelta::days(3)
        );
        assert_eq!(
            parse_since_at("2w", now()).unwrap(),
            base - TimeDelta::weeks(2)
        );
        assert_eq!(
            parse_since_at("an hour ago", now()).unwrap(),
            base - TimeDelta::hours(1)
        );
        assert_eq!(
            parse_since_at("30m", now()).unwrap(),
            base - TimeDelta::minutes(30)
        );
        assert_eq!(
            parse_since_at("45 secs ago", now()).unwrap(),
            base - TimeDelta::seconds(45)
        );
    }

    #[test]
    fn named_instants() {
        assert_eq!(
            parse_since_at("now", now()).unwrap(),
            now().with_timezone(&Utc)
        );
        assert_eq!(
            parse_since_at("today", now()).unwrap(),
            local(2024, 6, 15, 0)
        );
        assert_eq!(
            parse_since_at("Yesterday", now()).unwrap(),
            local(2024, 6, 14, 0)
        );
    }

    #[test]
    fn absolute_dates() {
        assert_eq!(
            parse_since_at("2024-01-02", now()).unwrap(),
            local(2024, 1, 2, 0)
        );
        assert_eq!(
            parse_since_at("2024/01/02", now()).unwrap(),
            local(2024, 1, 2, 0)
        );
        assert_eq!(
            parse_since_at("2024-01-02 07:00:00", now()).unwrap(),
            local(2024, 1, 2, 7)
        );
        assert_eq!(
            parse_since_at("2024-01-02T03:04:05Z", now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
        );
    }

    #[test]
    fn garbage_is_a_parse_error() {
        for input in ["whenever", "3 fortnights ago", "y", "12", "2024-13-01"]
        {
            let err = parse_since_at(input, now()).unwrap_err();
            assert!(
                matches!(err, Error::DateParse { input: ref i, .. } if i == input),
                "expected parse error for {input:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn overflow_is_a_parse_error() {
        let err = parse_since_at("4294967295y", now()).unwrap_err();
        assert!(matches!(err, Error::DateParse { .. }));
    }
}
