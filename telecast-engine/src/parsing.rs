//! Date/time and query-literal parsing shared by the loader and the query
//! AST (§4.C step 1, §4.F hour/day_of_week atoms).

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|_| Error::InvalidUsage(format!("bad date {s:?}, expected YYYY-MM-DD")))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parsed from a video file name of the form
/// `<channel>_<YYYYMMDD>_<HHMMSS>_…`. The timestamp is UTC in the name;
/// `tz` converts it to the configured local timezone before deriving
/// `date`/`hour`/`day_of_week`.
pub struct VideoNameTimestamp {
    pub date: NaiveDate,
    pub hour: u8,
    pub day_of_week: u8,
    pub minute_of_day: u32,
}

pub fn parse_date_from_video_name(name: &str, tz: Tz) -> Result<VideoNameTimestamp> {
    let parts: Vec<&str> = name.splitn(4, '_').collect();
    if parts.len() < 3 {
        return Err(Error::InvalidUsage(format!(
            "video name {name:?} does not match <channel>_<YYYYMMDD>_<HHMMSS>_…"
        )));
    }
    let (ymd, hms) = (parts[1], parts[2]);
    if ymd.len() != 8 || hms.len() != 6 {
        return Err(Error::InvalidUsage(format!("malformed timestamp in video name {name:?}")));
    }
    let naive = chrono::NaiveDateTime::parse_from_str(&format!("{ymd}{hms}"), "%Y%m%d%H%M%S")
        .map_err(|_| Error::InvalidUsage(format!("malformed timestamp in video name {name:?}")))?;

    let utc: DateTime<chrono::Utc> = chrono::Utc.from_utc_datetime(&naive);
    let local = utc.with_timezone(&tz);

    Ok(VideoNameTimestamp {
        date: local.date_naive(),
        hour: local.hour() as u8,
        day_of_week: local.date_naive().weekday().number_from_monday() as u8,
        minute_of_day: local.hour() * 60 + local.minute(),
    })
}

static HOUR_RANGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)(?:-(\d+))?$").unwrap());

/// Parses `"9"` or `"9-17"` into the inclusive hour set `{9}` or `{9..=17}`.
pub fn parse_hour_set(s: &str) -> Result<BTreeSet<u8>> {
    let caps = HOUR_RANGE_RE
        .captures(s.trim())
        .ok_or_else(|| Error::InvalidUsage(format!("bad hour spec {s:?}")))?;
    let h0: u32 = caps[1].parse().unwrap();
    let h1: u32 = caps.get(2).map(|m| m.as_str().parse().unwrap()).unwrap_or(h0);
    if h0 >= 24 || h1 > 23 || h0 > h1 {
        return Err(Error::InvalidUsage(format!("hour spec {s:?} out of range 0..23")));
    }
    Ok((h0 as u8..=h1 as u8).collect())
}

pub const DAYS_OF_WEEK: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

static DOW_RANGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?i)(\w{3})(?:-(\w{3}))?$").unwrap());

/// Parses `"mon"` or `"mon-fri"` into the ISO weekday set (Monday=1..Sunday=7).
pub fn parse_day_of_week_set(s: &str) -> Result<BTreeSet<u8>> {
    let caps = DOW_RANGE_RE
        .captures(s.trim())
        .ok_or_else(|| Error::InvalidUsage(format!("bad day-of-week spec {s:?}")))?;
    let lookup = |tok: &str| -> Result<u8> {
        let lower = tok.to_lowercase();
        DAYS_OF_WEEK
            .iter()
            .position(|d| *d == lower)
            .map(|i| i as u8 + 1)
            .ok_or_else(|| Error::InvalidUsage(format!("unknown day {tok:?}")))
    };
    let d0 = lookup(&caps[1])?;
    let d1 = caps.get(2).map(|m| lookup(m.as_str())).transpose()?.unwrap_or(d0);
    if d0 > d1 {
        return Err(Error::InvalidUsage(format!("day-of-week range {s:?} goes backwards")));
    }
    Ok((d0..=d1).collect())
}
