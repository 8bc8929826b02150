//! Accumulator & post-filter (§4.G): the commercial join, date-bucket
//! aggregation, and the per-video (`/search-videos`) sibling shape.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::context::DataContext;
use crate::index::IsetReader;
use crate::interval::{self, Interval};
use crate::result::LazyItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateBy {
    Day,
    Week,
    Month,
    Year,
}

pub fn bucket_date(date: NaiveDate, by: AggregateBy) -> NaiveDate {
    match by {
        AggregateBy::Day => date,
        AggregateBy::Week => date - chrono::Duration::days(date.weekday().num_days_from_monday() as i64),
        AggregateBy::Month => date.with_day(1).unwrap(),
        AggregateBy::Year => date.with_month(1).unwrap().with_day(1).unwrap(),
    }
}

/// `is_commercial` join mode; default is `Exclude` (strip commercials).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsCommercial {
    Include,
    Exclude,
    Both,
}

impl Default for IsCommercial {
    fn default() -> Self {
        IsCommercial::Exclude
    }
}

fn join_commercials(intervals: &[Interval], commercial: &dyn IsetReader, video_id: u32, mode: IsCommercial) -> Vec<Interval> {
    match mode {
        IsCommercial::Both => intervals.to_vec(),
        IsCommercial::Include => commercial.intersect(video_id, intervals, true),
        IsCommercial::Exclude => commercial.minus(video_id, intervals, true),
    }
}

#[derive(Debug, Clone)]
pub enum DateAccumulator {
    Detailed(BTreeMap<NaiveDate, Vec<(u32, f64)>>),
    Simple(BTreeMap<NaiveDate, f64>),
}

impl DateAccumulator {
    pub fn detailed() -> Self {
        DateAccumulator::Detailed(BTreeMap::new())
    }

    pub fn simple() -> Self {
        DateAccumulator::Simple(BTreeMap::new())
    }

    /// Detailed buckets only keep positive contributions; simple buckets
    /// accumulate unconditionally (§4.G).
    fn add(&mut self, bucket: NaiveDate, video_id: u32, seconds: f64) {
        match self {
            DateAccumulator::Detailed(map) => {
                if seconds > 0.0 {
                    map.entry(bucket).or_default().push((video_id, seconds));
                }
            }
            DateAccumulator::Simple(map) => {
                *map.entry(bucket).or_insert(0.0) += seconds;
            }
        }
    }

    pub fn detailed_buckets(&self) -> Option<&BTreeMap<NaiveDate, Vec<(u32, f64)>>> {
        match self {
            DateAccumulator::Detailed(map) => Some(map),
            DateAccumulator::Simple(_) => None,
        }
    }

    pub fn simple_buckets(&self) -> Option<&BTreeMap<NaiveDate, f64>> {
        match self {
            DateAccumulator::Simple(map) => Some(map),
            DateAccumulator::Detailed(_) => None,
        }
    }
}

pub fn accumulate(
    items: &[LazyItem],
    data: &DataContext,
    aggregate_by: AggregateBy,
    is_commercial: IsCommercial,
    detailed: bool,
) -> DateAccumulator {
    let mut acc = if detailed { DateAccumulator::detailed() } else { DateAccumulator::simple() };
    for item in items {
        let Some(video) = data.videos.get(item.video_id) else {
            continue;
        };
        let intervals = if item.is_entire_video {
            vec![video.entire_interval_ms()]
        } else {
            item.intervals.clone()
        };
        let joined = join_commercials(&intervals, data.commercial_iset.as_ref(), video.id, is_commercial);
        if joined.is_empty() {
            continue;
        }
        let seconds: f64 = joined.iter().map(|&(s, e)| (e - s) as f64 / 1000.0).sum();
        acc.add(bucket_date(video.date, aggregate_by), video.id, seconds);
    }
    acc
}

/// `/search-videos` caps the input id list at this size (§4.G, confirmed
/// by the original route's literal `len(video_ids) > 10` check).
pub const MAX_VIDEO_SEARCH_IDS: usize = 10;

/// Deoverlap fuzz applied to `/search-videos` presentational output.
pub const VIDEO_SEARCH_MERGE_FUZZ_SEC: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct VideoSearchEntry {
    pub video_id: u32,
    pub intervals_sec: Vec<(f64, f64)>,
}

pub fn search_videos(items: &[LazyItem], data: &DataContext, is_commercial: IsCommercial) -> Vec<VideoSearchEntry> {
    let mut out = Vec::new();
    for item in items {
        let Some(video) = data.videos.get(item.video_id) else {
            continue;
        };
        let intervals = if item.is_entire_video {
            vec![video.entire_interval_ms()]
        } else {
            item.intervals.clone()
        };
        let joined = join_commercials(&intervals, data.commercial_iset.as_ref(), video.id, is_commercial);
        if joined.is_empty() {
            continue;
        }
        let sec: Vec<(f64, f64)> = joined.iter().map(|&(s, e)| (s as f64 / 1000.0, e as f64 / 1000.0)).collect();
        out.push(VideoSearchEntry {
            video_id: video.id,
            intervals_sec: interval::merge_close(sec, VIDEO_SEARCH_MERGE_FUZZ_SEC),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_week_rounds_to_monday() {
        let wed = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap(); // a Wednesday
        assert_eq!(bucket_date(wed, AggregateBy::Week), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn bucket_month_and_year() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 30).unwrap();
        assert_eq!(bucket_date(date, AggregateBy::Month), NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        assert_eq!(bucket_date(date, AggregateBy::Year), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn detailed_accumulator_skips_zero_contributions() {
        let mut acc = DateAccumulator::detailed();
        acc.add(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 1, 0.0);
        acc.add(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 2, 5.0);
        assert_eq!(acc.detailed_buckets().unwrap().values().next().unwrap().len(), 1);
    }
}
