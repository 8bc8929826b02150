//! [`SearchContext`]: the hoistable scalar/set filters every leaf query
//! contributes, and their field-wise meet under conjunction (§4.D).

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::video::Video;

/// A conjunction of cheap, pre-video-scan filters. Every field is
/// "unconstrained" when `None`; a context with every field `None` selects
/// every video. Two contexts combine by [`and_search_contexts`]; there is
/// no direct OR — disjunction happens at the [`crate::query::SearchResult`]
/// level once contexts have been resolved to video sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchContext {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub videos: Option<BTreeSet<u32>>,
    pub channel: Option<String>,
    pub show: Option<String>,
    pub hours: Option<BTreeSet<u8>>,
    pub days_of_week: Option<BTreeSet<u8>>,
    /// Milliseconds of dilation applied around transcript search hits;
    /// `0` means no dilation. Not itself a video filter.
    pub text_window: i32,
}

impl SearchContext {
    pub fn is_unconstrained(&self) -> bool {
        self == &SearchContext::default()
    }
}

/// The meet of two contexts under AND: scalars must agree (or one side is
/// unconstrained), sets intersect, date ranges narrow. Returns `None` if
/// the combination can never match any video (e.g. disjoint channels, or
/// an empty date range).
pub fn and_search_contexts(a: &SearchContext, b: &SearchContext) -> Option<SearchContext> {
    let start_date = match (a.start_date, b.start_date) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (None, None) => None,
    };
    let end_date = match (a.end_date, b.end_date) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (None, None) => None,
    };
    if let (Some(s), Some(e)) = (start_date, end_date) {
        if s > e {
            return None;
        }
    }

    let videos = match (&a.videos, &b.videos) {
        (Some(x), Some(y)) => {
            let merged: BTreeSet<u32> = x.intersection(y).copied().collect();
            if merged.is_empty() {
                return None;
            }
            Some(merged)
        }
        (Some(x), None) => Some(x.clone()),
        (None, Some(y)) => Some(y.clone()),
        (None, None) => None,
    };

    let channel = and_scalar(&a.channel, &b.channel)?;
    let show = and_scalar(&a.show, &b.show)?;

    let hours = match (&a.hours, &b.hours) {
        (Some(x), Some(y)) => {
            let merged: BTreeSet<u8> = x.intersection(y).copied().collect();
            if merged.is_empty() {
                return None;
            }
            Some(merged)
        }
        (Some(x), None) => Some(x.clone()),
        (None, Some(y)) => Some(y.clone()),
        (None, None) => None,
    };

    let days_of_week = match (&a.days_of_week, &b.days_of_week) {
        (Some(x), Some(y)) => {
            let merged: BTreeSet<u8> = x.intersection(y).copied().collect();
            if merged.is_empty() {
                return None;
            }
            Some(merged)
        }
        (Some(x), None) => Some(x.clone()),
        (None, Some(y)) => Some(y.clone()),
        (None, None) => None,
    };

    let text_window = if a.text_window != 0 { a.text_window } else { b.text_window };

    Some(SearchContext {
        start_date,
        end_date,
        videos,
        channel,
        show,
        hours,
        days_of_week,
        text_window,
    })
}

fn and_scalar(a: &Option<String>, b: &Option<String>) -> Option<Option<String>> {
    match (a, b) {
        (Some(x), Some(y)) => {
            if x == y {
                Some(Some(x.clone()))
            } else {
                None
            }
        }
        (Some(x), None) => Some(Some(x.clone())),
        (None, Some(y)) => Some(Some(y.clone())),
        (None, None) => Some(None),
    }
}

/// Builds a predicate over [`Video`] from a context's constrained fields.
/// `None` means the context is wholly unconstrained (every video passes),
/// letting callers skip the per-video scan entirely.
pub fn get_video_filter(ctx: &SearchContext) -> Option<Box<dyn Fn(&Video) -> bool + Send + Sync>> {
    if ctx.is_unconstrained() {
        return None;
    }
    let ctx = ctx.clone();
    Some(Box::new(move |video: &Video| -> bool {
        if let Some(start) = ctx.start_date {
            if video.date < start {
                return false;
            }
        }
        if let Some(end) = ctx.end_date {
            if video.date > end {
                return false;
            }
        }
        if let Some(ids) = &ctx.videos {
            if !ids.contains(&video.id) {
                return false;
            }
        }
        if let Some(channel) = &ctx.channel {
            if &video.channel != channel {
                return false;
            }
        }
        if let Some(show) = &ctx.show {
            if &video.show != show {
                return false;
            }
        }
        if let Some(hours) = &ctx.hours {
            if !video.hour_span().any(|h| hours.contains(&((h % 24) as u8))) {
                return false;
            }
        }
        if let Some(days) = &ctx.days_of_week {
            if !days.contains(&video.day_of_week) {
                return false;
            }
        }
        true
    }))
}
